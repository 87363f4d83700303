//! Platform seams: app lifecycle, OS badge, push permission, and the router.

use anyhow::Result;
use async_trait::async_trait;

use crate::routes::RoutePath;

/// App lifecycle states as reported by the OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    /// Foreground and receiving input.
    Active,
    /// Foreground but interrupted (system sheet, app switcher).
    Inactive,
    /// Not on screen.
    Background,
}

impl AppState {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// OS badge counter on the app icon.
#[async_trait]
pub trait BadgeSink: Send + Sync {
    async fn set_badge_count(&self, count: usize) -> Result<()>;
}

/// One-shot push permission registration.
#[async_trait]
pub trait PushRegistrar: Send + Sync {
    /// Ask the OS for push permission. `Ok(false)` means denied, which is
    /// non-fatal: the badge still tracks the foreground fetch path.
    async fn request_permission(&self) -> Result<bool>;
}

/// Registrar for platforms without push support.
pub struct NoopPushRegistrar;

#[async_trait]
impl PushRegistrar for NoopPushRegistrar {
    async fn request_permission(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Route control surface of the embedding navigator.
///
/// `replace` must swap the current entry without growing history; the
/// guards rely on that to keep forced redirects out of the back stack.
pub trait Router: Send + Sync {
    /// The route currently on screen.
    fn current(&self) -> RoutePath;

    /// Replace the current route.
    fn replace(&self, path: &RoutePath);
}
