//! Role-aware navigation guards.
//!
//! [`evaluate`] is a pure function of the session state, the suppression
//! flag, and the current route. It returns the redirect target or `None`;
//! applying the decision through the router is kept separate in
//! [`NavigationGuard`] so the logic stays trivially testable.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{FlagStore, Router};
use crate::routes::{self, RoutePath};
use crate::session::{flow_state, Role, SessionHandle, SessionState};

/// Decide whether the current route must be redirected.
///
/// Rules, in order:
/// - resolution still loading: never redirect;
/// - suppression flag set: never redirect;
/// - signed-in but unconfirmed: never redirect;
/// - no identity outside the auth area: redirect to login;
/// - identity on an auth screen other than confirmation: redirect to the
///   role home route.
///
/// A returned target always differs from `current`, so applying the same
/// decision twice cannot loop.
#[must_use]
pub fn evaluate(
    session: &SessionState,
    suppressed: bool,
    current: &RoutePath,
) -> Option<RoutePath> {
    if session.is_loading() || suppressed {
        return None;
    }

    let identity = match session {
        SessionState::Active {
            identity,
            pending_confirmation,
        } => {
            if *pending_confirmation {
                return None;
            }
            Some(identity)
        }
        _ => None,
    };

    match identity {
        None => {
            if current.in_auth_area() {
                return None;
            }
            (!current.is_login()).then(|| RoutePath::new(routes::LOGIN))
        }
        Some(identity) => {
            if !current.in_auth_area() || current.is_confirmation() {
                return None;
            }
            let home = RoutePath::new(routes::home_route(identity.role));
            (*current != home).then_some(home)
        }
    }
}

/// Self-guard for a role-scoped layout subtree: anyone without that exact
/// role (or without a confirmed session at all) goes to login.
#[must_use]
pub fn guard_role_layout(
    session: &SessionState,
    current: &RoutePath,
    required: Role,
) -> Option<RoutePath> {
    if session.is_loading() {
        return None;
    }
    let allowed = matches!(
        session,
        SessionState::Active {
            identity,
            pending_confirmation: false,
        } if identity.role == required
    );
    if allowed {
        return None;
    }
    (!current.is_login()).then(|| RoutePath::new(routes::LOGIN))
}

/// Applies guard decisions through the router.
pub struct NavigationGuard {
    session: SessionHandle,
    flags: Arc<dyn FlagStore>,
    router: Arc<dyn Router>,
}

impl NavigationGuard {
    pub fn new(session: SessionHandle, flags: Arc<dyn FlagStore>, router: Arc<dyn Router>) -> Self {
        Self {
            session,
            flags,
            router,
        }
    }

    /// Evaluate against live state and apply at most one redirect.
    /// Returns the target when a redirect was performed.
    pub async fn apply(&self) -> Option<RoutePath> {
        let state = self.session.snapshot();
        let suppressed = flow_state::load(self.flags.as_ref())
            .await
            .suppresses_navigation();
        let current = self.router.current();
        let target = evaluate(&state, suppressed, &current)?;
        if target == current {
            return None;
        }
        debug!(from = %current, to = %target, "guard redirect");
        self.router.replace(&target);
        Some(target)
    }

    /// Re-apply on every session-state change until the channel closes.
    pub async fn run(&self) {
        let mut states = self.session.subscribe();
        self.apply().await;
        while states.changed().await.is_ok() {
            self.apply().await;
        }
    }
}
