//! Core configuration with validated defaults.

use std::time::Duration;

use url::Url;

use crate::session::Role;

const DEFAULT_RESEND_COOLDOWN_SECONDS: u64 = 60;
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 30;
const DEFAULT_CONFIRM_SETTLE_MS: u64 = 500;

/// Tunables for the session resolver, auth flows, and notification engine.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    confirm_redirect: Url,
    resend_cooldown: Duration,
    poll_interval: Duration,
    confirm_settle: Duration,
    default_role: Role,
}

impl CoreConfig {
    /// Build a config around the deep link the confirmation email points at.
    #[must_use]
    pub fn new(confirm_redirect: Url) -> Self {
        Self {
            confirm_redirect,
            resend_cooldown: Duration::from_secs(DEFAULT_RESEND_COOLDOWN_SECONDS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECONDS),
            confirm_settle: Duration::from_millis(DEFAULT_CONFIRM_SETTLE_MS),
            default_role: Role::Student,
        }
    }

    /// Client-side cooldown between confirmation resends, in seconds.
    /// Zero disables the local cooldown; the backend still enforces its own.
    #[must_use]
    pub fn with_resend_cooldown_seconds(mut self, seconds: u64) -> Self {
        self.resend_cooldown = Duration::from_secs(seconds);
        self
    }

    /// Notification poll period while the app is active, in seconds.
    #[must_use]
    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.poll_interval = Duration::from_secs(seconds);
        self
    }

    /// Pause after a confirmation exchange before dependent writes run.
    #[must_use]
    pub fn with_confirm_settle_ms(mut self, millis: u64) -> Self {
        self.confirm_settle = Duration::from_millis(millis);
        self
    }

    /// Role assumed when neither the profile nor the session metadata has one.
    #[must_use]
    pub fn with_default_role(mut self, role: Role) -> Self {
        self.default_role = role;
        self
    }

    /// Clamp values that would break the polling loop.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.poll_interval.is_zero() {
            self.poll_interval = Duration::from_secs(1);
        }
        self
    }

    #[must_use]
    pub fn confirm_redirect(&self) -> &Url {
        &self.confirm_redirect
    }

    #[must_use]
    pub fn resend_cooldown(&self) -> Duration {
        self.resend_cooldown
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn confirm_settle(&self) -> Duration {
        self.confirm_settle
    }

    #[must_use]
    pub fn default_role(&self) -> Role {
        self.default_role
    }
}
