//! Sign-up, confirmation, and credential flows.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{
    ConfirmationTokens, Credentials, FlagStore, IdentityBackend, NewUser, ProfileRecord,
    ProfileStore,
};
use crate::config::CoreConfig;
use crate::error::AuthError;
use crate::session::flow_state::{self, AuthFlowRecord};
use crate::session::resolver::NavIntent;
use crate::session::{Identity, Role, SessionResolver};
use crate::validate::{normalize_email, valid_email, MIN_PASSWORD_LEN};

/// Outcome of a successful [`AuthFlow::sign_up`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The backend accepted the sign-up. The caller shows the confirmation
    /// screen whether or not the backend actually requires confirmation.
    ConfirmationSent,
    /// The credentials already authenticate; the normal signed-in path ran
    /// instead of a duplicate-account error.
    AlreadyRegistered,
}

/// Client-side cooldown on repeatable email sends.
struct Cooldown {
    last_attempt: Option<Instant>,
}

impl Cooldown {
    const fn new() -> Self {
        Self { last_attempt: None }
    }

    /// Remaining wait, if the window is still running.
    fn remaining(&self, window: Duration) -> Option<Duration> {
        let elapsed = self.last_attempt?.elapsed();
        (elapsed < window).then(|| window - elapsed)
    }

    fn touch(&mut self) {
        self.last_attempt = Some(Instant::now());
    }
}

/// User-facing auth operations, layered over the resolver.
pub struct AuthFlow {
    backend: Arc<dyn IdentityBackend>,
    profiles: Arc<dyn ProfileStore>,
    flags: Arc<dyn FlagStore>,
    resolver: Arc<SessionResolver>,
    config: CoreConfig,
    resend_cooldown: Mutex<Cooldown>,
    reset_cooldown: Mutex<Cooldown>,
}

impl AuthFlow {
    pub fn new(
        backend: Arc<dyn IdentityBackend>,
        profiles: Arc<dyn ProfileStore>,
        flags: Arc<dyn FlagStore>,
        resolver: Arc<SessionResolver>,
        config: CoreConfig,
    ) -> Self {
        Self {
            backend,
            profiles,
            flags,
            resolver,
            config,
            resend_cooldown: Mutex::new(Cooldown::new()),
            reset_cooldown: Mutex::new(Cooldown::new()),
        }
    }

    /// Register a new account.
    ///
    /// The durable flow record is written before anything else, so a crash
    /// or relaunch mid-flow still suppresses auto-navigation. An email that
    /// already authenticates with this exact password resolves as a normal
    /// sign-in instead of a duplicate-account error.
    pub async fn sign_up(
        &self,
        email: &str,
        password: SecretString,
        role: Role,
    ) -> Result<SignUpOutcome, AuthError> {
        let email = normalize_email(email);
        flow_state::save(self.flags.as_ref(), &AuthFlowRecord::signing_up(&email)).await;

        if !valid_email(&email) {
            return Err(AuthError::Validation("invalid email address".to_string()));
        }
        if password.expose_secret().len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let credentials = Credentials {
            email: email.clone(),
            password: password.clone(),
        };
        match self.backend.sign_in(&credentials).await {
            Ok(backend_session) => {
                info!(email = %email, "sign-up email already registered, signed in instead");
                flow_state::clear(self.flags.as_ref()).await;
                self.resolver
                    .adopt_session(&backend_session, NavIntent::ForceHome, true)
                    .await;
                return Ok(SignUpOutcome::AlreadyRegistered);
            }
            Err(err) => debug!("pre-sign-up sign-in probe failed, continuing with sign-up: {err}"),
        }

        let new_user = NewUser {
            email: email.clone(),
            password,
            role,
            redirect_url: self.config.confirm_redirect().clone(),
        };
        self.backend.sign_up(&new_user).await?;

        flow_state::save(
            self.flags.as_ref(),
            &AuthFlowRecord::awaiting_confirmation(&email),
        )
        .await;
        info!(email = %email, "sign-up accepted, confirmation pending");
        Ok(SignUpOutcome::ConfirmationSent)
    }

    /// Re-send the confirmation email, at most once per cooldown window.
    ///
    /// The window starts at the attempt, not at success: a failed send does
    /// not permit an immediate retry. A backend rate limit without its own
    /// wait hint surfaces the full client window.
    pub async fn resend_confirmation(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::Validation("invalid email address".to_string()));
        }
        self.throttle(&self.resend_cooldown).await?;

        match self.backend.resend_confirmation(&email).await {
            Ok(()) => {
                info!(email = %email, "confirmation email re-sent");
                Ok(())
            }
            Err(err) => Err(self.fill_retry_hint(err)),
        }
    }

    /// Send a password reset email, on the same cooldown discipline as
    /// [`resend_confirmation`](Self::resend_confirmation).
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::Validation("invalid email address".to_string()));
        }
        self.throttle(&self.reset_cooldown).await?;

        match self.backend.reset_password(&email).await {
            Ok(()) => {
                info!(email = %email, "password reset email sent");
                Ok(())
            }
            Err(err) => Err(self.fill_retry_hint(err)),
        }
    }

    /// Complete an email confirmation from deep-link tokens.
    ///
    /// Exchanges the tokens, waits for the backend to settle, writes a
    /// best-effort profile row, then deliberately signs the session back
    /// out: confirmation never completes a sign-in, the user
    /// re-authenticates on the login screen.
    pub async fn confirm_email(&self, tokens: &ConfirmationTokens) -> Result<(), AuthError> {
        let backend_session = self.backend.exchange_confirmation(tokens).await?;
        tokio::time::sleep(self.config.confirm_settle()).await;

        let record = ProfileRecord {
            id: backend_session.user_id,
            email: normalize_email(&backend_session.email),
            role: backend_session
                .role_hint
                .unwrap_or_else(|| self.config.default_role()),
            display_name: None,
        };
        if let Err(err) = self.profiles.upsert(&record).await {
            warn!(user = %record.id, "post-confirmation profile upsert failed: {err:#}");
        }

        if let Err(err) = self.backend.sign_out().await {
            warn!("post-confirmation sign-out failed: {err}");
        }
        flow_state::clear(self.flags.as_ref()).await;
        info!(user = %record.id, "email confirmed");
        Ok(())
    }

    /// Authenticate with credentials and land on the role home route.
    pub async fn sign_in(&self, email: &str, password: SecretString) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::Validation("invalid email address".to_string()));
        }
        if password.expose_secret().is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        let credentials = Credentials {
            email: email.clone(),
            password,
        };
        let backend_session = self.backend.sign_in(&credentials).await?;
        // Signing in completes whatever flow was pending.
        flow_state::clear(self.flags.as_ref()).await;
        let identity = self
            .resolver
            .adopt_session(&backend_session, NavIntent::ForceHome, true)
            .await;
        Ok(identity)
    }

    /// Close the session and park the app on the login screen.
    ///
    /// Local state clears even when the backend call fails; a stale remote
    /// session corrects itself on the next resolve.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.backend.sign_out().await;
        self.resolver.handle_signed_out();
        result
    }

    /// Drop the flow record when the user leaves the confirmation flow for
    /// the login screen without finishing it.
    pub async fn abandon_to_login(&self) {
        flow_state::clear(self.flags.as_ref()).await;
    }

    /// Email captured at sign-up, for the confirmation screen.
    pub async fn pending_email(&self) -> Option<String> {
        flow_state::load(self.flags.as_ref()).await.pending_email
    }

    async fn throttle(&self, cooldown: &Mutex<Cooldown>) -> Result<(), AuthError> {
        let window = self.config.resend_cooldown();
        if window.is_zero() {
            return Ok(());
        }
        let mut guard = cooldown.lock().await;
        if let Some(remaining) = guard.remaining(window) {
            return Err(AuthError::RateLimited {
                retry_after: Some(remaining),
            });
        }
        guard.touch();
        Ok(())
    }

    /// Backend rate limits without a hint get the full client window.
    fn fill_retry_hint(&self, err: AuthError) -> AuthError {
        match err {
            AuthError::RateLimited { retry_after } => AuthError::RateLimited {
                retry_after: retry_after.or(Some(self.config.resend_cooldown())),
            },
            other => other,
        }
    }
}
