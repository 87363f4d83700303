//! Identity backend seam: sessions, credentials, and the auth event stream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::mpsc;
use url::Url;
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::Role;

/// The backend's view of an authenticated session.
#[derive(Clone, Debug)]
pub struct BackendSession {
    pub user_id: Uuid,
    pub email: String,
    /// Role recorded in the session metadata at sign-up, when present.
    pub role_hint: Option<Role>,
    /// When the confirmation email went out, if one was sent.
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    /// When the address was confirmed, once it has been.
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl BackendSession {
    /// A sign-up whose confirmation email went out but was never completed.
    #[must_use]
    pub fn is_unconfirmed_signup(&self) -> bool {
        self.confirmation_sent_at.is_some() && self.confirmed_at.is_none()
    }
}

/// Parameters for a new sign-up.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub password: SecretString,
    /// Stored in the session metadata so the role survives until the
    /// profile row exists.
    pub role: Role,
    /// Deep link the confirmation email sends the user back through.
    pub redirect_url: Url,
}

/// Email and password for an existing account.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Token pair carried by a confirmation deep link.
#[derive(Clone, Debug)]
pub struct ConfirmationTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Kinds of change the backend reports on its auth stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    UserUpdated,
}

/// One change notification from the identity backend.
#[derive(Clone, Debug)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    /// Present for [`AuthEventKind::SignedIn`] and
    /// [`AuthEventKind::UserUpdated`]; absent on sign-out.
    pub session: Option<BackendSession>,
}

/// Stream of auth events, handed to the session resolver to drive.
pub struct AuthEventStream {
    receiver: mpsc::UnboundedReceiver<AuthEvent>,
}

impl AuthEventStream {
    #[must_use]
    pub fn new(receiver: mpsc::UnboundedReceiver<AuthEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the backend side hangs up.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.receiver.recv().await
    }
}

/// Seam to the hosted identity provider.
///
/// Adapters normalize vendor errors into [`AuthError`] here, so callers
/// never see transport detail. Each [`subscribe`](IdentityBackend::subscribe)
/// call mints an independent stream.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Register a new account and trigger the confirmation email.
    async fn sign_up(&self, new_user: &NewUser) -> Result<(), AuthError>;

    /// Authenticate with credentials and open a session.
    async fn sign_in(&self, credentials: &Credentials) -> Result<BackendSession, AuthError>;

    /// Close the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The persisted session from the previous launch, if any survives.
    async fn session(&self) -> Result<Option<BackendSession>, AuthError>;

    /// Exchange confirmation-link tokens for a live session.
    async fn exchange_confirmation(
        &self,
        tokens: &ConfirmationTokens,
    ) -> Result<BackendSession, AuthError>;

    /// Re-send the confirmation email for an unconfirmed account.
    async fn resend_confirmation(&self, email: &str) -> Result<(), AuthError>;

    /// Send a password reset email.
    async fn reset_password(&self, email: &str) -> Result<(), AuthError>;

    /// Subscribe to sign-in/sign-out/update events.
    fn subscribe(&self) -> AuthEventStream;
}
