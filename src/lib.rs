//! # Instrui session & notification core
//!
//! `instrui` is the session and notification synchronization core of the
//! Instrui classroom app. It owns who is signed in, how the sign-up and
//! email-confirmation flows move, when the app is allowed to force a route
//! change, and how the notification feed and OS badge stay fresh.
//!
//! ## Session resolution
//!
//! A single [`SessionResolver`] settles identity on cold start and applies
//! backend auth events afterwards. State is published through an injectable
//! [`SessionHandle`] watch channel; everything else only reads it.
//!
//! - **Unconfirmed sign-ups** resolve as signed-in with a pending
//!   confirmation marker and never trigger profile work or navigation.
//! - **Profile failures are soft:** the role falls back to session metadata,
//!   then to the configured default, and resolution always completes.
//!
//! ## Suppressed navigation
//!
//! The sign-up flow writes one durable [`AuthFlowRecord`] before its first
//! backend call. While that record is live, neither the resolver nor the
//! [`guard`] may force a route change, across restarts included. Anything
//! unreadable in storage decodes as idle rather than wedging navigation.
//!
//! ## Notification polling
//!
//! A single [`NotificationEngine`] task serializes all feed work: wholesale
//! fetches, optimistic read flips, and badge writes. The poll timer runs
//! for the life of the task; app lifecycle transitions only gate whether a
//! tick fetches.
//!
//! ## Collaborators
//!
//! Everything external comes in through the traits in [`backend`]: the
//! hosted identity provider, the profile and notification tables, durable
//! flag storage, and the platform surfaces (router, badge, push). Adapters
//! normalize their errors at that boundary, so the core deals only in
//! [`AuthError`] and logged soft failures.

pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod notifications;
pub mod routes;
pub mod session;
mod validate;

pub use backend::{
    AppState, AuthEvent, AuthEventKind, AuthEventStream, BackendSession, BadgeSink,
    ConfirmationTokens, Credentials, FlagStore, IdentityBackend, MemoryFlagStore, NewUser,
    NoopPushRegistrar, NotificationStore, ProfileRecord, ProfileStore, PushRegistrar, Router,
};
pub use config::CoreConfig;
pub use error::AuthError;
pub use guard::NavigationGuard;
pub use notifications::{FeedState, Notification, NotificationEngine, NotificationKind};
pub use routes::RoutePath;
pub use session::{
    AuthFlow, AuthFlowPhase, AuthFlowRecord, Identity, Role, SessionHandle, SessionResolver,
    SessionState, SignUpOutcome, FLOW_STATE_KEY,
};
