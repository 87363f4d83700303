//! Seams to the hosted backend and the host platform.
//!
//! Everything the core needs from the outside world comes through the traits
//! in this module, injected as `Arc<dyn ...>`. Adapters own the translation
//! from vendor SDKs and OS APIs; the core stays deterministic and testable.

mod flags;
mod identity;
mod notifications;
mod platform;
mod profiles;

pub use flags::{FlagStore, MemoryFlagStore};
pub use identity::{
    AuthEvent, AuthEventKind, AuthEventStream, BackendSession, ConfirmationTokens, Credentials,
    IdentityBackend, NewUser,
};
pub use notifications::NotificationStore;
pub use platform::{AppState, BadgeSink, NoopPushRegistrar, PushRegistrar, Router};
pub use profiles::{ProfileRecord, ProfileStore};
