//! Shared session state published to guards, engines, and the UI.

use std::sync::Arc;

use tokio::sync::watch;

use crate::session::Identity;

/// Resolution state of the current session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Cold start; the resolver has not settled yet. Guards hold off.
    Initializing,
    /// Resolved: nobody is signed in.
    NoSession,
    /// Resolved: `identity` is signed in. `pending_confirmation` marks a
    /// sign-up whose confirmation email is still outstanding.
    Active {
        identity: Identity,
        pending_confirmation: bool,
    },
}

impl SessionState {
    /// Whether resolution is still in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Initializing)
    }

    /// The signed-in identity, confirmed or not.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Active { identity, .. } => Some(identity),
            _ => None,
        }
    }
}

/// Injectable handle on the session watch channel.
///
/// The resolver writes through it; everything else reads or subscribes.
/// Clones share one channel, so a test can hand the same handle to the
/// resolver and the engine and observe both sides.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionHandle {
    /// New handle starting in [`SessionState::Initializing`].
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Initializing);
        Self { tx: Arc::new(tx) }
    }

    /// Current state, cloned out of the channel.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Current identity, if one is signed in.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.tx.borrow().identity().cloned()
    }

    /// Watch for state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, state: SessionState) {
        self.tx.send_replace(state);
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}
