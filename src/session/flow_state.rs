//! Durable record of an in-flight sign-up/confirmation flow.
//!
//! The record is written atomically under a single key, so the suppression
//! phase and the pending email can never disagree after a crash. Anything
//! unreadable decodes as idle: a corrupt or future-versioned record must
//! never wedge navigation.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::FlagStore;

/// Storage key for the flow record.
pub const FLOW_STATE_KEY: &str = "auth.flow_state";

const FLOW_STATE_VERSION: u32 = 1;

/// Phase of the sign-up/confirmation flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFlowPhase {
    /// No flow in flight.
    #[default]
    Idle,
    /// Sign-up submitted; the backend has not yet accepted it.
    SigningUp,
    /// Backend accepted the sign-up; the confirmation email is outstanding.
    AwaitingConfirmation,
}

/// The durable flow record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFlowRecord {
    pub version: u32,
    pub phase: AuthFlowPhase,
    /// Email captured at sign-up, shown on the confirmation screen.
    pub pending_email: Option<String>,
}

impl AuthFlowRecord {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            version: FLOW_STATE_VERSION,
            phase: AuthFlowPhase::Idle,
            pending_email: None,
        }
    }

    #[must_use]
    pub fn signing_up(email: &str) -> Self {
        Self {
            version: FLOW_STATE_VERSION,
            phase: AuthFlowPhase::SigningUp,
            pending_email: Some(email.to_string()),
        }
    }

    #[must_use]
    pub fn awaiting_confirmation(email: &str) -> Self {
        Self {
            version: FLOW_STATE_VERSION,
            phase: AuthFlowPhase::AwaitingConfirmation,
            pending_email: Some(email.to_string()),
        }
    }

    /// While this holds, the resolver and guard must not force a route change.
    #[must_use]
    pub fn suppresses_navigation(&self) -> bool {
        self.phase != AuthFlowPhase::Idle
    }
}

impl Default for AuthFlowRecord {
    fn default() -> Self {
        Self::idle()
    }
}

/// Load the current record; missing, corrupt, or unknown-version data all
/// read as idle.
pub(crate) async fn load(store: &dyn FlagStore) -> AuthFlowRecord {
    match store.get(FLOW_STATE_KEY).await {
        Ok(Some(raw)) => decode(&raw),
        Ok(None) => AuthFlowRecord::idle(),
        Err(err) => {
            warn!("auth flow record read failed, treating as idle: {err:#}");
            AuthFlowRecord::idle()
        }
    }
}

/// Persist the record. An idle record deletes the key instead.
///
/// Write failures are logged and swallowed: the flow must go on even when
/// durable storage is briefly unavailable, at the cost of suppression not
/// surviving a restart in that window.
pub(crate) async fn save(store: &dyn FlagStore, record: &AuthFlowRecord) {
    if record.phase == AuthFlowPhase::Idle {
        clear(store).await;
        return;
    }
    match serde_json::to_string(record) {
        Ok(raw) => {
            if let Err(err) = store.set(FLOW_STATE_KEY, &raw).await {
                warn!(phase = ?record.phase, "auth flow record write failed: {err:#}");
            }
        }
        Err(err) => warn!("auth flow record encode failed: {err}"),
    }
}

/// Remove the record.
pub(crate) async fn clear(store: &dyn FlagStore) {
    if let Err(err) = store.delete(FLOW_STATE_KEY).await {
        warn!("auth flow record delete failed: {err:#}");
    }
}

fn decode(raw: &str) -> AuthFlowRecord {
    match serde_json::from_str::<AuthFlowRecord>(raw) {
        Ok(record) if record.version == FLOW_STATE_VERSION => record,
        Ok(record) => {
            warn!(version = record.version, "unknown auth flow record version, treating as idle");
            AuthFlowRecord::idle()
        }
        Err(err) => {
            warn!("corrupt auth flow record, treating as idle: {err}");
            AuthFlowRecord::idle()
        }
    }
}
