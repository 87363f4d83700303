//! Profile store seam: the backend row a role is persisted in.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::Role;

/// Backend profile row, keyed by the identity id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub display_name: Option<String>,
}

/// Seam to the profile table.
///
/// Failures here are soft: callers log and fall back to best-effort role
/// data instead of blocking session resolution, so errors stay untyped.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile for an identity id.
    async fn get(&self, id: Uuid) -> Result<Option<ProfileRecord>>;

    /// Insert-or-update keyed on `id`. Must be idempotent: concurrent
    /// upserts for the same id leave exactly one row.
    async fn upsert(&self, record: &ProfileRecord) -> Result<()>;

    /// Case-insensitive email lookup, for identities created out of band.
    async fn find_by_email(&self, email: &str) -> Result<Option<ProfileRecord>>;

    /// Re-key the row matching `email` (case-insensitive) onto a new
    /// identity id. Returns the updated row when one matched.
    async fn rebind_id(&self, email: &str, new_id: Uuid) -> Result<Option<ProfileRecord>>;
}
