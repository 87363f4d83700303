//! Notification store seam.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::notifications::Notification;

/// Seam to the remote notification rows.
///
/// Reads return the full set for a user, newest first; the engine never
/// paginates or diffs. Write failures are soft: the engine keeps its
/// optimistic local state and the next full fetch reconciles.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Every notification belonging to `user_id`, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>>;

    /// Set one notification's read flag.
    async fn set_read(&self, id: &str, value: bool) -> Result<()>;

    /// Set the read flag on every notification belonging to `user_id`.
    async fn set_all_read(&self, user_id: Uuid, value: bool) -> Result<()>;
}
