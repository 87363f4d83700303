//! Local notification feed state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification categories the app renders specially. Anything the backend
/// adds later lands in [`NotificationKind::Other`] instead of failing to
/// decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned,
    TaskGraded,
    GroupInvite,
    #[serde(other)]
    Other,
}

/// One notification row as stored remotely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Kind-specific payload, passed through untouched.
    pub data: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Client-local view of the feed.
///
/// Items stay newest first and the unread count is always derived from
/// them, never tracked independently.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedState {
    items: Vec<Notification>,
    unread: usize,
}

impl FeedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications, newest first.
    #[must_use]
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    /// Count of unread items.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.unread
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the feed wholesale and recompute the unread count.
    pub(crate) fn replace(&mut self, mut items: Vec<Notification>) {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.items = items;
        self.recount();
    }

    /// Flip one item to read. Read flags only move unread -> read; an
    /// already-read or unknown id changes nothing. Returns whether the
    /// feed changed.
    pub(crate) fn mark_read(&mut self, id: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        if item.is_read {
            return false;
        }
        item.is_read = true;
        self.recount();
        true
    }

    /// Flip every item to read. Returns how many changed.
    pub(crate) fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for item in &mut self.items {
            if !item.is_read {
                item.is_read = true;
                changed += 1;
            }
        }
        if changed > 0 {
            self.recount();
        }
        changed
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.unread = 0;
    }

    fn recount(&mut self) {
        self.unread = self.items.iter().filter(|item| !item.is_read).count();
    }
}
