//! Notification feed state and the polling engine that keeps it fresh.

mod engine;
mod feed;

pub use engine::NotificationEngine;
pub use feed::{FeedState, Notification, NotificationKind};
