//! Notification polling engine.
//!
//! A single task owns the feed: every fetch, read flip, and badge write is
//! serialized through it, so concurrent refreshes cannot interleave. The
//! poll timer is never torn down; lifecycle transitions only gate whether a
//! tick does work.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::backend::{AppState, BadgeSink, NotificationStore, PushRegistrar};
use crate::config::CoreConfig;
use crate::notifications::FeedState;
use crate::session::SessionHandle;

#[derive(Debug)]
enum Command {
    Fetch,
    MarkRead { id: String },
    MarkAllRead,
    Shutdown,
}

/// Handle to the spawned engine task.
///
/// Cheap to clone; all clones talk to the same task. Dropping every handle
/// stops the task.
#[derive(Clone)]
pub struct NotificationEngine {
    commands: mpsc::UnboundedSender<Command>,
    feed: watch::Receiver<FeedState>,
}

impl NotificationEngine {
    /// Spawn the engine task.
    ///
    /// When the app starts active, an initial fetch runs before the first
    /// poll tick. The returned [`JoinHandle`] resolves once the task stops.
    pub fn spawn(
        store: Arc<dyn NotificationStore>,
        badge: Arc<dyn BadgeSink>,
        push: Arc<dyn PushRegistrar>,
        session: SessionHandle,
        lifecycle: watch::Receiver<AppState>,
        config: CoreConfig,
    ) -> (Self, JoinHandle<()>) {
        let config = config.normalize();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (feed_tx, feed_rx) = watch::channel(FeedState::new());
        let task = EngineTask {
            store,
            badge,
            session,
            config,
            feed: FeedState::new(),
            feed_tx,
        };
        let handle = tokio::spawn(task.run(command_rx, lifecycle, push));
        (
            Self {
                commands: command_tx,
                feed: feed_rx,
            },
            handle,
        )
    }

    /// Snapshot of the current feed.
    #[must_use]
    pub fn feed(&self) -> FeedState {
        self.feed.borrow().clone()
    }

    /// Watch feed updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.feed.clone()
    }

    /// Queue a full refresh.
    pub fn request_fetch(&self) {
        self.send(Command::Fetch);
    }

    /// Optimistically mark one notification read.
    pub fn mark_as_read(&self, id: impl Into<String>) {
        self.send(Command::MarkRead { id: id.into() });
    }

    /// Optimistically mark the whole feed read.
    pub fn mark_all_read(&self) {
        self.send(Command::MarkAllRead);
    }

    /// Ask the task to stop.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    fn send(&self, command: Command) {
        // A closed channel means the task already stopped.
        let _ = self.commands.send(command);
    }
}

struct EngineTask {
    store: Arc<dyn NotificationStore>,
    badge: Arc<dyn BadgeSink>,
    session: SessionHandle,
    config: CoreConfig,
    feed: FeedState,
    feed_tx: watch::Sender<FeedState>,
}

impl EngineTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut lifecycle: watch::Receiver<AppState>,
        push: Arc<dyn PushRegistrar>,
    ) {
        match push.request_permission().await {
            Ok(true) => debug!("push permission granted"),
            Ok(false) => debug!("push permission denied, badge tracks foreground fetches only"),
            Err(err) => warn!("push permission request failed: {err:#}"),
        }

        let mut last_state = *lifecycle.borrow();
        if last_state.is_active() {
            self.fetch().await;
        }

        let period = self.config.poll_interval();
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    if lifecycle.borrow().is_active() {
                        self.fetch().await;
                    }
                }
                changed = lifecycle.changed() => {
                    if changed.is_err() {
                        debug!("lifecycle signal closed, stopping notification engine");
                        break;
                    }
                    let state = *lifecycle.borrow();
                    // watch coalesces rapid flips; only real transitions count.
                    if state != last_state {
                        self.on_transition(state).await;
                        last_state = state;
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::Fetch) => self.fetch().await,
                    Some(Command::MarkRead { id }) => self.mark_read(&id).await,
                    Some(Command::MarkAllRead) => self.mark_all_read().await,
                    Some(Command::Shutdown) => {
                        debug!("notification engine shutdown requested");
                        break;
                    }
                    None => {
                        debug!("all engine handles dropped, stopping");
                        break;
                    }
                },
            }
        }
    }

    async fn on_transition(&mut self, state: AppState) {
        match state {
            AppState::Active => {
                debug!("app active, refreshing notifications");
                self.fetch().await;
            }
            // One last mirror so the icon is right while suspended.
            AppState::Background => self.mirror_badge().await,
            AppState::Inactive => {}
        }
    }

    /// Wholesale refresh. Fetch failures keep the last known feed.
    async fn fetch(&mut self) {
        let Some(identity) = self.session.identity() else {
            if !self.feed.is_empty() {
                self.feed.clear();
                self.publish();
                self.mirror_badge().await;
            }
            return;
        };

        match self.store.list_for_user(identity.id).await {
            Ok(items) => {
                debug!(count = items.len(), "notifications fetched");
                self.feed.replace(items);
                self.publish();
                self.mirror_badge().await;
            }
            Err(err) => warn!("notification fetch failed, keeping last known feed: {err:#}"),
        }
    }

    async fn mark_read(&mut self, id: &str) {
        if !self.feed.mark_read(id) {
            return;
        }
        self.publish();
        self.mirror_badge().await;
        // Optimistic: a failed write is reconciled by the next full fetch.
        if let Err(err) = self.store.set_read(id, true).await {
            warn!(notification = id, "read-flag write failed: {err:#}");
        }
    }

    async fn mark_all_read(&mut self) {
        let Some(identity) = self.session.identity() else {
            return;
        };
        if self.feed.mark_all_read() > 0 {
            self.publish();
            self.mirror_badge().await;
        }
        if let Err(err) = self.store.set_all_read(identity.id, true).await {
            warn!("bulk read-flag write failed: {err:#}");
        }
    }

    async fn mirror_badge(&self) {
        if let Err(err) = self.badge.set_badge_count(self.feed.unread_count()).await {
            warn!("badge update failed: {err:#}");
        }
    }

    fn publish(&self) {
        self.feed_tx.send_replace(self.feed.clone());
    }
}
