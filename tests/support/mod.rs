//! Shared in-memory fakes and wiring for the integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use url::Url;
use uuid::Uuid;

use instrui::{
    AppState, AuthError, AuthEvent, AuthEventStream, AuthFlow, BackendSession, BadgeSink,
    ConfirmationTokens, CoreConfig, Credentials, IdentityBackend, MemoryFlagStore, NewUser,
    Notification, NotificationKind, NotificationStore, ProfileRecord, ProfileStore, Role,
    RoutePath, Router, SessionHandle, SessionResolver,
};

static TRACING: Once = Once::new();

/// Route `RUST_LOG`-filtered traces through the libtest capture.
fn init_tracing() {
    TRACING.call_once(|| {
        let env_filter = EnvFilter::builder()
            .with_default_directive(tracing::Level::WARN.into())
            .from_env_lossy();
        let fmt_layer = fmt::layer().with_test_writer().with_target(false);
        let subscriber = Registry::default().with(fmt_layer).with(env_filter);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Let the spawned tasks drain their queues without advancing the clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn test_config() -> CoreConfig {
    CoreConfig::new(Url::parse("instrui://auth/confirm").unwrap())
}

pub fn password() -> SecretString {
    SecretString::from("correct-horse-battery".to_string())
}

pub fn confirmed_session(user_id: Uuid, email: &str, role_hint: Option<Role>) -> BackendSession {
    BackendSession {
        user_id,
        email: email.to_string(),
        role_hint,
        confirmation_sent_at: Some(Utc::now() - ChronoDuration::hours(1)),
        confirmed_at: Some(Utc::now()),
    }
}

pub fn unconfirmed_session(user_id: Uuid, email: &str, role_hint: Option<Role>) -> BackendSession {
    BackendSession {
        user_id,
        email: email.to_string(),
        role_hint,
        confirmation_sent_at: Some(Utc::now()),
        confirmed_at: None,
    }
}

pub fn notification(id: &str, user_id: Uuid, minutes_ago: i64, is_read: bool) -> Notification {
    Notification {
        id: id.to_string(),
        user_id,
        kind: NotificationKind::TaskAssigned,
        data: serde_json::json!({"task": "essay"}),
        is_read,
        created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
    }
}

struct RegisteredUser {
    password: String,
    session: BackendSession,
}

#[derive(Default)]
struct BackendState {
    users: HashMap<String, RegisteredUser>,
    persisted: Option<BackendSession>,
    session_error: Option<AuthError>,
    sign_up_error: Option<AuthError>,
    sign_out_error: Option<AuthError>,
    exchange_result: Option<Result<BackendSession, AuthError>>,
    resend_error: Option<AuthError>,
    reset_error: Option<AuthError>,
    sign_ups: Vec<NewUser>,
    sign_outs: usize,
    resends: Vec<String>,
    resets: Vec<String>,
    subscribers: Vec<mpsc::UnboundedSender<AuthEvent>>,
}

/// Scripted identity backend.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn set_persisted_session(&self, session: BackendSession) {
        self.state.lock().unwrap().persisted = Some(session);
    }

    pub fn fail_session_with(&self, error: AuthError) {
        self.state.lock().unwrap().session_error = Some(error);
    }

    /// Make `email`/`password` authenticate, yielding `session`.
    pub fn register_user(&self, email: &str, password: &str, session: BackendSession) {
        self.state.lock().unwrap().users.insert(
            email.to_string(),
            RegisteredUser {
                password: password.to_string(),
                session,
            },
        );
    }

    pub fn set_exchange_result(&self, result: Result<BackendSession, AuthError>) {
        self.state.lock().unwrap().exchange_result = Some(result);
    }

    pub fn fail_resend_with(&self, error: AuthError) {
        self.state.lock().unwrap().resend_error = Some(error);
    }

    pub fn fail_reset_with(&self, error: AuthError) {
        self.state.lock().unwrap().reset_error = Some(error);
    }

    pub fn fail_sign_out_with(&self, error: AuthError) {
        self.state.lock().unwrap().sign_out_error = Some(error);
    }

    pub fn sign_up_calls(&self) -> Vec<NewUser> {
        self.state.lock().unwrap().sign_ups.clone()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.state.lock().unwrap().sign_outs
    }

    pub fn resend_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().resends.clone()
    }

    pub fn reset_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().resets.clone()
    }

    /// Push an event to every subscribed stream.
    pub fn emit(&self, event: AuthEvent) {
        let subscribers = self.state.lock().unwrap().subscribers.clone();
        for subscriber in subscribers {
            let _ = subscriber.send(event.clone());
        }
    }
}

#[async_trait]
impl IdentityBackend for FakeBackend {
    async fn sign_up(&self, new_user: &NewUser) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.sign_up_error.clone() {
            return Err(error);
        }
        state.sign_ups.push(new_user.clone());
        Ok(())
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<BackendSession, AuthError> {
        let mut state = self.state.lock().unwrap();
        match state.users.get(&credentials.email) {
            Some(user) if user.password == credentials.password.expose_secret() => {
                let session = user.session.clone();
                state.persisted = Some(session.clone());
                Ok(session)
            }
            _ => Err(AuthError::Auth("invalid login credentials".to_string())),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.sign_outs += 1;
        if let Some(error) = state.sign_out_error.clone() {
            return Err(error);
        }
        state.persisted = None;
        Ok(())
    }

    async fn session(&self) -> Result<Option<BackendSession>, AuthError> {
        let state = self.state.lock().unwrap();
        if let Some(error) = state.session_error.clone() {
            return Err(error);
        }
        Ok(state.persisted.clone())
    }

    async fn exchange_confirmation(
        &self,
        tokens: &ConfirmationTokens,
    ) -> Result<BackendSession, AuthError> {
        let _ = tokens;
        let mut state = self.state.lock().unwrap();
        match state.exchange_result.clone() {
            Some(Ok(session)) => {
                state.persisted = Some(session.clone());
                Ok(session)
            }
            Some(Err(error)) => Err(error),
            None => Err(AuthError::Auth(
                "confirmation link is invalid or has expired".to_string(),
            )),
        }
    }

    async fn resend_confirmation(&self, email: &str) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.resends.push(email.to_string());
        match state.resend_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let mut state = self.state.lock().unwrap();
        state.resets.push(email.to_string());
        match state.reset_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn subscribe(&self) -> AuthEventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().subscribers.push(tx);
        AuthEventStream::new(rx)
    }
}

/// In-memory profile table with call accounting.
#[derive(Default)]
pub struct MemoryProfiles {
    rows: Mutex<HashMap<Uuid, ProfileRecord>>,
    upserts: AtomicUsize,
    fail_reads: AtomicBool,
}

impl MemoryProfiles {
    pub fn insert(&self, record: ProfileRecord) {
        self.rows.lock().unwrap().insert(record.id, record);
    }

    pub fn records(&self) -> Vec<ProfileRecord> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Make every read fail until cleared.
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfiles {
    async fn get(&self, id: Uuid) -> Result<Option<ProfileRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("profile store offline");
        }
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn upsert(&self, record: &ProfileRecord) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().unwrap().insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<ProfileRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("profile store offline");
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|record| record.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn rebind_id(&self, email: &str, new_id: Uuid) -> Result<Option<ProfileRecord>> {
        let mut rows = self.rows.lock().unwrap();
        let old_id = rows
            .values()
            .find(|record| record.email.eq_ignore_ascii_case(email))
            .map(|record| record.id);
        let Some(old_id) = old_id else {
            return Ok(None);
        };
        let Some(mut record) = rows.remove(&old_id) else {
            return Ok(None);
        };
        record.id = new_id;
        rows.insert(new_id, record.clone());
        Ok(Some(record))
    }
}

/// In-memory notification table with call accounting.
#[derive(Default)]
pub struct MemoryNotifications {
    rows: Mutex<Vec<Notification>>,
    list_calls: AtomicUsize,
    fail_next_list: AtomicBool,
    fail_set_read: AtomicBool,
    set_read_log: Mutex<Vec<(String, bool)>>,
    set_all_read_log: Mutex<Vec<Uuid>>,
}

impl MemoryNotifications {
    pub fn seed(&self, items: Vec<Notification>) {
        *self.rows.lock().unwrap() = items;
    }

    pub fn push(&self, item: Notification) {
        self.rows.lock().unwrap().push(item);
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Fail only the next `list_for_user` call.
    pub fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }

    /// Make every `set_read` call fail until cleared.
    pub fn fail_set_read(&self) {
        self.fail_set_read.store(true, Ordering::SeqCst);
    }

    pub fn set_read_calls(&self) -> Vec<(String, bool)> {
        self.set_read_log.lock().unwrap().clone()
    }

    pub fn set_all_read_calls(&self) -> Vec<Uuid> {
        self.set_all_read_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotifications {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            bail!("notification store offline");
        }
        let mut items: Vec<Notification> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn set_read(&self, id: &str, value: bool) -> Result<()> {
        self.set_read_log
            .lock()
            .unwrap()
            .push((id.to_string(), value));
        if self.fail_set_read.load(Ordering::SeqCst) {
            bail!("notification store offline");
        }
        for item in self.rows.lock().unwrap().iter_mut() {
            if item.id == id {
                item.is_read = value;
            }
        }
        Ok(())
    }

    async fn set_all_read(&self, user_id: Uuid, value: bool) -> Result<()> {
        self.set_all_read_log.lock().unwrap().push(user_id);
        for item in self.rows.lock().unwrap().iter_mut() {
            if item.user_id == user_id {
                item.is_read = value;
            }
        }
        Ok(())
    }
}

/// Router fake that records every replacement.
pub struct FakeRouter {
    current: Mutex<RoutePath>,
    replacements: Mutex<Vec<RoutePath>>,
}

impl FakeRouter {
    pub fn at(path: &str) -> Self {
        Self {
            current: Mutex::new(RoutePath::new(path)),
            replacements: Mutex::new(Vec::new()),
        }
    }

    pub fn current_path(&self) -> RoutePath {
        self.current.lock().unwrap().clone()
    }

    pub fn replacements(&self) -> Vec<RoutePath> {
        self.replacements.lock().unwrap().clone()
    }
}

impl Router for FakeRouter {
    fn current(&self) -> RoutePath {
        self.current.lock().unwrap().clone()
    }

    fn replace(&self, path: &RoutePath) {
        *self.current.lock().unwrap() = path.clone();
        self.replacements.lock().unwrap().push(path.clone());
    }
}

/// Badge fake that records every count it was asked to show.
#[derive(Default)]
pub struct FakeBadge {
    history: Mutex<Vec<usize>>,
}

impl FakeBadge {
    pub fn history(&self) -> Vec<usize> {
        self.history.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<usize> {
        self.history.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl BadgeSink for FakeBadge {
    async fn set_badge_count(&self, count: usize) -> Result<()> {
        self.history.lock().unwrap().push(count);
        Ok(())
    }
}

/// Fully wired core over in-memory fakes.
pub struct CoreHarness {
    pub backend: Arc<FakeBackend>,
    pub profiles: Arc<MemoryProfiles>,
    pub flags: Arc<MemoryFlagStore>,
    pub router: Arc<FakeRouter>,
    pub session: SessionHandle,
    pub resolver: Arc<SessionResolver>,
    pub flow: AuthFlow,
    pub config: CoreConfig,
}

impl CoreHarness {
    pub fn new() -> Self {
        Self::at("/")
    }

    /// Wire everything up with the router parked at `path`.
    pub fn at(path: &str) -> Self {
        let backend = Arc::new(FakeBackend::default());
        let profiles = Arc::new(MemoryProfiles::default());
        let flags = Arc::new(MemoryFlagStore::new());
        let router = Arc::new(FakeRouter::at(path));
        Self::wire(backend, profiles, flags, router)
    }

    /// Fresh process over the same durable stores: a relaunch. The router
    /// restarts at the root route and session memory is gone.
    pub fn restart(&self) -> Self {
        Self::wire(
            self.backend.clone(),
            self.profiles.clone(),
            self.flags.clone(),
            Arc::new(FakeRouter::at("/")),
        )
    }

    fn wire(
        backend: Arc<FakeBackend>,
        profiles: Arc<MemoryProfiles>,
        flags: Arc<MemoryFlagStore>,
        router: Arc<FakeRouter>,
    ) -> Self {
        init_tracing();
        let config = test_config();
        let session = SessionHandle::new();
        let resolver = Arc::new(SessionResolver::new(
            backend.clone(),
            profiles.clone(),
            flags.clone(),
            router.clone(),
            session.clone(),
            config.clone(),
        ));
        let flow = AuthFlow::new(
            backend.clone(),
            profiles.clone(),
            flags.clone(),
            resolver.clone(),
            config.clone(),
        );
        Self {
            backend,
            profiles,
            flags,
            router,
            session,
            resolver,
            flow,
            config,
        }
    }
}

/// Lifecycle signal plus everything the engine needs around the harness.
pub fn lifecycle(initial: AppState) -> (tokio::sync::watch::Sender<AppState>, tokio::sync::watch::Receiver<AppState>) {
    tokio::sync::watch::channel(initial)
}
