//! Session resolution: who is signed in, and where they should land.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{
    AuthEvent, AuthEventKind, AuthEventStream, BackendSession, FlagStore, IdentityBackend,
    ProfileRecord, ProfileStore, Router,
};
use crate::config::CoreConfig;
use crate::routes::{self, RoutePath};
use crate::session::flow_state;
use crate::session::{Identity, Role, SessionHandle, SessionState};
use crate::validate::normalize_email;

/// How adopting a session affects navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NavIntent {
    /// Honor suppression and leave auth screens alone. Used on cold start
    /// and for backend-driven events.
    Auto,
    /// User-initiated sign-in: land on the role home route regardless of
    /// suppression, skipping only when already there.
    ForceHome,
}

/// Resolves identity across launches and keeps [`SessionState`] current.
///
/// One resolver runs per app process. All collaborators come in as trait
/// objects, so tests drive it entirely with in-memory fakes.
pub struct SessionResolver {
    backend: Arc<dyn IdentityBackend>,
    profiles: Arc<dyn ProfileStore>,
    flags: Arc<dyn FlagStore>,
    router: Arc<dyn Router>,
    session: SessionHandle,
    config: CoreConfig,
}

impl SessionResolver {
    pub fn new(
        backend: Arc<dyn IdentityBackend>,
        profiles: Arc<dyn ProfileStore>,
        flags: Arc<dyn FlagStore>,
        router: Arc<dyn Router>,
        session: SessionHandle,
        config: CoreConfig,
    ) -> Self {
        Self {
            backend,
            profiles,
            flags,
            router,
            session,
            config,
        }
    }

    /// Cold-start resolution.
    ///
    /// Reads the persisted session, settles [`SessionState`] exactly once,
    /// and fires the one-time role redirect when nothing suppresses it.
    /// Backend failures resolve to [`SessionState::NoSession`]: the app
    /// never hangs on the splash state.
    pub async fn resolve_on_start(&self) {
        self.session.set(SessionState::Initializing);
        match self.backend.session().await {
            Ok(Some(backend_session)) => {
                self.adopt_session(&backend_session, NavIntent::Auto, false).await;
            }
            Ok(None) => {
                debug!("no persisted session");
                self.session.set(SessionState::NoSession);
            }
            Err(err) => {
                warn!("session lookup failed, resolving signed out: {err}");
                self.session.set(SessionState::NoSession);
            }
        }
    }

    /// Re-enter [`SessionState::Initializing`] and resolve again.
    pub async fn refresh(&self) {
        self.resolve_on_start().await;
    }

    /// Apply one backend auth event.
    pub async fn on_auth_event(&self, event: AuthEvent) {
        match event.kind {
            AuthEventKind::SignedOut => self.handle_signed_out(),
            AuthEventKind::SignedIn | AuthEventKind::UserUpdated => match event.session {
                Some(backend_session) => {
                    self.adopt_session(&backend_session, NavIntent::Auto, true).await;
                }
                None => warn!(kind = ?event.kind, "auth event without a session payload"),
            },
        }
    }

    /// Drive the resolver from a backend event stream until it closes.
    pub async fn run(&self, mut events: AuthEventStream) {
        while let Some(event) = events.recv().await {
            self.on_auth_event(event).await;
        }
        debug!("auth event stream closed");
    }

    /// Clear identity and park the app on the login screen.
    pub(crate) fn handle_signed_out(&self) {
        self.session.set(SessionState::NoSession);
        self.redirect_if_away(&RoutePath::new(routes::LOGIN));
    }

    /// Adopt a backend session: resolve the role, publish the identity, and
    /// navigate per `nav`.
    ///
    /// `merge_by_email` additionally re-keys a profile row found only by
    /// email onto this session's id, healing identities created out of band.
    pub(crate) async fn adopt_session(
        &self,
        backend_session: &BackendSession,
        nav: NavIntent,
        merge_by_email: bool,
    ) -> Identity {
        let email = normalize_email(&backend_session.email);

        if backend_session.is_unconfirmed_signup() {
            // Confirmation still outstanding: no profile work, no navigation.
            let identity = Identity {
                id: backend_session.user_id,
                email,
                role: self.fallback_role(backend_session),
            };
            self.session.set(SessionState::Active {
                identity: identity.clone(),
                pending_confirmation: true,
            });
            return identity;
        }

        let role = self.resolve_role(backend_session, &email, merge_by_email).await;
        let identity = Identity {
            id: backend_session.user_id,
            email,
            role,
        };
        info!(user = %identity.id, role = %identity.role, "session resolved");
        self.session.set(SessionState::Active {
            identity: identity.clone(),
            pending_confirmation: false,
        });

        match nav {
            NavIntent::ForceHome => {
                self.redirect_if_away(&RoutePath::new(routes::home_route(role)));
            }
            NavIntent::Auto => {
                let suppressed = flow_state::load(self.flags.as_ref())
                    .await
                    .suppresses_navigation();
                let current = self.router.current();
                if !suppressed && !current.in_auth_area() {
                    self.redirect_if_away(&RoutePath::new(routes::home_route(role)));
                }
            }
        }
        identity
    }

    /// Resolve the role, profile row first.
    ///
    /// Profile failures never block resolution: the role falls back to the
    /// session metadata hint, then to the configured default. The create
    /// path only runs when the lookup definitively returned absent, so a
    /// transient read error can never overwrite an existing row's role.
    async fn resolve_role(
        &self,
        backend_session: &BackendSession,
        email: &str,
        merge_by_email: bool,
    ) -> Role {
        match self.profiles.get(backend_session.user_id).await {
            Ok(Some(profile)) => profile.role,
            Ok(None) => {
                if merge_by_email {
                    if let Some(role) = self.merge_out_of_band(backend_session, email).await {
                        return role;
                    }
                }
                let record = ProfileRecord {
                    id: backend_session.user_id,
                    email: email.to_string(),
                    role: self.fallback_role(backend_session),
                    display_name: None,
                };
                if let Err(err) = self.profiles.upsert(&record).await {
                    warn!(user = %record.id, "profile upsert failed: {err:#}");
                }
                record.role
            }
            Err(err) => {
                warn!(user = %backend_session.user_id, "profile fetch failed: {err:#}");
                self.fallback_role(backend_session)
            }
        }
    }

    /// Role when no profile row is usable: session hint, then the default.
    fn fallback_role(&self, backend_session: &BackendSession) -> Role {
        backend_session
            .role_hint
            .unwrap_or_else(|| self.config.default_role())
    }

    /// Re-key a row that matches by email but not by id.
    async fn merge_out_of_band(
        &self,
        backend_session: &BackendSession,
        email: &str,
    ) -> Option<Role> {
        match self.profiles.find_by_email(email).await {
            Ok(Some(existing)) => {
                info!(user = %backend_session.user_id, "merging out-of-band profile by email");
                match self.profiles.rebind_id(email, backend_session.user_id).await {
                    Ok(Some(updated)) => Some(updated.role),
                    // Row vanished between lookup and rebind; its role is
                    // still the best answer.
                    Ok(None) => Some(existing.role),
                    Err(err) => {
                        warn!(user = %backend_session.user_id, "profile rebind failed: {err:#}");
                        Some(existing.role)
                    }
                }
            }
            Ok(None) => None,
            Err(err) => {
                warn!("profile email lookup failed: {err:#}");
                None
            }
        }
    }

    fn redirect_if_away(&self, target: &RoutePath) {
        if self.router.current() != *target {
            self.router.replace(target);
        }
    }
}
