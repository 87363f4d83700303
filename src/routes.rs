//! Route model shared by the resolver, the guards, and the router seam.

use std::fmt;

use crate::session::Role;

/// Login screen, the landing spot for signed-out users.
pub const LOGIN: &str = "/auth/login";
/// Email confirmation screen, reached from the sign-up flow or a deep link.
pub const CONFIRM: &str = "/auth/confirm";
/// Home route for confirmed teacher accounts.
pub const TEACHER_HOME: &str = "/teacher/dashboard";
/// Home route for confirmed student accounts.
pub const STUDENT_HOME: &str = "/student/dashboard";

const AUTH_SEGMENT: &str = "auth";

/// Home route for a resolved role.
#[must_use]
pub fn home_route(role: Role) -> &'static str {
    match role {
        Role::Teacher => TEACHER_HOME,
        Role::Student => STUDENT_HOME,
    }
}

/// A normalized route path.
///
/// Construction strips query and fragment, forces a leading slash, and drops
/// any trailing slash, so two paths naming the same screen always compare
/// equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoutePath(String);

impl RoutePath {
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        let raw = path.as_ref().trim();
        let raw = raw.split(['?', '#']).next().unwrap_or_default();
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Self("/".to_string());
        }
        Self(format!("/{trimmed}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments with empties removed: `/auth/login` -> `auth`, `login`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// First path segment, `None` at the root.
    #[must_use]
    pub fn top_segment(&self) -> Option<&str> {
        self.segments().next()
    }

    /// Whether the path sits anywhere under the auth area.
    #[must_use]
    pub fn in_auth_area(&self) -> bool {
        self.top_segment() == Some(AUTH_SEGMENT)
    }

    #[must_use]
    pub fn is_login(&self) -> bool {
        self.0 == LOGIN
    }

    /// Whether the path is the confirmation screen or one of its sub-routes.
    #[must_use]
    pub fn is_confirmation(&self) -> bool {
        let mut segments = self.segments();
        segments.next() == Some(AUTH_SEGMENT) && segments.next() == Some("confirm")
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for RoutePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl PartialEq<&str> for RoutePath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
