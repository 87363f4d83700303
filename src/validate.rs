//! Input validation helpers shared by the auth flows.

use regex::Regex;

/// Minimum accepted password length for new accounts.
pub(crate) const MIN_PASSWORD_LEN: usize = 8;

/// Normalize an email for lookups and uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Pull a wait-time hint (in seconds) out of a backend rate-limit message.
///
/// Backends phrase the hint inconsistently ("retry after 42 seconds",
/// "wait 30s"); the number directly attached to a seconds unit is the only
/// reliable signal. Returns `None` when no such hint is present.
pub(crate) fn parse_retry_after_secs(message: &str) -> Option<u64> {
    let regex = Regex::new(r"(?i)(\d+)\s*(?:s\b|sec\b|secs\b|seconds?\b)").ok()?;
    regex
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}
