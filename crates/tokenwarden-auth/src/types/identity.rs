//! Identity records and their active session.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::AuthError;

/// Syntactic `local@domain.tld` shape.
static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex")
});

/// Returns `true` if `email` has the `local@domain.tld` shape.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

// =============================================================================
// Identity Record
// =============================================================================

/// A registered identity, keyed by email.
///
/// The credential is stored verbatim and compared by equality.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Display name.
    pub name: String,

    /// Unique key of the record.
    pub email: String,

    /// Secret presented at login.
    #[serde(alias = "password")]
    pub credential: String,

    /// The single current session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_session: Option<ActiveSession>,
}

impl IdentityRecord {
    /// Creates a record with no active session.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            credential: credential.into(),
            active_session: None,
        }
    }

    /// Returns `true` if `presented` equals the stored credential.
    #[must_use]
    pub fn credential_matches(&self, presented: &str) -> bool {
        self.credential == presented
    }

    /// Returns `true` if the record holds a non-empty session.
    #[must_use]
    pub fn has_active_session(&self) -> bool {
        self.active_session
            .as_ref()
            .is_some_and(|s| !s.token.is_empty())
    }
}

impl fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("credential", &"[REDACTED]")
            .field("active_session", &self.active_session)
            .finish()
    }
}

// =============================================================================
// Active Session
// =============================================================================

/// The `(token, expiry)` pair currently authorized for an identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// The bearer token exactly as issued.
    pub token: String,

    /// Authoritative expiry. May be later than the token's own `exp` claim
    /// after renewal.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl ActiveSession {
    /// Creates a new session.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Returns `true` if the session has lapsed at `now`.
    ///
    /// A session is still valid at the exact instant of its expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }

    /// Pushes the expiry forward by `extension` from its current value and
    /// returns the new expiry.
    ///
    /// Returns `None`, leaving the session unchanged, if the new expiry is
    /// not representable.
    #[must_use]
    pub fn extend(&mut self, extension: Duration) -> Option<OffsetDateTime> {
        self.expires_at = self.expires_at.checked_add(extension)?;
        Some(self.expires_at)
    }
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Input validation errors for identity and session requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityValidationError {
    /// One or more required fields are missing or empty.
    #[error("{0}")]
    MissingFields(&'static str),

    /// The email does not have the `local@domain.tld` shape.
    #[error("Invalid email address")]
    InvalidEmail,
}

impl From<IdentityValidationError> for AuthError {
    fn from(err: IdentityValidationError) -> Self {
        AuthError::invalid_request(err.to_string())
    }
}

/// Fails with `message` unless every field is non-empty.
pub(crate) fn require_fields(
    fields: &[&str],
    message: &'static str,
) -> Result<(), IdentityValidationError> {
    if fields.iter().any(|f| f.is_empty()) {
        return Err(IdentityValidationError::MissingFields(message));
    }
    Ok(())
}

/// Fails unless `email` has the required shape.
pub(crate) fn require_valid_email(email: &str) -> Result<(), IdentityValidationError> {
    if !is_valid_email(email) {
        return Err(IdentityValidationError::InvalidEmail);
    }
    Ok(())
}
