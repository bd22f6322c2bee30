//! Session service: registration, login, validation, revocation, renewal.
//!
//! Every identity holds at most one active session. Issuing a new session
//! overwrites the stored token, so earlier tokens stop validating even
//! though their signatures are still good. A token is accepted only when
//!
//! 1. it is byte-equal to the token stored for the claimed email,
//! 2. its signature and issuer verify under the process key, and
//! 3. the stored expiry has not passed.
//!
//! Expiry is never swept; lapsed sessions are detected when they are next
//! checked or renewed.
//!
//! # Usage
//!
//! ```ignore
//! use tokenwarden_auth::session::SessionService;
//!
//! let service = SessionService::from_config(store, &auth_config)?;
//! service.register("A", "a@x.com", "p").await?;
//! let issued = service.login("a@x.com", "p").await?;
//! assert!(service.check("a@x.com", &issued.token).await);
//! ```

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::config::{AuthConfig, SessionConfig};
use crate::error::AuthError;
use crate::session::locks::KeyedLocks;
use crate::storage::IdentityStore;
use crate::token::jwt::{JwtService, SessionClaims};
use crate::types::identity::{require_fields, require_valid_email};
use crate::types::{ActiveSession, IdentityRecord};

/// Message returned for every failed login, whatever the cause.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Lifetimes applied by the session service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Lifetime of a freshly issued session.
    pub token_lifetime: Duration,

    /// Amount added to the stored expiry on each renewal.
    pub renewal_extension: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::hours(1),
            renewal_extension: Duration::hours(1),
        }
    }
}

impl SessionPolicy {
    /// Sets the session lifetime.
    #[must_use]
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Sets the renewal extension.
    #[must_use]
    pub fn with_renewal_extension(mut self, extension: Duration) -> Self {
        self.renewal_extension = extension;
        self
    }
}

impl TryFrom<&SessionConfig> for SessionPolicy {
    type Error = AuthError;

    fn try_from(config: &SessionConfig) -> Result<Self, Self::Error> {
        let token_lifetime = Duration::try_from(config.token_lifetime)
            .map_err(|e| AuthError::configuration(format!("token_lifetime: {e}")))?;
        let renewal_extension = Duration::try_from(config.renewal_extension)
            .map_err(|e| AuthError::configuration(format!("renewal_extension: {e}")))?;
        Ok(Self {
            token_lifetime,
            renewal_extension,
        })
    }
}

/// A session returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    /// The bearer token.
    pub token: String,

    /// When the session lapses unless renewed.
    pub expires_at: OffsetDateTime,
}

/// Service owning the identity session lifecycle.
pub struct SessionService {
    /// Identity record storage.
    store: Arc<dyn IdentityStore>,

    /// Token signer/verifier bound to the process secret.
    jwt_service: Arc<JwtService>,

    /// Serialises read-modify-write sequences per email.
    locks: KeyedLocks,

    /// Lifetimes.
    policy: SessionPolicy,
}

impl SessionService {
    /// Creates a new session service.
    #[must_use]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        jwt_service: Arc<JwtService>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            jwt_service,
            locks: KeyedLocks::new(),
            policy,
        }
    }

    /// Creates a session service from configuration.
    ///
    /// An empty signing secret yields a randomly generated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(store: Arc<dyn IdentityStore>, config: &AuthConfig) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let jwt_service = if config.signing.secret.is_empty() {
            tracing::warn!(
                "No signing secret configured; generated an ephemeral key, sessions will not survive a restart"
            );
            JwtService::generate(&config.issuer)
        } else {
            JwtService::from_secret(config.signing.secret.as_bytes(), &config.issuer)
                .map_err(|e| AuthError::configuration(e.to_string()))?
        };

        let policy = SessionPolicy::try_from(&config.session)?;
        Ok(Self::new(store, Arc::new(jwt_service), policy))
    }

    /// Returns the lifetimes in effect.
    #[must_use]
    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Returns the underlying identity store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Registers a new identity.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if a field is empty or the email is malformed
    /// - `Conflict` if the email is already registered
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        credential: &str,
    ) -> AuthResult<IdentityRecord> {
        require_fields(
            &[name, email, credential],
            "Name, email, and password are required",
        )?;
        require_valid_email(email)?;

        let _guard = self.locks.lock(email).await;

        if self.store.get(email).await?.is_some() {
            tracing::debug!(email = %email, "Registration rejected: email already registered");
            return Err(AuthError::conflict("Email is already registered"));
        }

        let record = IdentityRecord::new(name, email, credential);
        self.store.put(&record).await?;

        tracing::info!(email = %email, "Identity registered");
        Ok(record)
    }

    /// Authenticates credentials and issues a new session.
    ///
    /// Any session previously issued to the identity is superseded.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if a field is empty or the email is malformed
    /// - `Unauthorized` if the email is unknown or the credential differs
    pub async fn login(&self, email: &str, credential: &str) -> AuthResult<IssuedSession> {
        require_fields(&[email, credential], "Email and password are required")?;
        require_valid_email(email)?;

        let _guard = self.locks.lock(email).await;

        let mut record = match self.store.get(email).await? {
            Some(record) if record.credential_matches(credential) => record,
            _ => {
                tracing::debug!(email = %email, "Login rejected");
                return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        let expires_at = OffsetDateTime::now_utc()
            .checked_add(self.policy.token_lifetime)
            .ok_or_else(|| AuthError::configuration("Session lifetime is out of range"))?;
        let claims = SessionClaims::new(self.jwt_service.issuer(), email, expires_at);
        let token = self
            .jwt_service
            .encode(&claims)
            .map_err(|e| AuthError::internal(e.to_string()))?;

        let superseded = record.has_active_session();
        record.active_session = Some(ActiveSession::new(token.clone(), expires_at));
        self.store.put(&record).await?;

        tracing::info!(email = %email, %expires_at, superseded, "Session issued");
        Ok(IssuedSession { token, expires_at })
    }

    /// Returns `true` if `token` is the current, unexpired, genuine session
    /// for `email`.
    ///
    /// Never fails: unknown identities, mismatched or malformed tokens,
    /// lapsed sessions and storage failures all yield `false`. Performs no
    /// writes.
    pub async fn check(&self, email: &str, token: &str) -> bool {
        let record = match self.store.get(email).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Session check failed to load identity");
                return false;
            }
        };
        self.is_session_valid(&record, token, OffsetDateTime::now_utc())
    }

    /// Clears the active session for `email`.
    ///
    /// Revoking an identity with no session succeeds.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the email is empty
    /// - `NotFound` if the email is not registered
    pub async fn revoke(&self, email: &str) -> AuthResult<()> {
        require_fields(&[email], "Email is required")?;

        let _guard = self.locks.lock(email).await;

        let mut record = self
            .store
            .get(email)
            .await?
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        let had_session = record.active_session.take().is_some();
        self.store.put(&record).await?;

        tracing::info!(email = %email, had_session, "Session revoked");
        Ok(())
    }

    /// Extends a still-valid session and returns the new expiry.
    ///
    /// The extension is added to the stored expiry, not to the current
    /// time, so repeated renewals accumulate. The token is unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the email is empty
    /// - `NotFound` if the email is not registered
    /// - `InvalidState` if the identity has no session, or the new expiry
    ///   would be out of range
    /// - `InvalidToken` if the session has lapsed or no longer verifies
    pub async fn renew(&self, email: &str) -> AuthResult<OffsetDateTime> {
        require_fields(&[email], "Email is required")?;

        let _guard = self.locks.lock(email).await;

        let mut record = self
            .store
            .get(email)
            .await?
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        let stored_token = match &record.active_session {
            Some(session) if !session.token.is_empty() => session.token.clone(),
            _ => return Err(AuthError::invalid_state("No token is found for this user")),
        };

        if !self.is_session_valid(&record, &stored_token, OffsetDateTime::now_utc()) {
            tracing::debug!(email = %email, "Renewal rejected: session lapsed or invalid");
            return Err(AuthError::invalid_token("Token has expired. Can not renew."));
        }

        let session = record
            .active_session
            .as_mut()
            .ok_or_else(|| AuthError::internal("Session vanished during renewal"))?;
        let Some(expires_at) = session.extend(self.policy.renewal_extension) else {
            tracing::warn!(email = %email, "Renewal rejected: expiry would overflow");
            return Err(AuthError::invalid_state(
                "Session expiry cannot be extended further",
            ));
        };
        self.store.put(&record).await?;

        tracing::info!(email = %email, %expires_at, "Session renewed");
        Ok(expires_at)
    }

    /// Validates `token` against a loaded record at `now`.
    fn is_session_valid(&self, record: &IdentityRecord, token: &str, now: OffsetDateTime) -> bool {
        let Some(session) = &record.active_session else {
            return false;
        };
        if session.token.is_empty() || session.token != token {
            return false;
        }
        if let Err(e) = self.jwt_service.decode_for_subject(token, &record.email) {
            tracing::debug!(email = %record.email, error = %e, "Stored session token failed verification");
            return false;
        }
        !session.is_expired_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryIdentityStore;
    use async_trait::async_trait;

    fn service_with_store(store: Arc<dyn IdentityStore>) -> SessionService {
        let jwt = JwtService::from_secret(b"test-secret", "tokenwarden").unwrap();
        SessionService::new(store, Arc::new(jwt), SessionPolicy::default())
    }

    fn service() -> (SessionService, Arc<InMemoryIdentityStore>) {
        let store = Arc::new(InMemoryIdentityStore::new());
        (service_with_store(store.clone()), store)
    }

    async fn registered() -> (SessionService, Arc<InMemoryIdentityStore>) {
        let (service, store) = service();
        service.register("A", "a@x.com", "p").await.unwrap();
        (service, store)
    }

    /// Moves the stored expiry of `email` to `expires_at`.
    async fn set_stored_expiry(
        store: &InMemoryIdentityStore,
        email: &str,
        expires_at: OffsetDateTime,
    ) {
        let mut record = store.get(email).await.unwrap().unwrap();
        record.active_session.as_mut().unwrap().expires_at = expires_at;
        store.put(&record).await.unwrap();
    }

    // -------------------------------------------------------------------------
    // register
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_register_persists_record_without_session() {
        let (service, store) = service();
        let record = service.register("A", "a@x.com", "p").await.unwrap();

        assert_eq!(record.email, "a@x.com");
        assert!(record.active_session.is_none());
        assert_eq!(store.get("a@x.com").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_register_missing_fields() {
        let (service, store) = service();
        for (name, email, credential) in [("", "a@x.com", "p"), ("A", "", "p"), ("A", "a@x.com", "")]
        {
            let err = service.register(name, email, credential).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidRequest { .. }));
            assert_eq!(err.message(), "Name, email, and password are required");
        }
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_malformed_email() {
        let (service, _) = service();
        for email in ["abc", "a@b"] {
            let err = service.register("A", email, "p").await.unwrap_err();
            assert_eq!(err.message(), "Invalid email address");
        }
        assert!(service.register("A", "a@b.c", "p").await.is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate_is_conflict_and_keeps_first_record() {
        let (service, store) = registered().await;

        let err = service.register("B", "a@x.com", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));

        let record = store.get("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.name, "A");
        assert_eq!(record.credential, "p");
    }

    // -------------------------------------------------------------------------
    // login
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_issues_one_hour_session() {
        let (service, store) = registered().await;
        let before = OffsetDateTime::now_utc();
        let issued = service.login("a@x.com", "p").await.unwrap();
        let after = OffsetDateTime::now_utc();

        assert!(issued.expires_at >= before + Duration::hours(1));
        assert!(issued.expires_at <= after + Duration::hours(1));

        let stored = store.get("a@x.com").await.unwrap().unwrap();
        let session = stored.active_session.unwrap();
        assert_eq!(session.token, issued.token);
        assert_eq!(session.expires_at, issued.expires_at);
    }

    #[tokio::test]
    async fn test_login_failures_are_undifferentiated() {
        let (service, _) = registered().await;

        let unknown = service.login("nobody@x.com", "p").await.unwrap_err();
        let wrong = service.login("a@x.com", "wrong").await.unwrap_err();

        assert!(matches!(unknown, AuthError::Unauthorized { .. }));
        assert!(matches!(wrong, AuthError::Unauthorized { .. }));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_login_validation() {
        let (service, _) = registered().await;

        let err = service.login("", "p").await.unwrap_err();
        assert_eq!(err.message(), "Email and password are required");

        let err = service.login("a@x.com", "").await.unwrap_err();
        assert_eq!(err.message(), "Email and password are required");

        let err = service.login("abc", "p").await.unwrap_err();
        assert_eq!(err.message(), "Invalid email address");
    }

    // -------------------------------------------------------------------------
    // check
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_check_after_login() {
        let (service, _) = registered().await;
        let issued = service.login("a@x.com", "p").await.unwrap();
        assert!(service.check("a@x.com", &issued.token).await);
    }

    #[tokio::test]
    async fn test_check_unknown_identity_or_no_session() {
        let (service, _) = registered().await;
        assert!(!service.check("nobody@x.com", "whatever").await);
        assert!(!service.check("a@x.com", "").await);
        assert!(!service.check("a@x.com", "whatever").await);
    }

    #[tokio::test]
    async fn test_check_rejects_token_for_other_identity() {
        let (service, _) = registered().await;
        service.register("B", "b@x.com", "q").await.unwrap();
        let a = service.login("a@x.com", "p").await.unwrap();
        let b = service.login("b@x.com", "q").await.unwrap();

        assert!(!service.check("a@x.com", &b.token).await);
        assert!(!service.check("b@x.com", &a.token).await);
    }

    #[tokio::test]
    async fn test_check_rejects_lapsed_session() {
        let (service, store) = registered().await;
        let issued = service.login("a@x.com", "p").await.unwrap();

        set_stored_expiry(
            &store,
            "a@x.com",
            OffsetDateTime::now_utc() - Duration::seconds(1),
        )
        .await;

        assert!(!service.check("a@x.com", &issued.token).await);
    }

    #[tokio::test]
    async fn test_check_rejects_stored_token_with_bad_signature() {
        let (service, store) = registered().await;
        service.login("a@x.com", "p").await.unwrap();

        let forger = JwtService::from_secret(b"forged", "tokenwarden").unwrap();
        let forged = forger
            .encode(&SessionClaims::new(
                "tokenwarden",
                "a@x.com",
                OffsetDateTime::now_utc() + Duration::hours(1),
            ))
            .unwrap();
        let mut record = store.get("a@x.com").await.unwrap().unwrap();
        record.active_session.as_mut().unwrap().token = forged.clone();
        store.put(&record).await.unwrap();

        assert!(!service.check("a@x.com", &forged).await);
    }

    #[tokio::test]
    async fn test_check_does_not_write() {
        let (service, store) = registered().await;
        let issued = service.login("a@x.com", "p").await.unwrap();
        let before = store.get("a@x.com").await.unwrap();

        service.check("a@x.com", &issued.token).await;
        service.check("a@x.com", "garbage").await;

        assert_eq!(store.get("a@x.com").await.unwrap(), before);
    }

    // -------------------------------------------------------------------------
    // supersede / revoke
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_second_login_supersedes_first_token() {
        let (service, _) = registered().await;
        let t1 = service.login("a@x.com", "p").await.unwrap();
        let t2 = service.login("a@x.com", "p").await.unwrap();

        assert_ne!(t1.token, t2.token);
        assert!(!service.check("a@x.com", &t1.token).await);
        assert!(service.check("a@x.com", &t2.token).await);
    }

    #[tokio::test]
    async fn test_revoke_invalidates_token() {
        let (service, store) = registered().await;
        let issued = service.login("a@x.com", "p").await.unwrap();

        service.revoke("a@x.com").await.unwrap();

        assert!(!service.check("a@x.com", &issued.token).await);
        let record = store.get("a@x.com").await.unwrap().unwrap();
        assert!(record.active_session.is_none());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (service, _) = registered().await;
        service.revoke("a@x.com").await.unwrap();
        service.revoke("a@x.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_errors() {
        let (service, _) = registered().await;

        let err = service.revoke("").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));

        let err = service.revoke("nobody@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_failed_requests_for_unknown_emails_leave_no_locks() {
        let (service, _) = registered().await;

        for i in 0..200 {
            let email = format!("u{i}@x.com");
            assert!(service.login(&email, "p").await.is_err());
            assert!(service.revoke(&email).await.is_err());
            assert!(service.renew(&email).await.is_err());
        }
        service.login("a@x.com", "p").await.unwrap();

        assert!(service.locks.is_empty());
    }

    // -------------------------------------------------------------------------
    // renew
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_renew_extends_from_stored_expiry() {
        let (service, store) = registered().await;
        let issued = service.login("a@x.com", "p").await.unwrap();

        let renewed = service.renew("a@x.com").await.unwrap();
        assert_eq!(renewed, issued.expires_at + Duration::hours(1));

        let renewed_again = service.renew("a@x.com").await.unwrap();
        assert_eq!(renewed_again, issued.expires_at + Duration::hours(2));

        let session = store
            .get("a@x.com")
            .await
            .unwrap()
            .unwrap()
            .active_session
            .unwrap();
        assert_eq!(session.token, issued.token);
        assert_eq!(session.expires_at, renewed_again);
        assert!(service.check("a@x.com", &issued.token).await);
    }

    #[tokio::test]
    async fn test_renew_keeps_token_valid_past_its_own_exp_claim() {
        let (service, store) = registered().await;
        let issued = service.login("a@x.com", "p").await.unwrap();

        // Token's exp claim is now an hour ago; the stored expiry is in the future.
        set_stored_expiry(
            &store,
            "a@x.com",
            OffsetDateTime::now_utc() + Duration::minutes(5),
        )
        .await;
        let mut record = store.get("a@x.com").await.unwrap().unwrap();
        let jwt = JwtService::from_secret(b"test-secret", "tokenwarden").unwrap();
        let old_exp_token = jwt
            .encode(&SessionClaims::new(
                "tokenwarden",
                "a@x.com",
                OffsetDateTime::now_utc() - Duration::hours(1),
            ))
            .unwrap();
        record.active_session.as_mut().unwrap().token = old_exp_token.clone();
        store.put(&record).await.unwrap();

        assert!(service.check("a@x.com", &old_exp_token).await);
        assert!(service.renew("a@x.com").await.is_ok());
        assert!(!service.check("a@x.com", &issued.token).await);
    }

    #[tokio::test]
    async fn test_renew_without_session_is_state_error() {
        let (service, _) = registered().await;
        let err = service.renew("a@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidState { .. }));

        service.login("a@x.com", "p").await.unwrap();
        service.revoke("a@x.com").await.unwrap();
        let err = service.renew("a@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_renew_lapsed_session_is_auth_error() {
        let (service, store) = registered().await;
        service.login("a@x.com", "p").await.unwrap();
        let lapsed_at = OffsetDateTime::now_utc() - Duration::seconds(1);
        set_stored_expiry(&store, "a@x.com", lapsed_at).await;

        let err = service.renew("a@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));

        let session = store
            .get("a@x.com")
            .await
            .unwrap()
            .unwrap()
            .active_session
            .unwrap();
        assert_eq!(session.expires_at, lapsed_at);
    }

    #[tokio::test]
    async fn test_renew_errors() {
        let (service, _) = registered().await;
        assert!(matches!(
            service.renew("").await.unwrap_err(),
            AuthError::InvalidRequest { .. }
        ));
        assert!(matches!(
            service.renew("nobody@x.com").await.unwrap_err(),
            AuthError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_custom_policy() {
        let store = Arc::new(InMemoryIdentityStore::new());
        let jwt = JwtService::from_secret(b"test-secret", "tokenwarden").unwrap();
        let policy = SessionPolicy::default()
            .with_token_lifetime(Duration::minutes(5))
            .with_renewal_extension(Duration::minutes(10));
        let service = SessionService::new(store, Arc::new(jwt), policy);

        service.register("A", "a@x.com", "p").await.unwrap();
        let issued = service.login("a@x.com", "p").await.unwrap();
        assert!(issued.expires_at <= OffsetDateTime::now_utc() + Duration::minutes(5));

        let renewed = service.renew("a@x.com").await.unwrap();
        assert_eq!(renewed, issued.expires_at + Duration::minutes(10));
    }

    fn service_with_policy(policy: SessionPolicy) -> (SessionService, Arc<InMemoryIdentityStore>) {
        let store = Arc::new(InMemoryIdentityStore::new());
        let jwt = JwtService::from_secret(b"test-secret", "tokenwarden").unwrap();
        (
            SessionService::new(store.clone(), Arc::new(jwt), policy),
            store,
        )
    }

    #[tokio::test]
    async fn test_renew_past_max_date_fails_without_write() {
        let (service, store) = service_with_policy(
            SessionPolicy::default().with_renewal_extension(Duration::days(365 * 5000)),
        );
        service.register("A", "a@x.com", "p").await.unwrap();
        let issued = service.login("a@x.com", "p").await.unwrap();

        let first = service.renew("a@x.com").await.unwrap();
        let err = service.renew("a@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidState { .. }));

        let session = store
            .get("a@x.com")
            .await
            .unwrap()
            .unwrap()
            .active_session
            .unwrap();
        assert_eq!(session.expires_at, first);
        assert!(service.check("a@x.com", &issued.token).await);
    }

    #[tokio::test]
    async fn test_login_with_unrepresentable_lifetime_fails_without_write() {
        let (service, store) = service_with_policy(
            SessionPolicy::default().with_token_lifetime(Duration::days(365 * 10_000)),
        );
        service.register("A", "a@x.com", "p").await.unwrap();

        let err = service.login("a@x.com", "p").await.unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));

        let record = store.get("a@x.com").await.unwrap().unwrap();
        assert!(record.active_session.is_none());
    }

    // -------------------------------------------------------------------------
    // scenario
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        let (service, _) = service();
        service.register("A", "a@x.com", "p").await.unwrap();

        let t1 = service.login("a@x.com", "p").await.unwrap();
        assert!(service.check("a@x.com", &t1.token).await);

        let t2 = service.login("a@x.com", "p").await.unwrap();
        assert_ne!(t1.token, t2.token);
        assert!(!service.check("a@x.com", &t1.token).await);
        assert!(service.check("a@x.com", &t2.token).await);

        service.revoke("a@x.com").await.unwrap();
        assert!(!service.check("a@x.com", &t2.token).await);
    }

    // -------------------------------------------------------------------------
    // configuration / concurrency / storage failures
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_from_config_with_secret_is_stable_across_instances() {
        let store: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());
        let mut config = AuthConfig::default();
        config.signing.secret = "shared".to_string();

        let first = SessionService::from_config(store.clone(), &config).unwrap();
        first.register("A", "a@x.com", "p").await.unwrap();
        let issued = first.login("a@x.com", "p").await.unwrap();

        let restarted = SessionService::from_config(store, &config).unwrap();
        assert!(restarted.check("a@x.com", &issued.token).await);
    }

    #[tokio::test]
    async fn test_from_config_without_secret_uses_ephemeral_key() {
        let store: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());
        let config = AuthConfig::default();

        let first = SessionService::from_config(store.clone(), &config).unwrap();
        first.register("A", "a@x.com", "p").await.unwrap();
        let issued = first.login("a@x.com", "p").await.unwrap();
        assert!(first.check("a@x.com", &issued.token).await);

        let restarted = SessionService::from_config(store, &config).unwrap();
        assert!(!restarted.check("a@x.com", &issued.token).await);
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_config() {
        let store: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());
        let mut config = AuthConfig::default();
        config.session.renewal_extension = std::time::Duration::ZERO;

        let err = SessionService::from_config(store, &config).err().unwrap();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }

    /// Store that yields between every operation to widen race windows.
    struct YieldingStore(InMemoryIdentityStore);

    #[async_trait]
    impl IdentityStore for YieldingStore {
        async fn get(&self, email: &str) -> AuthResult<Option<IdentityRecord>> {
            tokio::task::yield_now().await;
            let record = self.0.get(email).await;
            tokio::task::yield_now().await;
            record
        }

        async fn put(&self, record: &IdentityRecord) -> AuthResult<()> {
            tokio::task::yield_now().await;
            self.0.put(record).await
        }

        async fn list(&self) -> AuthResult<Vec<IdentityRecord>> {
            self.0.list().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_renewals_are_not_lost() {
        let service = Arc::new(service_with_store(Arc::new(YieldingStore(
            InMemoryIdentityStore::new(),
        ))));
        service.register("A", "a@x.com", "p").await.unwrap();
        let issued = service.login("a@x.com", "p").await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.renew("a@x.com").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = service.store().get("a@x.com").await.unwrap().unwrap();
        assert_eq!(
            record.active_session.unwrap().expires_at,
            issued.expires_at + Duration::hours(16)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_admits_exactly_one() {
        let service = Arc::new(service_with_store(Arc::new(YieldingStore(
            InMemoryIdentityStore::new(),
        ))));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .register(&format!("A{i}"), "a@x.com", "p")
                        .await
                        .is_ok()
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    /// Store whose every operation fails.
    struct FailingStore;

    #[async_trait]
    impl IdentityStore for FailingStore {
        async fn get(&self, _email: &str) -> AuthResult<Option<IdentityRecord>> {
            Err(AuthError::storage("disk unavailable"))
        }

        async fn put(&self, _record: &IdentityRecord) -> AuthResult<()> {
            Err(AuthError::storage("disk unavailable"))
        }

        async fn list(&self) -> AuthResult<Vec<IdentityRecord>> {
            Err(AuthError::storage("disk unavailable"))
        }
    }

    #[tokio::test]
    async fn test_storage_failures() {
        let service = service_with_store(Arc::new(FailingStore));

        assert!(!service.check("a@x.com", "token").await);
        assert!(matches!(
            service.register("A", "a@x.com", "p").await.unwrap_err(),
            AuthError::Storage { .. }
        ));
        assert!(matches!(
            service.login("a@x.com", "p").await.unwrap_err(),
            AuthError::Storage { .. }
        ));
        assert!(matches!(
            service.revoke("a@x.com").await.unwrap_err(),
            AuthError::Storage { .. }
        ));
    }
}
