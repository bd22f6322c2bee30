//! JWT session token generation and verification.
//!
//! Session tokens are HS256 JWTs signed with a process-wide shared secret.
//! The token binds a subject (the identity's email) to an expiry; a random
//! `jti` keeps two tokens issued in the same second distinct.
//!
//! ## Example
//!
//! ```ignore
//! use tokenwarden_auth::token::jwt::{JwtService, SessionClaims};
//!
//! let jwt_service = JwtService::from_secret(b"secret", "tokenwarden")?;
//! let claims = SessionClaims::new("tokenwarden", "a@x.com", expires_at);
//! let token = jwt_service.encode(&claims)?;
//! let data = jwt_service.decode_for_subject(&token, "a@x.com")?;
//! ```

use std::fmt;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Length of generated secrets in bytes.
const GENERATED_SECRET_LEN: usize = 32;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Issuer.
    pub iss: String,

    /// Subject (identity email).
    pub sub: String,

    /// Expiration time at issuance (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Token ID.
    pub jti: String,
}

impl SessionClaims {
    /// Creates claims for `subject` expiring at `expires_at`.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            exp: expires_at.unix_timestamp(),
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for signing and verifying session tokens.
///
/// This service is thread-safe (`Send + Sync`) and is shared by every
/// session operation for the lifetime of the process.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    /// Creates a service from a shared secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty.
    pub fn from_secret(secret: &[u8], issuer: impl Into<String>) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::invalid_key("Signing secret must not be empty"));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        })
    }

    /// Creates a service with a freshly generated random secret.
    #[must_use]
    pub fn generate(issuer: impl Into<String>) -> Self {
        let mut secret = [0u8; GENERATED_SECRET_LEN];
        OsRng.fill_bytes(&mut secret);
        Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            issuer: issuer.into(),
        }
    }

    /// Encodes claims into a signed JWT string.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Verifies the signature and issuer of a token and returns its claims.
    ///
    /// The `exp` claim is not enforced here: the stored session expiry is
    /// authoritative and may have been extended past it by renewal.
    ///
    /// # Errors
    /// Returns an error if the token is malformed or the signature or issuer
    /// does not verify.
    pub fn decode(&self, token: &str) -> Result<TokenData<SessionClaims>, JwtError> {
        let validation = self.validation();
        decode(token, &self.decoding_key, &validation).map_err(JwtError::from)
    }

    /// Like [`decode`](Self::decode), additionally requiring `sub` to equal
    /// `subject`.
    ///
    /// # Errors
    /// Returns an error if decoding fails or the subject differs.
    pub fn decode_for_subject(
        &self,
        token: &str,
        subject: &str,
    ) -> Result<TokenData<SessionClaims>, JwtError> {
        let mut validation = self.validation();
        validation.sub = Some(subject.to_string());
        decode(token, &self.decoding_key, &validation).map_err(JwtError::from)
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation
    }
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &"HS256")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
