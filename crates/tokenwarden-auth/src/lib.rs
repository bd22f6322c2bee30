//! # tokenwarden-auth
//!
//! Credential registration and session token lifecycle for TokenWarden.
//!
//! This crate provides:
//! - Identity registration keyed by email
//! - Login issuing signed, single-active-session bearer tokens
//! - Token validation, revocation and renewal
//! - Axum handlers exposing the lifecycle over JSON
//!
//! ## Overview
//!
//! Each identity holds at most one active session. A token is accepted only
//! while it is the exact token stored for its identity, its signature
//! verifies, and the stored expiry has not passed. Logging in again
//! supersedes the previous token; revoking clears it; renewing pushes the
//! stored expiry forward without reissuing the token.
//!
//! ## Modules
//!
//! - [`config`] - Issuer, lifetimes and signing secret
//! - [`error`] - Error type and categories
//! - [`types`] - Identity records and active sessions
//! - [`storage`] - Storage trait and in-memory backend
//! - [`token`] - JWT encoding and verification
//! - [`session`] - The session service
//! - [`http`] - Axum HTTP handlers

pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, MAX_SESSION_DURATION, SessionConfig, SigningConfig};
pub use error::{AuthError, ErrorCategory};
pub use http::{SessionState, session_routes};
pub use session::{IssuedSession, KeyedLocks, SessionPolicy, SessionService};
pub use storage::{IdentityStore, InMemoryIdentityStore};
pub use token::{JwtError, JwtService, SessionClaims};
pub use types::{ActiveSession, IdentityRecord, IdentityValidationError, is_valid_email};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokenwarden_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{SessionState, session_routes};
    pub use crate::session::{IssuedSession, SessionPolicy, SessionService};
    pub use crate::storage::{IdentityStore, InMemoryIdentityStore};
    pub use crate::types::{ActiveSession, IdentityRecord};
}
