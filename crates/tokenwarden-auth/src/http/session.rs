//! Session lifecycle endpoint handlers.
//!
//! # Usage
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use tokenwarden_auth::http::{SessionState, login_handler};
//!
//! let app = Router::new()
//!     .route("/login", post(login_handler))
//!     .with_state(SessionState::new(service));
//! ```
//!
//! Every endpoint takes a JSON body. Bodies that are absent or cannot be
//! parsed are rejected with 400 before the identity store is touched.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::session::SessionService;

// =============================================================================
// State Types
// =============================================================================

/// State shared by the session endpoints.
#[derive(Clone)]
pub struct SessionState {
    /// Session service performing the operations.
    pub service: Arc<SessionService>,
}

impl SessionState {
    /// Creates a new session state.
    pub fn new(service: Arc<SessionService>) -> Self {
        Self { service }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /register`.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "credential")]
    pub password: Option<String>,
}

/// Body of `POST /login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "credential")]
    pub password: Option<String>,
}

/// Body of `POST /private-resource`.
#[derive(Debug, Default, Deserialize)]
pub struct AccessRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of `POST /revoke-token` and `POST /renew-token`.
#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Public view of a registered identity.
#[derive(Debug, Serialize)]
pub struct IdentitySummary {
    pub name: String,
    pub email: String,
}

/// Response of `POST /register`.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub identity: IdentitySummary,
}

/// Response of `POST /login`.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expiry_time: OffsetDateTime,
}

/// Response of `POST /renew-token`.
#[derive(Debug, Serialize)]
pub struct RenewResponse {
    pub message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_until: OffsetDateTime,
}

/// Response carrying only a message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

// =============================================================================
// Handlers
// =============================================================================

/// Registers a new identity.
///
/// # Response
///
/// - 201 Created: identity registered
/// - 400 Bad Request: missing fields, malformed email or body
/// - 409 Conflict: email already registered
pub async fn register_handler(
    State(state): State<SessionState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let Json(request) = payload?;

    let record = state
        .service
        .register(
            field(&request.name),
            field(&request.email),
            field(&request.password),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            identity: IdentitySummary {
                name: record.name,
                email: record.email,
            },
        }),
    ))
}

/// Authenticates credentials and issues a session token.
///
/// # Response
///
/// - 200 OK: token and expiry
/// - 400 Bad Request: missing fields, malformed email or body
/// - 401 Unauthorized: unknown email or wrong password
pub async fn login_handler(
    State(state): State<SessionState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<Json<LoginResponse>> {
    let Json(request) = payload?;

    let issued = state
        .service
        .login(field(&request.email), field(&request.password))
        .await?;

    Ok(Json(LoginResponse {
        message: "Login is successful",
        token: issued.token,
        expiry_time: issued.expires_at,
    }))
}

/// Grants access when the presented token is the identity's current session.
///
/// # Response
///
/// - 200 OK: access granted
/// - 400 Bad Request: missing fields or malformed body
/// - 403 Forbidden: token invalid, superseded, revoked or expired
pub async fn private_resource_handler(
    State(state): State<SessionState>,
    payload: Result<Json<AccessRequest>, JsonRejection>,
) -> AuthResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let email = field(&request.email);
    let token = field(&request.token);

    if email.is_empty() || token.is_empty() {
        return Err(AuthError::invalid_request("Email and token are required"));
    }

    if !state.service.check(email, token).await {
        return Err(AuthError::invalid_token("Invalid or expired token"));
    }

    Ok(Json(MessageResponse {
        message: "Access granted to private resource",
    }))
}

/// Revokes the identity's current session.
///
/// # Response
///
/// - 200 OK: session cleared (also when none was active)
/// - 400 Bad Request: missing email or malformed body
/// - 404 Not Found: unknown email
pub async fn revoke_token_handler(
    State(state): State<SessionState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> AuthResult<Json<MessageResponse>> {
    let Json(request) = payload?;

    state.service.revoke(field(&request.email)).await?;

    Ok(Json(MessageResponse {
        message: "User Token has been revoked",
    }))
}

/// Extends the identity's current session.
///
/// # Response
///
/// - 200 OK: new expiry
/// - 400 Bad Request: missing email, no active session or malformed body
/// - 403 Forbidden: session already lapsed
/// - 404 Not Found: unknown email
pub async fn renew_token_handler(
    State(state): State<SessionState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> AuthResult<Json<RenewResponse>> {
    let Json(request) = payload?;

    let valid_until = state.service.renew(field(&request.email)).await?;

    Ok(Json(RenewResponse {
        message: "Token has been renewed successfully",
        valid_until,
    }))
}
