//! HTTP handlers for the session endpoints.
//!
//! # Available Handlers
//!
//! - [`session`] - registration, login, access check, revocation, renewal
//! - [`error`] - JSON error responses for [`AuthError`](crate::AuthError)

pub mod error;
pub mod session;

use axum::{Router, routing::post};

pub use error::{INVALID_JSON_MESSAGE, status_for};
pub use session::{
    AccessRequest, EmailRequest, IdentitySummary, LoginRequest, LoginResponse, MessageResponse,
    RegisterRequest, RegisterResponse, RenewResponse, SessionState, login_handler,
    private_resource_handler, register_handler, renew_token_handler, revoke_token_handler,
};

/// Builds a router serving every session endpoint.
pub fn session_routes(state: SessionState) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/private-resource", post(private_resource_handler))
        .route("/revoke-token", post(revoke_token_handler))
        .route("/renew-token", post(renew_token_handler))
        .with_state(state)
}
