//! Error response handling for the session endpoints.
//!
//! Every failure is rendered as `{"error": <code>, "message": <text>}` with
//! the status code of its variant.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

/// Message returned for bodies that are absent or not valid JSON.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON data";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = if status.is_server_error() {
            tracing::error!(category = %self.category(), error = %self, "Request failed");
            "Internal server error"
        } else {
            self.message()
        };

        let body = json!({
            "error": self.error_code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

/// Maps an error variant to its HTTP status.
#[must_use]
pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidRequest { .. } | AuthError::InvalidState { .. } => {
            StatusCode::BAD_REQUEST
        }
        AuthError::Conflict { .. } => StatusCode::CONFLICT,
        AuthError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        AuthError::InvalidToken { .. } => StatusCode::FORBIDDEN,
        AuthError::NotFound { .. } => StatusCode::NOT_FOUND,
        AuthError::Storage { .. }
        | AuthError::Configuration { .. }
        | AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AuthError::invalid_request(INVALID_JSON_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::sync::{Arc, Mutex};

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::invalid_request("x"), StatusCode::BAD_REQUEST),
            (AuthError::invalid_state("x"), StatusCode::BAD_REQUEST),
            (AuthError::conflict("x"), StatusCode::CONFLICT),
            (AuthError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (AuthError::invalid_token("x"), StatusCode::FORBIDDEN),
            (AuthError::not_found("x"), StatusCode::NOT_FOUND),
            (AuthError::storage("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::configuration("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (AuthError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(status_for(&error), expected, "{error:?}");
        }
    }

    #[tokio::test]
    async fn test_response_body() {
        let response = AuthError::not_found("User not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["error"], "not_found");
        assert_eq!(json["message"], "User not found");
    }

    #[tokio::test]
    async fn test_server_error_body_hides_details() {
        let response = AuthError::storage("disk full").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "server_error");
        assert_eq!(json["message"], "Internal server error");
    }

    /// Collects formatted log lines written by a test subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_log(error: AuthError) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let _ = error.into_response();
        });
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_server_error_log_carries_category() {
        let log = captured_log(AuthError::storage("disk full"));
        assert!(log.contains("category=infrastructure"), "{log}");
        assert!(log.contains("disk full"), "{log}");

        let log = captured_log(AuthError::configuration("Session lifetime is out of range"));
        assert!(log.contains("category=configuration"), "{log}");
    }

    #[test]
    fn test_client_error_is_not_logged_as_failure() {
        let log = captured_log(AuthError::unauthorized("Invalid email or password"));
        assert!(!log.contains("Request failed"), "{log}");
    }
}
