//! Error types and Axum response conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Authentication failures raised by the request verifiers.
///
/// Client-caused rejections map to 401 (credentials absent or malformed) or
/// 403 (credentials present but rejected). `MissingSecret` is a server
/// misconfiguration and maps to 500.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing headers: {}", .0.join(", "))]
    MissingHeader(Vec<&'static str>),

    #[error("Invalid timestamp")]
    InvalidTimestamp,

    #[error("Timestamp outside allowed window")]
    ClockSkewExceeded,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Replay detected")]
    ReplayDetected,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid auth scheme")]
    InvalidScheme,

    #[error("Invalid bearer token")]
    InvalidToken,

    /// Holds the name of the secret source, never its value.
    #[error("Missing server secret: {0}")]
    MissingSecret(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader(_)
            | AuthError::MissingToken
            | AuthError::InvalidTimestamp
            | AuthError::InvalidScheme => StatusCode::UNAUTHORIZED,
            AuthError::ClockSkewExceeded
            | AuthError::InvalidSignature
            | AuthError::InvalidToken
            | AuthError::ReplayDetected => StatusCode::FORBIDDEN,
            AuthError::MissingSecret(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason code returned in rejection bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader(_) => "missing_header",
            AuthError::InvalidTimestamp => "invalid_timestamp",
            AuthError::ClockSkewExceeded => "clock_skew_exceeded",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ReplayDetected => "replay_detected",
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidScheme => "invalid_scheme",
            AuthError::InvalidToken => "invalid_token",
            AuthError::MissingSecret(_) => "missing_secret",
        }
    }

    /// True when the failure is the server's fault rather than the caller's.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, AuthError::MissingSecret(_))
    }
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(err) if err.is_misconfiguration() => {
                // Operator-facing: names the secret source, never the value.
                tracing::error!(error = %err, code = err.code(), "Authentication misconfigured");
                (err.status(), err.code(), "Internal server error".to_string())
            }
            AppError::Auth(err) => (err.status(), err.code(), err.to_string()),
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "Payload too large".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::Auth(self).into_response()
    }
}
