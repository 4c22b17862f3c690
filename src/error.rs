use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

// ─── JSON envelope ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorEnvelope {
    error: String,
}

// ─── ApiError ───────────────────────────────────────────────────────────────

/// HTTP error that serializes to a flat JSON body.
///
/// ```json
/// { "error": "Missing \"roomName\" query parameter" }
/// ```
///
/// The message is what the caller sees. Anything more specific (the reason a
/// signing call failed, for instance) is logged by the handler and never put
/// into the body.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status: StatusCode,
}

// ─── IntoResponse ───────────────────────────────────────────────────────────

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        } else if self.status.is_client_error() {
            tracing::warn!(status = self.status.as_u16(), "{}", self.message);
        }

        let envelope = ErrorEnvelope {
            error: self.message,
        };

        (self.status, Json(envelope)).into_response()
    }
}

// ─── From<StatusCode> ───────────────────────────────────────────────────────

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        let message = status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string();

        Self { message, status }
    }
}

// ─── Generic constructors ───────────────────────────────────────────────────

impl ApiError {
    /// 400 Bad Request with a custom message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// 500 Internal Server Error with a custom message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // ─── Domain-specific constructors ───────────────────────────────────

    /// 400: a required query parameter is absent or empty.
    pub fn missing_param(name: &str) -> Self {
        Self::bad_request(format!("Missing \"{name}\" query parameter"))
    }

    /// 400: the room view was opened without a credential or room name.
    pub fn missing_room_params() -> Self {
        Self::bad_request("Missing token or room name")
    }

    /// 500: signing key, signing secret or session URL is not configured.
    pub fn misconfigured() -> Self {
        Self::internal("Server misconfigured")
    }

    /// 500: the credential could not be signed.
    pub fn token_generation_failed() -> Self {
        Self::internal("Failed to generate token")
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
