//! Error types and error handling for the proxy
//!
//! Every error converts into the JSON shape the chat widget already
//! understands: a `reply` it can show, an `__error` summary and optional
//! `details`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Longest raw upstream body echoed back to the client
pub const MAX_RAW_CHARS: usize = 2000;

/// Keep at most [`MAX_RAW_CHARS`] characters of an upstream body
pub fn truncate_raw(raw: &str) -> String {
    raw.chars().take(MAX_RAW_CHARS).collect()
}

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// `GEMINI_API_KEY` is not set
    #[error("API key no configurada")]
    MissingApiKey,

    /// Request body was not a JSON object
    #[error("Invalid request payload: {0}")]
    InvalidPayload(String),

    /// Upstream answered with a non-success status
    #[error("Gemini API returned {status}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase
        status_text: String,
        /// Raw response body
        raw: String,
    },

    /// Upstream could not be reached
    #[error("Upstream request failed: {0}")]
    Transport(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::MissingApiKey => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "__error": self.to_string(),
                    "reply": format!("Error: {}", self),
                }),
            ),
            AppError::Upstream {
                status,
                status_text,
                raw,
            } => {
                let reply = if raw.is_empty() { "Error externo" } else { raw.as_str() };
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "__error": self.to_string(),
                        "details": {
                            "status": status,
                            "statusText": status_text,
                            "raw": truncate_raw(raw),
                        },
                        "reply": reply,
                    }),
                )
            }
            AppError::InvalidPayload(details) | AppError::Transport(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "__error": "Error interno del servidor",
                    "reply": "Error interno del servidor",
                    "details": details,
                }),
            ),
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "__error": "Error interno del servidor",
                    "reply": "Error interno del servidor",
                    "details": e.to_string(),
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
