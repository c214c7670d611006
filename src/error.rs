//! Error types for the signal relay.

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Request-level errors raised by the inbound adapters.
///
/// `Unauthorized` and `MalformedPayload` are terminal for a request: they are
/// surfaced before any sink runs. Sink problems never show up here, they are
/// recorded per sink in a `DispatchResult`.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unauthorized: shared secret mismatch")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl RelayError {
    /// HTTP status the webhook surface reports for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::MalformedPayload(_) | Self::Sink(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Errors produced by a single sink delivery attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    /// The sink has no usable handle yet (e.g. notification channel unresolved).
    #[error("Sink {name} unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Sink {name} failed: {reason}")]
    Failure { name: String, reason: String },

    #[error("Sink {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Chat-platform channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to resolve channel {id}: {reason}")]
    ResolveFailed { id: String, reason: String },
}

/// Persistence-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Remote store rejected insert ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Remote store request failed: {0}")]
    Request(String),
}
