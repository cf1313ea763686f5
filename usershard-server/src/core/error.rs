use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for usershard operations
#[derive(Debug, Error)]
pub enum ShardError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown shard: {0}")]
    UnknownShard(u32),

    #[error("Shard {shard} unavailable: {reason}")]
    ShardUnavailable { shard: u32, reason: String },

    #[error("Shard {shard} timed out after {timeout_ms}ms")]
    ShardTimeout { shard: u32, timeout_ms: u64 },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Invalid shard topology: {0}")]
    InvalidTopology(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ShardError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidKey(_) | Self::InvalidRequest(_) | Self::UnknownShard(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ShardUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::ShardTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::UserExists(_) => StatusCode::CONFLICT,
            Self::InvalidTopology(_) | Self::SerializationError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Shorthand for an unavailable shard
    pub fn unavailable(shard: u32, reason: impl Into<String>) -> Self {
        Self::ShardUnavailable {
            shard,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ShardError {
    fn from(e: serde_json::Error) -> Self {
        ShardError::SerializationError(e.to_string())
    }
}

impl From<JsonRejection> for ShardError {
    fn from(rejection: JsonRejection) -> Self {
        ShardError::InvalidRequest(rejection.body_text())
    }
}

/// Implement IntoResponse for Axum integration
impl IntoResponse for ShardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for usershard operations
pub type Result<T> = std::result::Result<T, ShardError>;
