//! Stable error codes shared across every crate (spec.md §7).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    ConfigError,
    DbUnavailable,
    DbQueryFailed,
    UpstreamFailed,
    LockHeld,
    /// Internal only; an action suppressed by dedupe is never
    /// surfaced as an error to a caller.
    Deduped,
}

impl ErrorCode {
    /// Whether a caller should retry after this error (spec.md §7).
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::DbUnavailable | ErrorCode::DbQueryFailed | ErrorCode::UpstreamFailed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::DbUnavailable => "DB_UNAVAILABLE",
            ErrorCode::DbQueryFailed => "DB_QUERY_FAILED",
            ErrorCode::UpstreamFailed => "UPSTREAM_FAILED",
            ErrorCode::LockHeld => "LOCK_HELD",
            ErrorCode::Deduped => "DEDUPED",
        }
    }
}

/// The one error type the CLI's JSON envelope renderer converts into.
/// Crate-local error types (`StoreError`, `GithubError`, `AgentError`)
/// each carry a `From` impl into this.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn retryable(&self) -> bool {
        self.code.retryable()
    }

    /// Render the `{error: {code, message, retryable}}` envelope from
    /// spec.md §6.3 / §7.
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "retryable": self.retryable(),
            }
        })
    }
}
