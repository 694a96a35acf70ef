use pr_sync_types::{EngineError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error("malformed row data: {0}")]
    Corrupt(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::Unavailable(_) => ErrorCode::DbUnavailable,
            StoreError::Sqlite(_) | StoreError::Corrupt(_) => ErrorCode::DbQueryFailed,
        };
        EngineError::new(code, err.to_string())
    }
}
