use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found")]
    NotFound,

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}
