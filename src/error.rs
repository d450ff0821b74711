use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovsumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CovsumError>;
