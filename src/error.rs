use thiserror::Error;

/// Unified application error type; everything fatal funnels through here.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Errored while handling a file. {0}")]
    Io(#[from] std::io::Error),
    #[error("Error from git. {0}")]
    Git(#[from] git2::Error),
    #[error("Not inside a git working tree. {0}")]
    OutsideRepository(String),
    #[error("Unable to parse string. {0}")]
    Utf8Parse(#[from] std::str::Utf8Error),
    #[error("Error while writing information to a string. {0}")]
    BufferWrite(#[from] std::fmt::Error),
    #[error("Error serializing json. {0}")]
    SerdeJsonSer(#[from] serde_json::Error),
    #[error("Timestamp out of range. {0}")]
    TimeRange(#[from] time::error::ComponentRange),
    #[error("Error formatting a date. {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("Invalid similarity threshold. {0}")]
    Threshold(String),
}

/// Convenience alias for results that bubble `AppError`.
pub type AppResult<T> = Result<T, AppError>;
