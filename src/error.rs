use thiserror::Error;

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store changed underneath us {0} times, giving up")]
    Conflict(u32),

    #[error("background task failed: {0}")]
    Background(String),

    #[error("no data directory available")]
    NoDataDir,

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InboxError>;
