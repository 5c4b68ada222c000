use thiserror::Error;

/// 远程数据源错误。由缓存策略吞掉并回退到本地缓存，不会返回给调用方。
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Alpha Vantage 错误信封（Error Message / Note / Information）
    #[error("api error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("every request failed, last error: {0}")]
    AllFailed(String),
}

impl RemoteError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RemoteError::Http(e) if e.is_timeout())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::MalformedResponse(err.to_string())
    }
}

/// 本地缓存错误。没有更下层的回退，直接返回给调用方。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
