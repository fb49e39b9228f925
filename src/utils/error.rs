use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockwatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid connection profile: {0}")]
    Validation(String),

    #[error("Docker engine unreachable: {0}")]
    EngineUnreachable(String),

    #[error("Docker engine returned {status}: {body}")]
    EngineError { status: u16, body: String },

    #[error("Malformed engine response: {0}")]
    MalformedResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Log stream truncated: {0}")]
    TruncatedStream(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Docker Hub error: {0}")]
    Hub(String),
}

impl DockwatchError {
    /// 连接层失败（可由调用方重试）
    pub fn is_unreachable(&self) -> bool {
        matches!(self, DockwatchError::EngineUnreachable(_))
    }
}

pub type Result<T> = std::result::Result<T, DockwatchError>;
