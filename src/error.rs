use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Http(reqwest::Error),
    /// 服务端返回非 2xx 状态
    Status { status: u16, path: String },
    Unauthorized,
    InvalidItemHeight(f64),
    InvalidUrl(String),
    Worker(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            AppError::Io(e) => write!(f, "io error: {}", e),
            AppError::Serialization(e) => write!(f, "serialization error: {}", e),
            AppError::Http(e) => write!(f, "http error: {}", e),
            AppError::Status { status, path } => {
                write!(f, "request to {} failed with status {}", path, status)
            }
            AppError::Unauthorized => write!(f, "no active session"),
            AppError::InvalidItemHeight(h) => {
                write!(f, "item height must be a positive finite number, got {}", h)
            }
            AppError::InvalidUrl(msg) => write!(f, "invalid url: {}", msg),
            AppError::Worker(msg) => write!(f, "worker error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io(e) => Some(e),
            AppError::Serialization(e) => Some(e),
            AppError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Http(e)
    }
}
