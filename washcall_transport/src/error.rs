use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unauthorized (HTTP 401)")]
    Unauthorized,
    #[error("HTTP {code}: {detail}")]
    Status { code: u16, detail: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("websocket error: {0}")]
    WebSocket(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
