use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("WebSocket connection error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Event handler failed: {0}")]
    Handler(String),

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
