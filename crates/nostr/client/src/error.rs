//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Error, Debug)]
pub enum ClientError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Relay closed the connection or the stream ended
    #[error("Connection closed: {0}")]
    Closed(String),

    /// Pool was started twice or used after shutdown
    #[error("Invalid pool state: {0}")]
    PoolState(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::message::MessageError),
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
