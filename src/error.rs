use paircore::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("http request failed: {0}")]
    Http(#[source] anyhow::Error),
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("server reported an error: {0}")]
    Server(String),
    #[error("{0}")]
    Validation(String),
    #[error("pairing session was closed")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PairingError>;
