//! Transport errors raised by trade sources.

use candela_types::CandelaError;
use thiserror::Error;

/// Errors raised while talking to a live feed or a history endpoint.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Websocket connect, read or write failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error status after all retries.
    #[error("Server error: {status}")]
    ServerError {
        /// HTTP status code.
        status: u16,
    },

    /// The remote API reported errors in its response body.
    #[error("API error: {0}")]
    Api(String),

    /// A frame or response body could not be decoded.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// The feed refused the subscription request.
    #[error("Subscription rejected: {0}")]
    SubscriptionRejected(String),

    /// The connection was closed by the remote end.
    #[error("Connection closed")]
    Closed,

    /// No subscription acknowledgement arrived in time.
    #[error("Handshake timed out after {0} ms")]
    HandshakeTimeout(u64),

    /// Reading a local history file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for CandelaError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}
