//! Error types for gangterm-core

use thiserror::Error;

/// Main error type for the gangterm-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Remote URL could not be used for a WebSocket connection
    #[error("invalid remote URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure (connect refused, task gone, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// No remote URL has been configured
    #[error("no remote URL configured")]
    MissingUrl,

    /// An outbound action was attempted without an open connection
    #[error("not connected")]
    NotConnected,

    /// A connect was requested while one is already in flight or open
    #[error("connection already {0}")]
    AlreadyConnecting(String),

    /// A script execution is already outstanding on this connection
    #[error("a script execution is already in flight")]
    ExecutionInFlight,

    /// A snapshot request or run is already outstanding on this connection
    #[error("a workspace snapshot is already in progress")]
    SnapshotRunning,

    /// A chat query is still waiting for its reply
    #[error("still waiting for a reply to the previous query")]
    AwaitingReply,
}

/// Result type alias for gangterm-core
pub type Result<T> = std::result::Result<T, Error>;
