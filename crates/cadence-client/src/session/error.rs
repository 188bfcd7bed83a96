//! Error types surfaced by the session dispatcher.

use std::error::Error;
use std::io;

use thiserror::Error;

use super::jsonrpc::JsonRpcError;

/// Errors raised while establishing or using a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The language server binary was not found.
    #[error("language server binary not found: {command}")]
    BinaryNotFound {
        /// The command that was not found.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The process could not be started or the initialization handshake failed.
    #[error("failed to start language server session: {message}")]
    Startup {
        /// Description of the startup failure.
        message: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// The server rejected a command invocation.
    #[error("server rejected request: {message} (code: {code})")]
    Request {
        /// The JSON-RPC error code.
        code: i64,
        /// The error message from the server.
        message: String,
    },

    /// The session ended while the request was outstanding, or was already
    /// closed when the request was issued.
    #[error("session closed while the request was outstanding")]
    ChannelClosed,

    /// Transport-level I/O error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON serialization/deserialization error.
    #[error("JSON codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl SessionError {
    /// Creates a request error from a JSON-RPC error frame.
    #[must_use]
    pub fn from_jsonrpc(error: JsonRpcError) -> Self {
        Self::Request {
            code: error.code,
            message: error.message,
        }
    }

    /// Builds a startup error without an underlying source.
    pub(super) fn startup(message: impl Into<String>) -> Self {
        Self::Startup {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a startup error that wraps an underlying failure.
    pub(super) fn startup_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Startup {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Missing Content-Length header.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// Invalid header format.
    #[error("invalid header format")]
    InvalidHeader,
}
