//! Session dispatcher for the Cadence language server.
//!
//! This module owns one long-lived JSON-RPC 2.0 channel to a spawned
//! `flow cadence language-server` process and multiplexes concurrent
//! requests over it by correlation id. It is organized into:
//!
//! - [`LaunchSpec`] and [`SessionOptions`]: process command line, opaque
//!   server configuration, and handshake deadline
//! - [`SessionError`] and [`TransportError`]: error taxonomy
//! - [`JsonRpcRequest`], [`JsonRpcResponse`]: JSON-RPC 2.0 message encoding
//! - [`Session`]: the dispatcher itself, over an LSP header-framed transport
//! - [`StartupObserver`]: UI-agnostic startup notifications

mod config;
mod dispatcher;
mod error;
mod events;
mod jsonrpc;
mod process;
mod state;
mod transport;

pub use config::{LaunchSpec, SessionOptions};
pub use dispatcher::Session;
pub use error::{SessionError, TransportError};
pub use events::{LogNotifier, SessionEvent, StartupObserver};
pub use jsonrpc::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
pub use state::SessionState;

pub(crate) use transport::{FrameReader, FrameWriter};
