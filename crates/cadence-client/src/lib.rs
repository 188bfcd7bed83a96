//! Client-side session dispatcher for the Cadence language server.
//!
//! The crate launches the language server shipped with the Flow CLI
//! (`flow cadence language-server`), owns the JSON-RPC 2.0 channel to it,
//! and multiplexes concurrent outstanding requests by correlation id. On top
//! of the raw [`Session::invoke`] surface it exposes typed wrappers for the
//! account commands the server registers (see [`commands`]). Startup
//! outcomes are reported through the [`StartupObserver`] hook so the core
//! stays UI-agnostic: an editor shows them as notifications, a headless host
//! logs them via [`LogNotifier`].

#![deny(missing_docs)]

pub mod commands;
mod session;

pub use session::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LaunchSpec, LogNotifier,
    Session, SessionError, SessionEvent, SessionOptions, SessionState, StartupObserver,
    TransportError,
};

#[cfg(test)]
mod tests;
