//! Startup notifications decoupled from any UI layer.

use std::fmt;

use tracing::{error, info};

use super::dispatcher::SESSION_TARGET;

/// Outcome of session establishment, delivered to startup observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session completed its handshake and accepts requests.
    Ready,
    /// The session could not be established.
    Failed {
        /// Human-readable description of the failure.
        message: String,
    },
}

/// Receives the startup outcome of a session.
///
/// The dispatcher itself is UI-agnostic; an editor surfaces these events as
/// user-visible notifications, while tests and headless hosts record or log
/// them instead.
pub trait StartupObserver: Send {
    /// Called exactly once per `start`/`attach` attempt with its outcome.
    fn startup_complete(&self, event: &SessionEvent);
}

impl fmt::Debug for dyn StartupObserver {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("StartupObserver")
    }
}

/// Observer that reports startup outcomes through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl StartupObserver for LogNotifier {
    fn startup_complete(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Ready => {
                info!(target: SESSION_TARGET, "Cadence language server started");
            }
            SessionEvent::Failed { message } => {
                error!(
                    target: SESSION_TARGET,
                    "Cadence language server failed to start: {message}"
                );
            }
        }
    }
}
