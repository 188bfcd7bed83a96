//! Session lifecycle states.

/// Lifecycle of a session, from spawn to termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The process is up but the initialization handshake has not completed.
    Starting,
    /// The handshake succeeded; the session accepts requests.
    Ready,
    /// The session became unusable (handshake or transport failure).
    Failed,
    /// The session was shut down.
    Closed,
}
