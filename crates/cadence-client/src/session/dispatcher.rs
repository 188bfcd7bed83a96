//! Session dispatcher multiplexing concurrent requests over one channel.
//!
//! One session owns one bidirectional JSON-RPC channel to a language server
//! process. Many threads may issue requests concurrently: each send writes a
//! single complete frame under the writer lock, then blocks its own caller on
//! a private one-shot channel. A dedicated reader thread demultiplexes
//! incoming frames purely by correlation id, so responses may arrive in any
//! order relative to submission. Every outstanding request resolves exactly
//! once: with its response, with the server's error frame, or with
//! [`SessionError::ChannelClosed`] when the session ends first.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::Child;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lsp_types::{
    ClientCapabilities, ExecuteCommandParams, InitializeParams, InitializedParams,
    WorkDoneProgressParams,
};
use serde_json::Value;
use tracing::{debug, warn};

use super::config::{LaunchSpec, SessionOptions};
use super::error::SessionError;
use super::events::SessionEvent;
use super::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ServerMessage};
use super::process;
use super::state::SessionState;
use super::transport::{FrameReader, FrameWriter};

/// Log target for session operations.
pub(super) const SESSION_TARGET: &str = "cadence_client::session";

type BoxedReader = FrameReader<Box<dyn Read + Send>>;
type BoxedWriter = FrameWriter<Box<dyn Write + Send>>;

/// Resolution delivered to a blocked caller.
enum RequestOutcome {
    /// The server answered this correlation id.
    Response(JsonRpcResponse),
    /// The session ended before the response arrived.
    Closed,
}

/// State shared between the send path, the reader thread, and shutdown.
struct Shared {
    /// Write half; `None` once the session is closed or failed. The lock
    /// serializes writers so frames never interleave.
    writer: Mutex<Option<BoxedWriter>>,
    /// Outstanding requests keyed by correlation id. An entry is removed by
    /// exactly one resolver before its sink is used, so resolution is
    /// exactly-once by construction.
    pending: Mutex<HashMap<i64, mpsc::Sender<RequestOutcome>>>,
    state: Mutex<SessionState>,
    next_id: AtomicI64,
}

/// Recovers the guard from a poisoned lock; session state stays usable for
/// shutdown even after a panic elsewhere.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

impl Shared {
    fn new(writer: BoxedWriter) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            pending: Mutex::new(HashMap::new()),
            state: Mutex::new(SessionState::Starting),
            next_id: AtomicI64::new(1),
        }
    }

    /// Allocates a fresh correlation id and registers its result sink.
    ///
    /// Ids are monotonically increasing per session, so an id is never
    /// reassigned while its request is outstanding.
    fn register(&self) -> Result<(i64, mpsc::Receiver<RequestOutcome>), SessionError> {
        {
            let state = lock(&self.state);
            if matches!(*state, SessionState::Closed | SessionState::Failed) {
                return Err(SessionError::ChannelClosed);
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sink, source) = mpsc::channel();
        lock(&self.pending).insert(id, sink);
        Ok((id, source))
    }

    /// Removes a pending entry that will never receive a response.
    fn discard(&self, id: i64) {
        lock(&self.pending).remove(&id);
    }

    /// Writes one complete frame to the channel.
    fn send_frame(&self, payload: &[u8]) -> Result<(), SessionError> {
        let mut guard = lock(&self.writer);
        match guard.as_mut() {
            Some(writer) => writer.send(payload).map_err(SessionError::from),
            None => Err(SessionError::ChannelClosed),
        }
    }

    /// Resolves every outstanding request as closed.
    fn drain_pending(&self) {
        let drained: Vec<(i64, mpsc::Sender<RequestOutcome>)> =
            lock(&self.pending).drain().collect();
        for (id, sink) in drained {
            debug!(
                target: SESSION_TARGET,
                id,
                "resolving outstanding request as closed"
            );
            let _ = sink.send(RequestOutcome::Closed);
        }
    }

    fn set_state(&self, next: SessionState) {
        *lock(&self.state) = next;
    }

    fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// Marks the session unusable, drops the write half, and unblocks every
    /// outstanding caller. Keeps `Closed` when shutdown already ran.
    fn fail(&self) {
        {
            let mut state = lock(&self.state);
            if !matches!(*state, SessionState::Closed) {
                *state = SessionState::Failed;
            }
        }
        *lock(&self.writer) = None;
        self.drain_pending();
    }
}

/// One logical connection to a running Cadence language server.
///
/// A session exclusively owns its server process and channel; do not start a
/// second session against the same process. All methods take `&self` and the
/// type is `Sync`, so one session may be shared across threads.
pub struct Session {
    shared: Arc<Shared>,
    child: Mutex<Option<Child>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Launches the language server process and establishes a session over
    /// its stdio, running the `initialize`/`initialized` handshake with
    /// `options.initialization_options` forwarded verbatim.
    ///
    /// Every observer registered on `options` is notified with the startup
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BinaryNotFound`] when the command does not
    /// exist and [`SessionError::Startup`] when the process cannot be spawned
    /// or the handshake fails or exceeds `options.startup_timeout`.
    pub fn start(launch: &LaunchSpec, options: SessionOptions) -> Result<Self, SessionError> {
        let (child, reader, writer) = match process::spawn(launch) {
            Ok(parts) => parts,
            Err(error) => {
                options.notify(&SessionEvent::Failed {
                    message: error.to_string(),
                });
                return Err(error);
            }
        };
        Self::establish(reader, writer, Some(child), options)
    }

    /// Establishes a session over an already-connected channel.
    ///
    /// The same handshake and observer notifications as [`Session::start`]
    /// apply; lifecycle of whatever backs the channel stays with the caller.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Startup`] when the handshake fails or exceeds
    /// `options.startup_timeout`.
    pub fn attach<R, W>(reader: R, writer: W, options: SessionOptions) -> Result<Self, SessionError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self::establish(
            FrameReader::new(Box::new(reader) as Box<dyn Read + Send>),
            FrameWriter::new(Box::new(writer) as Box<dyn Write + Send>),
            None,
            options,
        )
    }

    fn establish(
        reader: BoxedReader,
        writer: BoxedWriter,
        child: Option<Child>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let shared = Arc::new(Shared::new(writer));
        let session = Self {
            shared: Arc::clone(&shared),
            child: Mutex::new(child),
            reader: Mutex::new(None),
        };

        let spawned = thread::Builder::new()
            .name("cadence-session-reader".to_owned())
            .spawn(move || read_loop(&shared, reader));
        match spawned {
            Ok(handle) => {
                *lock(&session.reader) = Some(handle);
            }
            Err(e) => {
                let error = SessionError::startup_with_source("failed to spawn reader thread", e);
                session.abort(&options, &error);
                return Err(error);
            }
        }

        if let Err(error) = session.handshake(&options) {
            session.abort(&options, &error);
            return Err(error);
        }

        session.shared.set_state(SessionState::Ready);
        options.notify(&SessionEvent::Ready);
        Ok(session)
    }

    /// Runs the LSP initialization handshake.
    fn handshake(&self, options: &SessionOptions) -> Result<(), SessionError> {
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            initialization_options: options.initialization_options.clone(),
            capabilities: ClientCapabilities::default(),
            ..Default::default()
        };

        self.request(
            "initialize",
            serde_json::to_value(params)?,
            Some(options.startup_timeout),
        )
        .map_err(|e| match e {
            SessionError::Startup { .. } => e,
            other => SessionError::startup_with_source("initialization handshake failed", other),
        })?;

        self.notification("initialized", serde_json::to_value(InitializedParams {})?)
            .map_err(|e| {
                SessionError::startup_with_source("failed to send initialized notification", e)
            })
    }

    /// Tears down a half-established session and reports the failure.
    fn abort(&self, options: &SessionOptions, error: &SessionError) {
        self.shared.fail();
        self.terminate();
        options.notify(&SessionEvent::Failed {
            message: error.to_string(),
        });
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Issues a custom command over `workspace/executeCommand` and blocks the
    /// calling thread until its response arrives.
    ///
    /// The command and its arguments are serialized untouched; the caller
    /// interprets the returned payload (`Null` when the server sent none).
    /// Concurrent invocations from other threads proceed independently; no
    /// request waits for another's response.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Request`] when the server answers with an
    /// error frame (the session stays usable), and
    /// [`SessionError::ChannelClosed`] when the session is already closed or
    /// ends while this request is outstanding.
    pub fn invoke(&self, command: &str, args: Vec<Value>) -> Result<Value, SessionError> {
        let params = ExecuteCommandParams {
            command: command.to_owned(),
            arguments: args,
            work_done_progress_params: WorkDoneProgressParams::default(),
        };
        let response = self.request(
            "workspace/executeCommand",
            serde_json::to_value(params)?,
            None,
        )?;
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Sends one request frame and waits for its correlated response.
    ///
    /// Only the handshake passes a deadline; `invoke` has no per-request
    /// timeout.
    fn request(
        &self,
        method: &str,
        params: Value,
        deadline: Option<Duration>,
    ) -> Result<JsonRpcResponse, SessionError> {
        let (id, source) = self.shared.register()?;
        let request = JsonRpcRequest::with_id(id, method, Some(params));
        let payload = match serde_json::to_vec(&request) {
            Ok(payload) => payload,
            Err(e) => {
                self.shared.discard(id);
                return Err(e.into());
            }
        };

        debug!(target: SESSION_TARGET, method, id, "sending request");

        if let Err(error) = self.shared.send_frame(&payload) {
            self.shared.discard(id);
            if !matches!(error, SessionError::ChannelClosed) {
                // A failed write leaves the channel in an unknown state; no
                // later frame can be trusted, so the whole session fails.
                warn!(
                    target: SESSION_TARGET,
                    method,
                    id,
                    error = %error,
                    "write failed, failing session"
                );
                self.shared.fail();
            }
            return Err(SessionError::ChannelClosed);
        }

        let outcome = match deadline {
            Some(limit) => match source.recv_timeout(limit) {
                Ok(outcome) => outcome,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    self.shared.discard(id);
                    return Err(SessionError::startup(format!(
                        "initialization handshake timed out after {}ms",
                        limit.as_millis()
                    )));
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => RequestOutcome::Closed,
            },
            None => source.recv().unwrap_or(RequestOutcome::Closed),
        };

        match outcome {
            RequestOutcome::Response(response) => match response.error {
                Some(error) => Err(SessionError::from_jsonrpc(error)),
                None => Ok(response),
            },
            RequestOutcome::Closed => Err(SessionError::ChannelClosed),
        }
    }

    /// Sends a notification (no response expected).
    fn notification(&self, method: &str, params: Value) -> Result<(), SessionError> {
        let notification = JsonRpcNotification::new(method, Some(params));
        let payload = serde_json::to_vec(&notification)?;

        debug!(target: SESSION_TARGET, method, "sending notification");

        self.shared.send_frame(&payload)
    }

    /// Closes the session: resolves every outstanding request with
    /// [`SessionError::ChannelClosed`], terminates the server process, and
    /// causes any later `invoke` to fail immediately. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut state = lock(&self.shared.state);
            if matches!(*state, SessionState::Closed) {
                return;
            }
            *state = SessionState::Closed;
        }

        debug!(target: SESSION_TARGET, "shutting down session");

        if let Err(e) = self.notification("exit", Value::Null) {
            debug!(
                target: SESSION_TARGET,
                error = %e,
                "exit notification failed"
            );
        }

        // Dropping the write half closes the server's stdin, which lets the
        // reader thread observe EOF and exit.
        *lock(&self.shared.writer) = None;
        self.shared.drain_pending();
        self.terminate();
    }

    /// Reaps the child process and joins the reader thread.
    fn terminate(&self) {
        if let Some(mut child) = lock(&self.child).take() {
            process::terminate_child(&mut child);
        }
        if let Some(handle) = lock(&self.reader).take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field(
                "outstanding",
                &lock(&self.shared.pending).len(),
            )
            .finish()
    }
}

/// Demultiplexing loop owning the read half of the channel.
///
/// The only resolver of pending entries during normal operation; removes an
/// entry before using its sink, so each request resolves at most once here.
fn read_loop(shared: &Shared, mut reader: BoxedReader) {
    loop {
        let bytes = match reader.receive() {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(
                    target: SESSION_TARGET,
                    error = %error,
                    "channel closed"
                );
                break;
            }
        };

        match ServerMessage::from_bytes(&bytes) {
            Ok(ServerMessage::Response(response)) => route_response(shared, response),
            Ok(ServerMessage::Request(request)) => {
                warn!(
                    target: SESSION_TARGET,
                    method = %request.method,
                    id = ?request.id,
                    "ignoring server-initiated request (not supported)"
                );
            }
            Ok(ServerMessage::Notification(notification)) => {
                debug!(
                    target: SESSION_TARGET,
                    method = %notification.method,
                    "skipping server notification"
                );
            }
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    error = %error,
                    "discarding malformed frame"
                );
            }
        }
    }

    // The transport is gone: nothing outstanding can resolve any other way.
    {
        let mut state = lock(&shared.state);
        if !matches!(*state, SessionState::Closed) {
            *state = SessionState::Failed;
        }
    }
    *lock(&shared.writer) = None;
    shared.drain_pending();
}

/// Routes a response to the caller registered under its correlation id.
fn route_response(shared: &Shared, response: JsonRpcResponse) {
    let Some(id) = response.id else {
        warn!(target: SESSION_TARGET, "dropping response without an id");
        return;
    };

    let entry = lock(&shared.pending).remove(&id);
    match entry {
        Some(sink) => {
            // The caller may have given up already; a dead sink is fine.
            let _ = sink.send(RequestOutcome::Response(response));
        }
        None => {
            warn!(
                target: SESSION_TARGET,
                id,
                "no pending request for response id"
            );
        }
    }
}
