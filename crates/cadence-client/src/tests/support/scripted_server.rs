//! Scripted language server speaking framed JSON-RPC over in-process pipes.

use std::io::{self, PipeReader, PipeWriter, pipe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde_json::{Value, json};

use crate::session::{FrameReader, FrameWriter};

/// Reply directive produced by a script for one `workspace/executeCommand`.
pub enum ScriptedReply {
    /// Respond immediately with this result payload.
    Result(Value),
    /// Respond immediately with an error frame.
    Error {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },
    /// Hold this result back until the next direct reply has been sent,
    /// forcing an out-of-order delivery.
    Defer(Value),
    /// Never respond.
    Ignore,
    /// Drop both channel halves without responding.
    Hangup,
}

/// In-process stand-in for the Cadence language server.
///
/// Owns a thread that answers the `initialize` handshake and delegates every
/// `workspace/executeCommand` request to the supplied script. The thread
/// exits when the client closes its half of the channel.
pub struct ScriptedServer {
    seen_initialize: Arc<Mutex<Option<Value>>>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptedServer {
    /// Spawns the server and returns the client-side channel halves.
    pub fn spawn<F>(script: F) -> io::Result<(Self, PipeReader, PipeWriter)>
    where
        F: FnMut(&str, &[Value]) -> ScriptedReply + Send + 'static,
    {
        Self::spawn_inner(Some(script))
    }

    /// Spawns a server that reads frames but never answers anything.
    pub fn spawn_mute() -> io::Result<(Self, PipeReader, PipeWriter)> {
        Self::spawn_inner::<fn(&str, &[Value]) -> ScriptedReply>(None)
    }

    fn spawn_inner<F>(script: Option<F>) -> io::Result<(Self, PipeReader, PipeWriter)>
    where
        F: FnMut(&str, &[Value]) -> ScriptedReply + Send + 'static,
    {
        let (client_read, server_write) = pipe()?;
        let (server_read, client_write) = pipe()?;
        let seen_initialize = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&seen_initialize);
        let handle = thread::spawn(move || serve(server_read, server_write, script, &seen));
        Ok((
            Self {
                seen_initialize,
                handle: Some(handle),
            },
            client_read,
            client_write,
        ))
    }

    /// Returns the raw `initialize` params the server received, if any.
    pub fn initialize_params(&self) -> Option<Value> {
        self.seen_initialize.lock().expect("lock poisoned").clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve<F>(
    reader: PipeReader,
    writer: PipeWriter,
    mut script: Option<F>,
    seen_initialize: &Mutex<Option<Value>>,
) where
    F: FnMut(&str, &[Value]) -> ScriptedReply,
{
    let mut reader = FrameReader::new(reader);
    let mut writer = FrameWriter::new(writer);
    let mut deferred: Vec<(i64, Value)> = Vec::new();

    loop {
        // Client hung up; nothing more to serve.
        let Ok(bytes) = reader.receive() else { break };
        let Ok(message) = serde_json::from_slice::<Value>(&bytes) else {
            break;
        };

        let method = message["method"].as_str().unwrap_or_default().to_owned();
        let Some(id) = message["id"].as_i64() else {
            // Notifications ("initialized", "exit") need no reply.
            continue;
        };

        if method == "initialize" {
            *seen_initialize.lock().expect("lock poisoned") = Some(message["params"].clone());
        }

        let Some(script) = script.as_mut() else {
            // Mute server: swallow every request.
            continue;
        };

        match method.as_str() {
            "initialize" => {
                send_result(&mut writer, id, json!({"capabilities": {}}));
            }
            "workspace/executeCommand" => {
                let command = message["params"]["command"]
                    .as_str()
                    .unwrap_or_default()
                    .to_owned();
                let arguments = message["params"]["arguments"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default();
                match script(&command, &arguments) {
                    ScriptedReply::Result(value) => {
                        send_result(&mut writer, id, value);
                        flush_deferred(&mut writer, &mut deferred);
                    }
                    ScriptedReply::Error { code, message } => {
                        send_error(&mut writer, id, code, &message);
                        flush_deferred(&mut writer, &mut deferred);
                    }
                    ScriptedReply::Defer(value) => deferred.push((id, value)),
                    ScriptedReply::Ignore => {}
                    ScriptedReply::Hangup => return,
                }
            }
            _ => send_result(&mut writer, id, Value::Null),
        }
    }
}

fn flush_deferred(writer: &mut FrameWriter<PipeWriter>, deferred: &mut Vec<(i64, Value)>) {
    for (id, value) in deferred.drain(..) {
        send_result(writer, id, value);
    }
}

fn send_result(writer: &mut FrameWriter<PipeWriter>, id: i64, result: Value) {
    send_frame(writer, &json!({"jsonrpc": "2.0", "id": id, "result": result}));
}

fn send_error(writer: &mut FrameWriter<PipeWriter>, id: i64, code: i64, message: &str) {
    send_frame(
        writer,
        &json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}}),
    );
}

fn send_frame(writer: &mut FrameWriter<PipeWriter>, frame: &Value) {
    let payload = serde_json::to_vec(frame).expect("serialize frame");
    writer.send(&payload).expect("send frame");
}
