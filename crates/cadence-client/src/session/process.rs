//! Child process management for the language server.

use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::config::LaunchSpec;
use super::dispatcher::SESSION_TARGET;
use super::error::SessionError;
use super::transport::{FrameReader, FrameWriter};

/// Spawns the language server process and wires its stdio into framed halves.
pub(super) fn spawn(
    launch: &LaunchSpec,
) -> Result<
    (
        Child,
        FrameReader<Box<dyn Read + Send>>,
        FrameWriter<Box<dyn Write + Send>>,
    ),
    SessionError,
> {
    debug!(
        target: SESSION_TARGET,
        command = %launch.command.display(),
        args = ?launch.args,
        "spawning language server process"
    );

    let mut command = Command::new(&launch.command);
    command
        .args(&launch.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    if let Some(dir) = &launch.working_dir {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SessionError::BinaryNotFound {
                command: launch.command.display().to_string(),
                source: e,
            }
        } else {
            SessionError::startup_with_source(
                format!("failed to start {}", launch.command.display()),
                e,
            )
        }
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| SessionError::startup("failed to capture stdin"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SessionError::startup("failed to capture stdout"))?;

    debug!(
        target: SESSION_TARGET,
        pid = child.id(),
        "language server process spawned"
    );

    Ok((
        child,
        FrameReader::new(Box::new(stdout) as Box<dyn Read + Send>),
        FrameWriter::new(Box::new(stdin) as Box<dyn Write + Send>),
    ))
}

/// Terminates a child process with graceful shutdown handling.
///
/// Checks whether the process already exited; if not, waits out a short
/// grace period before forcibly killing it.
pub(super) fn terminate_child(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(
                target: SESSION_TARGET,
                ?status,
                "language server exited"
            );
        }
        Ok(None) => {
            warn!(
                target: SESSION_TARGET,
                "language server did not exit gracefully, waiting before killing"
            );
            wait_then_kill(child);
        }
        Err(e) => {
            warn!(
                target: SESSION_TARGET,
                error = %e,
                "failed to check process status, waiting before killing"
            );
            wait_then_kill(child);
        }
    }
}

/// Grants a grace period, then kills the process if it is still running.
fn wait_then_kill(child: &mut Child) {
    thread::sleep(Duration::from_millis(200));
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(
                target: SESSION_TARGET,
                ?status,
                "language server exited during grace period"
            );
        }
        Ok(None) | Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
