//! Configuration for launching and establishing sessions.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use super::events::{SessionEvent, StartupObserver};

/// Handshake deadline applied when none is configured.
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Command line used to launch the language server process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// The executable path or command name.
    pub command: PathBuf,
    /// Arguments to pass to the language server.
    pub args: Vec<String>,
    /// Working directory for the spawned process.
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Builds a launch spec for an arbitrary command line.
    #[must_use]
    pub fn new(command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            working_dir: None,
        }
    }

    /// Default launch spec for the Cadence language server shipped with the
    /// Flow CLI (`flow cadence language-server`).
    ///
    /// Expects `flow` to be available in PATH.
    #[must_use]
    pub fn cadence_default() -> Self {
        Self::new(
            "flow",
            vec!["cadence".to_owned(), "language-server".to_owned()],
        )
    }

    /// Replaces the command path, keeping the argument list.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.command = command.into();
        self
    }

    /// Sets a custom working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Options applied while establishing a session.
pub struct SessionOptions {
    /// Opaque server configuration forwarded verbatim in the `initialize`
    /// request; never interpreted by the dispatcher.
    pub initialization_options: Option<Value>,
    /// Deadline for the initialization handshake.
    pub startup_timeout: Duration,
    observers: Vec<Box<dyn StartupObserver>>,
}

impl SessionOptions {
    /// Builds options with the default handshake deadline and no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialization_options: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            observers: Vec::new(),
        }
    }

    /// Sets the opaque configuration blob forwarded at initialization.
    #[must_use]
    pub fn with_initialization_options(mut self, options: Value) -> Self {
        self.initialization_options = Some(options);
        self
    }

    /// Sets the handshake deadline.
    #[must_use]
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Registers an observer notified with the startup outcome.
    #[must_use]
    pub fn with_observer(mut self, observer: impl StartupObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Delivers the startup outcome to every registered observer.
    pub(super) fn notify(&self, event: &SessionEvent) {
        for observer in &self.observers {
            observer.startup_complete(event);
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionOptions")
            .field("initialization_options", &self.initialization_options)
            .field("startup_timeout", &self.startup_timeout)
            .field("observers", &self.observers.len())
            .finish()
    }
}
