//! Shared fixtures and helpers for dispatcher tests.

mod scripted_server;

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lsp_types::Uri;

pub use scripted_server::{ScriptedReply, ScriptedServer};

use crate::session::{SessionEvent, StartupObserver};

/// Common document URI used by command tests.
pub fn sample_document() -> Uri {
    Uri::from_str("file:///a.cdc").expect("invalid test URI")
}

/// Polls `condition` until it holds, panicking after two seconds.
pub fn wait_until(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 2s");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Observer that records every startup event it receives.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingObserver {
    /// Creates an observer with no recorded events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events observed so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }
}

impl StartupObserver for RecordingObserver {
    fn startup_complete(&self, event: &SessionEvent) {
        self.events
            .lock()
            .expect("lock poisoned")
            .push(event.clone());
    }
}
