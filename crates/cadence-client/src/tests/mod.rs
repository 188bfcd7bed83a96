//! Crate-internal tests for the session dispatcher.

mod support;
