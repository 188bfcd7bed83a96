//! Command contract registered by the Cadence language server.
//!
//! The identifiers are a fixed, versioned interface with the server side;
//! they must match the server's command registration exactly. Every call
//! site goes through the constants and typed wrappers here — the strings
//! never appear anywhere else.

use lsp_types::Uri;
use serde_json::json;

use crate::session::{Session, SessionError};

/// Creates a new account; the response carries its address.
pub const CREATE_ACCOUNT: &str = "cadence.server.createAccount";

/// Switches the account that subsequent operations act on.
pub const SWITCH_ACTIVE_ACCOUNT: &str = "cadence.server.switchActiveAccount";

/// Deploys a document's code to an account.
pub const UPDATE_ACCOUNT_CODE: &str = "cadence.server.updateAccountCode";

impl Session {
    /// Deploys the code in `document` to the account at `account`.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError::Request`] when the server rejects the
    /// command and [`SessionError::ChannelClosed`] when the session ends
    /// while the request is outstanding.
    pub fn update_account_code(&self, document: &Uri, account: &str) -> Result<(), SessionError> {
        self.invoke(UPDATE_ACCOUNT_CODE, vec![json!(document), json!(account)])
            .map(|_| ())
    }

    /// Switches the currently active account to `account`.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError::Request`] when the server rejects the
    /// command and [`SessionError::ChannelClosed`] when the session ends
    /// while the request is outstanding.
    pub fn switch_active_account(&self, account: &str) -> Result<(), SessionError> {
        self.invoke(SWITCH_ACTIVE_ACCOUNT, vec![json!(account)])
            .map(|_| ())
    }

    /// Creates a new account and returns its address.
    ///
    /// # Errors
    ///
    /// Propagates [`SessionError::Request`] and
    /// [`SessionError::ChannelClosed`] like the other commands, and returns
    /// [`SessionError::Codec`] when the response payload is not a string.
    pub fn create_account(&self) -> Result<String, SessionError> {
        let address = self.invoke(CREATE_ACCOUNT, Vec::new())?;
        serde_json::from_value(address).map_err(SessionError::from)
    }
}
