//! Application mode types for session state management.

use serde::{Deserialize, Serialize};

/// Represents the current interaction mode within a session.
///
/// This tracks whether the session is in normal chat mode or holding a
/// validated command until the user confirms or cancels it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AppMode {
    /// The session is waiting for user input.
    #[default]
    Idle,
    /// A validated command has been proposed and awaits confirmation.
    AwaitingConfirmation {
        /// The command awaiting confirmation.
        command: String,
    },
}

impl AppMode {
    /// Returns the command awaiting confirmation, if any.
    pub fn pending_command(&self) -> Option<&str> {
        match self {
            AppMode::Idle => None,
            AppMode::AwaitingConfirmation { command } => Some(command),
        }
    }
}
