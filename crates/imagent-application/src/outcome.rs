//! Result of handling one natural-language request.

/// What the orchestrator made of a user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A command that passed validation.
    Command {
        command: String,
        /// `false` when auto-execute is on.
        needs_confirmation: bool,
    },
    /// The model asked a question instead of producing a command.
    Clarification(String),
    /// The model produced a command that failed validation.
    Rejected { command: String, reason: String },
    /// The provider call failed. Holds the provider's error text.
    ProviderFailed(String),
}

impl RequestOutcome {
    /// The generated command, if one was produced (valid or not).
    pub fn command(&self) -> Option<&str> {
        match self {
            RequestOutcome::Command { command, .. } | RequestOutcome::Rejected { command, .. } => {
                Some(command)
            }
            _ => None,
        }
    }

    pub fn clarification(&self) -> Option<&str> {
        match self {
            RequestOutcome::Clarification(text) => Some(text),
            _ => None,
        }
    }

    /// User-facing error message for failed requests.
    pub fn error(&self) -> Option<String> {
        match self {
            RequestOutcome::Rejected { reason, .. } => {
                Some(format!("Generated invalid command: {reason}"))
            }
            RequestOutcome::ProviderFailed(detail) => Some(format!("LLM error: {detail}")),
            _ => None,
        }
    }

    pub fn needs_confirmation(&self) -> bool {
        matches!(
            self,
            RequestOutcome::Command {
                needs_confirmation: true,
                ..
            }
        )
    }
}
