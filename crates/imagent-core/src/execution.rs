//! Execution result model.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome of one execution attempt.
///
/// Produced for every attempt, including validation failures and timeouts.
/// Fields are only readable once constructed; the orchestrator may log or
/// display a result but never changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    succeeded: bool,
    command: String,
    stdout: String,
    stderr: String,
    output_file: Option<PathBuf>,
    error_message: Option<String>,
    elapsed_ms: u64,
}

impl ExecutionResult {
    /// A successful run (exit code 0).
    pub fn success(
        command: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        output_file: Option<PathBuf>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            succeeded: true,
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            output_file,
            error_message: None,
            elapsed_ms,
        }
    }

    /// A failed attempt. `stdout`/`stderr` are kept when the process ran.
    pub fn failure(
        command: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        error_message: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            succeeded: false,
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            output_file: None,
            error_message: Some(error_message.into()),
            elapsed_ms,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// The command that was (or would have been) run, after sanitization.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Output file named by the command. Set only on success, and not checked
    /// for existence.
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_has_no_output_file() {
        let result = ExecutionResult::failure(
            "magick a.jpg b.jpg",
            "",
            "boom",
            "Command failed with exit code 1",
            12,
        );
        assert!(!result.succeeded());
        assert!(result.output_file().is_none());
        assert_eq!(result.stderr(), "boom");
        assert_eq!(result.error_message(), Some("Command failed with exit code 1"));
    }

    #[test]
    fn test_serializes_for_audit() {
        let result = ExecutionResult::success(
            "magick a.jpg b.jpg",
            "",
            "",
            Some(PathBuf::from("b.jpg")),
            40,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["succeeded"], true);
        assert_eq!(json["output_file"], "b.jpg");
        assert_eq!(json["elapsed_ms"], 40);
    }
}
