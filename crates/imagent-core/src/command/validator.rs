//! Allowlist validation for generated ImageMagick commands.
//!
//! This is a substring-level gate, not a sandbox. It assumes the command comes
//! from a cooperative but imperfect generator and rejects anything that could
//! escape the shell or make ImageMagick read scripts or write elsewhere.

use serde::{Deserialize, Serialize};

/// ImageMagick entry points accepted as the first token of a command.
pub const ALLOWED_COMMANDS: [&str; 5] = ["magick", "convert", "identify", "mogrify", "composite"];

/// Substrings that are rejected inside any token.
///
/// - `-script`: script execution
/// - `-write`: writing to arbitrary locations
/// - `@`: file references (`@list.txt`) that can pull in arbitrary input
pub const DANGEROUS_OPTIONS: [&str; 3] = ["-script", "-write", "@"];

/// Characters rejected anywhere in the raw command string.
pub const SHELL_METACHARACTERS: [char; 5] = [';', '|', '&', '$', '`'];

/// Result of each individual check, recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationChecks {
    pub not_empty: bool,
    pub allowed_command: bool,
    pub no_dangerous_options: bool,
    pub no_shell_injection: bool,
}

impl Default for ValidationChecks {
    fn default() -> Self {
        Self {
            not_empty: true,
            allowed_command: true,
            no_dangerous_options: true,
            no_shell_injection: true,
        }
    }
}

/// Outcome of validating one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the command may be executed.
    pub accepted: bool,
    /// Why the command was rejected. `None` when accepted.
    pub reason: Option<String>,
    /// Per-check results.
    pub checks: ValidationChecks,
}

impl ValidationOutcome {
    fn accept(checks: ValidationChecks) -> Self {
        Self {
            accepted: true,
            reason: None,
            checks,
        }
    }

    fn reject(checks: ValidationChecks, reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
            checks,
        }
    }

    /// Returns the rejection reason, or an empty string for accepted commands.
    pub fn reason_or_empty(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}

/// Decides whether `command` may be executed.
///
/// Checks run in order and stop at the first failure:
/// 1. the command is not empty
/// 2. the first token is one of [`ALLOWED_COMMANDS`]
/// 3. no token contains one of [`DANGEROUS_OPTIONS`]
/// 4. the raw string contains none of [`SHELL_METACHARACTERS`]
///
/// The metacharacter check runs on the untokenized string because `$(x)` or
/// `a;b` need no surrounding whitespace.
pub fn validate(command: &str) -> ValidationOutcome {
    let mut checks = ValidationChecks::default();
    let parts: Vec<&str> = command.split_whitespace().collect();

    let Some(base_command) = parts.first() else {
        checks.not_empty = false;
        return ValidationOutcome::reject(checks, "Empty command");
    };

    if !ALLOWED_COMMANDS.contains(base_command) {
        checks.allowed_command = false;
        return ValidationOutcome::reject(
            checks,
            format!(
                "Command '{}' is not allowed. Use: {}",
                base_command,
                ALLOWED_COMMANDS.join(", ")
            ),
        );
    }

    for part in &parts {
        if let Some(dangerous) = DANGEROUS_OPTIONS.iter().find(|d| part.contains(*d)) {
            checks.no_dangerous_options = false;
            return ValidationOutcome::reject(
                checks,
                format!("Dangerous option detected: {dangerous}"),
            );
        }
    }

    if command.contains(SHELL_METACHARACTERS) {
        checks.no_shell_injection = false;
        return ValidationOutcome::reject(checks, "Shell metacharacters not allowed");
    }

    ValidationOutcome::accept(checks)
}
