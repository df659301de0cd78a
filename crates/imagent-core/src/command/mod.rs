//! Command gate: allowlist validation and output-path sanitization.
//!
//! Both halves are pure string functions. The executor runs `sanitize` first
//! and then `validate` on the rewritten command, so the command that is
//! validated is exactly the command that is spawned.

mod sanitizer;
mod validator;

pub use sanitizer::{extract_output_file, sanitize};
pub use validator::{
    ALLOWED_COMMANDS, DANGEROUS_OPTIONS, SHELL_METACHARACTERS, ValidationChecks,
    ValidationOutcome, validate,
};
