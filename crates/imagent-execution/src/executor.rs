//! Runs validated ImageMagick commands as child processes.

use crate::detection::ImageMagickBinary;
use imagent_core::audit::{AuditRecord, AuditSink, record_best_effort};
use imagent_core::command::{self, ValidationOutcome};
use imagent_core::{ExecutionResult, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// Wall-clock limit for transformation commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Wall-clock limit for metadata queries.
pub const DEFAULT_INFO_TIMEOUT: Duration = Duration::from_secs(10);

/// Process settings for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Directory commands run in. Sanitized outputs land here.
    pub working_dir: PathBuf,
    /// `PATH` for child processes and detection. Inherited when `None`.
    pub search_path: Option<OsString>,
    pub timeout: Duration,
    pub info_timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            search_path: None,
            timeout: DEFAULT_TIMEOUT,
            info_timeout: DEFAULT_INFO_TIMEOUT,
        }
    }
}

impl ExecutorOptions {
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_info_timeout(mut self, timeout: Duration) -> Self {
        self.info_timeout = timeout;
        self
    }
}

/// Executes ImageMagick commands behind the allowlist gate.
///
/// Every command is sanitized, then validated, and only then handed to the
/// platform shell. Shell invocation is acceptable only because validation
/// rejects metacharacters immediately before each spawn.
pub struct CommandExecutor {
    binary: ImageMagickBinary,
    options: ExecutorOptions,
    audit: Arc<dyn AuditSink>,
    session_id: Option<String>,
}

impl CommandExecutor {
    /// Creates an executor for an already known binary.
    pub fn new(
        binary: ImageMagickBinary,
        options: ExecutorOptions,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        tracing::info!(binary = %binary, "CommandExecutor initialized");
        Self {
            binary,
            options,
            audit,
            session_id: None,
        }
    }

    /// Creates an executor after detecting the installed binary.
    ///
    /// Fails with a configuration error when neither `magick` nor `convert`
    /// can be found. This is a startup precondition and is not retried.
    pub fn detect(options: ExecutorOptions, audit: Arc<dyn AuditSink>) -> Result<Self> {
        let binary = match &options.search_path {
            Some(path) => ImageMagickBinary::detect_in(path, &options.working_dir)?,
            None => ImageMagickBinary::detect()?,
        };
        Ok(Self::new(binary, options, audit))
    }

    pub fn binary(&self) -> ImageMagickBinary {
        self.binary
    }

    /// The base command generated commands should use.
    pub fn imagemagick_command(&self) -> &'static str {
        self.binary.command_name()
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Tags subsequent audit records with `session_id`.
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Validates `command` and records the outcome.
    pub fn validate(&self, command: &str) -> ValidationOutcome {
        let outcome = command::validate(command);

        record_best_effort(
            self.audit.as_ref(),
            &AuditRecord::Validation {
                timestamp: AuditRecord::now(),
                session_id: self.session_id.clone(),
                command: command.to_string(),
                passed: outcome.accepted,
                checks: outcome.checks,
                error_message: outcome.reason.clone(),
            },
        );

        if outcome.accepted {
            tracing::debug!(command = %command, "Command validation passed");
        } else {
            tracing::warn!(
                command = %command,
                reason = %outcome.reason_or_empty(),
                "Command validation failed"
            );
        }
        outcome
    }

    /// Sanitizes, validates and runs `command`.
    ///
    /// Never fails: validation rejections, non-zero exits, timeouts and spawn
    /// errors are all reported through the returned result.
    pub async fn execute(&self, command: &str) -> ExecutionResult {
        let started = Instant::now();
        let sanitized = command::sanitize(command);

        let outcome = self.validate(&sanitized);
        if !outcome.accepted {
            let result = ExecutionResult::failure(
                sanitized,
                "",
                "",
                format!("Command validation failed: {}", outcome.reason_or_empty()),
                0,
            );
            self.log_execution(&result);
            return result;
        }

        let output_file = command::extract_output_file(&sanitized);

        let mut child = self.shell_command(&sanitized);
        let result = match timeout(self.options.timeout, child.output()).await {
            Ok(Ok(output)) => {
                let elapsed_ms = elapsed_ms(started);
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                if output.status.success() {
                    ExecutionResult::success(sanitized, stdout, stderr, output_file, elapsed_ms)
                } else {
                    let message = match output.status.code() {
                        Some(code) => format!("Command failed with exit code {code}"),
                        None => "Command terminated by signal".to_string(),
                    };
                    ExecutionResult::failure(sanitized, stdout, stderr, message, elapsed_ms)
                }
            }
            Ok(Err(e)) => ExecutionResult::failure(
                sanitized,
                "",
                "",
                format!("Execution error: {e}"),
                elapsed_ms(started),
            ),
            Err(_) => ExecutionResult::failure(
                sanitized,
                "",
                "",
                format!(
                    "Command timed out after {}",
                    describe_duration(self.options.timeout)
                ),
                elapsed_ms(started),
            ),
        };

        self.log_execution(&result);
        result
    }

    /// Whether `path` exists, resolved against the working directory.
    pub fn check_file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path.as_ref()).exists()
    }

    /// Returns the identify output for an image, or `None` on any failure.
    ///
    /// Advisory only: missing files, non-zero exits, timeouts and spawn errors
    /// all yield `None`.
    pub async fn get_image_info(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = path.as_ref();
        if !self.check_file_exists(path) {
            return None;
        }

        let (program, subcommand) = self.binary.identify_invocation();
        let mut cmd = Command::new(program);
        if let Some(subcommand) = subcommand {
            cmd.arg(subcommand);
        }
        cmd.arg(path);
        self.prepare(&mut cmd);

        match timeout(self.options.info_timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(Ok(output)) => {
                tracing::debug!(path = %path.display(), status = %output.status, "identify failed");
                None
            }
            Ok(Err(e)) => {
                tracing::debug!(path = %path.display(), error = %e, "identify could not start");
                None
            }
            Err(_) => {
                tracing::debug!(path = %path.display(), "identify timed out");
                None
            }
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.options.working_dir.join(path)
        }
    }

    #[cfg(unix)]
    fn shell_command(&self, command_line: &str) -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command_line);
        self.prepare(&mut cmd);
        cmd
    }

    #[cfg(windows)]
    fn shell_command(&self, command_line: &str) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        self.prepare(&mut cmd);
        cmd
    }

    fn prepare(&self, cmd: &mut Command) {
        cmd.current_dir(&self.options.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(path) = &self.options.search_path {
            cmd.env("PATH", path);
        }
    }

    fn log_execution(&self, result: &ExecutionResult) {
        record_best_effort(
            self.audit.as_ref(),
            &AuditRecord::Execution {
                timestamp: AuditRecord::now(),
                session_id: self.session_id.clone(),
                result: result.clone(),
            },
        );

        if result.succeeded() {
            tracing::info!(
                command = %result.command(),
                elapsed_ms = result.elapsed_ms(),
                "Command executed successfully"
            );
        } else {
            tracing::error!(
                command = %result.command(),
                elapsed_ms = result.elapsed_ms(),
                error = %result.error_message().unwrap_or_default(),
                "Command execution failed"
            );
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn describe_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{} seconds", duration.as_secs())
    } else {
        format!("{} ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagent_core::NoopAuditSink;

    fn executor() -> CommandExecutor {
        CommandExecutor::new(
            ImageMagickBinary::Magick,
            ExecutorOptions::default(),
            Arc::new(NoopAuditSink),
        )
    }

    #[test]
    fn test_describe_duration() {
        assert_eq!(describe_duration(Duration::from_secs(30)), "30 seconds");
        assert_eq!(describe_duration(Duration::from_millis(250)), "250 ms");
    }

    #[test]
    fn test_validate_delegates_to_allowlist() {
        let executor = executor();
        assert!(executor.validate("convert input.jpg -rotate 90 output.jpg").accepted);
        assert!(!executor.validate("rm -rf /").accepted);
    }

    #[tokio::test]
    async fn test_rejected_command_is_not_spawned() {
        let executor = executor();
        let result = executor.execute("magick input.jpg | cat out.jpg").await;

        assert!(!result.succeeded());
        assert_eq!(
            result.error_message(),
            Some("Command validation failed: Shell metacharacters not allowed")
        );
        assert_eq!(result.elapsed_ms(), 0);
        assert!(result.stdout().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_result_reports_sanitized_command() {
        let executor = executor();
        let result = executor.execute("rm dir/victim.txt").await;
        assert_eq!(result.command(), "rm victim.txt");
        assert!(result.error_message().unwrap().contains("is not allowed"));
    }

    #[tokio::test]
    async fn test_image_info_missing_file() {
        let executor = executor();
        assert!(executor.get_image_info("definitely_missing_image.jpg").await.is_none());
    }

    #[test]
    fn test_session_id_is_tracked() {
        let mut executor = executor();
        assert!(executor.session_id().is_none());
        executor.set_session_id("abc");
        assert_eq!(executor.session_id(), Some("abc"));
    }
}
