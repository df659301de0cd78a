//! Agent orchestrator.
//!
//! [`ImageMagickAgent`] owns one session and drives it: it asks the LLM for a
//! command, classifies the reply, validates it, and executes confirmed
//! commands while keeping the working/pending image pointers up to date.

use crate::outcome::RequestOutcome;
use imagent_core::audit::{AuditRecord, AuditSink, FeedbackAction, record_best_effort};
use imagent_core::config::Settings;
use imagent_core::session::AppMode;
use imagent_core::{
    CommandGenerator, ExecutionResult, ImagentError, MessageRole, Result, Session,
};
use imagent_execution::CommandExecutor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Substrings that mark a reply as a question rather than a command.
///
/// Matched against the lowercased reply, so a command whose file names contain
/// `which` or `what` is also treated as a clarification.
const CLARIFICATION_MARKERS: [&str; 6] = [
    "?",
    "could you",
    "please specify",
    "which",
    "what",
    "unclear",
];

fn is_clarification(reply: &str) -> bool {
    let lowered = reply.to_lowercase();
    CLARIFICATION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Coordinates the LLM, the executor and the session.
///
/// Methods take `&mut self`: a session handles one request at a time.
pub struct ImageMagickAgent {
    generator: Arc<dyn CommandGenerator>,
    executor: CommandExecutor,
    audit: Arc<dyn AuditSink>,
    session: Session,
    auto_execute: bool,
}

impl ImageMagickAgent {
    pub fn new(
        settings: &Settings,
        generator: Arc<dyn CommandGenerator>,
        mut executor: CommandExecutor,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let session = Session::new(settings.max_history);
        executor.set_session_id(session.id.clone());
        tracing::info!(
            session_id = %session.id,
            provider = %generator.provider(),
            model = %generator.model(),
            binary = %executor.binary(),
            "Agent initialized"
        );
        Self {
            generator,
            executor,
            audit,
            session,
            auto_execute: settings.auto_execute,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn generator(&self) -> &dyn CommandGenerator {
        self.generator.as_ref()
    }

    pub fn auto_execute(&self) -> bool {
        self.auto_execute
    }

    pub fn set_auto_execute(&mut self, auto_execute: bool) {
        self.auto_execute = auto_execute;
    }

    /// The command awaiting confirmation, if any.
    pub fn pending_command(&self) -> Option<&str> {
        self.session.app_mode().pending_command()
    }

    /// Turns a natural-language request into a command.
    ///
    /// Provider failures leave the session untouched. Otherwise the request
    /// and the reply are appended to the history before the reply is
    /// classified. A command that needs confirmation is held as the pending
    /// command until [`confirm_pending`](Self::confirm_pending) or
    /// [`cancel_pending`](Self::cancel_pending).
    pub async fn process_request(&mut self, user_input: &str) -> RequestOutcome {
        let history = self.session.turns().to_vec();
        let reply = match self.generator.generate_command(user_input, &history).await {
            Ok(reply) => reply.trim().to_string(),
            Err(err) => {
                tracing::error!(error = %err, "Command generation failed");
                return RequestOutcome::ProviderFailed(err.to_string());
            }
        };

        self.session.append_turn(MessageRole::User, user_input);
        self.session.append_turn(MessageRole::Assistant, reply.clone());
        self.session.set_app_mode(AppMode::Idle);

        if is_clarification(&reply) {
            tracing::debug!("LLM asked for clarification");
            return RequestOutcome::Clarification(reply);
        }

        let validation = self.executor.validate(&reply);
        if !validation.accepted {
            return RequestOutcome::Rejected {
                command: reply,
                reason: validation.reason_or_empty().to_string(),
            };
        }

        let needs_confirmation = !self.auto_execute;
        if needs_confirmation {
            self.session.set_app_mode(AppMode::AwaitingConfirmation {
                command: reply.clone(),
            });
        }
        RequestOutcome::Command {
            command: reply,
            needs_confirmation,
        }
    }

    /// Executes `command` and records a successful output as pending.
    ///
    /// Clears any pending command. The command is re-validated by the
    /// executor, so this is safe to call with arbitrary text.
    pub async fn execute_command(&mut self, command: &str) -> ExecutionResult {
        self.session.set_app_mode(AppMode::Idle);
        let result = self.executor.execute(command).await;
        if result.succeeded() {
            if let Some(output) = result.output_file() {
                self.session.set_pending_output(output);
            }
        }
        result
    }

    /// Executes the command awaiting confirmation. `None` when nothing is pending.
    pub async fn confirm_pending(&mut self) -> Option<ExecutionResult> {
        let command = self.pending_command()?.to_string();
        Some(self.execute_command(&command).await)
    }

    /// Drops the command awaiting confirmation and returns it.
    pub fn cancel_pending(&mut self) -> Option<String> {
        let command = self.pending_command()?.to_string();
        self.session.set_app_mode(AppMode::Idle);
        self.record_feedback(FeedbackAction::Cancel, None);
        Some(command)
    }

    /// Makes the pending output the new working image.
    pub fn accept_output(&mut self) -> Option<PathBuf> {
        let accepted = self.session.accept_pending_output()?;
        self.record_feedback(FeedbackAction::Accept, Some(&accepted));
        Some(accepted)
    }

    /// Discards the pending output so the next edit targets the working image.
    pub fn refine(&mut self) {
        let discarded = self.session.pending_output().map(Path::to_path_buf);
        self.session.refine();
        self.record_feedback(FeedbackAction::Refine, discarded.as_deref());
    }

    /// Clears history, image pointers and any pending command.
    pub fn reset(&mut self) {
        self.session.reset();
        self.record_feedback(FeedbackAction::Reset, None);
    }

    /// Starts chaining edits from an existing image.
    pub fn open_image(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !self.executor.check_file_exists(path) {
            return Err(ImagentError::io(format!(
                "File not found: {}",
                path.display()
            )));
        }
        self.session.set_working_image(path);
        tracing::info!(image = %path.display(), "Working image set");
        Ok(())
    }

    pub fn check_file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.executor.check_file_exists(path)
    }

    pub async fn get_image_info(&self, path: impl AsRef<Path>) -> Option<String> {
        self.executor.get_image_info(path).await
    }

    fn record_feedback(&self, action: FeedbackAction, image: Option<&Path>) {
        tracing::info!(action = ?action, "User feedback");
        record_best_effort(
            self.audit.as_ref(),
            &AuditRecord::Feedback {
                timestamp: AuditRecord::now(),
                session_id: Some(self.session.id.clone()),
                action,
                image: image.map(|p| p.display().to_string()),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clarification_markers() {
        assert!(is_clarification("Could you specify the output size?"));
        assert!(is_clarification("Which image do you mean"));
        assert!(is_clarification("That request is UNCLEAR to me"));
        assert!(is_clarification("Please specify a format"));
        assert!(!is_clarification("magick input.jpg -resize 800x600 output.jpg"));
    }

    #[test]
    fn test_marker_inside_file_name_counts() {
        assert!(is_clarification("magick whatever.jpg out.png"));
    }
}
