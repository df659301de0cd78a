//! Session domain model.
//!
//! This module contains the Session entity: bounded conversation history plus
//! the image pointers that let edits be chained (open → transform → accept or
//! refine → transform again).

use super::app_mode::AppMode;
use super::message::{ConversationTurn, MessageRole};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of user/assistant exchanges kept in history.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Represents one interactive editing session.
///
/// A session contains:
/// - Conversation turns, capped at `2 * max_turns` (oldest dropped first)
/// - The working image: the current input across chained edits
/// - The pending output: the latest produced image, not yet accepted
/// - The application mode (idle, or a command awaiting confirmation)
///
/// Each session owns its state exclusively; the LLM collaborator receives a
/// read-only copy of the turns per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Timestamp when the session was created (ISO 8601 format)
    pub created_at: String,
    turns: Vec<ConversationTurn>,
    working_image: Option<PathBuf>,
    pending_output: Option<PathBuf>,
    max_turns: usize,
    #[serde(default)]
    app_mode: AppMode,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl Session {
    /// Creates an empty session keeping at most `max_turns` exchanges.
    pub fn new(max_turns: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            turns: Vec::new(),
            working_image: None,
            pending_output: None,
            max_turns,
            app_mode: AppMode::Idle,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn working_image(&self) -> Option<&Path> {
        self.working_image.as_deref()
    }

    pub fn pending_output(&self) -> Option<&Path> {
        self.pending_output.as_deref()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn app_mode(&self) -> &AppMode {
        &self.app_mode
    }

    pub fn set_app_mode(&mut self, mode: AppMode) {
        self.app_mode = mode;
    }

    /// Appends a turn and trims the history.
    pub fn append_turn(&mut self, role: MessageRole, content: impl Into<String>) {
        self.turns.push(ConversationTurn::new(role, content));
        self.trim();
    }

    /// Drops the oldest turns until at most `2 * max_turns` remain.
    pub fn trim(&mut self) {
        let limit = self.max_turns.saturating_mul(2);
        if self.turns.len() > limit {
            let excess = self.turns.len() - limit;
            self.turns.drain(..excess);
        }
    }

    /// Records a freshly produced output that the user has not accepted yet.
    pub fn set_pending_output(&mut self, path: impl Into<PathBuf>) {
        self.pending_output = Some(path.into());
    }

    /// Promotes the pending output to the working image.
    ///
    /// Appends a context exchange naming the new input so the next generated
    /// command targets it. Returns the accepted path, or `None` when nothing
    /// was pending.
    pub fn accept_pending_output(&mut self) -> Option<PathBuf> {
        let accepted = self.pending_output.take()?;
        self.working_image = Some(accepted.clone());
        self.push_input_context(&accepted);
        Some(accepted)
    }

    /// Discards the pending output; the next edit re-targets the working image.
    pub fn refine(&mut self) {
        self.pending_output = None;
    }

    /// Starts chaining edits from `path` (an opened or uploaded image).
    pub fn set_working_image(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.pending_output = None;
        self.working_image = Some(path.clone());
        self.push_input_context(&path);
    }

    /// Clears turns, image pointers and mode.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.working_image = None;
        self.pending_output = None;
        self.app_mode = AppMode::Idle;
    }

    fn push_input_context(&mut self, path: &Path) {
        let name = path.display();
        self.append_turn(
            MessageRole::User,
            format!("From now on, use {name} as the input image for my requests."),
        );
        self.append_turn(
            MessageRole::Assistant,
            format!("Understood. I will use {name} as the input image."),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new(3);
        assert!(session.turns().is_empty());
        assert!(session.working_image().is_none());
        assert!(session.pending_output().is_none());
        assert_eq!(session.max_turns(), 3);
        assert_eq!(session.app_mode(), &AppMode::Idle);
        assert!(!session.id.is_empty());
    }

    #[test]
    fn test_trim_keeps_most_recent_in_order() {
        let max_turns = 3;
        let mut session = Session::new(max_turns);
        for i in 0..(2 * max_turns + 2) {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            session.append_turn(role, format!("turn {i}"));
        }

        assert_eq!(session.turns().len(), 2 * max_turns);
        let contents: Vec<&str> = session.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["turn 2", "turn 3", "turn 4", "turn 5", "turn 6", "turn 7"]
        );
        assert_eq!(session.turns()[0].role, MessageRole::User);
    }

    #[test]
    fn test_accept_promotes_pending_output() {
        let mut session = Session::new(5);
        session.set_working_image("photo.jpg");
        session.set_pending_output("resized.jpg");

        let accepted = session.accept_pending_output();

        assert_eq!(accepted, Some(PathBuf::from("resized.jpg")));
        assert_eq!(session.working_image(), Some(Path::new("resized.jpg")));
        assert!(session.pending_output().is_none());
        let last_user = &session.turns()[session.turns().len() - 2];
        assert_eq!(last_user.role, MessageRole::User);
        assert!(last_user.content.contains("resized.jpg"));
        assert_eq!(session.turns().last().unwrap().role, MessageRole::Assistant);
    }

    #[test]
    fn test_accept_without_pending_is_noop() {
        let mut session = Session::new(5);
        assert!(session.accept_pending_output().is_none());
        assert!(session.working_image().is_none());
        assert!(session.turns().is_empty());
    }

    #[test]
    fn test_refine_keeps_working_image() {
        let mut session = Session::new(5);
        session.set_working_image("photo.jpg");
        session.set_pending_output("blurred.jpg");

        session.refine();

        assert_eq!(session.working_image(), Some(Path::new("photo.jpg")));
        assert!(session.pending_output().is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = Session::new(5);
        session.set_working_image("photo.jpg");
        session.set_pending_output("out.png");
        session.set_app_mode(AppMode::AwaitingConfirmation {
            command: "magick photo.jpg out.png".into(),
        });

        session.reset();

        assert!(session.turns().is_empty());
        assert!(session.working_image().is_none());
        assert!(session.pending_output().is_none());
        assert_eq!(session.app_mode().pending_command(), None);
    }

    #[test]
    fn test_context_exchange_respects_trim() {
        let mut session = Session::new(1);
        session.append_turn(MessageRole::User, "old request");
        session.append_turn(MessageRole::Assistant, "magick a.jpg b.jpg");
        session.set_pending_output("b.jpg");
        session.accept_pending_output();

        assert_eq!(session.turns().len(), 2);
        assert!(session.turns()[0].content.contains("b.jpg"));
    }
}
