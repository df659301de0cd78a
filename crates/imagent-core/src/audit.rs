//! Audit trail contract.
//!
//! Validation outcomes, executions, LLM calls and user feedback are recorded
//! through an injected [`AuditSink`]. Recording is best-effort: callers go
//! through [`record_best_effort`], which logs and swallows sink failures so an
//! audit problem never aborts a command.

use crate::command::ValidationChecks;
use crate::error::Result;
use crate::execution::ExecutionResult;
use crate::provider::LlmProvider;
use serde::{Deserialize, Serialize};

/// User feedback on a produced image or on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    /// The pending output became the new working image.
    Accept,
    /// The pending output was discarded.
    Refine,
    /// A proposed command was declined at confirmation.
    Cancel,
    /// The session was cleared.
    Reset,
}

/// One structured audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditRecord {
    Validation {
        timestamp: String,
        session_id: Option<String>,
        command: String,
        passed: bool,
        checks: ValidationChecks,
        error_message: Option<String>,
    },
    Execution {
        timestamp: String,
        session_id: Option<String>,
        result: ExecutionResult,
    },
    LlmCall {
        timestamp: String,
        provider: LlmProvider,
        model: String,
        latency_ms: u64,
        success: bool,
        request_chars: usize,
        history_turns: usize,
        response: Option<String>,
        error: Option<String>,
    },
    Feedback {
        timestamp: String,
        session_id: Option<String>,
        action: FeedbackAction,
        image: Option<String>,
    },
}

impl AuditRecord {
    /// Current time in the format used by all records.
    pub fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Whether the record belongs to the LLM call stream rather than the
    /// execution stream.
    pub fn is_llm_call(&self) -> bool {
        matches!(self, AuditRecord::LlmCall { .. })
    }
}

/// Receives audit records. Implementations must tolerate concurrent writers.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> Result<()>;
}

/// Sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }
}

/// Records `record`, logging and discarding any sink error.
pub fn record_best_effort(sink: &dyn AuditSink, record: &AuditRecord) {
    if let Err(e) = sink.record(record) {
        tracing::warn!(error = %e, "Failed to write audit record");
    }
}
