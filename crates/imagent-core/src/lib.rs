//! Domain layer for imagent.
//!
//! Everything here is free of process and network I/O: the command gate
//! (validation and output-path sanitization), the execution result model,
//! session state, and the collaborator traits (`CommandGenerator`,
//! `AuditSink`, `SecretService`) that outer crates implement.

pub mod audit;
pub mod command;
pub mod config;
pub mod error;
pub mod execution;
pub mod provider;
pub mod secret;
pub mod session;

// Re-export common types
pub use audit::{AuditRecord, AuditSink, FeedbackAction, NoopAuditSink};
pub use error::{ImagentError, Result};
pub use execution::ExecutionResult;
pub use provider::{CommandGenerator, LlmProvider, ProviderError};
pub use session::{ConversationTurn, MessageRole, Session};
