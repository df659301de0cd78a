//! Application layer for imagent.
//!
//! The agent orchestrator coordinates the LLM collaborator, the command
//! executor and the session state.

pub mod agent;
pub mod outcome;

pub use agent::ImageMagickAgent;
pub use outcome::RequestOutcome;
