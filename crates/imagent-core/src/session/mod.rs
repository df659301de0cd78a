//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: Core session state (`Session`)
//! - `message`: Conversation turn types (`MessageRole`, `ConversationTurn`)
//! - `app_mode`: Confirmation state (`AppMode`)

mod app_mode;
mod message;
mod model;

// Re-export public API
pub use app_mode::AppMode;
pub use message::{ConversationTurn, MessageRole};
pub use model::{DEFAULT_MAX_TURNS, Session};
