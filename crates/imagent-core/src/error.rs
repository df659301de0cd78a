//! Error types for the imagent application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::ProviderError;

/// A shared error type for the entire imagent application.
///
/// Per-request failures (provider errors, validation rejections, execution
/// failures) are normally folded into structured results by the orchestrator.
/// This type is what escapes to the caller: startup configuration problems
/// and I/O around configuration and audit storage.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ImagentError {
    /// Configuration error (missing ImageMagick binary, missing credentials, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImagentError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ImagentError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ImagentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ImagentError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ImagentError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<ProviderError> for ImagentError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

/// Conversion from anyhow::Error
impl From<anyhow::Error> for ImagentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Conversion from String (for error messages)
impl From<String> for ImagentError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, ImagentError>`.
pub type Result<T> = std::result::Result<T, ImagentError>;
