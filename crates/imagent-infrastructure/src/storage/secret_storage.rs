//! Secret configuration file storage.
//!
//! Provides loading of provider credentials from ~/.config/imagent/secret.json.

use crate::paths::ImagentPaths;
use imagent_core::ImagentError;
use imagent_core::config::SecretConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during secret storage operations.
#[derive(Debug, Error)]
pub enum SecretStorageError {
    /// Configuration file not found.
    #[error("Configuration file not found at: {}", .0.display())]
    NotFound(PathBuf),
    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    /// Config directory not found.
    #[error("Could not determine home directory")]
    ConfigDirNotFound,
}

impl From<SecretStorageError> for ImagentError {
    fn from(e: SecretStorageError) -> Self {
        match e {
            SecretStorageError::ParseError(err) => ImagentError::from(err),
            other => ImagentError::config(other.to_string()),
        }
    }
}

/// Storage for the secret configuration file (secret.json).
///
/// Read-only: credentials are never written back, and keys are never
/// validated against the provider here.
///
/// # Security Note
///
/// This storage reads plaintext JSON files. The secret.json file should have
/// appropriate file permissions (e.g., 600) to prevent unauthorized access.
#[derive(Debug, Clone)]
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a new SecretStorage with the default path (~/.config/imagent/secret.json).
    pub fn new() -> Result<Self, SecretStorageError> {
        let path = ImagentPaths::default()
            .secret_file()
            .map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Creates a new SecretStorage with a custom path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the secret configuration from the JSON file.
    ///
    /// An empty (or whitespace-only) file is treated as an empty configuration.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SecretConfig::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads the configuration, treating a missing file as empty.
    pub fn load_or_default(&self) -> Result<SecretConfig, SecretStorageError> {
        match self.load() {
            Err(SecretStorageError::NotFound(_)) => Ok(SecretConfig::default()),
            other => other,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
