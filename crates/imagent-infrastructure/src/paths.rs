//! Unified path management for imagent configuration files.
//!
//! This ensures consistency across all platforms (Linux, macOS, Windows).

use imagent_core::config::{ProviderSecret, SecretConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_NAME: &str = "imagent";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Home directory could not be determined.
    #[error("Cannot find home directory")]
    HomeDirNotFound,
}

/// Unified path management for imagent.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/imagent/           # Config directory
/// ├── config.toml              # Application configuration
/// └── secret.json              # API keys
///
/// ~/.local/share/imagent/      # Data directory
/// └── logs/                    # Default log directory
///     ├── imagent.log.YYYY-MM-DD
///     ├── executions.jsonl
///     └── llm_calls.jsonl
/// ```
///
/// A base path replaces both roots, which keeps tests inside a temp dir.
#[derive(Debug, Clone, Default)]
pub struct ImagentPaths {
    base: Option<PathBuf>,
}

impl ImagentPaths {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    /// Returns the configuration directory (e.g., `~/.config/imagent/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_NAME))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Returns the data directory (e.g., `~/.local/share/imagent/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_NAME))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    /// Default log directory, used when no `log_dir` is configured.
    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("logs"))
    }

    /// Ensures the secret file exists, creating a template if it doesn't.
    ///
    /// The template has an entry per provider with an empty key. Empty keys
    /// count as missing, so environment variables still apply.
    ///
    /// # Security Note
    ///
    /// This function sets file permissions to 600 (user read/write only) on Unix systems.
    pub fn ensure_secret_file(&self) -> std::io::Result<PathBuf> {
        let secret_path = self
            .secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;

        if secret_path.exists() {
            return Ok(secret_path);
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = |model: &str| ProviderSecret {
            api_key: String::new(),
            model_name: Some(model.to_string()),
        };
        let template_config = SecretConfig {
            anthropic: Some(template("claude-sonnet-4-20250514")),
            openai: Some(template("gpt-4o")),
            gemini: Some(template("gemini-2.5-flash")),
        };

        let template_json = serde_json::to_string_pretty(&template_config)?;
        std::fs::write(&secret_path, template_json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&secret_path, permissions)?;
        }

        Ok(secret_path)
    }
}
