//! Configuration models.
//!
//! `Settings` is loaded from `config.toml` and environment variables;
//! `SecretConfig` holds provider credentials from `secret.json`. Loading lives
//! in `imagent-infrastructure`; these types only describe the data.

use crate::error::{ImagentError, Result};
use crate::provider::LlmProvider;
use crate::session::DEFAULT_MAX_TURNS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// LLM provider to use.
    pub llm_provider: LlmProvider,
    /// Model override. Each provider has its own default.
    pub llm_model: Option<String>,
    /// Execute generated commands without asking for confirmation.
    pub auto_execute: bool,
    /// Maximum number of conversation exchanges kept in history.
    pub max_history: usize,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::default(),
            llm_model: None,
            auto_execute: false,
            max_history: DEFAULT_MAX_TURNS,
            logging: LoggingSettings::default(),
        }
    }
}

/// Logging and audit configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Master switch for file logging and audit records.
    pub enabled: bool,
    /// Default filter level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Directory for log files. Defaults to the data directory's `logs/`.
    pub log_dir: Option<PathBuf>,
    /// Write `llm_calls.jsonl`.
    pub llm_logging: bool,
    /// Write `executions.jsonl`.
    pub execution_logging: bool,
    /// Rotate audit files once they reach this size.
    pub max_bytes: u64,
    /// Number of rotated audit files to keep.
    pub backup_count: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            log_dir: None,
            llm_logging: true,
            execution_logging: true,
            max_bytes: 10_000_000,
            backup_count: 5,
        }
    }
}

/// Root structure of `secret.json`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<ProviderSecret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<ProviderSecret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ProviderSecret>,
}

/// API credentials for one provider.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProviderSecret {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

impl SecretConfig {
    /// Returns the stored credentials for `provider`.
    pub fn for_provider(&self, provider: LlmProvider) -> Option<&ProviderSecret> {
        match provider {
            LlmProvider::Anthropic => self.anthropic.as_ref(),
            LlmProvider::OpenAi => self.openai.as_ref(),
            LlmProvider::Google => self.gemini.as_ref(),
        }
    }

    /// Stores credentials for `provider`, replacing any existing entry.
    pub fn set_provider(&mut self, provider: LlmProvider, secret: ProviderSecret) {
        match provider {
            LlmProvider::Anthropic => self.anthropic = Some(secret),
            LlmProvider::OpenAi => self.openai = Some(secret),
            LlmProvider::Google => self.gemini = Some(secret),
        }
    }

    /// Returns a non-empty API key for `provider`, or a configuration error
    /// naming the environment variable to set.
    pub fn require_api_key(&self, provider: LlmProvider) -> Result<&str> {
        self.for_provider(provider)
            .map(|secret| secret.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ImagentError::config(format!(
                    "{} must be set when using {} provider",
                    provider.api_key_env(),
                    provider
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.llm_provider, LlmProvider::Anthropic);
        assert!(settings.llm_model.is_none());
        assert!(!settings.auto_execute);
        assert_eq!(settings.max_history, 10);
        assert!(settings.logging.enabled);
        assert_eq!(settings.logging.max_bytes, 10_000_000);
        assert_eq!(settings.logging.backup_count, 5);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            llm_provider = "openai"
            auto_execute = true

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(settings.llm_provider, LlmProvider::OpenAi);
        assert!(settings.auto_execute);
        assert_eq!(settings.max_history, 10);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.execution_logging);
    }

    #[test]
    fn test_require_api_key_per_provider() {
        let mut secrets = SecretConfig::default();
        for provider in [LlmProvider::Anthropic, LlmProvider::OpenAi, LlmProvider::Google] {
            let err = secrets.require_api_key(provider).unwrap_err();
            assert!(err.is_config());
            assert!(err.to_string().contains(provider.api_key_env()));
        }

        secrets.set_provider(
            LlmProvider::OpenAi,
            ProviderSecret {
                api_key: "test-key".into(),
                model_name: None,
            },
        );
        assert_eq!(secrets.require_api_key(LlmProvider::OpenAi).unwrap(), "test-key");
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let mut secrets = SecretConfig::default();
        secrets.set_provider(
            LlmProvider::Anthropic,
            ProviderSecret {
                api_key: "  ".into(),
                model_name: None,
            },
        );
        assert!(secrets.require_api_key(LlmProvider::Anthropic).is_err());
    }
}
