//! Secret service implementation.
//!
//! Credentials come from secret.json first; providers without a usable key
//! there fall back to the environment.

use crate::env::Environment;
use crate::storage::SecretStorage;
use async_trait::async_trait;
use imagent_core::Result;
use imagent_core::config::{ProviderSecret, SecretConfig};
use imagent_core::secret::SecretService;
use imagent_core::LlmProvider;
use std::sync::{Arc, RwLock};

/// Environment variables consulted for each provider, in order.
fn key_env_vars(provider: LlmProvider) -> &'static [&'static str] {
    match provider {
        LlmProvider::Anthropic => &["ANTHROPIC_API_KEY"],
        LlmProvider::OpenAi => &["OPENAI_API_KEY"],
        LlmProvider::Google => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
    }
}

/// Service for loading provider credentials.
///
/// The merged configuration is cached after the first successful load.
#[derive(Clone)]
pub struct SecretServiceImpl {
    storage: SecretStorage,
    env: Environment,
    secrets: Arc<RwLock<Option<SecretConfig>>>,
}

impl SecretServiceImpl {
    /// Uses the default secret.json location and the process environment.
    pub fn new() -> Result<Self> {
        Ok(Self::with_storage(SecretStorage::new()?, Environment::process()))
    }

    pub fn with_storage(storage: SecretStorage, env: Environment) -> Self {
        Self {
            storage,
            env,
            secrets: Arc::new(RwLock::new(None)),
        }
    }

    /// Drops the cached configuration so the next load re-reads the file.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cached) = self.secrets.write() {
            *cached = None;
        }
    }

    fn load_merged(&self) -> Result<SecretConfig> {
        if let Ok(cached) = self.secrets.read() {
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let mut config = self.storage.load_or_default()?;
        for provider in [LlmProvider::Anthropic, LlmProvider::OpenAi, LlmProvider::Google] {
            let has_key = config
                .for_provider(provider)
                .is_some_and(|secret| !secret.api_key.trim().is_empty());
            if has_key {
                continue;
            }

            let Some(api_key) = key_env_vars(provider)
                .iter()
                .find_map(|var| self.env.get(var))
            else {
                continue;
            };
            let model_name = config
                .for_provider(provider)
                .and_then(|secret| secret.model_name.clone());
            tracing::debug!(provider = %provider, "Using API key from environment");
            config.set_provider(provider, ProviderSecret { api_key, model_name });
        }

        if let Ok(mut cached) = self.secrets.write() {
            *cached = Some(config.clone());
        }
        Ok(config)
    }
}

#[async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> Result<SecretConfig> {
        self.load_merged()
    }

    async fn secret_file_exists(&self) -> bool {
        self.storage.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn service(dir: &TempDir, env: Environment) -> SecretServiceImpl {
        SecretServiceImpl::with_storage(SecretStorage::with_path(dir.path().join("secret.json")), env)
    }

    #[tokio::test]
    async fn test_env_keys_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(
            &temp_dir,
            Environment::from_pairs([("OPENAI_API_KEY", "sk-env"), ("GEMINI_API_KEY", "g-env")]),
        );

        assert!(!service.secret_file_exists().await);
        let secrets = service.load_secrets().await.unwrap();
        assert_eq!(secrets.require_api_key(LlmProvider::OpenAi).unwrap(), "sk-env");
        assert_eq!(secrets.require_api_key(LlmProvider::Google).unwrap(), "g-env");
        assert!(secrets.require_api_key(LlmProvider::Anthropic).is_err());
    }

    #[tokio::test]
    async fn test_google_key_preferred_over_gemini_key() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(
            &temp_dir,
            Environment::from_pairs([("GOOGLE_API_KEY", "google"), ("GEMINI_API_KEY", "gemini")]),
        );
        let secrets = service.load_secrets().await.unwrap();
        assert_eq!(secrets.require_api_key(LlmProvider::Google).unwrap(), "google");
    }

    #[tokio::test]
    async fn test_file_key_wins_and_blank_file_key_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("secret.json"),
            r#"{
                "anthropic": {"api_key": "from-file"},
                "openai": {"api_key": "", "model_name": "gpt-4o-mini"}
            }"#,
        )
        .unwrap();
        let service = service(
            &temp_dir,
            Environment::from_pairs([("ANTHROPIC_API_KEY", "from-env"), ("OPENAI_API_KEY", "sk-env")]),
        );

        assert!(service.secret_file_exists().await);
        let secrets = service.load_secrets().await.unwrap();
        assert_eq!(secrets.require_api_key(LlmProvider::Anthropic).unwrap(), "from-file");
        let openai = secrets.openai.unwrap();
        assert_eq!(openai.api_key, "sk-env");
        assert_eq!(openai.model_name.as_deref(), Some("gpt-4o-mini"));
    }

    #[tokio::test]
    async fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("secret.json"), "not json").unwrap();
        let service = service(&temp_dir, Environment::empty());

        let err = service.load_secrets().await.unwrap_err();
        assert!(err.is_serialization());
    }

    #[tokio::test]
    async fn test_results_are_cached_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(&path, r#"{"openai": {"api_key": "first"}}"#).unwrap();
        let service = service(&temp_dir, Environment::empty());

        service.load_secrets().await.unwrap();
        fs::write(&path, r#"{"openai": {"api_key": "second"}}"#).unwrap();
        let cached = service.load_secrets().await.unwrap();
        assert_eq!(cached.openai.unwrap().api_key, "first");

        service.invalidate_cache();
        let reloaded = service.load_secrets().await.unwrap();
        assert_eq!(reloaded.openai.unwrap().api_key, "second");
    }
}
