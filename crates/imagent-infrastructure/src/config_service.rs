//! Configuration service implementation.
//!
//! Settings are layered: built-in defaults, then `config.toml`, then
//! environment variables. Command-line flags are applied on top by the binary.

use crate::env::Environment;
use crate::paths::ImagentPaths;
use imagent_core::config::Settings;
use imagent_core::{ImagentError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tracing::level_filters::LevelFilter;

/// Configuration service that loads and caches [`Settings`].
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: ImagentPaths,
    env: Environment,
    config: Arc<RwLock<Option<Settings>>>,
}

impl ConfigService {
    /// Uses the default config location and the process environment.
    pub fn new() -> Self {
        Self::with_paths(ImagentPaths::default(), Environment::process())
    }

    pub fn with_paths(paths: ImagentPaths, env: Environment) -> Self {
        Self {
            paths,
            env,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn paths(&self) -> &ImagentPaths {
        &self.paths
    }

    /// Returns the settings, loading them on first access.
    ///
    /// A missing `config.toml` yields defaults. An unreadable or invalid file,
    /// or an environment variable that does not parse, is a configuration
    /// error.
    pub fn get_settings(&self) -> Result<Settings> {
        if let Ok(cached) = self.config.read() {
            if let Some(settings) = cached.as_ref() {
                return Ok(settings.clone());
            }
        }

        let loaded = self.load()?;

        if let Ok(mut cached) = self.config.write() {
            *cached = Some(loaded.clone());
        }
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cached) = self.config.write() {
            *cached = None;
        }
    }

    /// Directory for log and audit files: the configured `log_dir`, or the
    /// data directory's `logs/`.
    pub fn resolve_log_dir(&self, settings: &Settings) -> Result<PathBuf> {
        match &settings.logging.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => self
                .paths
                .logs_dir()
                .map_err(|e| ImagentError::config(e.to_string())),
        }
    }

    fn load(&self) -> Result<Settings> {
        let config_path = self
            .paths
            .config_file()
            .map_err(|e| ImagentError::config(e.to_string()))?;

        let mut settings = load_file(&config_path)?;
        settings.logging.level = parse_log_level("logging.level", &settings.logging.level)?;
        apply_env(&mut settings, &self.env)?;

        tracing::debug!(
            provider = %settings.llm_provider,
            auto_execute = settings.auto_execute,
            max_history = settings.max_history,
            "Settings loaded"
        );
        Ok(settings)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn load_file(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        ImagentError::config(format!("Invalid config file {}: {}", path.display(), e))
    })
}

fn apply_env(settings: &mut Settings, env: &Environment) -> Result<()> {
    if let Some(value) = env.get("LLM_PROVIDER") {
        settings.llm_provider = value.parse().map_err(ImagentError::config)?;
    }
    if let Some(value) = env.get("LLM_MODEL") {
        settings.llm_model = Some(value);
    }
    if let Some(value) = env.get("AUTO_EXECUTE") {
        settings.auto_execute = parse_bool("AUTO_EXECUTE", &value)?;
    }
    if let Some(value) = env.get("MAX_HISTORY") {
        settings.max_history = parse_number("MAX_HISTORY", &value)?;
    }

    let logging = &mut settings.logging;
    if let Some(value) = env.get("ENABLE_LOGGING") {
        logging.enabled = parse_bool("ENABLE_LOGGING", &value)?;
    }
    if let Some(value) = env.get("LOG_LEVEL") {
        logging.level = parse_log_level("LOG_LEVEL", &value)?;
    }
    if let Some(value) = env.get("LOG_DIR") {
        logging.log_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = env.get("ENABLE_LLM_LOGGING") {
        logging.llm_logging = parse_bool("ENABLE_LLM_LOGGING", &value)?;
    }
    if let Some(value) = env.get("ENABLE_EXECUTION_LOGGING") {
        logging.execution_logging = parse_bool("ENABLE_EXECUTION_LOGGING", &value)?;
    }
    if let Some(value) = env.get("LOG_MAX_BYTES") {
        logging.max_bytes = parse_number("LOG_MAX_BYTES", &value)?;
    }
    if let Some(value) = env.get("LOG_BACKUP_COUNT") {
        logging.backup_count = parse_number("LOG_BACKUP_COUNT", &value)?;
    }
    Ok(())
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ImagentError::config(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}

/// Normalizes a level name for `EnvFilter`. `warning` is accepted as `warn`.
///
/// Anything else that is not a bare level would be read by `EnvFilter` as a
/// target directive and silently filter out every event.
fn parse_log_level(name: &str, value: &str) -> Result<String> {
    let lowered = value.trim().to_ascii_lowercase();
    let normalized = match lowered.as_str() {
        "warning" => "warn",
        other => other,
    };
    match normalized {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => {
            normalized
                .parse::<LevelFilter>()
                .map_err(|e| ImagentError::config(format!("{name}: {e}")))?;
            Ok(normalized.to_string())
        }
        _ => Err(ImagentError::config(format!(
            "{name} must be one of trace, debug, info, warn, warning, error, off; got '{value}'"
        ))),
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        ImagentError::config(format!("{name} must be a non-negative integer, got '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagent_core::LlmProvider;
    use std::fs;
    use tempfile::TempDir;

    fn service(dir: &TempDir, env: Environment) -> ConfigService {
        ConfigService::with_paths(ImagentPaths::new(Some(dir.path())), env)
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let temp_dir = TempDir::new().unwrap();
        let settings = service(&temp_dir, Environment::empty()).get_settings().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_file_then_env_layering() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            r#"
            llm_provider = "openai"
            llm_model = "gpt-4o-mini"
            max_history = 4
            "#,
        )
        .unwrap();
        let env = Environment::from_pairs([
            ("LLM_PROVIDER", "gemini"),
            ("AUTO_EXECUTE", "true"),
            ("LOG_LEVEL", "DEBUG"),
            ("LOG_DIR", "/var/log/imagent"),
            ("ENABLE_LLM_LOGGING", "off"),
        ]);

        let settings = service(&temp_dir, env).get_settings().unwrap();

        assert_eq!(settings.llm_provider, LlmProvider::Google);
        assert_eq!(settings.llm_model.as_deref(), Some("gpt-4o-mini"));
        assert!(settings.auto_execute);
        assert_eq!(settings.max_history, 4);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(
            settings.logging.log_dir.as_deref(),
            Some(Path::new("/var/log/imagent"))
        );
        assert!(!settings.logging.llm_logging);
        assert!(settings.logging.execution_logging);
    }

    #[test]
    fn test_invalid_env_values_are_config_errors() {
        let temp_dir = TempDir::new().unwrap();

        let err = service(&temp_dir, Environment::from_pairs([("MAX_HISTORY", "ten")]))
            .get_settings()
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("MAX_HISTORY"));

        let err = service(&temp_dir, Environment::from_pairs([("AUTO_EXECUTE", "maybe")]))
            .get_settings()
            .unwrap_err();
        assert!(err.to_string().contains("AUTO_EXECUTE"));

        let err = service(&temp_dir, Environment::from_pairs([("LOG_LEVEL", "verbose")]))
            .get_settings()
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("LOG_LEVEL"));

        let err = service(&temp_dir, Environment::from_pairs([("LLM_PROVIDER", "mistral")]))
            .get_settings()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_warning_level_maps_to_warn() {
        let temp_dir = TempDir::new().unwrap();
        let settings = service(&temp_dir, Environment::from_pairs([("LOG_LEVEL", "WARNING")]))
            .get_settings()
            .unwrap();
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn test_file_log_level_is_checked() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            "[logging]\nlevel = \"Warning\"\n",
        )
        .unwrap();
        let settings = service(&temp_dir, Environment::empty()).get_settings().unwrap();
        assert_eq!(settings.logging.level, "warn");

        fs::write(
            temp_dir.path().join("config.toml"),
            "[logging]\nlevel = \"loud\"\n",
        )
        .unwrap();
        let err = service(&temp_dir, Environment::empty())
            .get_settings()
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("config.toml"), "max_history = [").unwrap();

        let err = service(&temp_dir, Environment::empty())
            .get_settings()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_resolve_log_dir_defaults_under_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir, Environment::empty());
        let mut settings = Settings::default();

        assert_eq!(
            service.resolve_log_dir(&settings).unwrap(),
            temp_dir.path().join("logs")
        );

        settings.logging.log_dir = Some(PathBuf::from("custom"));
        assert_eq!(
            service.resolve_log_dir(&settings).unwrap(),
            PathBuf::from("custom")
        );
    }
}
