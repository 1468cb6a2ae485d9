//! Configuration loaded from the environment (and `.env` via `dotenv`).

use crate::enrichment::WikipediaClient;
use crate::error::{AssistantError, Result};
use crate::history::HistoryWindow;
use crate::llm::GenerationSettings;
use crate::summarizer::DEFAULT_PREVIEW_ROWS;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.together.xyz/v1";
pub const DEFAULT_DB_PATH: &str = "health.db";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub settings: GenerationSettings,
}

#[derive(Debug, Clone)]
pub struct DefinitionConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub database_path: PathBuf,
    pub definitions: DefinitionConfig,
    pub history_window: HistoryWindow,
    pub max_sql_attempts: u8,
    pub preview_rows: usize,
}

impl AssistantConfig {
    /// Load from process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an explicit key/value map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("TOGETHER_API_KEY")
            .or_else(|| get("LLM_API_KEY"))
            .ok_or_else(|| {
                AssistantError::Config("TOGETHER_API_KEY is not set in the environment or .env file".to_string())
            })?;

        let defaults = GenerationSettings::default();
        let settings = GenerationSettings {
            model: get("LLM_MODEL").unwrap_or(defaults.model),
            temperature: parse_or("LLM_TEMPERATURE", get("LLM_TEMPERATURE"), defaults.temperature)?,
            max_tokens: parse_or("LLM_MAX_TOKENS", get("LLM_MAX_TOKENS"), defaults.max_tokens)?,
        };

        let timeout_secs = parse_or(
            "DEFINITION_TIMEOUT_SECS",
            get("DEFINITION_TIMEOUT_SECS"),
            WikipediaClient::DEFAULT_TIMEOUT.as_secs(),
        )?;

        let max_sql_attempts: u8 = parse_or("MAX_SQL_ATTEMPTS", get("MAX_SQL_ATTEMPTS"), 1)?;
        if max_sql_attempts == 0 {
            return Err(AssistantError::Config("MAX_SQL_ATTEMPTS must be at least 1".to_string()));
        }

        Ok(Self {
            llm: LlmConfig {
                api_key,
                base_url: get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                settings,
            },
            database_path: PathBuf::from(get("HEALTH_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string())),
            definitions: DefinitionConfig {
                base_url: get("DEFINITION_BASE_URL")
                    .unwrap_or_else(|| WikipediaClient::DEFAULT_BASE_URL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            history_window: parse_or("HISTORY_WINDOW", get("HISTORY_WINDOW"), HistoryWindow::All)?,
            max_sql_attempts,
            preview_rows: parse_or("PREVIEW_ROWS", get("PREVIEW_ROWS"), DEFAULT_PREVIEW_ROWS)?,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|e| AssistantError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = AssistantConfig::from_map(&vars(&[("TOGETHER_API_KEY", "secret")])).unwrap();
        assert_eq!(config.llm.api_key, "secret");
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.settings, GenerationSettings::default());
        assert_eq!(config.database_path, PathBuf::from("health.db"));
        assert_eq!(config.definitions.timeout, Duration::from_secs(5));
        assert_eq!(config.history_window, HistoryWindow::All);
        assert_eq!(config.max_sql_attempts, 1);
        assert_eq!(config.preview_rows, 10);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let err = AssistantConfig::from_map(&vars(&[("TOGETHER_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, AssistantError::Config(_)));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = AssistantConfig::from_map(&vars(&[
            ("LLM_API_KEY", "k"),
            ("LLM_MODEL", "meta-llama/Llama-3-70b-chat-hf"),
            ("LLM_MAX_TOKENS", "800"),
            ("HEALTH_DB_PATH", "/data/health.db"),
            ("HISTORY_WINDOW", "6"),
            ("MAX_SQL_ATTEMPTS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.llm.settings.model, "meta-llama/Llama-3-70b-chat-hf");
        assert_eq!(config.llm.settings.max_tokens, 800);
        assert_eq!(config.database_path, PathBuf::from("/data/health.db"));
        assert_eq!(config.history_window, HistoryWindow::Last(6));
        assert_eq!(config.max_sql_attempts, 3);
    }

    #[test]
    fn test_bad_numbers_name_the_variable() {
        let err = AssistantConfig::from_map(&vars(&[("TOGETHER_API_KEY", "k"), ("LLM_TEMPERATURE", "warm")]))
            .unwrap_err();
        assert!(err.to_string().contains("LLM_TEMPERATURE"));

        let err = AssistantConfig::from_map(&vars(&[("TOGETHER_API_KEY", "k"), ("MAX_SQL_ATTEMPTS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("MAX_SQL_ATTEMPTS"));
    }
}
