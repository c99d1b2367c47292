//! Process-wide settings, built once at startup and passed by reference.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str =
    "DataSynthSchemaBot/1.0 (https://example.com/contact; mailto:dev@example.com)";

/// Settings-level errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("missing credential for the generative backend (set GROQ_API_KEY)")]
    MissingApiKey,
}

/// Read-only configuration consumed by the core pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub groq_api_key: Option<String>,
    pub model_name: String,
    pub default_country: String,
    pub max_columns: usize,
    pub max_rows: usize,
    pub completion_base_url: String,
    pub knowledge_base_url: String,
    pub user_agent: String,
    pub listen: String,
    pub allowed_origin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            model_name: "allam-2-2b".to_string(),
            default_country: "hi_IN".to_string(),
            max_columns: 6,
            max_rows: 20,
            completion_base_url: "https://api.groq.com/openai/v1".to_string(),
            knowledge_base_url: "https://en.wikipedia.org".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            listen: "127.0.0.1:8000".to_string(),
            allowed_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text; missing keys keep their defaults and
    /// unknown keys are ignored.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// Load defaults, then `path` when it exists, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                Self::from_toml_str(&content)?
            }
            _ => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("GROQ_API_KEY") {
            self.groq_api_key = Some(value);
        }
        if let Some(value) = get("DATASYNTH_MODEL_NAME") {
            self.model_name = value;
        }
        if let Some(value) = get("DATASYNTH_DEFAULT_COUNTRY") {
            self.default_country = value;
        }
        if let Some(value) = get("DATASYNTH_MAX_COLUMNS") {
            self.max_columns = parse_count("DATASYNTH_MAX_COLUMNS", &value)?;
        }
        if let Some(value) = get("DATASYNTH_MAX_ROWS") {
            self.max_rows = parse_count("DATASYNTH_MAX_ROWS", &value)?;
        }
        if let Some(value) = get("DATASYNTH_KNOWLEDGE_BASE_URL") {
            self.knowledge_base_url = value;
        }
        if let Some(value) = get("DATASYNTH_COMPLETION_BASE_URL") {
            self.completion_base_url = value;
        }
        if let Some(value) = get("DATASYNTH_USER_AGENT") {
            self.user_agent = value;
        }
        if let Some(value) = get("DATASYNTH_LISTEN") {
            self.listen = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_columns == 0 {
            return Err(invalid("max_columns", "must be at least 1"));
        }
        if self.max_rows == 0 {
            return Err(invalid("max_rows", "must be at least 1"));
        }
        if self.model_name.trim().is_empty() {
            return Err(invalid("model_name", "must not be empty"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        Ok(())
    }

    /// The generative backend credential, required only when generating rows.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.groq_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .map_err(|err| invalid(key, &err.to_string()))
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
