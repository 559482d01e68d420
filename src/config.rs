use thiserror::Error;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY not found in environment or .env file")]
    MissingApiKey,

    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidApiBase { url: String, reason: String },
}

/// Process-wide settings, built once at startup and passed to the components that need them.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Config {
    /// Reads the API key from the process environment.
    pub fn from_env(model: Option<String>, api_base: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), model, api_base)
    }

    /// Builds the configuration from an arbitrary variable lookup.
    /// Blank values count as missing.
    pub fn from_lookup<F>(
        lookup: F,
        model: Option<String>,
        api_base: Option<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let model = model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_base = api_base
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        validate_api_base(&api_base)?;

        Ok(Self {
            api_key,
            model,
            api_base,
        })
    }
}

fn validate_api_base(raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidApiBase {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidApiBase {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", other),
        }),
    }
}
