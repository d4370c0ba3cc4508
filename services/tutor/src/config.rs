use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub openai_api_key: String,
    pub chat_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub data_dir: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let max_tokens_str = std::env::var("MAX_TOKENS").unwrap_or_else(|_| "700".to_string());
        let max_tokens = max_tokens_str
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidValue("MAX_TOKENS".to_string(), e.to_string()))?;

        let temperature_str = std::env::var("TEMPERATURE").unwrap_or_else(|_| "0.7".to_string());
        let temperature = temperature_str
            .parse::<f32>()
            .map_err(|e| ConfigError::InvalidValue("TEMPERATURE".to_string(), e.to_string()))?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue(
                "TEMPERATURE".to_string(),
                format!("'{temperature_str}' is outside the supported range 0.0..=2.0"),
            ));
        }

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            openai_api_key,
            chat_model,
            max_tokens,
            temperature,
            data_dir,
            log_level,
        })
    }
}
