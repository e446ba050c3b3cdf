//! Application Configuration Module
//!
//! Centralizes the startup configuration for the interviewer service. Values
//! come from environment variables (a `.env` file is honoured) and can be
//! overridden by command-line flags in `main`.

use std::env;
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_INTERVIEW_CONFIG: &str = "interview.json";
pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub interview_config: PathBuf,
    pub prompts_dir: PathBuf,
    pub chat_model: String,
    pub base_url: String,
    pub secrets_file: Option<PathBuf>,
    pub password: Option<String>,
    pub transcript_dir: PathBuf,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `INTERVIEW_CONFIG`: (Optional) Path to the interview JSON. Defaults to "interview.json".
    /// *   `PROMPTS_DIR`: (Optional) Directory of directive overrides. Defaults to "prompts".
    /// *   `CHAT_MODEL`: (Optional) The model used for interviewer replies. Defaults to "gpt-4".
    /// *   `OPENAI_BASE_URL`: (Optional) An OpenAI-compatible API root.
    /// *   `SECRETS_FILE`: (Optional) JSON file holding `openai_api_key`; checked before `OPENAI_API_KEY`.
    /// *   `INTERVIEW_PASSWORD`: (Optional) Shared password respondents must enter first.
    /// *   `TRANSCRIPT_DIR`: (Optional) Where transcripts are written. Defaults to the working directory.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let interview_config =
            env::var("INTERVIEW_CONFIG").unwrap_or_else(|_| DEFAULT_INTERVIEW_CONFIG.to_string());
        let prompts_dir = env::var("PROMPTS_DIR").unwrap_or_else(|_| DEFAULT_PROMPTS_DIR.to_string());
        let chat_model = env::var("CHAT_MODEL")
            .unwrap_or_else(|_| interview_core::gateway::DEFAULT_CHAT_MODEL.to_string());
        let base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| interview_core::gateway::DEFAULT_BASE_URL.to_string());

        let secrets_file = non_empty_var("SECRETS_FILE").map(PathBuf::from);
        let password = non_empty_var("INTERVIEW_PASSWORD");
        let transcript_dir = env::var("TRANSCRIPT_DIR").unwrap_or_else(|_| ".".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "OPENAI_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", base_url),
            ));
        }

        Ok(Self {
            interview_config: PathBuf::from(interview_config),
            prompts_dir: PathBuf::from(prompts_dir),
            chat_model,
            base_url,
            secrets_file,
            password,
            transcript_dir: PathBuf::from(transcript_dir),
            log_level,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
