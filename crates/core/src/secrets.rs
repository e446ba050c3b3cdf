//! Credential lookup.
//!
//! The provider API key is fetched once at startup through a `SecretProvider`
//! and stays wrapped in `SecretString` from then on.

use crate::error::ConfigurationError;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::Path;

pub const OPENAI_API_KEY: &str = "openai_api_key";

pub trait SecretProvider {
    fn get(&self, key: &str) -> Option<SecretString>;
}

/// Reads `key` from the process environment as its upper-case name.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecrets;

impl SecretProvider for EnvSecrets {
    fn get(&self, key: &str) -> Option<SecretString> {
        std::env::var(key.to_ascii_uppercase())
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(SecretString::from)
    }
}

/// A flat JSON object of string secrets, e.g. `{"openai_api_key": "sk-..."}`.
pub struct FileSecrets {
    values: HashMap<String, String>,
}

impl FileSecrets {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let values = serde_json::from_str(&raw).map_err(|source| ConfigurationError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { values })
    }
}

impl SecretProvider for FileSecrets {
    fn get(&self, key: &str) -> Option<SecretString> {
        self.values
            .get(key)
            .filter(|value| !value.trim().is_empty())
            .cloned()
            .map(SecretString::from)
    }
}

/// Asks each provider in order; the first hit wins.
#[derive(Default)]
pub struct ChainedSecrets {
    providers: Vec<Box<dyn SecretProvider + Send + Sync>>,
}

impl ChainedSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl SecretProvider + Send + Sync + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl SecretProvider for ChainedSecrets {
    fn get(&self, key: &str) -> Option<SecretString> {
        self.providers.iter().find_map(|provider| provider.get(key))
    }
}

pub fn require(provider: &dyn SecretProvider, key: &str) -> Result<SecretString, ConfigurationError> {
    provider
        .get(key)
        .ok_or_else(|| ConfigurationError::MissingCredential(key.to_string()))
}
