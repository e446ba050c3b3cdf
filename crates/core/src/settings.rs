//! Interview settings supplied at startup.
//!
//! Settings are read once from a JSON document and are immutable afterwards.
//! Every field except `topics` has a default, so the smallest valid document is
//! `{"topics": ["..."]}`.

use crate::error::ConfigurationError;
use crate::topic::TopicList;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FOLLOW_UP_LIMIT: usize = 1;
pub const DEFAULT_CONTEXT_WINDOW: usize = 4;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_MAX_ELAPSED_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterviewSettings {
    pub topics: Vec<String>,
    #[serde(default = "default_follow_up_limit")]
    pub follow_up_limit: usize,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on a single model call. Zero disables the bound.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Total time spent retrying transient provider failures. Zero disables retry.
    #[serde(default = "default_retry_max_elapsed_secs")]
    pub retry_max_elapsed_secs: u64,
}

fn default_follow_up_limit() -> usize {
    DEFAULT_FOLLOW_UP_LIMIT
}
fn default_context_window() -> usize {
    DEFAULT_CONTEXT_WINDOW
}
fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_retry_max_elapsed_secs() -> u64 {
    DEFAULT_RETRY_MAX_ELAPSED_SECS
}

impl InterviewSettings {
    pub fn new(topics: Vec<String>) -> Self {
        Self {
            topics,
            follow_up_limit: DEFAULT_FOLLOW_UP_LIMIT,
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            retry_max_elapsed_secs: DEFAULT_RETRY_MAX_ELAPSED_SECS,
        }
    }

    pub fn with_follow_up_limit(mut self, limit: usize) -> Self {
        self.follow_up_limit = limit;
        self
    }

    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&raw).map_err(|source| ConfigurationError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigurationError::InvalidValue {
                field: "temperature",
                reason: format!("{} is outside [0, 2]", self.temperature),
            });
        }
        if self.max_output_tokens == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "max_output_tokens",
                reason: "must be at least 1".to_string(),
            });
        }
        TopicList::new(self.topics.clone()).map(|_| ())
    }

    pub fn topic_list(&self) -> Result<TopicList, ConfigurationError> {
        TopicList::new(self.topics.clone())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn retry_max_elapsed(&self) -> Option<Duration> {
        (self.retry_max_elapsed_secs > 0).then(|| Duration::from_secs(self.retry_max_elapsed_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn minimal_document_gets_defaults() {
        let settings: InterviewSettings = serde_json::from_str(r#"{"topics": ["A"]}"#).unwrap();
        assert_eq!(settings, InterviewSettings::new(vec!["A".into()]));
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_durations_disable_bounds() {
        let mut settings = InterviewSettings::new(vec!["A".into()]);
        settings.request_timeout_secs = 0;
        settings.retry_max_elapsed_secs = 0;
        assert_eq!(settings.request_timeout(), None);
        assert_eq!(settings.retry_max_elapsed(), None);
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let mut settings = InterviewSettings::new(vec!["A".into()]);
        settings.temperature = 3.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigurationError::InvalidValue { field: "temperature", .. })
        ));
    }

    #[test]
    fn from_file_rejects_empty_topics() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("interview.json");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"topics": [], "follow_up_limit": 2}}"#).unwrap();

        assert!(matches!(
            InterviewSettings::from_file(&path),
            Err(ConfigurationError::EmptyTopics)
        ));
    }

    #[test]
    fn from_file_reads_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("interview.json");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"topics": ["A", "B"], "follow_up_limit": 3, "context_window": 6, "temperature": 0.2}}"#
        )
        .unwrap();

        let settings = InterviewSettings::from_file(&path).unwrap();
        assert_eq!(settings.follow_up_limit, 3);
        assert_eq!(settings.context_window, 6);
        assert_eq!(settings.topic_list().unwrap().len(), 2);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let result = InterviewSettings::from_file(Path::new("no_such_interview.json"));
        assert!(matches!(result, Err(ConfigurationError::Io { .. })));
    }
}
