use std::time::Duration;

use crate::config::TriviaSettings;

/// Runtime configuration describing how to reach Open Trivia DB.
#[derive(Debug, Clone)]
pub struct OpenTdbConfig {
    pub api_url: String,
    pub timeout: Duration,
}

impl OpenTdbConfig {
    /// Construct a configuration from an explicit endpoint and request timeout.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_url: api_url.into(),
            timeout,
        }
    }
}

impl From<&TriviaSettings> for OpenTdbConfig {
    fn from(settings: &TriviaSettings) -> Self {
        Self::new(settings.api_url.clone(), settings.fetch_timeout)
    }
}
