pub mod chat;

use std::time::Duration;
use thiserror::Error;

/// Ways an upstream completion call can fail. None of them are retried.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("upstream credential missing or rejected: {0}")]
    Auth(String),
    #[error("could not reach upstream service: {0}")]
    Transport(String),
    #[error("upstream service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("upstream service error: {0}")]
    Upstream(String),
}

impl CompletionError {
    /// Category text that is safe to show clients when debug output is off.
    pub fn summary(&self) -> &'static str {
        match self {
            CompletionError::Auth(_) => "upstream service is misconfigured",
            CompletionError::Transport(_) => "upstream service is unreachable",
            CompletionError::Timeout(_) => "upstream service timed out",
            CompletionError::Upstream(_) => "upstream service returned an error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}
