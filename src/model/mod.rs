//! Model client adapters.
//!
//! Two interchangeable provider strategies implement one capability
//! interface, selected at configuration time:
//!
//! - [`openai::OpenAiClient`] talks to the OpenAI Responses API and relies
//!   on server-side history via `previous_response_id`, resending only the
//!   turns appended since the last round trip.
//! - [`gemini::GeminiClient`] talks to the Gemini `generateContent` API and
//!   resends the full transcript on every call.
//!
//! The strategies also deliberately differ in how many tool calls they
//! surface per turn; see the provider modules.

pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::conversation::ConversationState;
use crate::tools::ToolInvocationRequest;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Default per-request timeout, so a hung provider surfaces as an error
/// instead of stalling the task slot forever.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Provider errors. Fatal to the running task: the loop aborts, nothing is
/// delivered, and the task slot is freed. No automatic retry.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to decode provider response: {0}")]
    Decode(String),
    #[error("provider response contained no usable output")]
    EmptyResponse,
}

/// Outcome of one model round trip: either a terminal message or one or
/// more tool invocation requests, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurnResult {
    FinalMessage(String),
    /// Non-empty, in provider order.
    ToolCalls(Vec<ToolInvocationRequest>),
}

/// Capability interface over a provider.
///
/// `send` serializes the conversation the way its provider expects, issues
/// one network call, and decodes the response. Implementations that track
/// server-side history update the state's continuation metadata on success;
/// they never append turns.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(&self, state: &mut ConversationState) -> Result<ModelTurnResult, ProviderError>;
}

/// Which provider strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    /// Model used when the configuration names none.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4.1",
            ProviderKind::Gemini => "gemini-1.5-flash-latest",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!(
                "unknown provider `{other}` (expected openai or gemini)"
            )),
        }
    }
}

/// Configuration for building a provider client.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl ModelConfig {
    pub fn new(provider: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::OpenAi, api_key)
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::new(ProviderKind::Gemini, api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Build the configured provider client.
pub fn build_client(config: &ModelConfig) -> Result<Box<dyn ModelClient>, ProviderError> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    Ok(match config.provider {
        ProviderKind::OpenAi => Box::new(OpenAiClient::new(
            http,
            config.api_key.clone(),
            config.model.clone(),
        )),
        ProviderKind::Gemini => Box::new(GeminiClient::new(
            http,
            config.api_key.clone(),
            config.model.clone(),
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("openai".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("Gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert!("claude".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_model_config_defaults() {
        let config = ModelConfig::openai("sk-test");
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);

        let config = ModelConfig::gemini("key").with_model("gemini-2.0-flash");
        assert_eq!(config.model, "gemini-2.0-flash");
    }
}
