//! Configuration for LlmAnalyzer.

use analysis_core::AnalysisError;
use std::env;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.openai.com";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Key prefixes copied from sample env files rather than real credentials.
const PLACEHOLDER_PREFIXES: &[&str] = &["your-", "your_", "<", "changeme", "sk-xxx"];

/// Configuration for LlmAnalyzer.
#[derive(Debug, Clone)]
pub struct LlmAnalyzerConfig {
    /// Base URL of the OpenAI-compatible API.
    pub api_url: String,

    /// API key for authentication.
    pub api_key: String,

    /// Model name to use.
    pub model: String,

    /// Maximum tokens for response.
    pub max_tokens: Option<u32>,

    /// Temperature for generation (0.0 - 2.0).
    pub temperature: Option<f32>,
}

impl Default for LlmAnalyzerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: Some(1500),
            temperature: Some(0.3),
        }
    }
}

impl LlmAnalyzerConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `LLM_API_KEY` - API key for authentication
    ///
    /// Optional environment variables:
    /// - `LLM_API_URL` - API URL (default: https://api.openai.com)
    /// - `LLM_MODEL` - Model name (default: gpt-4o-mini)
    /// - `LLM_MAX_TOKENS` - Max tokens (default: 1500)
    /// - `LLM_TEMPERATURE` - Temperature (default: 0.3)
    pub fn from_env() -> Result<Self, AnalysisError> {
        let api_key = env::var("LLM_API_KEY")
            .map_err(|_| AnalysisError::Configuration("LLM_API_KEY not set".to_string()))?;

        let api_url = env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let model = env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let max_tokens = env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(1500));

        let temperature = env::var("LLM_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(0.3));

        Ok(Self {
            api_url,
            api_key,
            model,
            max_tokens,
            temperature,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> LlmAnalyzerConfigBuilder {
        LlmAnalyzerConfigBuilder::default()
    }

    /// Whether the API key looks like a real credential.
    ///
    /// Empty keys and values left over from sample env files do not count.
    pub fn has_valid_credential(&self) -> bool {
        let key = self.api_key.trim();
        if key.is_empty() {
            return false;
        }
        let lower = key.to_lowercase();
        !PLACEHOLDER_PREFIXES
            .iter()
            .any(|prefix| lower.starts_with(prefix))
            && !lower.contains("placeholder")
    }
}

/// Builder for LlmAnalyzerConfig.
#[derive(Debug, Default)]
pub struct LlmAnalyzerConfigBuilder {
    config: LlmAnalyzerConfig,
}

impl LlmAnalyzerConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the API URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> LlmAnalyzerConfig {
        self.config
    }
}
