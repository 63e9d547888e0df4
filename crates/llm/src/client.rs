//! LLM backend abstraction and request/response types.
//!
//! `LlmClient` is the stateless half of a provider: it knows how to talk to
//! one kind of backend given a configuration map. Connection state lives in
//! [`crate::session::ProviderClient`], one value per in-flight call.

use promptsmith_core::AppResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provider-specific configuration map (`endpoint`, `model`, `api_key`, ...).
pub type ProviderConfig = BTreeMap<String, String>;

/// Default sampling temperature when the caller gives none.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default output token budget when the caller gives none.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Caller-supplied generation overrides. Unset fields fall back to the
/// connection's configuration and then to backend defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerateOptions {
    /// Override the model for this call.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A fully resolved, non-streaming generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the LLM
    pub prompt: String,

    /// Model identifier (e.g., "llama3.2", "deepseek-chat")
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for sampling
    pub temperature: f32,
}

impl LlmRequest {
    /// Create a request with default sampling parameters.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Resolve model and sampling parameters.
    ///
    /// Model precedence: explicit option, then the configured `model` key,
    /// then the backend's default.
    pub fn resolve(
        prompt: impl Into<String>,
        options: &GenerateOptions,
        config: &ProviderConfig,
        default_model: &str,
    ) -> Self {
        let model = options
            .model
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| config.get("model").filter(|m| !m.is_empty()).cloned())
            .unwrap_or_else(|| default_model.to_string());

        Self {
            prompt: prompt.into(),
            model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics, when the backend reports them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<LlmUsage>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Narrow a backend-reported token count, clamping at `u32::MAX`.
pub(crate) fn token_count(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// A model offered by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Size on disk in bytes (local runners only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Trait for LLM backends.
///
/// Implementations hold no per-connection state: every method receives the
/// configuration it should use. This lets one instance sit in the registry
/// and serve any number of concurrent calls.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Get the provider identifier (e.g., "ollama", "deepseek").
    fn provider_name(&self) -> &str;

    /// Configuration keys that must be present and non-empty before any I/O.
    fn required_fields(&self) -> &[&'static str];

    /// Model used when neither the call nor the configuration names one.
    fn default_model(&self) -> &str;

    /// Fill in configuration defaults before validation.
    fn apply_defaults(&self, _config: &mut ProviderConfig) {}

    /// Lightweight connectivity check.
    ///
    /// Returns `AppError::Connectivity` carrying a descriptive message on
    /// transport failure or a non-success status.
    async fn check_connection(&self, config: &ProviderConfig) -> AppResult<()>;

    /// Perform a non-streaming completion.
    ///
    /// Failures are reported as `AppError::Generation`.
    async fn generate(&self, config: &ProviderConfig, request: &LlmRequest)
        -> AppResult<LlmResponse>;

    /// List the models the backend offers.
    async fn list_models(&self, config: &ProviderConfig) -> AppResult<Vec<ModelDescriptor>>;
}
