//! Per-call provider session.
//!
//! A [`ProviderClient`] pairs a shared backend with one connection's
//! configuration and tracks the connected flag and last error for the
//! duration of a single operation. It is a plain value: create one per
//! in-flight call, never share one across concurrent calls.

use crate::client::{GenerateOptions, LlmClient, LlmRequest, LlmResponse, ModelDescriptor, ProviderConfig};
use promptsmith_core::{AppError, AppResult};
use std::sync::Arc;

/// Connection state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Online,
    Offline,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// Stateful handle over a backend for one connection.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    backend: Arc<dyn LlmClient>,
    config: ProviderConfig,
    connected: bool,
    last_error: Option<String>,
}

impl ProviderClient {
    /// Create a disconnected session with the given configuration.
    pub fn new(backend: Arc<dyn LlmClient>, config: ProviderConfig) -> Self {
        Self {
            backend,
            config,
            connected: false,
            last_error: None,
        }
    }

    /// Provider identifier of the underlying backend.
    pub fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }

    /// Effective configuration, including applied defaults.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// `online` once a connectivity check has succeeded, `offline` otherwise.
    pub fn status(&self) -> SessionStatus {
        if self.connected {
            SessionStatus::Online
        } else {
            SessionStatus::Offline
        }
    }

    /// Last recorded error, if any.
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn set_error(&mut self, error: String) {
        self.last_error = Some(error);
        self.connected = false;
    }

    /// Merge `config` into the session, validate it, then check connectivity.
    ///
    /// A missing or empty required field fails before any network call.
    pub async fn connect(&mut self, config: ProviderConfig) -> bool {
        self.config.extend(config);
        self.backend.apply_defaults(&mut self.config);

        let missing = self
            .backend
            .required_fields()
            .iter()
            .find(|field| self.config.get(**field).map_or(true, |v| v.is_empty()))
            .copied();

        if let Some(field) = missing {
            self.set_error(format!("Missing required configuration field: {}", field));
            return false;
        }

        self.test_connection().await
    }

    /// Run the backend's connectivity check with the current configuration.
    pub async fn test_connection(&mut self) -> bool {
        self.last_error = None;

        match self.backend.check_connection(&self.config).await {
            Ok(()) => {
                self.connected = true;
                true
            }
            Err(e) => {
                tracing::error!(
                    provider = self.backend.provider_name(),
                    error = %e,
                    "Connection check failed"
                );
                self.set_error(e.to_string());
                false
            }
        }
    }

    /// Generate a completion, connecting first if needed.
    pub async fn complete(
        &mut self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> AppResult<LlmResponse> {
        if !self.connected && !self.connect(ProviderConfig::new()).await {
            return Err(AppError::Connectivity(
                self.last_error
                    .clone()
                    .unwrap_or_else(|| "Provider not connected".to_string()),
            ));
        }

        let request = LlmRequest::resolve(prompt, options, &self.config, self.backend.default_model());

        tracing::debug!(
            provider = self.backend.provider_name(),
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Sending generation request"
        );

        match self.backend.generate(&self.config, &request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!(
                    provider = self.backend.provider_name(),
                    error = %e,
                    "Generation failed"
                );
                self.set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Generate and return only the text.
    pub async fn generate(&mut self, prompt: &str, options: &GenerateOptions) -> AppResult<String> {
        self.complete(prompt, options).await.map(|r| r.content)
    }

    /// List models, or an empty list when the backend cannot be reached.
    pub async fn models(&mut self) -> Vec<ModelDescriptor> {
        if !self.connected && !self.connect(ProviderConfig::new()).await {
            return Vec::new();
        }

        match self.backend.list_models(&self.config).await {
            Ok(models) => models,
            Err(e) => {
                tracing::error!(
                    provider = self.backend.provider_name(),
                    error = %e,
                    "Failed to fetch models"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockClient;

    fn config(pairs: &[(&str, &str)]) -> ProviderConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_connect_missing_field_makes_no_network_call() {
        let mock = Arc::new(MockClient::replying("hi").with_required(&["api_key", "model"]));
        let mut session = ProviderClient::new(mock.clone(), ProviderConfig::new());

        let ok = session.connect(config(&[("model", "m")])).await;

        assert!(!ok);
        assert_eq!(
            session.error(),
            Some("Missing required configuration field: api_key")
        );
        assert_eq!(session.status(), SessionStatus::Offline);
        assert_eq!(mock.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_connect_empty_value_counts_as_missing() {
        let mock = Arc::new(MockClient::replying("hi"));
        let mut session = ProviderClient::new(mock.clone(), ProviderConfig::new());

        assert!(!session.connect(config(&[("model", "")])).await);
        assert_eq!(session.error(), Some("Missing required configuration field: model"));
        assert_eq!(mock.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_connect_success_marks_online() {
        let mock = Arc::new(MockClient::replying("hi"));
        let mut session = ProviderClient::new(mock.clone(), ProviderConfig::new());

        assert!(session.connect(config(&[("model", "m")])).await);
        assert_eq!(session.status(), SessionStatus::Online);
        assert_eq!(session.error(), None);
        assert_eq!(mock.network_calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_merges_into_existing_config() {
        let mock = Arc::new(MockClient::replying("hi").with_required(&["api_key", "model"]));
        let mut session = ProviderClient::new(mock, config(&[("api_key", "sk-1")]));

        assert!(session.connect(config(&[("model", "m")])).await);
        assert_eq!(session.config().get("api_key").map(String::as_str), Some("sk-1"));
    }

    #[tokio::test]
    async fn test_connect_failure_records_error() {
        let mock = Arc::new(MockClient::unreachable());
        let mut session = ProviderClient::new(mock, ProviderConfig::new());

        assert!(!session.connect(config(&[("model", "m")])).await);
        assert_eq!(session.status(), SessionStatus::Offline);
        assert!(session.error().unwrap().starts_with("Connection error:"));
    }

    #[tokio::test]
    async fn test_generate_connects_implicitly() {
        let mock = Arc::new(MockClient::replying("a poem"));
        let mut session = ProviderClient::new(mock.clone(), config(&[("model", "m")]));

        let text = session.generate("write", &GenerateOptions::default()).await.unwrap();

        assert_eq!(text, "a poem");
        assert_eq!(mock.prompts(), vec!["write".to_string()]);
        assert_eq!(session.status(), SessionStatus::Online);
    }

    #[tokio::test]
    async fn test_generate_surfaces_connect_error() {
        let mock = Arc::new(MockClient::replying("unused"));
        let mut session = ProviderClient::new(mock.clone(), ProviderConfig::new());

        let err = session.generate("write", &GenerateOptions::default()).await.unwrap_err();

        assert!(matches!(err, AppError::Connectivity(_)));
        assert_eq!(err.to_string(), "Missing required configuration field: model");
        assert!(mock.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_generate_failure_records_prefixed_error() {
        let mock = Arc::new(MockClient::failing_generation("model exploded"));
        let mut session = ProviderClient::new(mock, config(&[("model", "m")]));

        let err = session.generate("write", &GenerateOptions::default()).await.unwrap_err();

        assert_eq!(err.to_string(), "Generation error: model exploded");
        assert_eq!(session.error(), Some("Generation error: model exploded"));
        assert_eq!(session.status(), SessionStatus::Offline);
    }

    #[tokio::test]
    async fn test_models_empty_when_unreachable() {
        let mock = Arc::new(MockClient::unreachable());
        let mut session = ProviderClient::new(mock, config(&[("model", "m")]));

        assert!(session.models().await.is_empty());
    }

    #[tokio::test]
    async fn test_models_lists_backend_catalogue() {
        let mock = Arc::new(MockClient::replying("x"));
        let mut session = ProviderClient::new(mock, config(&[("model", "m")]));

        let models = session.models().await;
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "mock-model");
    }
}
