//! DeepSeek backend.
//!
//! OpenAI-compatible chat-completion API with bearer authentication.
//! The base URL comes from the connection's `base_url` key when set, else
//! from application config.

use crate::client::{
    token_count, LlmClient, LlmRequest, LlmResponse, LlmUsage, ModelDescriptor, ProviderConfig,
};
use promptsmith_core::config::DeepSeekSettings;
use promptsmith_core::{AppError, AppResult};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Model used when neither the call nor the connection names one.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

const REQUIRED_CONFIG: &[&str] = &["api_key", "model"];

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

/// DeepSeek chat-completion client.
#[derive(Debug, Clone)]
pub struct DeepSeekClient {
    client: reqwest::Client,
    base_url: String,
}

impl DeepSeekClient {
    /// Create a client with the default base URL and timeouts (60s request, 10s connect).
    pub fn new() -> AppResult<Self> {
        Self::with_settings(&DeepSeekSettings::default())
    }

    /// Create a client from explicit settings.
    pub fn with_settings(settings: &DeepSeekSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to build DeepSeek HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn base_url<'a>(&'a self, config: &'a ProviderConfig) -> &'a str {
        config
            .get("base_url")
            .filter(|u| !u.is_empty())
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or(&self.base_url)
    }

    fn api_key(config: &ProviderConfig) -> &str {
        config.get("api_key").map(String::as_str).unwrap_or_default()
    }

    /// Pull the reply text out of a chat-completion body.
    ///
    /// Reads `choices[0].message.content`, falling back to
    /// `choices[0].delta.content`, then to an empty string.
    fn extract_content(body: &Value) -> String {
        let choice = &body["choices"][0];
        choice["message"]["content"]
            .as_str()
            .or_else(|| choice["delta"]["content"].as_str())
            .unwrap_or_default()
            .to_string()
    }

    fn extract_usage(body: &Value) -> Option<LlmUsage> {
        let usage = body.get("usage")?;
        let count = |key: &str| token_count(usage[key].as_u64().unwrap_or(0));
        let mut stats = LlmUsage::new(count("prompt_tokens"), count("completion_tokens"));
        if let Some(total) = usage["total_tokens"].as_u64() {
            stats.total_tokens = token_count(total);
        }
        Some(stats)
    }
}

#[async_trait::async_trait]
impl LlmClient for DeepSeekClient {
    fn provider_name(&self) -> &str {
        "deepseek"
    }

    fn required_fields(&self) -> &[&'static str] {
        REQUIRED_CONFIG
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn check_connection(&self, config: &ProviderConfig) -> AppResult<()> {
        let url = format!("{}/v1/models", self.base_url(config));
        tracing::debug!("Checking DeepSeek connectivity at {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(Self::api_key(config))
            .send()
            .await
            .map_err(|e| AppError::Connectivity(format!("Connection error: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Connectivity(format!(
                "Connection failed with status: {}",
                response.status().as_u16()
            )));
        }

        Ok(())
    }

    async fn generate(
        &self,
        config: &ProviderConfig,
        request: &LlmRequest,
    ) -> AppResult<LlmResponse> {
        tracing::info!("Sending chat completion request to DeepSeek");

        let url = format!("{}/v1/chat/completions", self.base_url(config));
        let payload = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(Self::api_key(config))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Generation(format!(
                "DeepSeek API error ({}): {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            AppError::Generation(format!("Failed to parse DeepSeek response: {}", e))
        })?;

        tracing::info!("Received completion from DeepSeek");

        Ok(LlmResponse {
            content: Self::extract_content(&body),
            model: body["model"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| request.model.clone()),
            usage: Self::extract_usage(&body),
        })
    }

    async fn list_models(&self, _config: &ProviderConfig) -> AppResult<Vec<ModelDescriptor>> {
        Ok(vec![
            ModelDescriptor {
                id: "deepseek-chat".to_string(),
                name: "DeepSeek Chat".to_string(),
                description: Some("General purpose chat model".to_string()),
                size: None,
            },
            ModelDescriptor {
                id: "deepseek-coder".to_string(),
                name: "DeepSeek Coder".to_string(),
                description: Some("Specialized for code generation".to_string()),
                size: None,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GenerateOptions;
    use crate::session::ProviderClient;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(pairs: &[(&str, &str)]) -> ProviderConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_content_prefers_message() {
        let body = json!({"choices": [{"message": {"content": "hello"}, "delta": {"content": "nope"}}]});
        assert_eq!(DeepSeekClient::extract_content(&body), "hello");
    }

    #[test]
    fn test_extract_content_falls_back_to_delta() {
        let body = json!({"choices": [{"delta": {"content": "partial"}}]});
        assert_eq!(DeepSeekClient::extract_content(&body), "partial");
    }

    #[test]
    fn test_extract_content_tolerates_empty_choices() {
        assert_eq!(DeepSeekClient::extract_content(&json!({"choices": []})), "");
        assert_eq!(DeepSeekClient::extract_content(&json!({})), "");
    }

    #[test]
    fn test_extract_usage() {
        let body = json!({"usage": {"prompt_tokens": 12, "completion_tokens": 30, "total_tokens": 42}});
        let usage = DeepSeekClient::extract_usage(&body).unwrap();
        assert_eq!(usage.total_tokens, 42);
        assert!(DeepSeekClient::extract_usage(&json!({})).is_none());
    }

    #[test]
    fn test_base_url_override() {
        let client = DeepSeekClient::new().unwrap();
        assert_eq!(client.base_url(&ProviderConfig::new()), "https://api.deepseek.com");
        let cfg = config(&[("base_url", "http://proxy.local/")]);
        assert_eq!(client.base_url(&cfg), "http://proxy.local");
    }

    #[tokio::test]
    async fn test_connect_without_api_key_is_rejected_locally() {
        let backend = Arc::new(DeepSeekClient::new().unwrap());
        let mut session = ProviderClient::new(backend, ProviderConfig::new());

        assert!(!session.connect(config(&[("model", "deepseek-chat")])).await);
        assert_eq!(
            session.error(),
            Some("Missing required configuration field: api_key")
        );
    }

    fn session_for(server: &MockServer, api_key: &str) -> ProviderClient {
        let backend = Arc::new(DeepSeekClient::new().unwrap());
        let base_url = server.uri();
        ProviderClient::new(
            backend,
            config(&[
                ("api_key", api_key),
                ("model", "deepseek-chat"),
                ("base_url", base_url.as_str()),
            ]),
        )
    }

    async fn mount_models(server: &MockServer, api_key: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("authorization", format!("Bearer {}", api_key).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_connect_and_generate() {
        let server = MockServer::start().await;
        mount_models(&server, "sk-test").await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "deepseek-chat",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Structured prompt"}}],
                "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server, "sk-test");
        let response = session
            .complete("Improve this", &GenerateOptions::default().with_max_tokens(256))
            .await
            .unwrap();
        assert_eq!(response.content, "Structured prompt");
        assert_eq!(response.usage.unwrap().total_tokens, 12);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url.path(), "/v1/models");
        let body: Value = requests[1].body_json().unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Improve this");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn test_rejected_key_fails_connect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad key"})))
            .mount(&server)
            .await;

        let mut session = session_for(&server, "sk-wrong");
        assert!(!session.test_connection().await);
        assert_eq!(session.error(), Some("Connection failed with status: 401"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_prefixed() {
        let server = MockServer::start().await;
        mount_models(&server, "sk-test").await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "overloaded"})))
            .mount(&server)
            .await;

        let mut session = session_for(&server, "sk-test");
        let err = session.generate("x", &GenerateOptions::default()).await.unwrap_err();
        assert!(err.to_string().starts_with("Generation error: DeepSeek API error (500"));
        assert!(session.error().unwrap().starts_with("Generation error:"));
    }

    #[test]
    fn test_extract_usage_clamps_oversized_counts() {
        let body = json!({"usage": {"prompt_tokens": 10_000_000_000u64, "completion_tokens": 1}});
        let usage = DeepSeekClient::extract_usage(&body).unwrap();
        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.total_tokens, u32::MAX);

        let body = json!({"usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 10_000_000_000u64}});
        assert_eq!(DeepSeekClient::extract_usage(&body).unwrap().total_tokens, u32::MAX);
    }

    #[tokio::test]
    async fn test_static_model_catalogue() {
        let client = DeepSeekClient::new().unwrap();
        let models = client.list_models(&ProviderConfig::new()).await.unwrap();
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["deepseek-chat", "deepseek-coder"]);
    }
}
