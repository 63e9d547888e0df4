//! Ollama backend.
//!
//! Local model runner reached over plain HTTP.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{
    token_count, LlmClient, LlmRequest, LlmResponse, LlmUsage, ModelDescriptor, ProviderConfig,
};
use promptsmith_core::config::OllamaSettings;
use promptsmith_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoint used when a connection leaves `endpoint` unset.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Model used when neither the call nor the connection names one.
pub const DEFAULT_MODEL: &str = "llama3.2";

const REQUIRED_CONFIG: &[&str] = &["endpoint", "model"];

/// Ollama `/api/generate` request body.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama `/api/generate` response body. Only `response` matters; the
/// counters feed token usage when present.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

/// Ollama `/api/tags` response body.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Ollama LLM client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// HTTP client with request and connect timeouts applied
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client with the default timeouts (30s request, 10s connect).
    pub fn new() -> AppResult<Self> {
        Self::with_settings(&OllamaSettings::default())
    }

    /// Create a client with explicit timeouts.
    pub fn with_settings(settings: &OllamaSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Ollama HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Configured endpoint without a trailing slash.
    fn endpoint(config: &ProviderConfig) -> &str {
        config
            .get("endpoint")
            .map(|e| e.trim_end_matches('/'))
            .unwrap_or(DEFAULT_ENDPOINT)
    }

    /// URL of the connectivity check.
    pub fn tags_url(config: &ProviderConfig) -> String {
        format!("{}/api/tags", Self::endpoint(config))
    }

    /// Convert a resolved request to the wire format.
    fn to_ollama_request(request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    fn convert_response(request: &LlmRequest, response: OllamaResponse) -> LlmResponse {
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(LlmUsage::new(
                token_count(prompt.unwrap_or(0)),
                token_count(completion.unwrap_or(0)),
            )),
        };

        LlmResponse {
            content: response.response.unwrap_or_default(),
            model: response.model.unwrap_or_else(|| request.model.clone()),
            usage,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn required_fields(&self) -> &[&'static str] {
        REQUIRED_CONFIG
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn apply_defaults(&self, config: &mut ProviderConfig) {
        let endpoint = config.entry("endpoint".to_string()).or_default();
        if endpoint.is_empty() {
            *endpoint = DEFAULT_ENDPOINT.to_string();
        }
    }

    async fn check_connection(&self, config: &ProviderConfig) -> AppResult<()> {
        let url = Self::tags_url(config);
        tracing::debug!("Checking Ollama connectivity at {}", url);

        let response = self
            .client
            .post(&url)
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
        tracing::info!("Sending completion request to Ollama");

        let url = format!("{}/api/generate", Self::endpoint(config));
        let body = Self::to_ollama_request(request);

        let response = self
            .client
            .post(&url)
            .json(&body)
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
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::info!("Received completion from Ollama");

        Ok(Self::convert_response(request, ollama_response))
    }

    async fn list_models(&self, config: &ProviderConfig) -> AppResult<Vec<ModelDescriptor>> {
        let response = self
            .client
            .get(Self::tags_url(config))
            .send()
            .await
            .map_err(|e| AppError::Connectivity(format!("Connection error: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Connectivity(format!(
                "Connection failed with status: {}",
                response.status().as_u16()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Serialization(format!("Failed to parse Ollama tags: {}", e)))?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelDescriptor {
                id: m.name.clone(),
                name: m.name,
                description: None,
                size: m.size,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GenerateOptions;
    use crate::session::ProviderClient;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(pairs: &[(&str, &str)]) -> ProviderConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new().unwrap();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.required_fields(), &["endpoint", "model"]);
        assert_eq!(client.default_model(), "llama3.2");
    }

    #[test]
    fn test_apply_defaults_fills_missing_endpoint() {
        let client = OllamaClient::new().unwrap();
        let mut cfg = config(&[("model", "llama3.2")]);
        client.apply_defaults(&mut cfg);
        assert_eq!(cfg.get("endpoint").map(String::as_str), Some(DEFAULT_ENDPOINT));
        assert_eq!(OllamaClient::tags_url(&cfg), "http://localhost:11434/api/tags");
    }

    #[test]
    fn test_apply_defaults_keeps_custom_endpoint() {
        let client = OllamaClient::new().unwrap();
        let mut cfg = config(&[("endpoint", "http://gpu-box:11434/")]);
        client.apply_defaults(&mut cfg);
        assert_eq!(OllamaClient::tags_url(&cfg), "http://gpu-box:11434/api/tags");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let request = LlmRequest::new("Hello", "llama3");
        let body = serde_json::to_value(OllamaClient::to_ollama_request(&request)).unwrap();
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["prompt"], "Hello");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 1024);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    /// A base URL nothing is listening on.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    async fn mount_tags(server: &MockServer, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_generate(server: &MockServer, body: Value) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_connect_and_generate() {
        let server = MockServer::start().await;
        mount_tags(&server, 200, json!({"models": []})).await;
        mount_generate(
            &server,
            json!({
                "model": "mistral",
                "response": "Cats are great.",
                "done": true,
                "prompt_eval_count": 4,
                "eval_count": 6
            }),
        )
        .await;

        let backend = Arc::new(OllamaClient::new().unwrap());
        let mut session = ProviderClient::new(backend, ProviderConfig::new());
        let endpoint = server.uri();
        assert!(session.connect(config(&[("endpoint", endpoint.as_str()), ("model", "mistral")])).await);

        let response = session
            .complete("Write about cats", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content, "Cats are great.");
        assert_eq!(response.usage.unwrap().total_tokens, 10);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url.path(), "/api/tags");
        assert_eq!(requests[1].url.path(), "/api/generate");
        let body: Value = requests[1].body_json().unwrap();
        assert_eq!(body["model"], "mistral");
        assert_eq!(body["prompt"], "Write about cats");
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn test_missing_response_field_yields_empty_text() {
        let server = MockServer::start().await;
        mount_tags(&server, 200, json!({})).await;
        mount_generate(&server, json!({"done": true})).await;

        let backend = Arc::new(OllamaClient::new().unwrap());
        let endpoint = server.uri();
        let mut session = ProviderClient::new(backend, config(&[("endpoint", endpoint.as_str()), ("model", "m")]));
        let text = session.generate("x", &GenerateOptions::default()).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_huge_token_counts_saturate() {
        let server = MockServer::start().await;
        mount_tags(&server, 200, json!({})).await;
        mount_generate(
            &server,
            json!({"response": "hi", "prompt_eval_count": 4294967295u64, "eval_count": 1}),
        )
        .await;

        let backend = Arc::new(OllamaClient::new().unwrap());
        let endpoint = server.uri();
        let mut session = ProviderClient::new(backend, config(&[("endpoint", endpoint.as_str()), ("model", "m")]));
        let response = session.complete("x", &GenerateOptions::default()).await.unwrap();

        let usage = response.usage.unwrap();
        assert_eq!(response.content, "hi");
        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.total_tokens, u32::MAX);
    }

    #[tokio::test]
    async fn test_counts_beyond_u32_are_clamped() {
        let server = MockServer::start().await;
        mount_tags(&server, 200, json!({})).await;
        mount_generate(
            &server,
            json!({"response": "hi", "prompt_eval_count": 10_000_000_000u64, "eval_count": 2}),
        )
        .await;

        let backend = Arc::new(OllamaClient::new().unwrap());
        let endpoint = server.uri();
        let mut session = ProviderClient::new(backend, config(&[("endpoint", endpoint.as_str()), ("model", "m")]));
        let usage = session
            .complete("x", &GenerateOptions::default())
            .await
            .unwrap()
            .usage
            .unwrap();

        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.completion_tokens, 2);
    }

    #[tokio::test]
    async fn test_non_success_status_fails_connect() {
        let server = MockServer::start().await;
        mount_tags(&server, 500, json!({})).await;

        let backend = Arc::new(OllamaClient::new().unwrap());
        let mut session = ProviderClient::new(backend, ProviderConfig::new());
        let endpoint = server.uri();
        assert!(!session.connect(config(&[("endpoint", endpoint.as_str()), ("model", "m")])).await);
        assert_eq!(session.error(), Some("Connection failed with status: 500"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_generation() {
        let url = closed_port_url();

        let backend = Arc::new(OllamaClient::new().unwrap());
        let mut session = ProviderClient::new(backend, config(&[("endpoint", url.as_str()), ("model", "m")]));
        let err = session.generate("x", &GenerateOptions::default()).await.unwrap_err();

        assert!(err.to_string().starts_with("Connection error:"));
    }

    #[tokio::test]
    async fn test_list_models_maps_tags() {
        let server = MockServer::start().await;
        mount_tags(&server, 200, json!({})).await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    {"name": "llama3.2:latest", "size": 2019393189u64},
                    {"name": "mistral"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = Arc::new(OllamaClient::new().unwrap());
        let endpoint = server.uri();
        let mut session = ProviderClient::new(backend, config(&[("endpoint", endpoint.as_str()), ("model", "m")]));
        let models = session.models().await;

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "llama3.2:latest");
        assert_eq!(models[0].size, Some(2019393189));
        assert_eq!(models[1].size, None);
    }
}
