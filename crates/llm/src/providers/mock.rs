//! Scripted backend for tests and offline development.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ModelDescriptor, ProviderConfig};
use promptsmith_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    FailGeneration(String),
    Unreachable,
}

/// Mock backend with a fixed behavior.
///
/// Every method that would touch the network bumps a counter, so tests can
/// assert that validation failures short-circuit before any I/O.
#[derive(Debug)]
pub struct MockClient {
    name: String,
    required: Vec<&'static str>,
    behavior: Behavior,
    network_calls: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockClient {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            name: "mock".to_string(),
            required: vec!["model"],
            behavior,
            network_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Connects fine and answers every prompt with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Reply(text.into()))
    }

    /// Connects fine but every generation fails with `detail`.
    pub fn failing_generation(detail: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::FailGeneration(detail.into()))
    }

    /// Every connectivity check fails as if the host refused the connection.
    pub fn unreachable() -> Self {
        Self::with_behavior(Behavior::Unreachable)
    }

    /// Override the provider identifier.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the required configuration keys.
    pub fn with_required(mut self, fields: &[&'static str]) -> Self {
        self.required = fields.to_vec();
        self
    }

    /// Number of simulated network round trips so far.
    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    /// Generation requests received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.prompt).collect()
    }

    fn touch_network(&self) {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn required_fields(&self) -> &[&'static str] {
        &self.required
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn check_connection(&self, _config: &ProviderConfig) -> AppResult<()> {
        self.touch_network();
        match self.behavior {
            Behavior::Unreachable => Err(AppError::Connectivity(
                "Connection error: connection refused".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn generate(
        &self,
        _config: &ProviderConfig,
        request: &LlmRequest,
    ) -> AppResult<LlmResponse> {
        self.touch_network();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match &self.behavior {
            Behavior::Reply(text) => Ok(LlmResponse {
                content: text.clone(),
                model: request.model.clone(),
                usage: Some(LlmUsage::new(3, 5)),
            }),
            Behavior::FailGeneration(detail) => Err(AppError::Generation(detail.clone())),
            Behavior::Unreachable => Err(AppError::Generation(
                "connection refused".to_string(),
            )),
        }
    }

    async fn list_models(&self, _config: &ProviderConfig) -> AppResult<Vec<ModelDescriptor>> {
        self.touch_network();
        Ok(vec![ModelDescriptor {
            id: "mock-model".to_string(),
            name: "Mock Model".to_string(),
            description: None,
            size: None,
        }])
    }
}
