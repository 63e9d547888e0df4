//! Provider registry.
//!
//! Maps a provider identifier to its backend. Built once at start-up and
//! handed to the orchestrators; more backends can be registered while the
//! process runs.

use crate::client::LlmClient;
use crate::providers::{DeepSeekClient, OllamaClient};
use crate::session::ProviderClient;
use crate::types::Connection;
use promptsmith_core::config::ProvidersConfig;
use promptsmith_core::AppResult;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of LLM backends keyed by provider identifier.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    backends: RwLock<HashMap<String, Arc<dyn LlmClient>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in backends (`ollama`, `deepseek`).
    pub fn with_defaults(settings: &ProvidersConfig) -> AppResult<Self> {
        let registry = Self::new();
        registry.register(Arc::new(OllamaClient::with_settings(&settings.ollama)?));
        registry.register(Arc::new(DeepSeekClient::with_settings(&settings.deepseek)?));
        Ok(registry)
    }

    /// Register a backend under its own provider name, replacing any
    /// backend previously registered under that name.
    pub fn register(&self, backend: Arc<dyn LlmClient>) {
        let id = backend.provider_name().to_string();
        tracing::debug!(provider = %id, "Registering LLM backend");
        self.backends
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, backend);
    }

    /// Look up a backend by provider identifier.
    pub fn get(&self, provider: &str) -> Option<Arc<dyn LlmClient>> {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider)
            .cloned()
    }

    /// Check whether a provider identifier is registered.
    pub fn contains(&self, provider: &str) -> bool {
        self.get(provider).is_some()
    }

    /// Registered provider identifiers, sorted.
    pub fn available_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Open a session for a stored connection.
    ///
    /// Returns `None` when the connection names no provider or an
    /// unregistered one.
    pub fn resolve(&self, connection: &Connection) -> Option<ProviderClient> {
        if connection.provider.is_empty() {
            return None;
        }
        self.get(&connection.provider)
            .map(|backend| ProviderClient::new(backend, connection.config.clone()))
    }
}
