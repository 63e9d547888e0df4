//! LLM integration crate for promptsmith.
//!
//! Backends implement the stateless [`LlmClient`] trait and live in a
//! [`ProviderRegistry`]. Each call resolves a stored [`Connection`] to a
//! [`ProviderClient`] session that validates configuration, checks
//! connectivity, and generates text.
//!
//! # Providers
//! - **Ollama**: local model runner
//! - **DeepSeek**: cloud chat-completion API
//!
//! # Example
//! ```no_run
//! use promptsmith_core::config::ProvidersConfig;
//! use promptsmith_llm::{GenerateOptions, ProviderRegistry};
//!
//! # async fn example(connection: promptsmith_llm::Connection) -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ProviderRegistry::with_defaults(&ProvidersConfig::default())?;
//! if let Some(mut session) = registry.resolve(&connection) {
//!     let text = session.generate("Hello, world!", &GenerateOptions::default()).await?;
//!     println!("{}", text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod masking;
pub mod providers;
pub mod registry;
pub mod session;
pub mod types;

// Re-export main types
pub use client::{
    GenerateOptions, LlmClient, LlmRequest, LlmResponse, LlmUsage, ModelDescriptor,
    ProviderConfig,
};
pub use masking::{mask_config, merge_config_update};
pub use providers::{DeepSeekClient, MockClient, OllamaClient};
pub use registry::ProviderRegistry;
pub use session::{ProviderClient, SessionStatus};
pub use types::{builtin_descriptors, Connection, ConnectionStatus, ProviderDescriptor};
