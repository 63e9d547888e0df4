//! Backend implementations.

pub mod deepseek;
pub mod mock;
pub mod ollama;

pub use deepseek::DeepSeekClient;
pub use mock::MockClient;
pub use ollama::OllamaClient;
