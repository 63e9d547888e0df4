//! Operation surface for promptsmith.
//!
//! [`Workbench`] ties the store, the provider registry and the prompt
//! orchestrators together and enforces ownership on every call. Front
//! ends (the CLI today) talk only to this type.

mod connections;
mod improve;
mod templates;

pub use connections::{ConnectionInput, ConnectionUpdate};

use promptsmith_core::config::AppConfig;
use promptsmith_core::{AppError, AppResult};
use promptsmith_llm::{builtin_descriptors, Connection, ProviderRegistry};
use promptsmith_prompt::{system_templates, PromptImprover, PromptTestRunner, Template, TestLog};
use promptsmith_store::Store;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle over storage, backends and orchestrators.
pub struct Workbench {
    store: Arc<Store>,
    registry: Arc<ProviderRegistry>,
    runner: PromptTestRunner,
    improver: PromptImprover,
}

impl Workbench {
    pub fn new(store: Arc<Store>, registry: Arc<ProviderRegistry>) -> Self {
        let log: Arc<dyn TestLog> = store.clone();
        Self {
            runner: PromptTestRunner::new(registry.clone(), log),
            improver: PromptImprover::new(registry.clone()),
            store,
            registry,
        }
    }

    /// Open the configured database, build the default registry and seed
    /// providers and system templates.
    pub fn open(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let store = Store::open(&config.database_path())?;
        let registry = ProviderRegistry::with_defaults(&config.providers)?;

        let workbench = Self::new(Arc::new(store), Arc::new(registry));
        workbench.seed()?;
        Ok(workbench)
    }

    /// Insert or refresh provider descriptors and system templates.
    pub fn seed(&self) -> AppResult<()> {
        self.store.seed_providers(&builtin_descriptors())?;
        self.store.seed_system_templates(&system_templates())?;
        Ok(())
    }

    /// Replace the generation budget of tests, improvements and refinements.
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.runner = self.runner.with_budget(budget);
        self.improver = self.improver.with_budget(budget);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Load a template `user_id` may read.
    fn visible_template(&self, user_id: i64, id: i64) -> AppResult<Template> {
        let template = self
            .store
            .get_template(id)?
            .ok_or_else(|| AppError::NotFound(format!("Template {}", id)))?;

        if !template.is_visible_to(user_id) {
            return Err(AppError::Authorization(format!(
                "Template {} belongs to another user",
                id
            )));
        }
        Ok(template)
    }

    /// Load a connection owned by `user_id`, with its stored secret intact.
    fn owned_connection(&self, user_id: i64, id: i64) -> AppResult<Connection> {
        let connection = self
            .store
            .get_connection(id)?
            .ok_or_else(|| AppError::NotFound(format!("Connection {}", id)))?;

        if connection.user_id != user_id {
            return Err(AppError::Authorization(format!(
                "Connection {} belongs to another user",
                id
            )));
        }
        Ok(connection)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use promptsmith_llm::{MockClient, ProviderConfig};
    use tempfile::TempDir;

    /// Seeded in-memory workbench with `mock` registered.
    pub fn workbench(mock: Arc<MockClient>) -> Workbench {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let registry = Arc::new(ProviderRegistry::new());
        registry.register(mock);

        let workbench = Workbench::new(store, registry);
        workbench.seed().unwrap();
        workbench
    }

    pub fn mock_config() -> ProviderConfig {
        let mut config = ProviderConfig::new();
        config.insert("model".to_string(), "m".to_string());
        config
    }

    pub fn mock_connection(workbench: &Workbench, user_id: i64) -> Connection {
        workbench
            .create_connection(
                user_id,
                ConnectionInput {
                    provider: "mock".to_string(),
                    name: Some("Scripted".to_string()),
                    config: mock_config(),
                    is_default: false,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_open_seeds_database() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let workbench = Workbench::open(&config).unwrap();
        assert!(config.database_path().exists());
        assert_eq!(workbench.list_templates(1).unwrap().len(), 4);
        assert_eq!(workbench.list_provider_descriptors().unwrap().len(), 2);
        assert_eq!(
            workbench.registry().available_providers(),
            vec!["deepseek".to_string(), "ollama".to_string()]
        );

        // Opening again does not duplicate seeds.
        let reopened = Workbench::open(&config).unwrap();
        assert_eq!(reopened.list_templates(1).unwrap().len(), 4);
    }

    #[test]
    fn test_other_users_connection_is_rejected() {
        let workbench = workbench(Arc::new(MockClient::replying("ok")));
        let connection = mock_connection(&workbench, 1);

        assert!(matches!(
            workbench.owned_connection(2, connection.id),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            workbench.owned_connection(1, 999),
            Err(AppError::NotFound(_))
        ));
    }
}
