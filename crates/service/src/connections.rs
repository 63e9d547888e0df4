//! Connection and provider operations.
//!
//! Connections leave this module with their secret masked. Updates merge
//! through [`merge_config_update`] so a masked value sent back unchanged
//! never wipes the stored key.

use crate::Workbench;
use chrono::Utc;
use promptsmith_core::{AppError, AppResult};
use promptsmith_llm::{
    mask_config, merge_config_update, Connection, ConnectionStatus, ModelDescriptor,
    ProviderConfig, ProviderDescriptor,
};
use promptsmith_prompt::types::MAX_NAME_LENGTH;
use promptsmith_store::NewConnection;
use serde::Deserialize;

/// Fields for a new connection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionInput {
    pub provider: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: ProviderConfig,
    #[serde(default)]
    pub is_default: bool,
}

/// Changes to an existing connection. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Option<ProviderConfig>,
    /// `true` makes this the default; `false` leaves the flag alone.
    #[serde(default)]
    pub is_default: bool,
}

fn masked(mut connection: Connection) -> Connection {
    connection.config = mask_config(&connection.config, &connection.provider);
    connection
}

fn check_name(name: Option<&str>) -> AppResult<()> {
    if let Some(name) = name {
        let len = name.chars().count();
        if len > MAX_NAME_LENGTH {
            return Err(AppError::Validation(format!(
                "Connection name cannot exceed {} characters (got {})",
                MAX_NAME_LENGTH, len
            )));
        }
    }
    Ok(())
}

/// Blank names fall back to the provider's display name.
fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

impl Workbench {
    /// Active provider descriptors, ordered by name.
    pub fn list_provider_descriptors(&self) -> AppResult<Vec<ProviderDescriptor>> {
        self.store.list_active_providers()
    }

    /// A user's connections, default first, then newest first.
    pub fn list_connections(&self, user_id: i64) -> AppResult<Vec<Connection>> {
        Ok(self
            .store
            .list_connections(user_id)?
            .into_iter()
            .map(masked)
            .collect())
    }

    /// A user's connections whose last test succeeded.
    pub fn list_online_connections(&self, user_id: i64) -> AppResult<Vec<Connection>> {
        Ok(self
            .store
            .list_online_connections(user_id)?
            .into_iter()
            .map(masked)
            .collect())
    }

    pub fn default_connection(&self, user_id: i64) -> AppResult<Option<Connection>> {
        Ok(self.store.default_connection(user_id)?.map(masked))
    }

    pub fn get_connection(&self, user_id: i64, id: i64) -> AppResult<Connection> {
        self.owned_connection(user_id, id).map(masked)
    }

    /// Create a connection in `offline` state.
    ///
    /// The provider must be an active descriptor or a registered backend.
    /// Required fields are checked when the connection is first tested.
    pub fn create_connection(&self, user_id: i64, input: ConnectionInput) -> AppResult<Connection> {
        let known = match self.store.get_provider(&input.provider)? {
            Some(descriptor) => descriptor.is_active,
            None => self.registry.contains(&input.provider),
        };
        if !known {
            return Err(AppError::Validation(format!(
                "Unknown provider: {}",
                input.provider
            )));
        }

        let name = normalize_name(input.name);
        check_name(name.as_deref())?;

        let connection = self.store.insert_connection(&NewConnection {
            user_id,
            provider: input.provider,
            name,
            config: input.config,
            is_default: input.is_default,
        })?;

        tracing::info!(
            connection_id = connection.id,
            provider = %connection.provider,
            user_id,
            "Created connection"
        );
        Ok(masked(connection))
    }

    pub fn update_connection(
        &self,
        user_id: i64,
        id: i64,
        update: ConnectionUpdate,
    ) -> AppResult<Connection> {
        let current = self.owned_connection(user_id, id)?;

        let name = match update.name {
            Some(name) => normalize_name(Some(name)),
            None => current.name.clone(),
        };
        check_name(name.as_deref())?;

        let config = match update.config {
            Some(incoming) => merge_config_update(&current.config, incoming),
            None => current.config.clone(),
        };

        self.store.update_connection(id, name.as_deref(), &config)?;
        if update.is_default {
            self.store.set_default_connection(id)?;
        }

        tracing::info!(connection_id = id, user_id, "Updated connection");
        self.get_connection(user_id, id)
    }

    /// Make a connection the user's default for its provider.
    pub fn set_default_connection(&self, user_id: i64, id: i64) -> AppResult<Connection> {
        self.owned_connection(user_id, id)?;
        self.store.set_default_connection(id)?;
        self.get_connection(user_id, id)
    }

    pub fn delete_connection(&self, user_id: i64, id: i64) -> AppResult<()> {
        self.owned_connection(user_id, id)?;
        if !self.store.delete_connection(id)? {
            return Err(AppError::NotFound(format!("Connection {}", id)));
        }
        tracing::info!(connection_id = id, user_id, "Deleted connection");
        Ok(())
    }

    /// Check a connection and record the outcome.
    ///
    /// Status moves to `testing`, then to `online` or `error` with the
    /// test time and last error. A connection whose provider is not
    /// registered returns `false` and keeps its status.
    pub async fn test_connection(&self, user_id: i64, id: i64) -> AppResult<bool> {
        let connection = self.owned_connection(user_id, id)?;

        let Some(mut session) = self.registry.resolve(&connection) else {
            tracing::warn!(
                connection_id = id,
                provider = %connection.provider,
                "Connection provider is not registered"
            );
            return Ok(false);
        };

        self.store
            .set_connection_status(id, ConnectionStatus::Testing, None, None)?;

        let online = session.connect(ProviderConfig::new()).await;
        let status = if online {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Error
        };

        self.store
            .set_connection_status(id, status, Some(Utc::now()), session.error())?;

        tracing::info!(connection_id = id, status = status.as_str(), "Connection tested");
        Ok(online)
    }

    /// Models the connection's backend offers; empty when unreachable.
    pub async fn list_models(&self, user_id: i64, id: i64) -> AppResult<Vec<ModelDescriptor>> {
        let connection = self.owned_connection(user_id, id)?;
        match self.registry.resolve(&connection) {
            Some(mut session) => Ok(session.models().await),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{mock_config, mock_connection, workbench};
    use promptsmith_llm::MockClient;
    use std::sync::Arc;

    fn deepseek(is_default: bool, key: &str) -> ConnectionInput {
        let mut config = ProviderConfig::new();
        config.insert("api_key".to_string(), key.to_string());
        config.insert("model".to_string(), "deepseek-chat".to_string());
        ConnectionInput {
            provider: "deepseek".to_string(),
            name: None,
            config,
            is_default,
        }
    }

    #[test]
    fn test_create_rejects_unknown_provider() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let input = ConnectionInput {
            provider: "openai".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            wb.create_connection(1, input),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_connections_are_masked() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let created = wb.create_connection(1, deepseek(false, "sk-secret")).unwrap();

        assert_eq!(created.config.get("api_key").map(String::as_str), Some(""));
        assert_eq!(created.display_name(), "DeepSeek");
        assert_eq!(created.status, ConnectionStatus::Offline);

        let listed = wb.list_connections(1).unwrap();
        assert_eq!(listed[0].config.get("api_key").map(String::as_str), Some(""));

        let stored = wb.store().get_connection(created.id).unwrap().unwrap();
        assert_eq!(stored.config.get("api_key").map(String::as_str), Some("sk-secret"));
    }

    #[test]
    fn test_update_with_blank_secret_keeps_stored_key() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let created = wb.create_connection(1, deepseek(false, "sk-secret")).unwrap();

        let mut config = created.config.clone();
        config.insert("model".to_string(), "deepseek-coder".to_string());
        wb.update_connection(
            1,
            created.id,
            ConnectionUpdate {
                name: Some("Work".to_string()),
                config: Some(config),
                is_default: false,
            },
        )
        .unwrap();

        let stored = wb.store().get_connection(created.id).unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Work"));
        assert_eq!(stored.config.get("api_key").map(String::as_str), Some("sk-secret"));
        assert_eq!(stored.config.get("model").map(String::as_str), Some("deepseek-coder"));
    }

    #[test]
    fn test_update_replaces_non_empty_secret() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let created = wb.create_connection(1, deepseek(false, "sk-old")).unwrap();

        wb.update_connection(
            1,
            created.id,
            ConnectionUpdate {
                config: Some(deepseek(false, "sk-new").config),
                ..Default::default()
            },
        )
        .unwrap();

        let stored = wb.store().get_connection(created.id).unwrap().unwrap();
        assert_eq!(stored.config.get("api_key").map(String::as_str), Some("sk-new"));
    }

    #[test]
    fn test_single_default_per_provider() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let a = wb.create_connection(1, deepseek(true, "a")).unwrap();
        let b = wb.create_connection(1, deepseek(false, "b")).unwrap();

        wb.update_connection(
            1,
            b.id,
            ConnectionUpdate {
                is_default: true,
                ..Default::default()
            },
        )
        .unwrap();

        let defaults: Vec<_> = wb
            .list_connections(1)
            .unwrap()
            .into_iter()
            .filter(|c| c.is_default)
            .map(|c| c.id)
            .collect();
        assert_eq!(defaults, vec![b.id]);

        wb.set_default_connection(1, a.id).unwrap();
        assert_eq!(wb.default_connection(1).unwrap().map(|c| c.id), Some(a.id));
        assert!(!wb.get_connection(1, b.id).unwrap().is_default);
    }

    #[test]
    fn test_connection_operations_require_ownership() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let theirs = wb.create_connection(2, deepseek(false, "k")).unwrap();

        assert!(matches!(wb.get_connection(1, theirs.id), Err(AppError::Authorization(_))));
        assert!(matches!(
            wb.update_connection(1, theirs.id, ConnectionUpdate::default()),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(wb.delete_connection(1, theirs.id), Err(AppError::Authorization(_))));
        assert!(wb.list_connections(1).unwrap().is_empty());
    }

    #[test]
    fn test_delete_connection() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let created = wb.create_connection(1, deepseek(false, "k")).unwrap();

        wb.delete_connection(1, created.id).unwrap();
        assert!(matches!(wb.get_connection(1, created.id), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_connection_goes_online() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let connection = mock_connection(&wb, 1);

        assert!(wb.test_connection(1, connection.id).await.unwrap());

        let tested = wb.get_connection(1, connection.id).unwrap();
        assert_eq!(tested.status, ConnectionStatus::Online);
        assert!(tested.last_tested_at.is_some());
        assert!(tested.last_error.is_none());
        assert_eq!(wb.list_online_connections(1).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_connection_records_error() {
        let wb = workbench(Arc::new(MockClient::unreachable()));
        let connection = mock_connection(&wb, 1);

        assert!(!wb.test_connection(1, connection.id).await.unwrap());

        let tested = wb.get_connection(1, connection.id).unwrap();
        assert_eq!(tested.status, ConnectionStatus::Error);
        assert_eq!(tested.status.label(), "Connection failed");
        assert_eq!(
            tested.last_error.as_deref(),
            Some("Connection error: connection refused")
        );
        assert!(wb.list_online_connections(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_field_skips_network() {
        let mock = Arc::new(MockClient::replying("ok"));
        let wb = workbench(mock.clone());
        let connection = wb
            .create_connection(
                1,
                ConnectionInput {
                    provider: "mock".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(!wb.test_connection(1, connection.id).await.unwrap());
        assert_eq!(mock.network_calls(), 0);

        let tested = wb.get_connection(1, connection.id).unwrap();
        assert_eq!(tested.status, ConnectionStatus::Error);
        assert!(tested.last_error.unwrap().contains("model"));
    }

    #[tokio::test]
    async fn test_unregistered_provider_keeps_status() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        // Built-in descriptors are seeded, but this registry only knows `mock`.
        let connection = wb.create_connection(1, deepseek(false, "k")).unwrap();

        assert!(!wb.test_connection(1, connection.id).await.unwrap());
        assert_eq!(
            wb.get_connection(1, connection.id).unwrap().status,
            ConnectionStatus::Offline
        );
        assert!(wb.list_models(1, connection.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_models_through_backend() {
        let wb = workbench(Arc::new(MockClient::replying("ok")));
        let connection = wb
            .create_connection(
                1,
                ConnectionInput {
                    provider: "mock".to_string(),
                    config: mock_config(),
                    ..Default::default()
                },
            )
            .unwrap();

        let models = wb.list_models(1, connection.id).await.unwrap();
        assert!(!models.is_empty());
    }
}
