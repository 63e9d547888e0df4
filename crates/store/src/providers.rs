//! Provider descriptor records.

use crate::{db_err, format_ts, now, parse_json, to_json, Store};
use promptsmith_core::AppResult;
use promptsmith_llm::ProviderDescriptor;
use rusqlite::{params, OptionalExtension, Row};

const SELECT_PROVIDER: &str =
    "SELECT id, name, description, icon, is_active, config_schema FROM providers";

fn provider_from_row(row: &Row<'_>) -> rusqlite::Result<ProviderDescriptor> {
    let schema: String = row.get(5)?;
    Ok(ProviderDescriptor {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        is_active: row.get(4)?,
        config_schema: parse_json(5, &schema)?,
    })
}

impl Store {
    /// Insert or refresh provider descriptors, keyed by id.
    pub fn seed_providers(&self, descriptors: &[ProviderDescriptor]) -> AppResult<usize> {
        let conn = self.conn();
        let ts = format_ts(&now());

        for descriptor in descriptors {
            conn.execute(
                "INSERT INTO providers (id, name, description, icon, is_active, config_schema, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    icon = excluded.icon,
                    is_active = excluded.is_active,
                    config_schema = excluded.config_schema,
                    updated_at = excluded.updated_at",
                params![
                    descriptor.id,
                    descriptor.name,
                    descriptor.description,
                    descriptor.icon,
                    descriptor.is_active,
                    to_json(&descriptor.config_schema)?,
                    ts,
                ],
            )
            .map_err(db_err("seed provider"))?;
        }

        tracing::debug!("Seeded {} provider descriptors", descriptors.len());
        Ok(descriptors.len())
    }

    /// Look up a provider descriptor by id.
    pub fn get_provider(&self, id: &str) -> AppResult<Option<ProviderDescriptor>> {
        self.conn()
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_PROVIDER),
                params![id],
                provider_from_row,
            )
            .optional()
            .map_err(db_err("load provider"))
    }

    /// Active provider descriptors, ordered by name.
    pub fn list_active_providers(&self) -> AppResult<Vec<ProviderDescriptor>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!("{} WHERE is_active = 1 ORDER BY name", SELECT_PROVIDER))
            .map_err(db_err("prepare provider query"))?;

        let rows = stmt
            .query_map([], provider_from_row)
            .map_err(db_err("query providers"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("read provider"))
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use promptsmith_llm::builtin_descriptors;

    #[test]
    fn test_seed_and_list_providers() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.seed_providers(&builtin_descriptors()).unwrap(), 2);

        let providers = store.list_active_providers().unwrap();
        let ids: Vec<_> = providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["deepseek", "ollama"]);
        assert_eq!(providers[1].config_schema, builtin_descriptors()[0].config_schema);
    }

    #[test]
    fn test_reseed_updates_in_place() {
        let store = Store::open_in_memory().unwrap();
        store.seed_providers(&builtin_descriptors()).unwrap();

        let mut descriptors = builtin_descriptors();
        descriptors[1].is_active = false;
        store.seed_providers(&descriptors).unwrap();

        let ids: Vec<_> = store
            .list_active_providers()
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["ollama"]);
        assert!(!store.get_provider("deepseek").unwrap().unwrap().is_active);
        assert!(store.get_provider("openai").unwrap().is_none());
    }
}
