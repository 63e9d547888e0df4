//! Template records.

use crate::{db_err, format_ts, now, parse_json, parse_ts, to_json, Store};
use promptsmith_core::{AppError, AppResult};
use promptsmith_prompt::{CategoryCount, Template, TemplateDraft};
use rusqlite::{params, OptionalExtension, Row};

const SELECT_TEMPLATE: &str = "SELECT id, user_id, name, category, description, content, variables, \
     intent, expected_output_format, is_system, is_favorite, usage_count, created_at, updated_at \
     FROM templates";

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<Template> {
    let variables: String = row.get(6)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(Template {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        content: row.get(5)?,
        variables: parse_json(6, &variables)?,
        intent: row.get(7)?,
        expected_output_format: row.get(8)?,
        is_system: row.get(9)?,
        is_favorite: row.get(10)?,
        usage_count: row.get(11)?,
        created_at: parse_ts(12, &created_at)?,
        updated_at: parse_ts(13, &updated_at)?,
    })
}

impl Store {
    /// Insert or refresh system templates, matched by name.
    ///
    /// Usage counters and favorites of existing rows are left alone.
    pub fn seed_system_templates(&self, drafts: &[TemplateDraft]) -> AppResult<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(db_err("begin transaction"))?;
        let ts = format_ts(&now());

        for draft in drafts {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM templates WHERE name = ?1 AND is_system = 1",
                    params![draft.name],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err("look up system template"))?;

            let variables = to_json(&draft.variables)?;
            match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE templates SET category = ?2, description = ?3, content = ?4,
                            variables = ?5, intent = ?6, expected_output_format = ?7, updated_at = ?8
                         WHERE id = ?1",
                        params![
                            id,
                            draft.category,
                            draft.description,
                            draft.content,
                            variables,
                            draft.intent,
                            draft.expected_output_format,
                            ts,
                        ],
                    )
                    .map_err(db_err("refresh system template"))?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO templates (user_id, name, category, description, content, variables,
                            intent, expected_output_format, is_system, is_favorite, usage_count,
                            created_at, updated_at)
                         VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, 0, 0, ?8, ?8)",
                        params![
                            draft.name,
                            draft.category,
                            draft.description,
                            draft.content,
                            variables,
                            draft.intent,
                            draft.expected_output_format,
                            ts,
                        ],
                    )
                    .map_err(db_err("insert system template"))?;
                }
            }
        }

        tx.commit().map_err(db_err("commit system templates"))?;
        tracing::info!("Seeded {} system prompt templates", drafts.len());
        Ok(drafts.len())
    }

    /// Create a template owned by `user_id`.
    pub fn insert_template(&self, user_id: i64, draft: &TemplateDraft) -> AppResult<Template> {
        let id = {
            let conn = self.conn();
            let ts = format_ts(&now());
            conn.execute(
                "INSERT INTO templates (user_id, name, category, description, content, variables,
                    intent, expected_output_format, is_system, is_favorite, usage_count,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, 0, ?10, ?10)",
                params![
                    user_id,
                    draft.name,
                    draft.category,
                    draft.description,
                    draft.content,
                    to_json(&draft.variables)?,
                    draft.intent,
                    draft.expected_output_format,
                    draft.is_favorite,
                    ts,
                ],
            )
            .map_err(db_err("insert template"))?;
            conn.last_insert_rowid()
        };

        self.require_template(id)
    }

    /// Overwrite a template's editable fields.
    pub fn update_template(&self, id: i64, draft: &TemplateDraft) -> AppResult<Template> {
        let changed = self
            .conn()
            .execute(
                "UPDATE templates SET name = ?2, category = ?3, description = ?4, content = ?5,
                    variables = ?6, intent = ?7, expected_output_format = ?8, is_favorite = ?9,
                    updated_at = ?10
                 WHERE id = ?1",
                params![
                    id,
                    draft.name,
                    draft.category,
                    draft.description,
                    draft.content,
                    to_json(&draft.variables)?,
                    draft.intent,
                    draft.expected_output_format,
                    draft.is_favorite,
                    format_ts(&now()),
                ],
            )
            .map_err(db_err("update template"))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("Template {}", id)));
        }
        self.require_template(id)
    }

    /// Delete a non-system template. System rows are never removed.
    pub fn delete_template(&self, id: i64) -> AppResult<bool> {
        let changed = self
            .conn()
            .execute(
                "DELETE FROM templates WHERE id = ?1 AND is_system = 0",
                params![id],
            )
            .map_err(db_err("delete template"))?;
        Ok(changed > 0)
    }

    /// Look up a template by id.
    pub fn get_template(&self, id: i64) -> AppResult<Option<Template>> {
        self.conn()
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_TEMPLATE),
                params![id],
                template_from_row,
            )
            .optional()
            .map_err(db_err("load template"))
    }

    fn require_template(&self, id: i64) -> AppResult<Template> {
        self.get_template(id)?
            .ok_or_else(|| AppError::NotFound(format!("Template {}", id)))
    }

    /// System templates plus `user_id`'s own, system first, then newest first.
    pub fn list_templates(&self, user_id: i64) -> AppResult<Vec<Template>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE user_id = ?1 OR is_system = 1
                 ORDER BY is_system DESC, created_at DESC, id DESC",
                SELECT_TEMPLATE
            ))
            .map_err(db_err("prepare template query"))?;

        let rows = stmt
            .query_map(params![user_id], template_from_row)
            .map_err(db_err("query templates"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("read template"))
    }

    /// Category names with template counts, over the templates `user_id` can see.
    pub fn list_categories(&self, user_id: i64) -> AppResult<Vec<CategoryCount>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT category, COUNT(*) FROM templates
                 WHERE user_id = ?1 OR is_system = 1
                 GROUP BY category ORDER BY category",
            )
            .map_err(db_err("prepare category query"))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(CategoryCount {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .map_err(db_err("query categories"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("read category"))
    }

    /// Bump a template's usage counter by one.
    pub fn increment_usage(&self, template_id: i64) -> AppResult<()> {
        let changed = self
            .conn()
            .execute(
                "UPDATE templates SET usage_count = usage_count + 1 WHERE id = ?1",
                params![template_id],
            )
            .map_err(db_err("increment usage"))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("Template {}", template_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use promptsmith_core::AppError;
    use promptsmith_prompt::{system_templates, TemplateDraft};

    fn draft(name: &str, category: &str) -> TemplateDraft {
        TemplateDraft {
            name: name.to_string(),
            category: category.to_string(),
            content: "Tell me about ${topic}".to_string(),
            ..Default::default()
        }
    }

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.seed_system_templates(&system_templates()).unwrap();
        store
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let store = seeded();
        store.seed_system_templates(&system_templates()).unwrap();

        let templates = store.list_templates(1).unwrap();
        assert_eq!(templates.len(), 4);
        assert!(templates.iter().all(|t| t.is_system && t.user_id.is_none()));
    }

    #[test]
    fn test_reseed_keeps_usage_count() {
        let store = seeded();
        let blog = store.list_templates(1).unwrap().into_iter().find(|t| t.name == "Blog Writer").unwrap();
        store.increment_usage(blog.id).unwrap();

        store.seed_system_templates(&system_templates()).unwrap();
        assert_eq!(store.get_template(blog.id).unwrap().unwrap().usage_count, 1);
    }

    #[test]
    fn test_insert_and_get() {
        let store = Store::open_in_memory().unwrap();
        let mut d = draft("Mine", "Personal");
        d.is_favorite = true;

        let template = store.insert_template(7, &d).unwrap();
        assert_eq!(template.user_id, Some(7));
        assert!(!template.is_system);
        assert!(template.is_favorite);
        assert_eq!(template.usage_count, 0);

        let loaded = store.get_template(template.id).unwrap().unwrap();
        assert_eq!(loaded.content, "Tell me about ${topic}");
    }

    #[test]
    fn test_list_orders_system_first_then_newest() {
        let store = seeded();
        let older = store.insert_template(7, &draft("Older", "A")).unwrap();
        let newer = store.insert_template(7, &draft("Newer", "A")).unwrap();
        store.insert_template(8, &draft("Someone else's", "A")).unwrap();

        let templates = store.list_templates(7).unwrap();
        assert_eq!(templates.len(), 6);
        assert!(templates[..4].iter().all(|t| t.is_system));
        assert_eq!(templates[4].id, newer.id);
        assert_eq!(templates[5].id, older.id);
    }

    #[test]
    fn test_update_template() {
        let store = Store::open_in_memory().unwrap();
        let template = store.insert_template(7, &draft("Old", "A")).unwrap();

        let updated = store.update_template(template.id, &draft("New", "B")).unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.category, "B");
        assert_eq!(updated.created_at, template.created_at);

        assert!(matches!(
            store.update_template(999, &draft("X", "Y")),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_system_template_cannot_be_deleted() {
        let store = seeded();
        let system = store.list_templates(1).unwrap().remove(0);

        assert!(!store.delete_template(system.id).unwrap());
        let still_there = store.get_template(system.id).unwrap().unwrap();
        assert_eq!(still_there.name, system.name);
        assert_eq!(still_there.content, system.content);
    }

    #[test]
    fn test_delete_owned_template() {
        let store = Store::open_in_memory().unwrap();
        let template = store.insert_template(7, &draft("Mine", "A")).unwrap();
        assert!(store.delete_template(template.id).unwrap());
        assert!(store.get_template(template.id).unwrap().is_none());
    }

    #[test]
    fn test_categories_with_counts() {
        let store = seeded();
        store.insert_template(7, &draft("One", "Development")).unwrap();
        store.insert_template(8, &draft("Hidden", "Secret")).unwrap();

        let categories = store.list_categories(7).unwrap();
        let pairs: Vec<_> = categories.iter().map(|c| (c.name.as_str(), c.count)).collect();
        assert_eq!(
            pairs,
            vec![
                ("Analysis", 1),
                ("Content Creation", 1),
                ("Development", 2),
                ("General", 1),
            ]
        );
    }

    #[test]
    fn test_increment_usage_missing_template() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(store.increment_usage(42), Err(AppError::NotFound(_))));
    }
}
