//! Template operations.

use crate::Workbench;
use promptsmith_core::{AppError, AppResult};
use promptsmith_prompt::{
    load_template_dir, preview, CategoryCount, Preview, Template, TemplateDraft, TestRecord,
    Variables,
};
use std::path::Path;

impl Workbench {
    /// System templates plus the user's own, system first, then newest first.
    pub fn list_templates(&self, user_id: i64) -> AppResult<Vec<Template>> {
        self.store.list_templates(user_id)
    }

    pub fn get_template(&self, user_id: i64, id: i64) -> AppResult<Template> {
        self.visible_template(user_id, id)
    }

    pub fn create_template(&self, user_id: i64, draft: TemplateDraft) -> AppResult<Template> {
        draft.validate()?;
        let template = self.store.insert_template(user_id, &draft)?;
        tracing::info!(template_id = template.id, user_id, "Created template");
        Ok(template)
    }

    /// Overwrite a template the user owns. System templates are read-only.
    pub fn update_template(
        &self,
        user_id: i64,
        id: i64,
        draft: TemplateDraft,
    ) -> AppResult<Template> {
        let template = self.visible_template(user_id, id)?;
        if !template.is_editable_by(user_id) {
            return Err(AppError::Authorization(
                "System templates cannot be modified.".to_string(),
            ));
        }

        draft.validate()?;
        self.store.update_template(id, &draft)
    }

    /// Delete a template the user owns. Fails for system templates and
    /// leaves them untouched.
    pub fn delete_template(&self, user_id: i64, id: i64) -> AppResult<()> {
        let template = self.visible_template(user_id, id)?;
        if template.is_system {
            return Err(AppError::Authorization(
                "System templates cannot be deleted.".to_string(),
            ));
        }
        if !template.is_editable_by(user_id) {
            return Err(AppError::Authorization(format!(
                "Template {} belongs to another user",
                id
            )));
        }

        if !self.store.delete_template(id)? {
            return Err(AppError::NotFound(format!("Template {}", id)));
        }
        tracing::info!(template_id = id, user_id, "Deleted template");
        Ok(())
    }

    /// Create one owned template per YAML file in `dir`.
    ///
    /// Every file is parsed and validated before anything is written.
    pub fn import_templates(&self, user_id: i64, dir: &Path) -> AppResult<Vec<Template>> {
        let drafts = load_template_dir(dir)?;
        let mut created = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            created.push(self.store.insert_template(user_id, draft)?);
        }
        tracing::info!(count = created.len(), ?dir, "Imported templates");
        Ok(created)
    }

    pub fn list_categories(&self, user_id: i64) -> AppResult<Vec<CategoryCount>> {
        self.store.list_categories(user_id)
    }

    /// Render a visible template and run it against one of the user's
    /// connections. Backend failures come back as a record with an
    /// `error` or `timeout` status.
    pub async fn test_template(
        &self,
        user_id: i64,
        template_id: i64,
        variables: &Variables,
        connection_id: i64,
    ) -> AppResult<TestRecord> {
        let template = self.visible_template(user_id, template_id)?;
        let connection = self.owned_connection(user_id, connection_id)?;
        self.runner.run(&template, variables, &connection).await
    }

    /// The user's ten most recent tests of a visible template.
    pub fn list_test_history(&self, user_id: i64, template_id: i64) -> AppResult<Vec<TestRecord>> {
        self.visible_template(user_id, template_id)?;
        self.store.list_test_history(user_id, template_id)
    }

    /// Render `content` without touching storage.
    pub fn preview_render(&self, content: &str, variables: &Variables) -> Preview {
        preview(content, variables)
    }
}
