//! Template command handler.

use super::{parse_key_value, print_json};
use clap::{Args, Subcommand};
use promptsmith_core::AppResult;
use promptsmith_prompt::{load_template_file, Template, TemplateDraft, Variables};
use promptsmith_service::Workbench;
use std::path::PathBuf;

/// Prompt template management
#[derive(Args, Debug)]
pub struct TemplateCommand {
    #[command(subcommand)]
    pub action: TemplateAction,
}

#[derive(Subcommand, Debug)]
pub enum TemplateAction {
    /// List system templates and your own
    List(TemplateListCommand),
    /// Show one template
    Show(TemplateShowCommand),
    /// Create a template from flags or a YAML file
    Create(TemplateCreateCommand),
    /// Change one of your templates from flags or a YAML file
    Update(TemplateUpdateCommand),
    /// Delete one of your templates
    Delete(TemplateDeleteCommand),
    /// Import every YAML template in a directory
    Import(TemplateImportCommand),
    /// Render a template and run it against a connection
    Test(TemplateTestCommand),
    /// Show your recent tests of a template
    History(TemplateHistoryCommand),
    /// Render template content without saving anything
    Preview(TemplatePreviewCommand),
    /// List categories with template counts
    Categories(TemplateCategoriesCommand),
}

/// List templates
#[derive(Args, Debug)]
pub struct TemplateListCommand {
    /// Only show templates in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplateListCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let templates: Vec<_> = workbench
            .list_templates(user_id)?
            .into_iter()
            .filter(|t| self.category.as_ref().map_or(true, |c| &t.category == c))
            .collect();

        if self.json {
            return print_json(&templates);
        }

        if templates.is_empty() {
            println!("No templates found");
            return Ok(());
        }

        for template in &templates {
            let marker = if template.is_system { "system" } else { "mine" };
            println!(
                "{:>4}  {:<28} {:<20} [{}] used {}x",
                template.id, template.name, template.category, marker, template.usage_count
            );
        }
        Ok(())
    }
}

/// Show a template
#[derive(Args, Debug)]
pub struct TemplateShowCommand {
    /// Template id
    pub id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplateShowCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let template = workbench.get_template(user_id, self.id)?;

        if self.json {
            return print_json(&template);
        }

        println!("{} ({})", template.name, template.category);
        if let Some(description) = &template.description {
            println!("{}", description);
        }
        println!();
        println!("{}", template.content);

        if !template.variables.is_empty() {
            println!();
            println!("Variables:");
            for variable in &template.variables {
                let required = if variable.required { " (required)" } else { "" };
                println!(
                    "  ${{{}}}  {} [{}]{}",
                    variable.name,
                    variable.label,
                    variable.kind.as_str(),
                    required
                );
            }
        }
        Ok(())
    }
}

/// Create a template
#[derive(Args, Debug)]
pub struct TemplateCreateCommand {
    /// Read the template from a YAML file instead of flags
    #[arg(long, conflicts_with_all = ["name", "category", "content"])]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Template body with ${name} placeholders
    #[arg(long)]
    pub content: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Mark as favorite
    #[arg(long)]
    pub favorite: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplateCreateCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let draft = match &self.file {
            Some(path) => load_template_file(path)?,
            None => TemplateDraft {
                name: self.name.clone().unwrap_or_default(),
                category: self.category.clone().unwrap_or_default(),
                content: self.content.clone().unwrap_or_default(),
                description: self.description.clone(),
                is_favorite: self.favorite,
                ..Default::default()
            },
        };

        let template = workbench.create_template(user_id, draft)?;

        if self.json {
            return print_json(&template);
        }
        println!("Created template {} ({})", template.id, template.name);
        Ok(())
    }
}

/// Update a template
#[derive(Args, Debug)]
pub struct TemplateUpdateCommand {
    /// Template id
    pub id: i64,

    /// Replace every field with the template in this YAML file
    #[arg(long, conflicts_with_all = ["name", "category", "content", "description", "favorite"])]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Template body with ${name} placeholders
    #[arg(long)]
    pub content: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Set or clear the favorite flag
    #[arg(long)]
    pub favorite: Option<bool>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplateUpdateCommand {
    /// Current fields with the flags given on the command line applied.
    fn merged_draft(&self, current: Template) -> TemplateDraft {
        TemplateDraft {
            name: self.name.clone().unwrap_or(current.name),
            category: self.category.clone().unwrap_or(current.category),
            description: self.description.clone().or(current.description),
            content: self.content.clone().unwrap_or(current.content),
            variables: current.variables,
            intent: current.intent,
            expected_output_format: current.expected_output_format,
            is_favorite: self.favorite.unwrap_or(current.is_favorite),
        }
    }

    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let draft = match &self.file {
            Some(path) => load_template_file(path)?,
            None => self.merged_draft(workbench.get_template(user_id, self.id)?),
        };

        let template = workbench.update_template(user_id, self.id, draft)?;

        if self.json {
            return print_json(&template);
        }
        println!("Updated template {} ({})", template.id, template.name);
        Ok(())
    }
}

/// Delete a template
#[derive(Args, Debug)]
pub struct TemplateDeleteCommand {
    /// Template id
    pub id: i64,
}

impl TemplateDeleteCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        workbench.delete_template(user_id, self.id)?;
        println!("Template {} deleted", self.id);
        Ok(())
    }
}

/// Import templates
#[derive(Args, Debug)]
pub struct TemplateImportCommand {
    /// Directory holding *.yml / *.yaml files
    pub dir: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplateImportCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let imported = workbench.import_templates(user_id, &self.dir)?;

        if self.json {
            return print_json(&imported);
        }
        for template in &imported {
            println!("Imported {} ({})", template.id, template.name);
        }
        println!("{} templates imported from {:?}", imported.len(), self.dir);
        Ok(())
    }
}

/// Test a template
#[derive(Args, Debug)]
pub struct TemplateTestCommand {
    /// Template id
    pub id: i64,

    /// Connection id; defaults to your default connection
    #[arg(long)]
    pub connection: Option<i64>,

    /// Variable value as name=value (repeatable)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplateTestCommand {
    pub async fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let connection_id = match self.connection {
            Some(id) => id,
            None => super::connection::default_connection_id(workbench, user_id)?,
        };
        let variables: Variables = self.vars.iter().cloned().collect();

        let record = workbench
            .test_template(user_id, self.id, &variables, connection_id)
            .await?;

        if self.json {
            return print_json(&record);
        }

        println!("Status: {} ({} ms)", record.status.as_str(), record.duration_ms);
        println!();
        println!("Prompt:");
        println!("{}", record.rendered_prompt);
        println!();
        match (&record.response, &record.error_message) {
            (Some(response), _) => {
                println!("Response:");
                println!("{}", response);
            }
            (None, Some(error)) => println!("Error: {}", error),
            (None, None) => {}
        }
        if let Some(tokens) = record.tokens_used {
            println!();
            println!("Tokens used: {}", tokens);
        }
        Ok(())
    }
}

/// Show test history
#[derive(Args, Debug)]
pub struct TemplateHistoryCommand {
    /// Template id
    pub id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplateHistoryCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let history = workbench.list_test_history(user_id, self.id)?;

        if self.json {
            return print_json(&history);
        }

        if history.is_empty() {
            println!("No tests recorded for template {}", self.id);
            return Ok(());
        }

        for record in &history {
            println!(
                "{}  {:<8} {:>6} ms  via {}",
                record.created_at.format("%Y-%m-%d %H:%M:%S"),
                record.status.as_str(),
                record.duration_ms,
                record.connection_name.as_deref().unwrap_or("-"),
            );
        }
        Ok(())
    }
}

/// Preview rendering
#[derive(Args, Debug)]
pub struct TemplatePreviewCommand {
    /// Template content with ${name} placeholders
    pub content: String,

    /// Variable value as name=value (repeatable)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplatePreviewCommand {
    pub fn execute(&self, workbench: &Workbench) -> AppResult<()> {
        let variables: Variables = self.vars.iter().cloned().collect();
        let preview = workbench.preview_render(&self.content, &variables);

        if self.json {
            return print_json(&preview);
        }

        println!("{}", preview.rendered_prompt);
        if !preview.variables.is_empty() {
            println!();
            println!("Variables: {}", preview.variables.join(", "));
        }
        Ok(())
    }
}

/// List categories
#[derive(Args, Debug)]
pub struct TemplateCategoriesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplateCategoriesCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let categories = workbench.list_categories(user_id)?;

        if self.json {
            return print_json(&categories);
        }
        for category in &categories {
            println!("{:<24} {}", category.name, category.count);
        }
        Ok(())
    }
}

impl TemplateCommand {
    pub async fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        match &self.action {
            TemplateAction::List(cmd) => cmd.execute(workbench, user_id),
            TemplateAction::Show(cmd) => cmd.execute(workbench, user_id),
            TemplateAction::Create(cmd) => cmd.execute(workbench, user_id),
            TemplateAction::Update(cmd) => cmd.execute(workbench, user_id),
            TemplateAction::Delete(cmd) => cmd.execute(workbench, user_id),
            TemplateAction::Import(cmd) => cmd.execute(workbench, user_id),
            TemplateAction::Test(cmd) => cmd.execute(workbench, user_id).await,
            TemplateAction::History(cmd) => cmd.execute(workbench, user_id),
            TemplateAction::Preview(cmd) => cmd.execute(workbench),
            TemplateAction::Categories(cmd) => cmd.execute(workbench, user_id),
        }
    }
}
