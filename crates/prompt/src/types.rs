//! Template and test-record types.

use chrono::{DateTime, Utc};
use promptsmith_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values supplied for a template's placeholders.
pub type Variables = BTreeMap<String, String>;

/// Maximum length of a template name or category.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of a template description.
pub const MAX_DESCRIPTION_LENGTH: usize = 1_000;

/// Maximum length of the intent and expected-output-format texts.
pub const MAX_INTENT_LENGTH: usize = 500;

/// Input widget for a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    #[default]
    Text,
    Textarea,
    Number,
    Select,
}

impl VariableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Select => "select",
        }
    }
}

impl std::str::FromStr for VariableKind {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "text" => Ok(Self::Text),
            "textarea" => Ok(Self::Textarea),
            "number" => Ok(Self::Number),
            "select" => Ok(Self::Select),
            other => Err(AppError::Validation(format!(
                "Variable type must be text, textarea, number, or select (got '{}')",
                other
            ))),
        }
    }
}

/// A placeholder declared by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub name: String,
    pub label: String,

    #[serde(rename = "type", default)]
    pub kind: VariableKind,

    #[serde(default)]
    pub required: bool,

    /// Choices for `select` variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl TemplateVariable {
    pub fn new(name: &str, label: &str, kind: VariableKind, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required,
            options: Vec::new(),
        }
    }
}

/// A stored prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,

    /// Owning user; `None` for system templates
    pub user_id: Option<i64>,

    pub name: String,
    pub category: String,
    pub description: Option<String>,

    /// Raw content with `${name}` placeholders
    pub content: String,

    pub variables: Vec<TemplateVariable>,
    pub intent: Option<String>,
    pub expected_output_format: Option<String>,
    pub is_system: bool,
    pub is_favorite: bool,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Whether `user_id` may read this template.
    pub fn is_visible_to(&self, user_id: i64) -> bool {
        self.is_system || self.user_id == Some(user_id)
    }

    /// Whether `user_id` may change or delete this template.
    pub fn is_editable_by(&self, user_id: i64) -> bool {
        !self.is_system && self.user_id == Some(user_id)
    }
}

/// Fields a caller supplies to create or update a template.
///
/// Also the on-disk shape of an importable template file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub name: String,
    pub category: String,

    #[serde(default)]
    pub description: Option<String>,

    pub content: String,

    #[serde(default)]
    pub variables: Vec<TemplateVariable>,

    #[serde(default)]
    pub intent: Option<String>,

    #[serde(default, alias = "expectedOutputFormat")]
    pub expected_output_format: Option<String>,

    #[serde(default, alias = "isFavorite")]
    pub is_favorite: bool,
}

impl TemplateDraft {
    /// Check required fields and length limits.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Template name is required.".to_string()));
        }
        check_length("Template name", &self.name, MAX_NAME_LENGTH)?;

        if self.category.trim().is_empty() {
            return Err(AppError::Validation("Category is required.".to_string()));
        }
        check_length("Category", &self.category, MAX_NAME_LENGTH)?;

        if self.content.trim().is_empty() {
            return Err(AppError::Validation(
                "Template content is required.".to_string(),
            ));
        }

        if let Some(description) = &self.description {
            check_length("Description", description, MAX_DESCRIPTION_LENGTH)?;
        }
        if let Some(intent) = &self.intent {
            check_length("Intent", intent, MAX_INTENT_LENGTH)?;
        }
        if let Some(format) = &self.expected_output_format {
            check_length("Expected output format", format, MAX_INTENT_LENGTH)?;
        }

        for variable in &self.variables {
            if variable.name.trim().is_empty() {
                return Err(AppError::Validation("Variable name is required.".to_string()));
            }
            check_length("Variable name", &variable.name, MAX_NAME_LENGTH)?;

            if variable.label.trim().is_empty() {
                return Err(AppError::Validation(
                    "Variable label is required.".to_string(),
                ));
            }
            check_length("Variable label", &variable.label, MAX_NAME_LENGTH)?;
        }

        Ok(())
    }
}

fn check_length(field: &str, value: &str, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(AppError::Validation(format!(
            "{} cannot exceed {} characters (got {})",
            field, max, len
        )));
    }
    Ok(())
}

/// Templates per category, as shown in the library sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}

/// Outcome of one test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Error,
    Timeout,
}

impl TestStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

/// A test record before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTestRecord {
    pub user_id: i64,
    pub template_id: i64,
    pub connection_id: i64,
    pub rendered_prompt: String,
    pub input_variables: Variables,
    pub response: Option<String>,
    pub status: TestStatus,
    pub error_message: Option<String>,
    pub tokens_used: Option<i64>,
    pub duration_ms: i64,
}

/// Immutable log entry of one render + generate attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: i64,
    pub user_id: i64,
    pub template_id: i64,
    pub connection_id: i64,
    pub rendered_prompt: String,
    pub input_variables: Variables,
    pub response: Option<String>,
    pub status: TestStatus,
    pub error_message: Option<String>,
    pub tokens_used: Option<i64>,
    pub duration_ms: i64,

    /// Display name of the connection used, joined in by history queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,

    /// Provider name of the connection used, joined in by history queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    pub created_at: DateTime<Utc>,
}
