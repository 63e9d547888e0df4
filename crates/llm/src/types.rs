//! Connection and provider descriptor types.
//!
//! A [`Connection`] is one user's configured instance of a backend; a
//! [`ProviderDescriptor`] describes a backend kind and the configuration
//! schema its connections must follow.

use crate::client::ProviderConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a stored connection. Only the connection test moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Offline,
    Testing,
    Online,
    Error,
}

impl ConnectionStatus {
    /// Parse a stored status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "offline" => Some(Self::Offline),
            "testing" => Some(Self::Testing),
            "online" => Some(Self::Online),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Get the canonical status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Testing => "testing",
            Self::Online => "online",
            Self::Error => "error",
        }
    }

    /// Human-readable label shown next to a connection.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Online => "Connected",
            Self::Testing => "Testing...",
            Self::Error => "Connection failed",
            Self::Offline => "Not connected",
        }
    }
}

/// A user's configured backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Provider identifier (e.g., "ollama"); empty when unset
    pub provider: String,

    /// Provider display name, joined in from the descriptor when loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    /// Optional display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Provider-specific configuration; may contain secrets
    pub config: ProviderConfig,

    pub is_default: bool,
    pub status: ConnectionStatus,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    /// Display name, falling back to the provider's name and then its id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.provider_name.as_deref())
            .unwrap_or(self.provider.as_str())
    }
}

/// Input kind of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Password,
    Number,
    Select,
}

/// One entry of a `select` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Schema for one configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigField {
    pub key: String,

    #[serde(rename = "type")]
    pub kind: FieldKind,

    pub label: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    pub required: bool,

    /// Validation hint for form renderers (e.g., "url")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

/// A backend kind and how to configure it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Provider identifier, matching the registry key
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub is_active: bool,
    pub config_schema: Vec<ConfigField>,
}

impl ProviderDescriptor {
    /// Keys the schema marks as required.
    pub fn required_fields(&self) -> Vec<&str> {
        self.config_schema
            .iter()
            .filter(|f| f.required)
            .map(|f| f.key.as_str())
            .collect()
    }

    /// Look up a field by key.
    pub fn field(&self, key: &str) -> Option<&ConfigField> {
        self.config_schema.iter().find(|f| f.key == key)
    }
}

/// Descriptors for the backends shipped with the registry.
pub fn builtin_descriptors() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor {
            id: "ollama".to_string(),
            name: "Ollama".to_string(),
            description: "Run LLMs locally on your machine. Supports llama3.2, mistral, codellama, and more.".to_string(),
            icon: "🔮".to_string(),
            is_active: true,
            config_schema: vec![
                ConfigField {
                    key: "endpoint".to_string(),
                    kind: FieldKind::String,
                    label: "Endpoint URL".to_string(),
                    placeholder: Some("http://localhost:11434".to_string()),
                    required: true,
                    validation: Some("url".to_string()),
                    options: Vec::new(),
                },
                ConfigField {
                    key: "model".to_string(),
                    kind: FieldKind::Select,
                    label: "Model".to_string(),
                    placeholder: None,
                    required: true,
                    validation: None,
                    options: vec![
                        SelectOption::new("llama3.2", "Llama 3.2"),
                        SelectOption::new("llama3.1", "Llama 3.1"),
                        SelectOption::new("mistral", "Mistral"),
                        SelectOption::new("codellama", "CodeLlama"),
                        SelectOption::new("qwen2.5", "Qwen 2.5"),
                        SelectOption::new("deepseek-coder", "DeepSeek Coder"),
                    ],
                },
            ],
        },
        ProviderDescriptor {
            id: "deepseek".to_string(),
            name: "DeepSeek".to_string(),
            description: "Cloud-based LLM API with competitive pricing. Great for production use.".to_string(),
            icon: "🟦".to_string(),
            is_active: true,
            config_schema: vec![
                ConfigField {
                    key: "api_key".to_string(),
                    kind: FieldKind::Password,
                    label: "API Key".to_string(),
                    placeholder: Some("Enter your DeepSeek API key".to_string()),
                    required: true,
                    validation: Some("required|string".to_string()),
                    options: Vec::new(),
                },
                ConfigField {
                    key: "model".to_string(),
                    kind: FieldKind::Select,
                    label: "Model".to_string(),
                    placeholder: None,
                    required: true,
                    validation: None,
                    options: vec![
                        SelectOption::new("deepseek-chat", "DeepSeek Chat"),
                        SelectOption::new("deepseek-coder", "DeepSeek Coder"),
                    ],
                },
            ],
        },
    ]
}
