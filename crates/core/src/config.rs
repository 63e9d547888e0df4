//! Configuration management for Promptsmith.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Config files (.promptsmith/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. Everything the workbench persists lives under
//! `.promptsmith/` in the workspace unless a database path is given.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default base URL of the DeepSeek cloud API.
pub const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .promptsmith/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// SQLite database path; `None` means `<workspace>/.promptsmith/promptsmith.db`
    pub database: Option<PathBuf>,

    /// Acting user for CLI operations
    pub user_id: i64,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Per-backend HTTP settings
    pub providers: ProvidersConfig,
}

/// HTTP settings for the built-in backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub ollama: OllamaSettings,
    pub deepseek: DeepSeekSettings,
}

/// Local runner timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSettings {
    #[serde(rename = "timeoutSecs", default = "default_ollama_timeout")]
    pub timeout_secs: u64,

    #[serde(rename = "connectTimeoutSecs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Cloud chat-completion API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepSeekSettings {
    #[serde(rename = "baseUrl", default = "default_deepseek_base_url")]
    pub base_url: String,

    #[serde(rename = "timeoutSecs", default = "default_deepseek_timeout")]
    pub timeout_secs: u64,

    #[serde(rename = "connectTimeoutSecs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_ollama_timeout() -> u64 {
    30
}

fn default_deepseek_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_deepseek_base_url() -> String {
    DEFAULT_DEEPSEEK_BASE_URL.to_string()
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_ollama_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for DeepSeekSettings {
    fn default() -> Self {
        Self {
            base_url: default_deepseek_base_url(),
            timeout_secs: default_deepseek_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            ollama: OllamaSettings::default(),
            deepseek: DeepSeekSettings::default(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    database: Option<DatabaseConfig>,
    logging: Option<LoggingConfig>,
    providers: Option<ProvidersFileConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DatabaseConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProvidersFileConfig {
    ollama: Option<OllamaSettings>,
    deepseek: Option<DeepSeekSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            database: None,
            user_id: 1,
            log_level: None,
            verbose: false,
            no_color: false,
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file, environment variables and defaults.
    ///
    /// Environment variables:
    /// - `PROMPTSMITH_WORKSPACE`: Override workspace path
    /// - `PROMPTSMITH_CONFIG`: Path to config file
    /// - `PROMPTSMITH_DB`: SQLite database path
    /// - `PROMPTSMITH_USER`: Acting user id
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use promptsmith_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Database: {:?}", config.database_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], but an explicit `config_file` wins over
    /// `PROMPTSMITH_CONFIG`.
    pub fn load_from(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("PROMPTSMITH_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        config.config_file = config_file.or_else(|| {
            std::env::var("PROMPTSMITH_CONFIG").ok().map(PathBuf::from)
        });

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join(".promptsmith/config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(db) = std::env::var("PROMPTSMITH_DB") {
            config.database = Some(PathBuf::from(db));
        }

        if let Ok(user) = std::env::var("PROMPTSMITH_USER") {
            config.user_id = user.parse().map_err(|_| {
                AppError::Config(format!("PROMPTSMITH_USER is not a valid user id: {}", user))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(path) = config_file.database.and_then(|db| db.path) {
            result.database = Some(PathBuf::from(path));
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(providers) = config_file.providers {
            if let Some(ollama) = providers.ollama {
                result.providers.ollama = ollama;
            }
            if let Some(deepseek) = providers.deepseek {
                result.providers.deepseek = deepseek;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        database: Option<PathBuf>,
        user_id: Option<i64>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(database) = database {
            self.database = Some(database);
        }

        if let Some(user_id) = user_id {
            self.user_id = user_id;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .promptsmith directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(".promptsmith")
    }

    /// Resolve the SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.state_dir().join("promptsmith.db"))
    }

    /// Ensure the .promptsmith directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .promptsmith directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate timeouts and paths.
    pub fn validate(&self) -> AppResult<()> {
        if self.database_path().as_os_str().is_empty() {
            return Err(AppError::Config("Database path cannot be empty".to_string()));
        }

        let timeouts = [
            ("providers.ollama.timeoutSecs", self.providers.ollama.timeout_secs),
            (
                "providers.ollama.connectTimeoutSecs",
                self.providers.ollama.connect_timeout_secs,
            ),
            ("providers.deepseek.timeoutSecs", self.providers.deepseek.timeout_secs),
            (
                "providers.deepseek.connectTimeoutSecs",
                self.providers.deepseek.connect_timeout_secs,
            ),
        ];

        for (key, value) in timeouts {
            if value == 0 {
                return Err(AppError::Config(format!("{} must be greater than zero", key)));
            }
        }

        if self.providers.deepseek.base_url.trim().is_empty() {
            return Err(AppError::Config(
                "providers.deepseek.baseUrl cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
