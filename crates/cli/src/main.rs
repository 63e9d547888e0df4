//! Promptsmith CLI
//!
//! Main entry point for the promptsmith command-line tool: manage prompt
//! templates, test them against LLM connections, and improve prompts.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{
    ConnectionCommand, FrameworksCommand, ImproveCommand, ProvidersCommand, RefineCommand,
    TemplateCommand,
};
use promptsmith_core::{config::AppConfig, logging, AppResult};
use promptsmith_service::Workbench;
use std::path::PathBuf;

/// Promptsmith - prompt template workbench for local and cloud LLMs
#[derive(Parser, Debug)]
#[command(name = "promptsmith")]
#[command(about = "Prompt template workbench for local and cloud LLMs", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "PROMPTSMITH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "PROMPTSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true, env = "PROMPTSMITH_DB")]
    database: Option<PathBuf>,

    /// Act as this user id
    #[arg(short, long, global = true, env = "PROMPTSMITH_USER")]
    user: Option<i64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prompt template management
    Template(TemplateCommand),

    /// LLM connection management
    Connection(ConnectionCommand),

    /// List available LLM providers
    Providers(ProvidersCommand),

    /// Rewrite a prompt with a framework
    Improve(ImproveCommand),

    /// Revise a prompt according to feedback
    Refine(RefineCommand),

    /// List improvement frameworks
    Frameworks(FrameworksCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Template(_) => "template",
            Commands::Connection(_) => "connection",
            Commands::Providers(_) => "providers",
            Commands::Improve(_) => "improve",
            Commands::Refine(_) => "refine",
            Commands::Frameworks(_) => "frameworks",
        }
    }

    async fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        match self {
            Commands::Template(cmd) => cmd.execute(workbench, user_id).await,
            Commands::Connection(cmd) => cmd.execute(workbench, user_id).await,
            Commands::Providers(cmd) => cmd.execute(workbench),
            Commands::Improve(cmd) => cmd.execute(workbench, user_id).await,
            Commands::Refine(cmd) => cmd.execute(workbench, user_id).await,
            Commands::Frameworks(cmd) => cmd.execute(workbench),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from file and environment
    let config = AppConfig::load_from(cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.database,
        cli.user,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Promptsmith CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Database: {:?}", config.database_path());
    tracing::debug!("User: {}", config.user_id);

    config.ensure_state_dir()?;

    let workbench = Workbench::open(&config)
        .with_context(|| format!("failed to open database {:?}", config.database_path()))?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = cli.command.execute(&workbench, config.user_id).await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
