//! Connection command handler.

use super::{parse_key_value, print_json};
use clap::{Args, Subcommand};
use promptsmith_core::{AppError, AppResult};
use promptsmith_llm::Connection;
use promptsmith_service::{ConnectionInput, ConnectionUpdate, Workbench};

/// LLM connection management
#[derive(Args, Debug)]
pub struct ConnectionCommand {
    #[command(subcommand)]
    pub action: ConnectionAction,
}

#[derive(Subcommand, Debug)]
pub enum ConnectionAction {
    /// List your connections
    List(ConnectionListCommand),
    /// Add a connection
    Add(ConnectionAddCommand),
    /// Change a connection's name, settings or default flag
    Update(ConnectionUpdateCommand),
    /// Delete a connection
    Delete(ConnectionDeleteCommand),
    /// Check that a connection's backend is reachable
    Test(ConnectionTestCommand),
    /// List the models a connection offers
    Models(ConnectionModelsCommand),
    /// Make a connection the default for its provider
    Default(ConnectionDefaultCommand),
}

/// The user's default connection, or an error telling them to pick one.
pub(crate) fn default_connection_id(workbench: &Workbench, user_id: i64) -> AppResult<i64> {
    workbench
        .default_connection(user_id)?
        .map(|c| c.id)
        .ok_or_else(|| {
            AppError::Validation(
                "No default connection; pass --connection or set one with `connection default`"
                    .to_string(),
            )
        })
}

fn print_connection(connection: &Connection) {
    let default = if connection.is_default { "*" } else { " " };
    println!(
        "{}{:>4}  {:<24} {:<10} {}",
        default,
        connection.id,
        connection.display_name(),
        connection.provider,
        connection.status.label(),
    );
    if let Some(error) = &connection.last_error {
        println!("        last error: {}", error);
    }
}

/// List connections
#[derive(Args, Debug)]
pub struct ConnectionListCommand {
    /// Only show connections whose last test succeeded
    #[arg(long)]
    pub online: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConnectionListCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let connections = if self.online {
            workbench.list_online_connections(user_id)?
        } else {
            workbench.list_connections(user_id)?
        };

        if self.json {
            return print_json(&connections);
        }

        if connections.is_empty() {
            println!("No connections configured");
            return Ok(());
        }
        for connection in &connections {
            print_connection(connection);
        }
        Ok(())
    }
}

/// Add a connection
#[derive(Args, Debug)]
pub struct ConnectionAddCommand {
    /// Provider id (ollama, deepseek)
    pub provider: String,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Setting as key=value, e.g. model=llama3.2 (repeatable)
    #[arg(long = "set", value_parser = parse_key_value)]
    pub settings: Vec<(String, String)>,

    /// Make this the default connection for its provider
    #[arg(long)]
    pub default: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConnectionAddCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let connection = workbench.create_connection(
            user_id,
            ConnectionInput {
                provider: self.provider.clone(),
                name: self.name.clone(),
                config: self.settings.iter().cloned().collect(),
                is_default: self.default,
            },
        )?;

        if self.json {
            return print_json(&connection);
        }
        println!(
            "Added connection {} ({})",
            connection.id,
            connection.display_name()
        );
        Ok(())
    }
}

/// Update a connection
#[derive(Args, Debug)]
pub struct ConnectionUpdateCommand {
    /// Connection id
    pub id: i64,

    /// New display name
    #[arg(long)]
    pub name: Option<String>,

    /// Setting to change as key=value (repeatable)
    #[arg(long = "set", value_parser = parse_key_value)]
    pub settings: Vec<(String, String)>,

    /// Make this the default connection for its provider
    #[arg(long)]
    pub default: bool,
}

impl ConnectionUpdateCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let config = if self.settings.is_empty() {
            None
        } else {
            // Start from the masked view; a blank api_key keeps the stored one.
            let mut config = workbench.get_connection(user_id, self.id)?.config;
            config.extend(self.settings.iter().cloned());
            Some(config)
        };

        let connection = workbench.update_connection(
            user_id,
            self.id,
            ConnectionUpdate {
                name: self.name.clone(),
                config,
                is_default: self.default,
            },
        )?;

        println!("Updated connection {}", connection.id);
        Ok(())
    }
}

/// Delete a connection
#[derive(Args, Debug)]
pub struct ConnectionDeleteCommand {
    /// Connection id
    pub id: i64,
}

impl ConnectionDeleteCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        workbench.delete_connection(user_id, self.id)?;
        println!("Connection {} deleted", self.id);
        Ok(())
    }
}

/// Test a connection
#[derive(Args, Debug)]
pub struct ConnectionTestCommand {
    /// Connection id
    pub id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConnectionTestCommand {
    pub async fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let online = workbench.test_connection(user_id, self.id).await?;
        let connection = workbench.get_connection(user_id, self.id)?;

        if self.json {
            return print_json(&serde_json::json!({
                "success": online,
                "status": connection.status,
                "lastError": connection.last_error,
                "lastTestedAt": connection.last_tested_at,
            }));
        }

        println!("{}", connection.status.label());
        if !online {
            let error = connection
                .last_error
                .unwrap_or_else(|| format!("Provider not found: {}", connection.provider));
            println!("Error: {}", error);
        }
        Ok(())
    }
}

/// List models
#[derive(Args, Debug)]
pub struct ConnectionModelsCommand {
    /// Connection id
    pub id: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConnectionModelsCommand {
    pub async fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let models = workbench.list_models(user_id, self.id).await?;

        if self.json {
            return print_json(&models);
        }

        if models.is_empty() {
            println!("No models available");
            return Ok(());
        }
        for model in &models {
            match &model.description {
                Some(description) => println!("{:<24} {}", model.id, description),
                None => println!("{}", model.id),
            }
        }
        Ok(())
    }
}

/// Set the default connection
#[derive(Args, Debug)]
pub struct ConnectionDefaultCommand {
    /// Connection id
    pub id: i64,
}

impl ConnectionDefaultCommand {
    pub fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let connection = workbench.set_default_connection(user_id, self.id)?;
        println!(
            "{} is now the default {} connection",
            connection.display_name(),
            connection.provider
        );
        Ok(())
    }
}

impl ConnectionCommand {
    pub async fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        match &self.action {
            ConnectionAction::List(cmd) => cmd.execute(workbench, user_id),
            ConnectionAction::Add(cmd) => cmd.execute(workbench, user_id),
            ConnectionAction::Update(cmd) => cmd.execute(workbench, user_id),
            ConnectionAction::Delete(cmd) => cmd.execute(workbench, user_id),
            ConnectionAction::Test(cmd) => cmd.execute(workbench, user_id).await,
            ConnectionAction::Models(cmd) => cmd.execute(workbench, user_id).await,
            ConnectionAction::Default(cmd) => cmd.execute(workbench, user_id),
        }
    }
}
