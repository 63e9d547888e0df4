//! Improve, refine and frameworks command handlers.

use super::connection::default_connection_id;
use super::print_json;
use clap::Args;
use promptsmith_core::AppResult;
use promptsmith_service::Workbench;

/// Rewrite a prompt with a framework
#[derive(Args, Debug)]
pub struct ImproveCommand {
    /// The prompt to improve
    pub prompt: String,

    /// Framework code (tcrei, crispe, risen, race, care)
    #[arg(short, long, default_value = "tcrei")]
    pub framework: String,

    /// Connection id; defaults to your default connection
    #[arg(long)]
    pub connection: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ImproveCommand {
    pub async fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let connection_id = match self.connection {
            Some(id) => id,
            None => default_connection_id(workbench, user_id)?,
        };

        let result = workbench
            .improve_prompt(user_id, &self.prompt, &self.framework, connection_id)
            .await?;

        if self.json {
            return print_json(&result);
        }

        match (&result.improved_prompt, &result.error) {
            (Some(improved), _) => println!("{}", improved),
            (None, Some(error)) => {
                println!("Improvement with {} failed: {}", result.framework_name, error);
                println!();
                println!("Original prompt:");
                println!("{}", result.original_prompt);
            }
            (None, None) => {}
        }
        Ok(())
    }
}

/// Revise a prompt according to feedback
#[derive(Args, Debug)]
pub struct RefineCommand {
    /// The prompt to refine
    pub prompt: String,

    /// What to change
    #[arg(long)]
    pub feedback: String,

    /// Connection id; defaults to your default connection
    #[arg(long)]
    pub connection: Option<i64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RefineCommand {
    pub async fn execute(&self, workbench: &Workbench, user_id: i64) -> AppResult<()> {
        let connection_id = match self.connection {
            Some(id) => id,
            None => default_connection_id(workbench, user_id)?,
        };

        let result = workbench
            .refine_prompt(user_id, &self.prompt, &self.feedback, connection_id)
            .await?;

        if self.json {
            return print_json(&result);
        }

        match (&result.refined_prompt, &result.error) {
            (Some(refined), _) => println!("{}", refined),
            (None, Some(error)) => {
                println!("Refinement failed: {}", error);
                println!();
                println!("Original prompt:");
                println!("{}", result.original_prompt);
            }
            (None, None) => {}
        }
        Ok(())
    }
}

/// List improvement frameworks
#[derive(Args, Debug)]
pub struct FrameworksCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl FrameworksCommand {
    pub fn execute(&self, workbench: &Workbench) -> AppResult<()> {
        let frameworks = workbench.frameworks();

        if self.json {
            return print_json(frameworks);
        }
        for framework in frameworks {
            println!("{:<8} {:<8} {}", framework.code, framework.name, framework.description);
        }
        Ok(())
    }
}
