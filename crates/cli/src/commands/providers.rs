//! Providers command handler.

use super::print_json;
use clap::Args;
use promptsmith_core::AppResult;
use promptsmith_service::Workbench;

/// List available LLM providers and their settings
#[derive(Args, Debug)]
pub struct ProvidersCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ProvidersCommand {
    pub fn execute(&self, workbench: &Workbench) -> AppResult<()> {
        let providers = workbench.list_provider_descriptors()?;

        if self.json {
            return print_json(&providers);
        }

        for provider in &providers {
            println!("{} {} ({})", provider.icon, provider.name, provider.id);
            println!("   {}", provider.description);
            for field in &provider.config_schema {
                let required = if field.required { "required" } else { "optional" };
                println!("   --set {}=...  {} ({})", field.key, field.label, required);
                if !field.options.is_empty() {
                    let values: Vec<_> = field.options.iter().map(|o| o.value.as_str()).collect();
                    println!("      one of: {}", values.join(", "));
                }
            }
            println!();
        }
        Ok(())
    }
}
