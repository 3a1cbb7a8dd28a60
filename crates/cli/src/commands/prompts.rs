//! Prompts command handler: show which answer templates the workspace overrides.

use super::print_json;
use clap::Args;
use docent_core::{config::AppConfig, AppResult};
use docent_prompt::template_inventory;

/// List answer templates and their workspace overrides
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        let inventory = template_inventory(&config.workspace)?;

        if self.json {
            return print_json(&inventory);
        }

        for id in &inventory.overridden {
            println!("{:<20} workspace (.docent/prompts/{}.yml)", id, id);
        }
        for id in &inventory.builtin {
            println!("{:<20} built-in", id);
        }
        for id in &inventory.unused {
            println!("{:<20} ignored: no template with this id", id);
        }

        Ok(())
    }
}
