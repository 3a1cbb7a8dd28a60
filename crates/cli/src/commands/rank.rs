//! Rank command handler: preview which documents a question would ground on.

use super::print_json;
use crate::app::open_index;
use clap::Args;
use docent_core::{config::AppConfig, AppResult};
use docent_knowledge::rank_scope;

/// Show the ranked documents for a query
#[derive(Args, Debug)]
pub struct RankCommand {
    /// Free-text query
    pub query: String,

    /// Scope (instrument) identifier
    #[arg(short, long, env = "DOCENT_SCOPE")]
    pub scope: String,

    /// Maximum number of documents (default: retrieval.topK)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RankCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing rank command");

        let index = open_index(config)?;
        let limit = self.limit.unwrap_or(config.retrieval.top_k);
        let ranked = rank_scope(&index, &self.scope, &self.query, limit)?;

        if self.json {
            return print_json(&ranked);
        }

        if ranked.is_empty() {
            println!("No documents in scope '{}' match the query.", self.scope);
            return Ok(());
        }

        for (i, entry) in ranked.iter().enumerate() {
            println!(
                "[Source {}] {:>6.2}  {} ({})  {}",
                i + 1,
                entry.score,
                entry.document.title,
                entry.document.label(),
                entry.document.id
            );
        }

        Ok(())
    }
}
