//! Turn command handlers.

use super::{print_citations, print_json};
use crate::app::build_controller;
use clap::{Args, Subcommand};
use docent_chat::Rating;
use docent_core::{config::AppConfig, AppResult};

/// Regenerate, rate or inspect a single turn
#[derive(Args, Debug)]
pub struct TurnCommand {
    #[command(subcommand)]
    pub action: TurnAction,
}

#[derive(Subcommand, Debug)]
pub enum TurnAction {
    /// Produce a new answer for an assistant turn
    Regenerate {
        turn_id: String,

        /// Principal requesting the regeneration
        #[arg(long, env = "DOCENT_USER")]
        owner: Option<String>,
    },

    /// Rate an answer (like or dislike)
    Rate {
        turn_id: String,
        rating: String,

        /// Optional feedback tag (e.g. "outdated", "wrong-model")
        #[arg(long)]
        tag: Option<String>,
    },

    /// List the citations of an answer
    Citations {
        turn_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl TurnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let controller = build_controller(config)?;

        match &self.action {
            TurnAction::Regenerate { turn_id, owner } => {
                let outcome = controller.regenerate(turn_id, owner.as_deref()).await?;
                println!("{}", outcome.text);
                if outcome.failed {
                    println!("(stored answer kept)");
                    return Ok(());
                }
                println!();
                print_citations(&outcome.citations);
            }
            TurnAction::Rate {
                turn_id,
                rating,
                tag,
            } => {
                let rating = Rating::parse(rating)?;
                let turn = controller.rate_turn(turn_id, rating, tag.as_deref())?;
                println!("Rated turn {} as {}", turn.id, rating.as_str());
            }
            TurnAction::Citations { turn_id, json } => {
                let citations = controller.citations_for_turn(turn_id)?;
                if *json {
                    print_json(&citations)?;
                } else {
                    print_citations(&citations);
                }
            }
        }

        Ok(())
    }
}
