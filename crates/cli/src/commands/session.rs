//! Session command handlers.

use super::{print_citations, print_json};
use crate::app::build_controller;
use clap::{Args, Subcommand};
use docent_chat::Role;
use docent_core::{config::AppConfig, AppResult};

/// Inspect and share chat sessions
#[derive(Args, Debug)]
pub struct SessionCommand {
    #[command(subcommand)]
    pub action: SessionAction,
}

#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// Print the turns of a session
    Show {
        session_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mint (or return) the session's share token
    Share { session_id: String },
}

impl SessionCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let controller = build_controller(config)?;

        match &self.action {
            SessionAction::Show { session_id, json } => {
                tracing::info!(session = %session_id, "Showing session");
                let turns = controller.session_turns(session_id)?;

                if *json {
                    return print_json(&turns);
                }

                for turn in &turns {
                    let who = match turn.role {
                        Role::User => "Q",
                        Role::Assistant => "A",
                    };
                    let mut flags = Vec::new();
                    if turn.incomplete {
                        flags.push("incomplete".to_string());
                    }
                    if let Some(rating) = turn.rating {
                        flags.push(rating.as_str().to_string());
                    }

                    println!("{} [{}] {}", who, turn.id, turn.text.as_deref().unwrap_or(""));
                    if !flags.is_empty() {
                        println!("   ({})", flags.join(", "));
                    }
                    if turn.role == Role::Assistant {
                        print_citations(&controller.citations_for_turn(&turn.id)?);
                    }
                    println!();
                }
                Ok(())
            }
            SessionAction::Share { session_id } => {
                let token = controller.share_session(session_id)?;
                println!("{}", token);
                Ok(())
            }
        }
    }
}
