//! Ask command handler.

use super::{print_citations, print_json};
use crate::app::build_controller;
use async_trait::async_trait;
use clap::Args;
use docent_chat::{AskRequest, ChatEvent, EventSink};
use docent_core::{config::AppConfig, AppResult};
use std::io::Write;

/// Ask a question about a scope's documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Scope (instrument) identifier
    #[arg(short, long, env = "DOCENT_SCOPE")]
    pub scope: String,

    /// Continue an existing session
    #[arg(long)]
    pub session: Option<String>,

    /// Principal asking the question
    #[arg(long, env = "DOCENT_USER")]
    pub owner: Option<String>,

    /// Wait for the whole answer instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Output the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Writes tokens to stdout as they arrive.
struct StdoutSink;

#[async_trait]
impl EventSink for StdoutSink {
    async fn emit(&mut self, event: ChatEvent) -> AppResult<()> {
        if let ChatEvent::Token { text } = event {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
        Ok(())
    }
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let controller = build_controller(config)?;

        let mut request = AskRequest::new(&self.scope, &self.question);
        if let Some(ref session) = self.session {
            request = request.in_session(session);
        }
        if let Some(ref owner) = self.owner {
            request = request.with_owner(owner);
        }

        if self.json || self.no_stream {
            let outcome = if self.no_stream {
                controller.ask(request).await?
            } else {
                let mut events: Vec<ChatEvent> = Vec::new();
                controller.ask_stream(request, &mut events).await?
            };

            if self.json {
                return print_json(&outcome);
            }

            println!("{}", outcome.text);
            println!();
            print_citations(&outcome.citations);
            println!("Session: {}  Turn: {}", outcome.session_id, outcome.turn_id);
            return Ok(());
        }

        let outcome = controller.ask_stream(request, &mut StdoutSink).await?;
        println!();
        println!();
        print_citations(&outcome.citations);
        println!("Session: {}  Turn: {}", outcome.session_id, outcome.turn_id);

        Ok(())
    }
}
