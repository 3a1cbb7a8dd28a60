//! Command handlers for the docent CLI.

pub mod ask;
pub mod prompts;
pub mod rank;
pub mod serve;
pub mod session;
pub mod turn;

pub use ask::AskCommand;
pub use prompts::PromptsCommand;
pub use rank::RankCommand;
pub use serve::ServeCommand;
pub use session::SessionCommand;
pub use turn::TurnCommand;

use docent_chat::Citation;
use docent_core::AppResult;
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_citations(citations: &[Citation]) {
    if citations.is_empty() {
        println!("Sources: (none cited)");
        return;
    }

    println!("Sources:");
    for (i, citation) in citations.iter().enumerate() {
        println!(
            "  {}. {} [{}] ({}, score {:.1})",
            i + 1,
            citation.title,
            citation.document_id,
            citation.kind.as_str(),
            citation.score
        );
    }
}
