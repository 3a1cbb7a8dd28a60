//! Session/turn store.
//!
//! The store is the only shared mutable state of the chat pipeline. Each
//! method is atomic on its own. An answer is written with `append_answer`
//! and rewritten with `replace_answer`, so the controller never needs a
//! transaction spanning calls.

mod memory;
mod sqlite;

pub use memory::MemoryChatStore;
pub use sqlite::SqliteChatStore;

use crate::types::{Citation, NewCitation, Rating, Role, Session, Turn};
use docent_core::AppResult;

/// Persistence for sessions, turns and citations.
///
/// `list_turns` returns turns in creation order. `create_citation` and
/// `replace_answer` reject turns whose role is not assistant.
pub trait ChatStore: Send + Sync {
    fn create_session(&self, scope: &str, owner: Option<&str>, title: &str) -> AppResult<Session>;

    fn get_session(&self, session_id: &str) -> AppResult<Option<Session>>;

    fn session_by_share_token(&self, token: &str) -> AppResult<Option<Session>>;

    /// Fails when another session already holds `token`.
    fn set_share_token(&self, session_id: &str, token: &str) -> AppResult<()>;

    fn append_turn(&self, session_id: &str, role: Role, text: Option<&str>) -> AppResult<Turn>;

    fn get_turn(&self, turn_id: &str) -> AppResult<Option<Turn>>;

    fn list_turns(&self, session_id: &str) -> AppResult<Vec<Turn>>;

    fn update_turn_text(&self, turn_id: &str, text: &str) -> AppResult<()>;

    fn set_turn_rating(
        &self,
        turn_id: &str,
        rating: Rating,
        feedback_tag: Option<&str>,
    ) -> AppResult<()>;

    fn mark_incomplete(&self, turn_id: &str) -> AppResult<()>;

    fn create_citation(&self, turn_id: &str, citation: &NewCitation) -> AppResult<Citation>;

    fn list_citations(&self, turn_id: &str) -> AppResult<Vec<Citation>>;

    /// Append an assistant turn with its incomplete flag and citations.
    ///
    /// Either all of it is written or none of it.
    fn append_answer(
        &self,
        session_id: &str,
        text: &str,
        incomplete: bool,
        citations: &[NewCitation],
    ) -> AppResult<(Turn, Vec<Citation>)>;

    /// Replace an assistant turn's text and its citations together.
    ///
    /// Clears the incomplete flag.
    fn replace_answer(
        &self,
        turn_id: &str,
        text: &str,
        citations: &[NewCitation],
    ) -> AppResult<Vec<Citation>>;
}
