//! In-process store.

use super::ChatStore;
use crate::types::{Citation, NewCitation, Rating, Role, Session, Turn};
use docent_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    sessions: HashMap<String, Session>,
    turns: HashMap<String, Turn>,
    session_turns: HashMap<String, Vec<String>>,
    citations: HashMap<String, Vec<Citation>>,
}

impl State {
    fn turn_mut(&mut self, turn_id: &str) -> AppResult<&mut Turn> {
        self.turns
            .get_mut(turn_id)
            .ok_or_else(|| AppError::NotFound(format!("Turn {}", turn_id)))
    }

    fn assistant_turn(&self, turn_id: &str) -> AppResult<&Turn> {
        let turn = self
            .turns
            .get(turn_id)
            .ok_or_else(|| AppError::NotFound(format!("Turn {}", turn_id)))?;
        if turn.role != Role::Assistant {
            return Err(AppError::InvalidInput(format!(
                "Turn {} is not an assistant turn",
                turn_id
            )));
        }
        Ok(turn)
    }
}

/// Mutex-guarded maps; used by tests and single-process embedding.
#[derive(Default)]
pub struct MemoryChatStore {
    state: Mutex<State>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::Store("Memory store lock poisoned".to_string()))
    }
}

impl ChatStore for MemoryChatStore {
    fn create_session(&self, scope: &str, owner: Option<&str>, title: &str) -> AppResult<Session> {
        let session = Session::new(scope, owner.map(str::to_string), title);
        let mut state = self.lock()?;
        state.session_turns.insert(session.id.clone(), Vec::new());
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get_session(&self, session_id: &str) -> AppResult<Option<Session>> {
        Ok(self.lock()?.sessions.get(session_id).cloned())
    }

    fn session_by_share_token(&self, token: &str) -> AppResult<Option<Session>> {
        Ok(self
            .lock()?
            .sessions
            .values()
            .find(|s| s.share_token.as_deref() == Some(token))
            .cloned())
    }

    fn set_share_token(&self, session_id: &str, token: &str) -> AppResult<()> {
        let mut state = self.lock()?;
        let taken = state
            .sessions
            .values()
            .any(|s| s.id != session_id && s.share_token.as_deref() == Some(token));
        if taken {
            return Err(AppError::Store(format!("Share token already in use: {}", token)));
        }

        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))?;
        session.share_token = Some(token.to_string());
        Ok(())
    }

    fn append_turn(&self, session_id: &str, role: Role, text: Option<&str>) -> AppResult<Turn> {
        let mut state = self.lock()?;
        let turn = Turn::new(session_id, role, text.map(str::to_string));

        state
            .session_turns
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))?
            .push(turn.id.clone());
        state.turns.insert(turn.id.clone(), turn.clone());
        Ok(turn)
    }

    fn get_turn(&self, turn_id: &str) -> AppResult<Option<Turn>> {
        Ok(self.lock()?.turns.get(turn_id).cloned())
    }

    fn list_turns(&self, session_id: &str) -> AppResult<Vec<Turn>> {
        let state = self.lock()?;
        let ids = match state.session_turns.get(session_id) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.turns.get(id).cloned())
            .collect())
    }

    fn update_turn_text(&self, turn_id: &str, text: &str) -> AppResult<()> {
        self.lock()?.turn_mut(turn_id)?.text = Some(text.to_string());
        Ok(())
    }

    fn set_turn_rating(
        &self,
        turn_id: &str,
        rating: Rating,
        feedback_tag: Option<&str>,
    ) -> AppResult<()> {
        let mut state = self.lock()?;
        let turn = state.turn_mut(turn_id)?;
        turn.rating = Some(rating);
        turn.feedback_tag = feedback_tag.map(str::to_string);
        Ok(())
    }

    fn mark_incomplete(&self, turn_id: &str) -> AppResult<()> {
        self.lock()?.turn_mut(turn_id)?.incomplete = true;
        Ok(())
    }

    fn create_citation(&self, turn_id: &str, citation: &NewCitation) -> AppResult<Citation> {
        let mut state = self.lock()?;
        state.assistant_turn(turn_id)?;

        let created = Citation::new(turn_id, citation);
        state
            .citations
            .entry(turn_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    fn list_citations(&self, turn_id: &str) -> AppResult<Vec<Citation>> {
        Ok(self
            .lock()?
            .citations
            .get(turn_id)
            .cloned()
            .unwrap_or_default())
    }

    fn append_answer(
        &self,
        session_id: &str,
        text: &str,
        incomplete: bool,
        citations: &[NewCitation],
    ) -> AppResult<(Turn, Vec<Citation>)> {
        let mut state = self.lock()?;
        let ids = state
            .session_turns
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))?;

        let mut turn = Turn::new(session_id, Role::Assistant, Some(text.to_string()));
        turn.incomplete = incomplete;
        ids.push(turn.id.clone());

        let created: Vec<Citation> = citations
            .iter()
            .map(|c| Citation::new(&turn.id, c))
            .collect();
        state.citations.insert(turn.id.clone(), created.clone());
        state.turns.insert(turn.id.clone(), turn.clone());
        Ok((turn, created))
    }

    fn replace_answer(
        &self,
        turn_id: &str,
        text: &str,
        citations: &[NewCitation],
    ) -> AppResult<Vec<Citation>> {
        let mut state = self.lock()?;
        state.assistant_turn(turn_id)?;

        let created: Vec<Citation> = citations
            .iter()
            .map(|c| Citation::new(turn_id, c))
            .collect();

        let turn = state.turn_mut(turn_id)?;
        turn.text = Some(text.to_string());
        turn.incomplete = false;
        state.citations.insert(turn_id.to_string(), created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[test]
    fn test_turns_keep_creation_order() {
        contract::turns_keep_creation_order(&MemoryChatStore::new());
    }

    #[test]
    fn test_unknown_session_rejected() {
        contract::unknown_session_rejected(&MemoryChatStore::new());
    }

    #[test]
    fn test_share_tokens_are_unique() {
        contract::share_tokens_are_unique(&MemoryChatStore::new());
    }

    #[test]
    fn test_citations_require_assistant_turn() {
        contract::citations_require_assistant_turn(&MemoryChatStore::new());
    }

    #[test]
    fn test_replace_answer() {
        contract::replace_answer_swaps_text_and_citations(&MemoryChatStore::new());
    }

    #[test]
    fn test_append_answer() {
        contract::append_answer_writes_turn_and_citations(&MemoryChatStore::new());
        contract::append_answer_to_unknown_session_writes_nothing(&MemoryChatStore::new());
    }

    #[test]
    fn test_rating_and_text_updates() {
        contract::rating_and_text_updates(&MemoryChatStore::new());
    }
}
