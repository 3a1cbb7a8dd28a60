//! Turn/session controller.
//!
//! Drives one answer through its states:
//!
//! ```text
//! CREATED -> GENERATING -> [STREAMING] -> FINALIZING -> PERSISTED
//! ```
//!
//! A user turn is written before generation starts. Whatever happens after
//! that point, a paired assistant turn is written too: generation failures
//! become visible error text and a caller that disconnects mid-stream gets
//! the delivered text persisted as an incomplete answer. Only store and
//! access failures surface as `Err`.

use crate::access::{AccessPolicy, AllowAll};
use crate::sink::EventSink;
use crate::store::ChatStore;
use crate::types::{
    session_title, AnswerOutcome, AskRequest, ChatEvent, Citation, NewCitation, Rating, Role,
    Session, SessionTranscript, Turn,
};
use docent_core::config::DEFAULT_OLLAMA_MODEL;
use docent_core::{AppConfig, AppError, AppResult};
use docent_knowledge::{
    link, rank_scope, retrieval_citations, CitationCandidate, DocumentIndex, RankedDocument,
    DEFAULT_LIMIT,
};
use docent_llm::{LlmClient, LlmRequest};
use docent_prompt::{BuiltPrompt, PromptAssembler};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerState {
    Created,
    Generating,
    Streaming,
    Finalizing,
    Persisted,
}

impl AnswerState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Generating => "GENERATING",
            Self::Streaming => "STREAMING",
            Self::Finalizing => "FINALIZING",
            Self::Persisted => "PERSISTED",
        }
    }
}

fn enter(state: AnswerState, user_turn_id: &str) {
    tracing::info!(state = state.as_str(), user_turn = user_turn_id, "Answer state");
}

/// Tunables for ranking and generation.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub model: String,
    pub top_k: usize,
    pub temperature: f32,
    pub max_tokens: Option<u32>,

    /// Bound on a completion, on opening a stream, and on each chunk wait
    pub timeout: Duration,

    /// Ranked documents attached at retrieval confidence when an answer
    /// has no resolvable markers; 0 disables
    pub fallback_citations: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            top_k: DEFAULT_LIMIT,
            temperature: 0.2,
            max_tokens: None,
            timeout: Duration::from_secs(30),
            fallback_citations: 0,
        }
    }
}

impl ControllerOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            top_k: config.retrieval.top_k,
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
            timeout: config.generation.timeout(),
            fallback_citations: config.retrieval.fallback_citations,
        }
    }
}

struct Grounding {
    ranked: Vec<RankedDocument>,
    prompt: BuiltPrompt,
}

enum StreamEnd {
    Finished,
    Disconnected,
}

/// Owns the lifecycle of chat sessions and their turns.
pub struct ChatController {
    index: Arc<dyn DocumentIndex>,
    store: Arc<dyn ChatStore>,
    llm: Arc<dyn LlmClient>,
    assembler: Arc<PromptAssembler>,
    access: Arc<dyn AccessPolicy>,
    options: ControllerOptions,
}

impl ChatController {
    pub fn new(
        index: Arc<dyn DocumentIndex>,
        store: Arc<dyn ChatStore>,
        llm: Arc<dyn LlmClient>,
        assembler: PromptAssembler,
    ) -> Self {
        Self {
            index,
            store,
            llm,
            assembler: Arc::new(assembler),
            access: Arc::new(AllowAll),
            options: ControllerOptions::default(),
        }
    }

    pub fn with_access_policy(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Answer a question with a single completion call.
    pub async fn ask(&self, request: AskRequest) -> AppResult<AnswerOutcome> {
        let (session, user_turn) = self.open_turn(&request)?;

        let (ranked, generated) = match self.ground(&session.scope, &request.question) {
            Ok(grounding) => {
                enter(AnswerState::Generating, &user_turn.id);
                let generated = self.complete(&grounding.prompt).await;
                (grounding.ranked, generated)
            }
            Err(e) => (Vec::new(), Err(e)),
        };

        let (text, failed) = match generated {
            Ok(text) => (text, false),
            Err(e) => (failure_text(&user_turn.id, &e), true),
        };

        self.finalize(&session, &user_turn, &ranked, text, failed, false)
    }

    /// Answer a question, forwarding chunks to `sink` as they arrive.
    ///
    /// Emits `Start`, then one `Token` per non-empty chunk in arrival order,
    /// then `Done` once the assistant turn is persisted.
    pub async fn ask_stream(
        &self,
        request: AskRequest,
        sink: &mut dyn EventSink,
    ) -> AppResult<AnswerOutcome> {
        let (session, user_turn) = self.open_turn(&request)?;

        let mut connected = sink
            .emit(ChatEvent::Start {
                session_id: session.id.clone(),
                user_turn_id: user_turn.id.clone(),
            })
            .await
            .is_ok();
        if !connected {
            tracing::warn!(user_turn = %user_turn.id, "Caller disconnected before generation");
        }

        let mut text = String::new();
        let mut ranked = Vec::new();
        let mut failure = None;

        if connected {
            match self.ground(&session.scope, &request.question) {
                Ok(grounding) => {
                    ranked = grounding.ranked;
                    enter(AnswerState::Generating, &user_turn.id);
                    match self
                        .pump_stream(&grounding.prompt, &user_turn.id, sink, &mut text)
                        .await
                    {
                        Ok(StreamEnd::Finished) => {}
                        Ok(StreamEnd::Disconnected) => connected = false,
                        Err(e) => failure = Some(e),
                    }
                }
                Err(e) => failure = Some(e),
            }
        }

        if connected && failure.is_none() && text.trim().is_empty() {
            failure = Some(AppError::Llm("Generation stream produced no text".to_string()));
        }

        let failed = failure.is_some();
        if let Some(e) = failure {
            let note = failure_text(&user_turn.id, &e);
            let note = if text.is_empty() {
                note
            } else {
                format!("\n\n{}", note)
            };

            if sink.emit(ChatEvent::Token { text: note.clone() }).await.is_err() {
                connected = false;
            }
            text.push_str(&note);
        }

        let outcome = self.finalize(&session, &user_turn, &ranked, text, failed, !connected)?;

        if connected {
            let done = ChatEvent::Done {
                turn_id: outcome.turn_id.clone(),
                citations: outcome.citations.clone(),
                incomplete: outcome.incomplete,
            };
            if sink.emit(done).await.is_err() {
                tracing::debug!(turn = %outcome.turn_id, "Caller left before the done event");
            }
        }

        Ok(outcome)
    }

    /// Replace an assistant turn's answer using its question's grounding.
    ///
    /// On generation failure the stored answer is left as it was; the
    /// outcome carries the error text with `failed` set.
    pub async fn regenerate(&self, turn_id: &str, principal: Option<&str>) -> AppResult<AnswerOutcome> {
        let turn = self.require_turn(turn_id)?;
        if turn.role != Role::Assistant {
            return Err(AppError::InvalidInput(format!(
                "Turn {} is a user turn; only answers can be regenerated",
                turn_id
            )));
        }

        let session = self.require_session(&turn.session_id)?;
        self.access.check_scope(principal, &session.scope)?;

        let turns = self.store.list_turns(&session.id)?;
        let position = turns
            .iter()
            .position(|t| t.id == turn.id)
            .ok_or_else(|| AppError::NotFound(format!("Turn {}", turn_id)))?;
        let question_turn = turns[..position]
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .ok_or_else(|| {
                AppError::InvalidInput(format!("Turn {} has no preceding question", turn_id))
            })?;
        let question = question_turn.text.clone().unwrap_or_default();

        tracing::info!(turn = turn_id, "Regenerating answer");

        let grounding = self.ground(&session.scope, &question)?;
        let text = match self.complete(&grounding.prompt).await {
            Ok(text) => text,
            Err(e) if e.is_generation_failure() => {
                tracing::warn!(turn = turn_id, "Regeneration failed; keeping stored answer");
                return Ok(AnswerOutcome {
                    session_id: session.id,
                    user_turn_id: question_turn.id.clone(),
                    turn_id: turn.id,
                    text: failure_text(&question_turn.id, &e),
                    citations: Vec::new(),
                    incomplete: false,
                    failed: true,
                });
            }
            Err(e) => return Err(e),
        };

        let linked = link(text, &grounding.ranked);
        let candidates = self.with_fallback(linked.citations, &grounding.ranked, false);
        let new_citations: Vec<NewCitation> = candidates.iter().map(NewCitation::from).collect();
        let citations = self
            .store
            .replace_answer(&turn.id, &linked.text, &new_citations)?;

        Ok(AnswerOutcome {
            session_id: session.id,
            user_turn_id: question_turn.id.clone(),
            turn_id: turn.id,
            text: linked.text,
            citations,
            incomplete: false,
            failed: false,
        })
    }

    /// Turns of a session in creation order.
    pub fn session_turns(&self, session_id: &str) -> AppResult<Vec<Turn>> {
        self.require_session(session_id)?;
        self.store.list_turns(session_id)
    }

    pub fn citations_for_turn(&self, turn_id: &str) -> AppResult<Vec<Citation>> {
        self.require_turn(turn_id)?;
        self.store.list_citations(turn_id)
    }

    /// Record reader feedback on an answer.
    pub fn rate_turn(
        &self,
        turn_id: &str,
        rating: Rating,
        feedback_tag: Option<&str>,
    ) -> AppResult<Turn> {
        let turn = self.require_turn(turn_id)?;
        if turn.role != Role::Assistant {
            return Err(AppError::InvalidInput(format!(
                "Turn {} is a user turn; only answers can be rated",
                turn_id
            )));
        }

        let feedback_tag = feedback_tag.map(str::trim).filter(|t| !t.is_empty());
        self.store.set_turn_rating(turn_id, rating, feedback_tag)?;
        tracing::info!(turn = turn_id, rating = rating.as_str(), "Rated turn");

        self.require_turn(turn_id)
    }

    /// Share token for a session, minted on first use.
    pub fn share_session(&self, session_id: &str) -> AppResult<String> {
        let session = self.require_session(session_id)?;
        if let Some(token) = session.share_token {
            return Ok(token);
        }

        let token = Uuid::new_v4().simple().to_string();
        self.store.set_share_token(session_id, &token)?;
        tracing::info!(session = session_id, "Shared session");
        Ok(token)
    }

    pub fn shared_session(&self, token: &str) -> AppResult<SessionTranscript> {
        let session = self
            .store
            .session_by_share_token(token)?
            .ok_or_else(|| AppError::NotFound("Shared session".to_string()))?;
        let turns = self.store.list_turns(&session.id)?;
        Ok(SessionTranscript { session, turns })
    }

    fn require_session(&self, session_id: &str) -> AppResult<Session> {
        self.store
            .get_session(session_id)?
            .ok_or_else(|| AppError::NotFound(format!("Session {}", session_id)))
    }

    fn require_turn(&self, turn_id: &str) -> AppResult<Turn> {
        self.store
            .get_turn(turn_id)?
            .ok_or_else(|| AppError::NotFound(format!("Turn {}", turn_id)))
    }

    fn open_turn(&self, request: &AskRequest) -> AppResult<(Session, Turn)> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("Question cannot be empty".to_string()));
        }
        if request.scope.trim().is_empty() {
            return Err(AppError::InvalidInput("Scope cannot be empty".to_string()));
        }

        self.access
            .check_scope(request.owner.as_deref(), &request.scope)?;

        let session = match &request.session_id {
            Some(id) => {
                let session = self.require_session(id)?;
                if session.scope != request.scope {
                    return Err(AppError::InvalidInput(format!(
                        "Session {} belongs to scope {}, not {}",
                        id, session.scope, request.scope
                    )));
                }
                session
            }
            None => self.store.create_session(
                &request.scope,
                request.owner.as_deref(),
                &session_title(question),
            )?,
        };

        let user_turn = self
            .store
            .append_turn(&session.id, Role::User, Some(question))?;
        enter(AnswerState::Created, &user_turn.id);

        Ok((session, user_turn))
    }

    fn ground(&self, scope: &str, question: &str) -> AppResult<Grounding> {
        let ranked = rank_scope(self.index.as_ref(), scope, question, self.options.top_k)?;
        let scope_context = self.index.scope_context(scope)?;
        let prompt = self
            .assembler
            .build(question, &ranked, scope_context.as_ref())?;

        tracing::debug!(
            sources = ranked.len(),
            prompt_chars = prompt.text.len(),
            "Grounded question"
        );

        Ok(Grounding { ranked, prompt })
    }

    fn request(&self, prompt: &BuiltPrompt) -> LlmRequest {
        let request = LlmRequest::new(prompt.text.clone(), self.options.model.clone())
            .with_temperature(self.options.temperature);
        match self.options.max_tokens {
            Some(max) => request.with_max_tokens(max),
            None => request,
        }
    }

    fn timeout_error(&self) -> AppError {
        AppError::Llm(format!(
            "Generation timed out after {:?}",
            self.options.timeout
        ))
    }

    async fn complete(&self, prompt: &BuiltPrompt) -> AppResult<String> {
        let request = self.request(prompt);
        let response = tokio::time::timeout(self.options.timeout, self.llm.complete(&request))
            .await
            .map_err(|_| self.timeout_error())??;
        response.into_content()
    }

    /// Forward chunks to the sink, appending delivered text to `text`.
    async fn pump_stream(
        &self,
        prompt: &BuiltPrompt,
        user_turn_id: &str,
        sink: &mut dyn EventSink,
        text: &mut String,
    ) -> AppResult<StreamEnd> {
        let request = self.request(prompt).with_streaming();
        let mut stream = tokio::time::timeout(self.options.timeout, self.llm.stream(&request))
            .await
            .map_err(|_| self.timeout_error())??;

        let mut delivered = 0usize;
        loop {
            let next = tokio::time::timeout(self.options.timeout, stream.next())
                .await
                .map_err(|_| self.timeout_error())?;
            let chunk = match next {
                Some(chunk) => chunk?,
                None => break,
            };
            let done = chunk.done;

            if !chunk.content.is_empty() {
                if delivered == 0 {
                    enter(AnswerState::Streaming, user_turn_id);
                }

                let piece = chunk.content;
                if sink
                    .emit(ChatEvent::Token {
                        text: piece.clone(),
                    })
                    .await
                    .is_err()
                {
                    tracing::warn!(
                        user_turn = user_turn_id,
                        delivered,
                        "Caller disconnected mid-stream; keeping delivered text"
                    );
                    return Ok(StreamEnd::Disconnected);
                }
                text.push_str(&piece);
                delivered += 1;
            }

            if done {
                break;
            }
        }

        tracing::debug!(user_turn = user_turn_id, chunks = delivered, "Stream exhausted");
        Ok(StreamEnd::Finished)
    }

    fn with_fallback(
        &self,
        linked: Vec<CitationCandidate>,
        ranked: &[RankedDocument],
        failed: bool,
    ) -> Vec<CitationCandidate> {
        if linked.is_empty() && !failed && self.options.fallback_citations > 0 {
            return retrieval_citations(ranked, self.options.fallback_citations);
        }
        linked
    }

    fn finalize(
        &self,
        session: &Session,
        user_turn: &Turn,
        ranked: &[RankedDocument],
        text: String,
        failed: bool,
        incomplete: bool,
    ) -> AppResult<AnswerOutcome> {
        enter(AnswerState::Finalizing, &user_turn.id);

        let linked = link(text, ranked);
        let candidates = self.with_fallback(linked.citations, ranked, failed);

        let new_citations: Vec<NewCitation> = candidates.iter().map(NewCitation::from).collect();
        let (answer, citations) =
            self.store
                .append_answer(&session.id, &linked.text, incomplete, &new_citations)?;

        enter(AnswerState::Persisted, &user_turn.id);
        tracing::info!(
            turn = %answer.id,
            citations = citations.len(),
            failed,
            incomplete,
            "Persisted answer"
        );

        Ok(AnswerOutcome {
            session_id: session.id.clone(),
            user_turn_id: user_turn.id.clone(),
            turn_id: answer.id,
            text: linked.text,
            citations,
            incomplete,
            failed,
        })
    }
}

fn failure_text(user_turn_id: &str, error: &AppError) -> String {
    tracing::warn!(user_turn = user_turn_id, error = %error, "Generation failed");
    format!("[Generation error: {}]", error)
}
