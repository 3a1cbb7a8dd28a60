//! Session, turn and citation records, plus the streaming event model.

use chrono::{DateTime, Utc};
use docent_core::{AppError, AppResult};
use docent_knowledge::{CitationCandidate, DocumentKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session titles keep this many characters of the first question.
pub const SESSION_TITLE_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(AppError::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Reader feedback on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Like,
    Dislike,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "like" | "up" => Ok(Self::Like),
            "dislike" | "down" => Ok(Self::Dislike),
            other => Err(AppError::InvalidInput(format!(
                "Unknown rating: {} (expected like or dislike)",
                other
            ))),
        }
    }
}

/// One conversation about one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub scope: String,
    pub owner: Option<String>,
    pub title: String,

    /// Globally unique when present
    pub share_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(scope: impl Into<String>, owner: Option<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scope: scope.into(),
            owner,
            title: title.into(),
            share_token: None,
            created_at: Utc::now(),
        }
    }
}

/// Title derived from the question that opened a session.
pub fn session_title(question: &str) -> String {
    question.trim().chars().take(SESSION_TITLE_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub text: Option<String>,
    pub rating: Option<Rating>,
    pub feedback_tag: Option<String>,

    /// Set when the caller went away before the stream finished
    #[serde(default)]
    pub incomplete: bool,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(session_id: impl Into<String>, role: Role, text: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            text,
            rating: None,
            feedback_tag: None,
            incomplete: false,
            created_at: Utc::now(),
        }
    }
}

/// A citation to be written against an assistant turn.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCitation {
    pub document_id: String,
    pub title: String,
    pub kind: DocumentKind,

    /// Opaque locator of a page, timestamp or region in the document
    pub fragment_id: String,
    pub score: f32,
}

impl From<&CitationCandidate> for NewCitation {
    fn from(candidate: &CitationCandidate) -> Self {
        Self {
            document_id: candidate.document_id.clone(),
            title: candidate.title.clone(),
            kind: candidate.kind,
            fragment_id: Uuid::new_v4().to_string(),
            score: candidate.score,
        }
    }
}

/// A persisted citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub turn_id: String,
    pub document_id: String,
    pub title: String,
    pub kind: DocumentKind,
    pub fragment_id: String,
    pub score: f32,
}

impl Citation {
    pub fn new(turn_id: impl Into<String>, citation: &NewCitation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            turn_id: turn_id.into(),
            document_id: citation.document_id.clone(),
            title: citation.title.clone(),
            kind: citation.kind,
            fragment_id: citation.fragment_id.clone(),
            score: citation.score,
        }
    }
}

/// A question addressed to a scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub scope: String,
    pub question: String,

    /// Continue this session instead of opening a new one
    #[serde(default)]
    pub session_id: Option<String>,

    /// Principal asking, checked by the access policy and kept as session owner
    #[serde(default)]
    pub owner: Option<String>,
}

impl AskRequest {
    pub fn new(scope: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            question: question.into(),
            session_id: None,
            owner: None,
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Result of one answered question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub session_id: String,
    pub user_turn_id: String,
    pub turn_id: String,
    pub text: String,
    pub citations: Vec<Citation>,

    /// The caller disconnected before the stream finished
    pub incomplete: bool,

    /// The text reports a generation failure rather than an answer
    pub failed: bool,
}

/// A session resolved from a share token.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTranscript {
    pub session: Session,
    pub turns: Vec<Turn>,
}

/// Incremental events delivered while an answer streams.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ChatEvent {
    Start {
        session_id: String,
        user_turn_id: String,
    },
    Token {
        text: String,
    },
    Done {
        turn_id: String,
        citations: Vec<Citation>,
        incomplete: bool,
    },
}

impl ChatEvent {
    /// Event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Token { .. } => "token",
            Self::Done { .. } => "done",
        }
    }
}
