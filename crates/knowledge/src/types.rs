//! Document data model.
//!
//! Documents are owned by an external repository; this crate only reads them.

use serde::{Deserialize, Serialize};

/// Document category, used for display and ranking boosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Manual,
    Protocol,
    Sop,
    Troubleshooting,
    Training,
    Maintenance,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Protocol => "protocol",
            Self::Sop => "sop",
            Self::Troubleshooting => "troubleshooting",
            Self::Training => "training",
            Self::Maintenance => "maintenance",
        }
    }

    /// Authoritative categories outrank others at equal lexical score.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Self::Manual | Self::Troubleshooting | Self::Sop)
    }
}

/// Lifecycle status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Uploaded,
    Processing,
    Parsed,
    Embedded,
    Approved,
    Rejected,
    Archived,
}

/// Media type of the underlying file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Pdf,
    Video,
    Image,
    Note,
    Url,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Video => "video",
            Self::Image => "image",
            Self::Note => "note",
            Self::Url => "url",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(Self::Pdf),
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            "note" => Some(Self::Note),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

/// A document in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    /// Owning scope (equipment) identifier
    pub scope: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub kind: DocumentKind,

    #[serde(default)]
    pub category: Option<DocumentCategory>,

    #[serde(default)]
    pub status: DocumentStatus,

    #[serde(default)]
    pub archived: bool,

    #[serde(default)]
    pub version: Option<String>,

    /// Instrument models this document applies to
    #[serde(default, rename = "modelTags")]
    pub model_tags: Vec<String>,
}

impl Document {
    /// Create an uploaded, non-archived document with no description.
    pub fn new(id: impl Into<String>, scope: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: scope.into(),
            title: title.into(),
            description: None,
            kind: DocumentKind::default(),
            category: None,
            status: DocumentStatus::default(),
            archived: false,
            version: None,
            model_tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: DocumentCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn archived(mut self) -> Self {
        self.archived = true;
        self
    }

    /// Whether the document may be ranked and cited.
    pub fn is_eligible(&self) -> bool {
        !self.archived && !matches!(self.status, DocumentStatus::Rejected | DocumentStatus::Archived)
    }

    /// Non-empty description, if any.
    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// Category name, or the media kind when uncategorized.
    pub fn label(&self) -> &'static str {
        self.category
            .map(|c| c.as_str())
            .unwrap_or_else(|| self.kind.as_str())
    }

    /// Description cut to `max_chars` characters with a trailing "..." when
    /// cut; the title when there is no description.
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.description_text() {
            Some(description) => {
                let mut chars = description.chars();
                let head: String = chars.by_ref().take(max_chars).collect();
                if chars.next().is_some() {
                    format!("{}...", head)
                } else {
                    head
                }
            }
            None => self.title.clone(),
        }
    }
}

/// Descriptive metadata about a scope, used in prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeContext {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A document paired with its relevance score for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDocument {
    pub document: Document,
    pub score: f64,
}
