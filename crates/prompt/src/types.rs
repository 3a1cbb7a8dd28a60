//! Prompt types.

use serde::{Deserialize, Serialize};

/// Template id used when ranked documents are available.
pub const GROUNDED_TEMPLATE_ID: &str = "answer.grounded";

/// Template id used when no document matched the question.
pub const UNGROUNDED_TEMPLATE_ID: &str = "answer.ungrounded";

/// Every template id a workspace may override.
pub const TEMPLATE_IDS: [&str; 2] = [GROUNDED_TEMPLATE_ID, UNGROUNDED_TEMPLATE_ID];

/// A prompt template definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Template id this definition replaces
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Handlebars template text
    pub template: String,
}

/// A fully built prompt ready for generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPrompt {
    pub text: String,
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    #[serde(rename = "templateId")]
    pub template_id: String,

    /// Whether numbered sources were included
    pub grounded: bool,

    /// Number of `[Source N]` blocks; N ranges over 1..=source_count
    #[serde(rename = "sourceCount")]
    pub source_count: usize,
}
