//! Prompt assembly for docent.
//!
//! Turns a question, its ranked documents and optional scope context into
//! the text prompt handed to the generation client:
//! - built-in Handlebars templates for the grounded and ungrounded branches
//! - workspace overrides loaded from `.docent/prompts/<id>.yml`

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::{PromptAssembler, DEFAULT_EXCERPT_CHARS};
pub use loader::{list_prompts, load_prompt, template_inventory, TemplateInventory};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, GROUNDED_TEMPLATE_ID, TEMPLATE_IDS,
    UNGROUNDED_TEMPLATE_ID,
};
