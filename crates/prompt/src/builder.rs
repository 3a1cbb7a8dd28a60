//! Prompt assembly from ranked documents and scope context.

use crate::loader::{load_prompt, template_inventory};
use crate::types::{BuiltPrompt, BuiltPromptMetadata, GROUNDED_TEMPLATE_ID, UNGROUNDED_TEMPLATE_ID};
use docent_core::{AppError, AppResult};
use docent_knowledge::{RankedDocument, ScopeContext};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

/// Default excerpt length in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 200;

const GROUNDED_TEMPLATE: &str = r#"You are a helpful equipment assistant. Answer questions based on the provided documentation about this specific instrument.
{{#if scope}}

Scope Information:
- Name: {{scope.name}}
- Vendor: {{scope.vendor}}
- Models: {{scope.models}}
- Description: {{scope.description}}
{{/if}}

Available Documentation:
{{#each sources}}

[Source {{number}}] - {{title}} ({{label}})
{{excerpt}}
{{/each}}

User Question: {{question}}

Instructions:
1. Answer the question using only information from the sources above
2. Reference the specific instrument by name when relevant
3. When referencing information from documentation, cite the source using [Source N] format
4. If the sources don't contain relevant information, say so clearly
5. Be concise but thorough

Answer:"#;

const UNGROUNDED_TEMPLATE: &str = r#"You are a helpful equipment assistant providing information about specific laboratory equipment.
{{#if scope}}

Scope Information:
- Name: {{scope.name}}
- Vendor: {{scope.vendor}}
- Models: {{scope.models}}
- Description: {{scope.description}}
{{/if}}

User question: {{question}}

Please provide a helpful answer about this instrument. Note: no documentation was found for this question, so answer generally from the instrument information above. Do not cite sources or add citation markers."#;

#[derive(Serialize)]
struct ScopeView {
    name: String,
    vendor: String,
    models: String,
    description: String,
}

impl ScopeView {
    fn from_context(scope: &ScopeContext) -> Self {
        Self {
            name: scope.name.clone(),
            vendor: scope.vendor.clone().unwrap_or_else(|| "Unknown".to_string()),
            models: scope.models.join(", "),
            description: scope
                .description
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
        }
    }

    // Free text must not smuggle markers into a branch with no valid sources
    fn neutralized(self) -> Self {
        Self {
            name: neutralize_markers(&self.name),
            vendor: neutralize_markers(&self.vendor),
            models: neutralize_markers(&self.models),
            description: neutralize_markers(&self.description),
        }
    }
}

#[derive(Serialize)]
struct SourceView {
    number: usize,
    title: String,
    label: &'static str,
    excerpt: String,
}

#[derive(Serialize)]
struct TemplateData {
    question: String,
    scope: Option<ScopeView>,
    sources: Vec<SourceView>,
}

fn neutralize_markers(text: &str) -> String {
    text.replace("[Source", "(Source")
}

/// Renders the grounded or ungrounded prompt for a question.
///
/// Source numbering follows the order of the ranked slice exactly, so the
/// same slice must be handed to [`docent_knowledge::link`] afterwards.
pub struct PromptAssembler {
    registry: Handlebars<'static>,
    excerpt_chars: usize,
}

impl PromptAssembler {
    /// Assembler with the built-in templates.
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        register(&mut registry, GROUNDED_TEMPLATE_ID, GROUNDED_TEMPLATE)?;
        register(&mut registry, UNGROUNDED_TEMPLATE_ID, UNGROUNDED_TEMPLATE)?;

        Ok(Self {
            registry,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        })
    }

    /// Assembler with built-ins replaced by any overrides in `.docent/prompts/`.
    pub fn from_workspace(workspace_path: &Path) -> AppResult<Self> {
        let mut assembler = Self::new()?;
        let inventory = template_inventory(workspace_path)?;

        for id in &inventory.overridden {
            if let Some(definition) = load_prompt(workspace_path, id)? {
                register(&mut assembler.registry, id, &definition.template)?;
            }
        }

        for id in &inventory.unused {
            tracing::warn!(file = %id, "Ignoring prompt override for unknown template");
        }

        Ok(assembler)
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    /// Build the prompt for `question`.
    ///
    /// An empty `ranked` slice selects the ungrounded template; its output
    /// never contains a `[Source` marker.
    pub fn build(
        &self,
        question: &str,
        ranked: &[RankedDocument],
        scope: Option<&ScopeContext>,
    ) -> AppResult<BuiltPrompt> {
        let grounded = !ranked.is_empty();
        let scope_view = scope.map(ScopeView::from_context);

        let (template_id, data) = if grounded {
            let sources = ranked
                .iter()
                .enumerate()
                .map(|(index, ranked)| SourceView {
                    number: index + 1,
                    title: ranked.document.title.clone(),
                    label: ranked.document.label(),
                    excerpt: ranked.document.excerpt(self.excerpt_chars),
                })
                .collect();

            (
                GROUNDED_TEMPLATE_ID,
                TemplateData {
                    question: question.to_string(),
                    scope: scope_view,
                    sources,
                },
            )
        } else {
            (
                UNGROUNDED_TEMPLATE_ID,
                TemplateData {
                    question: neutralize_markers(question),
                    scope: scope_view.map(ScopeView::neutralized),
                    sources: Vec::new(),
                },
            )
        };

        let text = self
            .registry
            .render(template_id, &data)
            .map_err(|e| AppError::Prompt(format!("Template rendering failed: {}", e)))?;

        tracing::debug!(
            template = template_id,
            sources = ranked.len(),
            chars = text.len(),
            "Built prompt"
        );

        Ok(BuiltPrompt {
            text,
            metadata: BuiltPromptMetadata {
                template_id: template_id.to_string(),
                grounded,
                source_count: ranked.len(),
            },
        })
    }
}

fn register(registry: &mut Handlebars<'static>, id: &str, template: &str) -> AppResult<()> {
    registry
        .register_template_string(id, template)
        .map_err(|e| AppError::Prompt(format!("Invalid template '{}': {}", id, e)))
}
