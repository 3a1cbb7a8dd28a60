//! Wiring of the chat pipeline from configuration.

use docent_chat::{ChatController, ControllerOptions, SqliteChatStore};
use docent_core::{config::AppConfig, AppResult};
use docent_knowledge::CatalogDocumentIndex;
use docent_llm::{create_client_or_unavailable, LlmClient};
use docent_prompt::PromptAssembler;
use std::sync::Arc;

/// Load the document catalog configured for the workspace.
pub fn open_index(config: &AppConfig) -> AppResult<CatalogDocumentIndex> {
    let path = config.catalog_path();
    let index = CatalogDocumentIndex::load(&path)?;
    tracing::debug!(
        "Loaded catalog {:?}: {} scopes, {} documents",
        path,
        index.scope_count(),
        index.document_count()
    );
    Ok(index)
}

/// Generation client for the configured provider.
///
/// A missing credential does not fail here; it becomes an error answer.
pub fn generation_client(config: &AppConfig) -> Arc<dyn LlmClient> {
    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.as_ref().and_then(|pc| pc.endpoint());
    let api_key = config.resolve_api_key(&config.provider);

    create_client_or_unavailable(&config.provider, endpoint, api_key.as_deref())
}

pub fn build_controller(config: &AppConfig) -> AppResult<ChatController> {
    let index = open_index(config)?;
    let store = SqliteChatStore::open(&config.database_path())?;
    let assembler = PromptAssembler::from_workspace(&config.workspace)?
        .with_excerpt_chars(config.retrieval.excerpt_chars);

    Ok(ChatController::new(
        Arc::new(index),
        Arc::new(store),
        generation_client(config),
        assembler,
    )
    .with_options(ControllerOptions::from_config(config)))
}
