//! Generation client factory.
//!
//! Resolves a provider name, endpoint and credential into a client. The
//! `_or_unavailable` variant never fails: a configuration problem becomes an
//! [`UnavailableClient`] so it surfaces as an answer, not a startup error.

use crate::client::LlmClient;
use crate::providers::{OfflineClient, OllamaClient, OpenAiClient, UnavailableClient};
use crate::types::{ProviderType, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};
use docent_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a client for the named provider.
///
/// # Arguments
/// * `provider` - "ollama", "openai" or "offline"
/// * `endpoint` - Optional base URL override
/// * `api_key` - Credential for providers that need one
///
/// # Errors
/// `AppError::Config` when the provider is unknown or its credential is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::OpenAI => {
            let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config(
                    "OpenAI provider requires an API key (set DOCENT_API_KEY)".to_string(),
                )
            })?;
            let base_url = endpoint.unwrap_or(DEFAULT_OPENAI_URL);
            Ok(Arc::new(OpenAiClient::with_base_url(base_url, api_key)))
        }
        ProviderType::Offline => Ok(Arc::new(OfflineClient::new())),
    }
}

/// Like [`create_client`], but wraps failures in an [`UnavailableClient`].
pub fn create_client_or_unavailable(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Arc<dyn LlmClient> {
    match create_client(provider, endpoint, api_key) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(provider, error = %e, "Generation provider unavailable");
            let reason = match e {
                AppError::Config(msg) => msg,
                other => other.to_string(),
            };
            Arc::new(UnavailableClient::new(provider, reason))
        }
    }
}
