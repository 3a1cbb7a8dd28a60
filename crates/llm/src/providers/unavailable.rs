//! Stand-in for a provider that could not be constructed.
//!
//! Keeps a configuration failure (missing credential, unknown provider)
//! inside the generation layer, where the chat controller turns it into a
//! visible answer instead of refusing the request.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream};
use docent_core::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct UnavailableClient {
    provider: String,
    reason: String,
}

impl UnavailableClient {
    pub fn new(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    fn error(&self) -> AppError {
        AppError::Config(self.reason.clone())
    }
}

#[async_trait::async_trait]
impl LlmClient for UnavailableClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(self.error())
    }

    async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
        Err(self.error())
    }
}
