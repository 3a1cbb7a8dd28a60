//! Offline provider used when no external model is configured.
//!
//! Produces fixed output so the whole session pipeline (turns, streaming
//! events, persistence) can run without network access.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use docent_core::{AppError, AppResult};
use futures::StreamExt;
use std::time::Duration;

/// Chunks emitted by [`OfflineClient::stream`], in order.
pub const OFFLINE_CHUNKS: [&str; 5] = ["Working ", "through ", "your ", "question...", " Done."];

/// Text returned by [`OfflineClient::complete`].
pub const OFFLINE_ANSWER: &str = "This is a placeholder answer. Configure a generation \
provider (for example DOCENT_PROVIDER=openai with DOCENT_API_KEY set) to enable real responses.";

/// Deterministic stand-in for a generation provider.
#[derive(Debug, Clone, Default)]
pub struct OfflineClient {
    chunk_delay: Duration,
}

impl OfflineClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between streamed chunks, to mimic a live model.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl LlmClient for OfflineClient {
    fn provider_name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Offline provider answering without a model");
        Ok(LlmResponse {
            content: OFFLINE_ANSWER.to_string(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }

    async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::debug!("Offline provider streaming canned chunks");
        let delay = self.chunk_delay;

        let chunks = futures::stream::iter(OFFLINE_CHUNKS)
            .then(move |text| async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok::<_, AppError>(LlmStreamChunk::text(text))
            })
            .chain(futures::stream::once(async {
                Ok::<_, AppError>(LlmStreamChunk::finished(None))
            }));

        Ok(Box::pin(chunks))
    }
}
