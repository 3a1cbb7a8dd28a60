//! Controller scenarios driven by scripted generation clients.

mod answers;
mod streaming;

use crate::controller::{ChatController, ControllerOptions};
use crate::sink::EventSink;
use crate::store::ChatStore;
use crate::types::ChatEvent;
use async_trait::async_trait;
use docent_core::{AppError, AppResult};
use docent_knowledge::{Document, DocumentCategory, MemoryDocumentIndex, ScopeContext};
use docent_llm::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use docent_prompt::PromptAssembler;
use futures::stream;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const SCOPE: &str = "hplc";

/// Scope with three eligible documents and one rejected one.
pub(crate) fn fixture_index() -> Arc<MemoryDocumentIndex> {
    Arc::new(
        MemoryDocumentIndex::new()
            .with_scope(ScopeContext {
                id: SCOPE.to_string(),
                name: "HPLC 1260".to_string(),
                vendor: Some("Agilent".to_string()),
                models: vec!["1260".to_string()],
                description: None,
            })
            .with_document(
                Document::new("doc-cal", SCOPE, "Daily Calibration Protocol")
                    .with_category(DocumentCategory::Protocol),
            )
            .with_document(
                Document::new("doc-sop", SCOPE, "Startup SOP")
                    .with_description("Purge the pump before startup")
                    .with_category(DocumentCategory::Sop),
            )
            .with_document(Document::new("doc-notes", SCOPE, "Random Notes"))
            .with_document(
                Document::new("doc-old", SCOPE, "Old startup calibration sheet").with_status(
                    docent_knowledge::DocumentStatus::Rejected,
                ),
            ),
    )
}

pub(crate) fn test_options() -> ControllerOptions {
    ControllerOptions {
        model: "scripted".to_string(),
        timeout: Duration::from_millis(200),
        ..ControllerOptions::default()
    }
}

pub(crate) fn controller(client: Arc<dyn LlmClient>, store: Arc<dyn ChatStore>) -> ChatController {
    let assembler = PromptAssembler::new().unwrap();
    ChatController::new(fixture_index(), store, client, assembler).with_options(test_options())
}

enum Tail {
    End,
    Fail(String),
    Stall,
}

/// Generation client replaying fixed chunks, recording every prompt.
pub(crate) struct ScriptedClient {
    chunks: Vec<String>,
    tail: Tail,
    completion: Option<String>,
    completion_error: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            tail: Tail::End,
            completion: None,
            completion_error: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Stream ends with an error item after the chunks.
    pub fn failing_after(mut self, message: &str) -> Self {
        self.tail = Tail::Fail(message.to_string());
        self
    }

    /// Stream never ends after the chunks; completions never return.
    pub fn stalling(mut self) -> Self {
        self.tail = Tail::Stall;
        self
    }

    pub fn with_completion(mut self, text: &str) -> Self {
        self.completion = Some(text.to_string());
        self
    }

    pub fn failing_completions(mut self, message: &str) -> Self {
        self.completion_error = Some(message.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn record(&self, request: &LlmRequest) {
        self.prompts.lock().unwrap().push(request.prompt.clone());
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.record(request);

        if let Some(message) = &self.completion_error {
            return Err(AppError::Llm(message.clone()));
        }
        match &self.tail {
            Tail::Stall => std::future::pending::<()>().await,
            Tail::Fail(message) if self.completion.is_none() => {
                return Err(AppError::Llm(message.clone()))
            }
            _ => {}
        }

        Ok(LlmResponse {
            content: self
                .completion
                .clone()
                .unwrap_or_else(|| self.chunks.concat()),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        self.record(request);

        let head = stream::iter(
            self.chunks
                .clone()
                .into_iter()
                .map(|c| Ok::<_, AppError>(LlmStreamChunk::text(c))),
        );

        let stream: LlmStream = match &self.tail {
            Tail::End => Box::pin(head.chain(stream::once(async {
                Ok::<_, AppError>(LlmStreamChunk::finished(None))
            }))),
            Tail::Fail(message) => {
                let message = message.clone();
                Box::pin(head.chain(stream::once(async move {
                    Err::<LlmStreamChunk, _>(AppError::Llm(message))
                })))
            }
            Tail::Stall => Box::pin(head.chain(stream::pending())),
        };
        Ok(stream)
    }
}

/// Sink that accepts `accept` events and then reports the caller gone.
pub(crate) struct DisconnectingSink {
    accept: usize,
    pub events: Vec<ChatEvent>,
}

impl DisconnectingSink {
    pub fn new(accept: usize) -> Self {
        Self {
            accept,
            events: Vec::new(),
        }
    }
}

#[async_trait]
impl EventSink for DisconnectingSink {
    async fn emit(&mut self, event: ChatEvent) -> AppResult<()> {
        if self.events.len() >= self.accept {
            return Err(AppError::Other("client went away".to_string()));
        }
        self.events.push(event);
        Ok(())
    }
}

pub(crate) fn tokens(events: &[ChatEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Token { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}
