//! Generation client crate for Docent.
//!
//! The generative model is an opaque capability: given a prompt it returns
//! either a complete text or a lazy, finite stream of text chunks. This crate
//! provides the provider-agnostic trait and its implementations.
//!
//! # Providers
//! - **Ollama**: local runtime (default)
//! - **OpenAI**: any OpenAI-compatible `/chat/completions` endpoint
//! - **Offline**: canned output when no external model is configured
//! - **Unavailable**: carries a configuration failure to the caller
//!
//! # Example
//! ```no_run
//! use docent_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("How do I calibrate the pump?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
pub use factory::{create_client, create_client_or_unavailable};
pub use providers::{OfflineClient, OllamaClient, OpenAiClient, UnavailableClient};
pub use types::ProviderType;
