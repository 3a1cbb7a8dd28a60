//! Ollama provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md
//! `/api/generate` streams newline-delimited JSON objects.

use super::lines::line_stream;
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::types::DEFAULT_OLLAMA_URL;
use docent_core::{AppError, AppResult};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

#[derive(Debug, Serialize, Default)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaResponse {
    fn usage(&self) -> LlmUsage {
        LlmUsage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        )
    }
}

/// Ollama client.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client against http://localhost:11434.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn to_ollama_request(&self, request: &LlmRequest, stream: bool) -> OllamaRequest {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            options,
            stream,
        }
    }

    async fn post(&self, body: &OllamaRequest) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to reach Ollama at {}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one NDJSON record into a chunk.
fn parse_record(line: &str) -> AppResult<LlmStreamChunk> {
    let record: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| AppError::Llm(format!("Failed to parse Ollama chunk: {}", e)))?;

    if let Some(error) = record.error {
        return Err(AppError::Llm(format!("Ollama stream error: {}", error)));
    }

    if record.done {
        let usage = record.usage();
        let mut chunk = LlmStreamChunk::finished(Some(usage));
        chunk.content = record.response;
        return Ok(chunk);
    }

    Ok(LlmStreamChunk::text(record.response))
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to Ollama");

        let response = self.post(&self.to_ollama_request(request, false)).await?;

        let record: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        if let Some(error) = record.error {
            return Err(AppError::Llm(format!("Ollama error: {}", error)));
        }

        tracing::debug!(chars = record.response.len(), "Received completion from Ollama");

        Ok(LlmResponse {
            usage: record.usage(),
            content: record.response,
            model: record.model,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!(model = %request.model, "Starting streaming request to Ollama");

        let response = self.post(&self.to_ollama_request(request, true)).await?;

        let lines = line_stream(Box::pin(response.bytes_stream()));
        let chunks = lines.map(|line| line.and_then(|l| parse_record(&l)));

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://localhost:8080/");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("Hello", "llama3.2")
            .with_temperature(0.2)
            .with_max_tokens(100);

        let body = client.to_ollama_request(&request, true);
        assert_eq!(body.model, "llama3.2");
        assert!(body.stream);
        let options = body.options.unwrap();
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.num_predict, Some(100));
    }

    #[test]
    fn test_parse_record_text_and_done() {
        let chunk = parse_record(r#"{"model":"m","response":"Hel","done":false}"#).unwrap();
        assert_eq!(chunk.content, "Hel");
        assert!(!chunk.done);

        let last = parse_record(
            r#"{"model":"m","response":"","done":true,"prompt_eval_count":7,"eval_count":3}"#,
        )
        .unwrap();
        assert!(last.done);
        assert_eq!(last.usage.unwrap().total_tokens, 10);
    }

    #[test]
    fn test_parse_record_error_field() {
        let err = parse_record(r#"{"model":"m","error":"model not found"}"#).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }
}
