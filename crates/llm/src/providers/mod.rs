//! Generation provider implementations.

mod lines;
pub mod offline;
pub mod ollama;
pub mod openai;
pub mod unavailable;

pub use offline::OfflineClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use unavailable::UnavailableClient;
