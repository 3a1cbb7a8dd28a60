//! Chat sessions for Docent.
//!
//! The [`ChatController`] ties the pipeline together: it ranks a scope's
//! documents, assembles the prompt, drives the generation client (streamed
//! or not), links citations and persists turns through a [`ChatStore`].

pub mod access;
pub mod controller;
pub mod sink;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use access::{AccessPolicy, AllowAll, ScopeAllowList};
pub use controller::{ChatController, ControllerOptions};
pub use sink::EventSink;
pub use store::{ChatStore, MemoryChatStore, SqliteChatStore};
pub use types::{
    AnswerOutcome, AskRequest, ChatEvent, Citation, NewCitation, Rating, Role, Session,
    SessionTranscript, Turn,
};
