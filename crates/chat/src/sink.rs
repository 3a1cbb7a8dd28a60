//! Delivery of streaming events to the caller.

use crate::types::ChatEvent;
use async_trait::async_trait;
use docent_core::{AppError, AppResult};
use tokio::sync::mpsc;

/// Receives events in generation order.
///
/// An `Err` from `emit` means the caller is gone; the controller stops
/// forwarding but still persists what it has.
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: ChatEvent) -> AppResult<()>;
}

#[async_trait]
impl EventSink for mpsc::Sender<ChatEvent> {
    async fn emit(&mut self, event: ChatEvent) -> AppResult<()> {
        self.send(event)
            .await
            .map_err(|_| AppError::Other("Event receiver dropped".to_string()))
    }
}

#[async_trait]
impl EventSink for Vec<ChatEvent> {
    async fn emit(&mut self, event: ChatEvent) -> AppResult<()> {
        self.push(event);
        Ok(())
    }
}
