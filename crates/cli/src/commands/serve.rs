//! Serve command handler.

use crate::app::build_controller;
use crate::server::run_server;
use clap::Args;
use docent_core::{config::AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Run the HTTP/SSE chat server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (default: server.bind)
    #[arg(long, env = "DOCENT_BIND")]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let controller = Arc::new(build_controller(config)?);
        let bind = self.bind.as_deref().unwrap_or(&config.server.bind);

        run_server(bind, controller)
            .await
            .map_err(|e| AppError::Other(format!("Server failed: {:#}", e)))
    }
}
