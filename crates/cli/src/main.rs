//! Docent CLI
//!
//! Document-grounded answers about lab equipment, with cited sources.

mod app;
mod commands;
mod server;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, PromptsCommand, RankCommand, ServeCommand, SessionCommand, TurnCommand,
};
use docent_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppError, AppResult,
};
use std::path::PathBuf;
use tracing::Instrument;

/// Docent - grounded answers from your equipment documentation
#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(about = "Grounded, cited answers from equipment documentation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCENT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCENT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log output format (pretty, json)
    #[arg(long, global = true, env = "DOCENT_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, openai, offline)
    #[arg(short, long, global = true, env = "DOCENT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "DOCENT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question and stream a cited answer
    Ask(AskCommand),

    /// Preview document ranking for a query
    Rank(RankCommand),

    /// Inspect or share a session
    Session(SessionCommand),

    /// Regenerate, rate or inspect a turn
    Turn(TurnCommand),

    /// Run the HTTP/SSE server
    Serve(ServeCommand),

    /// List answer templates and workspace overrides
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    let config = if cli.workspace.is_some() || cli.config.is_some() {
        config.relocate(cli.workspace.clone(), cli.config.clone())?
    } else {
        config
    };

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let log_format = LogFormat::parse(&cli.log_format).ok_or_else(|| {
        AppError::Config(format!("Unknown log format: {}", cli.log_format))
    })?;
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    tracing::info!("Docent starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_docent_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Rank(_) => "rank",
        Commands::Session(_) => "session",
        Commands::Turn(_) => "turn",
        Commands::Serve(_) => "serve",
        Commands::Prompts(_) => "prompts",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Rank(cmd) => cmd.execute(&config).await,
            Commands::Session(cmd) => cmd.execute(&config).await,
            Commands::Turn(cmd) => cmd.execute(&config).await,
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Prompts(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
