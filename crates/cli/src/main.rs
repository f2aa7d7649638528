//! Pitlane CLI
//!
//! Main entry point for the pitlane command-line tool.
//! Answers customer questions from a live knowledge document.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, ReloadCommand, StatusCommand};
use pitlane_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Pitlane - retrieval-grounded help assistant
#[derive(Parser, Debug)]
#[command(name = "pitlane")]
#[command(about = "Retrieval-grounded help assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "PITLANE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "PITLANE_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge document URL or file path
    #[arg(short, long, global = true, env = "PITLANE_SOURCE")]
    source: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, openai, mock)
    #[arg(short, long, global = true, env = "PITLANE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "PITLANE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a single question
    Ask(AskCommand),

    /// Interactive multi-turn conversation
    Chat(ChatCommand),

    /// Show knowledge load status
    Status(StatusCommand),

    /// Force a knowledge reload (requires the admin token)
    Reload(ReloadCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config)?.with_overrides(
        cli.workspace,
        cli.source,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let log_format = if config.log_json {
        logging::LogFormat::Json
    } else {
        logging::LogFormat::Text
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    tracing::info!("Pitlane CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Status(_) => "status",
        Commands::Reload(_) => "reload",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
        Commands::Reload(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
