//! askboard CLI
//!
//! Ask questions against the local knowledge base, review escalated
//! questions, curate answers and summarize conversations for the board.

mod commands;

use askboard_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{
    AskCommand, Decision, KnowledgeCommand, ListCommand, Listing, ModerateCommand, ShowCommand,
    SummarizeCommand,
};
use std::path::PathBuf;
use tracing::Instrument;

/// askboard - question answering with a review board
#[derive(Parser, Debug)]
#[command(name = "askboard")]
#[command(about = "Question answering over a curated knowledge base with board escalation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ASKBOARD_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ASKBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (openai, ollama, none)
    #[arg(short, long, global = true, env = "ASKBOARD_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "ASKBOARD_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question
    Ask(AskCommand),

    /// List escalated questions awaiting review
    Pending(ListCommand),

    /// List answered questions fit for display
    Public(ListCommand),

    /// List recent questions
    Recent(ListCommand),

    /// Show one logged question
    Show(ShowCommand),

    /// Approve an escalated question
    Approve(ModerateCommand),

    /// Reject an escalated question
    Reject(ModerateCommand),

    /// Summarize a conversation into a board post
    Summarize(SummarizeCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Pending(_) => "pending",
            Commands::Public(_) => "public",
            Commands::Recent(_) => "recent",
            Commands::Show(_) => "show",
            Commands::Approve(_) => "approve",
            Commands::Reject(_) => "reject",
            Commands::Summarize(_) => "summarize",
            Commands::Knowledge(_) => "knowledge",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let span = tracing::info_span!("command", name = cli.command.name());
    let result = run(&cli.command, &config).instrument(span.clone()).await;

    span.in_scope(|| match &result {
        Ok(_) => tracing::info!("Command completed"),
        Err(e) => tracing::error!("Command failed: {}", e),
    });

    result
}

async fn run(command: &Commands, config: &AppConfig) -> AppResult<()> {
    match command {
        Commands::Ask(cmd) => cmd.execute(config).await,
        Commands::Pending(cmd) => cmd.execute(config, Listing::Pending).await,
        Commands::Public(cmd) => cmd.execute(config, Listing::Public).await,
        Commands::Recent(cmd) => cmd.execute(config, Listing::Recent).await,
        Commands::Show(cmd) => cmd.execute(config).await,
        Commands::Approve(cmd) => cmd.execute(config, Decision::Approve).await,
        Commands::Reject(cmd) => cmd.execute(config, Decision::Reject).await,
        Commands::Summarize(cmd) => cmd.execute(config).await,
        Commands::Knowledge(cmd) => cmd.execute(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_summarize() {
        let cli = Cli::try_parse_from(["askboard", "summarize", "chat.json", "--json"]).unwrap();
        assert_eq!(cli.command.name(), "summarize");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_instrumented_command_runs_on_spawned_task() {
        let dir = TempDir::new().unwrap();
        let chat = dir.path().join("chat.json");
        std::fs::write(&chat, r#"[{"role": "user", "content": "패널 수거 문의"}]"#).unwrap();

        let mut config = AppConfig {
            workspace: dir.path().to_path_buf(),
            provider: "none".to_string(),
            ..AppConfig::default()
        };
        config.llm.active_embedding_provider = "keyword".to_string();
        config.embedding.dimensions = 256;

        let cli = Cli::try_parse_from(["askboard", "summarize", chat.to_str().unwrap()]).unwrap();
        let span = tracing::info_span!("command", name = cli.command.name());

        // Spawning requires the instrumented future to be Send
        let result = tokio::spawn(async move { run(&cli.command, &config).instrument(span).await })
            .await
            .unwrap();
        assert!(result.is_ok());
    }
}
