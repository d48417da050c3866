//! Summarize command handler.

use super::print_json;
use askboard_core::{config::AppConfig, AppError, AppResult};
use askboard_knowledge::{ConversationTurn, QaService};
use clap::Args;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Summarize a conversation into a board post
#[derive(Args, Debug)]
pub struct SummarizeCommand {
    /// JSON file with an array of {"role", "content"} messages ("-" for stdin)
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SummarizeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let raw = if self.file.as_os_str() == "-" {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        } else {
            tokio::fs::read_to_string(&self.file).await?
        };

        let conversation: Vec<ConversationTurn> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Validation(format!("{:?} is not a JSON array of messages: {}", self.file, e))
        })?;
        tracing::debug!(messages = conversation.len(), "Read conversation");

        let service = QaService::from_config(config).await?;
        let summary = service.summarize(&conversation).await?;

        if self.json {
            return print_json(&summary);
        }

        println!("{}", summary.title);
        println!();
        println!("{}", summary.body);
        Ok(())
    }
}
