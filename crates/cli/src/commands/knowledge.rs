//! Knowledge command handler.
//!
//! Seeding, direct curation and inspection of the vector index.

use super::print_json;
use askboard_core::{config::AppConfig, AppError, AppResult};
use askboard_knowledge::{DocumentSource, QaService};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Load reference Q&A pairs from a JSON Lines file
    Seed(KnowledgeSeedCommand),
    /// Add a reviewed Q&A pair directly
    Feedback(KnowledgeFeedbackCommand),
    /// List curated Q&A pairs
    Curated(KnowledgeCuratedCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
    /// Remove every document from the index
    Reset(KnowledgeResetCommand),
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let service = QaService::from_config(config).await?;

        match &self.action {
            KnowledgeAction::Seed(cmd) => cmd.execute(&service).await,
            KnowledgeAction::Feedback(cmd) => cmd.execute(&service).await,
            KnowledgeAction::Curated(cmd) => cmd.execute(&service).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(&service).await,
            KnowledgeAction::Reset(cmd) => cmd.execute(&service).await,
        }
    }
}

/// Load a seed file
#[derive(Args, Debug)]
pub struct KnowledgeSeedCommand {
    /// JSON Lines file with question/answer rows
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSeedCommand {
    pub async fn execute(&self, service: &QaService) -> AppResult<()> {
        tracing::info!("Seeding knowledge base from {:?}", self.file);

        let stats = service.seed(&self.file).await?;

        if self.json {
            return print_json(&stats);
        }
        println!(
            "Loaded {} documents ({} rows skipped)",
            stats.loaded, stats.skipped
        );
        Ok(())
    }
}

/// Add a curated Q&A pair
#[derive(Args, Debug)]
pub struct KnowledgeFeedbackCommand {
    #[arg(short, long)]
    pub question: String,

    #[arg(short, long)]
    pub answer: String,

    #[arg(long, default_value = "")]
    pub category: String,

    /// Document source (admin_approved, admin_written, seed)
    #[arg(short, long, default_value = "admin_written")]
    pub source: String,

    /// Tags (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

impl KnowledgeFeedbackCommand {
    pub async fn execute(&self, service: &QaService) -> AppResult<()> {
        let source = DocumentSource::parse(&self.source).ok_or_else(|| {
            AppError::Validation(format!(
                "Unknown source: {}. Supported: seed, admin_approved, admin_written",
                self.source
            ))
        })?;

        let id = service
            .add_feedback(&self.question, &self.answer, &self.category, source, &self.tags)
            .await?;

        println!("Added document {}", id);
        Ok(())
    }
}

/// List curated pairs
#[derive(Args, Debug)]
pub struct KnowledgeCuratedCommand {
    /// Maximum number of pairs
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeCuratedCommand {
    pub async fn execute(&self, service: &QaService) -> AppResult<()> {
        let curated = service.list_curated(self.limit).await?;

        if self.json {
            return print_json(&curated);
        }

        if curated.is_empty() {
            println!("No curated documents.");
            return Ok(());
        }

        for qa in &curated {
            println!(
                "[{}] {} ({})",
                qa.metadata.source,
                qa.question,
                qa.metadata.category
            );
            println!("    {}", qa.answer);
        }
        Ok(())
    }
}

/// Show statistics
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, service: &QaService) -> AppResult<()> {
        let stats = service.stats().await?;

        if self.json {
            return print_json(&stats);
        }

        println!("Documents:          {}", stats.documents);
        println!("Curated documents:  {}", stats.curated);
        println!("Embedding provider: {}", stats.embedding_provider);
        println!(
            "Questions:          {} ({} answered automatically)",
            stats.log.total, stats.log.answerable
        );
        println!(
            "Review:             {} pending, {} approved, {} rejected",
            stats.log.pending, stats.log.approved, stats.log.rejected
        );
        Ok(())
    }
}

/// Clear the index
#[derive(Args, Debug)]
pub struct KnowledgeResetCommand {
    /// Confirm removal, curated documents included
    #[arg(long)]
    pub yes: bool,
}

impl KnowledgeResetCommand {
    pub async fn execute(&self, service: &QaService) -> AppResult<()> {
        if !self.yes {
            return Err(AppError::Validation(
                "Refusing to reset without --yes; curated answers would be lost".to_string(),
            ));
        }

        service.reset_index().await?;
        println!("Index cleared. The conversation log was kept.");
        Ok(())
    }
}
