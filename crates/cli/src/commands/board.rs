//! Board command handlers: conversation log listings and moderation.

use super::print_json;
use askboard_core::{config::AppConfig, AppError, AppResult};
use askboard_knowledge::{LogEntry, QaService};
use clap::Args;

#[derive(Clone, Copy, Debug)]
pub enum Listing {
    /// Escalated questions awaiting review
    Pending,
    /// Answered questions fit for display
    Public,
    /// Everything, newest first
    Recent,
}

/// List conversation log entries
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Maximum number of entries
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListCommand {
    pub async fn execute(&self, config: &AppConfig, listing: Listing) -> AppResult<()> {
        let service = QaService::from_config(config).await?;

        let entries = match listing {
            Listing::Pending => service.list_pending(self.limit).await?,
            Listing::Public => service.list_public(self.limit).await?,
            Listing::Recent => service.list_recent(self.limit).await?,
        };
        tracing::debug!(?listing, count = entries.len(), "Listed log entries");

        if self.json {
            return print_json(&entries);
        }

        if entries.is_empty() {
            println!("No entries.");
            return Ok(());
        }

        for entry in &entries {
            print_summary(entry);
        }
        Ok(())
    }
}

/// Show one conversation log entry
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Log entry id
    pub id: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ShowCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let service = QaService::from_config(config).await?;
        let entry = service
            .get(self.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("log entry {}", self.id)))?;

        if self.json {
            return print_json(&entry);
        }

        print_summary(&entry);
        println!("  asked:    {}", entry.asked_at.to_rfc3339());
        if let Some(answered_at) = entry.answered_at {
            println!("  answered: {}", answered_at.to_rfc3339());
        }
        println!(
            "  score {:.2}, top distance {:.3}",
            entry.confidence_score, entry.top_distance
        );
        if let Some(ref answer) = entry.answer {
            println!("\nAnswer:\n{}", answer);
        }
        if let Some(ref draft) = entry.draft_answer {
            println!("\nDraft:\n{}", draft);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Decision {
    Approve,
    Reject,
}

/// Approve or reject an escalated question
#[derive(Args, Debug)]
pub struct ModerateCommand {
    /// Log entry id
    pub id: u64,

    /// Reviewer answer; approve falls back to the draft when omitted
    #[arg(short, long)]
    pub answer: Option<String>,

    /// Category for the curated document
    #[arg(long, default_value = "")]
    pub category: String,

    /// Tags for the curated document (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ModerateCommand {
    pub async fn execute(&self, config: &AppConfig, decision: Decision) -> AppResult<()> {
        let service = QaService::from_config(config).await?;
        let answer = self.answer.as_deref();

        let outcome = match decision {
            Decision::Approve => {
                service
                    .approve(self.id, answer, &self.category, &self.tags)
                    .await?
            }
            Decision::Reject => {
                service
                    .reject(self.id, answer, &self.category, &self.tags)
                    .await?
            }
        };

        if self.json {
            return print_json(&outcome);
        }

        let verb = match decision {
            Decision::Approve => "Approved",
            Decision::Reject => "Rejected",
        };
        if outcome.curated {
            println!("{} #{}; added to knowledge base.", verb, outcome.log_id);
        } else {
            println!("{} #{}.", verb, outcome.log_id);
        }
        Ok(())
    }
}

fn print_summary(entry: &LogEntry) {
    println!(
        "#{:<4} [{}] {}  {}",
        entry.id,
        entry.approval_status,
        entry.confidence_status,
        entry.question
    );
}
