//! Ask command handler.

use super::print_json;
use askboard_core::{config::AppConfig, AppResult};
use askboard_knowledge::QaService;
use clap::Args;

/// Ask a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::debug!("Ask command options: {:?}", self);

        let service = QaService::from_config(config).await?;
        let response = service.ask(&self.question).await?;

        if self.json {
            return print_json(&response);
        }

        println!("{}", response.answer);
        println!();
        println!(
            "[{}] confidence {:.2}, top distance {:.3}{}",
            response.confidence_status,
            response.confidence_score,
            response.top_distance,
            response
                .log_id
                .map(|id| format!(", log #{}", id))
                .unwrap_or_default()
        );

        if !response.retrieved.is_empty() {
            println!();
            println!("Context:");
            for (i, hit) in response.retrieved.iter().enumerate() {
                let preview: String = hit.content.chars().take(80).collect();
                println!(
                    "  {}. ({}, {:.3}) {}",
                    i + 1,
                    hit.metadata.source,
                    hit.distance,
                    preview.replace('\n', " ")
                );
            }
        }

        Ok(())
    }
}
