//! Command handlers for the askboard CLI.

pub mod ask;
pub mod board;
pub mod knowledge;
pub mod summarize;

pub use ask::AskCommand;
pub use board::{Decision, ListCommand, Listing, ModerateCommand, ShowCommand};
pub use knowledge::KnowledgeCommand;
pub use summarize::SummarizeCommand;

use askboard_core::AppResult;
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
