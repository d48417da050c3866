//! Bulk loading of reference Q&A pairs from a JSON Lines file.
//!
//! Each line is an object `{"question", "answer", "category"?, "tags"?}`;
//! `tags` may be a list or a comma separated string. Rows missing a
//! question or an answer are skipped.

use crate::retrieval::Retriever;
use crate::types::{qa_content, DocumentMetadata, DocumentSource};
use askboard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRow {
    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub answer: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Option<SeedTags>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SeedTags {
    List(Vec<String>),
    Joined(String),
}

impl SeedTags {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(tags) => tags,
            Self::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedStats {
    pub loaded: usize,
    pub skipped: usize,
}

/// Parse seed rows, skipping blank lines and rows without both parts.
///
/// A line that is not a JSON object is an error naming its line number.
pub fn parse_seed(contents: &str) -> AppResult<(Vec<SeedRow>, usize)> {
    let mut rows = Vec::new();
    let mut skipped = 0;

    for (n, line) in contents.lines().enumerate() {
        let line = line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() {
            continue;
        }

        let row: SeedRow = serde_json::from_str(line).map_err(|e| {
            AppError::Validation(format!("seed line {}: {}", n + 1, e))
        })?;

        if row.question.trim().is_empty() || row.answer.trim().is_empty() {
            skipped += 1;
            continue;
        }
        rows.push(row);
    }

    Ok((rows, skipped))
}

/// Load a seed file into the index with ids `seed-0`, `seed-1`, …
pub async fn seed_from_file(retriever: &Retriever, path: &Path) -> AppResult<SeedStats> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Knowledge(format!("Failed to read seed file {}: {}", path.display(), e))
    })?;

    let (rows, skipped) = parse_seed(&contents)?;
    if rows.is_empty() {
        return Err(AppError::Validation(format!(
            "{} has no rows with both a question and an answer",
            path.display()
        )));
    }

    let mut contents = Vec::with_capacity(rows.len());
    let mut metadatas = Vec::with_capacity(rows.len());
    for row in rows {
        contents.push(qa_content(&row.question, &row.answer));

        let tags = row.tags.map(SeedTags::into_vec).unwrap_or_default();
        let mut metadata = DocumentMetadata::new(
            DocumentSource::Seed,
            row.category.as_deref().unwrap_or_default(),
            &tags,
        );
        metadata.extra.insert("lang".to_string(), "ko".to_string());
        metadatas.push(metadata);
    }
    let ids = (0..contents.len()).map(|i| format!("seed-{}", i)).collect();

    let loaded = retriever
        .add_documents(contents, Some(metadatas), Some(ids))
        .await?
        .len();

    tracing::info!(loaded, skipped, file = %path.display(), "Seeded knowledge base");
    Ok(SeedStats { loaded, skipped })
}
