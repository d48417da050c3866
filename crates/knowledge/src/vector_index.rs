//! Vector index abstraction.
//!
//! Documents are keyed by an opaque id and searched by cosine distance
//! (`1 - cos`, never negative). Implementations are synchronous; async
//! callers run them on the blocking pool.

use crate::types::{Document, DocumentMetadata, RetrievedHit};
use askboard_core::{AppError, AppResult};
use std::collections::HashSet;

/// Trait for vector index backends.
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored embedding must have.
    fn dimensions(&self) -> usize;

    /// Insert a batch of documents and return their ids.
    ///
    /// Missing metadata defaults to [`DocumentMetadata::default`]; missing
    /// ids are generated as UUIDv4. The whole batch is validated before
    /// anything is written and is written atomically.
    fn add(
        &self,
        contents: &[String],
        metadatas: Option<&[DocumentMetadata]>,
        embeddings: &[Vec<f32>],
        ids: Option<&[String]>,
    ) -> AppResult<Vec<String>>;

    /// The `k` nearest documents, ascending by distance.
    fn query(&self, embedding: &[f32], k: usize) -> AppResult<Vec<RetrievedHit>>;

    /// Curated documents, newest first.
    fn list_curated(&self, limit: usize) -> AppResult<Vec<Document>>;

    /// Number of stored documents.
    fn count(&self) -> AppResult<usize>;

    /// Number of curated documents.
    fn count_curated(&self) -> AppResult<usize>;

    /// Remove every document.
    fn reset(&self) -> AppResult<()>;
}

/// Check an `add` batch and resolve its ids.
///
/// Rejects empty batches, length mismatches, wrong embedding dimensions and
/// ids repeated within the batch. Existing-id conflicts are the backend's
/// concern.
pub fn validate_batch(
    dimensions: usize,
    contents: &[String],
    metadatas: Option<&[DocumentMetadata]>,
    embeddings: &[Vec<f32>],
    ids: Option<&[String]>,
) -> AppResult<Vec<String>> {
    if contents.is_empty() {
        return Err(AppError::Validation("contents is empty".to_string()));
    }

    if embeddings.len() != contents.len() {
        return Err(AppError::Validation(format!(
            "embeddings length ({}) does not match contents length ({})",
            embeddings.len(),
            contents.len()
        )));
    }

    if let Some(metadatas) = metadatas {
        if metadatas.len() != contents.len() {
            return Err(AppError::Validation(format!(
                "metadatas length ({}) does not match contents length ({})",
                metadatas.len(),
                contents.len()
            )));
        }
    }

    if let Some((i, embedding)) = embeddings
        .iter()
        .enumerate()
        .find(|(_, e)| e.len() != dimensions)
    {
        return Err(AppError::Validation(format!(
            "embedding {} has dimension {}, expected {}",
            i,
            embedding.len(),
            dimensions
        )));
    }

    let ids: Vec<String> = match ids {
        Some(ids) => {
            if ids.len() != contents.len() {
                return Err(AppError::Validation(format!(
                    "ids length ({}) does not match contents length ({})",
                    ids.len(),
                    contents.len()
                )));
            }
            if let Some(blank) = ids.iter().position(|id| id.trim().is_empty()) {
                return Err(AppError::Validation(format!("id {} is blank", blank)));
            }
            ids.to_vec()
        }
        None => contents
            .iter()
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect(),
    };

    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(AppError::Validation(format!("duplicate document id: {}", dup)));
    }

    Ok(ids)
}

/// Cosine distance `1 - cos(a, b)`, clamped to `[0, 2]`.
///
/// A zero vector or mismatched lengths give distance 1 (orthogonal).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 1.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    (1.0 - dot_product / (norm_a * norm_b)).clamp(0.0, 2.0)
}
