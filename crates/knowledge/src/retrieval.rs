//! Embedding plus vector search behind one async interface.

use crate::embeddings::EmbeddingChain;
use crate::types::{Document, DocumentMetadata, RetrievedHit};
use crate::vector_index::VectorIndex;
use askboard_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Runs the synchronous index on the blocking pool with a deadline.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<EmbeddingChain>,
    index: Arc<dyn VectorIndex>,
    io_timeout: Duration,
}

impl Retriever {
    pub fn new(
        embedder: Arc<EmbeddingChain>,
        index: Arc<dyn VectorIndex>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            io_timeout,
        }
    }

    pub fn embedder(&self) -> &EmbeddingChain {
        &self.embedder
    }

    /// The `k` nearest documents to `question`, ascending by distance.
    pub async fn retrieve(&self, question: &str, k: usize) -> AppResult<Vec<RetrievedHit>> {
        let embedding = self.embedder.embed_one(question).await;

        let hits = self
            .run_blocking("query", move |index| index.query(&embedding, k))
            .await?;

        tracing::debug!(
            hits = hits.len(),
            top_distance = hits.first().map(|h| h.distance),
            "Retrieved context"
        );
        Ok(hits)
    }

    /// Embed and store documents; returns their ids.
    pub async fn add_documents(
        &self,
        contents: Vec<String>,
        metadatas: Option<Vec<DocumentMetadata>>,
        ids: Option<Vec<String>>,
    ) -> AppResult<Vec<String>> {
        if contents.is_empty() {
            return Err(AppError::Validation("contents is empty".to_string()));
        }

        let embeddings = self.embedder.embed(&contents).await;

        let ids = self
            .run_blocking("add", move |index| {
                index.add(
                    &contents,
                    metadatas.as_deref(),
                    &embeddings,
                    ids.as_deref(),
                )
            })
            .await?;

        tracing::info!(count = ids.len(), "Added documents to index");
        Ok(ids)
    }

    pub async fn list_curated(&self, limit: usize) -> AppResult<Vec<Document>> {
        self.run_blocking("list_curated", move |index| index.list_curated(limit))
            .await
    }

    pub async fn count(&self) -> AppResult<usize> {
        self.run_blocking("count", |index| index.count()).await
    }

    pub async fn count_curated(&self) -> AppResult<usize> {
        self.run_blocking("count_curated", |index| index.count_curated())
            .await
    }

    /// Remove every document, curated ones included.
    pub async fn reset(&self) -> AppResult<()> {
        self.run_blocking("reset", |index| index.reset()).await
    }

    async fn run_blocking<T, F>(&self, op: &'static str, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn VectorIndex) -> AppResult<T> + Send + 'static,
    {
        let index = Arc::clone(&self.index);
        let task = tokio::task::spawn_blocking(move || f(index.as_ref()));

        match tokio::time::timeout(self.io_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AppError::Knowledge(format!(
                "Index {} task failed: {}",
                op, join_error
            ))),
            Err(_) => Err(AppError::Knowledge(format!(
                "Index {} timed out after {}s",
                op,
                self.io_timeout.as_secs()
            ))),
        }
    }
}
