//! Application service wiring every component together.

use crate::conversation::{ConversationLog, LogCounts};
use crate::embeddings::EmbeddingChain;
use crate::moderation::{ModerationOutcome, Moderator};
use crate::rag::{AnswerGenerator, AskResponse, BoardSummary, ConversationTurn, QaPipeline};
use crate::retrieval::Retriever;
use crate::seed::{seed_from_file, SeedStats};
use crate::sqlite_index::SqliteIndex;
use crate::types::{CuratedQa, DocumentSource, LogEntry};
use crate::vector_index::VectorIndex;
use askboard_core::{AppConfig, AppError, AppResult, GateSettings};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const WARMUP_PROBE: &str = "태양광 패널 재활용";

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub documents: usize,
    pub curated: usize,
    pub embedding_provider: String,
    pub log: LogCounts,
}

/// Parts a [`QaService`] is assembled from.
pub struct ServiceParts {
    pub embedder: Arc<EmbeddingChain>,
    pub index: Arc<dyn VectorIndex>,
    pub generator: Arc<AnswerGenerator>,
    pub log: Arc<ConversationLog>,
    pub gate: GateSettings,
    pub io_timeout: Duration,
}

pub struct QaService {
    retriever: Retriever,
    generator: Arc<AnswerGenerator>,
    log: Arc<ConversationLog>,
    pipeline: QaPipeline,
    moderator: Moderator,
}

impl QaService {
    pub fn new(parts: ServiceParts) -> Self {
        let retriever = Retriever::new(parts.embedder, parts.index, parts.io_timeout);
        let pipeline = QaPipeline::new(
            retriever.clone(),
            Arc::clone(&parts.generator),
            Arc::clone(&parts.log),
            parts.gate,
        );
        let moderator = Moderator::new(Arc::clone(&parts.log), retriever.clone());

        Self {
            retriever,
            generator: parts.generator,
            log: parts.log,
            pipeline,
            moderator,
        }
    }

    /// Open the workspace stores and build providers from configuration.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.ensure_data_dir()?;

        let index_path = config.index_path();
        let dimensions = config.embedding.dimensions;
        let index = tokio::task::spawn_blocking(move || SqliteIndex::open(&index_path, dimensions))
            .await
            .map_err(|e| AppError::Knowledge(format!("Index open task failed: {}", e)))??;

        let embedder = EmbeddingChain::from_config(config).await?;

        Ok(Self::new(ServiceParts {
            embedder: Arc::new(embedder),
            index: Arc::new(index),
            generator: Arc::new(AnswerGenerator::from_config(config)?),
            log: Arc::new(ConversationLog::new(config.log_path())),
            gate: config.gate.clone(),
            io_timeout: Duration::from_secs(config.storage.index_timeout_secs.max(1)),
        }))
    }

    pub async fn ask(&self, question: &str) -> AppResult<AskResponse> {
        self.pipeline.ask(question).await
    }

    pub async fn approve(
        &self,
        log_id: u64,
        answer: Option<&str>,
        category: &str,
        tags: &[String],
    ) -> AppResult<ModerationOutcome> {
        self.moderator.approve(log_id, answer, category, tags).await
    }

    pub async fn reject(
        &self,
        log_id: u64,
        answer: Option<&str>,
        category: &str,
        tags: &[String],
    ) -> AppResult<ModerationOutcome> {
        self.moderator.reject(log_id, answer, category, tags).await
    }

    pub async fn add_feedback(
        &self,
        question: &str,
        answer: &str,
        category: &str,
        source: DocumentSource,
        tags: &[String],
    ) -> AppResult<String> {
        self.moderator
            .add_feedback(question, answer, category, source, tags)
            .await
    }

    /// Turn a conversation into a board post title and body.
    pub async fn summarize(&self, conversation: &[ConversationTurn]) -> AppResult<BoardSummary> {
        self.generator.summarize(conversation).await
    }

    pub async fn list_pending(&self, limit: usize) -> AppResult<Vec<LogEntry>> {
        self.log.pending(limit).await
    }

    pub async fn list_public(&self, limit: usize) -> AppResult<Vec<LogEntry>> {
        self.log.public(limit).await
    }

    pub async fn list_recent(&self, limit: usize) -> AppResult<Vec<LogEntry>> {
        self.log.recent(limit).await
    }

    pub async fn get(&self, log_id: u64) -> AppResult<Option<LogEntry>> {
        self.log.get(log_id).await
    }

    pub async fn list_curated(&self, limit: usize) -> AppResult<Vec<CuratedQa>> {
        Ok(self
            .retriever
            .list_curated(limit)
            .await?
            .iter()
            .map(CuratedQa::from_document)
            .collect())
    }

    pub async fn seed(&self, path: &Path) -> AppResult<SeedStats> {
        seed_from_file(&self.retriever, path).await
    }

    pub async fn reset_index(&self) -> AppResult<()> {
        self.retriever.reset().await
    }

    pub async fn stats(&self) -> AppResult<ServiceStats> {
        Ok(ServiceStats {
            documents: self.retriever.count().await?,
            curated: self.retriever.count_curated().await?,
            embedding_provider: self.retriever.embedder().primary_provider().to_string(),
            log: self.log.counts().await?,
        })
    }

    /// Embed a probe string and report the provider expected to serve
    /// requests.
    pub async fn warmup(&self) -> String {
        let embedder = self.retriever.embedder();
        let vector = embedder.embed_one(WARMUP_PROBE).await;
        let provider = embedder.primary_provider().to_string();
        tracing::info!(%provider, dimensions = vector.len(), "Warmup complete");
        provider
    }
}
