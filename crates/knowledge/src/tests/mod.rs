//! Cross-module tests for the ask and moderation flows.


use crate::embeddings::test_support::FixedProvider;
use crate::embeddings::{EmbeddingChain, EmbeddingProvider, KeywordProvider};
use crate::rag::answer::test_support::ScriptedClient;
use crate::rag::{AnswerGenerator, AnswerPrompts};
use crate::service::{QaService, ServiceParts};
use crate::sqlite_index::SqliteIndex;
use crate::types::DocumentMetadata;
use crate::vector_index::VectorIndex;
use crate::ConversationLog;
use askboard_core::config::GenerationSettings;
use askboard_core::{AppResult, GateSettings};
use askboard_llm::LlmClient;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Every question embeds to this vector.
pub(crate) const QUERY_VECTOR: [f32; 2] = [1.0, 0.0];

/// Stored at distance 0.40 from [`QUERY_VECTOR`].
pub(crate) const NEAR_VECTOR: [f32; 2] = [0.6, 0.8];

pub(crate) struct Harness {
    _dir: TempDir,
    pub index: Arc<SqliteIndex>,
    pub log: Arc<ConversationLog>,
    pub service: QaService,
}

impl Harness {
    /// Service over a 2-dimensional in-memory index whose embedder maps
    /// every text to [`QUERY_VECTOR`].
    pub fn new(client: Option<Arc<ScriptedClient>>) -> Self {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(SqliteIndex::open_in_memory(2).unwrap());
        let log = Arc::new(ConversationLog::new(dir.path().join("logs.json")));

        let service = QaService::new(ServiceParts {
            embedder: Arc::new(fixed_embedder()),
            index: Arc::clone(&index) as Arc<dyn VectorIndex>,
            generator: Arc::new(generator(client.map(|c| c as Arc<dyn LlmClient>))),
            log: Arc::clone(&log),
            gate: GateSettings::default(),
            io_timeout: Duration::from_secs(5),
        });

        Self {
            _dir: dir,
            index,
            log,
            service,
        }
    }

    /// Store a document with an explicit embedding.
    pub fn store(&self, content: &str, embedding: &[f32], metadata: DocumentMetadata) -> AppResult<Vec<String>> {
        self.index.add(
            &[content.to_string()],
            Some(std::slice::from_ref(&metadata)),
            &[embedding.to_vec()],
            None,
        )
    }
}

fn fixed_embedder() -> EmbeddingChain {
    let ranked: Vec<Arc<dyn EmbeddingProvider>> = vec![Arc::new(FixedProvider {
        vector: QUERY_VECTOR.to_vec(),
    })];
    let keywords = GateSettings::default().allowed_keywords;
    EmbeddingChain::new(ranked, KeywordProvider::new(2, &keywords), 2, 8)
}

pub(crate) fn generator(client: Option<Arc<dyn LlmClient>>) -> AnswerGenerator {
    AnswerGenerator::new(
        client,
        "test-model",
        AnswerPrompts::builtin().unwrap(),
        GenerationSettings::default(),
    )
}
