//! Knowledge base and question answering for askboard.
//!
//! Questions are answered from a local SQLite vector index when the
//! retrieved context is close enough and on topic; otherwise they are
//! escalated to a review board. Reviewer answers flow back into the index.
//!
//! [`QaService`] is the entry point; it owns the embedding chain, the index,
//! the answer generator and the conversation log.

pub mod conversation;
pub mod embeddings;
pub mod gate;
pub mod moderation;
pub mod rag;
pub mod retrieval;
pub mod seed;
pub mod service;
pub mod sqlite_index;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use conversation::{ConversationLog, LogCounts};
pub use embeddings::{EmbeddingChain, EmbeddingProvider};
pub use gate::GateDecision;
pub use moderation::ModerationOutcome;
pub use rag::{AnswerMode, AnswerPrompts, AskResponse, BoardSummary, ConversationTurn};
pub use seed::SeedStats;
pub use service::{QaService, ServiceParts, ServiceStats};
pub use sqlite_index::SqliteIndex;
pub use types::{
    ApprovalStatus, ConfidenceStatus, CuratedQa, Document, DocumentMetadata, DocumentSource,
    LogEntry, RetrievedHit,
};
pub use vector_index::VectorIndex;
