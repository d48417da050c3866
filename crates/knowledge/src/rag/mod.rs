//! Retrieval-augmented answering.
//!
//! The pipeline retrieves context, applies the confidence gate, records the
//! question and then either answers it or escalates it with a reviewer draft.
//! Conversations can also be summarized into board posts.

pub mod answer;
pub mod pipeline;
pub mod summary;
pub mod types;

pub use answer::{AnswerGenerator, AnswerMode, AnswerPrompts};
pub use pipeline::QaPipeline;
pub use summary::{BoardSummary, ConversationTurn};
pub use types::AskResponse;
