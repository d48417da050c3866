//! Embedding provider implementations.

pub mod keyword;
pub mod ollama;
pub mod openai;

pub use keyword::KeywordProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
