//! Provider-agnostic completion clients for askboard.
//!
//! # Providers
//! - **OpenAI** (and compatible servers): `/v1/chat/completions`
//! - **Ollama**: local runtime, `/api/generate`
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use askboard_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> askboard_core::AppResult<()> {
//! let client = create_client("ollama", None, None, Duration::from_secs(20))?;
//! let request = LlmRequest::new("What is EPR?", "llama3.2").with_temperature(0.1);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
