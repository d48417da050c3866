//! Prompt templates for askboard answer generation and board summaries.
//!
//! - YAML prompt definitions, built-in or overridden per workspace
//! - Handlebars rendering with `question`, `context` and `maxSentences`

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use loader::{
    builtin_prompt, list_prompts, load_prompt, resolve_prompt, DRAFT_PROMPT_ID, FINAL_PROMPT_ID,
    SUMMARY_PROMPT_ID,
};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
