//! Answer generation from retrieved context.
//!
//! A final answer is always produced: when no client is configured, or the
//! call fails, times out or comes back empty, a context-derived fallback is
//! returned instead. Drafts have no fallback.

use crate::rag::summary::{
    format_conversation, parse_summary, BoardSummary, ConversationTurn, SUMMARY_MAX_CHARS,
};
use crate::types::RetrievedHit;
use askboard_core::config::GenerationSettings;
use askboard_core::{AppConfig, AppError, AppResult};
use askboard_llm::{create_client, LlmClient, LlmRequest};
use askboard_prompt::{
    build_prompt, builtin_prompt, resolve_prompt, PromptDefinition, DRAFT_PROMPT_ID,
    FINAL_PROMPT_ID, SUMMARY_PROMPT_ID,
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Context shown to the model when nothing was retrieved.
pub const EMPTY_CONTEXT: &str = "(컨텍스트 없음)";

const FALLBACK_PREFIX: &str = "(LLM 미연결) 컨텍스트 기반 요약: ";
const FALLBACK_NO_CONTEXT: &str = "(LLM 미연결) 컨텍스트가 부족합니다. 관리자 확인 필요.";
const FALLBACK_SUMMARY_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// Shown to the asker
    Final,
    /// Suggestion for a reviewer
    Draft,
}

/// Prompt definitions used by [`AnswerGenerator`].
#[derive(Debug, Clone)]
pub struct AnswerPrompts {
    pub final_answer: PromptDefinition,
    pub draft: PromptDefinition,
    pub summary: PromptDefinition,
}

impl AnswerPrompts {
    /// The definitions shipped with `askboard-prompt`.
    pub fn builtin() -> AppResult<Self> {
        Ok(Self {
            final_answer: builtin_prompt(FINAL_PROMPT_ID)?,
            draft: builtin_prompt(DRAFT_PROMPT_ID)?,
            summary: builtin_prompt(SUMMARY_PROMPT_ID)?,
        })
    }

    /// Workspace overrides where present, built-ins otherwise.
    pub fn resolve(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            final_answer: resolve_prompt(workspace, FINAL_PROMPT_ID)?,
            draft: resolve_prompt(workspace, DRAFT_PROMPT_ID)?,
            summary: resolve_prompt(workspace, SUMMARY_PROMPT_ID)?,
        })
    }
}

pub struct AnswerGenerator {
    client: Option<Arc<dyn LlmClient>>,
    model: String,
    prompts: AnswerPrompts,
    settings: GenerationSettings,
}

impl AnswerGenerator {
    pub fn new(
        client: Option<Arc<dyn LlmClient>>,
        model: impl Into<String>,
        prompts: AnswerPrompts,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            prompts,
            settings,
        }
    }

    /// Resolve prompts and the generation client from configuration.
    ///
    /// An unusable provider leaves the generator without a client rather
    /// than failing; answers then come from the fallback.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let prompts = AnswerPrompts::resolve(&config.workspace)?;

        let client = build_client(config);
        if client.is_none() {
            tracing::warn!(
                provider = %config.provider,
                "No generation client available; answers will use the context fallback"
            );
        }

        Ok(Self::new(
            client,
            generation_model(config),
            prompts,
            config.generation.clone(),
        ))
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Generate an answer for `question` grounded in `retrieved`.
    ///
    /// `Final` always returns `Some`; `Draft` returns `None` when generation
    /// did not produce text.
    pub async fn generate(
        &self,
        question: &str,
        retrieved: &[RetrievedHit],
        mode: AnswerMode,
    ) -> Option<String> {
        let (definition, configured_temperature) = match mode {
            AnswerMode::Final => (&self.prompts.final_answer, self.settings.temperature),
            AnswerMode::Draft => (&self.prompts.draft, self.settings.draft_temperature),
        };

        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.trim().to_string());
        variables.insert("context".to_string(), build_context(retrieved));

        let generated = match self
            .complete(definition, variables, configured_temperature)
            .await
        {
            Ok(text) => text,
            Err(reason) => {
                tracing::warn!(?mode, %reason, "Answer generation failed");
                None
            }
        };

        match mode {
            AnswerMode::Final => generated.or_else(|| Some(fallback_answer(retrieved))),
            AnswerMode::Draft => generated,
        }
    }

    /// Summarize a conversation into a board post.
    ///
    /// Only an empty conversation is an error. Without a usable reply the
    /// labelled fallback summary is returned.
    pub async fn summarize(&self, conversation: &[ConversationTurn]) -> AppResult<BoardSummary> {
        let transcript = format_conversation(conversation);
        if transcript.is_empty() {
            return Err(AppError::Validation("conversation is empty".to_string()));
        }

        let mut variables = HashMap::new();
        variables.insert("conversation".to_string(), transcript);
        variables.insert("maxChars".to_string(), SUMMARY_MAX_CHARS.to_string());

        let reply = self
            .complete(&self.prompts.summary, variables, self.settings.draft_temperature)
            .await;

        let parsed = match reply {
            Ok(Some(text)) => {
                let parsed = parse_summary(&text);
                if parsed.is_none() {
                    tracing::warn!("Summary reply has no body; using fallback");
                }
                parsed
            }
            Ok(None) => None,
            Err(reason) => {
                tracing::warn!(%reason, "Summary generation failed");
                None
            }
        };

        Ok(parsed.unwrap_or_else(|| BoardSummary::fallback(Utc::now())))
    }

    /// Render `definition` and run it through the client.
    ///
    /// `Ok(None)` means no client is configured.
    async fn complete(
        &self,
        definition: &PromptDefinition,
        variables: HashMap<String, String>,
        configured_temperature: f32,
    ) -> Result<Option<String>, String> {
        let Some(client) = self.client.as_ref() else {
            return Ok(None);
        };

        let built = build_prompt(definition, variables).map_err(|e| e.to_string())?;

        let mut request = LlmRequest::new(built.user, self.model.clone())
            .with_temperature(definition.temperature.unwrap_or(configured_temperature))
            .with_max_tokens(self.settings.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let timeout = Duration::from_secs(self.settings.timeout_secs.max(1));
        let response = tokio::time::timeout(timeout, client.complete(&request))
            .await
            .map_err(|_| format!("timed out after {}s", timeout.as_secs()))?
            .map_err(|e| e.to_string())?;

        let content = response.content.trim();
        if content.is_empty() {
            return Err("empty completion".to_string());
        }

        tracing::debug!(
            provider = client.provider_name(),
            prompt = %definition.id,
            model = %response.model,
            chars = content.chars().count(),
            "Generated text"
        );
        Ok(Some(content.to_string()))
    }
}

/// Number the hits and tag each with its source.
pub fn build_context(retrieved: &[RetrievedHit]) -> String {
    if retrieved.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }

    retrieved
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] ({})\n{}", i + 1, hit.metadata.source, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Answer used when the model is unavailable.
pub fn fallback_answer(retrieved: &[RetrievedHit]) -> String {
    match retrieved.first() {
        Some(top) => {
            let summary: String = top.content.chars().take(FALLBACK_SUMMARY_CHARS).collect();
            format!("{}{}", FALLBACK_PREFIX, summary)
        }
        None => FALLBACK_NO_CONTEXT.to_string(),
    }
}

fn build_client(config: &AppConfig) -> Option<Arc<dyn LlmClient>> {
    if config.provider == "none" {
        return None;
    }

    let endpoint = config
        .get_provider_config(&config.provider)
        .and_then(|p| p.endpoint());
    let api_key = config.resolve_api_key(&config.provider);
    let timeout = Duration::from_secs(config.generation.timeout_secs.max(1));

    match create_client(&config.provider, endpoint, api_key.as_deref(), timeout) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(provider = %config.provider, error = %e, "Cannot create generation client");
            None
        }
    }
}

/// The configured model, unless the provider was switched away from the
/// one whose model it names.
fn generation_model(config: &AppConfig) -> String {
    let active_model = config
        .get_provider_config(&config.llm.active_provider)
        .map(|p| p.model());

    if config.provider != config.llm.active_provider && active_model == Some(config.model.as_str()) {
        if let Some(provider) = config.get_provider_config(&config.provider) {
            return provider.model().to_string();
        }
    }
    config.model.clone()
}

#[cfg(test)]
pub(crate) mod test_support {
    use askboard_core::{AppError, AppResult};
    use askboard_llm::{LlmClient, LlmRequest, LlmResponse};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Client that replays scripted results and records requests.
    #[derive(Default)]
    pub struct ScriptedClient {
        replies: Mutex<VecDeque<AppResult<String>>>,
        pub requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedClient {
        pub fn replying(replies: Vec<AppResult<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Llm("no scripted reply".to_string())));

            reply.map(|content| LlmResponse {
                content,
                model: request.model.clone(),
                usage: Default::default(),
            })
        }
    }

    /// Client that never answers.
    pub struct HangingClient;

    #[async_trait::async_trait]
    impl LlmClient for HangingClient {
        fn provider_name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            std::future::pending().await
        }
    }
}
