//! Embedding provider fallback chain.
//!
//! Providers are ranked once, at construction:
//! 1. remote OpenAI-compatible API, when an API key resolves
//! 2. local Ollama runtime, when it answers a probe
//! 3. deterministic keyword provider, always
//!
//! A call never fails. Each batch goes to the highest-ranked provider; a
//! provider that errors (after its own retries) hands that batch to the
//! next one, and the keyword provider ends the chain. Every vector is fitted
//! to the index dimension.

pub mod provider;
pub mod providers;

pub use provider::EmbeddingProvider;
pub use providers::{KeywordProvider, OllamaProvider, OpenAiProvider};

use askboard_core::config::ProviderConfig;
use askboard_core::{AppConfig, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Ranked embedding providers behind one infallible `embed`.
#[derive(Debug, Clone)]
pub struct EmbeddingChain {
    providers: Vec<Arc<dyn EmbeddingProvider>>,
    fallback: KeywordProvider,
    dimensions: usize,
    batch_size: usize,
}

impl EmbeddingChain {
    /// Build a chain from explicitly ranked providers.
    ///
    /// The keyword provider is appended as the final link.
    pub fn new(
        providers: Vec<Arc<dyn EmbeddingProvider>>,
        fallback: KeywordProvider,
        dimensions: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            providers,
            fallback,
            dimensions: dimensions.max(1),
            batch_size: batch_size.max(1),
        }
    }

    /// A chain with only the keyword provider.
    pub fn keyword_only(dimensions: usize, keywords: &[String]) -> Self {
        Self::new(
            Vec::new(),
            KeywordProvider::new(dimensions, keywords),
            dimensions,
            usize::MAX,
        )
    }

    /// Rank providers from configuration, probing the local runtime.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let settings = &config.embedding;
        let timeout = Duration::from_secs(settings.timeout_secs);
        let active = config.llm.active_embedding_provider.as_str();
        let mut providers: Vec<Arc<dyn EmbeddingProvider>> = Vec::new();

        if active == "openai" {
            match (
                config.get_provider_config("openai"),
                config.resolve_api_key("openai"),
            ) {
                (
                    Some(ProviderConfig::OpenAI {
                        embedding_model,
                        endpoint,
                        ..
                    }),
                    Some(api_key),
                ) => {
                    let model = embedding_model
                        .as_deref()
                        .unwrap_or("text-embedding-3-small");
                    providers.push(Arc::new(OpenAiProvider::new(
                        endpoint.as_deref(),
                        api_key,
                        model,
                        timeout,
                        settings.max_retries,
                    )?));
                }
                (_, None) => {
                    tracing::info!("No OpenAI API key resolved; remote embeddings disabled")
                }
                _ => tracing::warn!("Provider 'openai' is not an OpenAI-style provider entry"),
            }
        }

        if active != "keyword" && settings.local_enabled {
            if let Some(ProviderConfig::Ollama {
                endpoint,
                embedding_model,
                ..
            }) = config.get_provider_config("ollama")
            {
                let model = embedding_model.as_deref().unwrap_or("nomic-embed-text");
                let local = OllamaProvider::new(endpoint, model, timeout, settings.max_retries)?;
                if local.probe().await {
                    providers.push(Arc::new(local));
                } else {
                    tracing::info!("Ollama not reachable at {}; local embeddings disabled", endpoint);
                }
            }
        }

        let chain = Self::new(
            providers,
            KeywordProvider::new(settings.dimensions, &config.gate.allowed_keywords),
            settings.dimensions,
            settings.batch_size,
        );

        tracing::info!(
            providers = ?chain.provider_names(),
            dimensions = chain.dimensions,
            "Embedding chain ready"
        );

        Ok(chain)
    }

    /// Dimension of every returned vector.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Provider names in rank order, keyword last.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|p| p.provider_name().to_string())
            .chain(std::iter::once(self.fallback.provider_name().to_string()))
            .collect()
    }

    /// The highest-ranked provider.
    pub fn primary_provider(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.provider_name())
            .unwrap_or_else(|| self.fallback.provider_name())
    }

    /// Embed texts; output length and order match the input.
    pub async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut out = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embed_batch_with_fallback(batch).await;
            out.extend(
                vectors
                    .into_iter()
                    .map(|v| fit_dimensions(v, self.dimensions)),
            );
        }

        out
    }

    /// Embed one text.
    pub async fn embed_one(&self, text: &str) -> Vec<f32> {
        self.embed(&[text.to_string()])
            .await
            .pop()
            .unwrap_or_else(|| vec![0.0; self.dimensions])
    }

    async fn embed_batch_with_fallback(&self, batch: &[String]) -> Vec<Vec<f32>> {
        for provider in &self.providers {
            match provider.embed_batch(batch).await {
                Ok(vectors) if vectors.len() == batch.len() => {
                    tracing::debug!(
                        provider = provider.provider_name(),
                        count = batch.len(),
                        "Embedded batch"
                    );
                    return vectors;
                }
                Ok(vectors) => tracing::warn!(
                    provider = provider.provider_name(),
                    "Provider returned {} vectors for {} texts; falling back",
                    vectors.len(),
                    batch.len()
                ),
                Err(e) => tracing::warn!(
                    provider = provider.provider_name(),
                    "Embedding failed, falling back: {}",
                    e
                ),
            }
        }

        self.fallback.embed_texts(batch)
    }
}

/// Zero-pad or truncate a vector to `dimensions`.
pub fn fit_dimensions(mut vector: Vec<f32>, dimensions: usize) -> Vec<f32> {
    vector.resize(dimensions, 0.0);
    vector
}


#[cfg(test)]
mod tests {
    use super::test_support::{FailingProvider, FixedProvider};
    use super::*;
    use std::sync::atomic::Ordering;

    fn keywords() -> Vec<String> {
        vec!["패널".to_string(), "재활용".to_string()]
    }

    #[test]
    fn test_fit_dimensions() {
        assert_eq!(fit_dimensions(vec![1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(fit_dimensions(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_dimensions(Vec::new(), 3), vec![0.0; 3]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let chain = EmbeddingChain::keyword_only(64, &keywords());
        assert!(chain.embed(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_providers_degrade_to_keyword() {
        let failing = Arc::new(FailingProvider::default());
        let ranked: Vec<Arc<dyn EmbeddingProvider>> =
            vec![failing.clone(), Arc::new(FailingProvider::default())];
        let chain = EmbeddingChain::new(
            ranked,
            KeywordProvider::new(64, &keywords()),
            64,
            2,
        );

        let texts: Vec<String> = vec!["패널 재활용".into(), "수거".into(), "EPR".into()];
        let vectors = chain.embed(&texts).await;

        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 64));
        assert_eq!(vectors[0], KeywordProvider::new(64, &keywords()).embed_text("패널 재활용"));
        // Two batches of size 2 and 1
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_primary_output_is_fitted() {
        let ranked: Vec<Arc<dyn EmbeddingProvider>> = vec![Arc::new(FixedProvider {
            vector: vec![0.5; 10],
        })];
        let chain = EmbeddingChain::new(
            ranked,
            KeywordProvider::new(16, &keywords()),
            16,
            8,
        );

        let vectors = chain.embed(&["a".to_string()]).await;
        assert_eq!(vectors[0].len(), 16);
        assert_eq!(&vectors[0][..10], &[0.5; 10]);
        assert!(vectors[0][10..].iter().all(|&x| x == 0.0));
        assert_eq!(chain.primary_provider(), "fixed");
    }

    #[tokio::test]
    async fn test_keyword_is_always_last() {
        let ranked: Vec<Arc<dyn EmbeddingProvider>> = vec![Arc::new(FailingProvider::default())];
        let chain = EmbeddingChain::new(
            ranked,
            KeywordProvider::new(8, &keywords()),
            8,
            8,
        );
        assert_eq!(chain.provider_names(), vec!["failing", "keyword"]);
        assert_eq!(
            EmbeddingChain::keyword_only(8, &[]).primary_provider(),
            "keyword"
        );
    }

    #[tokio::test]
    async fn test_from_config_without_key_or_runtime() {
        let mut config = AppConfig::default();
        config.llm.active_embedding_provider = "keyword".to_string();
        config.embedding.dimensions = 32;

        let chain = EmbeddingChain::from_config(&config).await.unwrap();
        assert_eq!(chain.provider_names(), vec!["keyword"]);
        assert_eq!(chain.embed_one("패널").await.len(), 32);
    }
}
