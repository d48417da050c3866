//! Deterministic keyword/trigram embedding provider.
//!
//! The last link of the embedding chain. It never touches the network and
//! never fails: vectors are built from word and character trigram hashes,
//! with configured domain keywords weighted up, then normalized to unit
//! length.

use crate::embeddings::provider::EmbeddingProvider;
use askboard_core::AppResult;
use std::collections::{HashMap, HashSet};

/// Extra weight for each occurrence of a domain keyword
const KEYWORD_WEIGHT: f32 = 2.0;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how",
];

#[derive(Debug, Clone)]
pub struct KeywordProvider {
    dimensions: usize,
    keywords: Vec<String>,
}

impl KeywordProvider {
    pub fn new(dimensions: usize, keywords: &[String]) -> Self {
        Self {
            dimensions: dimensions.max(1),
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text. Text with no usable tokens yields a zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 2 && !stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = self.bucket(&trigram, 37);
                embedding[idx] += (*freq as f32).sqrt();
            }

            let idx = self.bucket(word, 31);
            embedding[idx] += *freq as f32;
        }

        // Keywords match as substrings so attached particles still count
        for keyword in &self.keywords {
            let hits = lower.matches(keyword.as_str()).count();
            if hits > 0 {
                let idx = self.bucket(&format!("kw:{}", keyword), 41);
                embedding[idx] += KEYWORD_WEIGHT * hits as f32;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    pub fn embed_texts(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }

    fn bucket(&self, token: &str, multiplier: u64) -> usize {
        let hash = token
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64));
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn provider_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-trigram-v1"
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(self.embed_texts(texts))
    }
}
