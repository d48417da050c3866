//! Prompt definitions and rendered prompts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier (e.g., "answer.final")
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Schema version
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,

    /// System message sent alongside the rendered template
    #[serde(default)]
    pub system: String,

    /// Handlebars template for the user message
    pub template: String,

    /// Overrides the configured temperature when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Sentence cap exposed to the template as `maxSentences`
    #[serde(rename = "maxSentences", default = "default_max_sentences")]
    pub max_sentences: u32,
}

fn default_api_version() -> String {
    "1.0".to_string()
}

fn default_max_sentences() -> u32 {
    5
}

/// A rendered prompt ready for an LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message, absent when the definition has none
    pub system: Option<String>,

    /// Rendered user message
    pub user: String,

    pub metadata: BuiltPromptMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_defaults() {
        let yaml = r#"
id: answer.custom
title: Custom
template: "{{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.api_version, "1.0");
        assert_eq!(def.max_sentences, 5);
        assert!(def.system.is_empty());
        assert_eq!(def.temperature, None);
    }

    #[test]
    fn test_prompt_definition_full() {
        let yaml = r#"
id: answer.draft
title: Draft
apiVersion: "1.1"
system: reviewer
temperature: 0.3
maxSentences: 6
template: "{{context}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.api_version, "1.1");
        assert_eq!(def.temperature, Some(0.3));
        assert_eq!(def.max_sentences, 6);
    }
}
