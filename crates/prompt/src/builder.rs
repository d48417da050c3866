//! Rendering prompt definitions.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use askboard_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Render `definition` with the given template variables.
///
/// `maxSentences` is injected from the definition unless the caller sets it.
///
/// # Example
/// ```no_run
/// use askboard_prompt::{build_prompt, builtin_prompt, FINAL_PROMPT_ID};
/// use std::collections::HashMap;
///
/// # fn example() -> askboard_core::AppResult<()> {
/// let def = builtin_prompt(FINAL_PROMPT_ID)?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "폐패널 수거 절차는?".to_string());
/// vars.insert("context".to_string(), "(컨텍스트 없음)".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    mut variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    variables
        .entry("maxSentences".to_string())
        .or_insert_with(|| definition.max_sentences.to_string());

    let user = render_template(&definition.template, &variables)?;
    let system = Some(definition.system.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            resolved_variables: variables,
        },
    })
}

fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{builtin_prompt, DRAFT_PROMPT_ID, FINAL_PROMPT_ID};

    fn vars(question: &str, context: &str) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context.to_string());
        vars
    }

    #[test]
    fn test_render_without_escaping() {
        let rendered = render_template("Q: {{question}}", &vars("A & B <c>", "")).unwrap();
        assert_eq!(rendered, "Q: A & B <c>");
    }

    #[test]
    fn test_final_prompt_sections() {
        let def = builtin_prompt(FINAL_PROMPT_ID).unwrap();
        let built = build_prompt(&def, vars("패널 교체 주기는?", "[1] (seed)\nQ: ...")).unwrap();

        assert!(built.user.starts_with("[컨텍스트]\n[1] (seed)"));
        assert!(built.user.contains("[질문]\n패널 교체 주기는?"));
        assert!(built.user.contains("5문장 이내"));
        assert!(built.system.is_some());
        assert_eq!(built.metadata.source_prompt_id, FINAL_PROMPT_ID);
    }

    #[test]
    fn test_draft_prompt_sentence_cap() {
        let def = builtin_prompt(DRAFT_PROMPT_ID).unwrap();
        let built = build_prompt(&def, vars("q", "c")).unwrap();
        assert!(built.user.contains("6문장 이내"));
    }

    #[test]
    fn test_caller_can_override_max_sentences() {
        let def = builtin_prompt(FINAL_PROMPT_ID).unwrap();
        let mut variables = vars("q", "c");
        variables.insert("maxSentences".to_string(), "3".to_string());

        let built = build_prompt(&def, variables).unwrap();
        assert!(built.user.contains("3문장 이내"));
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let rendered = render_template("Question: {{missing}}", &HashMap::new()).unwrap();
        assert_eq!(rendered, "Question: ");
    }
}
