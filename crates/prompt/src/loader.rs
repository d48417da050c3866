//! Loading prompt definitions.
//!
//! Built-in definitions ship with the crate; a workspace can replace any of
//! them with `.askboard/prompts/<id>.yml`.

use crate::types::PromptDefinition;
use askboard_core::config::DATA_DIR_NAME;
use askboard_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Prompt used for answers returned to the asker.
pub const FINAL_PROMPT_ID: &str = "answer.final";

/// Prompt used for drafts shown to a reviewer.
pub const DRAFT_PROMPT_ID: &str = "answer.draft";

/// Prompt turning a conversation into a board post.
pub const SUMMARY_PROMPT_ID: &str = "board.summary";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (FINAL_PROMPT_ID, include_str!("../prompts/answer.final.yml")),
    (DRAFT_PROMPT_ID, include_str!("../prompts/answer.draft.yml")),
    (SUMMARY_PROMPT_ID, include_str!("../prompts/board.summary.yml")),
];

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(DATA_DIR_NAME).join("prompts")
}

/// Load a prompt definition from the workspace override directory.
///
/// # Example
/// ```no_run
/// use askboard_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> askboard_core::AppResult<()> {
/// let prompt = load_prompt(Path::new("."), "answer.final")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_prompt(&contents)
        .map_err(|e| AppError::Prompt(format!("{:?}: {}", prompt_file, e)))?;

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// The definition shipped with the crate for `prompt_id`.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let (_, source) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown built-in prompt: {}", prompt_id)))?;

    parse_prompt(source)
}

/// Workspace override if present, otherwise the built-in definition.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let override_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));
    if override_file.exists() {
        load_prompt(workspace_path, prompt_id)
    } else {
        builtin_prompt(prompt_id)
    }
}

/// List prompt ids overridden in the workspace, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn parse_prompt(contents: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML: {}", e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.trim().is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt {} has an empty template",
            def.id
        )));
    }

    if def.max_sentences == 0 {
        return Err(AppError::Prompt(format!(
            "Prompt {} must allow at least one sentence",
            def.id
        )));
    }

    Ok(())
}
