//! Loader for workspace template overrides.
//!
//! A workspace may replace a built-in template by placing `<id>.yml` in
//! `.docent/prompts/`.

use crate::types::{PromptDefinition, TEMPLATE_IDS, UNGROUNDED_TEMPLATE_ID};
use serde::Serialize;
use docent_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".docent/prompts")
}

/// Load a prompt definition by id, `Ok(None)` when no override exists.
///
/// # Example
/// ```no_run
/// use docent_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// if let Some(def) = load_prompt(Path::new("."), "answer.grounded")? {
///     println!("Override: {}", def.title);
/// }
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<Option<PromptDefinition>> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        return Ok(None);
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(Some(definition))
}

/// List the ids of all override files in the workspace.
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

/// Which templates a workspace overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplateInventory {
    /// Template ids replaced by a workspace file
    pub overridden: Vec<String>,

    /// Template ids rendered from the built-in text
    pub builtin: Vec<String>,

    /// Override files whose id names no template; never loaded
    pub unused: Vec<String>,
}

/// Sort the workspace's override files against the known template ids.
pub fn template_inventory(workspace_path: &Path) -> AppResult<TemplateInventory> {
    let files = list_prompts(workspace_path)?;
    let mut inventory = TemplateInventory::default();

    for id in TEMPLATE_IDS {
        if files.iter().any(|f| f == id) {
            inventory.overridden.push(id.to_string());
        } else {
            inventory.builtin.push(id.to_string());
        }
    }

    inventory.unused = files
        .into_iter()
        .filter(|f| !TEMPLATE_IDS.contains(&f.as_str()))
        .collect();

    Ok(inventory)
}

/// Validate a prompt definition.
pub(crate) fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // No marker is valid without sources
    if def.id == UNGROUNDED_TEMPLATE_ID && def.template.contains("[Source") {
        return Err(AppError::Prompt(format!(
            "Template '{}' must not contain citation markers",
            def.id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, file_id: &str, body: &str) {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join(format!("{}.yml", file_id)), body).unwrap();
    }

    fn definition_yaml(id: &str, template: &str) -> String {
        format!(
            "id: {}\ntitle: Override\napiVersion: \"1.0\"\ntemplate: {:?}\n",
            id, template
        )
    }

    #[test]
    fn test_missing_override_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(load_prompt(temp.path(), "answer.grounded").unwrap().is_none());
    }

    #[test]
    fn test_load_valid_override() {
        let temp = TempDir::new().unwrap();
        write_prompt(
            temp.path(),
            "answer.grounded",
            &definition_yaml("answer.grounded", "Q: {{question}}"),
        );

        let def = load_prompt(temp.path(), "answer.grounded").unwrap().unwrap();
        assert_eq!(def.template, "Q: {{question}}");
    }

    #[test]
    fn test_id_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        write_prompt(
            temp.path(),
            "answer.grounded",
            &definition_yaml("answer.other", "Q: {{question}}"),
        );
        assert!(load_prompt(temp.path(), "answer.grounded").is_err());
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let temp = TempDir::new().unwrap();
        write_prompt(temp.path(), "answer.grounded", "invalid: yaml: content:");
        assert!(load_prompt(temp.path(), "answer.grounded").is_err());
    }

    #[test]
    fn test_ungrounded_override_with_marker_rejected() {
        let temp = TempDir::new().unwrap();
        write_prompt(
            temp.path(),
            "answer.ungrounded",
            &definition_yaml("answer.ungrounded", "Cite [Source 1] for {{question}}"),
        );
        match load_prompt(temp.path(), "answer.ungrounded") {
            Err(AppError::Prompt(msg)) => assert!(msg.contains("citation markers")),
            other => panic!("expected prompt error, got {:?}", other),
        }
    }

    #[test]
    fn test_list_prompts() {
        let temp = TempDir::new().unwrap();
        write_prompt(temp.path(), "answer.ungrounded", "x");
        write_prompt(temp.path(), "answer.grounded", "x");

        let prompts = list_prompts(temp.path()).unwrap();
        assert_eq!(prompts, vec!["answer.grounded", "answer.ungrounded"]);
    }

    #[test]
    fn test_inventory_separates_unknown_files() {
        let temp = TempDir::new().unwrap();
        write_prompt(temp.path(), "answer.grounded", "x");
        write_prompt(temp.path(), "answer.summary", "x");
        fs::write(prompts_dir(temp.path()).join("notes.txt"), "x").unwrap();

        let inventory = template_inventory(temp.path()).unwrap();
        assert_eq!(inventory.overridden, vec!["answer.grounded"]);
        assert_eq!(inventory.builtin, vec!["answer.ungrounded"]);
        assert_eq!(inventory.unused, vec!["answer.summary"]);
    }

    #[test]
    fn test_inventory_without_prompts_dir() {
        let temp = TempDir::new().unwrap();
        let inventory = template_inventory(temp.path()).unwrap();
        assert!(inventory.overridden.is_empty());
        assert_eq!(inventory.builtin.len(), 2);
        assert!(inventory.unused.is_empty());
    }
}
