//! Instruction loading.
//!
//! A custom definition can be supplied as a YAML file; otherwise the
//! definition compiled into the binary is used.

use crate::types::InstructionDefinition;
use pitlane_core::{AppError, AppResult};
use std::path::Path;

const DEFAULT_INSTRUCTIONS: &str = include_str!("../prompts/assistant.yaml");

/// Load instructions from `path`, or the built-in default when `None`.
///
/// # Errors
/// `SourceSync` if the file cannot be read, `Prompt` if it does not parse
/// or fails validation.
pub fn load_instructions(path: Option<&Path>) -> AppResult<InstructionDefinition> {
    let Some(path) = path else {
        return default_instructions();
    };

    tracing::debug!("Loading instructions from: {:?}", path);

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::SourceSync(format!("Failed to read instructions {:?}: {}", path, e))
    })?;

    let definition = parse_instructions(&contents)?;
    tracing::info!("Loaded instructions: {} ({})", definition.id, definition.title);
    Ok(definition)
}

/// The built-in instruction definition.
pub fn default_instructions() -> AppResult<InstructionDefinition> {
    parse_instructions(DEFAULT_INSTRUCTIONS)
}

/// Parse and validate a YAML definition.
pub fn parse_instructions(yaml: &str) -> AppResult<InstructionDefinition> {
    let definition: InstructionDefinition = serde_yaml::from_str(yaml)
        .map_err(|e| AppError::Prompt(format!("Failed to parse instructions YAML: {}", e)))?;

    validate_definition(&definition)?;
    Ok(definition)
}

fn validate_definition(def: &InstructionDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Instruction ID cannot be empty".to_string()));
    }

    if def.system.trim().is_empty() || def.user.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Instructions '{}' need both a system and a user template",
            def.id
        )));
    }

    if !def.user.contains("{{query}}") {
        return Err(AppError::Prompt(format!(
            "Instructions '{}' user template must reference {{{{query}}}}",
            def.id
        )));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = r#"
id: custom.answer
title: Custom
apiVersion: "1.0"
system: "Help for {{siteName}}"
user: "Q: {{query}}"
output:
  format: text
"#;

    #[test]
    fn test_default_instructions_parse() {
        let def = default_instructions().unwrap();
        assert_eq!(def.id, "assistant.answer.default");
        assert!(!def.directives.is_empty());
        assert!(def.user.contains("{{context}}"));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, VALID).unwrap();

        let def = load_instructions(Some(&path)).unwrap();
        assert_eq!(def.id, "custom.answer");
    }

    #[test]
    fn test_load_missing_file_is_source_error() {
        let result = load_instructions(Some(Path::new("/nonexistent/prompt.yaml")));
        assert!(matches!(result, Err(AppError::SourceSync(_))));
    }

    #[test]
    fn test_user_template_needs_query() {
        let yaml = VALID.replace("Q: {{query}}", "Q: nothing");
        let err = parse_instructions(&yaml).unwrap_err();
        assert!(err.to_string().contains("{{query}}"));
    }

    #[test]
    fn test_invalid_api_version() {
        let yaml = VALID.replace("\"1.0\"", "\"1\"");
        assert!(matches!(parse_instructions(&yaml), Err(AppError::Prompt(_))));
    }
}
