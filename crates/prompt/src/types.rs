//! Instruction definition types.

use serde::{Deserialize, Serialize};

/// Instructions for the answer generator, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionDefinition {
    /// Unique identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Handlebars template for the system message
    pub system: String,

    /// Handlebars template for the final user turn
    pub user: String,

    /// Output rules; each is a template rendered with the same variables
    #[serde(default)]
    pub directives: Vec<String>,

    pub output: OutputSpec,
}

/// Output specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Output format (e.g., "markdown", "text")
    pub format: String,
}

/// Rendered system and user text, ready to be wrapped into messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
    pub metadata: BuiltPromptMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_deserialization() {
        let yaml = r#"
id: test.answer
title: Test
apiVersion: "1.0"
system: "You help {{siteName}}."
user: "{{query}}"
directives:
  - "Prices in {{currencySymbol}}"
output:
  format: markdown
"#;

        let def: InstructionDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.answer");
        assert_eq!(def.directives.len(), 1);
        assert_eq!(def.created_by, "");
        assert_eq!(def.output.format, "markdown");
    }
}
