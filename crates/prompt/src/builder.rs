//! Renders instruction templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, InstructionDefinition};
use handlebars::Handlebars;
use pitlane_core::{AppError, AppResult};
use std::collections::HashMap;

/// Render the system and user templates of `definition`.
///
/// Directives are rendered first with the same variables and exposed to the
/// user template as `directives`, one per line.
pub fn build_prompt(
    definition: &InstructionDefinition,
    mut variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut handlebars = Handlebars::new();
    // Prompts are plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    let directives = definition
        .directives
        .iter()
        .map(|d| render(&mut handlebars, d, &variables).map(|line| format!("- {}", line.trim())))
        .collect::<AppResult<Vec<_>>>()?
        .join("\n");
    variables.insert("directives".to_string(), directives);

    let system = render(&mut handlebars, &definition.system, &variables)?;
    let user = render(&mut handlebars, &definition.user, &variables)?;

    Ok(BuiltPrompt {
        system: system.trim().to_string(),
        user: user.trim().to_string(),
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
        },
    })
}

fn render(
    handlebars: &mut Handlebars<'_>,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
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
    use crate::loader::default_instructions;
    use crate::types::OutputSpec;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_without_escaping() {
        let def = InstructionDefinition {
            id: "t".to_string(),
            title: "t".to_string(),
            api_version: "1.0".to_string(),
            created_by: String::new(),
            system: "Site: {{siteName}}".to_string(),
            user: "{{query}}\n{{directives}}".to_string(),
            directives: vec!["Use {{currencySymbol}}".to_string(), "Be brief".to_string()],
            output: OutputSpec {
                format: "markdown".to_string(),
            },
        };

        let built = build_prompt(
            &def,
            vars(&[
                ("siteName", "Karts & Co"),
                ("query", "<b>price?</b>"),
                ("currencySymbol", "£"),
            ]),
        )
        .unwrap();

        assert_eq!(built.system, "Site: Karts & Co");
        assert_eq!(built.user, "<b>price?</b>\n- Use £\n- Be brief");
        assert_eq!(built.metadata.source_prompt_id, "t");
    }

    #[test]
    fn test_default_template_slots() {
        let def = default_instructions().unwrap();

        let with_slots = build_prompt(
            &def,
            vars(&[
                ("siteName", "Apex Karting"),
                ("track", "Mile End"),
                ("day", "Saturday"),
                ("query", "prices?"),
                ("context", "[1] Prices"),
            ]),
        )
        .unwrap();
        assert!(with_slots.system.contains("Mile End track"));
        assert!(with_slots.system.contains("Saturday"));
        assert!(with_slots.user.contains("Question: prices?"));
        assert!(with_slots.user.contains("[1] Prices"));

        let without = build_prompt(&def, vars(&[("siteName", "Apex Karting"), ("query", "hi")]))
            .unwrap();
        assert!(!without.system.contains("track."));
    }

    #[test]
    fn test_bad_template_is_prompt_error() {
        let mut def = default_instructions().unwrap();
        def.system = "{{#if}}".to_string();
        let result = build_prompt(&def, HashMap::new());
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
