//! Instruction templates and answer post-processing.
//!
//! - YAML instruction definitions (built-in default or a custom file)
//! - Handlebars rendering of the system message and final user turn
//! - Ordered text transforms for generated replies

pub mod builder;
pub mod loader;
pub mod postprocess;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{default_instructions, load_instructions, parse_instructions};
pub use postprocess::{Pipeline, Transform};
pub use types::{BuiltPrompt, BuiltPromptMetadata, InstructionDefinition, OutputSpec};
