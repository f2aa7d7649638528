//! Status command handler.

use clap::Args;
use pitlane_core::{config::AppConfig, AppResult};
use pitlane_dialogue::Assistant;

/// Load the knowledge source once and report what was loaded
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let assistant = Assistant::from_config(config)?;
        assistant.init().await;
        let status = assistant.status();
        assistant.shutdown();

        let source = config.knowledge.source.as_deref().unwrap_or_default();

        if self.json {
            let output = serde_json::json!({
                "loaded": status.loaded,
                "chunkCount": status.chunk_count,
                "source": source,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if status.loaded {
            println!("Loaded {} chunks from {}", status.chunk_count, source);
        } else {
            println!("Not loaded: {} could not be read", source);
        }

        Ok(())
    }
}
