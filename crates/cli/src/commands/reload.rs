//! Reload command handler.

use clap::Args;
use pitlane_core::{config::AppConfig, AppResult};
use pitlane_dialogue::Assistant;
use pitlane_knowledge::LoadOutcome;

/// Force a fresh load of the knowledge source
#[derive(Args, Debug)]
pub struct ReloadCommand {
    /// Admin token (must match PITLANE_ADMIN_TOKEN)
    #[arg(long)]
    pub token: Option<String>,
}

impl ReloadCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing reload command");

        let assistant = Assistant::from_config(config)?;
        let outcome = assistant.reload(self.token.as_deref()).await?;
        let status = assistant.status();

        match outcome {
            LoadOutcome::Changed => println!("Reloaded: {} chunks", status.chunk_count),
            LoadOutcome::Unchanged => println!("Reload superseded by a newer load"),
        }

        Ok(())
    }
}
