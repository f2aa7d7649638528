//! Ask command handler.
//!
//! Answers a single question against the configured knowledge source.

use clap::Args;
use pitlane_core::{config::AppConfig, AppError, AppResult};
use pitlane_dialogue::{Assistant, ChatRequest, ChatResponse};

use super::terminal_context;

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Session id to continue (default: derived from this terminal)
    #[arg(long)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let assistant = Assistant::from_config(config)?;
        assistant.init().await;

        let mut request = ChatRequest::new(self.question.clone());
        request.session_id = self.session.clone();

        let result = assistant.handle(request, &terminal_context()).await;
        assistant.shutdown();

        match result {
            Ok(response) => self.print_response(&response),
            Err(e) => {
                if self.json {
                    let body = serde_json::to_string_pretty(&e.to_body())?;
                    println!("{}", body);
                }
                Err(e)
            }
        }
    }

    fn print_response(&self, response: &ChatResponse) -> AppResult<()> {
        if self.json {
            let json = serde_json::to_string_pretty(response)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        println!("{}", response.response);
        if !response.sources.is_empty() {
            println!();
            println!("Sources:");
            for source in &response.sources {
                println!("  - {} ({})", source.id, source.url);
            }
        }
        tracing::debug!("Session: {}", response.session_id);

        Ok(())
    }
}
