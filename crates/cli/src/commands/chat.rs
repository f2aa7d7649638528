//! Chat command handler.
//!
//! Interactive multi-turn conversation on stdin. Knowledge refresh and
//! session sweeping run in the background for the life of the loop.

use clap::Args;
use pitlane_core::{config::AppConfig, AppResult};
use pitlane_dialogue::{Assistant, ChatRequest};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::terminal_context;

/// Start an interactive conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Session id (default: a fresh random id)
    #[arg(long)]
    pub session: Option<String>,

    /// Hide source links under answers
    #[arg(long)]
    pub no_sources: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let assistant = Assistant::from_config(config)?;
        assistant.init().await;

        let session_id = self
            .session
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::debug!("Chat session: {}", session_id);

        println!("Ask a question. Type /status for knowledge status, /quit to leave.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };
            let line = line.trim();

            match line {
                "" => continue,
                "/quit" | "/exit" => break,
                "/status" => {
                    let status = assistant.status();
                    println!("loaded: {}, chunks: {}", status.loaded, status.chunk_count);
                    continue;
                }
                _ => {}
            }

            let request = ChatRequest::new(line).with_session(session_id.clone());
            match assistant.handle(request, &terminal_context()).await {
                Ok(response) => {
                    println!("{}", response.response);
                    if !self.no_sources && !response.sources.is_empty() {
                        let urls: Vec<&str> =
                            response.sources.iter().map(|s| s.url.as_str()).collect();
                        println!("  [{}]", urls.join(", "));
                    }
                }
                Err(e) => {
                    tracing::error!("Turn failed: {}", e);
                    eprintln!("{}", e.public_message());
                }
            }
        }

        assistant.shutdown();
        Ok(())
    }
}
