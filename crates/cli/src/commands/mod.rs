//! Command handlers for the Pitlane CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod reload;
pub mod status;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use reload::ReloadCommand;
pub use status::StatusCommand;

use pitlane_dialogue::RequestContext;

/// Request context for turns typed at this terminal.
pub(crate) fn terminal_context() -> RequestContext {
    RequestContext {
        client_addr: Some("local".to_string()),
        user_agent: Some(format!("pitlane-cli/{}", env!("CARGO_PKG_VERSION"))),
    }
}
