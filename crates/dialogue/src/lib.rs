//! Conversation handling for the Pitlane assistant.
//!
//! - Sessions with slot memory and idle expiry
//! - Topic classification and the slot-filling policy
//! - Retrieval-grounded answer composition
//! - The [`Assistant`] service tying it together

pub mod assistant;
pub mod composer;
pub mod policy;
pub mod session;
pub mod topic;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export main types
pub use assistant::Assistant;
pub use composer::{Answer, AnswerComposer};
pub use policy::{DialoguePolicy, Route, SlotState};
pub use session::{Session, SessionStore, Slots, Turn};
pub use topic::{KeywordSet, Topic, TopicClassifier};
pub use types::{ChatRequest, ChatResponse, RequestContext, SourceRef};
