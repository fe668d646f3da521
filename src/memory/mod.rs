// src/memory/mod.rs

//! Conversation memory: sessions, messages, context, preferences, insights.

mod service;
mod store;
mod types;

pub use service::ConversationMemory;
pub use store::{ConversationStore, InMemoryConversationStore};
pub use types::{
    ContextEntry, ConversationInsights, ConversationSummary, DecisionStage, Message, PriceRange,
    Role, Session, SessionHistory, SessionStatus, ToolUsage, UserPreferences,
};
