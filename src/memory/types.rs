// src/memory/types.rs

//! Conversation memory entities: sessions, messages, context entries, and the
//! derived preference/insight views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Closed,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Closed => "closed",
            SessionStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub status: SessionStatus,
    pub message_count: u32,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Option<String>, metadata: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            status: SessionStatus::Active,
            message_count: 0,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One append-only log entry. Assistant messages carry the tool names that
/// ran that turn plus any citations surfaced in the reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<String>,
    pub citations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Versioned context snapshot. Entries are never mutated; the effective
/// context is the oldest-first fold with last-write-wins per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    pub context_type: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<u32>,
    pub max: u32,
    pub budget: u32,
}

/// Preferences distilled from the user's messages only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub brands: Vec<String>,
    pub price_range: Option<PriceRange>,
    pub use_cases: Vec<String>,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStage {
    Exploration,
    Comparison,
    Decision,
}

impl DecisionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStage::Exploration => "exploration",
            DecisionStage::Comparison => "comparison",
            DecisionStage::Decision => "decision",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolUsage {
    pub total_calls: u32,
    pub tools_used: HashMap<String, u32>,
    pub most_used_tool: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub duration_minutes: f64,
    pub topics: Vec<String>,
    pub tools_used: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SessionHistory {
    pub session: Option<Session>,
    pub messages: Vec<Message>,
    pub context: Map<String, Value>,
    pub summary: Option<ConversationSummary>,
}

impl SessionHistory {
    pub fn empty() -> Self {
        Self {
            session: None,
            messages: Vec::new(),
            context: Map::new(),
            summary: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationInsights {
    pub preferences: UserPreferences,
    pub conversation_length: usize,
    pub user_engagement: usize,
    pub tool_usage: ToolUsage,
    pub topics_discussed: Vec<String>,
    pub decision_stage: DecisionStage,
    pub next_actions: Vec<String>,
}
