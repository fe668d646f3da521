// src/memory/service.rs

//! Conversation memory service: session lifecycle, message log, versioned
//! context, preference extraction, and conversation insights.
//!
//! Session id handling is deliberately lenient at the edges: a malformed id
//! in `add_message` returns `Ok(None)` and in the read paths yields empty
//! results, so a client holding a stale or garbage id degrades to a fresh
//! conversation instead of an error page.

use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AssistantError;

use super::store::ConversationStore;
use super::types::{
    ContextEntry, ConversationInsights, ConversationSummary, DecisionStage, Message, PriceRange,
    Role, Session, SessionHistory, SessionStatus, ToolUsage, UserPreferences,
};

static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$?(\d{3,4})").unwrap());

const TOPIC_VOCABULARY: &[&str] = &[
    "price", "budget", "performance", "gaming", "business", "programming",
    "battery", "display", "memory", "storage", "processor", "graphics",
    "portability", "weight", "design", "build quality", "keyboard",
    "touchscreen", "fingerprint", "security", "warranty", "support",
];

const EXPLORATION_WORDS: &[&str] = &["what", "how", "tell me", "options", "available", "types"];
const COMPARISON_WORDS: &[&str] = &["compare", "vs", "versus", "difference", "better", "which"];
const DECISION_WORDS: &[&str] = &["buy", "purchase", "price", "cost", "order", "want", "need"];

pub struct ConversationMemory {
    store: Arc<dyn ConversationStore>,
}

impl ConversationMemory {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn create_session(
        &self,
        user_id: Option<String>,
        initial_context: Option<Map<String, Value>>,
    ) -> Result<Session, AssistantError> {
        let session = Session::new(user_id, initial_context.clone().unwrap_or_default());
        self.store
            .insert_session(session.clone())
            .await
            .map_err(AssistantError::Store)?;

        if let Some(context) = initial_context {
            self.store
                .insert_context(ContextEntry {
                    id: Uuid::new_v4(),
                    session_id: session.id,
                    context_type: "initial_context".to_string(),
                    data: context,
                    created_at: Utc::now(),
                })
                .await
                .map_err(AssistantError::Store)?;
        }

        tracing::info!(target: "memory", session_id = %session.id, "created session");
        Ok(session)
    }

    /// Resolve the caller's session id, creating a fresh session when the id
    /// is missing, malformed, or unknown.
    pub async fn get_or_create(&self, session_id: Option<&str>) -> Result<Session, AssistantError> {
        if let Some(id) = session_id.and_then(|s| Uuid::parse_str(s).ok()) {
            if let Some(session) = self.store.get_session(id).await.map_err(AssistantError::Store)? {
                return Ok(session);
            }
        }
        self.create_session(None, None).await
    }

    /// Append a message. Malformed session ids are ignored (`Ok(None)`);
    /// well-formed ids for sessions that don't exist are an error.
    pub async fn add_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        tool_calls: Vec<String>,
        citations: Vec<String>,
    ) -> Result<Option<Message>, AssistantError> {
        let Ok(id) = Uuid::parse_str(session_id) else {
            tracing::debug!(target: "memory", session_id, "skipping message for malformed session id");
            return Ok(None);
        };

        if self
            .store
            .get_session(id)
            .await
            .map_err(AssistantError::Store)?
            .is_none()
        {
            return Err(AssistantError::SessionNotFound(id));
        }

        let message = Message {
            id: Uuid::new_v4(),
            session_id: id,
            role,
            content: content.to_string(),
            tool_calls,
            citations,
            created_at: Utc::now(),
        };
        self.store
            .insert_message(message.clone())
            .await
            .map_err(AssistantError::Store)?;
        Ok(Some(message))
    }

    pub async fn get_session_history(
        &self,
        session_id: &str,
        limit: usize,
        include_context: bool,
    ) -> Result<SessionHistory, AssistantError> {
        let Ok(id) = Uuid::parse_str(session_id) else {
            return Ok(SessionHistory::empty());
        };
        let Some(session) = self.store.get_session(id).await.map_err(AssistantError::Store)? else {
            return Err(AssistantError::SessionNotFound(id));
        };

        let messages = self
            .store
            .messages_for_session(id, limit)
            .await
            .map_err(AssistantError::Store)?;
        let context = if include_context {
            self.get_session_context(session_id).await?
        } else {
            Map::new()
        };
        let summary = Some(summarize(&messages));

        Ok(SessionHistory { session: Some(session), messages, context, summary })
    }

    /// Effective context: fold all entries oldest-first, later writes win.
    pub async fn get_session_context(
        &self,
        session_id: &str,
    ) -> Result<Map<String, Value>, AssistantError> {
        let Ok(id) = Uuid::parse_str(session_id) else {
            return Ok(Map::new());
        };

        let entries = self
            .store
            .context_for_session(id)
            .await
            .map_err(AssistantError::Store)?;
        let mut merged = Map::new();
        for entry in entries {
            for (key, value) in entry.data {
                merged.insert(key, value);
            }
        }
        Ok(merged)
    }

    /// Store a new context version. Merge mode folds the new data over the
    /// existing context first, so the stored entry is self-contained.
    pub async fn update_context(
        &self,
        session_id: &str,
        context_type: &str,
        data: Map<String, Value>,
        merge_with_existing: bool,
    ) -> bool {
        let result: Result<(), AssistantError> = async {
            let id = Uuid::parse_str(session_id)
                .map_err(|e| AssistantError::Store(anyhow::anyhow!(e)))?;
            let final_data = if merge_with_existing {
                let mut existing = self.get_session_context(session_id).await?;
                existing.extend(data);
                existing
            } else {
                data
            };
            self.store
                .insert_context(ContextEntry {
                    id: Uuid::new_v4(),
                    session_id: id,
                    context_type: context_type.to_string(),
                    data: final_data,
                    created_at: Utc::now(),
                })
                .await
                .map_err(AssistantError::Store)
        }
        .await;

        if let Err(err) = &result {
            tracing::error!(target: "memory", session_id, error = %err, "failed to update context");
        }
        result.is_ok()
    }

    /// Distill preferences from the user's own messages. Assistant output is
    /// excluded so the assistant cannot teach itself preferences.
    pub async fn extract_user_preferences(
        &self,
        session_id: &str,
    ) -> Result<UserPreferences, AssistantError> {
        let Ok(id) = Uuid::parse_str(session_id) else {
            return Ok(UserPreferences::default());
        };
        let messages = self
            .store
            .messages_for_session(id, usize::MAX)
            .await
            .map_err(AssistantError::Store)?;

        let mut preferences = UserPreferences::default();
        for message in messages.iter().filter(|m| m.role == Role::User) {
            let lower = message.content.to_lowercase();

            if (lower.contains("hp") || lower.contains("hewlett"))
                && !preferences.brands.iter().any(|b| b == "HP")
            {
                preferences.brands.push("HP".to_string());
            }
            if (lower.contains("lenovo") || lower.contains("thinkpad"))
                && !preferences.brands.iter().any(|b| b == "Lenovo")
            {
                preferences.brands.push("Lenovo".to_string());
            }

            for use_case in ["business", "gaming", "programming", "student", "travel"] {
                if lower.contains(use_case) && !preferences.use_cases.iter().any(|u| u == use_case) {
                    preferences.use_cases.push(use_case.to_string());
                }
            }

            // Space-insensitive so "backlit keyboard" matches "backlitkeyboard".
            let squashed = lower.replace(' ', "");
            for feature in ["touchscreen", "fingerprint", "backlit keyboard", "lightweight", "long battery"]
            {
                if squashed.contains(&feature.replace(' ', ""))
                    && !preferences.features.iter().any(|f| f == feature)
                {
                    preferences.features.push(feature.to_string());
                }
            }

            let prices: Vec<u32> = PRICE_RE
                .captures_iter(&lower)
                .filter_map(|c| c[1].parse().ok())
                .collect();
            if let (Some(&min), Some(&max)) = (prices.iter().min(), prices.iter().max()) {
                preferences.price_range = Some(PriceRange {
                    min: (prices.len() > 1).then_some(min),
                    max,
                    budget: max,
                });
            }
        }

        Ok(preferences)
    }

    pub async fn get_conversation_insights(
        &self,
        session_id: &str,
    ) -> Result<ConversationInsights, AssistantError> {
        let history = self.get_session_history(session_id, 50, true).await?;
        let preferences = self.extract_user_preferences(session_id).await?;

        let user_messages: Vec<&Message> = history
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .collect();

        let decision_stage = analyze_decision_stage(&history.messages);
        let next_actions = suggest_next_actions(decision_stage, &preferences);

        Ok(ConversationInsights {
            conversation_length: history.messages.len(),
            user_engagement: user_messages.len(),
            tool_usage: analyze_tool_usage(&history.messages),
            topics_discussed: extract_topics(user_messages.iter().map(|m| m.content.as_str())),
            decision_stage,
            next_actions,
            preferences,
        })
    }

    pub async fn close_session(&self, session_id: &str, reason: &str) -> bool {
        let Ok(id) = Uuid::parse_str(session_id) else {
            return false;
        };
        let Ok(Some(mut session)) = self.store.get_session(id).await else {
            return false;
        };

        session.status = SessionStatus::Closed;
        session
            .metadata
            .insert("close_reason".to_string(), Value::String(reason.to_string()));
        session.metadata.insert(
            "closed_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        self.store.update_session(session).await.is_ok()
    }

    /// Remove non-active sessions untouched for `days_to_keep` days. Active
    /// sessions are never reaped regardless of age.
    pub async fn cleanup_old_sessions(&self, days_to_keep: i64) -> Result<usize, AssistantError> {
        let cutoff = Utc::now() - Duration::days(days_to_keep);
        let deleted = self
            .store
            .delete_stale_sessions(cutoff)
            .await
            .map_err(AssistantError::Store)?;
        tracing::info!(target: "memory", deleted, "cleaned up old sessions");
        Ok(deleted)
    }
}

fn summarize(messages: &[Message]) -> ConversationSummary {
    let user: Vec<&Message> = messages.iter().filter(|m| m.role == Role::User).collect();
    let assistant: Vec<&Message> = messages.iter().filter(|m| m.role == Role::Assistant).collect();

    let duration_minutes = match (messages.first(), messages.last()) {
        (Some(first), Some(last)) if messages.len() > 1 => {
            (last.created_at - first.created_at).num_seconds() as f64 / 60.0
        }
        _ => 0.0,
    };

    let mut tools: Vec<String> = assistant
        .iter()
        .flat_map(|m| m.tool_calls.iter().cloned())
        .collect();
    tools.sort();
    tools.dedup();

    ConversationSummary {
        total_messages: messages.len(),
        user_messages: user.len(),
        assistant_messages: assistant.len(),
        duration_minutes,
        topics: extract_topics(user.iter().map(|m| m.content.as_str())),
        tools_used: tools,
    }
}

fn analyze_tool_usage(messages: &[Message]) -> ToolUsage {
    let mut tools_used: HashMap<String, u32> = HashMap::new();
    let mut total_calls = 0u32;

    for message in messages {
        for tool in &message.tool_calls {
            *tools_used.entry(tool.clone()).or_insert(0) += 1;
            total_calls += 1;
        }
    }

    let most_used_tool = tools_used
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(name, _)| name.clone());

    ToolUsage { total_calls, tools_used, most_used_tool }
}

fn extract_topics<'a>(messages: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut topics = Vec::new();
    for content in messages {
        let lower = content.to_lowercase();
        for topic in TOPIC_VOCABULARY {
            if lower.contains(topic) && !topics.iter().any(|t| t == topic) {
                topics.push(topic.to_string());
            }
        }
    }
    topics
}

/// Stage heuristic over the last three user messages. Short conversations
/// default to exploration.
fn analyze_decision_stage(messages: &[Message]) -> DecisionStage {
    if messages.len() < 2 {
        return DecisionStage::Exploration;
    }

    let user_messages: Vec<String> = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.to_lowercase())
        .collect();
    let recent = if user_messages.len() >= 3 {
        &user_messages[user_messages.len() - 3..]
    } else {
        &user_messages[..]
    };

    let score = |words: &[&str]| -> usize {
        recent
            .iter()
            .map(|msg| words.iter().filter(|w| msg.contains(*w)).count())
            .sum()
    };
    let exploration = score(EXPLORATION_WORDS);
    let comparison = score(COMPARISON_WORDS);
    let decision = score(DECISION_WORDS);

    if decision > comparison && decision > exploration {
        DecisionStage::Decision
    } else if comparison > exploration {
        DecisionStage::Comparison
    } else {
        DecisionStage::Exploration
    }
}

fn suggest_next_actions(stage: DecisionStage, preferences: &UserPreferences) -> Vec<String> {
    let mut actions: Vec<String> = match stage {
        DecisionStage::Exploration => vec![
            "Ask about specific use cases".to_string(),
            "Gather budget requirements".to_string(),
            "Identify preferred brands".to_string(),
        ],
        DecisionStage::Comparison => vec![
            "Provide detailed comparisons".to_string(),
            "Show pros and cons".to_string(),
            "Highlight key differences".to_string(),
        ],
        DecisionStage::Decision => vec![
            "Show pricing and availability".to_string(),
            "Provide purchase links".to_string(),
            "Offer warranty information".to_string(),
        ],
    };

    if preferences.brands.is_empty() {
        actions.push("Ask about brand preferences".to_string());
    }
    if preferences.price_range.is_none() {
        actions.push("Clarify budget constraints".to_string());
    }

    actions.truncate(5);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::InMemoryConversationStore;

    fn memory() -> ConversationMemory {
        ConversationMemory::new(Arc::new(InMemoryConversationStore::new()))
    }

    #[tokio::test]
    async fn malformed_session_id_is_silently_skipped() {
        let memory = memory();
        let result = memory
            .add_message("not-a-uuid", Role::User, "hello", vec![], vec![])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unknown_but_valid_session_id_errors() {
        let memory = memory();
        let ghost = Uuid::new_v4();
        let err = memory
            .add_message(&ghost.to_string(), Role::User, "hello", vec![], vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::SessionNotFound(id) if id == ghost));
    }

    #[tokio::test]
    async fn message_count_tracks_appends() {
        let memory = memory();
        let session = memory.create_session(None, None).await.unwrap();
        let id = session.id.to_string();

        for i in 0..3 {
            memory
                .add_message(&id, Role::User, &format!("message {i}"), vec![], vec![])
                .await
                .unwrap();
        }

        let history = memory.get_session_history(&id, 50, false).await.unwrap();
        assert_eq!(history.session.unwrap().message_count, 3);
        assert_eq!(history.messages.len(), 3);
    }

    #[tokio::test]
    async fn context_fold_is_last_write_wins() {
        let memory = memory();
        let session = memory.create_session(None, None).await.unwrap();
        let id = session.id.to_string();

        let mut first = Map::new();
        first.insert("budget".into(), Value::from(1000));
        first.insert("brand".into(), Value::from("HP"));
        assert!(memory.update_context(&id, "preferences", first, true).await);

        let mut second = Map::new();
        second.insert("budget".into(), Value::from(1500));
        assert!(memory.update_context(&id, "preferences", second, true).await);

        let context = memory.get_session_context(&id).await.unwrap();
        assert_eq!(context["budget"], Value::from(1500));
        assert_eq!(context["brand"], Value::from("HP"));
    }

    #[tokio::test]
    async fn preferences_come_from_user_messages_only() {
        let memory = memory();
        let session = memory.create_session(None, None).await.unwrap();
        let id = session.id.to_string();

        memory
            .add_message(&id, Role::User, "I need a lightweight laptop around $1200 for business", vec![], vec![])
            .await
            .unwrap();
        memory
            .add_message(&id, Role::Assistant, "Consider a Lenovo ThinkPad for gaming", vec![], vec![])
            .await
            .unwrap();

        let prefs = memory.extract_user_preferences(&id).await.unwrap();
        assert!(prefs.brands.is_empty(), "assistant text must not set brands");
        assert_eq!(prefs.use_cases, vec!["business"]);
        assert_eq!(prefs.features, vec!["lightweight"]);
        let range = prefs.price_range.unwrap();
        assert_eq!(range.max, 1200);
        assert_eq!(range.budget, 1200);
        assert_eq!(range.min, None);
    }

    #[tokio::test]
    async fn decision_stage_reads_recent_user_messages() {
        let memory = memory();
        let session = memory.create_session(None, None).await.unwrap();
        let id = session.id.to_string();

        for content in [
            "show me business laptops",
            "ok",
            "I want to buy the ProBook, please send the price so I can order",
        ] {
            memory.add_message(&id, Role::User, content, vec![], vec![]).await.unwrap();
        }

        let insights = memory.get_conversation_insights(&id).await.unwrap();
        assert_eq!(insights.decision_stage, DecisionStage::Decision);
        assert!(insights.next_actions.contains(&"Show pricing and availability".to_string()));
        assert!(insights.next_actions.len() <= 5);
    }

    #[tokio::test]
    async fn cleanup_spares_active_sessions() {
        let store = Arc::new(InMemoryConversationStore::new());
        let memory = ConversationMemory::new(store.clone());

        let active = memory.create_session(None, None).await.unwrap();
        let closed = memory.create_session(None, None).await.unwrap();
        memory.close_session(&closed.id.to_string(), "done").await;

        // Backdate both so the cutoff catches them.
        for id in [active.id, closed.id] {
            let mut session = store.get_session(id).await.unwrap().unwrap();
            session.updated_at = Utc::now() - Duration::days(90);
            store.update_session(session).await.unwrap();
        }

        let deleted = memory.cleanup_old_sessions(30).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_session(active.id).await.unwrap().is_some());
        assert!(store.get_session(closed.id).await.unwrap().is_none());
    }
}
