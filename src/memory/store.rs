// src/memory/store.rs

//! Storage seam for conversation memory. CRUD only — no interpretation of
//! the data; the service layer owns folding, extraction, and insights.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::types::{ContextEntry, Message, Session, SessionStatus};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert_session(&self, session: Session) -> anyhow::Result<()>;

    async fn get_session(&self, id: Uuid) -> anyhow::Result<Option<Session>>;

    async fn update_session(&self, session: Session) -> anyhow::Result<()>;

    /// Append a message and bump the session's message count in one step.
    async fn insert_message(&self, message: Message) -> anyhow::Result<Session>;

    /// Messages for a session, oldest first, capped at `limit`.
    async fn messages_for_session(&self, id: Uuid, limit: usize) -> anyhow::Result<Vec<Message>>;

    async fn insert_context(&self, entry: ContextEntry) -> anyhow::Result<()>;

    /// Context entries for a session, oldest first.
    async fn context_for_session(&self, id: Uuid) -> anyhow::Result<Vec<ContextEntry>>;

    /// Delete non-active sessions last touched before `cutoff`, with their
    /// messages and context. Returns the number of sessions removed.
    async fn delete_stale_sessions(&self, cutoff: DateTime<Utc>) -> anyhow::Result<usize>;
}

/// In-memory store backing tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryConversationStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<Uuid, Session>,
    messages: Vec<Message>,
    context: Vec<ContextEntry>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn insert_session(&self, session: Session) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        inner.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> anyhow::Result<Option<Session>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(inner.sessions.get(&id).cloned())
    }

    async fn update_session(&self, session: Session) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        inner.sessions.insert(session.id, session);
        Ok(())
    }

    async fn insert_message(&self, message: Message) -> anyhow::Result<Session> {
        // Count increment happens under the same write lock as the append,
        // so concurrent turns cannot lose an increment.
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        let session_id = message.session_id;
        inner.messages.push(message);

        let count = inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .count() as u32;
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| anyhow::anyhow!("session {session_id} not found"))?;
        session.message_count = count;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    async fn messages_for_session(&self, id: Uuid, limit: usize) -> anyhow::Result<Vec<Message>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.session_id == id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_context(&self, entry: ContextEntry) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        inner.context.push(entry);
        Ok(())
    }

    async fn context_for_session(&self, id: Uuid) -> anyhow::Result<Vec<ContextEntry>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(inner
            .context
            .iter()
            .filter(|c| c.session_id == id)
            .cloned()
            .collect())
    }

    async fn delete_stale_sessions(&self, cutoff: DateTime<Utc>) -> anyhow::Result<usize> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        let stale: Vec<Uuid> = inner
            .sessions
            .values()
            .filter(|s| s.status != SessionStatus::Active && s.updated_at < cutoff)
            .map(|s| s.id)
            .collect();

        for id in &stale {
            inner.sessions.remove(id);
        }
        inner.messages.retain(|m| !stale.contains(&m.session_id));
        inner.context.retain(|c| !stale.contains(&c.session_id));
        Ok(stale.len())
    }
}
