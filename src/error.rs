// src/error.rs

//! Boundary errors the orchestrator is expected to act on.
//!
//! Provider failures (vector index down, LLM unavailable, tool execution
//! errors) are NOT represented here — those degrade in place per the
//! swallow-at-the-provider-boundary policy. This enum only covers malformed
//! input the caller must fix.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    /// `get_recommendations` received a constraint set that cannot be
    /// satisfied as written (e.g. budget_min > budget_max). Fails fast
    /// instead of silently returning an empty list.
    #[error("invalid recommendation constraints: {0}")]
    InvalidConstraints(String),

    /// `compare_products` needs at least two resolvable products.
    #[error("comparison requires at least two known products, got {0}")]
    NotEnoughProducts(usize),

    /// A required session lookup referenced a session that does not exist.
    /// Best-effort writes never raise this.
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
