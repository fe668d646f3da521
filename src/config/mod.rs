// src/config/mod.rs

//! Environment-driven configuration for the assistant core.
//!
//! Every knob loads from the environment (a `.env` file is honored) with a
//! sane default, so `from_env()` never fails. The config is constructed by
//! the host and passed into `Assistant::new` — there is no global instance.

use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    // ── Gemini (text generation + embeddings)
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_embed_model: String,
    pub gemini_timeout_secs: u64,

    // ── Pinecone (product + pdf-chunk vectors)
    pub pinecone_api_key: String,
    pub pinecone_index_url: String,
    pub pinecone_timeout_secs: u64,

    // ── Retrieval limits
    pub vector_search_limit: usize,
    pub pdf_chunk_limit: usize,
    pub pdf_chunks_per_strategy: usize,

    // ── Conversation
    pub history_message_cap: usize,
    pub session_cleanup_days: i64,

    // ── Recommendations
    pub candidate_pool_limit: usize,
    pub chat_recommendation_cap: usize,
    pub citation_floor: usize,

    // ── Logging
    pub log_level: String,
}

// Handles values carrying inline comments or stray whitespace; a parse
// failure falls back to the default rather than aborting startup.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean = val.split('#').next().unwrap_or("").trim();
            match clean.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl AssistantConfig {
    pub fn from_env() -> Self {
        // Best effort: missing .env just means plain env vars + defaults.
        let _ = dotenvy::dotenv();

        Self {
            gemini_api_key: env_var_or("GEMINI_API_KEY", String::new()),
            gemini_model: env_var_or("LAPWISE_GEMINI_MODEL", "gemini-1.5-flash".to_string()),
            gemini_embed_model: env_var_or("LAPWISE_EMBED_MODEL", "embedding-001".to_string()),
            gemini_timeout_secs: env_var_or("LAPWISE_GEMINI_TIMEOUT", 60),
            pinecone_api_key: env_var_or("PINECONE_API_KEY", String::new()),
            pinecone_index_url: env_var_or("PINECONE_INDEX_URL", String::new()),
            pinecone_timeout_secs: env_var_or("LAPWISE_PINECONE_TIMEOUT", 30),
            vector_search_limit: env_var_or("LAPWISE_VECTOR_SEARCH_LIMIT", 8),
            pdf_chunk_limit: env_var_or("LAPWISE_PDF_CHUNK_LIMIT", 3),
            pdf_chunks_per_strategy: env_var_or("LAPWISE_PDF_CHUNKS_PER_STRATEGY", 3),
            history_message_cap: env_var_or("LAPWISE_HISTORY_MESSAGE_CAP", 30),
            session_cleanup_days: env_var_or("LAPWISE_SESSION_CLEANUP_DAYS", 30),
            candidate_pool_limit: env_var_or("LAPWISE_CANDIDATE_POOL_LIMIT", 50),
            chat_recommendation_cap: env_var_or("LAPWISE_CHAT_RECOMMENDATION_CAP", 3),
            citation_floor: env_var_or("LAPWISE_CITATION_FLOOR", 3),
            log_level: env_var_or("LAPWISE_LOG_LEVEL", "info".to_string()),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        // Defaults without touching the process environment; used by tests.
        Self {
            gemini_api_key: String::new(),
            gemini_model: "gemini-1.5-flash".into(),
            gemini_embed_model: "embedding-001".into(),
            gemini_timeout_secs: 60,
            pinecone_api_key: String::new(),
            pinecone_index_url: String::new(),
            pinecone_timeout_secs: 30,
            vector_search_limit: 8,
            pdf_chunk_limit: 3,
            pdf_chunks_per_strategy: 3,
            history_message_cap: 30,
            session_cleanup_days: 30,
            candidate_pool_limit: 50,
            chat_recommendation_cap: 3,
            citation_floor: 3,
            log_level: "info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_or_strips_inline_comments() {
        std::env::set_var("LAPWISE_TEST_LIMIT", "12 # keep small");
        let v: usize = env_var_or("LAPWISE_TEST_LIMIT", 8);
        assert_eq!(v, 12);
        std::env::remove_var("LAPWISE_TEST_LIMIT");
    }

    #[test]
    fn parse_failure_falls_back() {
        std::env::set_var("LAPWISE_TEST_BAD", "not-a-number");
        let v: usize = env_var_or("LAPWISE_TEST_BAD", 8);
        assert_eq!(v, 8);
        std::env::remove_var("LAPWISE_TEST_BAD");
    }
}
