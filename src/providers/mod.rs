// src/providers/mod.rs

//! Collaborator seams: vector index, pdf-chunk index, text generation.
//!
//! The orchestrator only ever talks to these traits. Failures surface as
//! `anyhow::Error` and every caller applies the degrade-to-empty policy —
//! a provider outage must never abort a chat turn.

mod gemini;
mod pinecone;

pub use gemini::GeminiClient;
pub use pinecone::PineconeIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One raw similarity hit from the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// Metadata equality filter, e.g. `type == "pdf_chunk"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub key: String,
    pub value: serde_json::Value,
}

impl MetadataFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Embedding-similarity index over product (and document) vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether the index can serve queries right now. Callers check this
    /// before building query variants to avoid wasted work.
    fn is_available(&self) -> bool;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> anyhow::Result<Vec<IndexMatch>>;
}

/// A retrieved slice of PDF product documentation. Carries provenance so the
/// response can cite page and source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfChunk {
    pub chunk_id: String,
    pub score: f32,
    pub content: String,
    pub source: String,
    pub page: u32,
    pub pdf_url: String,
    pub product_name: String,
    pub relevance: Relevance,
}

/// Coarse relevance bucket derived from the similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    Medium,
    Low,
}

impl Relevance {
    pub fn from_score(score: f32) -> Self {
        if score > 0.8 {
            Relevance::High
        } else if score > 0.6 {
            Relevance::Medium
        } else {
            Relevance::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Relevance::High => "high",
            Relevance::Medium => "medium",
            Relevance::Low => "low",
        }
    }
}

/// Document-chunk retrieval, scoped to `type == pdf_chunk` vectors.
#[async_trait]
pub trait DocumentChunkIndex: Send + Sync {
    fn is_available(&self) -> bool;

    async fn search_chunks(&self, query: &str, limit: usize) -> anyhow::Result<Vec<PdfChunk>>;
}

/// Single-shot text generation. No streaming; the collaborator enforces its
/// own prompt-size truncation if needed.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn is_available(&self) -> bool;

    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_buckets() {
        assert_eq!(Relevance::from_score(0.85), Relevance::High);
        assert_eq!(Relevance::from_score(0.8), Relevance::Medium);
        assert_eq!(Relevance::from_score(0.61), Relevance::Medium);
        assert_eq!(Relevance::from_score(0.2), Relevance::Low);
    }
}
