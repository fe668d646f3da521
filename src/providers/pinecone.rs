// src/providers/pinecone.rs

//! Pinecone index over the serverless REST API.
//!
//! Implements both seams: `VectorIndex` for raw similarity queries and
//! `DocumentChunkIndex` for the `type == pdf_chunk` slice, plus the write
//! side (`sync_products`, `upsert_pdf_chunks`) that hosts run at catalog
//! import time. Embeddings come from the shared Gemini client so the query
//! and stored vectors agree on dimensionality; writes embed with the
//! `retrieval_document` task type, reads with `retrieval_query`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::{DocumentChunkIndex, GeminiClient, IndexMatch, MetadataFilter, PdfChunk, Relevance, TextGenerator, VectorIndex};
use crate::catalog::Candidate;
use crate::config::AssistantConfig;

pub struct PineconeIndex {
    client: HttpClient,
    api_key: String,
    index_url: String,
    embedder: Arc<GeminiClient>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl PineconeIndex {
    pub fn new(config: &AssistantConfig, embedder: Arc<GeminiClient>) -> Self {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.pinecone_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: config.pinecone_api_key.clone(),
            index_url: config.pinecone_index_url.trim_end_matches('/').to_string(),
            embedder,
        }
    }

    fn configured(&self) -> bool {
        !self.api_key.is_empty() && !self.index_url.is_empty()
    }

    async fn query_raw(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if let Some(f) = filter {
            body["filter"] = json!({ &f.key: { "$eq": f.value } });
        }

        let resp = self
            .client
            .post(format!("{}/query", self.index_url))
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Pinecone query failed ({status}): {detail}"));
        }

        let parsed: QueryResponse = resp.json().await?;
        Ok(parsed.matches)
    }

    /// Push catalog variants into the index: render each candidate into
    /// searchable text, embed it as a document, and batch-upsert with the
    /// metadata the query path reads back. Items whose embedding fails are
    /// skipped, not fatal. Returns the number of vectors written.
    pub async fn sync_products(&self, candidates: &[Candidate]) -> Result<usize> {
        if !self.configured() {
            return Err(anyhow!("Pinecone not configured"));
        }

        let mut vectors = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let content = product_content(candidate);
            let values = match self.embedder.embed(&content, "retrieval_document").await {
                Ok(values) => values,
                Err(err) => {
                    tracing::warn!(
                        target: "providers::pinecone",
                        variant_id = %candidate.id,
                        error = %err,
                        "skipping variant, embedding failed"
                    );
                    continue;
                }
            };
            vectors.push(json!({
                "id": candidate.id,
                "values": values,
                "metadata": product_metadata(candidate, &content),
            }));
        }

        let count = self.upsert_raw(vectors).await?;
        tracing::info!(target: "providers::pinecone", count, "product sync complete");
        Ok(count)
    }

    /// Index pdf document chunks for the `type == pdf_chunk` retrieval slice.
    /// Empty chunks and failed embeds are skipped.
    pub async fn upsert_pdf_chunks(&self, chunks: &[PdfChunk]) -> Result<usize> {
        if !self.configured() {
            return Err(anyhow!("Pinecone not configured"));
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk.content.is_empty() {
                continue;
            }
            let values = match self.embedder.embed(&chunk.content, "retrieval_document").await {
                Ok(values) => values,
                Err(err) => {
                    tracing::warn!(
                        target: "providers::pinecone",
                        chunk_id = %chunk.chunk_id,
                        error = %err,
                        "skipping chunk, embedding failed"
                    );
                    continue;
                }
            };
            vectors.push(json!({
                "id": chunk.chunk_id,
                "values": values,
                "metadata": chunk_metadata(chunk),
            }));
        }

        let count = self.upsert_raw(vectors).await?;
        tracing::info!(target: "providers::pinecone", count, "pdf chunks indexed");
        Ok(count)
    }

    async fn upsert_raw(&self, vectors: Vec<Value>) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let count = vectors.len();
        let resp = self
            .client
            .post(format!("{}/vectors/upsert", self.index_url))
            .header("Api-Key", &self.api_key)
            .json(&json!({ "vectors": vectors }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("Pinecone upsert failed ({status})"));
        }
        Ok(count)
    }
}

/// Pipe-joined text a candidate is embedded and stored under.
fn product_content(candidate: &Candidate) -> String {
    let mut parts = vec![format!("Product: {}", candidate.product_name)];
    if !candidate.brand.is_empty() {
        parts.push(format!("Brand: {}", candidate.brand));
    }
    if let Some(ref family) = candidate.model_family {
        parts.push(format!("Model: {family}"));
    }
    if let Some(ref processor) = candidate.processor {
        parts.push(format!("Processor: {processor}"));
    }
    if let Some(memory) = candidate.memory_gb {
        parts.push(format!("Memory: {memory}GB"));
    }
    if let Some(storage) = candidate.storage_gb {
        match candidate.storage_type {
            Some(ref kind) => parts.push(format!("Storage: {storage}GB {kind}")),
            None => parts.push(format!("Storage: {storage}GB")),
        }
    }
    if let Some(display) = candidate.display_inches {
        parts.push(format!("Display: {display} inch"));
    }
    if let Some(ref graphics) = candidate.graphics {
        parts.push(format!("Graphics: {graphics}"));
    }
    if let Some(price) = candidate.price {
        parts.push(format!("Price: ${price}"));
    }
    if let Some(ref availability) = candidate.availability {
        parts.push(format!("Availability: {availability}"));
    }
    parts.join(" | ")
}

/// Metadata stored with a product vector; keys mirror what the query path
/// reads when mapping hits back into context snippets.
fn product_metadata(candidate: &Candidate, content: &str) -> Value {
    let mut meta = json!({
        "type": "product",
        "content": content,
        "name": candidate.product_name,
        "sku": candidate.sku,
        "brand": candidate.brand,
        "created_at": Utc::now().to_rfc3339(),
    });
    if let Some(price) = candidate.price {
        meta["price"] = json!(price);
    }
    if let Some(ref processor) = candidate.processor {
        meta["processor"] = json!(processor);
    }
    if let Some(memory) = candidate.memory_gb {
        meta["memory"] = json!(format!("{memory}GB"));
    }
    if let Some(storage) = candidate.storage_gb {
        meta["storage"] = json!(format!("{storage}GB"));
    }
    if let Some(display) = candidate.display_inches {
        meta["display"] = json!(format!("{display} inch"));
    }
    if let Some(ref availability) = candidate.availability {
        meta["availability"] = json!(availability);
    }
    if let Some(ref url) = candidate.url {
        meta["url"] = json!(url);
    }
    meta
}

fn chunk_metadata(chunk: &PdfChunk) -> Value {
    // Metadata carries a truncated copy plus the full text under its own key;
    // search_chunks prefers full_content on the way back out.
    let truncated: String = chunk.content.chars().take(1000).collect();
    json!({
        "type": "pdf_chunk",
        "content": truncated,
        "full_content": chunk.content,
        "source": chunk.source,
        "page": chunk.page,
        "chunk_id": chunk.chunk_id,
        "pdf_url": chunk.pdf_url,
        "product_name": chunk.product_name,
        "created_at": Utc::now().to_rfc3339(),
    })
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn is_available(&self) -> bool {
        self.configured() && self.embedder.is_available()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text, "retrieval_query").await
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexMatch>> {
        if !self.configured() {
            return Err(anyhow!("Pinecone not configured"));
        }

        let matches = self.query_raw(vector, top_k, filter).await?;
        Ok(matches
            .into_iter()
            .map(|m| IndexMatch { id: m.id, score: m.score, metadata: m.metadata })
            .collect())
    }
}

#[async_trait]
impl DocumentChunkIndex for PineconeIndex {
    fn is_available(&self) -> bool {
        VectorIndex::is_available(self)
    }

    async fn search_chunks(&self, query: &str, limit: usize) -> Result<Vec<PdfChunk>> {
        let vector = self.embedder.embed(query, "retrieval_query").await?;
        let filter = MetadataFilter::eq("type", "pdf_chunk");
        let matches = self.query_raw(&vector, limit, Some(&filter)).await?;

        Ok(matches
            .into_iter()
            .map(|m| {
                let meta = &m.metadata;
                let content = meta["full_content"]
                    .as_str()
                    .or_else(|| meta["content"].as_str())
                    .unwrap_or("")
                    .to_string();
                PdfChunk {
                    relevance: Relevance::from_score(m.score),
                    chunk_id: m.id,
                    score: m.score,
                    content,
                    source: meta["source"].as_str().unwrap_or("").to_string(),
                    page: meta["page"].as_u64().unwrap_or(0) as u32,
                    pdf_url: meta["pdf_url"].as_str().unwrap_or("").to_string(),
                    product_name: meta["product_name"].as_str().unwrap_or("").to_string(),
                }
            })
            .collect())
    }
}
