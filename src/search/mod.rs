// src/search/mod.rs

//! Multi-strategy vector search with result fusion.
//!
//! Every query variant from the analyzer runs against the product index (and
//! optionally the pdf-chunk index). Results keep the strategy and literal
//! query that produced them — both feed the boost calculation and the
//! explainability fields in the response. Contract: one entry per id in the
//! final output, sorted by boosted score; provider trouble degrades to fewer
//! or zero results, never an error.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use crate::providers::{DocumentChunkIndex, VectorIndex};
use crate::query::{QueryAnalysis, QueryIntent, SearchStrategy};

/// What kind of vector the hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Product,
    PdfChunk,
}

/// One fused search hit, tagged for explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorResult {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Value,
    pub content: String,
    pub strategy: SearchStrategy,
    pub query_used: String,
    pub kind: ResultKind,
    pub final_score: f32,
}

pub struct SearchFusion {
    index: Arc<dyn VectorIndex>,
    chunks: Option<Arc<dyn DocumentChunkIndex>>,
    pdf_top_k: usize,
}

impl SearchFusion {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        chunks: Option<Arc<dyn DocumentChunkIndex>>,
        pdf_top_k: usize,
    ) -> Self {
        Self { index, chunks, pdf_top_k }
    }

    pub fn is_available(&self) -> bool {
        self.index.is_available()
    }

    /// Execute all query variants and fuse the results.
    pub async fn search(
        &self,
        analysis: &QueryAnalysis,
        limit: usize,
        include_pdfs: bool,
    ) -> Vec<VectorResult> {
        if !self.index.is_available() {
            tracing::warn!(target: "search", "vector index unavailable, returning no results");
            return Vec::new();
        }

        let per_query = limit / analysis.variants.len().max(1) + 1;

        // Variants run concurrently; join_all keeps declaration order, which
        // dedup relies on (first occurrence wins).
        let searches = analysis.variants.iter().map(|variant| async move {
            let mut results: Vec<VectorResult> = Vec::new();

            match self.search_single(&variant.query, per_query).await {
                Ok(mut hits) => {
                    for hit in &mut hits {
                        hit.strategy = variant.strategy;
                        hit.query_used = variant.query.clone();
                    }
                    results.extend(hits);
                }
                Err(err) => {
                    tracing::error!(
                        target: "search",
                        strategy = variant.strategy.as_str(),
                        error = %err,
                        "vector search failed for strategy"
                    );
                }
            }

            if include_pdfs {
                if let Some(chunks) = &self.chunks {
                    match chunks.search_chunks(&variant.query, self.pdf_top_k).await {
                        Ok(pdf_hits) => {
                            results.extend(pdf_hits.into_iter().map(|c| VectorResult {
                                metadata: json!({
                                    "type": "pdf_chunk",
                                    "source": c.source,
                                    "page": c.page,
                                    "pdf_url": c.pdf_url,
                                    "product_name": c.product_name,
                                }),
                                id: c.chunk_id,
                                score: c.score,
                                content: c.content,
                                strategy: variant.strategy,
                                query_used: variant.query.clone(),
                                kind: ResultKind::PdfChunk,
                                final_score: 0.0,
                            }));
                        }
                        Err(err) => {
                            tracing::error!(target: "search", error = %err, "pdf chunk search failed");
                        }
                    }
                }
            }

            results
        });

        let all_results: Vec<VectorResult> = futures::future::join_all(searches)
            .await
            .into_iter()
            .flatten()
            .collect();

        let mut unique = deduplicate(all_results);
        for result in &mut unique {
            result.final_score = relevance_score(result, analysis);
        }
        unique.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        unique.truncate(limit);
        unique
    }

    async fn search_single(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<VectorResult>> {
        let vector = self.index.embed(query).await?;
        let matches = self.index.query(&vector, top_k, None).await?;

        Ok(matches
            .into_iter()
            .map(|m| {
                let content = m.metadata["content"].as_str().unwrap_or("").to_string();
                VectorResult {
                    id: m.id,
                    score: m.score,
                    metadata: m.metadata,
                    content,
                    strategy: SearchStrategy::Original,
                    query_used: String::new(),
                    kind: ResultKind::Product,
                    final_score: 0.0,
                }
            })
            .collect())
    }
}

/// One entry per id; the first occurrence wins (later duplicates from
/// overlapping strategies are dropped).
fn deduplicate(results: Vec<VectorResult>) -> Vec<VectorResult> {
    let mut seen: HashSet<String> = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

/// `final_score = raw_similarity × boost`. Boost starts at 1.0, accumulates
/// intent/brand/use-case bonuses, then multiplies in the per-strategy weight.
/// PDF chunks keep a neutral strategy multiplier — their ordering should come
/// from similarity, not from which rewrite happened to retrieve them.
fn relevance_score(result: &VectorResult, analysis: &QueryAnalysis) -> f32 {
    let meta = &result.metadata;
    let mut boost = 1.0f32;

    if analysis.intent == QueryIntent::Recommendation
        && meta["type"].as_str() == Some("product")
    {
        boost += 0.2;
    }
    if analysis.intent == QueryIntent::Pricing && !meta["price"].is_null() {
        boost += 0.15;
    }

    if !analysis.extracted.brands.is_empty() {
        let result_brand = meta["brand"].as_str().unwrap_or("").to_lowercase();
        if analysis
            .extracted
            .brands
            .iter()
            .any(|b| result_brand.contains(b.as_str()))
        {
            boost += 0.3;
        }
    }

    if let Some(use_case) = analysis.extracted.use_case {
        let category = meta["category"].as_str().unwrap_or("").to_lowercase();
        if category.contains(use_case.as_str()) {
            boost += 0.25;
        }
    }

    if result.kind == ResultKind::Product {
        boost *= result.strategy.weight();
    }

    result.score * boost
}
