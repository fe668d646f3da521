// tests/chat_flow.rs

//! End-to-end chat turns against in-memory collaborators.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lapwise::assistant::{Assistant, ChatContext};
use lapwise::catalog::{Candidate, InMemoryCatalog};
use lapwise::memory::InMemoryConversationStore;
use lapwise::providers::{
    DocumentChunkIndex, IndexMatch, MetadataFilter, PdfChunk, TextGenerator, VectorIndex,
};
use lapwise::query::SearchStrategy;
use lapwise::search::{ResultKind, VectorResult};
use lapwise::AssistantConfig;

/// Vector index that counts queries; can be toggled unavailable.
struct CountingIndex {
    available: bool,
    queries: AtomicUsize,
}

impl CountingIndex {
    fn new(available: bool) -> Self {
        Self { available, queries: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl VectorIndex for CountingIndex {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.0; 8])
    }

    async fn query(
        &self,
        _vector: &[f32],
        _top_k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> anyhow::Result<Vec<IndexMatch>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Index that reports available but fails every call, unlike the
/// short-circuit path an unavailable index takes.
struct ErroringIndex;

#[async_trait]
impl VectorIndex for ErroringIndex {
    fn is_available(&self) -> bool {
        true
    }

    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("embedding backend unreachable")
    }

    async fn query(
        &self,
        _vector: &[f32],
        _top_k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> anyhow::Result<Vec<IndexMatch>> {
        anyhow::bail!("vector index unreachable")
    }
}

struct ErroringChunks;

#[async_trait]
impl DocumentChunkIndex for ErroringChunks {
    fn is_available(&self) -> bool {
        true
    }

    async fn search_chunks(&self, _query: &str, _limit: usize) -> anyhow::Result<Vec<PdfChunk>> {
        anyhow::bail!("chunk index unreachable")
    }
}

struct CannedGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl CannedGenerator {
    fn ok(reply: &str) -> Self {
        Self { reply: Some(reply.to_string()), calls: AtomicUsize::new(0) }
    }

    fn failing() -> Self {
        Self { reply: None, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    fn is_available(&self) -> bool {
        self.reply.is_some()
    }

    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => anyhow::bail!("generation provider unreachable"),
        }
    }
}

fn hp_candidate(id: &str, name: &str, sku: &str, price: f64, memory: u32) -> Candidate {
    Candidate {
        id: id.into(),
        product_id: format!("p-{id}"),
        product_name: name.into(),
        brand: "HP".into(),
        sku: sku.into(),
        processor: Some("Intel Core i5-1335U".into()),
        memory_gb: Some(memory),
        storage_gb: Some(512),
        storage_type: Some("NVMe SSD".into()),
        price: Some(price),
        availability: Some("In Stock".into()),
        ..Default::default()
    }
}

fn assistant_with(
    index: Arc<CountingIndex>,
    generator: Arc<CannedGenerator>,
    candidates: Vec<Candidate>,
) -> Assistant {
    Assistant::new(
        AssistantConfig::default(),
        Arc::new(InMemoryCatalog::new(candidates)),
        index,
        None,
        generator,
        Arc::new(InMemoryConversationStore::default()),
    )
}

#[tokio::test]
async fn greeting_turn_skips_retrieval_entirely() {
    let index = Arc::new(CountingIndex::new(true));
    let generator = Arc::new(CannedGenerator::ok("Hello! How can I help with laptops?"));
    let assistant = assistant_with(
        Arc::clone(&index),
        Arc::clone(&generator),
        vec![hp_candidate("a", "HP ProBook 450 G10", "8A5W6EA", 1299.0, 16)],
    );

    let response = assistant.chat("hi", ChatContext::default()).await.unwrap();

    assert_eq!(response.response, "Hello! How can I help with laptops?");
    assert!(response.tool_calls.is_empty());
    assert!(response.citations.is_empty());
    assert!(response.recommendations.is_none());
    assert_eq!(index.queries.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn generation_failure_degrades_to_canned_reply() {
    let index = Arc::new(CountingIndex::new(false));
    let generator = Arc::new(CannedGenerator::failing());
    let assistant = assistant_with(
        index,
        generator,
        vec![hp_candidate("a", "HP ProBook 450 G10", "8A5W6EA", 1299.0, 16)],
    );

    let response = assistant
        .chat("recommend a laptop for me", ChatContext::default())
        .await
        .unwrap();

    assert!(response.diagnostics.generation_fallback);
    assert!(response.response.contains("happy to recommend"));
}

#[tokio::test]
async fn product_inquiry_routes_tools_and_cites_results() {
    let index = Arc::new(CountingIndex::new(false));
    let generator =
        Arc::new(CannedGenerator::ok("The HP ProBook 450 G10 [SKU: 8A5W6EA] fits well."));
    let assistant = assistant_with(
        index,
        generator,
        vec![
            hp_candidate("a", "HP ProBook 450 G10", "8A5W6EA", 1299.0, 16),
            hp_candidate("b", "HP ProBook 440 G11", "9H8Y7EA", 1599.0, 16),
        ],
    );

    let response = assistant
        .chat("find me an hp laptop", ChatContext::default())
        .await
        .unwrap();

    let tools: Vec<&str> = response.tool_calls.iter().map(|tc| tc.tool.as_str()).collect();
    assert!(tools.contains(&"search"));
    assert!(!response.citations.is_empty());
    assert!(response
        .citations
        .iter()
        .any(|c| c.product_name == "HP ProBook 450 G10"));
    let recs = response.recommendations.expect("recommendations present");
    assert!(!recs.is_empty());
}

#[tokio::test]
async fn chat_turn_persists_both_messages() {
    let index = Arc::new(CountingIndex::new(false));
    let generator = Arc::new(CannedGenerator::ok("Here are some options."));
    let assistant = assistant_with(
        index,
        generator,
        vec![hp_candidate("a", "HP ProBook 450 G10", "8A5W6EA", 1299.0, 16)],
    );

    let response = assistant
        .chat("show me hp laptops under $1500", ChatContext::default())
        .await
        .unwrap();

    let history = assistant
        .memory()
        .get_session_history(&response.session_id, 10, true)
        .await
        .unwrap();
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[0].content, "show me hp laptops under $1500");
    assert!(!history.messages[1].tool_calls.is_empty());
    // budget and brand land in stored preferences for the next turn
    assert!(history.context.contains_key("budget_range"));
    assert!(history.context.contains_key("preferred_brands"));
}

#[tokio::test]
async fn throwing_retrieval_providers_still_yield_an_answer() {
    let generator = Arc::new(CannedGenerator::ok("The ProBook line covers business needs."));
    let assistant = Assistant::new(
        AssistantConfig::default(),
        Arc::new(InMemoryCatalog::new(Vec::new())),
        Arc::new(ErroringIndex),
        Some(Arc::new(ErroringChunks)),
        Arc::clone(&generator) as Arc<dyn TextGenerator>,
        Arc::new(InMemoryConversationStore::default()),
    );

    // Product inquiry, so both retrieval stages run and both error out; the
    // phrasing avoids the cold-catalog fallback products on purpose.
    let response = assistant
        .chat("tell me about the probook specs", ChatContext::default())
        .await
        .unwrap();

    assert!(!response.response.is_empty());
    assert!(response.citations.is_empty());
    assert_eq!(response.diagnostics.vector_results, 0);
    assert_eq!(response.diagnostics.pdf_chunks_used, 0);
    assert_eq!(response.diagnostics.context_products, 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn prefetched_vector_results_skip_the_index() {
    let index = Arc::new(CountingIndex::new(true));
    let generator = Arc::new(CannedGenerator::ok("The HP EliteBook 840 G11 stands out."));
    let assistant = assistant_with(Arc::clone(&index), generator, Vec::new());

    let prefetched = vec![VectorResult {
        id: "v1".into(),
        score: 0.93,
        metadata: json!({
            "type": "product",
            "name": "HP EliteBook 840 G11",
            "sku": "A2H72EA",
            "brand": "HP",
            "price": 1899.0,
        }),
        content: "Product: HP EliteBook 840 G11\nBrand: HP".into(),
        strategy: SearchStrategy::Original,
        query_used: "elitebook".into(),
        kind: ResultKind::Product,
        final_score: 0.93,
    }];

    let ctx = ChatContext { vector_results: Some(prefetched), ..Default::default() };
    let response = assistant.chat("tell me about the elitebook", ctx).await.unwrap();

    assert_eq!(index.queries.load(Ordering::SeqCst), 0);
    assert!(response
        .tool_calls
        .iter()
        .any(|tc| tc.tool == "pinecone_vector_search" && tc.results_count == 1));
    assert!(response
        .citations
        .iter()
        .any(|c| c.sku == "A2H72EA"));
    assert_eq!(response.diagnostics.vector_results, 1);
}
