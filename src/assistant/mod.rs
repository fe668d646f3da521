// src/assistant/mod.rs

//! Chat orchestration.
//!
//! `Assistant` owns no I/O of its own — every collaborator (catalog, vector
//! index, pdf-chunk index, text generator, conversation store) is injected at
//! construction, so hosts and tests swap implementations freely. A chat turn
//! runs classification, retrieval, tool routing, context assembly, generation,
//! citation extraction, and recommendation scoring in a fixed order; each
//! retrieval stage degrades independently, and the only hard failure left is
//! session bootstrap.

mod exec;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::config::AssistantConfig;
use crate::context::{
    build_context, build_prompt, classify, MessageType, ProductSnippet, RetrievedItem,
    SessionPreferences, ToolCallRecord,
};
use crate::error::AssistantError;
use crate::memory::{ConversationMemory, ConversationStore, Role};
use crate::providers::{DocumentChunkIndex, PdfChunk, TextGenerator, VectorIndex};
use crate::query::{analyze, QueryAnalysis, QueryContext};
use crate::recommend::{
    Aspect, ComparisonReport, RecommendationEngine, RecommendationRequest, RecommendationResponse,
};
use crate::search::{ResultKind, SearchFusion, VectorResult};
use crate::tools;

/// Caller-supplied per-turn context. Everything is optional; fields that are
/// set short-circuit the corresponding retrieval stage (pre-fetched pdf
/// chunks or vector results are reused instead of re-queried).
#[derive(Default)]
pub struct ChatContext {
    pub session_id: Option<String>,
    pub budget: Option<f64>,
    pub use_case: Option<String>,
    /// Overrides stored history when the host keeps its own transcript.
    pub conversation_history: Option<Vec<HistoryTurn>>,
    pub pdf_contexts: Option<Vec<PdfChunk>>,
    pub vector_results: Option<Vec<VectorResult>>,
}

#[derive(Debug, Clone)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub product_name: String,
    pub sku: String,
    pub url: String,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecommendation {
    pub variant_id: String,
    pub product_name: String,
    pub price: Option<f64>,
    pub score: u8,
    pub rationale: String,
    pub availability: String,
    pub url: String,
}

/// Per-turn observability counters surfaced alongside the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    pub message_type: MessageType,
    pub vector_results: usize,
    pub pdf_chunks_used: usize,
    pub context_products: usize,
    pub multi_strategy_search: bool,
    pub generation_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub citations: Vec<Citation>,
    pub recommendations: Option<Vec<ChatRecommendation>>,
    pub session_id: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub diagnostics: Diagnostics,
}

pub struct Assistant {
    config: AssistantConfig,
    catalog: Arc<dyn CatalogStore>,
    fusion: SearchFusion,
    chunks: Option<Arc<dyn DocumentChunkIndex>>,
    generator: Arc<dyn TextGenerator>,
    memory: ConversationMemory,
    engine: RecommendationEngine,
}

impl Assistant {
    pub fn new(
        config: AssistantConfig,
        catalog: Arc<dyn CatalogStore>,
        index: Arc<dyn VectorIndex>,
        chunks: Option<Arc<dyn DocumentChunkIndex>>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let fusion = SearchFusion::new(index, chunks.clone(), config.pdf_chunks_per_strategy);
        let engine = RecommendationEngine::new(Arc::clone(&catalog), config.candidate_pool_limit);
        Self {
            catalog,
            fusion,
            chunks,
            generator,
            memory: ConversationMemory::new(store),
            engine,
            config,
        }
    }

    /// Session administration (history, insights, close, cleanup) goes
    /// straight to the memory layer.
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, AssistantError> {
        self.engine.get_recommendations(request).await
    }

    pub async fn compare_products(
        &self,
        product_ids: &[String],
        aspects: Option<Vec<Aspect>>,
    ) -> Result<ComparisonReport, AssistantError> {
        self.engine.compare(product_ids, aspects).await
    }

    pub async fn cleanup_sessions(&self) -> Result<usize, AssistantError> {
        self.memory
            .cleanup_old_sessions(self.config.session_cleanup_days)
            .await
    }

    /// One full chat turn. Retrieval stage failures degrade to less context;
    /// a generation failure degrades to a canned reply. Only session
    /// bootstrap errors propagate.
    pub async fn chat(
        &self,
        message: &str,
        ctx: ChatContext,
    ) -> Result<ChatResponse, AssistantError> {
        let ChatContext {
            session_id: requested_session,
            budget,
            use_case,
            conversation_history,
            pdf_contexts,
            vector_results,
        } = ctx;

        let session = self.memory.get_or_create(requested_session.as_deref()).await?;
        let session_id = session.id.to_string();

        let history = match conversation_history {
            Some(turns) => turns,
            None => self.load_history(&session_id).await,
        };
        let history_str = flatten_history(&history, self.config.history_message_cap);

        let message_type = classify(message);
        tracing::info!(
            target: "assistant",
            %session_id,
            message_type = message_type.as_str(),
            "chat turn started"
        );

        let mut tool_calls: Vec<ToolCallRecord> = Vec::new();
        let mut snippets: Vec<ProductSnippet> = Vec::new();
        let mut pdf_chunks: Vec<PdfChunk> = Vec::new();
        let mut analysis: Option<QueryAnalysis> = None;
        let mut multi_strategy = false;

        let stored = self
            .memory
            .get_session_context(&session_id)
            .await
            .unwrap_or_default();

        if message_type.wants_retrieval() {
            pdf_chunks = self
                .gather_pdf_chunks(message, pdf_contexts, &mut tool_calls)
                .await;

            let (vector_analysis, vector_hits) = self
                .gather_vector_results(
                    message,
                    budget,
                    use_case.as_deref(),
                    vector_results,
                    &stored,
                    &mut tool_calls,
                )
                .await;
            analysis = vector_analysis;
            multi_strategy = analysis.as_ref().is_some_and(|a| a.variants.len() > 1);
            snippets.extend(vector_hits);

            for invocation in tools::route(message, &history_str) {
                let docs =
                    exec::execute_tool(self.catalog.as_ref(), &self.engine, &invocation, message)
                        .await;
                tool_calls.push(ToolCallRecord {
                    tool: invocation.name().to_string(),
                    results_count: docs.len(),
                });
                snippets.extend(docs);
            }

            // Cold index and no tool hits: seed the context with a couple of
            // representative products so generic laptop questions still get a
            // grounded answer.
            let lower = message.to_lowercase();
            if snippets.is_empty()
                && pdf_chunks.is_empty()
                && (lower.contains("laptop") || lower.contains("budget"))
            {
                let budget = budget.or_else(|| tools::extract_budget(message));
                snippets.extend(exec::fallback_products(budget).into_iter().take(2));
            }
        }

        let vector_count = snippets.iter().filter(|s| s.vector_score.is_some()).count();
        let preferences = session_preferences(budget, use_case, &stored, history.len());

        let context = if message_type.wants_retrieval() {
            let items: Vec<RetrievedItem> = snippets
                .iter()
                .cloned()
                .map(RetrievedItem::Product)
                .chain(pdf_chunks.iter().cloned().map(RetrievedItem::Pdf))
                .collect();
            build_context(&items, &tool_calls, analysis.as_ref(), &preferences)
        } else {
            String::new()
        };

        let prompt = build_prompt(
            message,
            &history_str,
            &context,
            &tool_calls,
            analysis.as_ref(),
            message_type,
        );

        let (response_text, generation_fallback) = match self.generator.generate(&prompt).await {
            Ok(text) => (text, false),
            Err(err) => {
                tracing::warn!(target: "assistant", error = %err, "generation failed, using fallback");
                (exec::fallback_response(message), true)
            }
        };

        let citations = if message_type.wants_retrieval() && !snippets.is_empty() {
            exec::extract_citations(&response_text, &snippets, self.config.citation_floor)
        } else {
            Vec::new()
        };

        let recommendations = if message_type.wants_retrieval() {
            exec::chat_recommendations(message, &snippets, self.config.chat_recommendation_cap)
        } else {
            None
        };

        self.persist_turn(&session_id, message, &response_text, &tool_calls, &citations)
            .await;
        self.remember_preferences(&session_id, message).await;

        tracing::info!(
            target: "assistant",
            %session_id,
            tools = tool_calls.len(),
            citations = citations.len(),
            products = snippets.len(),
            pdf_chunks = pdf_chunks.len(),
            fallback = generation_fallback,
            "chat turn complete"
        );

        Ok(ChatResponse {
            response: response_text,
            citations,
            recommendations,
            session_id,
            tool_calls,
            diagnostics: Diagnostics {
                message_type,
                vector_results: vector_count,
                pdf_chunks_used: pdf_chunks.len(),
                context_products: snippets.len(),
                multi_strategy_search: multi_strategy,
                generation_fallback,
            },
        })
    }

    async fn load_history(&self, session_id: &str) -> Vec<HistoryTurn> {
        match self
            .memory
            .get_session_history(session_id, self.config.history_message_cap, false)
            .await
        {
            Ok(history) => history
                .messages
                .into_iter()
                .map(|m| HistoryTurn { role: m.role, content: m.content })
                .collect(),
            Err(err) => {
                tracing::warn!(target: "assistant", error = %err, "history load failed");
                Vec::new()
            }
        }
    }

    async fn gather_pdf_chunks(
        &self,
        message: &str,
        provided: Option<Vec<PdfChunk>>,
        tool_calls: &mut Vec<ToolCallRecord>,
    ) -> Vec<PdfChunk> {
        if let Some(mut chunks) = provided {
            chunks.truncate(self.config.pdf_chunk_limit);
            tool_calls.push(ToolCallRecord {
                tool: "pdf_rag_search".to_string(),
                results_count: chunks.len(),
            });
            return chunks;
        }

        let Some(index) = self.chunks.as_ref().filter(|c| c.is_available()) else {
            return Vec::new();
        };
        let chunks = match index.search_chunks(message, self.config.pdf_chunk_limit).await {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!(target: "assistant", error = %err, "pdf chunk search failed");
                Vec::new()
            }
        };
        tool_calls.push(ToolCallRecord {
            tool: "pdf_rag_search".to_string(),
            results_count: chunks.len(),
        });
        chunks
    }

    async fn gather_vector_results(
        &self,
        message: &str,
        budget: Option<f64>,
        use_case: Option<&str>,
        provided: Option<Vec<VectorResult>>,
        stored: &Map<String, Value>,
        tool_calls: &mut Vec<ToolCallRecord>,
    ) -> (Option<QueryAnalysis>, Vec<ProductSnippet>) {
        if let Some(provided) = provided {
            tool_calls.push(ToolCallRecord {
                tool: "pinecone_vector_search".to_string(),
                results_count: provided.len(),
            });
            return (None, provided.iter().filter_map(vector_result_to_snippet).collect());
        }

        if !self.fusion.is_available() {
            return (None, Vec::new());
        }

        let query_context = QueryContext {
            budget: budget.or_else(|| stored.get("budget_range").and_then(Value::as_f64)),
            use_case: use_case.map(str::to_string).or_else(|| {
                stored
                    .get("use_case")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }),
        };
        let analysis = analyze(message, Some(&query_context));
        tool_calls.push(ToolCallRecord {
            tool: "query_analysis".to_string(),
            results_count: analysis.variants.len(),
        });

        let results = self
            .fusion
            .search(&analysis, self.config.vector_search_limit, false)
            .await;
        tool_calls.push(ToolCallRecord {
            tool: "pinecone_vector_search".to_string(),
            results_count: results.len(),
        });

        let snippets = results.iter().filter_map(vector_result_to_snippet).collect();
        (Some(analysis), snippets)
    }

    async fn persist_turn(
        &self,
        session_id: &str,
        message: &str,
        response: &str,
        tool_calls: &[ToolCallRecord],
        citations: &[Citation],
    ) {
        if let Err(err) = self
            .memory
            .add_message(session_id, Role::User, message, Vec::new(), Vec::new())
            .await
        {
            tracing::warn!(target: "assistant", error = %err, "failed to store user message");
            return;
        }

        let tool_names = tool_calls.iter().map(|tc| tc.tool.clone()).collect();
        let cited_skus = citations.iter().map(|c| c.sku.clone()).collect();
        if let Err(err) = self
            .memory
            .add_message(session_id, Role::Assistant, response, tool_names, cited_skus)
            .await
        {
            tracing::warn!(target: "assistant", error = %err, "failed to store assistant message");
        }
    }

    async fn remember_preferences(&self, session_id: &str, message: &str) {
        let mut data = Map::new();
        if let Some(budget) = tools::extract_budget(message) {
            data.insert("budget_range".to_string(), json!(budget));
        }
        if let Some(use_case) = tools::extract_use_case(message) {
            data.insert("use_case".to_string(), json!(use_case.as_str()));
        }
        let brands = tools::extract_brands(message);
        if !brands.is_empty() {
            data.insert("preferred_brands".to_string(), json!(brands));
        }
        if data.is_empty() {
            return;
        }
        self.memory
            .update_context(session_id, "user_preferences", data, true)
            .await;
    }
}

fn flatten_history(history: &[HistoryTurn], cap: usize) -> String {
    let skip = history.len().saturating_sub(cap);
    history
        .iter()
        .skip(skip)
        .map(|turn| {
            let role = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            format!("{role}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn session_preferences(
    budget: Option<f64>,
    use_case: Option<String>,
    stored: &Map<String, Value>,
    history_len: usize,
) -> SessionPreferences {
    SessionPreferences {
        budget: budget.or_else(|| stored.get("budget_range").and_then(Value::as_f64)),
        use_case: use_case.or_else(|| {
            stored
                .get("use_case")
                .and_then(Value::as_str)
                .map(str::to_string)
        }),
        preferred_brands: stored
            .get("preferred_brands")
            .and_then(Value::as_array)
            .map(|brands| {
                brands
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        total_messages: (history_len > 0).then_some(history_len),
    }
}

/// Map a product-kind vector hit onto a context snippet. Pdf-kind hits are
/// handled by the dedicated chunk path and skipped here.
fn vector_result_to_snippet(result: &VectorResult) -> Option<ProductSnippet> {
    if result.kind != ResultKind::Product {
        return None;
    }
    let meta = &result.metadata;
    let text_of = |key: &str| meta[key].as_str().map(str::to_string);

    Some(ProductSnippet {
        text: if result.content.is_empty() {
            text_of("text").unwrap_or_default()
        } else {
            result.content.clone()
        },
        product_name: text_of("name").unwrap_or_default(),
        sku: text_of("sku").unwrap_or_else(|| result.id.clone()),
        brand: text_of("brand").unwrap_or_default(),
        price: meta["price"].as_f64(),
        processor: text_of("processor"),
        memory: text_of("memory"),
        storage: text_of("storage"),
        display: text_of("display"),
        availability: text_of("availability"),
        url: text_of("url"),
        vector_score: Some(result.score),
        strategy: Some(result.strategy),
    })
}
