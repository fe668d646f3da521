// src/context/assembler.rs

//! Assembles the grounding context string for the generation prompt.
//!
//! Fixed section order: preference summary, query-analysis line, tools line,
//! authoritative pdf block, separator, product blocks, vector-count summary.
//! The pdf block comes first among content so the model treats it as the
//! higher-priority grounding. No token cap is enforced here; prompt-size
//! limits are the generation provider's concern.

use crate::query::QueryAnalysis;

use super::{RetrievedItem, ToolCallRecord};

pub const NO_PRODUCT_INFO: &str = "No specific product information available.";

const MAX_PDF_BLOCKS: usize = 5;
const MAX_PRODUCT_BLOCKS: usize = 10;
const PDF_CONTENT_PREVIEW: usize = 500;

/// Session-level summary lines rendered at the top of the context.
#[derive(Debug, Clone, Default)]
pub struct SessionPreferences {
    pub budget: Option<f64>,
    pub use_case: Option<String>,
    pub preferred_brands: Vec<String>,
    pub total_messages: Option<usize>,
}

impl SessionPreferences {
    fn summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(budget) = self.budget {
            parts.push(format!("Budget: ${budget}"));
        }
        if let Some(ref use_case) = self.use_case {
            parts.push(format!("Use case: {use_case}"));
        }
        if !self.preferred_brands.is_empty() {
            parts.push(format!("Preferred brands: {}", self.preferred_brands.join(", ")));
        }
        if let Some(total) = self.total_messages {
            parts.push(format!("Conversation messages: {total}"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(format!("Session Context: {}", parts.join(", ")))
        }
    }
}

pub fn build_context(
    items: &[RetrievedItem],
    tool_calls: &[ToolCallRecord],
    query_analysis: Option<&QueryAnalysis>,
    preferences: &SessionPreferences,
) -> String {
    let products: Vec<_> = items.iter().filter_map(RetrievedItem::as_product).collect();
    let pdf_chunks: Vec<_> = items.iter().filter_map(RetrievedItem::as_pdf).collect();

    if products.is_empty() && pdf_chunks.is_empty() {
        return NO_PRODUCT_INFO.to_string();
    }

    let mut parts: Vec<String> = Vec::new();

    if let Some(summary) = preferences.summary() {
        parts.push(summary);
    }

    if let Some(analysis) = query_analysis {
        parts.push(format!(
            "Query Analysis: Intent={}, Strategies={}",
            analysis.intent.as_str(),
            analysis.strategies().join(", ")
        ));
    }

    if !tool_calls.is_empty() {
        let tools: Vec<&str> = tool_calls.iter().map(|tc| tc.tool.as_str()).collect();
        parts.push(format!("Tools used: {}", tools.join(", ")));
    }

    if !pdf_chunks.is_empty() {
        parts.push("=== AUTHORITATIVE PDF DOCUMENTATION ===".to_string());
        for (i, chunk) in pdf_chunks.iter().take(MAX_PDF_BLOCKS).enumerate() {
            let preview: String = chunk.content.chars().take(PDF_CONTENT_PREVIEW).collect();
            parts.push(format!(
                "PDF Source {}: {} (Page {})\nProduct: {}\nRelevance: {}\nContent: {}...",
                i + 1,
                chunk.source,
                chunk.page,
                chunk.product_name,
                chunk.relevance.as_str(),
                preview
            ));
        }
        parts.push("=== END PDF DOCUMENTATION ===".to_string());
    }

    parts.push("---".to_string());

    let mut vector_count = 0usize;
    for (i, product) in products.iter().take(MAX_PRODUCT_BLOCKS).enumerate() {
        let price = product
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        parts.push(format!(
            "\nProduct {}:\n{}\nSKU: {}\nPrice: ${}",
            i + 1,
            product.text,
            if product.sku.is_empty() { "N/A" } else { &product.sku },
            price
        ));

        if let Some(score) = product.vector_score {
            parts.push(format!("Relevance: {score:.3}"));
            vector_count += 1;
        }
        if let Some(strategy) = product.strategy {
            parts.push(format!("Found via: {}", strategy.as_str()));
        }
    }

    if vector_count > 0 {
        parts.push(format!(
            "\n--- Vector Search Results: {vector_count} products with semantic similarity scores ---"
        ));
    }

    parts.join("\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProductSnippet;
    use crate::providers::{PdfChunk, Relevance};
    use crate::query::{analyze, SearchStrategy};

    fn snippet(name: &str, sku: &str, score: Option<f32>) -> RetrievedItem {
        RetrievedItem::Product(ProductSnippet {
            text: format!("Product: {name}\nBrand: HP"),
            product_name: name.into(),
            sku: sku.into(),
            brand: "HP".into(),
            price: Some(1299.0),
            vector_score: score,
            strategy: score.map(|_| SearchStrategy::ContextEnhanced),
            ..Default::default()
        })
    }

    fn pdf(source: &str) -> RetrievedItem {
        RetrievedItem::Pdf(PdfChunk {
            chunk_id: "c1".into(),
            score: 0.9,
            content: "Battery: up to 13 hours.".into(),
            source: source.into(),
            page: 2,
            pdf_url: format!("/specs/{source}"),
            product_name: "HP ProBook 450".into(),
            relevance: Relevance::High,
        })
    }

    #[test]
    fn empty_retrieval_yields_sentinel() {
        let context = build_context(&[], &[], None, &SessionPreferences::default());
        assert_eq!(context, NO_PRODUCT_INFO);
    }

    #[test]
    fn pdf_block_precedes_product_blocks() {
        let items = vec![snippet("HP ProBook 450 G10", "8A5W6EA", Some(0.91)), pdf("probook.pdf")];
        let context = build_context(&items, &[], None, &SessionPreferences::default());

        let pdf_pos = context.find("AUTHORITATIVE PDF DOCUMENTATION").unwrap();
        let product_pos = context.find("Product 1:").unwrap();
        assert!(pdf_pos < product_pos);
        assert!(context.contains("=== END PDF DOCUMENTATION ==="));
        assert!(context.contains("Relevance: 0.910"));
        assert!(context.contains("Found via: context_enhanced"));
        assert!(context.contains("Vector Search Results: 1 products"));
    }

    #[test]
    fn header_lines_in_fixed_order() {
        let prefs = SessionPreferences {
            budget: Some(1500.0),
            use_case: Some("business".into()),
            preferred_brands: vec!["HP".into()],
            total_messages: Some(6),
        };
        let analysis = analyze("best business laptop", None);
        let tools = vec![ToolCallRecord { tool: "search".into(), results_count: 4 }];
        let items = vec![snippet("HP ProBook 450 G10", "8A5W6EA", None)];

        let context = build_context(&items, &tools, Some(&analysis), &prefs);
        let prefs_pos = context.find("Session Context:").unwrap();
        let analysis_pos = context.find("Query Analysis:").unwrap();
        let tools_pos = context.find("Tools used: search").unwrap();
        assert!(prefs_pos < analysis_pos && analysis_pos < tools_pos);
        assert!(context.contains("Intent=recommendation"));
    }
}
