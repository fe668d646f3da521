// src/context/mod.rs

//! Context assembly for the generation step.
//!
//! Everything flowing from retrieval into the prompt is a `RetrievedItem` —
//! a product snippet or a pdf chunk, never an untyped bag. The assembler and
//! prompt builder are pure string functions so they stay trivially testable.

mod assembler;
mod classifier;
mod prompt;

pub use assembler::{build_context, SessionPreferences};
pub use classifier::{classify, MessageType};
pub use prompt::build_prompt;

use serde::{Deserialize, Serialize};

use crate::providers::PdfChunk;
use crate::query::SearchStrategy;

/// One product hit rendered into the prompt context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductSnippet {
    /// Free-text block describing the product (the embedded document body).
    pub text: String,
    pub product_name: String,
    pub sku: String,
    pub brand: String,
    pub price: Option<f64>,
    pub processor: Option<String>,
    pub memory: Option<String>,
    pub storage: Option<String>,
    pub display: Option<String>,
    pub availability: Option<String>,
    pub url: Option<String>,
    pub vector_score: Option<f32>,
    pub strategy: Option<SearchStrategy>,
}

/// Discriminated retrieval result; callers match instead of sniffing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievedItem {
    Product(ProductSnippet),
    Pdf(PdfChunk),
}

impl RetrievedItem {
    pub fn as_product(&self) -> Option<&ProductSnippet> {
        match self {
            RetrievedItem::Product(p) => Some(p),
            RetrievedItem::Pdf(_) => None,
        }
    }

    pub fn as_pdf(&self) -> Option<&PdfChunk> {
        match self {
            RetrievedItem::Pdf(c) => Some(c),
            RetrievedItem::Product(_) => None,
        }
    }
}

/// Record of one tool execution, kept for diagnostics and the context header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub results_count: usize,
}
