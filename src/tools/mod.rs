// src/tools/mod.rs

//! Keyword-driven tool routing.
//!
//! Inspects one message (optionally with flattened history appended for
//! brand/budget signals) and decides which structured tools should run this
//! turn. Several tools can fire at once; extraction failure downgrades a tool
//! to a less specific invocation rather than suppressing it.

pub mod extract;

pub use extract::{
    extract_brands, extract_budget, extract_product_names, extract_requirements,
    extract_search_terms, extract_use_case, Requirement,
};

use serde::{Deserialize, Serialize};

use crate::query::UseCase;

/// One routed tool call with its extracted parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolInvocation {
    Search {
        query: String,
        /// Caller asked for "best"/"recommend" phrasing inside a search.
        intelligent: bool,
        /// "similar"/"like" phrasing: prefer semantic matching.
        semantic: bool,
        brand_preference: Option<String>,
    },
    Recommendations {
        budget: Option<f64>,
        requirements: Vec<Requirement>,
        use_case: Option<UseCase>,
        brand_preference: Option<String>,
    },
    Comparison {
        products: Vec<String>,
    },
    Analytics,
    Reviews {
        product: Option<String>,
    },
    PriceHistory,
}

impl ToolInvocation {
    pub fn name(&self) -> &'static str {
        match self {
            ToolInvocation::Search { .. } => "search",
            ToolInvocation::Recommendations { .. } => "recommendations",
            ToolInvocation::Comparison { .. } => "comparison",
            ToolInvocation::Analytics => "analytics",
            ToolInvocation::Reviews { .. } => "reviews",
            ToolInvocation::PriceHistory => "price_history",
        }
    }
}

const SEARCH_KEYWORDS: &[&str] = &[
    "find", "search", "show", "list", "browse", "catalog", "available",
    "want", "need", "looking for", "get", "buy", "purchase",
];
const SEARCH_PRODUCT_NAMES: &[&str] = &["laptop", "probook", "thinkpad", "elitebook"];
const REC_KEYWORDS: &[&str] = &[
    "recommend", "suggest", "best", "good", "suitable", "perfect", "help me choose",
];
const COMP_KEYWORDS: &[&str] = &["compare", "vs", "versus", "difference", "which is better"];
const ANALYTICS_KEYWORDS: &[&str] = &[
    "trends", "popular", "statistics", "data", "analytics", "insights",
];
const REVIEW_KEYWORDS: &[&str] = &[
    "reviews", "rating", "feedback", "opinion", "experience", "satisfaction",
];
const PRICE_KEYWORDS: &[&str] = &[
    "price", "cost", "deal", "discount", "sale", "cheap", "expensive", "budget",
];

/// Decide which tools the message calls for. `history` is the flattened
/// recent conversation; brand and budget extraction scan message+history so a
/// budget stated two turns ago still shapes this turn's recommendations.
pub fn route(message: &str, history: &str) -> Vec<ToolInvocation> {
    let message_lower = message.to_lowercase();
    let combined = format!("{message} {history}").to_lowercase();
    let any = |haystack: &str, words: &[&str]| words.iter().any(|w| haystack.contains(w));

    let mut invocations = Vec::new();

    if any(&message_lower, SEARCH_KEYWORDS) || any(&message_lower, SEARCH_PRODUCT_NAMES) {
        let brands = extract_brands(&combined);
        invocations.push(ToolInvocation::Search {
            query: extract_search_terms(message),
            intelligent: message_lower.contains("best") || message_lower.contains("recommend"),
            semantic: message_lower.contains("similar") || message_lower.contains("like"),
            brand_preference: brands.into_iter().next(),
        });
    }

    if any(&message_lower, REC_KEYWORDS) {
        let brands = extract_brands(&combined);
        invocations.push(ToolInvocation::Recommendations {
            budget: extract_budget(&combined),
            requirements: extract_requirements(&combined),
            use_case: extract_use_case(&combined),
            brand_preference: brands.into_iter().next(),
        });
    }

    if any(&message_lower, COMP_KEYWORDS) {
        let products = extract_product_names(message);
        // A comparison needs two sides; one family token is just a mention.
        if products.len() >= 2 {
            invocations.push(ToolInvocation::Comparison { products });
        }
    }

    if any(&message_lower, ANALYTICS_KEYWORDS) {
        invocations.push(ToolInvocation::Analytics);
    }

    if any(&message_lower, REVIEW_KEYWORDS) {
        invocations.push(ToolInvocation::Reviews {
            product: extract_product_names(message).into_iter().next(),
        });
    }

    if any(&message_lower, PRICE_KEYWORDS) {
        invocations.push(ToolInvocation::PriceHistory);
    }

    tracing::debug!(
        target: "tools",
        count = invocations.len(),
        tools = ?invocations.iter().map(|i| i.name()).collect::<Vec<_>>(),
        "routed message to tools"
    );
    invocations
}
