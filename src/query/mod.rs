// src/query/mod.rs

//! Query analysis and multi-strategy rewriting.
//!
//! Turns one raw utterance (plus optional caller context) into up to five
//! rewritten query variants, each tagged with the strategy that produced it,
//! alongside extracted features and a single-label intent. All of it is
//! deterministic keyword matching — bucket ordering is part of the observable
//! contract, so the tables below are fixed and first-match-wins.

use serde::{Deserialize, Serialize};

/// Named query-rewriting technique used to diversify vector-search recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    ContextEnhanced,
    FeatureFocused,
    UseCaseOptimized,
    BrandSpecFocused,
    SemanticExpansion,
    Original,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::ContextEnhanced => "context_enhanced",
            SearchStrategy::FeatureFocused => "feature_focused",
            SearchStrategy::UseCaseOptimized => "use_case_optimized",
            SearchStrategy::BrandSpecFocused => "brand_spec_focused",
            SearchStrategy::SemanticExpansion => "semantic_expansion",
            SearchStrategy::Original => "original",
        }
    }

    /// Reliability multiplier applied during result fusion. Context-aware
    /// rewrites have historically produced the best matches, hence the spread.
    pub fn weight(&self) -> f32 {
        match self {
            SearchStrategy::ContextEnhanced => 1.20,
            SearchStrategy::UseCaseOptimized => 1.15,
            SearchStrategy::FeatureFocused => 1.10,
            SearchStrategy::BrandSpecFocused => 1.10,
            SearchStrategy::SemanticExpansion => 1.05,
            SearchStrategy::Original => 1.00,
        }
    }
}

/// Single-label query intent, first matching bucket wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Recommendation,
    Comparison,
    Search,
    Pricing,
    Specification,
    General,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Recommendation => "recommendation",
            QueryIntent::Comparison => "comparison",
            QueryIntent::Search => "search",
            QueryIntent::Pricing => "pricing",
            QueryIntent::Specification => "specification",
            QueryIntent::General => "general",
        }
    }
}

/// Detected buyer use case. Two detection tables exist on purpose: the tool
/// router scans gaming, business, student, creative, programming, travel
/// (`detect`), while retrieval-side extraction scans its own bucket order
/// below. Both orders are first-match-wins and part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    Gaming,
    Business,
    Student,
    Creative,
    Programming,
    Travel,
}

impl UseCase {
    pub const ALL: [UseCase; 6] = [
        UseCase::Gaming,
        UseCase::Business,
        UseCase::Student,
        UseCase::Creative,
        UseCase::Programming,
        UseCase::Travel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::Gaming => "gaming",
            UseCase::Business => "business",
            UseCase::Student => "student",
            UseCase::Creative => "creative",
            UseCase::Programming => "programming",
            UseCase::Travel => "travel",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            UseCase::Gaming => &["gaming", "game", "gamer", "games"],
            UseCase::Business => &["business", "office", "work", "professional", "corporate"],
            UseCase::Student => &["student", "school", "education", "study", "college"],
            UseCase::Creative => &["creative", "design", "photo", "video", "content", "artist"],
            UseCase::Programming => &["programming", "development", "coding", "developer", "software"],
            UseCase::Travel => &["travel", "portable", "mobile", "lightweight", "on-the-go"],
        }
    }

    /// Router-side detection: first-match-wins over `ALL` order.
    pub fn detect(text: &str) -> Option<UseCase> {
        let lower = text.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|uc| uc.keywords().iter().any(|k| lower.contains(k)))
    }

    pub fn parse(s: &str) -> Option<UseCase> {
        let lower = s.to_lowercase();
        Self::ALL.iter().copied().find(|uc| lower.contains(uc.as_str()))
    }
}

/// Features pulled out of the raw query text by bucket matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFeatures {
    pub brands: Vec<String>,
    pub specs: Vec<String>,
    pub features: Vec<String>,
    pub use_case: Option<UseCase>,
    pub price_indicators: Vec<String>,
}

/// One rewritten query plus the strategy that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryVariant {
    pub query: String,
    pub strategy: SearchStrategy,
}

/// Full analysis of one user utterance; one per turn, transient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub original_query: String,
    pub variants: Vec<QueryVariant>,
    pub extracted: ExtractedFeatures,
    pub intent: QueryIntent,
}

impl QueryAnalysis {
    pub fn strategies(&self) -> Vec<&'static str> {
        self.variants.iter().map(|v| v.strategy.as_str()).collect()
    }
}

/// Caller-supplied conversational context that can enhance the rewrite.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub budget: Option<f64>,
    pub use_case: Option<String>,
}

impl QueryContext {
    fn is_empty(&self) -> bool {
        self.budget.is_none() && self.use_case.is_none()
    }
}

const BRANDS: &[&str] = &[
    "hp", "lenovo", "dell", "asus", "acer", "msi", "apple", "microsoft", "samsung",
];

const SPEC_TOKENS: &[&str] = &[
    // memory
    "16gb", "32gb", "8gb", "4gb", "ram", "memory",
    // storage
    "ssd", "nvme", "512gb", "1tb", "256gb", "storage",
    // processor
    "intel", "amd", "ryzen", "core", "i5", "i7", "i9", "processor", "cpu",
    // display
    "4k", "2k", "fhd", "uhd", "touchscreen", "touch", "14 inch", "15 inch",
    // graphics
    "rtx", "gtx", "graphics", "gpu", "nvidia", "radeon",
];

const FEATURE_KEYWORDS: &[&str] = &[
    "lightweight", "portable", "gaming", "business", "professional",
    "touchscreen", "convertible", "2-in-1", "ultrabook", "workstation",
];

const PRICE_INDICATORS: &[&str] = &[
    "budget", "cheap", "affordable", "expensive", "premium", "high-end", "under", "below",
];

/// Retrieval-side use-case buckets. Ordered differently from the router's
/// `UseCase::detect` table (programming before student here) and with its own
/// creative/travel tokens ("editing", no "on-the-go"). "laptop for coding and
/// school" is programming here but student in the router.
const SEARCH_USE_CASE_BUCKETS: &[(UseCase, &[&str])] = &[
    (UseCase::Gaming, &["gaming", "game", "gamer", "games"]),
    (UseCase::Business, &["business", "office", "work", "professional", "corporate"]),
    (UseCase::Programming, &["programming", "development", "coding", "developer", "software"]),
    (UseCase::Student, &["student", "school", "education", "study", "college"]),
    (UseCase::Creative, &["creative", "design", "photo", "video", "content", "editing"]),
    (UseCase::Travel, &["travel", "portable", "mobile", "lightweight"]),
];

fn detect_search_use_case(text: &str) -> Option<UseCase> {
    let lower = text.to_lowercase();
    SEARCH_USE_CASE_BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(uc, _)| *uc)
}

/// Fixed synonym-expansion table; matched by substring against the query.
const SEMANTIC_EXPANSIONS: &[(&str, &str)] = &[
    ("laptop", "notebook computer portable pc"),
    ("fast", "high performance quick speed efficient"),
    ("gaming", "gaming graphics gpu rtx gtx performance"),
    ("business", "professional office work corporate enterprise"),
    ("portable", "lightweight mobile travel compact"),
    ("budget", "affordable inexpensive cost-effective value"),
    ("premium", "high-end expensive top-tier flagship"),
];

pub fn extract_features(query: &str) -> ExtractedFeatures {
    let lower = query.to_lowercase();

    let brands = BRANDS
        .iter()
        .filter(|b| lower.contains(*b))
        .map(|b| b.to_string())
        .collect();

    let specs = SPEC_TOKENS
        .iter()
        .filter(|t| lower.contains(*t))
        .map(|t| t.to_string())
        .collect();

    let features = FEATURE_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .map(|k| k.to_string())
        .collect();

    let price_indicators = PRICE_INDICATORS
        .iter()
        .filter(|t| lower.contains(*t))
        .map(|t| t.to_string())
        .collect();

    ExtractedFeatures {
        brands,
        specs,
        features,
        use_case: detect_search_use_case(query),
        price_indicators,
    }
}

pub fn classify_intent(query: &str) -> QueryIntent {
    let lower = query.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if any(&["recommend", "suggest", "best", "good"]) {
        QueryIntent::Recommendation
    } else if any(&["compare", "vs", "versus", "difference"]) {
        QueryIntent::Comparison
    } else if any(&["find", "search", "show", "list"]) {
        QueryIntent::Search
    } else if any(&["price", "cost", "deal", "discount"]) {
        QueryIntent::Pricing
    } else if any(&["spec", "specification", "detail", "feature"]) {
        QueryIntent::Specification
    } else {
        QueryIntent::General
    }
}

fn semantic_expansion(query: &str) -> Option<String> {
    let lower = query.to_lowercase();
    let expansions: Vec<&str> = SEMANTIC_EXPANSIONS
        .iter()
        .filter(|(term, _)| lower.contains(term))
        .map(|(_, exp)| *exp)
        .collect();

    if expansions.is_empty() {
        None
    } else {
        Some(format!("{} {}", query, expansions.join(" ")))
    }
}

fn format_budget(budget: f64) -> String {
    if budget.fract() == 0.0 {
        format!("{}", budget as i64)
    } else {
        format!("{budget}")
    }
}

/// Analyze a raw query and produce strategy-tagged rewrites.
///
/// Strategies apply conditionally; when none fires the original query comes
/// back as a single `original`-tagged variant so fusion always has input.
pub fn analyze(original_query: &str, context: Option<&QueryContext>) -> QueryAnalysis {
    let extracted = extract_features(original_query);
    let mut variants = Vec::new();

    // 1. Context enhancement: only when the caller actually knows something.
    if let Some(ctx) = context.filter(|c| !c.is_empty()) {
        let mut enhanced = original_query.to_string();
        if let Some(budget) = ctx.budget {
            enhanced.push_str(&format!(" budget under ${}", format_budget(budget)));
        }
        if let Some(ref use_case) = ctx.use_case {
            enhanced.push_str(&format!(" for {use_case}"));
        }
        variants.push(QueryVariant { query: enhanced, strategy: SearchStrategy::ContextEnhanced });
    }

    // 2. Feature-focused.
    if !extracted.features.is_empty() {
        variants.push(QueryVariant {
            query: format!("{} laptop computer", extracted.features.join(" ")),
            strategy: SearchStrategy::FeatureFocused,
        });
    }

    // 3. Use-case optimized.
    if let Some(use_case) = extracted.use_case {
        variants.push(QueryVariant {
            query: format!("{} laptop professional computer", use_case.as_str()),
            strategy: SearchStrategy::UseCaseOptimized,
        });
    }

    // 4. Brand/spec focused.
    if !extracted.brands.is_empty() || !extracted.specs.is_empty() {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(extracted.brands.iter().cloned());
        parts.extend(extracted.specs.iter().cloned());
        parts.push("laptop computer".to_string());
        variants.push(QueryVariant {
            query: parts.join(" "),
            strategy: SearchStrategy::BrandSpecFocused,
        });
    }

    // 5. Semantic expansion.
    if let Some(expanded) = semantic_expansion(original_query) {
        variants.push(QueryVariant { query: expanded, strategy: SearchStrategy::SemanticExpansion });
    }

    if variants.is_empty() {
        variants.push(QueryVariant {
            query: original_query.to_string(),
            strategy: SearchStrategy::Original,
        });
    }

    QueryAnalysis {
        original_query: original_query.to_string(),
        intent: classify_intent(original_query),
        variants,
        extracted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_query_falls_back_to_original_variant() {
        let analysis = analyze("hello there", None);
        assert_eq!(analysis.variants.len(), 1);
        assert_eq!(analysis.variants[0].strategy, SearchStrategy::Original);
        assert_eq!(analysis.variants[0].query, "hello there");
        assert_eq!(analysis.intent, QueryIntent::General);
    }

    #[test]
    fn context_enhancement_appends_budget_and_use_case() {
        let ctx = QueryContext { budget: Some(1200.0), use_case: Some("business".into()) };
        let analysis = analyze("thin laptop", Some(&ctx));

        let enhanced = analysis
            .variants
            .iter()
            .find(|v| v.strategy == SearchStrategy::ContextEnhanced)
            .expect("context_enhanced variant");
        assert_eq!(enhanced.query, "thin laptop budget under $1200 for business");
    }

    #[test]
    fn empty_context_does_not_fire_context_strategy() {
        let ctx = QueryContext::default();
        let analysis = analyze("some unmatchable text", Some(&ctx));
        assert!(analysis
            .variants
            .iter()
            .all(|v| v.strategy != SearchStrategy::ContextEnhanced));
    }

    #[test]
    fn gaming_query_produces_multiple_strategies() {
        let analysis = analyze("best gaming laptop with rtx graphics", None);

        let strategies = analysis.strategies();
        assert!(strategies.contains(&"feature_focused"));
        assert!(strategies.contains(&"use_case_optimized"));
        assert!(strategies.contains(&"brand_spec_focused")); // rtx is a spec token
        assert!(strategies.contains(&"semantic_expansion"));
        assert_eq!(analysis.intent, QueryIntent::Recommendation);
        assert_eq!(analysis.extracted.use_case, Some(UseCase::Gaming));
    }

    #[test]
    fn use_case_bucket_order_is_first_match_wins() {
        // "work" (business) appears alongside "coding" (programming);
        // business sits earlier in both bucket orders and must win.
        assert_eq!(UseCase::detect("laptop for work and coding"), Some(UseCase::Business));
        assert_eq!(
            detect_search_use_case("laptop for work and coding"),
            Some(UseCase::Business)
        );
    }

    #[test]
    fn router_and_search_use_case_tables_diverge() {
        // Programming precedes student only in the retrieval-side order.
        let text = "laptop for coding and school";
        assert_eq!(UseCase::detect(text), Some(UseCase::Student));
        assert_eq!(detect_search_use_case(text), Some(UseCase::Programming));
        assert_eq!(extract_features(text).use_case, Some(UseCase::Programming));

        // "editing" is a retrieval-side creative token only.
        assert_eq!(UseCase::detect("editing workstation"), None);
        assert_eq!(detect_search_use_case("editing workstation"), Some(UseCase::Creative));

        // "on-the-go" is a router-side travel token only.
        assert_eq!(UseCase::detect("something for on-the-go use"), Some(UseCase::Travel));
        assert_eq!(detect_search_use_case("something for on-the-go use"), None);
    }

    #[test]
    fn intent_bucket_order_is_first_match_wins() {
        // "best" (recommendation) beats "compare" (comparison).
        assert_eq!(classify_intent("compare the best options"), QueryIntent::Recommendation);
        assert_eq!(classify_intent("compare these two"), QueryIntent::Comparison);
        assert_eq!(classify_intent("what is the price"), QueryIntent::Pricing);
    }

    #[test]
    fn semantic_expansion_joins_all_matching_terms() {
        let expanded = semantic_expansion("budget laptop").unwrap();
        assert!(expanded.starts_with("budget laptop "));
        assert!(expanded.contains("notebook computer portable pc"));
        assert!(expanded.contains("affordable inexpensive cost-effective value"));
    }

    #[test]
    fn strategy_weights_match_fusion_table() {
        assert_eq!(SearchStrategy::ContextEnhanced.weight(), 1.20);
        assert_eq!(SearchStrategy::UseCaseOptimized.weight(), 1.15);
        assert_eq!(SearchStrategy::FeatureFocused.weight(), 1.10);
        assert_eq!(SearchStrategy::BrandSpecFocused.weight(), 1.10);
        assert_eq!(SearchStrategy::SemanticExpansion.weight(), 1.05);
        assert_eq!(SearchStrategy::Original.weight(), 1.00);
    }
}
