// src/recommend/mod.rs

//! Constraint-based recommendations over the catalog.
//!
//! The scorer is pure and deterministic; the engine wraps it with candidate
//! pooling, ranking, alternatives, trade-off analysis, and market insights.

pub mod compare;
pub mod scorer;

pub use compare::{compare_products, Aspect, AspectScore, ComparisonReport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{Candidate, CatalogStore, VariantFilters};
use crate::error::AssistantError;

/// Structured constraints for a recommendation request. Built per-request,
/// either from explicit input or from free-text extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationConstraints {
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub must_have_features: Vec<String>,
    #[serde(default)]
    pub nice_to_have_features: Vec<String>,
    #[serde(default)]
    pub brands: Vec<String>,
    pub min_rating: Option<f32>,
    #[serde(default)]
    pub use_cases: Vec<String>,
    pub processor_preference: Option<String>,
    pub min_memory_gb: Option<u32>,
    pub min_storage_gb: Option<u32>,
    pub display_size_preference: Option<String>,
}

impl RecommendationConstraints {
    /// Human-readable one-liner used in the response header.
    pub fn summarize(&self) -> String {
        let mut parts = Vec::new();
        if let Some(budget_max) = self.budget_max {
            parts.push(format!("Budget: ${budget_max}"));
        }
        if !self.must_have_features.is_empty() {
            parts.push(format!("Required: {}", self.must_have_features.join(", ")));
        }
        if !self.use_cases.is_empty() {
            parts.push(format!("Use: {}", self.use_cases.join(", ")));
        }
        if !self.brands.is_empty() {
            parts.push(format!("Brands: {}", self.brands.join(", ")));
        }
        if parts.is_empty() {
            "No specific constraints".to_string()
        } else {
            parts.join("; ")
        }
    }

    fn validate(&self, max_results: usize) -> Result<(), AssistantError> {
        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max) {
            if min > max {
                return Err(AssistantError::InvalidConstraints(format!(
                    "budget_min {min} exceeds budget_max {max}"
                )));
            }
        }
        if let Some(rating) = self.min_rating {
            if !(1.0..=5.0).contains(&rating) {
                return Err(AssistantError::InvalidConstraints(format!(
                    "min_rating {rating} outside 1-5"
                )));
            }
        }
        if max_results == 0 {
            return Err(AssistantError::InvalidConstraints(
                "max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub constraints: RecommendationConstraints,
    pub max_results: usize,
    pub include_alternatives: bool,
}

impl Default for RecommendationRequest {
    fn default() -> Self {
        Self {
            constraints: RecommendationConstraints::default(),
            max_results: 5,
            include_alternatives: false,
        }
    }
}

/// Per-dimension sub-scores, each 0-100.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub budget: u8,
    pub specs: u8,
    pub reviews: u8,
    pub features: u8,
    pub use_case: u8,
}

/// Presentation-layer explanation attached to a score. Derived after the
/// number is fixed; it never feeds back into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rationale {
    pub breakdown: ScoreBreakdown,
    pub strengths: Vec<String>,
    pub considerations: Vec<String>,
    pub match_reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: u8,
    pub rationale: Rationale,
}

/// One ranked recommendation in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: String,
    pub variant_id: String,
    pub product_name: String,
    pub brand: String,
    pub price: Option<f64>,
    pub match_score: u8,
    pub rationale: Rationale,
    pub best_for: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub constraints_summary: String,
    pub recommendations: Vec<Recommendation>,
    pub alternatives: Option<Vec<Recommendation>>,
    pub trade_offs: Vec<String>,
    pub insights: Vec<String>,
    pub no_match_reason: Option<String>,
}

pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    pool_limit: usize,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, pool_limit: usize) -> Self {
        Self { catalog, pool_limit }
    }

    pub async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, AssistantError> {
        let constraints = &request.constraints;
        constraints.validate(request.max_results)?;

        let request_id = Uuid::new_v4();
        let filters = to_filters(constraints);
        let mut candidates = self
            .catalog
            .query_variants(&filters, self.pool_limit)
            .await
            .map_err(AssistantError::Store)?;

        // Hard feature requirements are a filter, not a scoring signal.
        if !constraints.must_have_features.is_empty() {
            candidates.retain(|c| {
                constraints
                    .must_have_features
                    .iter()
                    .all(|f| scorer::candidate_has_feature(c, f))
            });
        }

        if candidates.is_empty() {
            tracing::info!(target: "recommend", %request_id, "no candidates match constraints");
            return Ok(RecommendationResponse {
                request_id,
                timestamp: Utc::now(),
                constraints_summary: constraints.summarize(),
                recommendations: Vec::new(),
                alternatives: None,
                trade_offs: Vec::new(),
                insights: Vec::new(),
                no_match_reason: Some("No products match the specified criteria".to_string()),
            });
        }

        let scored = scorer::rank(
            candidates
                .iter()
                .map(|c| scorer::score(c, constraints))
                .collect(),
        );

        let recommendations: Vec<Recommendation> = scored
            .iter()
            .take(request.max_results)
            .map(|s| build_recommendation(s, constraints))
            .collect();

        let alternatives = if request.include_alternatives && scored.len() > request.max_results {
            Some(
                scored
                    .iter()
                    .skip(request.max_results)
                    .take(3)
                    .map(|s| build_recommendation(s, constraints))
                    .collect(),
            )
        } else {
            None
        };

        let trade_offs = analyze_trade_offs(constraints, &candidates);
        let insights = market_insights(&candidates);

        tracing::info!(
            target: "recommend",
            %request_id,
            pool = candidates.len(),
            returned = recommendations.len(),
            "recommendations ready"
        );

        Ok(RecommendationResponse {
            request_id,
            timestamp: Utc::now(),
            constraints_summary: constraints.summarize(),
            recommendations,
            alternatives,
            trade_offs,
            insights,
            no_match_reason: None,
        })
    }

    pub async fn compare(
        &self,
        product_ids: &[String],
        aspects: Option<Vec<Aspect>>,
    ) -> Result<ComparisonReport, AssistantError> {
        compare_products(self.catalog.as_ref(), product_ids, aspects).await
    }
}

fn to_filters(constraints: &RecommendationConstraints) -> VariantFilters {
    let mut filters = VariantFilters {
        brands: constraints.brands.clone(),
        min_price: constraints.budget_min,
        max_price: constraints.budget_max,
        min_memory_gb: constraints.min_memory_gb,
        min_storage_gb: constraints.min_storage_gb,
        min_rating: constraints.min_rating,
        ..Default::default()
    };

    if let Some(ref proc_pref) = constraints.processor_preference {
        let lower = proc_pref.to_lowercase();
        if lower.contains("intel") {
            filters.processor_contains = Some("intel".to_string());
        } else if lower.contains("amd") {
            filters.processor_contains = Some("amd".to_string());
        }
    }

    if let Some(ref size_pref) = constraints.display_size_preference {
        if size_pref.contains("14") {
            filters.min_display_inches = Some(13.9);
            filters.max_display_inches = Some(14.1);
        } else if size_pref.contains("15") {
            filters.min_display_inches = Some(15.0);
            filters.max_display_inches = Some(15.9);
        }
    }

    filters
}

fn build_recommendation(
    scored: &ScoredCandidate,
    constraints: &RecommendationConstraints,
) -> Recommendation {
    let candidate = &scored.candidate;
    let mut best_for: Vec<String> = constraints
        .use_cases
        .iter()
        .map(|uc| format!("{uc} professionals"))
        .collect();
    if candidate.memory_gb.unwrap_or(0) >= 16 {
        best_for.push("Power users".to_string());
    }
    if candidate.display_inches.is_some_and(|d| d <= 14.0) {
        best_for.push("Mobile professionals".to_string());
    }
    best_for.truncate(3);

    Recommendation {
        product_id: candidate.product_id.clone(),
        variant_id: candidate.id.clone(),
        product_name: candidate.product_name.clone(),
        brand: candidate.brand.clone(),
        price: candidate.price,
        match_score: scored.score,
        rationale: scored.rationale.clone(),
        best_for,
    }
}

fn analyze_trade_offs(
    constraints: &RecommendationConstraints,
    candidates: &[Candidate],
) -> Vec<String> {
    let mut trade_offs = Vec::new();

    if let Some(budget_max) = constraints.budget_max {
        let cheapest_over = candidates
            .iter()
            .filter_map(|c| c.price.filter(|p| *p > budget_max))
            .fold(None::<f64>, |acc, p| Some(acc.map_or(p, |m| m.min(p))));
        if let Some(price) = cheapest_over {
            trade_offs.push(format!(
                "Consider increasing budget by ${:.0} for significantly better options",
                price - budget_max
            ));
        }
    }

    if !constraints.must_have_features.is_empty() {
        let missing: Vec<&str> = constraints
            .must_have_features
            .iter()
            .filter(|f| {
                !candidates
                    .iter()
                    .take(5)
                    .any(|c| scorer::candidate_has_feature(c, f))
            })
            .map(|f| f.as_str())
            .collect();
        if !missing.is_empty() {
            trade_offs.push(format!("Limited options with: {}", missing.join(", ")));
        }
    }

    trade_offs
}

fn market_insights(candidates: &[Candidate]) -> Vec<String> {
    let mut insights = Vec::new();

    let prices: Vec<f64> = candidates.iter().filter_map(|c| c.price).collect();
    if !prices.is_empty() {
        let min = prices.iter().cloned().fold(f64::MAX, f64::min);
        let max = prices.iter().cloned().fold(f64::MIN, f64::max);
        let avg = prices.iter().sum::<f64>() / prices.len() as f64;
        insights.push(format!("Price range: ${min:.0} - ${max:.0} (avg: ${avg:.0})"));
    }

    let mut brands: HashMap<&str, usize> = HashMap::new();
    for candidate in candidates.iter().take(10) {
        *brands.entry(candidate.brand.as_str()).or_insert(0) += 1;
    }
    if let Some((brand, count)) = brands.into_iter().max_by_key(|(_, n)| *n) {
        insights.push(format!("{brand} has most options ({count} models)"));
    }

    insights
}
