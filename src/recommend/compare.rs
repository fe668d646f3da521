// src/recommend/compare.rs

//! Side-by-side product comparison.
//!
//! Each product is represented by its cheapest variant. Every aspect produces
//! a numeric value plus a display string; the overall winner is the product
//! with the highest rank-sum across aspects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::{Candidate, CatalogStore};
use crate::error::AssistantError;

/// Comparable product dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Price,
    Performance,
    BatteryLife,
    BuildQuality,
    Value,
}

impl Aspect {
    pub const DEFAULT: [Aspect; 5] = [
        Aspect::Price,
        Aspect::Performance,
        Aspect::BatteryLife,
        Aspect::BuildQuality,
        Aspect::Value,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Price => "price",
            Aspect::Performance => "performance",
            Aspect::BatteryLife => "battery_life",
            Aspect::BuildQuality => "build_quality",
            Aspect::Value => "value",
        }
    }
}

/// Numeric value for ranking plus a human-facing rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspectScore {
    pub value: f64,
    pub display: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub product_ids: Vec<String>,
    pub aspects: Vec<Aspect>,
    pub winner: Option<String>,
    pub winner_rationale: String,
    /// aspect -> product_id -> score
    pub detailed_comparison: HashMap<Aspect, HashMap<String, AspectScore>>,
    pub use_case_winners: HashMap<String, String>,
    pub verdict: String,
}

/// Compare products by their cheapest variant. Unknown ids are skipped;
/// fewer than two resolvable products is an error.
pub async fn compare_products(
    catalog: &dyn CatalogStore,
    product_ids: &[String],
    aspects: Option<Vec<Aspect>>,
) -> Result<ComparisonReport, AssistantError> {
    let aspects = aspects.unwrap_or_else(|| Aspect::DEFAULT.to_vec());

    let mut products: Vec<Candidate> = Vec::new();
    for product_id in product_ids {
        let variants = catalog
            .variants_for_product(product_id)
            .await
            .map_err(AssistantError::Store)?;
        if let Some(cheapest) = variants.into_iter().next() {
            products.push(cheapest);
        } else {
            tracing::warn!(target: "recommend", product_id, "unknown product skipped in comparison");
        }
    }

    if products.len() < 2 {
        return Err(AssistantError::NotEnoughProducts(products.len()));
    }

    let mut detailed_comparison = HashMap::new();
    for aspect in &aspects {
        let mut per_product = HashMap::new();
        for candidate in &products {
            per_product.insert(candidate.product_id.clone(), score_aspect(candidate, *aspect));
        }
        detailed_comparison.insert(*aspect, per_product);
    }

    let (winner, winner_rationale) = determine_winner(&products, &detailed_comparison);
    let use_case_winners = use_case_winners(&products);
    let verdict = match &winner {
        Some(id) => {
            let name = products
                .iter()
                .find(|c| &c.product_id == id)
                .map(|c| c.product_name.as_str())
                .unwrap_or("The winner");
            format!("{name} offers the best overall value with strong performance and competitive pricing")
        }
        None => "All products have similar value propositions with different strengths".to_string(),
    };

    Ok(ComparisonReport {
        product_ids: product_ids.to_vec(),
        aspects,
        winner,
        winner_rationale,
        detailed_comparison,
        use_case_winners,
        verdict,
    })
}

fn score_aspect(candidate: &Candidate, aspect: Aspect) -> AspectScore {
    match aspect {
        Aspect::Price => match candidate.price {
            Some(price) => AspectScore { value: price, display: format!("${price}") },
            None => AspectScore { value: 0.0, display: "N/A".to_string() },
        },
        Aspect::Performance => {
            let mut score = 50;
            if candidate
                .processor
                .as_deref()
                .is_some_and(|p| p.contains("i7") || p.contains("Ultra"))
            {
                score += 25;
            }
            if candidate.memory_gb.unwrap_or(0) >= 16 {
                score += 25;
            }
            AspectScore { value: f64::from(score), display: format!("{score}/100") }
        }
        // No battery data in the catalog yet; flat estimate.
        Aspect::BatteryLife => AspectScore {
            value: 75.0,
            display: "8-10 hours (est.)".to_string(),
        },
        Aspect::BuildQuality => {
            let rating = candidate
                .review_summary
                .as_ref()
                .and_then(|s| s.average_rating)
                .unwrap_or(3.5);
            let score = ((f64::from(rating) / 5.0) * 100.0) as i64;
            AspectScore { value: score as f64, display: format!("{rating}/5 stars") }
        }
        Aspect::Value => {
            let price = candidate.price.unwrap_or(1500.0);
            let mut performance = 50.0;
            if candidate.memory_gb.unwrap_or(0) >= 16 {
                performance += 25.0;
            }
            if candidate.storage_type.as_deref().is_some_and(|s| s.contains("SSD")) {
                performance += 15.0;
            }
            let value = ((performance / price) * 10000.0) as i64;
            AspectScore { value: value as f64, display: format!("{value} pts") }
        }
    }
}

/// Rank-sum across aspects: each aspect ranks products by value descending,
/// first place earns N points down to 1 for last. Highest total wins.
fn determine_winner(
    products: &[Candidate],
    detailed: &HashMap<Aspect, HashMap<String, AspectScore>>,
) -> (Option<String>, String) {
    let mut totals: HashMap<&str, usize> = HashMap::new();

    for per_product in detailed.values() {
        let mut ranked: Vec<(&String, &AspectScore)> = per_product.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.value
                .partial_cmp(&a.1.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let n = ranked.len();
        for (rank, (product_id, _)) in ranked.into_iter().enumerate() {
            *totals.entry(product_id.as_str()).or_insert(0) += n - rank;
        }
    }

    let Some((winner_id, _)) = totals.into_iter().max_by_key(|(_, points)| *points) else {
        return (None, "Unable to determine winner".to_string());
    };
    let winner_id = winner_id.to_string();

    let rationale = products
        .iter()
        .find(|c| c.product_id == winner_id)
        .map(|c| {
            format!(
                "{} wins with best overall balance across price, performance, and features",
                c.product_name
            )
        })
        .unwrap_or_else(|| "Unable to determine winner".to_string());

    (Some(winner_id), rationale)
}

fn use_case_winners(products: &[Candidate]) -> HashMap<String, String> {
    let mut winners = HashMap::new();

    let business_winner = products
        .iter()
        .map(|c| {
            let mut score = 0;
            if c.memory_gb.unwrap_or(0) >= 16 {
                score += 20;
            }
            if c.storage_type.as_deref().is_some_and(|s| s.contains("SSD")) {
                score += 15;
            }
            if c.brand == "HP" || c.brand == "Lenovo" {
                score += 10;
            }
            (c.product_id.as_str(), score)
        })
        .max_by_key(|(_, score)| *score);
    if let Some((product_id, _)) = business_winner {
        winners.insert("business".to_string(), product_id.to_string());
    }

    let budget_winner = products
        .iter()
        .min_by(|a, b| {
            a.price
                .unwrap_or(9999.0)
                .partial_cmp(&b.price.unwrap_or(9999.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|c| c.product_id.clone());
    if let Some(product_id) = budget_winner {
        winners.insert("budget".to_string(), product_id);
    }

    winners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, ReviewSummary};

    fn variant(product_id: &str, name: &str, price: f64, memory: u32, rating: f32) -> Candidate {
        Candidate {
            id: format!("{product_id}-v1"),
            product_id: product_id.into(),
            product_name: name.into(),
            brand: "HP".into(),
            sku: format!("SKU-{product_id}"),
            price: Some(price),
            memory_gb: Some(memory),
            storage_type: Some("NVMe SSD".into()),
            review_summary: Some(ReviewSummary {
                average_rating: Some(rating),
                total_reviews: 120,
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn needs_two_resolvable_products() {
        let catalog = InMemoryCatalog::new([variant("probook", "HP ProBook 450", 1199.0, 16, 4.4)]);
        let ids = vec!["probook".to_string(), "ghost".to_string()];
        let err = compare_products(&catalog, &ids, None).await.unwrap_err();
        assert!(matches!(err, AssistantError::NotEnoughProducts(1)));
    }

    #[tokio::test]
    async fn build_quality_maps_rating_to_percent() {
        let catalog = InMemoryCatalog::new([
            variant("a", "HP ProBook 450", 1199.0, 16, 4.8),
            variant("b", "HP EliteBook 840", 1599.0, 16, 3.9),
        ]);
        let ids = vec!["a".to_string(), "b".to_string()];
        let report = compare_products(&catalog, &ids, None).await.unwrap();

        let build = &report.detailed_comparison[&Aspect::BuildQuality];
        assert_eq!(build["a"].value, 96.0);
        assert_eq!(build["a"].display, "4.8/5 stars");
        assert_eq!(build["b"].value, 78.0);
    }

    #[tokio::test]
    async fn cheapest_product_wins_budget_use_case() {
        let catalog = InMemoryCatalog::new([
            variant("a", "HP ProBook 450", 1199.0, 16, 4.4),
            variant("b", "HP EliteBook 840", 1599.0, 16, 4.6),
        ]);
        let ids = vec!["a".to_string(), "b".to_string()];
        let report = compare_products(&catalog, &ids, None).await.unwrap();

        assert_eq!(report.use_case_winners["budget"], "a");
        assert!(report.winner.is_some());
        assert!(report.verdict.contains("best overall value"));
    }

    #[tokio::test]
    async fn comparison_uses_cheapest_variant_per_product() {
        let expensive = Candidate {
            id: "a-v2".into(),
            price: Some(1999.0),
            ..variant("a", "HP ProBook 450", 1199.0, 16, 4.4)
        };
        let catalog = InMemoryCatalog::new([
            variant("a", "HP ProBook 450", 1199.0, 16, 4.4),
            expensive,
            variant("b", "Lenovo ThinkPad E14", 1099.0, 16, 4.2),
        ]);
        let ids = vec!["a".to_string(), "b".to_string()];
        let report = compare_products(&catalog, &ids, None).await.unwrap();

        assert_eq!(report.detailed_comparison[&Aspect::Price]["a"].value, 1199.0);
    }
}
