// src/catalog/mod.rs

//! Candidate (product variant) data model and the catalog seam.
//!
//! The catalog is an external collaborator: the assistant only reads from it.
//! All storage and filtering goes through `CatalogStore` — no direct DB calls
//! in the scoring or orchestration logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Aggregated review data embedded on a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub average_rating: Option<f32>,
    pub total_reviews: u32,
}

/// A product variant under consideration for recommendation or citation.
/// Owned by the catalog subsystem; read-only from the assistant's perspective.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub brand: String,
    pub model_family: Option<String>,
    pub sku: String,
    pub processor: Option<String>,
    pub memory_gb: Option<u32>,
    pub storage_gb: Option<u32>,
    pub storage_type: Option<String>,
    pub display_inches: Option<f32>,
    pub graphics: Option<String>,
    pub price: Option<f64>,
    pub availability: Option<String>,
    /// Boolean feature flags, e.g. "has_touchscreen", "has_fingerprint".
    pub features: HashMap<String, bool>,
    pub review_summary: Option<ReviewSummary>,
    pub url: Option<String>,
}

impl Candidate {
    /// Flag lookup used by feature scoring; absent flags count as false.
    pub fn has_feature(&self, flag: &str) -> bool {
        self.features.get(flag).copied().unwrap_or(false)
    }
}

/// Filter predicates for `CatalogStore::query_variants`.
#[derive(Debug, Clone, Default)]
pub struct VariantFilters {
    pub brands: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_memory_gb: Option<u32>,
    pub min_storage_gb: Option<u32>,
    pub processor_contains: Option<String>,
    pub min_display_inches: Option<f32>,
    pub max_display_inches: Option<f32>,
    pub min_rating: Option<f32>,
    pub query: Option<String>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Candidate variants matching the filter predicates, capped at `limit`.
    async fn query_variants(&self, filters: &VariantFilters, limit: usize)
        -> anyhow::Result<Vec<Candidate>>;

    /// Single variant by id.
    async fn get_variant(&self, id: &str) -> anyhow::Result<Option<Candidate>>;

    /// All variants for a product, cheapest first (comparison picks the head).
    async fn variants_for_product(&self, product_id: &str) -> anyhow::Result<Vec<Candidate>>;
}

/// In-memory catalog. Backs tests and deployments that preload the product
/// set at startup instead of attaching a relational store.
#[derive(Default)]
pub struct InMemoryCatalog {
    variants: RwLock<BTreeMap<String, Candidate>>,
}

impl InMemoryCatalog {
    pub fn new(variants: impl IntoIterator<Item = Candidate>) -> Self {
        let map = variants.into_iter().map(|v| (v.id.clone(), v)).collect();
        Self { variants: RwLock::new(map) }
    }

    pub fn insert(&self, candidate: Candidate) {
        self.variants
            .write()
            .expect("catalog lock poisoned")
            .insert(candidate.id.clone(), candidate);
    }

    fn matches(candidate: &Candidate, filters: &VariantFilters) -> bool {
        if !filters.brands.is_empty()
            && !filters
                .brands
                .iter()
                .any(|b| candidate.brand.eq_ignore_ascii_case(b))
        {
            return false;
        }
        if let (Some(min), Some(price)) = (filters.min_price, candidate.price) {
            if price < min {
                return false;
            }
        }
        if let Some(max) = filters.max_price {
            match candidate.price {
                Some(price) if price <= max => {}
                _ => return false,
            }
        }
        if let Some(min) = filters.min_memory_gb {
            if candidate.memory_gb.unwrap_or(0) < min {
                return false;
            }
        }
        if let Some(min) = filters.min_storage_gb {
            if candidate.storage_gb.unwrap_or(0) < min {
                return false;
            }
        }
        if let Some(ref frag) = filters.processor_contains {
            let proc = candidate.processor.as_deref().unwrap_or("");
            if !proc.to_lowercase().contains(&frag.to_lowercase()) {
                return false;
            }
        }
        if let Some(min) = filters.min_display_inches {
            if candidate.display_inches.unwrap_or(0.0) < min {
                return false;
            }
        }
        if let Some(max) = filters.max_display_inches {
            if candidate.display_inches.unwrap_or(f32::MAX) > max {
                return false;
            }
        }
        if let Some(min) = filters.min_rating {
            let rating = candidate
                .review_summary
                .as_ref()
                .and_then(|r| r.average_rating)
                .unwrap_or(0.0);
            if rating < min {
                return false;
            }
        }
        if let Some(ref q) = filters.query {
            let q = q.to_lowercase();
            let haystack = format!(
                "{} {} {}",
                candidate.product_name,
                candidate.brand,
                candidate.processor.as_deref().unwrap_or("")
            )
            .to_lowercase();
            // Any query token matching is enough; free-text search is fuzzy here.
            if !q.split_whitespace().any(|tok| haystack.contains(tok)) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn query_variants(
        &self,
        filters: &VariantFilters,
        limit: usize,
    ) -> anyhow::Result<Vec<Candidate>> {
        let variants = self.variants.read().expect("catalog lock poisoned");
        Ok(variants
            .values()
            .filter(|v| Self::matches(v, filters))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_variant(&self, id: &str) -> anyhow::Result<Option<Candidate>> {
        let variants = self.variants.read().expect("catalog lock poisoned");
        Ok(variants.get(id).cloned())
    }

    async fn variants_for_product(&self, product_id: &str) -> anyhow::Result<Vec<Candidate>> {
        let variants = self.variants.read().expect("catalog lock poisoned");
        let mut hits: Vec<Candidate> = variants
            .values()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            a.price
                .unwrap_or(f64::MAX)
                .partial_cmp(&b.price.unwrap_or(f64::MAX))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, brand: &str, price: f64, memory: u32) -> Candidate {
        Candidate {
            id: id.into(),
            product_id: format!("p-{id}"),
            product_name: format!("{brand} Laptop {id}"),
            brand: brand.into(),
            sku: format!("SKU-{id}"),
            price: Some(price),
            memory_gb: Some(memory),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn filters_by_brand_and_price() {
        let catalog = InMemoryCatalog::new([
            candidate("a", "HP", 999.0, 8),
            candidate("b", "Lenovo", 1299.0, 16),
            candidate("c", "HP", 1899.0, 32),
        ]);

        let filters = VariantFilters {
            brands: vec!["hp".into()],
            max_price: Some(1500.0),
            ..Default::default()
        };
        let hits = catalog.query_variants(&filters, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn unpriced_variants_fail_max_price_filter() {
        let mut unpriced = candidate("x", "Dell", 0.0, 8);
        unpriced.price = None;
        let catalog = InMemoryCatalog::new([unpriced]);

        let filters = VariantFilters { max_price: Some(2000.0), ..Default::default() };
        assert!(catalog.query_variants(&filters, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn product_variants_sorted_cheapest_first() {
        let mut a = candidate("a", "HP", 1599.0, 16);
        let mut b = candidate("b", "HP", 1299.0, 16);
        a.product_id = "probook".into();
        b.product_id = "probook".into();
        let catalog = InMemoryCatalog::new([a, b]);

        let hits = catalog.variants_for_product("probook").await.unwrap();
        assert_eq!(hits[0].id, "b");
    }
}
