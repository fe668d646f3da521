// src/assistant/exec.rs

//! Tool execution against the catalog, fallback product injection, citation
//! extraction, and per-turn recommendation scoring.
//!
//! Every executor degrades to an empty document set on error — a broken tool
//! must never abort the chat turn.

use crate::catalog::{Candidate, CatalogStore, VariantFilters};
use crate::context::ProductSnippet;
use crate::recommend::{
    scorer, Rationale, RecommendationConstraints, RecommendationEngine, RecommendationRequest,
};
use crate::tools::{self, Requirement, ToolInvocation};

/// Representative catalog entries injected when retrieval comes up empty for
/// a generic laptop/budget request. Keeps the assistant useful while the
/// index is cold.
pub(super) const FALLBACK_PRODUCTS: &[(&str, &str, f64, &str, &str, &str, &str, &str)] = &[
    (
        "HP ProBook 450 G10",
        "8A5W6EA",
        1299.0,
        "13th Gen Intel Core i5-1335U",
        "16GB DDR4",
        "512GB NVMe SSD",
        "15.6 inch FHD",
        "Intel Iris Xe Graphics",
    ),
    (
        "HP ProBook 440 G11",
        "9H8Y7EA",
        1599.0,
        "Intel Core Ultra 5 125U",
        "16GB DDR5",
        "512GB NVMe SSD",
        "14 inch FHD",
        "Intel Graphics",
    ),
    (
        "HP EliteBook 840 G11",
        "A2H72EA",
        1899.0,
        "Intel Core Ultra 7 155U",
        "32GB DDR5",
        "1TB NVMe SSD",
        "14 inch WUXGA",
        "Intel Arc Graphics",
    ),
    (
        "HP EliteBook 865 G11",
        "A44LKUA",
        1799.0,
        "AMD Ryzen 7 PRO 7840U",
        "16GB DDR5",
        "512GB NVMe SSD",
        "16 inch FHD+",
        "AMD Radeon Graphics",
    ),
];

/// Fallback list filtered by budget when one is known, else the top three.
pub(super) fn fallback_products(budget: Option<f64>) -> Vec<ProductSnippet> {
    let rows: Vec<_> = match budget {
        Some(budget) => FALLBACK_PRODUCTS
            .iter()
            .filter(|row| row.2 <= budget)
            .collect(),
        None => FALLBACK_PRODUCTS.iter().take(3).collect(),
    };

    rows.into_iter()
        .map(|&(name, sku, price, processor, memory, storage, display, graphics)| {
            ProductSnippet {
                text: format!(
                    "Product: {name}\nBrand: HP\nProcessor: {processor}\nMemory: {memory}\n\
                     Storage: {storage}\nPrice: ${price}\nDisplay: {display}\nGraphics: {graphics}"
                ),
                product_name: name.to_string(),
                sku: sku.to_string(),
                brand: "HP".to_string(),
                price: Some(price),
                processor: Some(processor.to_string()),
                memory: Some(memory.to_string()),
                storage: Some(storage.to_string()),
                display: Some(display.to_string()),
                availability: Some("In Stock".to_string()),
                url: Some(format!("/products/{sku}")),
                vector_score: None,
                strategy: None,
            }
        })
        .collect()
}

/// Canned replies used when the generation provider is down.
pub(super) fn fallback_response(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("budget") || lower.contains("price") {
        "I can help you find laptops within your budget. Our catalog includes HP ProBook and \
         Lenovo ThinkPad models ranging from $999 to $1499. Could you specify your budget range?"
            .to_string()
    } else if lower.contains("recommend") || lower.contains("suggest") {
        "I'd be happy to recommend a laptop for you. Our catalog features business laptops from \
         HP and Lenovo with various configurations. What's your intended use case and budget?"
            .to_string()
    } else if lower.contains("compare") {
        "I can help you compare different laptop models. We have HP ProBook 440 G11, HP ProBook \
         450 G10, and Lenovo ThinkPad E14 Gen 5 models available with different configurations."
            .to_string()
    } else {
        "I'm here to help you find the perfect business laptop from our HP and Lenovo catalog. \
         What specific features or requirements are you looking for?"
            .to_string()
    }
}

pub(super) fn candidate_to_snippet(candidate: &Candidate) -> ProductSnippet {
    let price_str = candidate
        .price
        .map(|p| format!("${p:.2}"))
        .unwrap_or_else(|| "Contact for pricing".to_string());
    let memory = candidate.memory_gb.map(|m| format!("{m}GB"));
    let storage = match (candidate.storage_gb, candidate.storage_type.as_deref()) {
        (Some(gb), Some(kind)) => Some(format!("{gb}GB {kind}")),
        (Some(gb), None) => Some(format!("{gb}GB")),
        (None, kind) => kind.map(str::to_string),
    };
    let display = candidate.display_inches.map(|d| format!("{d} inch"));

    ProductSnippet {
        text: format!(
            "Product: {}\nBrand: {}\nProcessor: {}\nMemory: {}\nStorage: {}\nPrice: {}\n\
             Display: {}\nGraphics: {}\nSKU: {}\nAvailability: {}",
            candidate.product_name,
            candidate.brand,
            candidate.processor.as_deref().unwrap_or("Intel Core"),
            memory.as_deref().unwrap_or("8GB"),
            storage.as_deref().unwrap_or("256GB SSD"),
            price_str,
            display.as_deref().unwrap_or("14 inch"),
            candidate.graphics.as_deref().unwrap_or("Integrated Graphics"),
            candidate.sku,
            candidate.availability.as_deref().unwrap_or("In Stock"),
        ),
        product_name: candidate.product_name.clone(),
        sku: candidate.sku.clone(),
        brand: candidate.brand.clone(),
        price: candidate.price,
        processor: candidate.processor.clone(),
        memory,
        storage,
        display,
        availability: candidate.availability.clone(),
        url: Some(format!("/products/{}", candidate.sku)),
        vector_score: None,
        strategy: None,
    }
}

/// Reconstruct a scorable candidate from a snippet (vector hits and fallback
/// rows carry spec strings, not structured fields).
pub(super) fn snippet_to_candidate(snippet: &ProductSnippet) -> Candidate {
    Candidate {
        id: snippet.sku.clone(),
        product_id: snippet.sku.clone(),
        product_name: snippet.product_name.clone(),
        brand: snippet.brand.clone(),
        sku: snippet.sku.clone(),
        processor: snippet.processor.clone(),
        memory_gb: snippet.memory.as_deref().and_then(parse_gb),
        storage_gb: snippet.storage.as_deref().and_then(parse_gb),
        storage_type: snippet.storage.clone(),
        display_inches: snippet.display.as_deref().and_then(parse_leading_f32),
        price: snippet.price,
        availability: snippet.availability.clone(),
        url: snippet.url.clone(),
        ..Default::default()
    }
}

fn parse_gb(text: &str) -> Option<u32> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    let value: u32 = digits.parse().ok()?;
    if text[digits.len()..].trim_start().to_lowercase().starts_with("tb") {
        Some(value * 1024)
    } else {
        Some(value)
    }
}

fn parse_leading_f32(text: &str) -> Option<f32> {
    let prefix: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    prefix.parse().ok()
}

/// Run one routed tool against the catalog. Comparison and price history are
/// routed but return no documents; their dispatch is still recorded upstream.
pub(super) async fn execute_tool(
    catalog: &dyn CatalogStore,
    engine: &RecommendationEngine,
    invocation: &ToolInvocation,
    message: &str,
) -> Vec<ProductSnippet> {
    let result = match invocation {
        ToolInvocation::Search { query, brand_preference, .. } => {
            execute_search(catalog, query, brand_preference.as_deref(), message).await
        }
        ToolInvocation::Recommendations { budget, requirements, use_case, brand_preference } => {
            execute_recommendations(
                engine,
                *budget,
                requirements,
                use_case.map(|u| u.as_str().to_string()),
                brand_preference.clone(),
            )
            .await
        }
        ToolInvocation::Analytics => execute_analytics(catalog).await,
        ToolInvocation::Reviews { product } => execute_reviews(catalog, product.as_deref()).await,
        ToolInvocation::Comparison { .. } | ToolInvocation::PriceHistory => Ok(Vec::new()),
    };

    match result {
        Ok(snippets) => snippets,
        Err(err) => {
            tracing::error!(
                target: "assistant",
                tool = invocation.name(),
                error = %err,
                "tool execution failed"
            );
            Vec::new()
        }
    }
}

async fn execute_search(
    catalog: &dyn CatalogStore,
    query: &str,
    brand_preference: Option<&str>,
    message: &str,
) -> anyhow::Result<Vec<ProductSnippet>> {
    let budget = tools::extract_budget(message);
    let requirements = tools::extract_requirements(message);

    let mut search_query = query.to_string();
    if let Some(brand) = brand_preference {
        if !search_query.to_lowercase().contains(&brand.to_lowercase()) {
            search_query = format!("{brand} {search_query}");
        }
    }

    let filters = VariantFilters {
        brands: brand_preference.map(|b| vec![b.to_string()]).unwrap_or_default(),
        max_price: budget,
        min_memory_gb: requirements.iter().find_map(|r| match r {
            Requirement::HighMemory => Some(16),
            Requirement::StandardMemory => Some(8),
            _ => None,
        }),
        query: Some(search_query),
        ..Default::default()
    };

    let hits = catalog.query_variants(&filters, 8).await?;
    Ok(hits.iter().map(candidate_to_snippet).collect())
}

async fn execute_recommendations(
    engine: &RecommendationEngine,
    budget: Option<f64>,
    requirements: &[Requirement],
    use_case: Option<String>,
    brand_preference: Option<String>,
) -> anyhow::Result<Vec<ProductSnippet>> {
    let constraints = RecommendationConstraints {
        budget_max: budget,
        brands: brand_preference.into_iter().collect(),
        use_cases: use_case.into_iter().collect(),
        min_memory_gb: requirements.iter().find_map(|r| match r {
            Requirement::HighMemory => Some(16),
            Requirement::StandardMemory => Some(8),
            _ => None,
        }),
        min_storage_gb: requirements.iter().find_map(|r| match r {
            Requirement::LargeStorage => Some(1024),
            Requirement::MediumStorage => Some(512),
            Requirement::SmallStorage => Some(256),
            _ => None,
        }),
        ..Default::default()
    };
    let request = RecommendationRequest {
        constraints,
        max_results: 8,
        include_alternatives: false,
    };

    let response = engine.get_recommendations(&request).await?;
    Ok(response
        .recommendations
        .iter()
        .map(|rec| ProductSnippet {
            text: format!(
                "Product: {}\nBrand: {}\nPrice: ${}\nScore: {}\nRationale: {}",
                rec.product_name,
                rec.brand,
                rec.price.unwrap_or(0.0),
                rec.match_score,
                rec.rationale.strengths.join(". "),
            ),
            product_name: rec.product_name.clone(),
            sku: rec.variant_id.clone(),
            brand: rec.brand.clone(),
            price: rec.price,
            url: Some(format!("/products/{}", rec.variant_id)),
            ..Default::default()
        })
        .collect())
}

async fn execute_analytics(catalog: &dyn CatalogStore) -> anyhow::Result<Vec<ProductSnippet>> {
    let all = catalog.query_variants(&VariantFilters::default(), 50).await?;
    if all.is_empty() {
        return Ok(Vec::new());
    }

    let prices: Vec<f64> = all.iter().filter_map(|c| c.price).collect();
    let average = if prices.is_empty() {
        0.0
    } else {
        prices.iter().sum::<f64>() / prices.len() as f64
    };
    let mut brands: Vec<&str> = all.iter().map(|c| c.brand.as_str()).collect();
    brands.sort();
    brands.dedup();

    Ok(vec![ProductSnippet {
        text: format!(
            "Product Analytics Summary:\nTotal Products: {}\nAverage Price: ${average:.0}\n\
             Top Brands: {}",
            all.len(),
            brands.join(", ")
        ),
        product_name: String::new(),
        ..Default::default()
    }])
}

async fn execute_reviews(
    catalog: &dyn CatalogStore,
    product: Option<&str>,
) -> anyhow::Result<Vec<ProductSnippet>> {
    let filters = VariantFilters {
        query: product.map(str::to_string),
        ..Default::default()
    };
    let hits = catalog.query_variants(&filters, 50).await?;

    let summaries: Vec<_> = hits
        .iter()
        .filter_map(|c| c.review_summary.as_ref())
        .collect();
    if summaries.is_empty() {
        return Ok(Vec::new());
    }

    let total_reviews: u32 = summaries.iter().map(|s| s.total_reviews).sum();
    let rated: Vec<f32> = summaries.iter().filter_map(|s| s.average_rating).collect();
    let average = if rated.is_empty() {
        0.0
    } else {
        rated.iter().sum::<f32>() / rated.len() as f32
    };

    Ok(vec![ProductSnippet {
        text: format!(
            "Review Analysis:\nAverage Rating: {average:.1}\nTotal Reviews: {total_reviews}"
        ),
        product_name: String::new(),
        ..Default::default()
    }])
}

/// A snippet is cited when its name, SKU, or brand literally appears in the
/// response — and the first `floor` snippets are cited unconditionally so
/// grounding surfaces even when the model paraphrases everything.
pub(super) fn extract_citations(
    response: &str,
    snippets: &[ProductSnippet],
    floor: usize,
) -> Vec<super::Citation> {
    let response_lower = response.to_lowercase();
    let mut citations = Vec::new();

    for snippet in snippets {
        let mentioned = (!snippet.product_name.is_empty()
            && response_lower.contains(&snippet.product_name.to_lowercase()))
            || (!snippet.sku.is_empty() && response.contains(&snippet.sku))
            || (!snippet.brand.is_empty()
                && response_lower.contains(&snippet.brand.to_lowercase()));

        if mentioned || citations.len() < floor {
            citations.push(super::Citation {
                product_name: snippet.product_name.clone(),
                sku: snippet.sku.clone(),
                url: snippet.url.clone().unwrap_or_default(),
                relevance_score: snippet.vector_score.unwrap_or(0.8),
            });
        }
    }

    citations
}

const RECOMMENDATION_TRIGGERS: &[&str] = &[
    "recommend", "suggest", "best", "should i", "which", "budget", "under",
    "find", "search", "show", "looking for", "need", "want", "buy", "laptop",
    "hp", "lenovo",
];

/// Score the turn's retrieved products against constraints extracted from the
/// message and return the strongest few.
pub(super) fn chat_recommendations(
    message: &str,
    snippets: &[ProductSnippet],
    cap: usize,
) -> Option<Vec<super::ChatRecommendation>> {
    let lower = message.to_lowercase();
    let triggered = RECOMMENDATION_TRIGGERS.iter().any(|t| lower.contains(t));
    if !triggered && snippets.is_empty() {
        return None;
    }

    let constraints = RecommendationConstraints {
        budget_max: tools::extract_budget(message),
        brands: tools::extract_brands(message),
        use_cases: tools::extract_use_case(message)
            .map(|u| vec![u.as_str().to_string()])
            .unwrap_or_default(),
        ..Default::default()
    };

    let mut scored: Vec<(u8, Rationale, &ProductSnippet)> = snippets
        .iter()
        .filter(|s| !s.product_name.is_empty())
        .take(5)
        .map(|snippet| {
            let candidate = snippet_to_candidate(snippet);
            let scored = scorer::score(&candidate, &constraints);
            (scored.score, scored.rationale, snippet)
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let recommendations: Vec<super::ChatRecommendation> = scored
        .into_iter()
        .take(cap)
        .map(|(score, rationale, snippet)| {
            let mut reasons = rationale.match_reasons;
            reasons.extend(rationale.strengths);
            let rationale_text = if reasons.is_empty() {
                "Suitable option based on your requirements".to_string()
            } else {
                reasons.join(". ")
            };

            super::ChatRecommendation {
                variant_id: snippet.sku.clone(),
                product_name: snippet.product_name.clone(),
                price: snippet.price,
                score,
                rationale: rationale_text,
                availability: snippet
                    .availability
                    .clone()
                    .unwrap_or_else(|| "In Stock".to_string()),
                url: snippet
                    .url
                    .clone()
                    .unwrap_or_else(|| format!("/products/{}", snippet.sku)),
            }
        })
        .collect();

    if recommendations.is_empty() {
        None
    } else {
        Some(recommendations)
    }
}
