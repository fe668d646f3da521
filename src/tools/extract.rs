// src/tools/extract.rs

//! Deterministic extraction helpers shared by the router and the memory
//! layer: budgets, brands, requirements, use cases, search terms.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::query::UseCase;

static DOLLAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+(?:,\d{3})*(?:\.\d{2})?)").unwrap());
static RANGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)").unwrap());
static UNDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:under|below)\s*\$?(\d+)").unwrap());

/// Budget from free text. Dollar amounts win (highest mentioned), then the
/// upper end of a bare numeric range, then an "under/below N" phrase.
pub fn extract_budget(text: &str) -> Option<f64> {
    let amounts: Vec<f64> = DOLLAR_RE
        .captures_iter(text)
        .filter_map(|c| c[1].replace(',', "").parse::<f64>().ok())
        .collect();
    if let Some(max) = amounts.into_iter().fold(None::<f64>, |acc, a| {
        Some(acc.map_or(a, |m| m.max(a)))
    }) {
        return Some(max);
    }

    if let Some(caps) = RANGE_RE.captures(text) {
        if let Ok(upper) = caps[2].parse::<f64>() {
            return Some(upper);
        }
    }

    if let Some(caps) = UNDER_RE.captures(&text.to_lowercase()) {
        if let Ok(amount) = caps[1].parse::<f64>() {
            return Some(amount);
        }
    }

    None
}

/// Brand mentions mapped to catalog casing. "thinkpad" counts as a Lenovo
/// mention; order follows the scan list, duplicates are kept so the first
/// entry stays the strongest signal.
pub fn extract_brands(text: &str) -> Vec<String> {
    const SCAN: &[(&str, &str)] = &[
        ("hp", "HP"),
        ("lenovo", "Lenovo"),
        ("dell", "Dell"),
        ("asus", "Asus"),
        ("acer", "Acer"),
        ("msi", "Msi"),
        ("apple", "Apple"),
        ("microsoft", "Microsoft"),
        ("samsung", "Samsung"),
        ("thinkpad", "Lenovo"),
    ];

    let lower = text.to_lowercase();
    SCAN.iter()
        .filter(|(token, _)| lower.contains(token))
        .map(|(_, brand)| brand.to_string())
        .collect()
}

pub fn extract_use_case(text: &str) -> Option<UseCase> {
    UseCase::detect(text)
}

/// Hardware requirement tags inferred from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    HighPerformance,
    HighMemory,
    StandardMemory,
    LargeStorage,
    MediumStorage,
    SmallStorage,
    HighResolution,
    Touchscreen,
    Portable,
    BusinessGrade,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Requirement::HighPerformance => "high_performance",
            Requirement::HighMemory => "high_memory",
            Requirement::StandardMemory => "standard_memory",
            Requirement::LargeStorage => "large_storage",
            Requirement::MediumStorage => "medium_storage",
            Requirement::SmallStorage => "small_storage",
            Requirement::HighResolution => "high_resolution",
            Requirement::Touchscreen => "touchscreen",
            Requirement::Portable => "portable",
            Requirement::BusinessGrade => "business_grade",
        }
    }
}

pub fn extract_requirements(text: &str) -> Vec<Requirement> {
    let lower = text.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    let mut requirements = Vec::new();

    if any(&["fast", "speed", "performance", "powerful"]) {
        requirements.push(Requirement::HighPerformance);
    }

    if any(&["memory", "ram", "16gb", "32gb", "8gb"]) {
        if lower.contains("16gb") || lower.contains("32gb") {
            requirements.push(Requirement::HighMemory);
        } else if lower.contains("8gb") {
            requirements.push(Requirement::StandardMemory);
        }
    }

    if any(&["storage", "ssd", "hard drive", "1tb", "512gb", "256gb"]) {
        if lower.contains("1tb") {
            requirements.push(Requirement::LargeStorage);
        } else if lower.contains("512gb") {
            requirements.push(Requirement::MediumStorage);
        } else if lower.contains("256gb") {
            requirements.push(Requirement::SmallStorage);
        }
    }

    if any(&["display", "screen", "touch", "touchscreen", "4k", "2k", "hd"]) {
        if lower.contains("4k") || lower.contains("2k") {
            requirements.push(Requirement::HighResolution);
        } else if lower.contains("touch") {
            requirements.push(Requirement::Touchscreen);
        }
    }

    if any(&["light", "lightweight", "portable", "travel", "mobile"]) {
        requirements.push(Requirement::Portable);
    }

    if any(&["business", "office", "work", "professional", "corporate"]) {
        requirements.push(Requirement::BusinessGrade);
    }

    requirements
}

/// Product family tokens mentioned in the message, in scan order.
pub fn extract_product_names(text: &str) -> Vec<String> {
    const FAMILIES: &[&str] = &[
        "probook", "thinkpad", "elitebook", "pavilion", "inspiron", "latitude",
    ];
    let lower = text.to_lowercase();
    FAMILIES
        .iter()
        .filter(|f| lower.contains(*f))
        .map(|f| f.to_string())
        .collect()
}

/// Keyword soup for the catalog text search: lowercase the message, drop
/// stop words and anything shorter than three characters. Falls back to the
/// original message when nothing survives.
pub fn extract_search_terms(message: &str) -> String {
    const STOP_WORDS: &[&str] = &[
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
        "by", "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does",
        "did", "will", "would", "could", "should", "may", "might", "can", "i", "you", "he",
        "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your", "his",
        "its", "our", "their",
    ];

    let lower = message.to_lowercase();
    let terms: Vec<&str> = lower
        .split_whitespace()
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .collect();

    if terms.is_empty() {
        message.to_string()
    } else {
        terms.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_amounts_beat_ranges_and_take_the_max() {
        assert_eq!(extract_budget("between $800 and $1,200.50"), Some(1200.50));
        assert_eq!(extract_budget("somewhere 800 - 1200"), Some(1200.0));
        assert_eq!(extract_budget("keep it under 1500"), Some(1500.0));
        assert_eq!(extract_budget("no numbers here"), None);
    }

    #[test]
    fn thinkpad_maps_to_lenovo() {
        assert_eq!(extract_brands("a thinkpad maybe"), vec!["Lenovo"]);
        assert_eq!(extract_brands("hp or dell"), vec!["HP", "Dell"]);
    }

    #[test]
    fn memory_tiers_from_capacity_tokens() {
        assert_eq!(extract_requirements("need 16gb ram"), vec![Requirement::HighMemory]);
        assert_eq!(extract_requirements("8gb is fine"), vec![Requirement::StandardMemory]);
        // "memory" alone names the concern without picking a tier.
        assert_eq!(extract_requirements("lots of memory"), Vec::<Requirement>::new());
    }

    #[test]
    fn touch_only_counts_without_resolution_tokens() {
        assert_eq!(extract_requirements("4k touchscreen"), vec![Requirement::HighResolution]);
        assert_eq!(extract_requirements("touchscreen please"), vec![Requirement::Touchscreen]);
    }

    #[test]
    fn search_terms_drop_stop_words_and_short_tokens() {
        assert_eq!(
            extract_search_terms("I want a laptop for my work"),
            "want laptop work"
        );
        assert_eq!(extract_search_terms("a an of"), "a an of");
    }

    #[test]
    fn product_families_in_scan_order() {
        assert_eq!(
            extract_product_names("ThinkPad or ProBook?"),
            vec!["probook", "thinkpad"]
        );
    }
}
