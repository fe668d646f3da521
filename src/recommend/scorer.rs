// src/recommend/scorer.rs

//! Constraint scoring for candidate variants.
//!
//! Five sub-scores on a 0-100 scale, combined with fixed weights
//! (budget 0.30, specs 0.25, reviews 0.20, features 0.15, use case 0.10) and
//! truncated to an integer. The budget sub-score has a deliberate hard cliff:
//! one dollar over budget_max scores 0, not 69 — over-budget candidates must
//! sink below every in-budget one regardless of other strengths.

use crate::catalog::Candidate;

use super::{Rationale, RecommendationConstraints, ScoreBreakdown, ScoredCandidate};

pub fn score(candidate: &Candidate, constraints: &RecommendationConstraints) -> ScoredCandidate {
    let breakdown = ScoreBreakdown {
        budget: score_budget_fit(candidate, constraints),
        specs: score_specs_match(candidate, constraints),
        reviews: score_reviews(candidate),
        features: score_features_match(candidate, constraints),
        use_case: score_use_case_fit(candidate, constraints),
    };

    let weighted = f64::from(breakdown.budget) * 0.3
        + f64::from(breakdown.specs) * 0.25
        + f64::from(breakdown.reviews) * 0.2
        + f64::from(breakdown.features) * 0.15
        + f64::from(breakdown.use_case) * 0.1;

    let rationale = build_rationale(candidate, constraints, breakdown);

    ScoredCandidate {
        candidate: candidate.clone(),
        score: weighted as u8,
        rationale,
    }
}

/// Sort a scored pool best-first. Stable, so equal scores keep pool order.
pub fn rank(mut scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

fn score_budget_fit(candidate: &Candidate, constraints: &RecommendationConstraints) -> u8 {
    let Some(price) = candidate.price else {
        return 50;
    };

    if constraints.budget_min.is_none() && constraints.budget_max.is_none() {
        return if price < 1000.0 {
            90
        } else if price < 1500.0 {
            75
        } else {
            60
        };
    }

    if let Some(budget_max) = constraints.budget_max {
        if price <= budget_max * 0.8 {
            100
        } else if price <= budget_max * 0.9 {
            85
        } else if price <= budget_max {
            70
        } else {
            0
        }
    } else {
        75
    }
}

fn score_specs_match(candidate: &Candidate, constraints: &RecommendationConstraints) -> u8 {
    let mut score = 0u32;
    let mut max_score = 0u32;

    if let Some(min_memory) = constraints.min_memory_gb {
        max_score += 25;
        if let Some(memory) = candidate.memory_gb {
            if memory >= min_memory * 2 {
                score += 25;
            } else if memory >= min_memory {
                score += 20;
            }
        }
    }

    if let Some(min_storage) = constraints.min_storage_gb {
        max_score += 25;
        if let Some(storage) = candidate.storage_gb {
            if storage >= min_storage * 2 {
                score += 25;
            } else if storage >= min_storage {
                score += 20;
            }
        }
    }

    if let Some(ref proc_pref) = constraints.processor_preference {
        max_score += 25;
        if let Some(ref processor) = candidate.processor {
            if processor.to_lowercase().contains(&proc_pref.to_lowercase()) {
                score += 25;
            }
        }
    }

    if max_score == 0 {
        return 75;
    }

    ((f64::from(score) / f64::from(max_score)) * 100.0) as u8
}

fn score_reviews(candidate: &Candidate) -> u8 {
    let Some(summary) = &candidate.review_summary else {
        return 60;
    };
    let Some(rating) = summary.average_rating else {
        return 60;
    };

    let mut base = ((f64::from(rating) - 1.0) / 4.0) * 100.0;
    if summary.total_reviews > 100 {
        base += 10.0;
    } else if summary.total_reviews > 50 {
        base += 5.0;
    }

    (base as u32).min(100) as u8
}

fn score_features_match(candidate: &Candidate, constraints: &RecommendationConstraints) -> u8 {
    let must = &constraints.must_have_features;
    let nice = &constraints.nice_to_have_features;
    if must.is_empty() && nice.is_empty() {
        return 80;
    }

    let mut score = 0.0f64;
    for feature in must {
        if candidate_has_feature(candidate, feature) {
            score += 60.0 / must.len() as f64;
        }
    }
    for feature in nice {
        if candidate_has_feature(candidate, feature) {
            score += 40.0 / nice.len() as f64;
        }
    }

    (score as u32).min(100) as u8
}

fn score_use_case_fit(candidate: &Candidate, constraints: &RecommendationConstraints) -> u8 {
    if constraints.use_cases.is_empty() {
        return 75;
    }

    let scorers: [(&str, fn(&Candidate) -> u32); 5] = [
        ("business", score_business_use),
        ("programming", score_programming_use),
        ("gaming", score_gaming_use),
        ("travel", score_travel_use),
        ("student", score_student_use),
    ];

    let mut total = 0u32;
    for use_case in &constraints.use_cases {
        let lower = use_case.to_lowercase();
        for (key, scorer) in &scorers {
            if lower.contains(key) {
                total += scorer(candidate);
                break;
            }
        }
    }

    (total / constraints.use_cases.len() as u32).min(100) as u8
}

/// Free-text feature names map onto the candidate's boolean flags.
pub fn candidate_has_feature(candidate: &Candidate, feature: &str) -> bool {
    let lower = feature.to_lowercase();
    if lower.contains("touchscreen") {
        candidate.has_feature("has_touchscreen")
    } else if lower.contains("fingerprint") {
        candidate.has_feature("has_fingerprint")
    } else if lower.contains("backlit") {
        candidate.has_feature("has_backlit_keyboard")
    } else {
        false
    }
}

fn score_business_use(candidate: &Candidate) -> u32 {
    let mut score = 70;
    if candidate.memory_gb.unwrap_or(0) >= 16 {
        score += 15;
    }
    if candidate.storage_type.as_deref().is_some_and(|s| s.contains("SSD")) {
        score += 10;
    }
    if let Some(ref family) = candidate.model_family {
        let family = family.to_lowercase();
        if family.contains("probook") || family.contains("thinkpad") {
            score += 10;
        }
    }
    score.min(100)
}

fn score_programming_use(candidate: &Candidate) -> u32 {
    let mut score = 60;
    if candidate.memory_gb.unwrap_or(0) >= 16 {
        score += 20;
    }
    if candidate.storage_type.as_deref().is_some_and(|s| s.contains("NVMe")) {
        score += 15;
    }
    if candidate
        .processor
        .as_deref()
        .is_some_and(|p| p.contains("i7") || p.contains("Ultra"))
    {
        score += 10;
    }
    score.min(100)
}

fn score_gaming_use(candidate: &Candidate) -> u32 {
    // Low base: this is a business catalog, gaming fit is the exception.
    let mut score = 40;
    if candidate
        .graphics
        .as_deref()
        .is_some_and(|g| g.contains("MX") || g.contains("RTX"))
    {
        score += 30;
    }
    if candidate.memory_gb.unwrap_or(0) >= 16 {
        score += 15;
    }
    score.min(100)
}

fn score_travel_use(candidate: &Candidate) -> u32 {
    let mut score = 70;
    if candidate.display_inches.is_some_and(|d| d <= 14.0) {
        score += 20;
    }
    // No battery data in the catalog; assume a decent cell.
    score += 10;
    score.min(100)
}

fn score_student_use(candidate: &Candidate) -> u32 {
    let mut score = 80;
    if candidate.price.is_some_and(|p| p < 1200.0) {
        score += 15;
    }
    if candidate.memory_gb.unwrap_or(0) >= 8 {
        score += 5;
    }
    score.min(100)
}

fn build_rationale(
    candidate: &Candidate,
    constraints: &RecommendationConstraints,
    breakdown: ScoreBreakdown,
) -> Rationale {
    let mut strengths = Vec::new();
    let mut considerations = Vec::new();
    let mut match_reasons = Vec::new();

    if let (Some(price), Some(budget_max)) = (candidate.price, constraints.budget_max) {
        if price <= budget_max * 0.8 {
            strengths.push("Excellent value - well under budget".to_string());
            match_reasons.push("Great price point".to_string());
        } else if price <= budget_max {
            match_reasons.push("Fits within budget".to_string());
        }
    }

    if candidate.memory_gb.unwrap_or(0) >= 16 {
        strengths.push("Generous 16GB+ RAM for multitasking".to_string());
    }
    if candidate.storage_type.as_deref().is_some_and(|s| s.contains("NVMe")) {
        strengths.push("Fast NVMe SSD storage".to_string());
    }

    if let Some(rating) = candidate
        .review_summary
        .as_ref()
        .and_then(|s| s.average_rating)
    {
        if rating >= 4.5 {
            strengths.push("Exceptionally well-reviewed".to_string());
        } else if rating >= 4.0 {
            strengths.push("Highly rated by customers".to_string());
        } else {
            considerations.push("Mixed customer reviews".to_string());
        }
    }

    Rationale { breakdown, strengths, considerations, match_reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReviewSummary;

    fn candidate(price: f64, memory: u32) -> Candidate {
        Candidate {
            id: "v1".into(),
            product_id: "p1".into(),
            product_name: "HP ProBook 450 G10".into(),
            brand: "HP".into(),
            sku: "SKU-1".into(),
            price: Some(price),
            memory_gb: Some(memory),
            ..Default::default()
        }
    }

    #[test]
    fn scores_stay_in_bounds() {
        let mut c = candidate(899.0, 32);
        c.storage_gb = Some(1024);
        c.storage_type = Some("NVMe SSD".into());
        c.processor = Some("Intel Core i7-1355U".into());
        c.review_summary = Some(ReviewSummary {
            average_rating: Some(4.9),
            total_reviews: 500,
        });
        let constraints = RecommendationConstraints {
            budget_max: Some(2000.0),
            min_memory_gb: Some(8),
            min_storage_gb: Some(256),
            processor_preference: Some("intel".into()),
            use_cases: vec!["business".into()],
            ..Default::default()
        };

        let scored = score(&c, &constraints);
        assert!(scored.score <= 100);
        assert!(scored.score >= 80, "strong candidate should score high, got {}", scored.score);
    }

    #[test]
    fn budget_cliff_zeroes_over_budget_candidates() {
        let constraints = RecommendationConstraints {
            budget_max: Some(1000.0),
            ..Default::default()
        };

        let just_over = score(&candidate(1000.01, 8), &constraints);
        assert_eq!(just_over.rationale.breakdown.budget, 0);

        let at_limit = score(&candidate(1000.0, 8), &constraints);
        assert_eq!(at_limit.rationale.breakdown.budget, 70);

        let well_under = score(&candidate(790.0, 8), &constraints);
        assert_eq!(well_under.rationale.breakdown.budget, 100);
    }

    #[test]
    fn no_price_scores_neutral_budget() {
        let mut c = candidate(0.0, 8);
        c.price = None;
        let scored = score(&c, &RecommendationConstraints::default());
        assert_eq!(scored.rationale.breakdown.budget, 50);
    }

    #[test]
    fn unconstrained_specs_score_flat_75() {
        let scored = score(&candidate(999.0, 8), &RecommendationConstraints::default());
        assert_eq!(scored.rationale.breakdown.specs, 75);
    }

    #[test]
    fn exceeding_double_the_memory_floor_outranks_meeting_it() {
        let constraints = RecommendationConstraints {
            min_memory_gb: Some(8),
            ..Default::default()
        };
        let exceeds = score(&candidate(999.0, 16), &constraints);
        let meets = score(&candidate(999.0, 8), &constraints);
        assert_eq!(exceeds.rationale.breakdown.specs, 100);
        assert_eq!(meets.rationale.breakdown.specs, 80);
    }

    #[test]
    fn review_volume_bonus_caps_at_100() {
        let mut c = candidate(999.0, 8);
        c.review_summary = Some(ReviewSummary {
            average_rating: Some(4.8),
            total_reviews: 250,
        });
        let scored = score(&c, &RecommendationConstraints::default());
        // ((4.8-1)/4)*100 = 95, +10 volume bonus, capped.
        assert_eq!(scored.rationale.breakdown.reviews, 100);
    }

    #[test]
    fn must_have_features_weigh_more_than_nice_to_haves() {
        let mut c = candidate(999.0, 8);
        c.features.insert("has_touchscreen".into(), true);
        let constraints = RecommendationConstraints {
            must_have_features: vec!["touchscreen".into()],
            nice_to_have_features: vec!["fingerprint".into()],
            ..Default::default()
        };
        let scored = score(&c, &constraints);
        assert_eq!(scored.rationale.breakdown.features, 60);
    }

    #[test]
    fn creative_use_case_has_no_scorer() {
        let constraints = RecommendationConstraints {
            use_cases: vec!["creative".into()],
            ..Default::default()
        };
        let scored = score(&candidate(999.0, 16), &constraints);
        assert_eq!(scored.rationale.breakdown.use_case, 0);
    }

    #[test]
    fn better_specced_business_machine_outranks_cheaper_one_near_budget() {
        let constraints = RecommendationConstraints {
            budget_max: Some(1200.0),
            min_memory_gb: Some(8),
            use_cases: vec!["business".into()],
            ..Default::default()
        };
        let mut basic = candidate(999.0, 8);
        basic.product_name = "HP 250 G10".into();
        let mut probook = candidate(1199.0, 16);
        probook.product_name = "HP ProBook 450 G10".into();
        probook.model_family = Some("ProBook".into());
        probook.storage_type = Some("NVMe SSD".into());

        let a = score(&basic, &constraints);
        let b = score(&probook, &constraints);
        // Specs and business-fit bonuses outweigh sitting closer to the cap.
        assert!(b.score > a.score, "{} vs {}", b.score, a.score);
    }

    #[test]
    fn cheaper_adequate_machine_beats_pricier_one_under_budget() {
        let constraints = RecommendationConstraints {
            budget_max: Some(1300.0),
            use_cases: vec!["student".into()],
            ..Default::default()
        };
        let mut affordable = candidate(999.0, 8);
        affordable.product_name = "HP 255 G10".into();
        let mut probook = candidate(1199.0, 8);
        probook.product_name = "HP ProBook 450 G10".into();

        let a = score(&affordable, &constraints);
        let b = score(&probook, &constraints);
        assert!(a.score > b.score, "{} vs {}", a.score, b.score);
    }
}
