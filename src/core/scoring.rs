use crate::models::{
    Candidate, ComponentKind, Query, ScoreComponent, ScoredCandidate, ScoringWeights,
};
use std::cmp::Ordering;

/// Score a single candidate against an effective query.
///
/// Composite formula (each component normalized to 0-1, scaled to 0-100):
/// ```text
/// score = (
///     rating_component * 0.35 +     # linear in star rating
///     review_component * 0.20 +     # log curve, saturates
///     distance_component * 0.20 +   # exp decay within radius
///     price_component * 0.15 +      # tier alignment
///     keyword_component * 0.10      # term/vibe occurrences
/// ) * 100 + hard penalties
/// ```
/// Candidates below the query's minimum rating or beyond its radius take a
/// hard penalty instead of being dropped, so they sort last but stay
/// visible. Avoid-list hits are marked `excluded` and kept for diagnostics.
pub fn score_candidate(
    candidate: &Candidate,
    query: &Query,
    weights: &ScoringWeights,
) -> ScoredCandidate {
    let rating = rating_component(candidate.rating);
    let reviews = review_component(candidate.review_count, weights.review_saturation);
    let distance = distance_component(candidate.distance_km, query.radius_km);
    let price = price_component(candidate, query);
    let keyword = keyword_component(candidate, query, weights.keyword_cap);

    let mut breakdown = vec![
        weighted(ComponentKind::Rating, rating, weights.rating),
        weighted(ComponentKind::Reviews, reviews, weights.reviews),
        weighted(ComponentKind::Distance, distance, weights.distance),
        weighted(ComponentKind::Price, price, weights.price),
        weighted(ComponentKind::Keyword, keyword, weights.keyword),
    ];

    let mut score: f64 = breakdown.iter().map(|c| c.value).sum();

    if candidate.rating < query.min_rating {
        breakdown.push(ScoreComponent {
            component: ComponentKind::LowRatingPenalty,
            value: weights.low_rating_penalty,
        });
        score += weights.low_rating_penalty;
    }

    if candidate.distance_km > query.radius_km {
        breakdown.push(ScoreComponent {
            component: ComponentKind::OutOfRangePenalty,
            value: weights.out_of_range_penalty,
        });
        score += weights.out_of_range_penalty;
    }

    ScoredCandidate {
        candidate: candidate.clone(),
        score,
        breakdown,
        excluded: matches_avoid_list(candidate, query),
    }
}

/// Score and order a batch of candidates.
///
/// The returned sequence contains every input candidate: non-excluded ones
/// first in rank order, then avoid-list hits. The ordering is a strict
/// total order - score descending, then rating descending, then distance
/// ascending, then stable provider order.
pub fn rank(candidates: &[Candidate], query: &Query, weights: &ScoringWeights) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|c| score_candidate(c, query, weights))
        .collect();

    scored.sort_by(compare_ranked);
    scored
}

fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    a.excluded
        .cmp(&b.excluded)
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| {
            b.candidate
                .rating
                .partial_cmp(&a.candidate.rating)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| {
            a.candidate
                .distance_km
                .partial_cmp(&b.candidate.distance_km)
                .unwrap_or(Ordering::Equal)
        })
}

fn weighted(component: ComponentKind, normalized: f64, weight: f64) -> ScoreComponent {
    ScoreComponent {
        component,
        value: normalized * weight * 100.0,
    }
}

/// Rating component (0-1): linear in the 0-5 star rating
#[inline]
fn rating_component(rating: f64) -> f64 {
    (rating / 5.0).clamp(0.0, 1.0)
}

/// Review-count component (0-1): log curve with diminishing returns.
/// 10 vs 1000 reviews differs meaningfully; 10k vs 100k barely does.
#[inline]
fn review_component(review_count: u32, saturation: f64) -> f64 {
    ((1.0 + review_count as f64).ln() / (1.0 + saturation).ln()).min(1.0)
}

/// Distance component (0-1): exponential decay within the radius, zero
/// beyond it (the out-of-range hard penalty handles the rest)
#[inline]
fn distance_component(distance_km: f64, radius_km: f64) -> f64 {
    if radius_km <= 0.0 || distance_km > radius_km {
        return 0.0;
    }
    (-distance_km / (radius_km * 0.5)).exp()
}

/// Price-alignment component (0-1): 1.0 when the tier is unknown or equal
/// to the budget, graduated penalty proportional to the tier gap otherwise
#[inline]
fn price_component(candidate: &Candidate, query: &Query) -> f64 {
    match (candidate.price_tier, query.budget) {
        (Some(tier), Some(budget)) => (1.0 - f64::from(tier.gap(budget)) / 3.0).max(0.0),
        _ => 1.0,
    }
}

/// Keyword component (0-1): case-insensitive occurrence count of the query
/// term tokens and vibe tags across name, categories and snippets, capped
fn keyword_component(candidate: &Candidate, query: &Query, cap: u32) -> f64 {
    if cap == 0 {
        return 0.0;
    }

    let mut needles: Vec<String> = Vec::new();
    if let Some(term) = &query.term {
        needles.extend(term.split_whitespace().map(|t| t.to_lowercase()));
    }
    needles.extend(query.vibe.iter().map(|v| v.to_lowercase()));
    needles.retain(|n| !n.is_empty());

    if needles.is_empty() {
        return 0.0;
    }

    let haystack = search_text(candidate);
    let matches: usize = needles
        .iter()
        .map(|n| haystack.matches(n.as_str()).count())
        .sum();

    (matches.min(cap as usize) as f64) / cap as f64
}

/// True when any avoid term appears (substring, case-insensitive) in the
/// candidate's name, categories, or snippets
pub fn matches_avoid_list(candidate: &Candidate, query: &Query) -> bool {
    if query.avoid.is_empty() {
        return false;
    }
    let haystack = search_text(candidate);
    query.avoid.iter().any(|term| haystack.contains(term.as_str()))
}

fn search_text(candidate: &Candidate) -> String {
    let mut text = candidate.name.to_lowercase();
    for category in &candidate.categories {
        text.push(' ');
        text.push_str(&category.to_lowercase());
    }
    for snippet in &candidate.snippets {
        text.push(' ');
        text.push_str(&snippet.to_lowercase());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use std::collections::BTreeSet;

    fn create_candidate(id: &str, rating: f64, reviews: u32, distance: f64, tier: Option<u8>) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: format!("Restaurant {}", id),
            rating,
            review_count: reviews,
            price_tier: tier.map(|t| crate::models::PriceTier::new(t).unwrap()),
            distance_km: distance,
            categories: vec!["Sushi".to_string()],
            snippets: vec![],
            address: None,
            url: None,
            phone: None,
        }
    }

    fn create_query() -> Query {
        Query {
            location: Location::Address {
                address: "Waterloo, ON".to_string(),
            },
            cuisines: BTreeSet::new(),
            dietary: BTreeSet::new(),
            budget: Some(crate::models::PriceTier::new(2).unwrap()),
            radius_km: 3.0,
            min_rating: 0.0,
            term: None,
            avoid: BTreeSet::new(),
            vibe: BTreeSet::new(),
            open_now: true,
            limit: 12,
        }
    }

    #[test]
    fn test_rating_component_linear() {
        assert_eq!(rating_component(0.0), 0.0);
        assert_eq!(rating_component(5.0), 1.0);
        assert!((rating_component(2.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_review_component_diminishing_returns() {
        let few = review_component(10, 500.0);
        let some = review_component(1000, 500.0);
        let many = review_component(10_000, 500.0);
        let huge = review_component(100_000, 500.0);

        // 10 vs 1000 matters; past saturation everything is capped
        assert!(some - few > 0.3);
        assert_eq!(many, 1.0);
        assert_eq!(huge, 1.0);
    }

    #[test]
    fn test_distance_component_decay() {
        // Very close = high score
        let close = distance_component(0.2, 3.0);
        assert!(close > 0.85);

        // At the edge = low but non-zero
        let edge = distance_component(3.0, 3.0);
        assert!(edge > 0.1 && edge < 0.2);

        // Beyond radius = zero (hard penalty handled separately)
        assert_eq!(distance_component(5.0, 3.0), 0.0);

        // Monotonically decreasing
        assert!(distance_component(1.0, 3.0) > distance_component(2.0, 3.0));
    }

    #[test]
    fn test_price_component_alignment() {
        let query = create_query(); // budget $$
        let aligned = create_candidate("a", 4.0, 100, 1.0, Some(2));
        let far = create_candidate("b", 4.0, 100, 1.0, Some(4));
        let unknown = create_candidate("c", 4.0, 100, 1.0, None);

        assert_eq!(price_component(&aligned, &query), 1.0);
        assert_eq!(price_component(&unknown, &query), 1.0);
        assert!(price_component(&far, &query) < 0.5);
    }

    #[test]
    fn test_keyword_component_counts_and_caps() {
        let mut query = create_query();
        query.term = Some("sushi".to_string());

        let mut candidate = create_candidate("a", 4.0, 100, 1.0, Some(2));
        candidate.snippets = vec!["Best sushi in town and sushi heaven".to_string()];
        let hit = keyword_component(&candidate, &query, 5);
        assert!(hit > 0.0 && hit <= 1.0);

        // Cap: flooding the snippets with the term maxes out at 1.0
        candidate.snippets = vec!["sushi ".repeat(50)];
        assert_eq!(keyword_component(&candidate, &query, 5), 1.0);

        // Category "Sushi" still counts as one occurrence
        let miss = create_candidate("b", 4.0, 100, 1.0, Some(2));
        assert!((keyword_component(&miss, &query, 5) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_low_rating_hard_penalty_sorts_last() {
        let mut query = create_query();
        query.min_rating = 4.0;

        let good = create_candidate("good", 4.5, 100, 1.0, Some(2));
        let bad = create_candidate("bad", 3.0, 100_000, 0.1, Some(2));

        let ranked = rank(&[bad.clone(), good.clone()], &query, &ScoringWeights::default());
        assert_eq!(ranked[0].candidate.id, "good");
        assert_eq!(ranked[1].candidate.id, "bad");
        // Penalized, not excluded
        assert!(!ranked[1].excluded);
        assert!(ranked[1]
            .breakdown
            .iter()
            .any(|c| c.component == ComponentKind::LowRatingPenalty));
    }

    #[test]
    fn test_out_of_range_hard_penalty() {
        let query = create_query();
        let near = create_candidate("near", 4.0, 100, 1.0, Some(2));
        let far = create_candidate("far", 5.0, 100, 10.0, Some(2));

        let ranked = rank(&[far, near], &query, &ScoringWeights::default());
        assert_eq!(ranked[0].candidate.id, "near");
        assert!(ranked[1]
            .breakdown
            .iter()
            .any(|c| c.component == ComponentKind::OutOfRangePenalty));
    }

    #[test]
    fn test_avoid_match_marks_excluded() {
        let mut query = create_query();
        query.avoid.insert("banana".to_string());

        let mut hit = create_candidate("hit", 4.8, 500, 0.5, Some(2));
        hit.snippets = vec!["Try the Banana roll".to_string()];
        let clean = create_candidate("clean", 4.0, 100, 1.0, Some(2));

        let ranked = rank(&[hit, clean], &query, &ScoringWeights::default());
        // Excluded candidates sort after all non-excluded ones
        assert_eq!(ranked[0].candidate.id, "clean");
        assert!(!ranked[0].excluded);
        assert!(ranked[1].excluded);
    }

    #[test]
    fn test_avoid_matches_name_and_categories() {
        let mut query = create_query();
        query.avoid.insert("pizza".to_string());

        let mut by_name = create_candidate("a", 4.0, 10, 1.0, None);
        by_name.name = "Pizza Palace".to_string();
        assert!(matches_avoid_list(&by_name, &query));

        let mut by_category = create_candidate("b", 4.0, 10, 1.0, None);
        by_category.categories = vec!["Pizza".to_string()];
        assert!(matches_avoid_list(&by_category, &query));

        let clean = create_candidate("c", 4.0, 10, 1.0, None);
        assert!(!matches_avoid_list(&clean, &query));
    }

    #[test]
    fn test_tie_break_rating_then_distance() {
        let query = create_query();
        let weights = ScoringWeights {
            rating: 0.0,
            reviews: 0.0,
            distance: 0.0,
            price: 0.0,
            keyword: 0.0,
            ..Default::default()
        };

        // Zero weights force equal scores so tie-breaks decide
        let a = create_candidate("low-far", 4.0, 10, 2.0, Some(2));
        let b = create_candidate("high", 4.5, 10, 2.0, Some(2));
        let c = create_candidate("low-near", 4.0, 10, 1.0, Some(2));

        let ranked = rank(&[a, b, c], &query, &weights);
        assert_eq!(ranked[0].candidate.id, "high");
        assert_eq!(ranked[1].candidate.id, "low-near");
        assert_eq!(ranked[2].candidate.id, "low-far");
    }

    #[test]
    fn test_ranking_deterministic() {
        let query = create_query();
        let weights = ScoringWeights::default();
        let candidates = vec![
            create_candidate("a", 4.5, 2000, 1.0, Some(2)),
            create_candidate("b", 3.0, 50, 0.5, Some(2)),
            create_candidate("c", 4.0, 10_000, 5.0, Some(4)),
        ];

        let first = rank(&candidates, &query, &weights);
        let second = rank(&candidates, &query, &weights);
        let order: Vec<&str> = first.iter().map(|s| s.candidate.id.as_str()).collect();
        let again: Vec<&str> = second.iter().map(|s| s.candidate.id.as_str()).collect();
        assert_eq!(order, again);
    }

    #[test]
    fn test_waterloo_scenario_ordering() {
        // From a sushi search at budget $$: high-rating well-reviewed close
        // aligned candidate beats the distant price-misaligned heavyweight.
        let query = create_query();
        let weights = ScoringWeights::default();

        let best = create_candidate("best", 4.5, 2000, 1.0, Some(2));
        let sparse = create_candidate("sparse", 3.0, 50, 0.5, Some(2));
        let heavyweight = create_candidate("heavy", 4.0, 10_000, 5.0, Some(4));

        let ranked = rank(&[best, sparse, heavyweight], &query, &weights);
        assert_eq!(ranked[0].candidate.id, "best");
        // The heavyweight is out of range and price-misaligned
        assert_eq!(ranked[2].candidate.id, "heavy");
    }
}
