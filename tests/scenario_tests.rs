// End-to-end conversational scenarios against an in-memory provider

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tablescout::core::{ProfileStore, RecommendError, Recommender, SearchDefaults};
use tablescout::models::{Candidate, DinnerQuery, Location, PriceTier, Query, ScoringWeights};
use tablescout::services::{ListingsProvider, ProviderError};

/// Provider returning a fixed candidate list, counting calls
struct FixedProvider {
    candidates: Vec<Candidate>,
    calls: AtomicUsize,
}

impl FixedProvider {
    fn new(candidates: Vec<Candidate>) -> Arc<Self> {
        Arc::new(Self {
            candidates,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingsProvider for FixedProvider {
    async fn search(&self, _query: &Query) -> Result<Vec<Candidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }
}

fn candidate(id: &str, name: &str, rating: f64, reviews: u32, distance: f64, tier: u8) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: name.to_string(),
        rating,
        review_count: reviews,
        price_tier: Some(PriceTier::new(tier).unwrap()),
        distance_km: distance,
        categories: vec!["Sushi Bars".to_string()],
        snippets: vec![],
        address: None,
        url: None,
        phone: None,
    }
}

/// The three Waterloo candidates: a strong aligned pick, a sparse low-rated
/// one, and a famous but distant price-misaligned heavyweight
fn waterloo_candidates() -> Vec<Candidate> {
    vec![
        candidate("sakura", "Sakura Sushi", 4.5, 2000, 1.0, 2),
        candidate("banana-leaf", "Banana Leaf Rolls", 3.0, 50, 0.5, 2),
        candidate("mega", "Mega Omakase", 4.0, 10_000, 5.0, 4),
    ]
}

fn waterloo_request() -> DinnerQuery {
    DinnerQuery {
        location: Location::Address {
            address: "Waterloo, ON".to_string(),
        },
        cuisines: ["sushi".to_string()].into(),
        dietary: BTreeSet::new(),
        budget: Some(PriceTier::new(2).unwrap()),
        radius_km: None,
        min_rating: Some(0.0),
        keywords: vec![],
        open_now: None,
        limit: None,
    }
}

fn recommender(provider: Arc<dyn ListingsProvider>) -> Recommender {
    Recommender::new(
        Arc::new(ProfileStore::new()),
        provider,
        ScoringWeights::default(),
        SearchDefaults::default(),
    )
}

#[tokio::test]
async fn test_waterloo_search_ranking() {
    let provider = FixedProvider::new(waterloo_candidates());
    let rec = recommender(provider);

    let results = rec.find_dinner("heathcl", waterloo_request()).await.unwrap();
    let order: Vec<&str> = results
        .restaurants
        .iter()
        .map(|s| s.candidate.id.as_str())
        .collect();

    // Best rating + reviews + aligned price + close wins; the heavyweight
    // is penalized for price misalignment and being out of range
    assert_eq!(order.first(), Some(&"sakura"));
    assert_eq!(order.last(), Some(&"mega"));
    assert_eq!(results.excluded_count, 0);
    assert!(!results.tips.is_empty());
}

#[tokio::test]
async fn test_closer_cheaper_no_bananas() {
    let provider = FixedProvider::new(waterloo_candidates());
    let rec = recommender(Arc::clone(&provider) as Arc<dyn ListingsProvider>);

    rec.find_dinner("heathcl", waterloo_request()).await.unwrap();
    let before = rec.inspect("heathcl").await;
    let prior_radius = before.last_query.as_ref().unwrap().radius_km;

    let results = rec
        .refine_dinner("heathcl", "closer and cheaper, no bananas")
        .await
        .unwrap();

    // maxDistance decreased, budget floored at 1, banana blocked
    assert!(results.query_used.radius_km < prior_radius);
    assert_eq!(results.query_used.budget.map(PriceTier::value), Some(1));
    assert!(results.query_used.avoid.contains("banana"));

    // The banana-named candidate disappears from the visible ranking but
    // stays in diagnostics
    assert!(results
        .restaurants
        .iter()
        .all(|s| s.candidate.id != "banana-leaf"));
    assert_eq!(results.excluded_count, 1);

    // A shrunken radius re-ranks the cached candidates, no second call
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_search_again_refetches() {
    let provider = FixedProvider::new(waterloo_candidates());
    let rec = recommender(Arc::clone(&provider) as Arc<dyn ListingsProvider>);

    rec.find_dinner("heathcl", waterloo_request()).await.unwrap();
    rec.refine_dinner("heathcl", "search again").await.unwrap();
    assert_eq!(provider.call_count(), 2);

    rec.refine_dinner("heathcl", "farther").await.unwrap();
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_unrecognized_refinement_preserves_state() {
    let provider = FixedProvider::new(waterloo_candidates());
    let rec = recommender(provider);

    rec.find_dinner("heathcl", waterloo_request()).await.unwrap();
    let before = rec.inspect("heathcl").await;

    let err = rec.refine_dinner("heathcl", "xyzzy").await.unwrap_err();
    assert!(matches!(err, RecommendError::UnrecognizedRefinement(_)));

    let after = rec.inspect("heathcl").await;
    assert_eq!(before.preferences, after.preferences);
    assert_eq!(before.last_query, after.last_query);
    assert_eq!(before.result_count, after.result_count);
    assert_eq!(before.excluded_count, after.excluded_count);
}

#[tokio::test]
async fn test_refine_before_find_fails() {
    let provider = FixedProvider::new(waterloo_candidates());
    let rec = recommender(provider);

    let err = rec.refine_dinner("fresh-profile", "closer").await.unwrap_err();
    assert!(matches!(err, RecommendError::NoPriorSearch));
}

#[tokio::test]
async fn test_set_prefs_round_trip_merge() {
    let provider = FixedProvider::new(vec![]);
    let rec = recommender(provider);

    let initial = serde_json::from_str(r#"{"avoid": ["durian"], "minRating": 3.5}"#).unwrap();
    rec.set_prefs("heathcl", initial).await.unwrap();

    let update = serde_json::from_str(r#"{"budget": 2, "cuisines": ["sushi"]}"#).unwrap();
    let stored = rec.set_prefs("heathcl", update).await.unwrap();

    // New fields land, prior unrelated fields survive
    assert_eq!(stored.budget.map(PriceTier::value), Some(2));
    assert!(stored.cuisines.contains("sushi"));
    assert!(stored.avoid.contains("durian"));
    assert_eq!(stored.min_rating, Some(3.5));
}

#[tokio::test]
async fn test_preferences_feed_the_next_search() {
    let provider = FixedProvider::new(waterloo_candidates());
    let rec = recommender(provider);

    let patch = serde_json::from_str(r#"{"avoid": ["banana"], "maxDistanceKm": 2.0}"#).unwrap();
    rec.set_prefs("heathcl", patch).await.unwrap();

    let mut request = waterloo_request();
    request.radius_km = None;
    let results = rec.find_dinner("heathcl", request).await.unwrap();

    // Stored radius and avoid-list shaped the effective query
    assert_eq!(results.query_used.radius_km, 2.0);
    assert!(results.query_used.avoid.contains("banana"));
    assert!(results
        .restaurants
        .iter()
        .all(|s| s.candidate.id != "banana-leaf"));
}

#[tokio::test]
async fn test_profiles_are_isolated() {
    let provider = FixedProvider::new(waterloo_candidates());
    let rec = recommender(provider);

    let patch = serde_json::from_str(r#"{"avoid": ["banana"]}"#).unwrap();
    rec.set_prefs("alice", patch).await.unwrap();

    let results = rec.find_dinner("bob", waterloo_request()).await.unwrap();
    // Bob never configured an avoid-list; Alice's does not leak
    assert!(results
        .restaurants
        .iter()
        .any(|s| s.candidate.id == "banana-leaf"));
}
