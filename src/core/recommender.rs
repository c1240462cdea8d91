use crate::core::refine::{refine, RefreshPlan};
use crate::core::scoring::rank;
use crate::core::store::ProfileStore;
use crate::models::{
    Candidate, DinnerQuery, Preferences, PreferencesPatch, ProfileState, Query, ScoredCandidate,
    ScoringWeights,
};
use crate::services::listings::{ListingsProvider, ProviderError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced by the recommendation operations. All of them are
/// recoverable and leave the profile in its prior consistent state.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("instruction matched no refinement rule: {0:?}")]
    UnrecognizedRefinement(String),

    #[error("no prior search to refine; call find_dinner first")]
    NoPriorSearch,

    #[error("invalid preference: {0}")]
    InvalidPreference(String),
}

/// Defaults applied when neither stored preferences nor the explicit query
/// set a field
#[derive(Debug, Clone, Copy)]
pub struct SearchDefaults {
    pub radius_km: f64,
    pub min_rating: f64,
    pub open_now: bool,
    pub limit: usize,
    /// How many top results get a review snippet attached
    pub snippet_count: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            radius_km: 3.0,
            min_rating: 4.0,
            open_now: true,
            limit: 12,
            snippet_count: 5,
        }
    }
}

/// Ranked output of a search or refinement
#[derive(Debug)]
pub struct RankedResults {
    pub query_used: Query,
    /// Visible ranking; avoid-list hits are omitted here
    pub restaurants: Vec<ScoredCandidate>,
    /// Avoid-list hits retained internally for diagnostics
    pub excluded_count: usize,
    pub tips: Vec<String>,
}

/// Main orchestrator: merges preferences with explicit queries, drives the
/// listings provider, scores candidates, and keeps per-profile session
/// state for follow-up refinement.
pub struct Recommender {
    store: Arc<ProfileStore>,
    provider: Arc<dyn ListingsProvider>,
    weights: ScoringWeights,
    defaults: SearchDefaults,
}

impl Recommender {
    pub fn new(
        store: Arc<ProfileStore>,
        provider: Arc<dyn ListingsProvider>,
        weights: ScoringWeights,
        defaults: SearchDefaults,
    ) -> Self {
        Self {
            store,
            provider,
            weights,
            defaults,
        }
    }

    /// Merge a partial preference update into the profile. The whole patch
    /// is validated up front; a bad field rejects everything, so no partial
    /// mutation ever lands.
    pub async fn set_prefs(
        &self,
        profile_key: &str,
        patch: PreferencesPatch,
    ) -> Result<Preferences, RecommendError> {
        patch
            .validate()
            .map_err(RecommendError::InvalidPreference)?;

        let handle = self.store.handle(profile_key);
        let mut profile = handle.lock().await;
        profile.preferences.apply(patch);
        debug!(profile = profile_key, "preferences updated");
        Ok(profile.preferences.clone())
    }

    /// Run a search: preferences + explicit query -> effective query ->
    /// provider -> scored ranking, committed as the profile's new session
    /// state.
    pub async fn find_dinner(
        &self,
        profile_key: &str,
        request: DinnerQuery,
    ) -> Result<RankedResults, RecommendError> {
        let handle = self.store.handle(profile_key);

        // Snapshot under the lock, then release it for the provider call
        let query = {
            let profile = handle.lock().await;
            self.effective_query(&profile.preferences, &request)
        };

        let mut raw = self.provider.search(&query).await?;
        debug!(
            profile = profile_key,
            candidates = raw.len(),
            "provider search complete"
        );

        let mut scored = rank(&raw, &query, &self.weights);
        self.attach_snippets(&mut scored, &mut raw).await;

        // Re-acquire and commit. A concurrent find on the same key may have
        // committed while the lock was released; last writer wins on the
        // search state, and preferences are deliberately not overwritten.
        {
            let mut profile = handle.lock().await;
            profile.last_query = Some(query.clone());
            profile.last_raw = raw;
            profile.last_results = scored.clone();
        }

        Ok(self.build_results(query, scored, true))
    }

    /// Apply a free-text refinement to the last search and re-rank, either
    /// from the cached raw candidates or from a fresh provider call per the
    /// refresh contract.
    pub async fn refine_dinner(
        &self,
        profile_key: &str,
        instruction: &str,
    ) -> Result<RankedResults, RecommendError> {
        let handle = self.store.handle(profile_key);

        let (last_query, preferences, cached_raw) = {
            let profile = handle.lock().await;
            if profile.state() != ProfileState::Searched {
                return Err(RecommendError::NoPriorSearch);
            }
            (
                profile.last_query.clone().ok_or(RecommendError::NoPriorSearch)?,
                profile.preferences.clone(),
                profile.last_raw.clone(),
            )
        };

        let refinement = refine(instruction, &last_query, &preferences)
            .ok_or_else(|| RecommendError::UnrecognizedRefinement(instruction.to_string()))?;

        debug!(
            profile = profile_key,
            rules = ?refinement.matched_rules,
            "refinement parsed"
        );

        let mut raw = match refinement.refresh_plan(&last_query) {
            RefreshPlan::RerankCached => cached_raw,
            RefreshPlan::Refetch => self.provider.search(&refinement.query).await?,
        };

        let mut scored = rank(&raw, &refinement.query, &self.weights);
        self.attach_snippets(&mut scored, &mut raw).await;

        {
            let mut profile = handle.lock().await;
            profile.preferences = refinement.preferences;
            profile.last_query = Some(refinement.query.clone());
            profile.last_raw = raw;
            profile.last_results = scored.clone();
        }

        Ok(self.build_results(refinement.query, scored, false))
    }

    /// Read-only diagnostic view of a profile
    pub async fn inspect(&self, profile_key: &str) -> ProfileSnapshot {
        let handle = self.store.handle(profile_key);
        let profile = handle.lock().await;
        ProfileSnapshot {
            state: profile.state(),
            preferences: profile.preferences.clone(),
            last_query: profile.last_query.clone(),
            result_count: profile
                .last_results
                .iter()
                .filter(|s| !s.excluded)
                .count(),
            excluded_count: profile.last_results.iter().filter(|s| s.excluded).count(),
            last_results: profile.last_results.clone(),
        }
    }

    /// Merge stored preferences with the explicit request; the request wins
    /// where both set a field, defaults fill the rest
    fn effective_query(&self, preferences: &Preferences, request: &DinnerQuery) -> Query {
        let cuisines = if request.cuisines.is_empty() {
            preferences.cuisines.clone()
        } else {
            request.cuisines.clone()
        };
        let dietary = if request.dietary.is_empty() {
            preferences.dietary.clone()
        } else {
            request.dietary.clone()
        };
        let term = if request.keywords.is_empty() {
            None
        } else {
            Some(request.keywords.join(" "))
        };

        Query {
            location: request.location.clone(),
            cuisines,
            dietary,
            budget: request.budget.or(preferences.budget),
            radius_km: request
                .radius_km
                .or(preferences.max_distance_km)
                .unwrap_or(self.defaults.radius_km),
            min_rating: request
                .min_rating
                .or(preferences.min_rating)
                .unwrap_or(self.defaults.min_rating),
            term,
            avoid: preferences.avoid.clone(),
            vibe: preferences.vibe.clone(),
            open_now: request
                .open_now
                .or(preferences.open_now)
                .unwrap_or(self.defaults.open_now),
            limit: request.limit.unwrap_or(self.defaults.limit).min(50),
        }
    }

    /// Best-effort review snippets for the top visible results. Failures
    /// are logged and skipped; the snippet also lands in the cached raw
    /// candidate so later re-ranks can match keywords against it.
    async fn attach_snippets(&self, scored: &mut [ScoredCandidate], raw: &mut [Candidate]) {
        let top_ids: Vec<String> = scored
            .iter()
            .filter(|s| !s.excluded)
            .take(self.defaults.snippet_count)
            .map(|s| s.candidate.id.clone())
            .collect();

        for id in top_ids {
            let snippet = match self.provider.review_snippet(&id).await {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    warn!(business = %id, "review snippet fetch failed: {}", e);
                    continue;
                }
            };
            if let Some(s) = scored.iter_mut().find(|s| s.candidate.id == id) {
                s.candidate.snippets.push(snippet.clone());
            }
            if let Some(c) = raw.iter_mut().find(|c| c.id == id) {
                c.snippets.push(snippet);
            }
        }
    }

    fn build_results(
        &self,
        query: Query,
        scored: Vec<ScoredCandidate>,
        from_find: bool,
    ) -> RankedResults {
        let excluded_count = scored.iter().filter(|s| s.excluded).count();
        let restaurants: Vec<ScoredCandidate> = scored
            .into_iter()
            .filter(|s| !s.excluded)
            .take(query.limit)
            .collect();

        let tips = if restaurants.is_empty() {
            vec![
                "Try widening maxDistanceKm, lowering minRating, or removing avoid keywords."
                    .to_string(),
            ]
        } else if from_find {
            vec![
                "You can say things like: 'closer', 'cheaper', 'date night', 'kid-friendly', or 'not pizza'."
                    .to_string(),
            ]
        } else {
            vec!["Say 'search again' to fetch fresh options with your refined query.".to_string()]
        };

        RankedResults {
            query_used: query,
            restaurants,
            excluded_count,
            tips,
        }
    }
}

/// Read-only diagnostic view returned by [`Recommender::inspect`]
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProfileSnapshot {
    pub state: ProfileState,
    pub preferences: Preferences,
    #[serde(rename = "lastQuery")]
    pub last_query: Option<Query>,
    #[serde(rename = "resultCount")]
    pub result_count: usize,
    #[serde(rename = "excludedCount")]
    pub excluded_count: usize,
    /// Full stored ranking, avoid-list hits included with their flag
    #[serde(rename = "lastResults")]
    pub last_results: Vec<ScoredCandidate>,
}
