//! Tablescout - restaurant recommendation service with conversational refinement
//!
//! This library combines a Yelp-backed restaurant search with profile-scoped
//! conversational memory. The core is a composite scoring engine and a
//! deterministic refinement parser ("closer", "cheaper", "no bananas") that
//! mutates the stored query state and re-ranks.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{ProfileStore, RecommendError, Recommender, SearchDefaults};
pub use models::{
    Candidate, DinnerQuery, Preferences, PreferencesPatch, PriceTier, Query, ScoredCandidate,
    ScoringWeights,
};
pub use services::{ListingsProvider, ProviderError, YelpClient};
