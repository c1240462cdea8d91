// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Candidate, ComponentKind, Location, Patch, Preferences, PreferencesPatch, PriceTier, Profile,
    ProfileState, Query, ScoreComponent, ScoredCandidate, ScoringWeights,
};
pub use requests::{DinnerQuery, FindDinnerRequest, RefineDinnerRequest, SetPrefsRequest};
pub use responses::{DinnerResponse, ErrorResponse, HealthResponse, SetPrefsResponse};
