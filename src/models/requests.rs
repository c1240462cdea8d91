use crate::models::domain::{Location, PreferencesPatch, PriceTier};
use serde::Deserialize;
use std::collections::BTreeSet;
use validator::Validate;

fn default_profile() -> String {
    "default".to_string()
}

/// Explicit search parameters for a dinner search. Anything left out falls
/// back to the profile's stored preferences, then to configured defaults.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DinnerQuery {
    pub location: Location,
    #[serde(default)]
    pub cuisines: BTreeSet<String>,
    #[serde(default)]
    pub dietary: BTreeSet<String>,
    #[serde(default)]
    pub budget: Option<PriceTier>,
    #[validate(range(min = 0.1, max = 40.0))]
    #[serde(rename = "radiusKm", default)]
    pub radius_km: Option<f64>,
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(rename = "minRating", default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(rename = "openNow", default)]
    pub open_now: Option<bool>,
    #[validate(range(min = 1, max = 50))]
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Request to save/merge dinner preferences
#[derive(Debug, Deserialize, Validate)]
pub struct SetPrefsRequest {
    #[validate(length(min = 1))]
    #[serde(default = "default_profile")]
    pub profile: String,
    pub preferences: PreferencesPatch,
}

/// Request to find restaurants
#[derive(Debug, Deserialize, Validate)]
pub struct FindDinnerRequest {
    #[validate(length(min = 1))]
    #[serde(default = "default_profile")]
    pub profile: String,
    #[validate(nested)]
    pub query: DinnerQuery,
}

/// Request to refine the previous search with a free-text instruction
#[derive(Debug, Deserialize, Validate)]
pub struct RefineDinnerRequest {
    #[validate(length(min = 1))]
    #[serde(default = "default_profile")]
    pub profile: String,
    #[validate(length(min = 1))]
    pub instruction: String,
}
