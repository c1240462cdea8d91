use crate::models::domain::{Preferences, Query, ScoredCandidate};
use serde::Serialize;

/// Response for find/refine: the ranked visible results plus the effective
/// query they were ranked against
#[derive(Debug, Serialize)]
pub struct DinnerResponse {
    #[serde(rename = "queryUsed")]
    pub query_used: Query,
    pub restaurants: Vec<ScoredCandidate>,
    #[serde(rename = "excludedCount")]
    pub excluded_count: usize,
    pub tips: Vec<String>,
}

/// Response after merging a preference update
#[derive(Debug, Serialize)]
pub struct SetPrefsResponse {
    pub profile: String,
    pub stored: Preferences,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
