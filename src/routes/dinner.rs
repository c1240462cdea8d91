use crate::core::{RankedResults, RecommendError, Recommender};
use crate::models::{
    DinnerResponse, ErrorResponse, FindDinnerRequest, HealthResponse, RefineDinnerRequest,
    SetPrefsRequest, SetPrefsResponse,
};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

/// Configure all dinner-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/dinner/prefs", web::post().to(set_prefs))
        .route("/dinner/find", web::post().to(find_dinner))
        .route("/dinner/refine", web::post().to(refine_dinner))
        .route("/dinner/memory/{profile}", web::get().to(memory));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Save/merge dinner preferences for a profile
///
/// POST /api/v1/dinner/prefs
///
/// Request body:
/// ```json
/// {
///   "profile": "alice",
///   "preferences": {"budget": 2, "cuisines": ["sushi"], "avoid": ["banana"]}
/// }
/// ```
async fn set_prefs(
    state: web::Data<AppState>,
    req: web::Json<SetPrefsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let req = req.into_inner();
    match state.recommender.set_prefs(&req.profile, req.preferences).await {
        Ok(stored) => HttpResponse::Ok().json(SetPrefsResponse {
            profile: req.profile,
            stored,
        }),
        Err(e) => error_response(e),
    }
}

/// Find restaurants matching the profile's preferences and explicit query
///
/// POST /api/v1/dinner/find
///
/// Request body:
/// ```json
/// {
///   "profile": "alice",
///   "query": {"location": {"address": "Waterloo, ON"}, "budget": 2}
/// }
/// ```
async fn find_dinner(
    state: web::Data<AppState>,
    req: web::Json<FindDinnerRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let req = req.into_inner();
    tracing::info!("Finding dinner for profile: {}", req.profile);

    match state.recommender.find_dinner(&req.profile, req.query).await {
        Ok(results) => {
            tracing::info!(
                "Returning {} restaurants for profile {} ({} excluded)",
                results.restaurants.len(),
                req.profile,
                results.excluded_count
            );
            HttpResponse::Ok().json(dinner_response(results))
        }
        Err(e) => error_response(e),
    }
}

/// Refine the previous search with a free-text instruction
///
/// POST /api/v1/dinner/refine
///
/// Request body:
/// ```json
/// {"profile": "alice", "instruction": "closer and cheaper, no bananas"}
/// ```
async fn refine_dinner(
    state: web::Data<AppState>,
    req: web::Json<RefineDinnerRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let req = req.into_inner();
    tracing::info!(
        "Refining dinner for profile {}: {:?}",
        req.profile,
        req.instruction
    );

    match state
        .recommender
        .refine_dinner(&req.profile, &req.instruction)
        .await
    {
        Ok(results) => HttpResponse::Ok().json(dinner_response(results)),
        Err(e) => error_response(e),
    }
}

/// Read-only diagnostic view of a profile's conversational memory
///
/// GET /api/v1/dinner/memory/{profile}
async fn memory(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let profile = path.into_inner();
    let snapshot = state.recommender.inspect(&profile).await;
    HttpResponse::Ok().json(snapshot)
}

fn dinner_response(results: RankedResults) -> DinnerResponse {
    DinnerResponse {
        query_used: results.query_used,
        restaurants: results.restaurants,
        excluded_count: results.excluded_count,
        tips: results.tips,
    }
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    tracing::info!("Validation failed: {:?}", errors);
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Map core errors to HTTP responses. Everything here is recoverable; the
/// profile is untouched by the failed operation.
fn error_response(err: RecommendError) -> HttpResponse {
    let (status, error) = match &err {
        RecommendError::InvalidPreference(_) => (StatusCode::BAD_REQUEST, "invalid_preference"),
        RecommendError::UnrecognizedRefinement(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "unrecognized_refinement")
        }
        RecommendError::NoPriorSearch => (StatusCode::CONFLICT, "no_prior_search"),
        RecommendError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::info!("Request rejected: {}", err);
    }

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                RecommendError::InvalidPreference("budget".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RecommendError::UnrecognizedRefinement("xyzzy".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (RecommendError::NoPriorSearch, StatusCode::CONFLICT),
        ];

        for (err, expected) in cases {
            let response = error_response(err);
            assert_eq!(response.status(), expected);
        }
    }
}
