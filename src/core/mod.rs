// Core algorithm exports
pub mod recommender;
pub mod refine;
pub mod scoring;
pub mod store;

pub use recommender::{ProfileSnapshot, RankedResults, Recommender, RecommendError, SearchDefaults};
pub use refine::{refine, Refinement, RefreshPlan, MAX_RADIUS_KM, MIN_RADIUS_KM};
pub use scoring::{matches_avoid_list, rank, score_candidate};
pub use store::ProfileStore;
