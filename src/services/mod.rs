// Service exports
pub mod listings;
pub mod yelp;

pub use listings::{ListingsProvider, ProviderError};
pub use yelp::YelpClient;
