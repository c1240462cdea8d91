use crate::models::{Candidate, Location, PriceTier, Query};
use crate::services::listings::{ListingsProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Yelp caps search radius at 40 km
const MAX_RADIUS_METERS: u64 = 40_000;
const MIN_RADIUS_METERS: u64 = 100;
/// Yelp rejects limits above 50
const MAX_LIMIT: usize = 50;
/// Review snippets are trimmed to roughly one sentence
const SNIPPET_MAX_CHARS: usize = 160;

/// Yelp Fusion API client
///
/// Handles all communication with Yelp including:
/// - Business search (the listings query)
/// - Review excerpt fetch for result enrichment
pub struct YelpClient {
    base_url: String,
    api_key: String,
    client: Client,
    search_timeout: Duration,
    review_timeout: Duration,
}

impl YelpClient {
    pub fn new(
        base_url: String,
        api_key: String,
        search_timeout_secs: u64,
        review_timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().build()?;
        Ok(Self {
            base_url,
            api_key,
            client,
            search_timeout: Duration::from_secs(search_timeout_secs),
            review_timeout: Duration::from_secs(review_timeout_secs),
        })
    }

    fn require_key(&self) -> Result<&str, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        Ok(&self.api_key)
    }

    /// Translate an effective query into Yelp search parameters
    fn search_params(query: &Query) -> Result<Vec<(String, String)>, ProviderError> {
        let mut params: Vec<(String, String)> = vec![
            ("limit".into(), query.limit.min(MAX_LIMIT).to_string()),
            ("sort_by".into(), "best_match".into()),
        ];

        match &query.location {
            Location::Point {
                latitude,
                longitude,
            } => {
                params.push(("latitude".into(), latitude.to_string()));
                params.push(("longitude".into(), longitude.to_string()));
            }
            Location::Address { address } => {
                if address.trim().is_empty() {
                    return Err(ProviderError::InvalidQuery(
                        "location required: coordinates or a non-empty address".into(),
                    ));
                }
                params.push(("location".into(), address.clone()));
            }
        }

        let radius_m = ((query.radius_km * 1000.0) as u64)
            .min(MAX_RADIUS_METERS)
            .max(MIN_RADIUS_METERS);
        params.push(("radius".into(), radius_m.to_string()));

        let categories: Vec<&str> = query
            .cuisines
            .iter()
            .chain(query.dietary.iter())
            .map(String::as_str)
            .collect();
        if !categories.is_empty() {
            params.push(("categories".into(), categories.join(",")));
        }

        if query.open_now {
            params.push(("open_now".into(), "true".into()));
        }

        if let Some(budget) = query.budget {
            params.push(("price".into(), budget.value().to_string()));
        }

        let mut terms: Vec<&str> = Vec::new();
        if let Some(term) = &query.term {
            terms.push(term);
        }
        terms.extend(query.vibe.iter().map(String::as_str));
        if !terms.is_empty() {
            params.push(("term".into(), terms.join(" ")));
        }

        Ok(params)
    }
}

#[async_trait]
impl ListingsProvider for YelpClient {
    async fn search(&self, query: &Query) -> Result<Vec<Candidate>, ProviderError> {
        let key = self.require_key()?;
        let params = Self::search_params(query)?;
        let url = format!(
            "{}/businesses/search",
            self.base_url.trim_end_matches('/')
        );

        tracing::debug!("Yelp search: {} params={:?}", url, params);

        let response = self
            .client
            .get(&url)
            .bearer_auth(key)
            .query(&params)
            .timeout(self.search_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ProviderError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read body".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(body.businesses.into_iter().map(Business::into_candidate).collect())
    }

    async fn review_snippet(&self, business_id: &str) -> Result<Option<String>, ProviderError> {
        let key = self.require_key()?;
        let url = format!(
            "{}/businesses/{}/reviews",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(business_id)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(key)
            .timeout(self.review_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: ReviewsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(body
            .reviews
            .into_iter()
            .next()
            .map(|r| trim_snippet(&r.text))
            .filter(|s| !s.is_empty()))
    }
}

/// Collapse whitespace and trim to a display-friendly excerpt
fn trim_snippet(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > SNIPPET_MAX_CHARS {
        let cut: String = collapsed.chars().take(SNIPPET_MAX_CHARS - 3).collect();
        format!("{}…", cut.trim_end())
    } else {
        collapsed
    }
}

// --- Yelp wire format ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<Business>,
}

#[derive(Debug, Deserialize)]
struct Business {
    id: String,
    name: String,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    review_count: u32,
    #[serde(default)]
    price: Option<String>,
    /// Meters from the search origin
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    location: Option<BusinessLocation>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    display_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct BusinessLocation {
    #[serde(default)]
    address1: Option<String>,
    #[serde(default)]
    address2: Option<String>,
    #[serde(default)]
    address3: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    zip_code: Option<String>,
}

impl BusinessLocation {
    fn join(self) -> Option<String> {
        let parts: Vec<String> = [
            self.address1,
            self.address2,
            self.address3,
            self.city,
            self.state,
            self.zip_code,
        ]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

impl Business {
    fn into_candidate(self) -> Candidate {
        Candidate {
            id: self.id,
            name: self.name,
            rating: self.rating,
            review_count: self.review_count,
            price_tier: self.price.as_deref().and_then(PriceTier::from_dollar_signs),
            distance_km: (self.distance / 10.0).round() / 100.0,
            categories: self.categories.into_iter().map(|c| c.title).collect(),
            snippets: Vec::new(),
            address: self.location.and_then(BusinessLocation::join),
            url: self.url,
            phone: self.display_phone,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReviewsResponse {
    #[serde(default)]
    reviews: Vec<Review>,
}

#[derive(Debug, Deserialize)]
struct Review {
    #[serde(default)]
    text: String,
}
