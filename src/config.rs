use crate::core::SearchDefaults;
use crate::models::ScoringWeights;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub search_timeout_secs: Option<u64>,
    pub review_timeout_secs: Option<u64>,
}

fn default_provider_base_url() -> String {
    "https://api.yelp.com/v3".to_string()
}

/// Defaults applied to searches when neither preferences nor the explicit
/// query set a value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchSettings {
    pub radius_km: Option<f64>,
    pub min_rating: Option<f64>,
    pub open_now: Option<bool>,
    pub limit: Option<usize>,
    pub snippet_count: Option<usize>,
}

impl SearchSettings {
    pub fn to_defaults(&self) -> SearchDefaults {
        let base = SearchDefaults::default();
        SearchDefaults {
            radius_km: self.radius_km.unwrap_or(base.radius_km),
            min_rating: self.min_rating.unwrap_or(base.min_rating),
            open_now: self.open_now.unwrap_or(base.open_now),
            limit: self.limit.unwrap_or(base.limit),
            snippet_count: self.snippet_count.unwrap_or(base.snippet_count),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_reviews_weight")]
    pub reviews: f64,
    #[serde(default = "default_distance_weight")]
    pub distance: f64,
    #[serde(default = "default_price_weight")]
    pub price: f64,
    #[serde(default = "default_keyword_weight")]
    pub keyword: f64,
    #[serde(default = "default_low_rating_penalty")]
    pub low_rating_penalty: f64,
    #[serde(default = "default_out_of_range_penalty")]
    pub out_of_range_penalty: f64,
    #[serde(default = "default_review_saturation")]
    pub review_saturation: f64,
    #[serde(default = "default_keyword_cap")]
    pub keyword_cap: u32,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            rating: default_rating_weight(),
            reviews: default_reviews_weight(),
            distance: default_distance_weight(),
            price: default_price_weight(),
            keyword: default_keyword_weight(),
            low_rating_penalty: default_low_rating_penalty(),
            out_of_range_penalty: default_out_of_range_penalty(),
            review_saturation: default_review_saturation(),
            keyword_cap: default_keyword_cap(),
        }
    }
}

impl WeightsConfig {
    pub fn to_weights(&self) -> ScoringWeights {
        ScoringWeights {
            rating: self.rating,
            reviews: self.reviews,
            distance: self.distance,
            price: self.price,
            keyword: self.keyword,
            low_rating_penalty: self.low_rating_penalty,
            out_of_range_penalty: self.out_of_range_penalty,
            review_saturation: self.review_saturation,
            keyword_cap: self.keyword_cap,
        }
    }
}

fn default_rating_weight() -> f64 { 0.35 }
fn default_reviews_weight() -> f64 { 0.20 }
fn default_distance_weight() -> f64 { 0.20 }
fn default_price_weight() -> f64 { 0.15 }
fn default_keyword_weight() -> f64 { 0.10 }
fn default_low_rating_penalty() -> f64 { -100.0 }
fn default_out_of_range_penalty() -> f64 { -50.0 }
fn default_review_saturation() -> f64 { 500.0 }
fn default_keyword_cap() -> u32 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, config/local.toml)
    /// 3. Environment variables (prefixed with TABLESCOUT_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g. TABLESCOUT_SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("TABLESCOUT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings)?;
        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("TABLESCOUT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Pull the Yelp key from the environment so it never has to live in a
/// config file. YELP_API_KEY is checked first, then the prefixed form.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let api_key = env::var("YELP_API_KEY")
        .or_else(|_| env::var("TABLESCOUT_PROVIDER__API_KEY"))
        .ok();

    let mut builder = Config::builder().add_source(settings);
    if let Some(key) = api_key {
        builder = builder.set_override("provider.api_key", key)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = WeightsConfig::default();
        assert_eq!(weights.rating, 0.35);
        assert_eq!(weights.reviews, 0.20);
        assert_eq!(weights.distance, 0.20);
        assert_eq!(weights.price, 0.15);
        assert_eq!(weights.keyword, 0.10);
        // Penalties dominate the 0-100 composite scale
        assert!(weights.low_rating_penalty <= -100.0);
        assert!(weights.out_of_range_penalty <= -50.0);
    }

    #[test]
    fn test_default_search_settings() {
        let defaults = SearchSettings::default().to_defaults();
        assert_eq!(defaults.radius_km, 3.0);
        assert_eq!(defaults.min_rating, 4.0);
        assert!(defaults.open_now);
        assert_eq!(defaults.limit, 12);
        assert_eq!(defaults.snippet_count, 5);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }
}
