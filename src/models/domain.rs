use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Price tier in the 1..=4 range ($ .. $$$$)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PriceTier(u8);

impl PriceTier {
    pub const MIN: PriceTier = PriceTier(1);
    pub const MAX: PriceTier = PriceTier(4);

    pub fn new(tier: u8) -> Result<Self, String> {
        if (1..=4).contains(&tier) {
            Ok(Self(tier))
        } else {
            Err(format!("price tier must be between 1 and 4, got {}", tier))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// One tier down, floored at $
    pub fn cheaper(self) -> Self {
        Self(self.0.saturating_sub(1).max(1))
    }

    /// One tier up, capped at $$$$
    pub fn pricier(self) -> Self {
        Self((self.0 + 1).min(4))
    }

    /// Absolute tier gap, used for price-alignment scoring
    pub fn gap(self, other: PriceTier) -> u8 {
        self.0.abs_diff(other.0)
    }

    /// Parse Yelp-style "$".."$$$$" strings
    pub fn from_dollar_signs(s: &str) -> Option<Self> {
        let count = s.chars().filter(|c| *c == '$').count();
        if count >= 1 && count <= 4 && s.chars().all(|c| c == '$') {
            Some(Self(count as u8))
        } else {
            None
        }
    }
}

impl TryFrom<u8> for PriceTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PriceTier> for u8 {
    fn from(tier: PriceTier) -> u8 {
        tier.0
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", "$".repeat(self.0 as usize))
    }
}

/// Three-state patch cell: a missing JSON field leaves the stored value
/// alone, an explicit `null` clears it, a value replaces it.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Absent,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Merge into an optional slot
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Clear => *slot = None,
            Patch::Set(v) => *slot = Some(v),
        }
    }
}

impl<T> Patch<BTreeSet<T>>
where
    T: Ord,
{
    /// Merge into a set-valued field; `Clear` empties it
    pub fn apply_to_set(self, slot: &mut BTreeSet<T>) {
        match self {
            Patch::Absent => {}
            Patch::Clear => slot.clear(),
            Patch::Set(v) => *slot = v,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Invoked only when the field is present in the input: null maps to
        // Clear, a value to Set. A missing field falls back to Default.
        Ok(match Option::<T>::deserialize(deserializer)? {
            None => Patch::Clear,
            Some(v) => Patch::Set(v),
        })
    }
}

/// Stored dinner preferences for one profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub cuisines: BTreeSet<String>,
    #[serde(default)]
    pub dietary: BTreeSet<String>,
    #[serde(default)]
    pub budget: Option<PriceTier>,
    #[serde(rename = "maxDistanceKm", default)]
    pub max_distance_km: Option<f64>,
    #[serde(rename = "minRating", default)]
    pub min_rating: Option<f64>,
    /// Lowercase-normalized keyword blocklist
    #[serde(default)]
    pub avoid: BTreeSet<String>,
    #[serde(default)]
    pub vibe: BTreeSet<String>,
    #[serde(rename = "openNow", default)]
    pub open_now: Option<bool>,
}

impl Preferences {
    /// Field-by-field merge of a partial update; unmentioned fields keep
    /// their stored values. Avoid terms are lowercased on the way in.
    pub fn apply(&mut self, patch: PreferencesPatch) {
        patch.cuisines.apply_to_set(&mut self.cuisines);
        patch.dietary.apply_to_set(&mut self.dietary);
        patch.budget.apply_to(&mut self.budget);
        patch.max_distance_km.apply_to(&mut self.max_distance_km);
        patch.min_rating.apply_to(&mut self.min_rating);
        match patch.avoid {
            Patch::Set(avoid) => {
                self.avoid = avoid
                    .into_iter()
                    .map(|a| a.trim().to_lowercase())
                    .collect();
            }
            other => other.apply_to_set(&mut self.avoid),
        }
        patch.vibe.apply_to_set(&mut self.vibe);
        patch.open_now.apply_to(&mut self.open_now);
    }
}

/// Partial preference update; see [`Patch`] for the merge semantics
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesPatch {
    #[serde(default)]
    pub cuisines: Patch<BTreeSet<String>>,
    #[serde(default)]
    pub dietary: Patch<BTreeSet<String>>,
    #[serde(default)]
    pub budget: Patch<PriceTier>,
    #[serde(rename = "maxDistanceKm", default)]
    pub max_distance_km: Patch<f64>,
    #[serde(rename = "minRating", default)]
    pub min_rating: Patch<f64>,
    #[serde(default)]
    pub avoid: Patch<BTreeSet<String>>,
    #[serde(default)]
    pub vibe: Patch<BTreeSet<String>>,
    #[serde(rename = "openNow", default)]
    pub open_now: Patch<bool>,
}

impl PreferencesPatch {
    /// Reject out-of-range fields before anything is merged, so a bad
    /// patch never partially mutates a profile.
    pub fn validate(&self) -> Result<(), String> {
        if let Patch::Set(r) = &self.min_rating {
            if !(0.0..=5.0).contains(r) {
                return Err(format!("minRating must be within [0, 5], got {}", r));
            }
        }
        if let Patch::Set(d) = &self.max_distance_km {
            if *d <= 0.0 || !d.is_finite() {
                return Err(format!("maxDistanceKm must be positive, got {}", d));
            }
        }
        Ok(())
    }
}

/// Search origin: coordinates or a free-form address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Point { latitude: f64, longitude: f64 },
    Address { address: String },
}

/// Effective provider query. Immutable once built; refinement constructs a
/// new one rather than editing in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub location: Location,
    #[serde(default)]
    pub cuisines: BTreeSet<String>,
    #[serde(default)]
    pub dietary: BTreeSet<String>,
    #[serde(default)]
    pub budget: Option<PriceTier>,
    #[serde(rename = "radiusKm")]
    pub radius_km: f64,
    #[serde(rename = "minRating")]
    pub min_rating: f64,
    /// Free-text keyword term, if any
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub avoid: BTreeSet<String>,
    #[serde(default)]
    pub vibe: BTreeSet<String>,
    #[serde(rename = "openNow")]
    pub open_now: bool,
    pub limit: usize,
}

/// Raw restaurant record from the listings provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub rating: f64,
    #[serde(rename = "reviewCount")]
    pub review_count: u32,
    #[serde(rename = "priceTier", default)]
    pub price_tier: Option<PriceTier>,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Review excerpts, used for keyword and avoid-term matching
    #[serde(default)]
    pub snippets: Vec<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Named contribution to a composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Rating,
    Reviews,
    Distance,
    Price,
    Keyword,
    LowRatingPenalty,
    OutOfRangePenalty,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub component: ComponentKind,
    pub value: f64,
}

/// Candidate plus its composite score and per-component breakdown.
/// `excluded` marks avoid-list hits, which are retained for diagnostics
/// but never shown in ranked output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
    pub breakdown: Vec<ScoreComponent>,
    pub excluded: bool,
}

/// Scoring weights and shape constants. All tunable via configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub rating: f64,
    pub reviews: f64,
    pub distance: f64,
    pub price: f64,
    pub keyword: f64,
    /// Added to the composite when rating < min_rating (large negative)
    pub low_rating_penalty: f64,
    /// Added to the composite when distance exceeds the radius
    pub out_of_range_penalty: f64,
    /// Review count at which the review component saturates
    pub review_saturation: f64,
    /// Keyword occurrences counted before the component maxes out
    pub keyword_cap: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            rating: 0.35,
            reviews: 0.20,
            distance: 0.20,
            price: 0.15,
            keyword: 0.10,
            low_rating_penalty: -100.0,
            out_of_range_penalty: -50.0,
            review_saturation: 500.0,
            keyword_cap: 5,
        }
    }
}

/// Conversational session state for one profile key
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub preferences: Preferences,
    pub last_query: Option<Query>,
    /// Most recent ranked results, excluded candidates included
    pub last_results: Vec<ScoredCandidate>,
    /// Raw provider response retained for cache-based re-ranking
    pub last_raw: Vec<Candidate>,
}

/// Lifecycle position, derived from what the profile has seen so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileState {
    Empty,
    Configured,
    Searched,
}

impl Profile {
    pub fn state(&self) -> ProfileState {
        if self.last_query.is_some() {
            ProfileState::Searched
        } else if self.preferences != Preferences::default() {
            ProfileState::Configured
        } else {
            ProfileState::Empty
        }
    }
}
