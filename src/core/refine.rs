use crate::models::{Preferences, PriceTier, Query};
use regex_lite::Regex;
use std::sync::OnceLock;

/// Radius floor applied by "closer" so repeated refinement cannot shrink
/// the search into nothing
pub const MIN_RADIUS_KM: f64 = 0.5;
/// Radius cap applied by "farther"
pub const MAX_RADIUS_KM: f64 = 30.0;

/// What the orchestrator should do after a refinement is merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
    /// Re-rank the raw candidates cached from the last provider call
    RerankCached,
    /// Call the provider again with the refined query
    Refetch,
}

/// Outcome of parsing a refinement instruction
#[derive(Debug, Clone)]
pub struct Refinement {
    pub query: Query,
    pub preferences: Preferences,
    /// Names of the rules that fired, in table order
    pub matched_rules: Vec<&'static str>,
    force_refresh: bool,
}

impl Refinement {
    /// Cache-vs-refetch contract: budget, avoid, rating, vibe and shrunken
    /// radius changes only re-rank; an explicit refresh or a radius that
    /// grew past what the cached candidates were fetched with refetches.
    pub fn refresh_plan(&self, cached: &Query) -> RefreshPlan {
        if self.force_refresh || self.query.radius_km > cached.radius_km {
            RefreshPlan::Refetch
        } else {
            RefreshPlan::RerankCached
        }
    }
}

/// Working state threaded through the rule table
struct Draft {
    query: Query,
    force_refresh: bool,
}

/// One entry of the rule table: a named trigger/transform pair. Rules are
/// evaluated in table order against the normalized instruction; every rule
/// that fires applies its transform, so "closer and cheaper, no bananas"
/// fires three. Conflicts resolve by application order, last write wins.
struct Rule {
    name: &'static str,
    apply: fn(&str, &mut Draft) -> bool,
}

const RULES: &[Rule] = &[
    Rule { name: "closer", apply: rule_closer },
    Rule { name: "farther", apply: rule_farther },
    Rule { name: "cheaper", apply: rule_cheaper },
    Rule { name: "pricier", apply: rule_pricier },
    Rule { name: "avoid", apply: rule_avoid },
    Rule { name: "craving", apply: rule_craving },
    Rule { name: "family", apply: rule_family },
    Rule { name: "date-night", apply: rule_date_night },
    Rule { name: "open-late", apply: rule_open_late },
    Rule { name: "refresh", apply: rule_refresh },
];

/// Parse a free-text refinement against the profile's last effective query.
///
/// Returns `None` when no rule matches, leaving the caller to surface an
/// unrecognized-refinement error with the profile untouched. Free text that
/// sits next to a matched trigger is ignored; only a wholly unmatched
/// instruction is an error.
pub fn refine(instruction: &str, last_query: &Query, preferences: &Preferences) -> Option<Refinement> {
    let normalized = instruction.trim().to_lowercase();

    let mut draft = Draft {
        query: last_query.clone(),
        force_refresh: false,
    };
    let mut matched_rules = Vec::new();

    for rule in RULES {
        if (rule.apply)(&normalized, &mut draft) {
            matched_rules.push(rule.name);
        }
    }

    if matched_rules.is_empty() {
        return None;
    }

    let mut preferences = preferences.clone();
    sync_preferences(&mut preferences, &draft.query);

    Some(Refinement {
        query: draft.query,
        preferences,
        matched_rules,
        force_refresh: draft.force_refresh,
    })
}

/// Carry refined query fields back into the stored preferences so later
/// searches remember them. Only fields the rule table can touch are synced;
/// dietary restrictions pass through untouched.
fn sync_preferences(preferences: &mut Preferences, query: &Query) {
    preferences.budget = query.budget;
    preferences.max_distance_km = Some(query.radius_km);
    preferences.min_rating = Some(query.min_rating);
    preferences.avoid = query.avoid.clone();
    preferences.vibe = query.vibe.clone();
    preferences.cuisines = query.cuisines.clone();
    preferences.open_now = Some(query.open_now);
}

fn rule_closer(instr: &str, draft: &mut Draft) -> bool {
    if !(instr.contains("closer") || instr.contains("nearer")) {
        return false;
    }
    draft.query.radius_km = (draft.query.radius_km * 0.7).max(MIN_RADIUS_KM);
    true
}

fn rule_farther(instr: &str, draft: &mut Draft) -> bool {
    if !(instr.contains("farther") || instr.contains("further") || instr.contains("more options")) {
        return false;
    }
    draft.query.radius_km = (draft.query.radius_km * 1.3).min(MAX_RADIUS_KM);
    true
}

fn rule_cheaper(instr: &str, draft: &mut Draft) -> bool {
    if !(instr.contains("cheaper") || instr.contains("less expensive")) {
        return false;
    }
    draft.query.budget = Some(
        draft
            .query
            .budget
            .map_or(PriceTier::MIN, PriceTier::cheaper),
    );
    true
}

fn rule_pricier(instr: &str, draft: &mut Draft) -> bool {
    if !(instr.contains("pricier") || instr.contains("fancier") || instr.contains("nicer")) {
        return false;
    }
    draft.query.budget = Some(
        draft
            .query
            .budget
            .map_or(PriceTier::MAX, PriceTier::pricier),
    );
    true
}

fn avoid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:no|not|avoid|without)\s+([a-z][a-z\- ]*)").unwrap())
}

fn rule_avoid(instr: &str, draft: &mut Draft) -> bool {
    let mut fired = false;
    for capture in avoid_regex().captures_iter(instr) {
        if let Some(term) = normalize_term(&capture[1]) {
            draft.query.avoid.insert(term);
            fired = true;
        }
    }
    fired
}

fn craving_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:want|craving|prefer|more)\s+([a-z][a-z\- ]*)").unwrap())
}

fn rule_craving(instr: &str, draft: &mut Draft) -> bool {
    let mut fired = false;
    for capture in craving_regex().captures_iter(instr) {
        match normalize_term(&capture[1]) {
            // "more options" belongs to the farther rule
            Some(term) if term != "option" => {
                draft.query.cuisines.insert(term);
                fired = true;
            }
            _ => {}
        }
    }
    fired
}

fn rule_family(instr: &str, draft: &mut Draft) -> bool {
    if !(instr.contains("family") || instr.contains("kid")) {
        return false;
    }
    draft.query.vibe.insert("family-friendly".to_string());
    true
}

fn rule_date_night(instr: &str, draft: &mut Draft) -> bool {
    if !(instr.contains("date night") || instr.contains("romantic")) {
        return false;
    }
    draft.query.min_rating = draft.query.min_rating.max(4.0);
    draft.query.vibe.insert("date-night".to_string());
    true
}

fn rule_open_late(instr: &str, draft: &mut Draft) -> bool {
    if !(instr.contains("open late") || instr.contains("open later") || instr.contains("open now")) {
        return false;
    }
    draft.query.open_now = true;
    true
}

fn rule_refresh(instr: &str, draft: &mut Draft) -> bool {
    if !(instr.contains("search again") || instr.contains("refresh")) {
        return false;
    }
    draft.force_refresh = true;
    true
}

/// Trim a captured term to its first clause, lowercase it, and strip a
/// plural "s" so "no bananas" blocks "banana" mentions too (substring
/// matching keeps the stripped form matching the plural)
fn normalize_term(raw: &str) -> Option<String> {
    let clause = raw
        .split(" and ")
        .next()
        .unwrap_or(raw)
        .split(" or ")
        .next()
        .unwrap_or(raw)
        .split(" but ")
        .next()
        .unwrap_or(raw);

    let mut term = clause.trim().trim_matches('-').to_lowercase();
    if term.is_empty() {
        return None;
    }
    if term.len() > 3 && term.ends_with('s') && !term.ends_with("ss") {
        term.pop();
    }
    Some(term)
}
