//! Heuristic ranking of geocoder candidates.
//!
//! Scores are unbounded positive reals with no normalisation. The highest
//! score wins and ties go to the candidate seen first.

use crate::address::{normalize_for_match, postal_codes, road_keywords, significant_words};
use crate::models::Coordinate;
use crate::routing::haversine_km;

use super::GeocodeCandidate;

const FULL_MATCH_BONUS: f64 = 50.0;
const LEADING_SEGMENT_BONUS: f64 = 25.0;
const WORD_MATCH_BONUS: f64 = 10.0;
const COUNTRY_BONUS: f64 = 5.0;
const COLOMBO_BONUS: f64 = 5.0;
const ROAD_KEYWORD_BONUS: f64 = 15.0;
const POSTAL_CODE_BONUS: f64 = 20.0;
const IMPORTANCE_WEIGHT: f64 = 20.0;
const PROXIMITY_BONUS: f64 = 10.0;
const PROXIMITY_RADIUS_KM: f64 = 50.0;

/// Pre-digested query used to score every candidate of one lookup.
#[derive(Debug, Clone)]
pub struct QueryContext {
    normalized: String,
    leading_segment: Option<String>,
    words: Vec<String>,
    road_keywords: Vec<&'static str>,
    postal_codes: Vec<String>,
    mentions_colombo: bool,
    reference: Coordinate,
}

impl QueryContext {
    pub fn new(address: &str, reference: Coordinate) -> Self {
        let normalized = normalize_for_match(address);
        let leading_segment = normalized
            .split(',')
            .next()
            .map(str::trim)
            .filter(|segment| segment.chars().count() >= 3 && *segment != normalized)
            .map(str::to_string);

        Self {
            leading_segment,
            words: significant_words(&normalized),
            road_keywords: road_keywords(&normalized),
            postal_codes: postal_codes(&normalized),
            mentions_colombo: normalized.contains("colombo"),
            normalized,
            reference,
        }
    }
}

pub fn score_candidate(context: &QueryContext, candidate: &GeocodeCandidate) -> f64 {
    let display = normalize_for_match(&candidate.display_name);
    let mut score = 0.0;

    if !context.normalized.is_empty() && display.contains(&context.normalized) {
        score += FULL_MATCH_BONUS;
    } else if let Some(segment) = &context.leading_segment {
        if display.contains(segment.as_str()) {
            score += LEADING_SEGMENT_BONUS;
        }
    }

    let display_words = significant_words(&display);
    let matched_words = context
        .words
        .iter()
        .filter(|word| display_words.contains(word))
        .count();
    score += matched_words as f64 * WORD_MATCH_BONUS;

    if display.contains("sri lanka") {
        score += COUNTRY_BONUS;
    }
    if context.mentions_colombo && display.contains("colombo") {
        score += COLOMBO_BONUS;
    }

    let display_roads = road_keywords(&display);
    if context
        .road_keywords
        .iter()
        .any(|keyword| display_roads.contains(keyword))
    {
        score += ROAD_KEYWORD_BONUS;
    }

    let display_codes = postal_codes(&display);
    if context
        .postal_codes
        .iter()
        .any(|code| display_codes.contains(code))
    {
        score += POSTAL_CODE_BONUS;
    }

    if candidate.importance.is_finite() {
        score += candidate.importance.max(0.0) * IMPORTANCE_WEIGHT;
    }
    score += place_type_weight(&candidate.place_type);
    score += proximity_bonus(haversine_km(context.reference, candidate.coordinate()));

    score
}

/// Scores every candidate and keeps the best; the first-seen wins ties.
pub fn best_candidate(
    candidates: impl IntoIterator<Item = GeocodeCandidate>,
    context: &QueryContext,
) -> Option<GeocodeCandidate> {
    let mut best: Option<GeocodeCandidate> = None;
    for mut candidate in candidates {
        candidate.score = score_candidate(context, &candidate);
        tracing::trace!(
            "{} candidate {:?} scored {:.1}",
            candidate.provider,
            candidate.display_name,
            candidate.score
        );
        if best
            .as_ref()
            .map_or(true, |current| candidate.score > current.score)
        {
            best = Some(candidate);
        }
    }
    best
}

pub fn place_type_weight(place_type: &str) -> f64 {
    match place_type.to_lowercase().as_str() {
        "house" | "building" | "premise" | "street_address" => 15.0,
        "road" | "street" | "route" | "residential" => 12.0,
        "suburb" | "neighbourhood" | "neighborhood" | "quarter" | "sublocality" => 10.0,
        "village" | "town" | "hamlet" => 8.0,
        "city" | "locality" => 5.0,
        _ => 2.0,
    }
}

/// Full bonus inside the radius, decaying as `radius / distance` beyond it.
pub fn proximity_bonus(distance_km: f64) -> f64 {
    if !distance_km.is_finite() {
        return 0.0;
    }
    if distance_km <= PROXIMITY_RADIUS_KM {
        PROXIMITY_BONUS
    } else {
        PROXIMITY_BONUS * PROXIMITY_RADIUS_KM / distance_km
    }
}
