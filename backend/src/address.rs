//! Free-text address cleanup shared by the gazetteer and the geocoder.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const ROAD_KEYWORDS: [&str; 8] = [
    "road", "street", "mawatha", "lane", "avenue", "place", "terrace", "drive",
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static COMMAS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*(?:,\s*)+").expect("valid regex"));
static COLOMBO_DISTRICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:colombo|col)\s*[-.]?\s*0?(\d{1,2})\b").expect("valid regex")
});
static POSTAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}\b").expect("valid regex"));
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"));

/// Collapses whitespace and commas, trims separators, and rewrites Colombo
/// district numbers (`Colombo 7`, `Colombo-07`, `Col 7`) as `Colombo 07`.
pub fn clean_address(raw: &str) -> String {
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ");
    let commas = COMMAS.replace_all(&collapsed, ", ");
    let trimmed = commas.trim_matches(|c: char| c == ',' || c.is_whitespace());

    COLOMBO_DISTRICT
        .replace_all(trimmed, |caps: &Captures| match caps[1].parse::<u8>() {
            Ok(n @ 1..=15) => format!("Colombo {n:02}"),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// Lowercased [`clean_address`], the form gazetteer keys are matched against.
pub fn normalize_for_match(raw: &str) -> String {
    clean_address(raw).to_lowercase()
}

pub fn mentions_country(text: &str) -> bool {
    text.to_lowercase().contains("sri lanka")
}

/// Query variants tried in order against each geocoding provider.
pub fn query_variants(cleaned: &str) -> Vec<String> {
    if cleaned.is_empty() {
        return Vec::new();
    }
    let mut variants = vec![cleaned.to_string()];
    if !mentions_country(cleaned) {
        variants.push(format!("{cleaned}, Sri Lanka"));
    }
    variants
}

/// Lowercase words of at least three characters, first occurrence order.
pub fn significant_words(text: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in WORD.find_iter(&text.to_lowercase()) {
        let word = word.as_str();
        if word.chars().count() >= 3 && !words.iter().any(|w| w == word) {
            words.push(word.to_string());
        }
    }
    words
}

pub fn road_keywords(text: &str) -> Vec<&'static str> {
    let words = significant_words(text);
    ROAD_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| words.iter().any(|w| w == keyword))
        .collect()
}

/// Five-digit postcodes plus canonical `colombo NN` districts, lowercased.
pub fn postal_codes(text: &str) -> Vec<String> {
    let normalized = normalize_for_match(text);
    let mut codes: Vec<String> = POSTAL_CODE
        .find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect();
    codes.extend(
        COLOMBO_DISTRICT
            .find_iter(&normalized)
            .map(|m| m.as_str().to_string())
            .filter(|district| district.starts_with("colombo ")),
    );
    codes
}
