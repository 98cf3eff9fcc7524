//! City-name disambiguation: "Porto Alegre" is the city, never a bairro.
//!
//! The classifier keeps anchoring on the city name when a query says
//! "em porto alegre", so the phrase is stripped before classification and
//! filtered again from the returned entities. Both layers stay in place;
//! the instruction alone is not reliable.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::remove_accents;

pub(crate) const CITY_NAME: &str = "PORTO ALEGRE";

static CITY_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bporto\s+alegre\b").unwrap());
static CITY_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:(?:em|de|do|da)\s+)?porto\s+alegre\b").unwrap());

/// Whole-word, case-insensitive detection of the city name.
pub(crate) fn mentions_city(query: &str) -> bool {
    CITY_MENTION.is_match(query)
}

/// Removes every city-name phrase ("em porto alegre", "de porto alegre",
/// bare "porto alegre") and collapses the leftover whitespace.
pub(crate) fn strip_city_mentions(query: &str) -> String {
    let stripped = CITY_PHRASE.replace_all(query, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when an entity entry is, or contains, the city name in any casing
/// or spacing variant.
pub(crate) fn is_city_entry(entry: &str) -> bool {
    let folded = remove_accents(&entry.to_uppercase());
    let folded = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    folded.contains(CITY_NAME)
}
