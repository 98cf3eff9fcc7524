//! Normalization of zone and bairro names.
//!
//! Queries and classifier output spell the same entity many ways ("zot7",
//! "ZONA 07", "no bairro Três Figueiras"). Matching against the structured
//! tables requires the canonical uppercase forms. Bairro names keep their
//! accents ("TRÊS FIGUEIRAS"); accent folding is only used for keyword
//! matching, where users type both "inundação" and "inundacao".

use std::sync::LazyLock;

use regex::Regex;

static ZONE_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:ZOT|ZONA)\s*\d+(?:\.\d+)?").unwrap());
static ZONE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:ZOT|ZONA)\s*0*(\d+)((?:\.\d+)?\s*[ABC]?)$").unwrap());
static BAIRRO_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:no|do|da|de|em)\s+bairro\s+|\bbairro\s+").unwrap());
static BAIRRO_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:no|do|da|de|em)?\s*bairro\s+([a-záàâãäéèêëíìîïóòôõöúùûüç\s]+)").unwrap()
});

/// Folds accented characters to their plain ASCII counterparts.
pub(crate) fn remove_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            _ => c,
        })
        .collect()
}

/// Canonical uppercase form of a bairro name. Accents are preserved since
/// the structured tables keep them.
pub(crate) fn normalize_bairro(input: &str) -> String {
    let stripped = BAIRRO_PREFIX.replace_all(input, "");
    let trimmed = stripped.trim().trim_matches(['.', '?', '!', ',']);
    trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Canonical zone code: "zona 7", "ZOT7" and "ZOT 07" all become "ZOT 07".
/// Subdivisions are kept ("zot 8.3" becomes "ZOT 08.3").
pub(crate) fn normalize_zone(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = ZONE_CODE.captures(trimmed) {
        let number: u32 = caps[1].parse().unwrap_or(0);
        let suffix = caps.get(2).map_or(String::new(), |m| {
            m.as_str().split_whitespace().collect::<String>().to_uppercase()
        });
        format!("ZOT {number:02}{suffix}")
    } else {
        trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    }
}

/// Zone codes mentioned anywhere in the query, normalized and deduplicated.
pub(crate) fn extract_zone_terms(query: &str) -> Vec<String> {
    let mut found = Vec::new();
    for m in ZONE_TERM.find_iter(query) {
        let normalized = normalize_zone(m.as_str());
        if !found.contains(&normalized) {
            found.push(normalized);
        }
    }
    found
}

/// Bairro names introduced by the word "bairro", normalized.
pub(crate) fn extract_bairro_terms(query: &str) -> Vec<String> {
    let mut found = Vec::new();
    for caps in BAIRRO_TERM.captures_iter(query) {
        let name = normalize_bairro(&caps[1]);
        if !name.is_empty() && !found.contains(&name) {
            found.push(name);
        }
    }
    found
}

/// A 1-3 word query is likely just a bairro name ("três figueiras").
/// Returns the normalized candidate, or `None` for longer queries.
pub(crate) fn short_query_candidate(query: &str) -> Option<String> {
    let trimmed = query.trim().trim_end_matches(['.', '?', '!']).trim();
    let words = trimmed.split_whitespace().count();
    if words == 0 || words > 3 {
        return None;
    }
    let name = normalize_bairro(trimmed);
    (name.chars().count() > 2).then_some(name)
}
