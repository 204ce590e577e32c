//! Place-name normalization and fuzzy similarity.
//!
//! Names are compared after [`normalize_place_name`], so "Cafe Onion",
//! "cafe-onion" and "CAFE ONION!" are all the same string. Similarity is the
//! Levenshtein distance scaled into `[0, 1]` by the longer normalized length.

/// Punctuation removed during normalization.
const STRIPPED_PUNCTUATION: &[char] = &[
    '(', ')', '{', '}', '[', ']', '\'', '"', '`', '.', ',', '!', '?', ':', ';', '~', '@', '#',
    '$', '%', '^', '&', '*', '_', '+', '=', '<', '>', '\\', '/', '|', '-',
];

/// Lowercase, drop all whitespace and the fixed punctuation set.
///
/// Idempotent: normalizing an already normalized name returns it unchanged.
///
/// ```
/// use walk_planner::normalize_place_name;
/// assert_eq!(normalize_place_name("  Blue Bottle (Seongsu) "), "bluebottleseongsu");
/// ```
pub fn normalize_place_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED_PUNCTUATION.contains(c))
        .collect()
}

/// Similarity of two place names in `[0, 1]`.
///
/// Normalized Levenshtein over the normalized forms: both empty gives 1,
/// exactly one empty gives 0, otherwise `1 - distance / max_len`.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_place_name(a), &normalize_place_name(b))
}
