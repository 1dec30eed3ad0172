//! Splitting of compound location strings.
//!
//! Disaster rows describe affected areas as free text, e.g.
//!
//! ```text
//! Balasore (Baleshwar), Bhadrak, Kendrapada and Jagatsinghpur (Odisha); Kolkata (West Bengal)
//! ```
//!
//! Geocoders only understand one place per query, so the string is broken
//! into individual place names before lookup.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use disaster_map_disaster_models::UNKNOWN_LOCATION;
use regex::Regex;

/// Parenthesized groups (innermost level only).
static PARENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap_or_else(|_| unreachable!()));

/// The word "and" used as a list separator.
static AND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i) and ").unwrap_or_else(|_| unreachable!()));

/// Splits `raw` into distinct place names in order of first appearance.
///
/// Parenthesized qualifiers are dropped, and ` and ` / `;` are treated like
/// commas.
#[must_use]
pub fn split_location(raw: &str) -> Vec<String> {
    let without_parens = PARENS_RE.replace_all(raw, "");
    let normalized = AND_RE.replace_all(&without_parens, ",").replace(';', ",");

    let mut seen = BTreeSet::new();
    normalized
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter(|part| seen.insert(part.to_string()))
        .map(ToString::to_string)
        .collect()
}

/// Builds the geocoder queries for a record's location.
///
/// Each place is qualified with `country` when one is known. The
/// [`UNKNOWN_LOCATION`] sentinel produces no queries.
#[must_use]
pub fn place_queries(location: &str, country: &str) -> Vec<(String, String)> {
    if location == UNKNOWN_LOCATION {
        return Vec::new();
    }
    let country = country.trim();
    split_location(location)
        .into_iter()
        .map(|place| {
            let query = if country.is_empty() {
                place.clone()
            } else {
                format!("{place}, {country}")
            };
            (place, query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_compound_location() {
        let parts = split_location(
            "Balasore (Baleshwar), Bhadrak, Kendrapada and Jagatsinghpur (Odisha); \
             East Midunapur, Kolkata and Hoogli (West Bengal)",
        );
        assert_eq!(
            parts,
            [
                "Balasore",
                "Bhadrak",
                "Kendrapada",
                "Jagatsinghpur",
                "East Midunapur",
                "Kolkata",
                "Hoogli"
            ]
        );
    }

    #[test]
    fn and_is_case_insensitive_and_word_bounded() {
        assert_eq!(split_location("Tamil Nadu AND Puducherry"), ["Tamil Nadu", "Puducherry"]);
        // "and" inside a name is not a separator.
        assert_eq!(split_location("Andaman"), ["Andaman"]);
    }

    #[test]
    fn dedups_preserving_order() {
        assert_eq!(split_location("Pune, Raigad, Pune"), ["Pune", "Raigad"]);
    }

    #[test]
    fn empty_pieces_are_dropped() {
        assert!(split_location(" , ;() ").is_empty());
    }

    #[test]
    fn queries_carry_country() {
        let queries = place_queries("Raigad, Pune Districts (Maharashtra State)", "India");
        assert_eq!(
            queries,
            [
                ("Raigad".to_string(), "Raigad, India".to_string()),
                ("Pune Districts".to_string(), "Pune Districts, India".to_string()),
            ]
        );
        assert_eq!(place_queries("Puri", "")[0].1, "Puri");
        assert!(place_queries(UNKNOWN_LOCATION, "India").is_empty());
    }
}
