//! Static location → region lookup.
//!
//! Matching is exact and case-sensitive: the table holds the state names as
//! the records API spells them. Anything else is [`Region::Unknown`].

use disaster_map_disaster_models::Region;

/// Known locations and their regions.
const REGION_TABLE: &[(&str, Region)] = &[
    ("Andhra Pradesh", Region::South),
    ("Tamil Nadu", Region::South),
    ("Karnataka", Region::South),
    ("Uttar Pradesh", Region::North),
    ("Delhi", Region::North),
    ("Punjab", Region::North),
    ("Maharashtra", Region::West),
    ("Gujarat", Region::West),
    ("Bihar", Region::East),
    ("West Bengal", Region::East),
    ("Odisha", Region::East),
];

/// Classifies a location into a coarse region.
#[must_use]
pub fn classify(location: &str) -> Region {
    REGION_TABLE
        .iter()
        .find(|(name, _)| *name == location)
        .map_or(Region::Unknown, |(_, region)| *region)
}

/// Every location the classifier knows, with its region.
#[must_use]
pub const fn known_locations() -> &'static [(&'static str, Region)] {
    REGION_TABLE
}
