#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregate view types.
//!
//! Each view is a derived summary folded from the full normalized record
//! set. Views are rebuilt from scratch on every run and never patched.
//! Ordered maps keep serialization stable across runs.

use std::collections::BTreeMap;

use disaster_map_disaster_models::{DisasterCategory, FIRST_YEAR, LAST_YEAR, Region};
use serde::{Deserialize, Serialize};

/// Year → category → summed deaths. Always holds every year of the window
/// and every category, zero-filled.
pub type YearlyFatality = BTreeMap<u16, BTreeMap<DisasterCategory, u64>>;

/// Region → category → event count. Only regions (and categories within a
/// region) with at least one event are present.
pub type RegionFrequency = BTreeMap<Region, BTreeMap<DisasterCategory, u64>>;

/// Year → event count across all categories. Only years with at least one
/// event are present.
pub type YearlyFrequency = BTreeMap<u16, u64>;

/// Category → summed deaths. Only categories with at least one event are
/// present.
pub type CategoryTotals = BTreeMap<DisasterCategory, u64>;

/// Returns a [`YearlyFatality`] with every year and category set to 0.
#[must_use]
pub fn zeroed_fatality(categories: &[DisasterCategory]) -> YearlyFatality {
    (FIRST_YEAR..=LAST_YEAR)
        .map(|year| (year, categories.iter().map(|c| (*c, 0)).collect()))
        .collect()
}

/// The derived views behind the dashboard charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateViews {
    /// Deaths per year per category (line and stacked bar charts).
    pub yearly_fatality: YearlyFatality,
    /// Event counts per region per category (heat table).
    pub region_frequency: RegionFrequency,
    /// Event counts per year (frequency line chart).
    pub yearly_frequency: YearlyFrequency,
    /// Deaths per category (distribution pie chart).
    pub category_totals: CategoryTotals,
}

impl Default for AggregateViews {
    fn default() -> Self {
        Self::empty(DisasterCategory::all())
    }
}

impl AggregateViews {
    /// Views with no events, the fatality view zero-filled for `categories`.
    #[must_use]
    pub fn empty(categories: &[DisasterCategory]) -> Self {
        Self {
            yearly_fatality: zeroed_fatality(categories),
            region_frequency: RegionFrequency::new(),
            yearly_frequency: YearlyFrequency::new(),
            category_totals: CategoryTotals::new(),
        }
    }

    /// Deaths recorded for `category` in `year`; 0 outside the window.
    #[must_use]
    pub fn deaths(&self, year: u16, category: DisasterCategory) -> u64 {
        self.yearly_fatality
            .get(&year)
            .and_then(|by_category| by_category.get(&category))
            .copied()
            .unwrap_or(0)
    }

    /// Events of `category` in `region`; 0 if none.
    #[must_use]
    pub fn region_count(&self, region: Region, category: DisasterCategory) -> u64 {
        self.region_frequency
            .get(&region)
            .and_then(|by_category| by_category.get(&category))
            .copied()
            .unwrap_or(0)
    }

    /// Total deaths across the fatality view, saturating at `u64::MAX`.
    #[must_use]
    pub fn total_deaths(&self) -> u64 {
        self.yearly_fatality
            .values()
            .flat_map(BTreeMap::values)
            .fold(0, |acc, n| acc.saturating_add(*n))
    }

    /// Total events across the frequency view, saturating at `u64::MAX`.
    #[must_use]
    pub fn total_events(&self) -> u64 {
        self.yearly_frequency
            .values()
            .fold(0, |acc, n| acc.saturating_add(*n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_views_follow_fill_policies() {
        let views = AggregateViews::default();
        assert_eq!(views.yearly_fatality.len(), 25);
        assert!(views.yearly_fatality.values().all(|row| row.len() == 5));
        assert!(views.region_frequency.is_empty());
        assert!(views.yearly_frequency.is_empty());
        assert!(views.category_totals.is_empty());
        assert_eq!(views.total_deaths(), 0);
    }

    #[test]
    fn accessors_default_to_zero() {
        let views = AggregateViews::default();
        assert_eq!(views.deaths(1990, DisasterCategory::Flood), 0);
        assert_eq!(views.region_count(Region::East, DisasterCategory::Flood), 0);
    }

    #[test]
    fn serializes_with_string_keys() {
        let views = AggregateViews::default();
        let json = serde_json::to_value(&views).unwrap();
        assert_eq!(json["yearlyFatality"]["2000"]["forestfire"], 0);
    }

    #[test]
    fn totals_saturate() {
        let mut views = AggregateViews::default();
        views.yearly_frequency.insert(2001, u64::MAX);
        views.yearly_frequency.insert(2002, 1);
        for year in [2001, 2002] {
            views
                .yearly_fatality
                .get_mut(&year)
                .unwrap()
                .insert(DisasterCategory::Drought, u64::MAX);
        }
        assert_eq!(views.total_events(), u64::MAX);
        assert_eq!(views.total_deaths(), u64::MAX);
    }
}
