//! Folding normalized records into [`AggregateViews`].

use disaster_map_analytics_models::AggregateViews;
use disaster_map_disaster_models::{DisasterCategory, DisasterRecord, in_window};

use crate::region::classify;

/// Builds every aggregate view from the full record set in one pass.
///
/// Records whose year is outside the window are ignored. The result only
/// depends on the multiset of records, never on their order.
#[must_use]
pub fn aggregate(records: &[DisasterRecord]) -> AggregateViews {
    aggregate_for(records, DisasterCategory::all())
}

/// Like [`aggregate`], restricted to `categories`.
///
/// Records of other categories are ignored and the fatality view is
/// zero-filled for the selected categories only.
#[must_use]
pub fn aggregate_for(
    records: &[DisasterRecord],
    categories: &[DisasterCategory],
) -> AggregateViews {
    let mut views = AggregateViews::empty(categories);
    let mut skipped = 0usize;

    for record in records {
        if !in_window(record.year) || !categories.contains(&record.category) {
            skipped += 1;
            continue;
        }

        // ── Deaths per year per category ─────────────────────────────
        let deaths = views
            .yearly_fatality
            .entry(record.year)
            .or_default()
            .entry(record.category)
            .or_insert(0);
        *deaths = deaths.saturating_add(record.deaths);

        // ── Events per region per category ───────────────────────────
        let events = views
            .region_frequency
            .entry(classify(&record.location))
            .or_default()
            .entry(record.category)
            .or_insert(0);
        *events = events.saturating_add(1);

        // ── Events per year ──────────────────────────────────────────
        let events = views.yearly_frequency.entry(record.year).or_insert(0);
        *events = events.saturating_add(1);

        // ── Deaths per category ──────────────────────────────────────
        let deaths = views.category_totals.entry(record.category).or_insert(0);
        *deaths = deaths.saturating_add(record.deaths);
    }

    log::debug!(
        "Aggregated {} records ({skipped} skipped), {} deaths",
        records.len() - skipped,
        views.total_deaths()
    );

    views
}

#[cfg(test)]
mod tests {
    use disaster_map_disaster_models::{Region, UNKNOWN_LOCATION};

    use super::*;
    use crate::region::known_locations;

    fn record(category: DisasterCategory, year: u16, location: &str, deaths: u64) -> DisasterRecord {
        DisasterRecord {
            id: format!("{category}-{year}-{location}"),
            category,
            name: String::new(),
            year,
            location: location.to_string(),
            deaths,
            country: "India".to_string(),
            raw_date: format!("1-1-{year}"),
            magnitude: None,
            coordinates: None,
        }
    }

    /// A deterministic spread of records across categories, years and
    /// locations, including out-of-window years.
    fn sample() -> Vec<DisasterRecord> {
        let locations = ["Odisha", "Tamil Nadu", "Kerala", UNKNOWN_LOCATION, "Gujarat"];
        let mut records = Vec::new();
        for i in 0..60u16 {
            let category = DisasterCategory::all()[usize::from(i) % 5];
            let year = 1995 + (i * 7) % 35;
            let location = locations[usize::from(i) % locations.len()];
            records.push(record(category, year, location, u64::from(i) * 3));
        }
        records
    }

    #[test]
    fn fatality_is_zero_filled_for_every_year_and_category() {
        for records in [Vec::new(), sample()] {
            let views = aggregate(&records);
            let years: Vec<u16> = views.yearly_fatality.keys().copied().collect();
            assert_eq!(years, (2000..=2024).collect::<Vec<_>>());
            for row in views.yearly_fatality.values() {
                assert_eq!(row.len(), 5);
            }
        }
    }

    #[test]
    fn fatality_sum_matches_in_window_deaths() {
        let records = sample();
        let expected: u64 = records
            .iter()
            .filter(|r| (2000..=2024).contains(&r.year))
            .map(|r| r.deaths)
            .sum();
        let views = aggregate(&records);
        assert_eq!(views.total_deaths(), expected);
        assert_eq!(views.category_totals.values().sum::<u64>(), expected);
    }

    #[test]
    fn regions_are_reachable_from_classifier() {
        let views = aggregate(&sample());
        for region in views.region_frequency.keys() {
            assert!(
                *region == Region::Unknown
                    || known_locations().iter().any(|(_, r)| r == region),
                "unexpected region {region}"
            );
        }
    }

    #[test]
    fn region_counts_events_not_deaths() {
        let records = vec![
            record(DisasterCategory::Cyclone, 2020, "Odisha", 90),
            record(DisasterCategory::Cyclone, 2020, "West Bengal", 10),
            record(DisasterCategory::Flood, 2021, "Kerala", 5),
        ];
        let views = aggregate(&records);
        assert_eq!(views.region_count(Region::East, DisasterCategory::Cyclone), 2);
        assert_eq!(views.region_count(Region::Unknown, DisasterCategory::Flood), 1);
        assert!(!views.region_frequency.contains_key(&Region::South));
        assert_eq!(views.deaths(2020, DisasterCategory::Cyclone), 100);
    }

    #[test]
    fn frequency_is_lazy() {
        let records = vec![
            record(DisasterCategory::Drought, 2002, UNKNOWN_LOCATION, 0),
            record(DisasterCategory::Flood, 2002, UNKNOWN_LOCATION, 0),
            record(DisasterCategory::Flood, 2010, UNKNOWN_LOCATION, 0),
        ];
        let views = aggregate(&records);
        assert_eq!(views.yearly_frequency.len(), 2);
        assert_eq!(views.yearly_frequency[&2002], 2);
        assert_eq!(views.yearly_frequency[&2010], 1);
        assert_eq!(views.total_events(), 3);
    }

    #[test]
    fn empty_input_is_well_formed() {
        let views = aggregate(&[]);
        assert_eq!(views.total_deaths(), 0);
        assert!(views.region_frequency.is_empty());
        assert!(views.yearly_frequency.is_empty());
        assert!(views.category_totals.is_empty());
    }

    #[test]
    fn idempotent_and_order_independent() {
        let records = sample();
        let first = aggregate(&records);
        let second = aggregate(&records);
        assert_eq!(first, second);

        let mut reversed = records;
        reversed.reverse();
        assert_eq!(aggregate(&reversed), first);
    }

    #[test]
    fn selection_filters_records_before_folding() {
        let records = vec![
            record(DisasterCategory::Cyclone, 2020, "Odisha", 90),
            record(DisasterCategory::Flood, 2020, "Bihar", 10),
        ];
        let views = aggregate_for(&records, &[DisasterCategory::Flood]);
        assert!(views.yearly_fatality.values().all(|row| row.len() == 1));
        assert_eq!(views.total_deaths(), 10);
        assert_eq!(views.yearly_frequency[&2020], 1);
        assert_eq!(views.region_count(Region::East, DisasterCategory::Cyclone), 0);
    }

    #[test]
    fn huge_death_tolls_saturate() {
        let records = [
            record(DisasterCategory::Cyclone, 2020, "Odisha", u64::MAX),
            record(DisasterCategory::Cyclone, 2020, "Odisha", 5),
            record(DisasterCategory::Flood, 2021, "Bihar", u64::MAX),
        ];
        let views = aggregate(&records);

        assert_eq!(views.deaths(2020, DisasterCategory::Cyclone), u64::MAX);
        assert_eq!(views.category_totals[&DisasterCategory::Cyclone], u64::MAX);
        assert_eq!(views.total_deaths(), u64::MAX);
        assert_eq!(views.total_events(), 3);
    }
}
