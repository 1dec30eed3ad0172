//! Plain-text tables for terminal output.

use disaster_map_analytics_models::AggregateViews;
use disaster_map_disaster_models::{DisasterCategory, DisasterRecord, MapPoint, Region};

const COL: usize = 12;

fn header(first: &str, categories: &[DisasterCategory]) -> Vec<String> {
    let mut line = format!("{first:<10}");
    for category in categories {
        line.push_str(&format!("{:>COL$}", category.label()));
    }
    vec![line.clone(), "-".repeat(line.len())]
}

/// Renders every aggregate view, restricted to `categories`.
#[must_use]
pub fn views_table(views: &AggregateViews, categories: &[DisasterCategory]) -> String {
    let mut lines = vec!["Deaths per year".to_string()];
    lines.extend(header("Year", categories));
    for (year, by_category) in &views.yearly_fatality {
        let mut line = format!("{year:<10}");
        for category in categories {
            let deaths = by_category.get(category).copied().unwrap_or(0);
            line.push_str(&format!("{deaths:>COL$}"));
        }
        lines.push(line);
    }

    lines.push(String::new());
    lines.push("Events per region".to_string());
    lines.extend(header("Region", categories));
    for region in Region::all() {
        if !views.region_frequency.contains_key(region) {
            continue;
        }
        let mut line = format!("{:<10}", region.as_ref());
        for category in categories {
            line.push_str(&format!("{:>COL$}", views.region_count(*region, *category)));
        }
        lines.push(line);
    }

    lines.push(String::new());
    lines.push("Events per year".to_string());
    for (year, count) in &views.yearly_frequency {
        lines.push(format!("{year:<10}{count:>COL$}"));
    }

    lines.push(String::new());
    lines.push("Deaths per category".to_string());
    for (category, deaths) in &views.category_totals {
        lines.push(format!("{:<14}{deaths:>COL$}", category.label()));
    }

    lines.push(String::new());
    lines.push(format!(
        "{} events, {} deaths",
        views.total_events(),
        views.total_deaths()
    ));
    lines.join("\n")
}

/// One line per record.
#[must_use]
pub fn records_table(records: &[DisasterRecord]) -> String {
    let mut lines = vec![
        format!("{:<6} {:<28} {:>8}  LOCATION", "YEAR", "NAME", "DEATHS"),
        "-".repeat(70),
    ];
    lines.extend(records.iter().map(|r| {
        format!(
            "{:<6} {:<28} {:>8}  {}",
            r.year,
            truncate(&r.name, 28),
            r.deaths,
            r.location
        )
    }));
    lines.join("\n")
}

/// One line per map marker.
#[must_use]
pub fn points_table(points: &[MapPoint]) -> String {
    let mut lines = vec![
        format!(
            "{:<11} {:<24} {:>9} {:>9}  PLACE",
            "CATEGORY", "NAME", "LAT", "LNG"
        ),
        "-".repeat(70),
    ];
    lines.extend(points.iter().map(|p| {
        format!(
            "{:<11} {:<24} {:>9.4} {:>9.4}  {}",
            p.category.as_ref(),
            truncate(&p.name, 24),
            p.point.lat,
            p.point.lng,
            p.place
        )
    }));
    lines.join("\n")
}

/// Wire name and label of every category.
#[must_use]
pub fn categories_table() -> String {
    DisasterCategory::all()
        .iter()
        .map(|c| format!("{:<12} {}", c.as_ref(), c.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}
