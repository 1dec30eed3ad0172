//! Raw row normalization.
//!
//! Converts loosely typed API rows into [`DisasterRecord`]s:
//!
//! - the date string becomes a year (see [`parse_year`]),
//! - the death toll becomes a non-negative integer, defaulting to 0,
//! - a missing location becomes [`UNKNOWN_LOCATION`],
//! - each record is tagged with the category it was fetched under.
//!
//! Rows whose year falls outside [`FIRST_YEAR`]..=[`LAST_YEAR`] are
//! dropped by [`normalize_rows`].
//!
//! [`FIRST_YEAR`]: disaster_map_disaster_models::FIRST_YEAR
//! [`LAST_YEAR`]: disaster_map_disaster_models::LAST_YEAR

use chrono::{Datelike as _, NaiveDate};
use disaster_map_disaster_models::{
    DisasterCategory, DisasterRecord, GeoPoint, RawDisasterRow, UNKNOWN_LOCATION, in_window,
};
use serde_json::Value;

/// Canonical date layouts, tried in order before the legacy token scan.
const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%Y-%m-%d"];

/// Extracts a [`RawDisasterRow`] from a JSON object.
///
/// Text fields accept strings or numbers; anything else is treated as
/// missing. Non-object values produce an empty row.
#[must_use]
pub fn raw_row(value: &Value) -> RawDisasterRow {
    RawDisasterRow {
        id: text_field(value, "id").or_else(|| text_field(value, "_id")),
        name: text_field(value, "name"),
        date: text_field(value, "date"),
        location: text_field(value, "location"),
        country: text_field(value, "country"),
        deaths: present(value, "deaths"),
        magnitude: present(value, "magnitude"),
        latitude: present(value, "latitude"),
        longitude: present(value, "longitude"),
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn present(value: &Value, key: &str) -> Option<Value> {
    value.get(key).filter(|v| !v.is_null()).cloned()
}

/// Derives a year from a date string of ambiguous layout.
///
/// Day-month-year (`20-5-2020`) and ISO (`2020-05-20`, optionally followed
/// by a `T…` time) are parsed strictly first. Anything else goes through
/// the legacy token scan: split on `-`, use the last token's leading digits if
/// they form a four-digit year, otherwise the first token's leading digits
/// if they form a year in `1..=9999`.
#[must_use]
pub fn parse_year(date: &str) -> Option<u16> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    let date_part = date.split(['T', ' ']).next().unwrap_or(date);
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(date_part, format) {
            return u16::try_from(parsed.year())
                .ok()
                .filter(|y| (1..=9999).contains(y));
        }
    }

    legacy_token_year(date)
}

fn legacy_token_year(date: &str) -> Option<u16> {
    let mut tokens = date.split('-');
    let first = tokens.next().and_then(leading_number);
    let last = tokens.next_back().and_then(leading_number);

    if let Some(year) = last.filter(|y| (1000..=9999).contains(y)) {
        return Some(year);
    }
    first.filter(|y| (1..=9999).contains(y))
}

fn leading_number(token: &str) -> Option<u16> {
    let token = token.trim();
    let end = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    token[..end].parse().ok()
}

/// Coerces a death toll to a non-negative integer.
///
/// Numbers and numeric strings are accepted; fractions truncate toward
/// zero. Missing, negative or non-numeric values become 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_deaths(value: Option<&Value>) -> u64 {
    match number(value) {
        Some(n) if n.is_finite() && n > 0.0 => n.trunc() as u64,
        _ => 0,
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Returns API-supplied coordinates, rejecting zero or out-of-range pairs.
fn coordinates(row: &RawDisasterRow) -> Option<GeoPoint> {
    let lat = number(row.latitude.as_ref())?;
    let lng = number(row.longitude.as_ref())?;
    if lat == 0.0 || lng == 0.0 || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng)
    {
        return None;
    }
    Some(GeoPoint { lat, lng })
}

/// Normalizes a single row.
///
/// Returns `None` when no year can be derived from the row's date. The
/// year window is not applied here; see [`normalize_rows`].
#[must_use]
pub fn normalize_row(
    category: DisasterCategory,
    index: usize,
    row: &RawDisasterRow,
) -> Option<DisasterRecord> {
    let raw_date = row.date.clone().unwrap_or_default();
    let Some(year) = parse_year(&raw_date) else {
        log::debug!("Dropping {category} row {index}: no year in date {raw_date:?}");
        return None;
    };

    Some(DisasterRecord {
        id: row
            .id
            .clone()
            .unwrap_or_else(|| format!("{category}-{index}")),
        category,
        name: row.name.clone().unwrap_or_default(),
        year,
        location: row
            .location
            .clone()
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        deaths: parse_deaths(row.deaths.as_ref()),
        country: row.country.clone().unwrap_or_default(),
        raw_date,
        magnitude: number(row.magnitude.as_ref()),
        coordinates: coordinates(row),
    })
}

/// Normalizes every row of one category, keeping only records whose year
/// is inside the aggregated window.
#[must_use]
pub fn normalize_rows(category: DisasterCategory, rows: &[Value]) -> Vec<DisasterRecord> {
    let records: Vec<DisasterRecord> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, value)| normalize_row(category, index, &raw_row(value)))
        .filter(|record| in_window(record.year))
        .collect();

    log::debug!(
        "{category}: {} of {} rows inside the year window",
        records.len(),
        rows.len()
    );
    records
}
