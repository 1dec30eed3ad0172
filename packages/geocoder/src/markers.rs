//! Turns disaster records into map markers.

use std::sync::Arc;

use disaster_map_disaster_models::{DisasterRecord, GeoPoint, MapPoint};
use disaster_map_source::cancel::CancelToken;
use disaster_map_source::progress::ProgressCallback;

use crate::location::place_queries;
use crate::pool::GeocodePool;

/// Markers for a batch of records.
#[derive(Debug, Default)]
pub struct MapReport {
    /// Resolved markers, in record order.
    pub points: Vec<MapPoint>,
    /// `(record id, place)` pairs that did not resolve.
    pub unresolved: Vec<(String, String)>,
    /// `true` if geocoding was cut short by cancellation.
    pub cancelled: bool,
}

/// Resolves every record to zero or more markers.
///
/// Records carrying API coordinates become a single marker without a
/// lookup. Every other record is split into place fragments that are
/// geocoded through `pool`; fragments that miss are left off the map.
pub async fn map_points(
    records: &[DisasterRecord],
    pool: &GeocodePool,
    cancel: &CancelToken,
    progress: &Arc<dyn ProgressCallback>,
) -> MapReport {
    let queries: Vec<String> = records
        .iter()
        .filter(|r| r.coordinates.is_none())
        .flat_map(|r| place_queries(&r.location, &r.country))
        .map(|(_, query)| query)
        .collect();

    let resolved = pool.resolve_all(&queries, cancel, progress).await;

    let mut report = MapReport {
        cancelled: resolved.cancelled() > 0,
        ..MapReport::default()
    };

    for record in records {
        if let Some(point) = record.coordinates {
            report.points.push(marker(record, &record.location, point));
            continue;
        }

        for (place, query) in place_queries(&record.location, &record.country) {
            if let Some(point) = resolved.point(&query) {
                report.points.push(marker(record, &place, point));
            } else {
                log::warn!(
                    "No coordinates for '{place}' ({} {})",
                    record.category,
                    record.id
                );
                report.unresolved.push((record.id.clone(), place));
            }
        }
    }

    log::info!(
        "Placed {} markers for {} records ({} places unresolved)",
        report.points.len(),
        records.len(),
        report.unresolved.len()
    );
    report
}

fn marker(record: &DisasterRecord, place: &str, point: GeoPoint) -> MapPoint {
    MapPoint {
        record_id: record.id.clone(),
        category: record.category,
        name: record.name.clone(),
        raw_date: record.raw_date.clone(),
        place: place.to_string(),
        deaths: record.deaths,
        point,
    }
}
