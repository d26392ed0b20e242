//! # Geocoding Pass
//!
//! Resolves coordinates for places still in `pending` status through a
//! caller-supplied [`Geocoder`]. The lookup itself, and any rate limiting,
//! belong to the caller.
//!
//! Each place is written back as soon as it is processed. An interrupted
//! pass leaves the remaining places `pending` for the next one, and places
//! already resolved are never looked up again.

use crate::store::Store;
use crate::types::entity::{Coordinates, Place};
use crate::types::{GeocodeStatus, StammError};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Maps search text to coordinates. `None` means no match.
pub trait Geocoder {
    fn geocode(&mut self, query: &str) -> Option<Coordinates>;
}

impl<F> Geocoder for F
where
    F: FnMut(&str) -> Option<Coordinates>,
{
    fn geocode(&mut self, query: &str) -> Option<Coordinates> {
        self(query)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeocodeReport {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Geocode pending places in id order, at most `limit` of them.
pub fn geocode_pending<S: Store, G: Geocoder>(
    store: &mut S,
    geocoder: &mut G,
    limit: Option<usize>,
) -> Result<GeocodeReport, StammError> {
    let mut pending =
        store.filter(|place: &Place| place.geocode_status == GeocodeStatus::Pending)?;
    if let Some(limit) = limit {
        pending.truncate(limit);
    }

    let mut report = GeocodeReport {
        total: pending.len(),
        ..GeocodeReport::default()
    };
    info!(pending = report.total, "geocoding places");

    for mut place in pending {
        let query = place.search_text().trim().to_string();
        if query.is_empty() || query.eq_ignore_ascii_case("unknown") {
            place.geocode_status = GeocodeStatus::Skipped;
            report.skipped += 1;
        } else if let Some(coordinates) = geocoder.geocode(&query) {
            debug!(place = %place.id, %query, "geocoded");
            place.coordinates = Some(coordinates);
            place.geocode_status = GeocodeStatus::Success;
            report.success += 1;
        } else {
            warn!(place = %place.id, %query, "no geocoding match");
            place.geocode_status = GeocodeStatus::Failed;
            report.failed += 1;
        }
        store.update(&place)?;
    }

    info!(
        success = report.success,
        failed = report.failed,
        skipped = report.skipped,
        "geocoding complete"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::normalize::normalize_place;
    use crate::store::MemoryStore;

    fn add_place(store: &mut MemoryStore, raw: &str) -> crate::types::PlaceId {
        store
            .create(Place::from(normalize_place(raw).unwrap()))
            .unwrap()
    }

    #[test]
    fn statuses_follow_lookup_result() {
        let mut store = MemoryStore::new();
        let vienna = add_place(&mut store, "Vienna, Austria");
        let nowhere = add_place(&mut store, "Atlantis");
        let unknown = add_place(&mut store, "Unknown");

        let mut lookups = Vec::new();
        let mut geocoder = |query: &str| {
            lookups.push(query.to_string());
            (query == "Vienna, Austria").then_some(Coordinates {
                latitude: 48.21,
                longitude: 16.37,
            })
        };
        let report = geocode_pending(&mut store, &mut geocoder, None).unwrap();
        assert_eq!(
            report,
            GeocodeReport {
                success: 1,
                failed: 1,
                skipped: 1,
                total: 3
            }
        );
        assert_eq!(lookups, vec!["Vienna, Austria", "Atlantis"]);

        let vienna: Place = store.fetch(vienna).unwrap();
        assert_eq!(vienna.geocode_status, GeocodeStatus::Success);
        assert!(vienna.coordinates.is_some());
        let nowhere: Place = store.fetch(nowhere).unwrap();
        assert_eq!(nowhere.geocode_status, GeocodeStatus::Failed);
        let unknown: Place = store.fetch(unknown).unwrap();
        assert_eq!(unknown.geocode_status, GeocodeStatus::Skipped);
    }

    #[test]
    fn limit_leaves_rest_pending_for_next_pass() {
        let mut store = MemoryStore::new();
        for raw in ["A", "B", "C"] {
            add_place(&mut store, raw);
        }
        let mut calls = 0;
        let mut geocoder = |_: &str| -> Option<Coordinates> {
            calls += 1;
            None
        };

        let first = geocode_pending(&mut store, &mut geocoder, Some(2)).unwrap();
        assert_eq!(first.total, 2);
        let second = geocode_pending(&mut store, &mut geocoder, Some(2)).unwrap();
        assert_eq!(second.total, 1);
        let third = geocode_pending(&mut store, &mut geocoder, None).unwrap();
        assert_eq!(third.total, 0);
        assert_eq!(calls, 3);
    }
}
