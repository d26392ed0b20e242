//! # Conflict Resolution
//!
//! The contract offered to resolvers: list what is unresolved, record a
//! decision, and keep event status and review flags consistent with it.
//!
//! A decision affects the conflict's primary event only:
//! - `confirmed` marks it `valid`
//! - `rejected` marks it `needs_review`
//! - `needs_review` and `auto_fixed` leave it untouched

use crate::store::Store;
use crate::types::entity::{Conflict, LifeEvent};
use crate::types::{ConflictId, Resolution, StammError, ValidationStatus};
use crate::validator::recompute_review_flag;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

/// Per-outcome counts for a batch of decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionTally {
    pub confirmed: usize,
    pub rejected: usize,
    pub needs_review: usize,
    pub auto_fixed: usize,
}

impl ResolutionTally {
    pub fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Confirmed => self.confirmed += 1,
            Resolution::Rejected => self.rejected += 1,
            Resolution::NeedsReview => self.needs_review += 1,
            Resolution::AutoFixed => self.auto_fixed += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.confirmed + self.rejected + self.needs_review + self.auto_fixed
    }
}

/// Conflicts without a resolution, errors first, then by id.
pub fn unresolved_conflicts<S: Store>(store: &S) -> Result<Vec<Conflict>, StammError> {
    let mut conflicts = store.filter(|conflict: &Conflict| !conflict.is_resolved())?;
    conflicts.sort_by_key(|conflict| (conflict.severity, conflict.id));
    Ok(conflicts)
}

/// Record a decision on one conflict.
///
/// Stamps the resolution time (UTC) and actor, applies the event status
/// change, and recomputes the individual's review flag.
pub fn resolve_conflict<S: Store>(
    store: &mut S,
    id: ConflictId,
    resolution: Resolution,
    notes: Option<String>,
    resolved_by: &str,
) -> Result<Conflict, StammError> {
    let mut conflict = store.fetch::<Conflict>(id)?;
    conflict.resolution = Some(resolution);
    conflict.resolved_at = Some(Utc::now());
    conflict.resolved_by = Some(resolved_by.to_string());
    if notes.is_some() {
        conflict.notes = notes;
    }
    store.update(&conflict)?;

    let status = match resolution {
        Resolution::Confirmed => Some(ValidationStatus::Valid),
        Resolution::Rejected => Some(ValidationStatus::NeedsReview),
        Resolution::NeedsReview | Resolution::AutoFixed => None,
    };
    if let Some(status) = status {
        if let Some(mut event) = store.get::<LifeEvent>(conflict.event)? {
            event.validation = status;
            store.update(&event)?;
        }
    }

    let flagged = recompute_review_flag(store, conflict.individual)?;
    debug!(
        conflict = %id,
        resolution = %resolution,
        individual = %conflict.individual,
        still_flagged = flagged,
        "conflict resolved"
    );
    Ok(conflict)
}

/// Mark every unresolved conflict `needs_review` without prompting.
pub fn defer_unresolved<S: Store>(
    store: &mut S,
    resolved_by: &str,
) -> Result<ResolutionTally, StammError> {
    let mut tally = ResolutionTally::default();
    for conflict in unresolved_conflicts(store)? {
        resolve_conflict(store, conflict.id, Resolution::NeedsReview, None, resolved_by)?;
        tally.record(Resolution::NeedsReview);
    }
    info!(deferred = tally.needs_review, "deferred unresolved conflicts");
    Ok(tally)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::entity::Individual;
    use crate::types::{
        ConflictKind, DatePrecision, EventId, EventTypeId, IndividualId, Severity,
    };

    fn event(store: &mut MemoryStore, individual: IndividualId) -> EventId {
        store
            .create(LifeEvent {
                id: EventId(0),
                individual,
                union: None,
                event_type: EventTypeId(1),
                date_raw: None,
                date_sort: None,
                date_end: None,
                precision: DatePrecision::Unknown,
                place: None,
                description: None,
                validation: ValidationStatus::Conflict,
            })
            .unwrap()
    }

    fn flagged_person(store: &mut MemoryStore) -> IndividualId {
        let mut person = Individual::new("@I1@");
        person.needs_review = true;
        store.create(person).unwrap()
    }

    fn conflict(
        store: &mut MemoryStore,
        individual: IndividualId,
        event: EventId,
        severity: Severity,
    ) -> ConflictId {
        store
            .create(Conflict::new(
                individual,
                ConflictKind::FutureDate,
                severity,
                event,
                None,
                "test",
            ))
            .unwrap()
    }

    #[test]
    fn unresolved_are_ordered_by_severity_then_id() {
        let mut store = MemoryStore::new();
        let person = flagged_person(&mut store);
        let e = event(&mut store, person);
        let info = conflict(&mut store, person, e, Severity::Info);
        let error = conflict(&mut store, person, e, Severity::Error);
        let warning = conflict(&mut store, person, e, Severity::Warning);
        let later_error = conflict(&mut store, person, e, Severity::Error);

        let ids: Vec<ConflictId> = unresolved_conflicts(&store)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![error, later_error, warning, info]);
    }

    #[test]
    fn confirmed_marks_event_valid_and_clears_flag() {
        let mut store = MemoryStore::new();
        let person = flagged_person(&mut store);
        let e = event(&mut store, person);
        let id = conflict(&mut store, person, e, Severity::Error);

        let resolved = resolve_conflict(
            &mut store,
            id,
            Resolution::Confirmed,
            Some("checked the register".to_string()),
            "tester",
        )
        .unwrap();
        assert_eq!(resolved.resolution, Some(Resolution::Confirmed));
        assert_eq!(resolved.resolved_by.as_deref(), Some("tester"));
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.notes.as_deref(), Some("checked the register"));

        let stored: LifeEvent = store.fetch(e).unwrap();
        assert_eq!(stored.validation, ValidationStatus::Valid);
        assert!(!store.fetch::<Individual>(person).unwrap().needs_review);
    }

    #[test]
    fn flag_stays_while_other_conflicts_remain() {
        let mut store = MemoryStore::new();
        let person = flagged_person(&mut store);
        let e = event(&mut store, person);
        let first = conflict(&mut store, person, e, Severity::Error);
        conflict(&mut store, person, e, Severity::Warning);

        resolve_conflict(&mut store, first, Resolution::Rejected, None, "tester").unwrap();
        let stored: LifeEvent = store.fetch(e).unwrap();
        assert_eq!(stored.validation, ValidationStatus::NeedsReview);
        assert!(store.fetch::<Individual>(person).unwrap().needs_review);
    }

    #[test]
    fn unknown_conflict_is_not_found() {
        let mut store = MemoryStore::new();
        let result = resolve_conflict(
            &mut store,
            ConflictId(7),
            Resolution::Confirmed,
            None,
            "tester",
        );
        assert!(matches!(result, Err(StammError::NotFound { id: 7, .. })));
    }

    #[test]
    fn defer_marks_everything_needs_review() {
        let mut store = MemoryStore::new();
        let person = flagged_person(&mut store);
        let e = event(&mut store, person);
        conflict(&mut store, person, e, Severity::Error);
        conflict(&mut store, person, e, Severity::Info);

        let tally = defer_unresolved(&mut store, "cli").unwrap();
        assert_eq!(tally.needs_review, 2);
        assert_eq!(tally.total(), 2);
        assert!(unresolved_conflicts(&store).unwrap().is_empty());
        // deferred conflicts count as resolved; the event keeps its status
        let stored: LifeEvent = store.fetch(e).unwrap();
        assert_eq!(stored.validation, ValidationStatus::Conflict);
        assert!(!store.fetch::<Individual>(person).unwrap().needs_review);
    }
}
