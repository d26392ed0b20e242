//! # Conflict Validator
//!
//! Evaluates a fixed rule set over each individual's events and records a
//! [`Conflict`] per violation.
//!
//! ## Rules
//!
//! | Kind | Severity | Trigger |
//! |------|----------|---------|
//! | `multiple_deaths` | error | more than one death event |
//! | `death_before_birth` | error | earliest death < earliest birth |
//! | `event_after_death` | warning | non-postmortem event dated after death |
//! | `future_date` | warning | event dated after today |
//! | `marriage_without_divorce` | warning | consecutive marriages, no divorce between |
//! | `duplicate_event` | info | same type, date and place as an earlier event |
//!
//! Rules only fire on the data they need: a missing date never raises an
//! error, it simply leaves date rules silent.

use crate::primitives::{
    BIRTH_CODE, DEATH_CODE, DIVORCE_CODE, FALLBACK_EVENT_CODE, MARRIAGE_CODE, POSTMORTEM_CODES,
};
use crate::store::Store;
use crate::types::entity::{Conflict, EventType, Individual, LifeEvent};
use crate::types::{
    ConflictKind, EventId, EventTypeId, IndividualId, PlaceId, Severity, StammError,
    ValidationStatus,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Outcome of one validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub individuals_checked: usize,
    pub conflicts_created: usize,
    /// Events newly moved to `conflict` status.
    pub events_flagged: usize,
    /// Individuals whose review flag is set after the run.
    pub individuals_flagged: usize,
}

/// Rule engine. Holds the reference date used by the future-date rule.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    today: NaiveDate,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Validator using the current UTC calendar date.
    #[must_use]
    pub fn new() -> Self {
        Self::with_today(Utc::now().date_naive())
    }

    #[must_use]
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Check every individual in the store.
    ///
    /// Conflicts already recorded for the same (individual, kind, event,
    /// related event) are not created again, so reruns are stable.
    pub fn validate_all<S: Store>(&self, store: &mut S) -> Result<ValidationReport, StammError> {
        let codes = event_type_codes(store)?;
        let individuals = store.all::<Individual>()?;

        let mut events_by_individual: BTreeMap<IndividualId, Vec<LifeEvent>> = BTreeMap::new();
        for event in store.all::<LifeEvent>()? {
            events_by_individual
                .entry(event.individual)
                .or_default()
                .push(event);
        }

        let mut known: BTreeSet<ConflictKey> = store
            .all::<Conflict>()?
            .iter()
            .map(ConflictKey::of)
            .collect();

        let mut report = ValidationReport::default();
        let mut touched_events = BTreeSet::new();
        for individual in &individuals {
            let events = events_by_individual
                .get(&individual.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for conflict in self.check_individual(individual, events, &codes) {
                if !known.insert(ConflictKey::of(&conflict)) {
                    continue;
                }
                debug!(
                    individual = %individual.id,
                    kind = %conflict.kind,
                    severity = %conflict.severity,
                    "conflict detected"
                );
                touched_events.extend(conflict.events());
                store.create(conflict)?;
                report.conflicts_created += 1;
            }
            report.individuals_checked += 1;
        }

        for event_id in touched_events {
            let Some(mut event) = store.get::<LifeEvent>(event_id)? else {
                continue;
            };
            if event.validation != ValidationStatus::Conflict {
                event.validation = ValidationStatus::Conflict;
                store.update(&event)?;
                report.events_flagged += 1;
            }
        }

        report.individuals_flagged = recompute_review_flags(store)?;

        info!(
            individuals = report.individuals_checked,
            conflicts = report.conflicts_created,
            events_flagged = report.events_flagged,
            flagged = report.individuals_flagged,
            "validation complete"
        );
        Ok(report)
    }

    /// Evaluate every rule for one individual. Pure: nothing is written.
    ///
    /// `events` should be in creation (id) order; rules that pick "the first"
    /// event of a type rely on it.
    pub fn check_individual(
        &self,
        individual: &Individual,
        events: &[LifeEvent],
        codes: &BTreeMap<EventTypeId, String>,
    ) -> Vec<Conflict> {
        let checker = Checker {
            individual,
            name: individual.display_name(),
            events,
            codes,
            today: self.today,
        };
        let mut conflicts = Vec::new();
        checker.multiple_deaths(&mut conflicts);
        checker.death_before_birth(&mut conflicts);
        checker.event_after_death(&mut conflicts);
        checker.future_dates(&mut conflicts);
        checker.marriages_without_divorce(&mut conflicts);
        checker.duplicates(&mut conflicts);
        conflicts
    }
}

/// Event type codes keyed by id.
pub fn event_type_codes<S: Store>(
    store: &S,
) -> Result<BTreeMap<EventTypeId, String>, StammError> {
    Ok(store
        .all::<EventType>()?
        .into_iter()
        .map(|event_type| (event_type.id, event_type.code))
        .collect())
}

// =============================================================================
// REVIEW FLAGS
// =============================================================================

/// Set each individual's review flag to "has an unresolved conflict".
///
/// Returns the number of flagged individuals.
pub fn recompute_review_flags<S: Store>(store: &mut S) -> Result<usize, StammError> {
    let pending: BTreeSet<IndividualId> = store
        .filter(|conflict: &Conflict| !conflict.is_resolved())?
        .into_iter()
        .map(|conflict| conflict.individual)
        .collect();

    for mut individual in store.all::<Individual>()? {
        let flagged = pending.contains(&individual.id);
        if individual.needs_review != flagged {
            individual.needs_review = flagged;
            store.update(&individual)?;
        }
    }
    Ok(pending.len())
}

/// Recompute the review flag of one individual. Returns the new flag.
pub fn recompute_review_flag<S: Store>(
    store: &mut S,
    individual: IndividualId,
) -> Result<bool, StammError> {
    let flagged = !store
        .filter(|conflict: &Conflict| conflict.individual == individual && !conflict.is_resolved())?
        .is_empty();
    let mut person = store.fetch::<Individual>(individual)?;
    if person.needs_review != flagged {
        person.needs_review = flagged;
        store.update(&person)?;
    }
    Ok(flagged)
}

// =============================================================================
// RULES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ConflictKey {
    individual: IndividualId,
    kind: ConflictKind,
    event: EventId,
    related: Option<EventId>,
}

impl ConflictKey {
    fn of(conflict: &Conflict) -> Self {
        Self {
            individual: conflict.individual,
            kind: conflict.kind,
            event: conflict.event,
            related: conflict.related_event,
        }
    }
}

struct Checker<'a> {
    individual: &'a Individual,
    name: String,
    events: &'a [LifeEvent],
    codes: &'a BTreeMap<EventTypeId, String>,
    today: NaiveDate,
}

impl Checker<'_> {
    fn code(&self, event: &LifeEvent) -> &str {
        self.codes
            .get(&event.event_type)
            .map_or(FALLBACK_EVENT_CODE, String::as_str)
    }

    fn of_type(&self, code: &str) -> Vec<&LifeEvent> {
        self.events
            .iter()
            .filter(|event| self.code(event) == code)
            .collect()
    }

    fn earliest(events: &[&LifeEvent]) -> Option<NaiveDate> {
        events.iter().filter_map(|event| event.date_sort).min()
    }

    fn conflict(
        &self,
        kind: ConflictKind,
        severity: Severity,
        event: EventId,
        related: Option<EventId>,
        description: String,
    ) -> Conflict {
        Conflict::new(self.individual.id, kind, severity, event, related, description)
    }

    fn multiple_deaths(&self, out: &mut Vec<Conflict>) {
        let deaths = self.of_type(DEATH_CODE);
        if let [first, second, ..] = deaths.as_slice() {
            out.push(self.conflict(
                ConflictKind::MultipleDeaths,
                Severity::Error,
                first.id,
                Some(second.id),
                format!("{} has {} death records", self.name, deaths.len()),
            ));
        }
    }

    fn death_before_birth(&self, out: &mut Vec<Conflict>) {
        let births = self.of_type(BIRTH_CODE);
        let deaths = self.of_type(DEATH_CODE);
        let (Some(birth), Some(death)) = (Self::earliest(&births), Self::earliest(&deaths)) else {
            return;
        };
        if death >= birth {
            return;
        }
        if let (Some(first_death), Some(first_birth)) = (deaths.first(), births.first()) {
            out.push(self.conflict(
                ConflictKind::DeathBeforeBirth,
                Severity::Error,
                first_death.id,
                Some(first_birth.id),
                format!("{}: death ({}) is before birth ({})", self.name, death, birth),
            ));
        }
    }

    fn event_after_death(&self, out: &mut Vec<Conflict>) {
        let deaths = self.of_type(DEATH_CODE);
        let Some(death) = Self::earliest(&deaths) else {
            return;
        };
        let first_death = deaths.first().map(|event| event.id);
        for event in self.events {
            let code = self.code(event);
            if POSTMORTEM_CODES.contains(&code) {
                continue;
            }
            if let Some(date) = event.date_sort.filter(|date| *date > death) {
                out.push(self.conflict(
                    ConflictKind::EventAfterDeath,
                    Severity::Warning,
                    event.id,
                    first_death,
                    format!(
                        "{}: {} ({}) occurs after death ({})",
                        self.name, code, date, death
                    ),
                ));
            }
        }
    }

    fn future_dates(&self, out: &mut Vec<Conflict>) {
        for event in self.events {
            if let Some(date) = event.date_sort.filter(|date| *date > self.today) {
                out.push(self.conflict(
                    ConflictKind::FutureDate,
                    Severity::Warning,
                    event.id,
                    None,
                    format!(
                        "{}: {} date {} is in the future",
                        self.name,
                        self.code(event),
                        date
                    ),
                ));
            }
        }
    }

    /// Undated marriages sort first; a divorce intervenes when
    /// `earlier <= divorce <= later`.
    fn marriages_without_divorce(&self, out: &mut Vec<Conflict>) {
        let mut marriages = self.of_type(MARRIAGE_CODE);
        if marriages.len() < 2 {
            return;
        }
        marriages.sort_by_key(|event| event.date_sort);
        let divorces: Vec<NaiveDate> = self
            .of_type(DIVORCE_CODE)
            .iter()
            .filter_map(|event| event.date_sort)
            .collect();

        for pair in marriages.windows(2) {
            let [earlier, later] = pair else {
                continue;
            };
            let intervening = divorces.iter().any(|divorce| {
                earlier.date_sort <= Some(*divorce) && Some(*divorce) <= later.date_sort
            });
            if intervening {
                continue;
            }
            out.push(self.conflict(
                ConflictKind::MarriageWithoutDivorce,
                Severity::Warning,
                later.id,
                Some(earlier.id),
                format!(
                    "{}: marriage ({}) without divorce after prior marriage ({})",
                    self.name,
                    describe_date(later.date_sort),
                    describe_date(earlier.date_sort)
                ),
            ));
        }
    }

    /// Every repeat of a dated (type, date, place) key is flagged against
    /// the first event carrying that key.
    fn duplicates(&self, out: &mut Vec<Conflict>) {
        let mut first_seen: BTreeMap<(EventTypeId, Option<NaiveDate>, Option<PlaceId>), EventId> =
            BTreeMap::new();
        for event in self.events {
            let key = (event.event_type, event.date_sort, event.place);
            match (first_seen.get(&key), event.date_sort) {
                (Some(&original), Some(date)) => out.push(self.conflict(
                    ConflictKind::DuplicateEvent,
                    Severity::Info,
                    event.id,
                    Some(original),
                    format!(
                        "{}: duplicate {} event on {}",
                        self.name,
                        self.code(event),
                        date
                    ),
                )),
                (Some(_), None) => {}
                (None, _) => {
                    first_seen.insert(key, event.id);
                }
            }
        }
    }
}

fn describe_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "unknown date".to_string(), |date| date.to_string())
}

// =============================================================================
// TESTS
// =============================================================================
