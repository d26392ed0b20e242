//! # Loader
//!
//! Materializes parsed records in a [`Store`].
//!
//! ## Passes
//!
//! 1. Individuals, building the source-key -> id map.
//! 2. Unions (spouses resolved through pass 1) and their child links.
//! 3. Events attached to individuals.
//! 4. Events attached to unions, one copy per resolvable spouse.
//!
//! Unresolvable references degrade to absent values.
//!
//! ## Reloads
//!
//! Individuals and unions are unique per source key. A record whose key is
//! already stored maps to the stored id and is not materialized again, so
//! its events are skipped. Child links are unique per (union, child), and
//! places are unique per raw text. Loading the same file twice therefore
//! adds nothing the second time.
//!
//! The store is read once up front to index what it already holds. Every
//! creation is staged in one [`WriteBatch`] and committed at the end, so a
//! failed load leaves the store untouched.

use crate::normalize::{normalize_date, normalize_place};
use crate::ordered::OrderedMap;
use crate::parser::{ParsedFile, RawEvent};
use crate::primitives::{EVENT_TYPES, FALLBACK_EVENT_CODE};
use crate::store::{Store, WriteBatch};
use crate::types::entity::{ChildLink, EventType, Individual, LifeEvent, Place, Union};
use crate::types::{
    ChildRelation, EventId, EventTypeId, IndividualId, PlaceId, StammError, UnionId,
    ValidationStatus,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

// =============================================================================
// EVENT VOCABULARY
// =============================================================================

/// Seed the event-type vocabulary into an empty store.
///
/// Returns the number of types created; a store that already holds any
/// event type is left untouched.
pub fn seed_event_types<S: Store>(store: &mut S) -> Result<usize, StammError> {
    if store.count::<EventType>()? > 0 {
        return Ok(0);
    }
    for (code, label, sort_order) in EVENT_TYPES {
        store.create(EventType {
            id: EventTypeId(0),
            code: (*code).to_string(),
            label: (*label).to_string(),
            sort_order: *sort_order,
        })?;
    }
    debug!(count = EVENT_TYPES.len(), "seeded event types");
    Ok(EVENT_TYPES.len())
}

/// Event type ids keyed by code.
pub fn event_type_index<S: Store>(store: &S) -> Result<BTreeMap<String, EventTypeId>, StammError> {
    Ok(store
        .all::<EventType>()?
        .into_iter()
        .map(|event_type| (event_type.code, event_type.id))
        .collect())
}

/// Index `items` by key. The lowest id wins when a key repeats.
fn index_by<T, K: Ord, V>(items: Vec<T>, split: impl Fn(T) -> (K, V)) -> BTreeMap<K, V> {
    let mut index = BTreeMap::new();
    for item in items {
        let (key, value) = split(item);
        index.entry(key).or_insert(value);
    }
    index
}

// =============================================================================
// LOADER
// =============================================================================

/// Counts and id maps produced by one load.
///
/// Counts cover entities created by this load; records that were already
/// stored are counted separately.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub individuals: usize,
    pub unions: usize,
    pub child_links: usize,
    pub events: usize,
    /// Events skipped because no event type (not even the fallback) exists.
    pub events_dropped: usize,
    /// Places created by this load.
    pub places: usize,
    /// Individuals whose source key was already stored.
    pub individuals_existing: usize,
    /// Unions whose source key was already stored.
    pub unions_existing: usize,
    pub individual_ids: OrderedMap<String, IndividualId>,
    pub union_ids: OrderedMap<String, UnionId>,
}

/// Single-use loader bound to a store for one ingestion run.
pub struct Loader<'s, S: Store> {
    store: &'s mut S,
    batch: WriteBatch,
    type_ids: BTreeMap<String, EventTypeId>,
    /// Source key -> id, for individuals stored before this run.
    stored_individuals: BTreeMap<String, IndividualId>,
    /// Source key -> id, for unions stored before this run.
    stored_unions: BTreeMap<String, UnionId>,
    /// (union, child) pairs linked in the store or in this run.
    links: BTreeSet<(UnionId, IndividualId)>,
    /// Raw text -> id, for stored places and places staged in this run.
    places: BTreeMap<String, PlaceId>,
    report: LoadReport,
}

impl<'s, S: Store> Loader<'s, S> {
    /// Index the store's event types, individuals, unions, child links and
    /// places, one scan each.
    pub fn new(store: &'s mut S) -> Result<Self, StammError> {
        let type_ids = event_type_index(store)?;
        let stored_individuals = index_by(store.all::<Individual>()?, |person| {
            (person.source_key, person.id)
        });
        let stored_unions = index_by(store.all::<Union>()?, |union| (union.source_key, union.id));
        let links = store
            .all::<ChildLink>()?
            .into_iter()
            .map(|link| (link.union, link.child))
            .collect();
        let places = index_by(store.all::<Place>()?, |place| (place.raw_text, place.id));
        let batch = store.begin_batch()?;

        Ok(Self {
            store,
            batch,
            type_ids,
            stored_individuals,
            stored_unions,
            links,
            places,
            report: LoadReport::default(),
        })
    }

    pub fn load(mut self, parsed: &ParsedFile) -> Result<LoadReport, StammError> {
        self.load_individuals(parsed)?;
        self.load_unions(parsed)?;
        self.load_individual_events(parsed)?;
        self.load_union_events(parsed)?;

        let staged = self.batch.len();
        self.store.commit_batch(self.batch)?;

        info!(
            individuals = self.report.individuals,
            individuals_existing = self.report.individuals_existing,
            unions = self.report.unions,
            unions_existing = self.report.unions_existing,
            child_links = self.report.child_links,
            events = self.report.events,
            events_dropped = self.report.events_dropped,
            places = self.report.places,
            staged,
            "load complete"
        );
        Ok(self.report)
    }

    // -------------------------------------------------------------------------
    // Pass 1
    // -------------------------------------------------------------------------

    fn load_individuals(&mut self, parsed: &ParsedFile) -> Result<(), StammError> {
        debug!(count = parsed.individuals.len(), "loading individuals");
        for (key, record) in parsed.individuals.iter() {
            if let Some(&id) = self.stored_individuals.get(key) {
                debug!(key = %key, id = %id, "individual already stored");
                self.report.individual_ids.insert(key.clone(), id);
                self.report.individuals_existing += 1;
                continue;
            }
            let individual = Individual {
                given_name: record.given_name.clone(),
                surname: record.surname.clone(),
                maiden_name: record.maiden_name.clone(),
                sex: record.sex,
                notes: record.notes.clone(),
                ..Individual::new(key.clone())
            };
            let id = self.batch.create(individual)?;
            self.report.individual_ids.insert(key.clone(), id);
            self.report.individuals += 1;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Pass 2
    // -------------------------------------------------------------------------

    fn load_unions(&mut self, parsed: &ParsedFile) -> Result<(), StammError> {
        debug!(count = parsed.unions.len(), "loading unions");
        for (key, record) in parsed.unions.iter() {
            let union_id = match self.stored_unions.get(key) {
                Some(&id) => {
                    self.report.unions_existing += 1;
                    id
                }
                None => {
                    let union = Union {
                        husband: self.resolve_individual(record.husband.as_ref()),
                        wife: self.resolve_individual(record.wife.as_ref()),
                        ..Union::new(key.clone())
                    };
                    self.report.unions += 1;
                    self.batch.create(union)?
                }
            };
            self.report.union_ids.insert(key.clone(), union_id);

            for child_key in &record.children {
                let Some(child) = self.resolve_individual(Some(child_key)) else {
                    debug!(union = %key, child = %child_key, "skipping unresolved child");
                    continue;
                };
                if !self.links.insert((union_id, child)) {
                    continue;
                }
                let relation = parsed
                    .individuals
                    .get(child_key)
                    .and_then(|child_record| child_record.pedigree_in(key))
                    .unwrap_or(ChildRelation::Biological);
                self.batch.create(ChildLink::new(union_id, child, relation))?;
                self.report.child_links += 1;
            }
        }
        Ok(())
    }

    fn resolve_individual(&self, key: Option<&String>) -> Option<IndividualId> {
        key.and_then(|key| self.report.individual_ids.get(key).copied())
    }

    // -------------------------------------------------------------------------
    // Passes 3 and 4
    // -------------------------------------------------------------------------

    fn load_individual_events(&mut self, parsed: &ParsedFile) -> Result<(), StammError> {
        for (key, record) in parsed.individuals.iter() {
            if self.stored_individuals.contains_key(key) {
                continue;
            }
            let Some(individual) = self.resolve_individual(Some(key)) else {
                continue;
            };
            for raw in &record.events {
                self.materialize_event(raw, individual, None)?;
            }
        }
        Ok(())
    }

    fn load_union_events(&mut self, parsed: &ParsedFile) -> Result<(), StammError> {
        for (key, record) in parsed.unions.iter() {
            if self.stored_unions.contains_key(key) {
                continue;
            }
            let Some(union_id) = self.report.union_ids.get(key).copied() else {
                continue;
            };
            let spouses: Vec<IndividualId> = [record.husband.as_ref(), record.wife.as_ref()]
                .into_iter()
                .filter_map(|spouse| self.resolve_individual(spouse))
                .collect();
            for raw in &record.events {
                for spouse in &spouses {
                    self.materialize_event(raw, *spouse, Some(union_id))?;
                }
            }
        }
        Ok(())
    }

    fn materialize_event(
        &mut self,
        raw: &RawEvent,
        individual: IndividualId,
        union: Option<UnionId>,
    ) -> Result<Option<EventId>, StammError> {
        let Some(event_type) = self
            .type_ids
            .get(&raw.tag)
            .or_else(|| self.type_ids.get(FALLBACK_EVENT_CODE))
            .copied()
        else {
            warn!(tag = %raw.tag, individual = %individual, "dropping event with no type");
            self.report.events_dropped += 1;
            return Ok(None);
        };

        let date = normalize_date(raw.date.as_deref().unwrap_or_default());
        let place = match raw.place.as_deref() {
            Some(text) => self.resolve_place(text)?,
            None => None,
        };

        let id = self.batch.create(LifeEvent {
            id: EventId(0),
            individual,
            union,
            event_type,
            date_raw: raw.date.clone(),
            date_sort: date.sort,
            date_end: date.end,
            precision: date.precision,
            place,
            description: raw.description.clone(),
            validation: ValidationStatus::Unvalidated,
        })?;
        self.report.events += 1;
        Ok(Some(id))
    }

    /// Indexed place for the raw text, or a newly staged one.
    fn resolve_place(&mut self, raw: &str) -> Result<Option<PlaceId>, StammError> {
        let key = raw.trim();
        if let Some(&id) = self.places.get(key) {
            return Ok(Some(id));
        }

        let Some(normalized) = normalize_place(key) else {
            return Ok(None);
        };
        let id = self.batch.create(Place::from(normalized))?;
        self.places.insert(key.to_string(), id);
        self.report.places += 1;
        Ok(Some(id))
    }
}

/// Load parsed records into `store` with a fresh [`Loader`].
pub fn load<S: Store>(store: &mut S, parsed: &ParsedFile) -> Result<LoadReport, StammError> {
    Loader::new(store)?.load(parsed)
}

// =============================================================================
// TESTS
// =============================================================================
