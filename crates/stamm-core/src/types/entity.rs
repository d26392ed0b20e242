//! # Store Entities
//!
//! Flat, id-addressed records. Entities never embed references to each other;
//! every relation is an id resolved through the [`Store`](crate::store::Store).

use super::{
    ChildLinkId, ChildRelation, ConflictId, ConflictKind, DatePrecision, EntityKind, EventId,
    EventTypeId, GeocodeStatus, IndividualId, PlaceId, Resolution, Severity, Sex, UnionId,
    ValidationStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// ENTITY TRAIT
// =============================================================================

/// A record kind the store can hold.
///
/// Ids are assigned by the store on `create`; an entity built in memory
/// carries id `0` until then.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    type Id: Copy + Ord + fmt::Debug + From<u64> + Into<u64>;

    const KIND: EntityKind;

    fn id(&self) -> Self::Id;

    fn assign_id(&mut self, id: Self::Id);
}

macro_rules! impl_entity {
    ($entity:ty, $id:ty, $kind:expr) => {
        impl Entity for $entity {
            type Id = $id;

            const KIND: EntityKind = $kind;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn assign_id(&mut self, id: Self::Id) {
                self.id = id;
            }
        }
    };
}

impl_entity!(Individual, IndividualId, EntityKind::Individual);
impl_entity!(Union, UnionId, EntityKind::Union);
impl_entity!(ChildLink, ChildLinkId, EntityKind::ChildLink);
impl_entity!(Place, PlaceId, EntityKind::Place);
impl_entity!(EventType, EventTypeId, EntityKind::EventType);
impl_entity!(LifeEvent, EventId, EntityKind::LifeEvent);
impl_entity!(Conflict, ConflictId, EntityKind::Conflict);

// =============================================================================
// PEOPLE AND UNIONS
// =============================================================================

/// A single person in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub id: IndividualId,
    /// Cross-reference key from the source file (e.g. `@I1@`).
    pub source_key: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub maiden_name: Option<String>,
    pub sex: Sex,
    /// True iff at least one conflict on this individual is unresolved.
    pub needs_review: bool,
    pub notes: Option<String>,
    pub biography: Option<String>,
}

impl Individual {
    pub fn new(source_key: impl Into<String>) -> Self {
        Self {
            id: IndividualId(0),
            source_key: source_key.into(),
            given_name: None,
            surname: None,
            maiden_name: None,
            sex: Sex::Unknown,
            needs_review: false,
            notes: None,
            biography: None,
        }
    }

    /// "Given Surname", or `(Unknown)` when both parts are missing.
    #[must_use]
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.given_name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            "(Unknown)".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// A partnership record. Either spouse may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Union {
    pub id: UnionId,
    pub source_key: String,
    pub husband: Option<IndividualId>,
    pub wife: Option<IndividualId>,
}

impl Union {
    pub fn new(source_key: impl Into<String>) -> Self {
        Self {
            id: UnionId(0),
            source_key: source_key.into(),
            husband: None,
            wife: None,
        }
    }

    /// Present spouses, husband first.
    pub fn spouses(&self) -> impl Iterator<Item = IndividualId> + '_ {
        self.husband.into_iter().chain(self.wife)
    }

    #[must_use]
    pub fn has_spouse(&self, individual: IndividualId) -> bool {
        self.husband == Some(individual) || self.wife == Some(individual)
    }
}

/// Edge recording that `child` belongs to `union`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildLink {
    pub id: ChildLinkId,
    pub union: UnionId,
    pub child: IndividualId,
    pub relation: ChildRelation,
}

impl ChildLink {
    pub fn new(union: UnionId, child: IndividualId, relation: ChildRelation) -> Self {
        Self {
            id: ChildLinkId(0),
            union,
            child,
            relation,
        }
    }
}

// =============================================================================
// PLACES
// =============================================================================

/// Latitude/longitude pair returned by a geocoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Deduplicated structured location. `raw_text` is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub raw_text: String,
    pub normalized: String,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub geocode_status: GeocodeStatus,
    pub coordinates: Option<Coordinates>,
}

impl Place {
    /// Text handed to a geocoder: the normalized form, else the raw text.
    #[must_use]
    pub fn search_text(&self) -> &str {
        if self.normalized.trim().is_empty() {
            &self.raw_text
        } else {
            &self.normalized
        }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// One entry of the seeded event vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: EventTypeId,
    pub code: String,
    pub label: String,
    pub sort_order: u32,
}

/// A dated (or undated) occurrence attached to one individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeEvent {
    pub id: EventId,
    pub individual: IndividualId,
    /// Set for union events fanned out to each spouse.
    pub union: Option<UnionId>,
    pub event_type: EventTypeId,
    pub date_raw: Option<String>,
    pub date_sort: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub precision: DatePrecision,
    pub place: Option<PlaceId>,
    pub description: Option<String>,
    pub validation: ValidationStatus,
}

// =============================================================================
// CONFLICTS
// =============================================================================

/// A detected inconsistency among one individual's events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub individual: IndividualId,
    pub event: EventId,
    pub related_event: Option<EventId>,
    pub kind: ConflictKind,
    pub description: String,
    pub severity: Severity,
    pub resolution: Option<Resolution>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub notes: Option<String>,
}

impl Conflict {
    pub fn new(
        individual: IndividualId,
        kind: ConflictKind,
        severity: Severity,
        event: EventId,
        related_event: Option<EventId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ConflictId(0),
            individual,
            event,
            related_event,
            kind,
            description: description.into(),
            severity,
            resolution: None,
            resolved_at: None,
            resolved_by: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// The primary event followed by the related event, if any.
    pub fn events(&self) -> impl Iterator<Item = EventId> + '_ {
        std::iter::once(self.event).chain(self.related_event)
    }
}
