//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Stamm core:
//! - Store identifiers (`IndividualId`, `UnionId`, `EventId`, ...)
//! - Enumerated tags (`Sex`, `DatePrecision`, `Severity`, `Resolution`, ...)
//! - Error types (`StammError`)
//!
//! Entity structs live in the [`entity`] submodule.
//!
//! ## Determinism Guarantees
//!
//! All identifiers and tags:
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Serialize by variant index (postcard) or snake_case name (JSON)

pub mod entity;

use crate::primitives::{MAX_GENERATIONS, MIN_GENERATIONS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// STORE IDENTIFIERS
// =============================================================================

macro_rules! store_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

store_id!(
    /// Store-assigned identifier of an individual.
    IndividualId
);
store_id!(
    /// Store-assigned identifier of a union (partnership record).
    UnionId
);
store_id!(
    /// Store-assigned identifier of a child-link edge.
    ChildLinkId
);
store_id!(
    /// Store-assigned identifier of a deduplicated place.
    PlaceId
);
store_id!(
    /// Store-assigned identifier of a seeded event type.
    EventTypeId
);
store_id!(
    /// Store-assigned identifier of a life event.
    EventId
);
store_id!(
    /// Store-assigned identifier of a detected conflict.
    ConflictId
);

/// The kinds of entity a [`Store`](crate::store::Store) holds.
///
/// Each kind maps to its own table (persistent backend) or arena
/// (in-memory backend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Individual,
    Union,
    ChildLink,
    Place,
    EventType,
    LifeEvent,
    Conflict,
}

impl EntityKind {
    /// Every kind, in table-creation order.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Individual,
        EntityKind::Union,
        EntityKind::ChildLink,
        EntityKind::Place,
        EntityKind::EventType,
        EntityKind::LifeEvent,
        EntityKind::Conflict,
    ];

    /// Name of the table or arena holding this kind.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Individual => "individuals",
            Self::Union => "unions",
            Self::ChildLink => "child_links",
            Self::Place => "places",
            Self::EventType => "event_types",
            Self::LifeEvent => "life_events",
            Self::Conflict => "conflicts",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Individual => "individual",
            Self::Union => "union",
            Self::ChildLink => "child link",
            Self::Place => "place",
            Self::EventType => "event type",
            Self::LifeEvent => "life event",
            Self::Conflict => "conflict",
        };
        f.write_str(name)
    }
}

// =============================================================================
// TAGS
// =============================================================================

/// Sex code of an individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[default]
    #[serde(rename = "U")]
    Unknown,
}

impl Sex {
    /// Map a raw `SEX` value; anything but `M`/`F` is unknown.
    #[must_use]
    pub fn from_code(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "M" => Self::Male,
            "F" => Self::Female,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Unknown => "U",
        }
    }
}

/// Granularity or certainty of a normalized date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePrecision {
    Exact,
    Month,
    Year,
    Estimated,
    Before,
    After,
    Range,
    #[default]
    Unknown,
}

impl DatePrecision {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Month => "month",
            Self::Year => "year",
            Self::Estimated => "estimated",
            Self::Before => "before",
            Self::After => "after",
            Self::Range => "range",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DatePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the external coordinate lookup for a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Skipped,
}

/// Validation state of a life event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    #[default]
    Unvalidated,
    Valid,
    NeedsReview,
    Conflict,
}

/// Severity of a conflict. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = StammError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(StammError::InvalidInput(format!(
                "unknown severity '{}' (expected error, warning or info)",
                other
            ))),
        }
    }
}

/// Decision recorded against a conflict by a resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Confirmed,
    Rejected,
    NeedsReview,
    AutoFixed,
}

impl Resolution {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::NeedsReview => "needs_review",
            Self::AutoFixed => "auto_fixed",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = StammError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            "needs_review" => Ok(Self::NeedsReview),
            "auto_fixed" => Ok(Self::AutoFixed),
            other => Err(StammError::InvalidInput(format!(
                "unknown resolution '{}' (expected confirmed, rejected, needs_review or auto_fixed)",
                other
            ))),
        }
    }
}

/// The rule that produced a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    MultipleDeaths,
    DeathBeforeBirth,
    EventAfterDeath,
    FutureDate,
    MarriageWithoutDivorce,
    DuplicateEvent,
}

impl ConflictKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MultipleDeaths => "multiple_deaths",
            Self::DeathBeforeBirth => "death_before_birth",
            Self::EventAfterDeath => "event_after_death",
            Self::FutureDate => "future_date",
            Self::MarriageWithoutDivorce => "marriage_without_divorce",
            Self::DuplicateEvent => "duplicate_event",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a child's membership in a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildRelation {
    #[default]
    Biological,
    Adopted,
    Foster,
    Sealing,
    Other,
}

impl ChildRelation {
    /// Map a `PEDI` pedigree value.
    #[must_use]
    pub fn from_pedigree(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "birth" | "biological" => Self::Biological,
            "adopted" => Self::Adopted,
            "foster" => Self::Foster,
            "sealing" => Self::Sealing,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Biological => "biological",
            Self::Adopted => "adopted",
            Self::Foster => "foster",
            Self::Sealing => "sealing",
            Self::Other => "other",
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Stamm core.
///
/// Only conditions a caller can act on are errors: unreadable input, storage
/// failures, unknown identifiers and out-of-range parameters. Incomplete
/// genealogical data is never an error.
#[derive(Debug, Error)]
pub enum StammError {
    /// An I/O or storage engine error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// An entity could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored entity could not be decoded.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The requested entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: u64 },

    /// A kinship query named an individual that does not exist.
    #[error("Individual not found: {0}")]
    IndividualNotFound(IndividualId),

    /// A lineage query asked for a generation bound outside the allowed range.
    #[error("Generations must be between {min} and {max}, got {0}", min = MIN_GENERATIONS, max = MAX_GENERATIONS)]
    InvalidGenerations(usize),

    /// A caller-supplied argument could not be interpreted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// =============================================================================
// TESTS
// =============================================================================
