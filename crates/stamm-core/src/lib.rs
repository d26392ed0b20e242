//! # stamm-core
//!
//! The genealogy engine for Stamm - THE LOGIC.
//!
//! This crate turns a hierarchical genealogy interchange file into a
//! normalized graph of individuals, unions and life events, flags events
//! that contradict each other, and answers kinship queries over the graph.
//!
//! ## Pipeline
//!
//! - `parser` → record trees in source order
//! - `normalize` → sortable dates and structured places
//! - `loader` → store-resident entities with deduplicated places
//! - `validator` → conflicts and review flags
//! - `kinship` → lineage, shortest paths and relationship classes
//!
//! ## Architectural Constraints
//!
//! - Every entry point takes an explicit `Store` handle; there is no global state
//! - Has NO async, NO network dependencies (pure Rust)
//! - Deterministic: ordered maps only, ids assigned by the store

// =============================================================================
// MODULES
// =============================================================================

pub mod geocode;
pub mod kinship;
pub mod loader;
pub mod normalize;
pub mod ordered;
pub mod parser;
pub mod pipeline;
pub mod primitives;
pub mod resolution;
pub mod storage;
pub mod store;
pub mod summary;
pub mod types;
pub mod validator;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::entity::{
    ChildLink, Conflict, Coordinates, Entity, EventType, Individual, LifeEvent, Place, Union,
};
pub use types::{
    ChildLinkId, ChildRelation, ConflictId, ConflictKind, DatePrecision, EntityKind, EventId,
    EventTypeId, GeocodeStatus, IndividualId, PlaceId, Resolution, Severity, Sex, StammError,
    UnionId, ValidationStatus,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use geocode::{GeocodeReport, Geocoder, geocode_pending};
pub use kinship::{Kinship, KinshipPath, Lineage, LineageMember, Relationship};
pub use loader::{LoadReport, Loader, load, seed_event_types};
pub use normalize::{NormalizedDate, NormalizedPlace, normalize_date, normalize_place};
pub use ordered::OrderedMap;
pub use parser::{ParsedFile, parse_bytes, parse_file, parse_str};
pub use pipeline::{IngestOptions, IngestReport, ingest_path, ingest_text};
pub use resolution::{ResolutionTally, defer_unresolved, resolve_conflict, unresolved_conflicts};
pub use storage::RedbStore;
pub use store::{MemoryStore, Store};
pub use summary::StoreSummary;
pub use validator::{ValidationReport, Validator};
