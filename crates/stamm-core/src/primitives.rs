//! # Fixed Vocabularies and Limits
//!
//! Compiled-in constants for Stamm. Nothing here is configurable at runtime.
//!
//! 1. **Record tags**: the interchange tags the parser understands.
//! 2. **Event vocabulary**: the seeded event types and their sort order.
//! 3. **Query bounds**: limits that keep every kinship query bounded.

// =============================================================================
// RECORD TAGS
// =============================================================================

/// Level-0 tag opening an individual record.
pub const INDIVIDUAL_TAG: &str = "INDI";

/// Level-0 tag opening a union record.
pub const UNION_TAG: &str = "FAM";

/// Event tags recognised at depth 1 inside an individual record.
pub const INDIVIDUAL_EVENT_TAGS: &[&str] = &[
    "BIRT", "DEAT", "BURI", "BAPM", "CHR", "IMMI", "EMIG", "NATU", "CENS", "RESI", "OCCU", "GRAD",
    "RETI", "PROB", "WILL", "EVEN",
];

/// Event tags recognised at depth 1 inside a union record.
pub const UNION_EVENT_TAGS: &[&str] = &["MARR", "DIV", "EVEN"];

// =============================================================================
// EVENT VOCABULARY
// =============================================================================

/// Code of the generic fallback type for unrecognised event tags.
pub const FALLBACK_EVENT_CODE: &str = "EVEN";

pub const BIRTH_CODE: &str = "BIRT";
pub const DEATH_CODE: &str = "DEAT";
pub const MARRIAGE_CODE: &str = "MARR";
pub const DIVORCE_CODE: &str = "DIV";

/// Event types that legitimately occur after death.
pub const POSTMORTEM_CODES: &[&str] = &["DEAT", "BURI", "PROB", "WILL"];

/// The seeded vocabulary: `(code, label, sort_order)`.
pub const EVENT_TYPES: &[(&str, &str, u32)] = &[
    ("BIRT", "Birth", 1),
    ("DEAT", "Death", 2),
    ("MARR", "Marriage", 3),
    ("DIV", "Divorce", 4),
    ("IMMI", "Immigration", 5),
    ("EMIG", "Emigration", 6),
    ("BURI", "Burial", 7),
    ("CENS", "Census", 8),
    ("RESI", "Residence", 9),
    ("NATU", "Naturalization", 10),
    ("OCCU", "Occupation", 11),
    ("BAPM", "Baptism", 12),
    ("CHR", "Christening", 13),
    ("PROB", "Probate", 14),
    ("WILL", "Will", 15),
    ("GRAD", "Graduation", 16),
    ("RETI", "Retirement", 17),
    ("EVEN", "Other Event", 99),
];

// =============================================================================
// QUERY BOUNDS
// =============================================================================

/// Smallest generation bound accepted by lineage queries.
pub const MIN_GENERATIONS: usize = 1;

/// Largest generation bound accepted by lineage queries.
pub const MAX_GENERATIONS: usize = 10;

/// Level cap for the bidirectional path search.
///
/// One level expands every node of the smaller frontier, so a path longer
/// than this many edges is never found.
pub const MAX_PATH_LEVELS: usize = 1000;
