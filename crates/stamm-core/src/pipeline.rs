//! # Ingestion Pipeline
//!
//! One ingestion run, strictly in sequence: seed the event vocabulary,
//! parse, load, then validate. Each stage finishes its writes before the
//! next one starts.

use crate::loader::{LoadReport, Loader, seed_event_types};
use crate::parser::{ParsedFile, parse_file, parse_str};
use crate::store::Store;
use crate::types::StammError;
use crate::validator::{ValidationReport, Validator};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    pub skip_validation: bool,
    /// Validator to run; defaults to one dated today.
    pub validator: Option<Validator>,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Event types created in this run (0 when already seeded).
    pub event_types_seeded: usize,
    pub parsed_individuals: usize,
    pub parsed_unions: usize,
    pub parsed_events: usize,
    pub load: LoadReport,
    pub validation: Option<ValidationReport>,
}

/// Ingest an interchange file. An unreadable file is the only parse error.
pub fn ingest_path<S: Store>(
    store: &mut S,
    path: impl AsRef<Path>,
    options: IngestOptions,
) -> Result<IngestReport, StammError> {
    let path = path.as_ref();
    info!(path = %path.display(), "ingesting file");
    let parsed = parse_file(path)?;
    ingest_parsed(store, &parsed, options)
}

pub fn ingest_text<S: Store>(
    store: &mut S,
    text: &str,
    options: IngestOptions,
) -> Result<IngestReport, StammError> {
    ingest_parsed(store, &parse_str(text), options)
}

fn ingest_parsed<S: Store>(
    store: &mut S,
    parsed: &ParsedFile,
    options: IngestOptions,
) -> Result<IngestReport, StammError> {
    let event_types_seeded = seed_event_types(store)?;
    let load = Loader::new(store)?.load(parsed)?;

    let validation = if options.skip_validation {
        None
    } else {
        let validator = options.validator.unwrap_or_default();
        Some(validator.validate_all(store)?)
    };

    Ok(IngestReport {
        event_types_seeded,
        parsed_individuals: parsed.individuals.len(),
        parsed_unions: parsed.unions.len(),
        parsed_events: parsed.event_count(),
        load,
        validation,
    })
}
