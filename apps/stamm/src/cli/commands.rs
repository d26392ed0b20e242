//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::GeocoderConfig;
use crate::geocoder::NominatimGeocoder;
use serde::Serialize;
use serde_json::json;
use stamm_core::{
    Conflict, ConflictId, Individual, IndividualId, IngestOptions, Kinship, RedbStore, Resolution,
    Severity, StammError, Store, StoreSummary, Validator, defer_unresolved, geocode_pending,
    ingest_path, resolve_conflict, seed_event_types, unresolved_conflicts,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for ingestion (100 MB).
///
/// The parser reads the whole file into memory.
const MAX_INGEST_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), StammError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StammError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(StammError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, StammError> {
    // Canonicalize resolves "..", symlinks, and validates existence
    let canonical = path.canonicalize().map_err(|e| {
        StammError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(StammError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// HELPERS
// =============================================================================

fn open_store(db_path: &Path) -> Result<RedbStore, StammError> {
    RedbStore::open(db_path)
}

fn print_json<T: Serialize + ?Sized>(output: &T) -> Result<(), StammError> {
    let text = serde_json::to_string_pretty(output)
        .map_err(|e| StammError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Display name of an individual, or a placeholder for a dangling id.
fn name_of<S: Store>(store: &S, id: IndividualId) -> Result<String, StammError> {
    Ok(store
        .get::<Individual>(id)?
        .map_or_else(|| "(missing)".to_string(), |person| person.display_name()))
}

fn label_of<S: Store>(store: &S, id: IndividualId) -> Result<String, StammError> {
    Ok(format!("{} (#{})", name_of(store, id)?, id))
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create a database and seed the event vocabulary.
pub fn cmd_init(db_path: &Path, json_mode: bool, force: bool) -> Result<(), StammError> {
    if db_path.exists() {
        if !force {
            return Err(StammError::InvalidInput(format!(
                "Database {} already exists (use --force to replace it)",
                db_path.display()
            )));
        }
        tracing::warn!(path = %db_path.display(), "replacing existing database");
        std::fs::remove_file(db_path)
            .map_err(|e| StammError::Io(format!("Cannot remove {}: {}", db_path.display(), e)))?;
    }

    let mut store = open_store(db_path)?;
    let seeded = seed_event_types(&mut store)?;

    if json_mode {
        print_json(&json!({
            "database": db_path.to_string_lossy(),
            "event_types_seeded": seeded
        }))?;
        return Ok(());
    }

    println!("Initialized database {:?}", db_path);
    println!("  Event types: {}", seeded);
    Ok(())
}

// =============================================================================
// INGEST COMMAND
// =============================================================================

/// Parse, load and validate an interchange file.
pub fn cmd_ingest(
    db_path: &Path,
    json_mode: bool,
    file: &Path,
    skip_validation: bool,
) -> Result<(), StammError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_INGEST_FILE_SIZE)?;

    let mut store = open_store(db_path)?;
    let report = ingest_path(
        &mut store,
        &validated_path,
        IngestOptions {
            skip_validation,
            validator: None,
        },
    )?;
    let load = &report.load;

    if json_mode {
        print_json(&json!({
            "file": validated_path.to_string_lossy(),
            "event_types_seeded": report.event_types_seeded,
            "parsed": {
                "individuals": report.parsed_individuals,
                "unions": report.parsed_unions,
                "events": report.parsed_events
            },
            "loaded": {
                "individuals": load.individuals,
                "unions": load.unions,
                "child_links": load.child_links,
                "events": load.events,
                "events_dropped": load.events_dropped,
                "places": load.places,
                "individuals_existing": load.individuals_existing,
                "unions_existing": load.unions_existing
            },
            "validation": report.validation
        }))?;
        return Ok(());
    }

    println!("Ingested {:?}", validated_path);
    println!(
        "  Parsed:  {} individuals, {} unions, {} events",
        report.parsed_individuals, report.parsed_unions, report.parsed_events
    );
    println!(
        "  Loaded:  {} individuals, {} unions, {} child links, {} events, {} new places",
        load.individuals, load.unions, load.child_links, load.events, load.places
    );
    if load.individuals_existing + load.unions_existing > 0 {
        println!(
            "  Reused:  {} individuals, {} unions already stored",
            load.individuals_existing, load.unions_existing
        );
    }
    if load.events_dropped > 0 {
        println!("  Dropped: {} events without a type", load.events_dropped);
    }
    match report.validation {
        Some(validation) => println!(
            "  Checked: {} individuals, {} new conflicts, {} flagged for review",
            validation.individuals_checked,
            validation.conflicts_created,
            validation.individuals_flagged
        ),
        None => println!("  Validation skipped"),
    }
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Run the consistency rules over every individual.
pub fn cmd_validate(db_path: &Path, json_mode: bool) -> Result<(), StammError> {
    let mut store = open_store(db_path)?;
    let report = Validator::new().validate_all(&mut store)?;

    if json_mode {
        print_json(&json!(report))?;
        return Ok(());
    }

    println!("Validation complete");
    println!("  Individuals checked: {}", report.individuals_checked);
    println!("  New conflicts:       {}", report.conflicts_created);
    println!("  Events flagged:      {}", report.events_flagged);
    println!("  Needing review:      {}", report.individuals_flagged);
    Ok(())
}

// =============================================================================
// CONFLICTS COMMAND
// =============================================================================

/// List conflicts, errors first.
pub fn cmd_conflicts(
    db_path: &Path,
    json_mode: bool,
    all: bool,
    individual: Option<u64>,
    severity: Option<&str>,
) -> Result<(), StammError> {
    let severity = severity.map(str::parse::<Severity>).transpose()?;
    let individual = individual.map(IndividualId);

    let store = open_store(db_path)?;
    let mut conflicts = if all {
        let mut conflicts = store.all::<Conflict>()?;
        conflicts.sort_by_key(|conflict| (conflict.severity, conflict.id));
        conflicts
    } else {
        unresolved_conflicts(&store)?
    };
    conflicts.retain(|conflict| {
        individual.is_none_or(|id| conflict.individual == id)
            && severity.is_none_or(|level| conflict.severity == level)
    });

    if json_mode {
        let mut entries = Vec::with_capacity(conflicts.len());
        for conflict in &conflicts {
            entries.push(json!({
                "conflict": conflict,
                "individual_name": name_of(&store, conflict.individual)?
            }));
        }
        print_json(&json!({
            "count": conflicts.len(),
            "conflicts": entries
        }))?;
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicts.");
        return Ok(());
    }

    println!("Conflicts ({})", conflicts.len());
    println!("=============");
    for conflict in &conflicts {
        println!(
            "#{} [{}] {} - {}",
            conflict.id,
            conflict.severity,
            conflict.kind,
            label_of(&store, conflict.individual)?
        );
        println!("    {}", conflict.description);
        if let Some(resolution) = conflict.resolution {
            println!(
                "    resolved: {} by {}",
                resolution,
                conflict.resolved_by.as_deref().unwrap_or("unknown")
            );
        }
        if let Some(notes) = &conflict.notes {
            println!("    notes: {}", notes);
        }
    }
    Ok(())
}

// =============================================================================
// RESOLVE COMMAND
// =============================================================================

/// Record a decision on one conflict.
pub fn cmd_resolve(
    db_path: &Path,
    json_mode: bool,
    conflict: Option<u64>,
    resolution: Option<&str>,
    notes: Option<String>,
    resolved_by: &str,
) -> Result<(), StammError> {
    let id = conflict
        .map(ConflictId)
        .ok_or_else(|| StammError::InvalidInput("--conflict is required".to_string()))?;
    let resolution: Resolution = resolution
        .ok_or_else(|| StammError::InvalidInput("--resolution is required".to_string()))?
        .parse()?;

    let mut store = open_store(db_path)?;
    let resolved = resolve_conflict(&mut store, id, resolution, notes, resolved_by)?;
    let still_flagged = store.fetch::<Individual>(resolved.individual)?.needs_review;

    if json_mode {
        print_json(&json!({
            "conflict": resolved,
            "individual_needs_review": still_flagged
        }))?;
        return Ok(());
    }

    println!("Conflict #{} marked {}", resolved.id, resolution);
    println!(
        "  {} {} review",
        label_of(&store, resolved.individual)?,
        if still_flagged {
            "still needs"
        } else {
            "no longer needs"
        }
    );
    Ok(())
}

/// Mark every unresolved conflict `needs_review`.
pub fn cmd_defer_all(db_path: &Path, json_mode: bool, resolved_by: &str) -> Result<(), StammError> {
    let mut store = open_store(db_path)?;
    let tally = defer_unresolved(&mut store, resolved_by)?;

    if json_mode {
        print_json(&json!(tally))?;
        return Ok(());
    }

    println!("Deferred {} conflicts for review", tally.needs_review);
    Ok(())
}

// =============================================================================
// GEOCODE COMMAND
// =============================================================================

/// Look up coordinates for pending places.
pub fn cmd_geocode(
    db_path: &Path,
    json_mode: bool,
    limit: Option<usize>,
    config: &GeocoderConfig,
) -> Result<(), StammError> {
    let mut store = open_store(db_path)?;
    let mut geocoder = NominatimGeocoder::new(config)?;
    let report = geocode_pending(&mut store, &mut geocoder, limit)?;

    if json_mode {
        print_json(&json!(report))?;
        return Ok(());
    }

    println!("Geocoded {} places", report.total);
    println!("  Success: {}", report.success);
    println!("  Failed:  {}", report.failed);
    println!("  Skipped: {}", report.skipped);
    Ok(())
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

fn require_end(end: Option<u64>, query_type: &str) -> Result<IndividualId, StammError> {
    end.map(IndividualId).ok_or_else(|| {
        StammError::InvalidInput(format!("--end is required for {} queries", query_type))
    })
}

/// Execute a kinship query.
pub fn cmd_query(
    db_path: &Path,
    json_mode: bool,
    query_type: &str,
    start: u64,
    end: Option<u64>,
    generations: usize,
) -> Result<(), StammError> {
    let store = open_store(db_path)?;
    let kinship = Kinship::new(&store);
    let start = IndividualId(start);

    match query_type.to_lowercase().as_str() {
        kind @ ("ancestors" | "descendants") => {
            let lineage = if kind == "ancestors" {
                kinship.ancestors(start, generations)?
            } else {
                kinship.descendants(start, generations)?
            };

            if json_mode {
                let mut members = Vec::with_capacity(lineage.members.len());
                for member in &lineage.members {
                    members.push(json!({
                        "id": member.individual,
                        "name": name_of(&store, member.individual)?,
                        "generation": member.generation,
                        "reached_from": member.reached_from
                    }));
                }
                print_json(&json!({
                    "query": kind,
                    "root": lineage.root,
                    "generations": lineage.generations,
                    "count": members.len(),
                    "members": members
                }))?;
                return Ok(());
            }

            println!(
                "{} of {} ({} generations): {}",
                if kind == "ancestors" {
                    "Ancestors"
                } else {
                    "Descendants"
                },
                label_of(&store, start)?,
                lineage.generations,
                lineage.members.len()
            );
            for member in &lineage.members {
                println!(
                    "  gen {}  {}",
                    member.generation,
                    label_of(&store, member.individual)?
                );
            }
        }
        "path" => {
            let end = require_end(end, "path")?;
            let path = kinship.path(start, end)?;

            if json_mode {
                let output = match &path {
                    Some(path) => json!({
                        "found": true,
                        "path": path.individuals,
                        "steps": path.steps,
                        "degrees": path.degrees(),
                        "description": path.description()
                    }),
                    None => json!({
                        "found": false,
                        "path": [],
                        "steps": []
                    }),
                };
                print_json(&output)?;
                return Ok(());
            }

            let Some(path) = path else {
                println!(
                    "No path between {} and {}",
                    label_of(&store, start)?,
                    label_of(&store, end)?
                );
                return Ok(());
            };
            println!("{}", path.description());
            if let Some(first) = path.individuals.first() {
                println!("  {}", label_of(&store, *first)?);
            }
            for (step, next) in path.steps.iter().zip(path.individuals.iter().skip(1)) {
                println!("  -> {}: {}", step.label(), label_of(&store, *next)?);
            }
        }
        "relationship" => {
            let end = require_end(end, "relationship")?;
            let relationship = kinship.relationship(start, end)?;

            if json_mode {
                print_json(&json!({
                    "from": start,
                    "to": end,
                    "relationship": relationship
                }))?;
                return Ok(());
            }

            println!(
                "{} to {}: {}",
                label_of(&store, end)?,
                label_of(&store, start)?,
                relationship.label()
            );
        }
        _ => {
            return Err(StammError::InvalidInput(format!(
                "Unknown query type: {}. Use: ancestors, descendants, path, relationship",
                query_type
            )));
        }
    }

    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show database counts.
pub fn cmd_status(db_path: &Path, json_mode: bool) -> Result<(), StammError> {
    let store = open_store(db_path)?;
    let summary = StoreSummary::collect(&store)?;

    if json_mode {
        print_json(&json!({
            "database": db_path.to_string_lossy(),
            "summary": summary
        }))?;
        return Ok(());
    }

    println!("Stamm Database Status");
    println!("=====================");
    println!("Database: {:?}", db_path);
    println!();
    if summary.is_empty() {
        println!("Empty. Run `stamm ingest --file <FILE>` to load data.");
        return Ok(());
    }
    println!("Individuals: {}", summary.individuals);
    println!("  flagged:   {}", summary.individuals_flagged);
    println!("Unions:      {}", summary.unions);
    println!("Events:      {}", summary.events);
    println!("Places:      {}", summary.places);
    println!("  geocoded:  {}", summary.places_geocoded);
    println!("  pending:   {}", summary.places_pending);
    println!("Conflicts:   {}", summary.conflicts);
    println!("  open:      {}", summary.conflicts_unresolved);

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn print_json_reports_unrenderable_output() {
        // JSON object keys must be strings.
        let output = BTreeMap::from([((1u8, 2u8), "pair")]);
        assert!(matches!(
            print_json(&output),
            Err(StammError::Serialization(_))
        ));
    }

    #[test]
    fn print_json_accepts_values() {
        assert!(print_json(&json!({ "count": 1 })).is_ok());
    }
}
