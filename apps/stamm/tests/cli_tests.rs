//! End-to-end tests for the CLI: argument parsing and command execution
//! against temporary databases.

#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use stamm::cli::{self, Cli, Commands};
use stamm::config::StammConfig;
use stamm_core::{
    Conflict, ConflictKind, GeocodeStatus, Individual, IndividualId, Place, RedbStore, Resolution,
    StammError, Store, StoreSummary,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAMILY: &str = "\
0 HEAD
1 CHAR UTF-8
0 @I1@ INDI
1 NAME Anton /Berger/
1 SEX M
1 BIRT
2 DATE 12 MAR 1850
2 PLAC Graz, Styria, Austria
0 @I2@ INDI
1 NAME Rosa /Berger/
1 SEX F
1 BIRT
2 DATE 1880
1 DEAT
2 DATE 1870
0 @I3@ INDI
1 NAME Franz /Berger/
1 SEX M
1 BIRT
2 DATE 1882
2 PLAC Graz, Styria, Austria
0 @F1@ FAM
1 HUSB @I1@
1 CHIL @I2@
1 CHIL @I3@
0 TRLR
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("family.redb")
    }

    fn family_file(&self) -> PathBuf {
        let path = self.dir.path().join("family.ged");
        std::fs::write(&path, FAMILY).unwrap();
        path
    }

    fn run_with(&self, config: &StammConfig, args: &[&str]) -> Result<(), StammError> {
        let db = self.db();
        let mut argv = vec!["stamm", "--json-mode", "-q", "-D", db.to_str().unwrap()];
        argv.extend_from_slice(args);
        cli::execute(Cli::try_parse_from(argv).unwrap(), config)
    }

    fn run(&self, args: &[&str]) -> Result<(), StammError> {
        self.run_with(&StammConfig::default(), args)
    }

    /// A database holding the family file, validated.
    fn ingested() -> Self {
        let ws = Self::new();
        let file = ws.family_file();
        ws.run(&["ingest", "-f", file.to_str().unwrap()]).unwrap();
        ws
    }

    fn store(&self) -> RedbStore {
        RedbStore::open(self.db()).unwrap()
    }
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

fn open_conflicts(path: &Path) -> Vec<Conflict> {
    RedbStore::open(path)
        .unwrap()
        .filter(|conflict: &Conflict| !conflict.is_resolved())
        .unwrap()
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn test_no_subcommand_defaults_to_status() {
    let cli = parse(&["stamm"]);
    assert!(cli.command.is_none());
    assert!(!cli.json_mode);
}

#[test]
fn test_query_flags() {
    let cli = parse(&["stamm", "query", "-t", "path", "-s", "3", "-e", "7"]);
    match cli.command {
        Some(Commands::Query {
            query_type,
            start,
            end,
            generations,
        }) => {
            assert_eq!(query_type, "path");
            assert_eq!(start, 3);
            assert_eq!(end, Some(7));
            assert_eq!(generations, 3);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["stamm", "status", "--json-mode", "-D", "other.redb"]);
    assert!(cli.json_mode);
    assert_eq!(cli.database, Some(PathBuf::from("other.redb")));
}

#[test]
fn test_resolve_requires_conflict_and_resolution() {
    assert!(Cli::try_parse_from(["stamm", "resolve", "-c", "1"]).is_err());
    assert!(Cli::try_parse_from(["stamm", "resolve", "-r", "confirmed"]).is_err());
    assert!(Cli::try_parse_from(["stamm", "resolve", "-c", "1", "-r", "confirmed"]).is_ok());
}

#[test]
fn test_defer_all_stands_alone() {
    let cli = parse(&["stamm", "resolve", "--defer-all"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Resolve {
            defer_all: true,
            ..
        })
    ));
    assert!(Cli::try_parse_from(["stamm", "resolve", "--defer-all", "-c", "1"]).is_err());
}

// =============================================================================
// INIT
// =============================================================================

#[test]
fn test_init_creates_database_once() {
    let ws = Workspace::new();
    ws.run(&["init"]).unwrap();
    assert!(ws.db().exists());

    let again = ws.run(&["init"]);
    assert!(matches!(again, Err(StammError::InvalidInput(_))));

    ws.run(&["init", "--force"]).unwrap();
}

#[test]
fn test_force_init_discards_data() {
    let ws = Workspace::ingested();
    ws.run(&["init", "-f"]).unwrap();
    assert_eq!(ws.store().count::<Individual>().unwrap(), 0);
}

// =============================================================================
// INGEST, STATUS, VALIDATE
// =============================================================================

#[test]
fn test_ingest_loads_and_flags() {
    let ws = Workspace::ingested();
    let store = ws.store();

    assert_eq!(store.count::<Individual>().unwrap(), 3);
    assert_eq!(store.count::<Place>().unwrap(), 1);

    let rosa = store.fetch::<Individual>(IndividualId(2)).unwrap();
    assert_eq!(rosa.display_name(), "Rosa Berger");
    assert!(rosa.needs_review);

    let conflicts = store.all::<Conflict>().unwrap();
    assert!(
        conflicts
            .iter()
            .any(|c| c.kind == ConflictKind::DeathBeforeBirth)
    );
    assert!(conflicts.iter().all(|c| c.individual == IndividualId(2)));
}

#[test]
fn test_ingest_same_file_twice_keeps_counts() {
    let ws = Workspace::ingested();
    let before = StoreSummary::collect(&ws.store()).unwrap();
    let conflicts = ws.store().count::<Conflict>().unwrap();

    let file = ws.family_file();
    ws.run(&["ingest", "-f", file.to_str().unwrap()]).unwrap();

    let store = ws.store();
    assert_eq!(StoreSummary::collect(&store).unwrap(), before);
    assert_eq!(store.count::<Individual>().unwrap(), 3);
    assert_eq!(store.count::<Conflict>().unwrap(), conflicts);
}

#[test]
fn test_ingest_skip_validation() {
    let ws = Workspace::new();
    let file = ws.family_file();
    ws.run(&["ingest", "-f", file.to_str().unwrap(), "--skip-validation"])
        .unwrap();
    assert_eq!(ws.store().count::<Conflict>().unwrap(), 0);

    ws.run(&["validate"]).unwrap();
    assert!(ws.store().count::<Conflict>().unwrap() > 0);
}

#[test]
fn test_ingest_rejects_missing_and_directory_paths() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("nope.ged");
    let result = ws.run(&["ingest", "-f", missing.to_str().unwrap()]);
    assert!(matches!(result, Err(StammError::Io(_))));

    let result = ws.run(&["ingest", "-f", ws.dir.path().to_str().unwrap()]);
    assert!(matches!(result, Err(StammError::Io(_))));
}

#[test]
fn test_status_on_empty_and_loaded() {
    let ws = Workspace::new();
    ws.run(&["status"]).unwrap();
    ws.run(&[]).unwrap();

    let ws = Workspace::ingested();
    ws.run(&["status"]).unwrap();
}

#[test]
fn test_revalidate_adds_nothing() {
    let ws = Workspace::ingested();
    let before = ws.store().count::<Conflict>().unwrap();
    ws.run(&["validate"]).unwrap();
    assert_eq!(ws.store().count::<Conflict>().unwrap(), before);
}

// =============================================================================
// CONFLICTS AND RESOLUTION
// =============================================================================

#[test]
fn test_conflict_listing_filters() {
    let ws = Workspace::ingested();
    ws.run(&["conflicts"]).unwrap();
    ws.run(&["conflicts", "--all", "-s", "error", "-i", "2"])
        .unwrap();

    let result = ws.run(&["conflicts", "-s", "fatal"]);
    assert!(matches!(result, Err(StammError::InvalidInput(_))));
}

#[test]
fn test_resolve_every_conflict_clears_flag() {
    let ws = Workspace::ingested();
    let conflicts = open_conflicts(&ws.db());
    assert!(!conflicts.is_empty());

    for conflict in &conflicts {
        let id = conflict.id.to_string();
        ws.run(&[
            "resolve",
            "-c",
            id.as_str(),
            "-r",
            "confirmed",
            "-n",
            "register checked",
        ])
        .unwrap();
    }

    let store = ws.store();
    let resolved = store.fetch::<Conflict>(conflicts[0].id).unwrap();
    assert_eq!(resolved.resolution, Some(Resolution::Confirmed));
    assert_eq!(resolved.resolved_by.as_deref(), Some("cli"));
    assert_eq!(resolved.notes.as_deref(), Some("register checked"));
    assert!(!store.fetch::<Individual>(IndividualId(2)).unwrap().needs_review);
}

#[test]
fn test_resolve_uses_configured_actor() {
    let ws = Workspace::ingested();
    let config = StammConfig {
        resolved_by: "archivist".to_string(),
        ..StammConfig::default()
    };
    ws.run_with(&config, &["resolve", "--defer-all"]).unwrap();

    let store = ws.store();
    let conflicts = store.all::<Conflict>().unwrap();
    assert!(conflicts.iter().all(|c| {
        c.resolution == Some(Resolution::NeedsReview) && c.resolved_by.as_deref() == Some("archivist")
    }));
    // a deferral is a recorded decision, so nothing is left open
    assert!(!store.fetch::<Individual>(IndividualId(2)).unwrap().needs_review);
}

#[test]
fn test_resolve_errors() {
    let ws = Workspace::ingested();
    let result = ws.run(&["resolve", "-c", "1", "-r", "maybe"]);
    assert!(matches!(result, Err(StammError::InvalidInput(_))));

    let result = ws.run(&["resolve", "-c", "999", "-r", "rejected"]);
    assert!(matches!(result, Err(StammError::NotFound { .. })));
}

// =============================================================================
// QUERY
// =============================================================================

#[test]
fn test_queries_succeed() {
    let ws = Workspace::ingested();
    ws.run(&["query", "-t", "ancestors", "-s", "3", "-g", "2"])
        .unwrap();
    ws.run(&["query", "-t", "descendants", "-s", "1"]).unwrap();
    ws.run(&["query", "-t", "path", "-s", "2", "-e", "3"]).unwrap();
    ws.run(&["query", "-t", "relationship", "-s", "2", "-e", "3"])
        .unwrap();
}

#[test]
fn test_query_errors() {
    let ws = Workspace::ingested();

    let result = ws.run(&["query", "-t", "cousins", "-s", "1"]);
    assert!(matches!(result, Err(StammError::InvalidInput(_))));

    let result = ws.run(&["query", "-t", "path", "-s", "1"]);
    assert!(matches!(result, Err(StammError::InvalidInput(_))));

    let result = ws.run(&["query", "-t", "ancestors", "-s", "1", "-g", "0"]);
    assert!(matches!(result, Err(StammError::InvalidGenerations(0))));

    let result = ws.run(&["query", "-t", "descendants", "-s", "42"]);
    assert!(matches!(
        result,
        Err(StammError::IndividualNotFound(IndividualId(42)))
    ));
}

// =============================================================================
// GEOCODE
// =============================================================================

#[test]
fn test_geocode_unreachable_service_marks_failed() {
    let ws = Workspace::ingested();
    let mut config = StammConfig::default();
    config.geocoder.url = "http://127.0.0.1:9/search".to_string();
    config.geocoder.min_interval_ms = 0;
    config.geocoder.timeout_secs = 2;

    ws.run_with(&config, &["geocode", "--limit", "5"]).unwrap();

    let places = ws.store().all::<Place>().unwrap();
    assert_eq!(places.len(), 1);
    assert_eq!(places[0].geocode_status, GeocodeStatus::Failed);
    assert!(places[0].coordinates.is_none());
}
