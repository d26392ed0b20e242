//! # Stamm CLI Module
//!
//! This module implements the CLI interface for Stamm.
//!
//! ## Available Commands
//!
//! - `init` - Create a database and seed the event vocabulary
//! - `ingest` - Parse, load and validate an interchange file
//! - `validate` - Re-run the consistency rules
//! - `conflicts` - List conflicts
//! - `resolve` - Record a decision on one conflict, or defer all
//! - `geocode` - Look up coordinates for pending places
//! - `query` - Ancestors, descendants, paths and relationships
//! - `status` - Show database counts (default)

mod commands;

use crate::config::StammConfig;
use clap::{Parser, Subcommand};
use stamm_core::StammError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stamm - genealogy ingestion and kinship queries
///
/// Loads a genealogy interchange file into a local database, flags
/// contradictory events for review, and answers kinship questions.
#[derive(Parser, Debug)]
#[command(name = "stamm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors; suppress the banner
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database (overrides config and STAMM_DB)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to a TOML config file (default: ./stamm.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new database
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Ingest an interchange file
    Ingest {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,

        /// Load without running the consistency rules
        #[arg(long)]
        skip_validation: bool,
    },

    /// Run the consistency rules over the whole database
    Validate,

    /// List conflicts (unresolved only, unless --all)
    Conflicts {
        /// Include resolved conflicts
        #[arg(short, long)]
        all: bool,

        /// Only conflicts of this individual
        #[arg(short, long)]
        individual: Option<u64>,

        /// Only this severity (error, warning, info)
        #[arg(short, long)]
        severity: Option<String>,
    },

    /// Resolve a conflict
    Resolve {
        /// Conflict ID
        #[arg(short, long, required_unless_present = "defer_all")]
        conflict: Option<u64>,

        /// confirmed, rejected, needs_review or auto_fixed
        #[arg(short, long, required_unless_present = "defer_all")]
        resolution: Option<String>,

        /// Free-text notes stored with the decision
        #[arg(short, long)]
        notes: Option<String>,

        /// Mark every unresolved conflict needs_review
        #[arg(long, conflicts_with_all = ["conflict", "resolution", "notes"])]
        defer_all: bool,
    },

    /// Geocode pending places
    Geocode {
        /// Maximum number of places to look up
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Query the family graph
    Query {
        /// Query type (ancestors, descendants, path, relationship)
        #[arg(short = 't', long)]
        query_type: String,

        /// Start individual ID
        #[arg(short, long)]
        start: u64,

        /// End individual ID (for path and relationship queries)
        #[arg(short, long)]
        end: Option<u64>,

        /// Generations to expand (1-10)
        #[arg(short, long, default_value = "3")]
        generations: usize,
    },

    /// Show database status
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and loaded configuration.
pub fn execute(cli: Cli, config: &StammConfig) -> Result<(), StammError> {
    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| config.database.clone());
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&database, json_mode, force),
        Some(Commands::Ingest {
            file,
            skip_validation,
        }) => cmd_ingest(&database, json_mode, &file, skip_validation),
        Some(Commands::Validate) => cmd_validate(&database, json_mode),
        Some(Commands::Conflicts {
            all,
            individual,
            severity,
        }) => cmd_conflicts(&database, json_mode, all, individual, severity.as_deref()),
        Some(Commands::Resolve {
            conflict,
            resolution,
            notes,
            defer_all,
        }) => {
            if defer_all {
                cmd_defer_all(&database, json_mode, &config.resolved_by)
            } else {
                cmd_resolve(
                    &database,
                    json_mode,
                    conflict,
                    resolution.as_deref(),
                    notes,
                    &config.resolved_by,
                )
            }
        }
        Some(Commands::Geocode { limit }) => {
            cmd_geocode(&database, json_mode, limit, &config.geocoder)
        }
        Some(Commands::Query {
            query_type,
            start,
            end,
            generations,
        }) => cmd_query(&database, json_mode, &query_type, start, end, generations),
        Some(Commands::Status) => cmd_status(&database, json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&database, json_mode)
        }
    }
}
