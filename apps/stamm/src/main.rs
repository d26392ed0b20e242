//! # Stamm
//!
//! Genealogy ingestion, conflict review and kinship queries.
//!
//! ## Usage
//!
//! ```bash
//! stamm init
//! stamm ingest -f family.ged
//! stamm conflicts --severity error
//! stamm resolve -c 3 -r confirmed -n "parish register checked"
//! stamm geocode --limit 50
//! stamm query -t path -s 12 -e 40
//! ```

use clap::Parser;
use stamm::cli;
use stamm::config::{LogFormat, StammConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    let config = match StammConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    init_tracing(config.log_format, cli.verbose, cli.quiet);

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins over the verbosity flags.
fn init_tracing(format: LogFormat, verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "stamm=debug,stamm_core=debug"
    } else if quiet {
        "warn"
    } else {
        "stamm=info,stamm_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    // Logs go to stderr so JSON command output stays parseable.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn print_banner() {
    println!(
        r#"
  ███████╗████████╗ █████╗ ███╗   ███╗███╗   ███╗
  ██╔════╝╚══██╔══╝██╔══██╗████╗ ████║████╗ ████║
  ███████╗   ██║   ███████║██╔████╔██║██╔████╔██║
  ╚════██║   ██║   ██╔══██║██║╚██╔╝██║██║╚██╔╝██║
  ███████║   ██║   ██║  ██║██║ ╚═╝ ██║██║ ╚═╝ ██║
  ╚══════╝   ╚═╝   ╚═╝  ╚═╝╚═╝     ╚═╝╚═╝     ╚═╝

  Genealogy Toolkit v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
