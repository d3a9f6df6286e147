//! # Medgraph - Drug Terminology Assembler
//!
//! The main binary for the Medgraph deterministic terminology engine.
//!
//! This application provides:
//! - Tab-delimited snapshot/schedule readers
//! - CLI interface for assembly, hierarchy queries, and statistics
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                apps/medgraph (THE BINARY)              │
//! │                                                        │
//! │  ┌─────────────┐          ┌─────────────────────────┐  │
//! │  │   CLI       │          │  Snapshot readers       │  │
//! │  │  (clap)     │          │  (tab-delimited files)  │  │
//! │  └──────┬──────┘          └────────────┬────────────┘  │
//! │         │                              │               │
//! │         └──────────────┬───────────────┘               │
//! │                        ▼                               │
//! │               ┌─────────────────┐                      │
//! │               │  medgraph-core  │                      │
//! │               │   (THE LOGIC)   │                      │
//! │               └─────────────────┘                      │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Assemble a release into a JSON bundle
//! medgraph assemble -r ./release -s ./schedule -o bundle.json
//!
//! # Hierarchy flattening
//! medgraph descendants -r ./release -a 30537011000036101,30404011000036106
//!
//! # Release statistics
//! medgraph stats -r ./release
//! ```

use clap::Parser;
use medgraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Initialize tracing — MEDGRAPH_LOG_FORMAT=json enables machine-parseable output.
    // --verbose raises the default level; an explicit env filter wins.
    let log_format = std::env::var("MEDGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_log_filter(cli.verbose).into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// The log filter used when `RUST_LOG` is unset.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose { "medgraph=debug" } else { "medgraph=info" }
}

/// Print the Medgraph startup banner.
fn print_banner() {
    println!(
        r#"
  ███╗   ███╗███████╗██████╗  ██████╗ ██████╗  █████╗ ██████╗ ██╗  ██╗
  ████╗ ████║██╔════╝██╔══██╗██╔════╝ ██╔══██╗██╔══██╗██╔══██╗██║  ██║
  ██╔████╔██║█████╗  ██║  ██║██║  ███╗██████╔╝███████║██████╔╝███████║
  ██║╚██╔╝██║██╔══╝  ██║  ██║██║   ██║██╔══██╗██╔══██║██╔═══╝ ██╔══██║
  ██║ ╚═╝ ██║███████╗██████╔╝╚██████╔╝██║  ██║██║  ██║██║     ██║  ██║
  ╚═╝     ╚═╝╚══════╝╚═════╝  ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚═╝     ╚═╝  ╚═╝

  Drug Terminology Assembler v{}

  Deterministic • Batch • Fail-Fast
"#,
        env!("CARGO_PKG_VERSION")
    );
}

// =============================================================================
// TESTS
// =============================================================================
