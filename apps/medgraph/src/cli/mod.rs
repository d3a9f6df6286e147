//! # Medgraph CLI Module
//!
//! This module implements the CLI interface for Medgraph.
//!
//! ## Available Commands
//!
//! - `assemble` - Process a release + schedule into a JSON record bundle
//! - `descendants` - Intersect closure-descendant sets of anchor concepts
//! - `stats` - Show release statistics (concepts, edges, tier sizes)

mod commands;

use clap::{Parser, Subcommand};
use medgraph_core::MedgraphError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Medgraph - deterministic drug-terminology assembler
///
/// Loads a snapshot terminology release plus a subsidy schedule and
/// assembles the full package/product/substance record bundle.
#[derive(Parser, Debug)]
#[command(name = "medgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble a release into a JSON record bundle
    Assemble {
        /// Release directory (tab-delimited snapshot files)
        #[arg(short, long)]
        release: PathBuf,

        /// Schedule directory (subsidy/manufacturer files)
        #[arg(short, long)]
        schedule: Option<PathBuf>,

        /// Output file for the JSON bundle (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Intersect the closure-descendant sets of anchor concepts
    Descendants {
        /// Release directory (tab-delimited snapshot files)
        #[arg(short, long)]
        release: PathBuf,

        /// Anchor concept ids (comma-separated)
        #[arg(short, long)]
        anchors: String,
    },

    /// Show release statistics
    Stats {
        /// Release directory (tab-delimited snapshot files)
        #[arg(short, long)]
        release: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), MedgraphError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Assemble {
            release,
            schedule,
            output,
        } => cmd_assemble(&release, schedule.as_deref(), output.as_deref()),
        Commands::Descendants { release, anchors } => {
            cmd_descendants(&release, &anchors, json_mode)
        }
        Commands::Stats { release } => cmd_stats(&release, json_mode),
    }
}
