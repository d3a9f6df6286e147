//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::snapshot;
use medgraph_core::{
    ConceptId, MedgraphError, ProductTier, ScheduleSource, classify, loader, run,
};
use std::path::Path;

// =============================================================================
// PATH VALIDATION
// =============================================================================

/// Validate a release/schedule directory path.
///
/// Canonicalizes the path to resolve symlinks and "..", and ensures it
/// is a directory.
fn validate_directory(path: &Path) -> Result<std::path::PathBuf, MedgraphError> {
    let canonical = path.canonicalize().map_err(|e| {
        MedgraphError::Io(format!("invalid directory '{}': {e}", path.display()))
    })?;
    if !canonical.is_dir() {
        return Err(MedgraphError::Io(format!(
            "path '{}' is not a directory",
            path.display()
        )));
    }
    Ok(canonical)
}

// =============================================================================
// ASSEMBLE COMMAND
// =============================================================================

/// Assemble a release into a JSON record bundle.
pub fn cmd_assemble(
    release_dir: &Path,
    schedule_dir: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), MedgraphError> {
    let release = snapshot::read_release(&validate_directory(release_dir)?)?;
    let schedule = match schedule_dir {
        Some(dir) => snapshot::read_schedule(&validate_directory(dir)?)?,
        None => ScheduleSource::default(),
    };

    let assembled = run(&release, &schedule)?;
    let bundle = serde_json::to_string_pretty(&assembled)
        .map_err(|e| MedgraphError::Io(format!("cannot serialize bundle: {e}")))?;

    match output {
        Some(path) => {
            std::fs::write(path, bundle).map_err(|e| {
                MedgraphError::Io(format!("cannot write {}: {e}", path.display()))
            })?;
            println!("Bundle written to {}", path.display());
            println!(
                "  Packages:      {}\n  Products:      {}\n  Substances:    {}\n  Organizations: {}",
                assembled.packages.len(),
                assembled.products.len(),
                assembled.substances.len(),
                assembled.organizations.len()
            );
        }
        None => println!("{bundle}"),
    }
    Ok(())
}

// =============================================================================
// DESCENDANTS COMMAND
// =============================================================================

/// Intersect the closure-descendant sets of the given anchors.
pub fn cmd_descendants(
    release_dir: &Path,
    anchors: &str,
    json_mode: bool,
) -> Result<(), MedgraphError> {
    let ids = parse_id_list(anchors)?;
    let release = snapshot::read_release(&validate_directory(release_dir)?)?;
    let loaded = loader::load(&release)?;
    let mut graph = loaded.graph;
    graph.close();

    let intersection = graph.common_descendants(&ids);
    if json_mode {
        let output = serde_json::json!({
            "anchors": ids.iter().map(|id| id.0).collect::<Vec<_>>(),
            "descendants": intersection.iter().map(|id| id.0).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Common descendants of {anchors}: {}", intersection.len());
    for id in intersection {
        println!("{}", id.0);
    }
    Ok(())
}

/// Parse a comma-separated concept-id list.
fn parse_id_list(raw: &str) -> Result<Vec<ConceptId>, MedgraphError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>().map(ConceptId).map_err(|_| {
                MedgraphError::MalformedRow(format!("not a concept id: {part:?}"))
            })
        })
        .collect()
}

// =============================================================================
// STATS COMMAND
// =============================================================================

/// Show release statistics.
pub fn cmd_stats(release_dir: &Path, json_mode: bool) -> Result<(), MedgraphError> {
    let release = snapshot::read_release(&validate_directory(release_dir)?)?;
    let loaded = loader::load(&release)?;
    let mut graph = loaded.graph;
    let store = loaded.store;
    graph.close();
    let tiers = classify(&graph);

    if json_mode {
        let tier_counts: serde_json::Map<String, serde_json::Value> = ProductTier::ALL
            .iter()
            .map(|&tier| {
                (
                    format!("{tier:?}"),
                    serde_json::Value::from(tiers.members(tier).len()),
                )
            })
            .collect();
        let output = serde_json::json!({
            "concepts": store.len(),
            "classified": tiers.classified_count(),
            "tiers": tier_counts,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Medgraph Release Statistics");
    println!("===========================");
    println!("Concepts:   {}", store.len());
    println!("Classified: {}", tiers.classified_count());
    println!();
    for &tier in &ProductTier::ALL {
        println!("{:<22} {}", format!("{tier:?}:"), tiers.members(tier).len());
    }
    Ok(())
}
