//! # Pipeline Façade
//!
//! Runs the full processing chain in its one valid order: load the
//! release rows, close the IS-A graph, derive per-concept ancestor
//! sets, classify tiers, fuse the subsidy schedule, assemble records.
//!
//! Every phase is deterministic, so two runs over the same inputs
//! produce identical output — callers may diff assembled releases
//! byte-for-byte.

use crate::assembly::{AssembledRelease, assemble};
use crate::fusion::fuse;
use crate::hierarchy::classify;
use crate::loader::load;
use crate::rows::{ReleaseSource, ScheduleSource};
use crate::types::MedgraphError;
use tracing::info;

/// Process one release plus its subsidy schedule into assembled records.
pub fn run(
    release: &ReleaseSource,
    schedule: &ScheduleSource,
) -> Result<AssembledRelease, MedgraphError> {
    let loaded = load(release)?;
    let mut store = loaded.store;
    let mut graph = loaded.graph;

    graph.close();
    store.derive_ancestors(&graph);
    info!(concepts = store.len(), "graph closed");

    let tiers = classify(&graph);
    info!(classified = tiers.classified_count(), "tiers classified");

    let manufacturers = fuse(&mut store, &graph, schedule)?;
    assemble(&store, &graph, &tiers, &manufacturers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_produce_empty_release() {
        let release = ReleaseSource::default();
        let schedule = ScheduleSource::default();
        let assembled = run(&release, &schedule).expect("run");
        assert_eq!(assembled.record_count(), 0);
        assert!(assembled.roots.is_empty());
    }
}
