//! # Secondary-Dataset Fusion
//!
//! Merges the pricing/subsidy extract onto the concept graph.
//!
//! Subsidy rows are keyed by the scheme's own item code and
//! cross-reference the terminology by concept id (a specific-pack id,
//! optionally a generic-pack id). A row referencing a concept outside
//! the loaded slice is logged and skipped — the secondary dataset is
//! allowed to be wider than the terminology slice. An unmapped
//! program/restriction code, or a manufacturer conflict, is fatal.

use crate::graph::IsAGraph;
use crate::hierarchy::is_anchor;
use crate::rows::{ScheduleSource, SubsidyRow};
use crate::store::ConceptStore;
use crate::types::{
    ConceptId, Manufacturer, MedgraphError, ProgramCode, RestrictionFlag, Subsidy,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The schedule's manufacturer table, keyed by manufacturer code.
pub type ManufacturerTable = BTreeMap<String, Manufacturer>;

/// Fuse the subsidy schedule onto the store.
///
/// Must be called after closure: propagation walks closure-descendant
/// sets. Returns the manufacturer table for the assembly engine to
/// resolve organization records from.
pub fn fuse(
    store: &mut ConceptStore,
    graph: &IsAGraph,
    schedule: &ScheduleSource,
) -> Result<ManufacturerTable, MedgraphError> {
    let manufacturers = build_manufacturer_table(schedule);
    let mut attached = 0usize;
    let mut skipped = 0usize;

    for row in &schedule.subsidies {
        if !store.contains(row.specific_pack) {
            warn!(
                item = row.item_code.as_str(),
                pack = row.specific_pack.0,
                "subsidy references concept outside loaded slice, row skipped"
            );
            skipped += 1;
            continue;
        }

        let subsidy = build_subsidy(row)?;
        if let Some(code) = &row.manufacturer_code
            && !manufacturers.contains_key(code)
        {
            return Err(MedgraphError::UnmappedCode {
                table: "manufacturer",
                code: code.clone(),
            });
        }

        propagate(store, graph, row.specific_pack, &subsidy, row.manufacturer_code.as_deref())?;
        if let Some(generic) = row.generic_pack {
            if store.contains(generic) {
                propagate(store, graph, generic, &subsidy, row.manufacturer_code.as_deref())?;
            } else {
                warn!(
                    item = row.item_code.as_str(),
                    pack = generic.0,
                    "generic pack outside loaded slice, propagation skipped"
                );
            }
        }
        attached += 1;
    }

    info!(attached, skipped, "subsidy schedule fused");
    Ok(manufacturers)
}

fn build_manufacturer_table(schedule: &ScheduleSource) -> ManufacturerTable {
    let mut table = ManufacturerTable::new();
    for row in &schedule.manufacturers {
        table.insert(
            row.code.clone(),
            Manufacturer {
                code: row.code.clone(),
                name: row.name.clone(),
                address: row.address.clone(),
                phone: row.phone.clone(),
                fax: row.fax.clone(),
            },
        );
    }
    debug!(manufacturers = table.len(), "manufacturer table built");
    table
}

/// Construct a `Subsidy` from its row, resolving the closed code tables.
fn build_subsidy(row: &SubsidyRow) -> Result<Subsidy, MedgraphError> {
    Ok(Subsidy {
        item_code: row.item_code.clone(),
        program: ProgramCode::from_code(&row.program_code)?,
        max_price: row.max_price.clone(),
        claimed_price: row.claimed_price.clone(),
        restriction: RestrictionFlag::from_code(&row.restriction_code)?,
        notes: row.notes.clone(),
        cautions: row.cautions.clone(),
        atc_codes: row.atc_codes.iter().cloned().collect(),
    })
}

/// Attach the subsidy (and manufacturer) to the pack concept, then to
/// every concept that closure-edges into it, excluding tier anchors and
/// the pack itself.
fn propagate(
    store: &mut ConceptStore,
    graph: &IsAGraph,
    pack: ConceptId,
    subsidy: &Subsidy,
    manufacturer: Option<&str>,
) -> Result<(), MedgraphError> {
    apply(store, pack, subsidy, manufacturer)?;
    for descendant in graph.descendants(pack) {
        if is_anchor(descendant) || descendant == pack {
            continue;
        }
        if !store.contains(descendant) {
            continue;
        }
        apply(store, descendant, subsidy, manufacturer)?;
    }
    Ok(())
}

fn apply(
    store: &mut ConceptStore,
    id: ConceptId,
    subsidy: &Subsidy,
    manufacturer: Option<&str>,
) -> Result<(), MedgraphError> {
    let Some(concept) = store.get_mut(id) else {
        return Ok(());
    };
    concept.attach_subsidy(subsidy.clone());
    if let Some(code) = manufacturer {
        concept.assign_manufacturer(code)?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::TRADE_PACK_ROOT;
    use crate::rows::ManufacturerRow;
    use crate::types::{Concept, EffectiveDate};

    fn store_with(ids: &[u64]) -> ConceptStore {
        let mut store = ConceptStore::new();
        for &id in ids {
            store.insert(Concept::new(ConceptId(id), true, EffectiveDate(20_200_101)));
        }
        store
    }

    fn closed_graph(edges: &[(u64, u64)], vertices: &[u64]) -> IsAGraph {
        let mut graph = IsAGraph::new();
        for &v in vertices {
            graph.add_vertex(ConceptId(v));
        }
        for &(child, parent) in edges {
            graph.add_edge(ConceptId(child), ConceptId(parent));
        }
        graph.close();
        graph
    }

    fn subsidy_row(item: &str, pack: u64) -> SubsidyRow {
        SubsidyRow {
            item_code: item.to_string(),
            program_code: "GE".to_string(),
            restriction_code: "U".to_string(),
            max_price: "17.99".to_string(),
            claimed_price: "12.50".to_string(),
            specific_pack: ConceptId(pack),
            generic_pack: None,
            manufacturer_code: None,
            notes: Vec::new(),
            cautions: Vec::new(),
            atc_codes: vec![("N02BE01".to_string(), "Paracetamol".to_string())],
        }
    }

    #[test]
    fn subsidy_attaches_and_propagates_to_descendants() {
        let mut store = store_with(&[1, 2]);
        // 1 is the CTPP under pack 2.
        let graph = closed_graph(&[(1, 2)], &[1, 2]);
        let schedule = ScheduleSource {
            manufacturers: Vec::new(),
            subsidies: vec![subsidy_row("1234K", 2)],
        };

        fuse(&mut store, &graph, &schedule).expect("fuse");
        assert_eq!(store.get(ConceptId(2)).map(|c| c.subsidies.len()), Some(1));
        assert_eq!(store.get(ConceptId(1)).map(|c| c.subsidies.len()), Some(1));
    }

    #[test]
    fn propagation_excludes_anchors() {
        let anchor = TRADE_PACK_ROOT;
        let mut store = store_with(&[2, anchor.0]);
        let graph = closed_graph(&[(anchor.0, 2)], &[2, anchor.0]);
        let schedule = ScheduleSource {
            manufacturers: Vec::new(),
            subsidies: vec![subsidy_row("1234K", 2)],
        };

        fuse(&mut store, &graph, &schedule).expect("fuse");
        assert_eq!(store.get(anchor).map(|c| c.subsidies.len()), Some(0));
    }

    #[test]
    fn missing_pack_is_skipped_not_fatal() {
        let mut store = store_with(&[1]);
        let graph = closed_graph(&[], &[1]);
        let schedule = ScheduleSource {
            manufacturers: Vec::new(),
            subsidies: vec![subsidy_row("1234K", 999)],
        };

        fuse(&mut store, &graph, &schedule).expect("fuse");
        assert_eq!(store.get(ConceptId(1)).map(|c| c.subsidies.len()), Some(0));
    }

    #[test]
    fn unmapped_restriction_code_is_fatal() {
        let mut store = store_with(&[2]);
        let graph = closed_graph(&[], &[2]);
        let mut row = subsidy_row("1234K", 2);
        row.restriction_code = "X".to_string();
        let schedule = ScheduleSource {
            manufacturers: Vec::new(),
            subsidies: vec![row],
        };

        assert!(matches!(
            fuse(&mut store, &graph, &schedule),
            Err(MedgraphError::UnmappedCode { table: "restriction", .. })
        ));
    }

    #[test]
    fn manufacturer_conflict_is_fatal_and_repeat_is_idempotent() {
        let mut store = store_with(&[2]);
        let graph = closed_graph(&[], &[2]);
        let manufacturers = vec![
            ManufacturerRow {
                code: "AB".to_string(),
                name: "Alpha Biologics".to_string(),
                address: "1 Example St".to_string(),
                phone: "02 9999 0000".to_string(),
                fax: None,
            },
            ManufacturerRow {
                code: "CD".to_string(),
                name: "Carmine Druggists".to_string(),
                address: "2 Sample Rd".to_string(),
                phone: "03 8888 0000".to_string(),
                fax: Some("03 8888 0001".to_string()),
            },
        ];

        let mut first = subsidy_row("1234K", 2);
        first.manufacturer_code = Some("AB".to_string());
        let mut repeat = subsidy_row("5678L", 2);
        repeat.manufacturer_code = Some("AB".to_string());
        let schedule = ScheduleSource {
            manufacturers: manufacturers.clone(),
            subsidies: vec![first.clone(), repeat],
        };
        fuse(&mut store, &graph, &schedule).expect("same manufacturer twice is a no-op");

        let mut conflict = subsidy_row("9999X", 2);
        conflict.manufacturer_code = Some("CD".to_string());
        let schedule = ScheduleSource {
            manufacturers,
            subsidies: vec![conflict],
        };
        assert!(matches!(
            fuse(&mut store, &graph, &schedule),
            Err(MedgraphError::ManufacturerConflict { .. })
        ));
    }

    #[test]
    fn generic_pack_propagation_reaches_its_descendants() {
        // Specific pack 3 under generic pack 4; sibling 5 also under 4.
        let mut store = store_with(&[3, 4, 5]);
        let graph = closed_graph(&[(3, 4), (5, 4)], &[3, 4, 5]);
        let mut row = subsidy_row("1234K", 3);
        row.generic_pack = Some(ConceptId(4));
        let schedule = ScheduleSource {
            manufacturers: Vec::new(),
            subsidies: vec![row],
        };

        fuse(&mut store, &graph, &schedule).expect("fuse");
        for id in [3, 4, 5] {
            assert_eq!(
                store.get(ConceptId(id)).map(|c| c.subsidies.len()),
                Some(1),
                "concept {id} missing subsidy"
            );
        }
    }
}
