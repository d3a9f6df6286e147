//! # Release Loader & Temporal Reconciliation
//!
//! Consumes the typed snapshot rows of one release and produces the
//! concept store plus the (unclosed) IS-A graph.
//!
//! ## Module filter
//!
//! Only rows belonging to the terminology's own module are accepted;
//! all others are dropped silently.
//!
//! ## Temporal reconciliation
//!
//! A retired concept's final relationship/property rows may span several
//! historical effective dates with mixed active flags; keeping only
//! `active=true` rows can leave a retired concept with an empty or
//! semantically wrong relationship set. Two passes over the relationship
//! rows fix this:
//!
//! 1. For every concept that is itself inactive, record the maximum
//!    effective date seen across *all* of its relationship rows, active
//!    or not — its "last touched" date.
//! 2. Accept a relationship row iff it is active, or it is inactive and
//!    its owning concept is inactive and the row's date equals that
//!    concept's last-touched date.
//!
//! This freezes a retired concept's relationship set at the snapshot
//! taken on the date it was last modified. Datatype-property rows follow
//! the same rule one level down, keeping property and relationship
//! consistent with the same frozen snapshot.

use crate::graph::IsAGraph;
use crate::rows::{
    ACCEPTABILITY_PREFERRED, DESCRIPTION_FULL_NAME, DESCRIPTION_SYNONYM, ReleaseSource,
};
use crate::store::ConceptStore;
use crate::types::{
    AssociationKind, AttributeType, Concept, ConceptId, DataTypeProperty, DescriptionId,
    EffectiveDate, HistoricalAssociation, MedgraphError, ModuleId, PropertyType, Relationship,
    RelationshipId, RoleGroupKey, TERMINOLOGY_MODULE,
};
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

/// The loaded, reconciled release: store plus unclosed IS-A graph.
///
/// The caller closes the graph and derives ancestor sets afterwards;
/// loading itself never reads closure-derived state.
#[derive(Debug, Default)]
pub struct LoadedRelease {
    pub store: ConceptStore,
    pub graph: IsAGraph,
}

/// Where an accepted non-taxonomic relationship ended up, so that
/// datatype-property rows can find their owning relationship.
#[derive(Debug, Clone, Copy)]
struct RelationshipSlot {
    concept: ConceptId,
    key: RoleGroupKey,
    index: usize,
}

fn in_module(module: ModuleId) -> bool {
    module == TERMINOLOGY_MODULE
}

/// Load one release.
pub fn load(source: &ReleaseSource) -> Result<LoadedRelease, MedgraphError> {
    let mut store = ConceptStore::new();
    let mut graph = IsAGraph::new();

    load_concepts(source, &mut store, &mut graph);
    let last_touched = record_last_touched(source, &store);
    let slots = load_relationships(source, &mut store, &mut graph, &last_touched);
    load_properties(source, &mut store, &last_touched, &slots);
    load_descriptions(source, &mut store);
    load_identifiers(source, &mut store);
    load_associations(source, &mut store);

    info!(
        concepts = store.len(),
        is_a_edges = graph.edge_count(),
        "release loaded"
    );
    Ok(LoadedRelease { store, graph })
}

fn load_concepts(source: &ReleaseSource, store: &mut ConceptStore, graph: &mut IsAGraph) {
    for row in &source.concepts {
        if !in_module(row.module) {
            trace!(concept = row.id.0, "concept row outside module, dropped");
            continue;
        }
        match store.get_mut(row.id) {
            // Later row for the same id supersedes the earlier state.
            Some(existing) => {
                if row.effective_date >= existing.last_modified {
                    existing.active = row.active;
                }
                existing.touch(row.effective_date);
            }
            None => {
                store.insert(Concept::new(row.id, row.active, row.effective_date));
                graph.add_vertex(row.id);
            }
        }
    }
}

/// Pass 1: last-touched dates for inactive concepts, over *all* of their
/// relationship rows regardless of the row's own active flag.
fn record_last_touched(
    source: &ReleaseSource,
    store: &ConceptStore,
) -> BTreeMap<ConceptId, EffectiveDate> {
    let mut last_touched = BTreeMap::new();
    for row in &source.relationships {
        if !in_module(row.module) {
            continue;
        }
        let Some(concept) = store.get(row.source) else {
            continue;
        };
        if concept.active {
            continue;
        }
        let entry = last_touched.entry(row.source).or_insert(row.effective_date);
        if row.effective_date > *entry {
            *entry = row.effective_date;
        }
    }
    last_touched
}

/// Pass 2: accept relationship rows under the reconciliation rule.
///
/// Rows are versions: the same relationship id may appear at several
/// effective dates, and only the latest version of each id is a
/// candidate. The acceptance rule then decides whether that final state
/// survives — which is what freezes a retired concept at its
/// last-touched snapshot instead of an arbitrary earlier active version.
fn load_relationships(
    source: &ReleaseSource,
    store: &mut ConceptStore,
    graph: &mut IsAGraph,
    last_touched: &BTreeMap<ConceptId, EffectiveDate>,
) -> BTreeMap<RelationshipId, RelationshipSlot> {
    let mut latest: BTreeMap<RelationshipId, &crate::rows::RelationshipRow> = BTreeMap::new();
    for row in &source.relationships {
        if !in_module(row.module) {
            continue;
        }
        let entry = latest.entry(row.id).or_insert(row);
        if row.effective_date >= entry.effective_date {
            *entry = row;
        }
    }

    let mut slots = BTreeMap::new();
    let mut skipped = 0usize;

    for row in latest.into_values() {
        let Some(attribute) = AttributeType::from_code(row.attribute_code) else {
            warn!(
                relationship = row.id.0,
                code = row.attribute_code,
                "unrecognized attribute type, row skipped"
            );
            skipped += 1;
            continue;
        };
        if !store.contains(row.destination) {
            warn!(
                relationship = row.id.0,
                destination = row.destination.0,
                "relationship destination not in store, row skipped"
            );
            skipped += 1;
            continue;
        }
        let Some(concept) = store.get_mut(row.source) else {
            warn!(
                relationship = row.id.0,
                source = row.source.0,
                "relationship source not in store, row skipped"
            );
            skipped += 1;
            continue;
        };

        let frozen_at = last_touched.get(&row.source).copied();
        let accepted =
            row.active || (!concept.active && frozen_at == Some(row.effective_date));
        if !accepted {
            trace!(relationship = row.id.0, "superseded relationship row dropped");
            continue;
        }

        concept.touch(row.effective_date);
        if attribute == AttributeType::IsA {
            // IS-A lives only in the parent map and the graph, never in
            // the role-group mapping.
            concept.parents.insert(row.destination);
            graph.add_edge(row.source, row.destination);
            continue;
        }

        let key = if row.group == 0 {
            RoleGroupKey::Synthetic {
                attribute,
                destination: row.destination,
            }
        } else {
            RoleGroupKey::Grouped(row.group)
        };
        let relationship = Relationship::new(
            row.source,
            row.destination,
            attribute,
            row.active,
            row.effective_date,
        );
        concept.add_relationship(key, relationship);
        let index = concept.role_groups.get(&key).map_or(0, |rels| rels.len() - 1);
        slots.insert(
            row.id,
            RelationshipSlot {
                concept: row.source,
                key,
                index,
            },
        );
    }

    if skipped > 0 {
        debug!(skipped, "relationship rows skipped");
    }
    slots
}

/// Datatype-property rows: the reconciliation rule one level down.
fn load_properties(
    source: &ReleaseSource,
    store: &mut ConceptStore,
    last_touched: &BTreeMap<ConceptId, EffectiveDate>,
    slots: &BTreeMap<RelationshipId, RelationshipSlot>,
) {
    // Latest version per (relationship, property attribute) wins.
    let mut latest: BTreeMap<(RelationshipId, u64), &crate::rows::DatatypePropertyRow> =
        BTreeMap::new();
    for row in &source.properties {
        if !in_module(row.module) {
            continue;
        }
        let entry = latest.entry((row.relationship, row.attribute_code)).or_insert(row);
        if row.effective_date >= entry.effective_date {
            *entry = row;
        }
    }

    for row in latest.into_values() {
        let Some(property) = PropertyType::from_code(row.attribute_code) else {
            warn!(
                relationship = row.relationship.0,
                code = row.attribute_code,
                "unrecognized property attribute, row skipped"
            );
            continue;
        };
        let Some(slot) = slots.get(&row.relationship) else {
            warn!(
                relationship = row.relationship.0,
                "property references no accepted relationship, row skipped"
            );
            continue;
        };
        let Some(concept) = store.get_mut(slot.concept) else {
            continue;
        };

        let frozen_at = last_touched.get(&slot.concept).copied();
        let mut touched = None;
        if let Some(rels) = concept.role_groups.get_mut(&slot.key)
            && let Some(relationship) = rels.get_mut(slot.index)
        {
            let accepted = (relationship.active && row.active)
                || (!relationship.active
                    && !row.active
                    && frozen_at == Some(row.effective_date)
                    && row.effective_date == relationship.effective_date);
            if !accepted {
                trace!(
                    relationship = row.relationship.0,
                    "superseded property row dropped"
                );
                continue;
            }
            let assigned = relationship.set_property(DataTypeProperty {
                value: row.value.clone(),
                unit: row.unit,
                property,
            });
            if !assigned {
                debug!(
                    relationship = row.relationship.0,
                    "relationship already carries a property, row dropped"
                );
                continue;
            }
            touched = Some(row.effective_date);
        }
        if let Some(date) = touched {
            concept.touch(date);
        }
    }
}

/// Resolve each concept's full specified name and preferred term.
fn load_descriptions(source: &ReleaseSource, store: &mut ConceptStore) {
    // Active, in-module descriptions indexed by id for the language pass.
    let mut by_id: BTreeMap<DescriptionId, &crate::rows::DescriptionRow> = BTreeMap::new();
    let mut best_full_name: BTreeMap<ConceptId, EffectiveDate> = BTreeMap::new();
    let mut best_preferred: BTreeMap<ConceptId, EffectiveDate> = BTreeMap::new();

    for row in &source.descriptions {
        if !in_module(row.module) || !row.active {
            continue;
        }
        by_id.insert(row.id, row);

        if row.kind_code == DESCRIPTION_FULL_NAME {
            let Some(concept) = store.get_mut(row.concept) else {
                warn!(description = row.id.0, "description for unknown concept, dropped");
                continue;
            };
            let best = best_full_name.entry(row.concept).or_insert(row.effective_date);
            if row.effective_date >= *best {
                *best = row.effective_date;
                concept.full_name = row.term.clone();
            }
            concept.touch(row.effective_date);
        }
    }

    for row in &source.language {
        if !in_module(row.module) || !row.active {
            continue;
        }
        if row.acceptability_code != ACCEPTABILITY_PREFERRED {
            continue;
        }
        let Some(description) = by_id.get(&row.description) else {
            trace!(
                description = row.description.0,
                "language preference for unknown description, dropped"
            );
            continue;
        };
        if description.kind_code != DESCRIPTION_SYNONYM {
            continue;
        }
        let Some(concept) = store.get_mut(description.concept) else {
            continue;
        };
        let best = best_preferred
            .entry(description.concept)
            .or_insert(row.effective_date);
        if row.effective_date >= *best {
            *best = row.effective_date;
            concept.preferred_term = description.term.clone();
        }
        concept.touch(row.effective_date);
    }
}

fn load_identifiers(source: &ReleaseSource, store: &mut ConceptStore) {
    for row in &source.identifiers {
        if !in_module(row.module) || !row.active {
            continue;
        }
        let Some(concept) = store.get_mut(row.concept) else {
            warn!(concept = row.concept.0, "identifier for unknown concept, dropped");
            continue;
        };
        concept.artg_ids.insert(row.identifier.clone());
        concept.touch(row.effective_date);
    }
}

fn load_associations(source: &ReleaseSource, store: &mut ConceptStore) {
    for row in &source.associations {
        if !in_module(row.module) || !row.active {
            continue;
        }
        let Some(kind) = AssociationKind::from_code(row.association_code) else {
            warn!(
                concept = row.concept.0,
                code = row.association_code,
                "unrecognized association type, row skipped"
            );
            continue;
        };
        if let Some(concept) = store.get_mut(row.concept) {
            concept.replaced_by.push(HistoricalAssociation {
                kind,
                other: row.target,
                date: row.effective_date,
            });
            concept.touch(row.effective_date);
        }
        if let Some(target) = store.get_mut(row.target) {
            target.replaces.push(HistoricalAssociation {
                kind,
                other: row.concept,
                date: row.effective_date,
            });
            target.touch(row.effective_date);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
