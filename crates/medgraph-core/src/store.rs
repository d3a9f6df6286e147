//! # Concept Store
//!
//! Arena of every concept in the release, keyed by numeric id.
//!
//! Pure data: mutated only during load and fusion, read-only during
//! assembly, discarded at the end of a run. All cross-references
//! (parents, ancestors, manufacturer, subsidies) are stored by id, never
//! by owning reference, so the arena is the single owner of every
//! concept.

use crate::graph::IsAGraph;
use crate::types::{Concept, ConceptId, MedgraphError};
use std::collections::BTreeMap;

/// The concept arena.
#[derive(Debug, Clone, Default)]
pub struct ConceptStore {
    concepts: BTreeMap<ConceptId, Concept>,
}

impl ConceptStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a concept. A duplicate id replaces the earlier entry
    /// (snapshots state each concept once; later rows supersede).
    pub fn insert(&mut self, concept: Concept) {
        self.concepts.insert(concept.id, concept);
    }

    /// Look up a concept.
    #[must_use]
    pub fn get(&self, id: ConceptId) -> Option<&Concept> {
        self.concepts.get(&id)
    }

    /// Look up a concept mutably.
    pub fn get_mut(&mut self, id: ConceptId) -> Option<&mut Concept> {
        self.concepts.get_mut(&id)
    }

    /// Look up a concept that must be present.
    ///
    /// A missing id here is a fatal data-integrity error: the caller is
    /// resolving a stated reference, not probing.
    pub fn require(&self, id: ConceptId) -> Result<&Concept, MedgraphError> {
        self.concepts
            .get(&id)
            .ok_or(MedgraphError::ConceptNotFound(id))
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, id: ConceptId) -> bool {
        self.concepts.contains_key(&id)
    }

    /// Number of concepts in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Iterate concepts in deterministic id order.
    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// Populate every concept's ancestor set from the closed graph.
    ///
    /// Called once, after closure; ancestor sets are never recomputed.
    pub fn derive_ancestors(&mut self, graph: &IsAGraph) {
        for concept in self.concepts.values_mut() {
            concept.ancestors = graph.ancestors(concept.id);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
