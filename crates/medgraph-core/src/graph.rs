//! # IS-A Graph & Closure Engine
//!
//! Directed IS-A graph over concept ids with in-place transitive
//! closure.
//!
//! After [`IsAGraph::close`], "is there an edge u → v" is equivalent to
//! "is v an ancestor of u"; the hierarchy classifier and fusion
//! propagation both rely on that equivalence. All adjacency uses
//! `BTreeMap`/`BTreeSet` for deterministic ordering.

use crate::types::ConceptId;
use std::collections::{BTreeMap, BTreeSet};

/// The directed IS-A graph.
///
/// Edges point child → parent. Both a forward (ancestor-directed) and a
/// reverse (descendant-directed) adjacency are maintained so that
/// descendant queries after closure are single lookups.
#[derive(Debug, Clone, Default)]
pub struct IsAGraph {
    /// Every known vertex, including isolated ones.
    vertices: BTreeSet<ConceptId>,

    /// Forward adjacency: child -> set of parents (ancestors once closed).
    outgoing: BTreeMap<ConceptId, BTreeSet<ConceptId>>,

    /// Reverse adjacency: parent -> set of children (descendants once closed).
    incoming: BTreeMap<ConceptId, BTreeSet<ConceptId>>,
}

impl IsAGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex. Idempotent.
    pub fn add_vertex(&mut self, id: ConceptId) {
        self.vertices.insert(id);
    }

    /// Add a directed edge child → parent.
    ///
    /// Edges referencing unknown vertices are silently ignored; the
    /// loader skips such rows before they reach the graph.
    pub fn add_edge(&mut self, child: ConceptId, parent: ConceptId) {
        if !self.vertices.contains(&child) || !self.vertices.contains(&parent) {
            return;
        }
        self.outgoing.entry(child).or_default().insert(parent);
        self.incoming.entry(parent).or_default().insert(child);
    }

    /// Check whether the edge u → v exists. After closure this is the
    /// "v is an ancestor of u" test.
    #[must_use]
    pub fn has_edge(&self, u: ConceptId, v: ConceptId) -> bool {
        self.outgoing
            .get(&u)
            .is_some_and(|parents| parents.contains(&v))
    }

    /// Check whether a vertex exists.
    #[must_use]
    pub fn contains_vertex(&self, id: ConceptId) -> bool {
        self.vertices.contains(&id)
    }

    /// Total number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeSet::len).sum()
    }

    /// All ancestors of a vertex (its outgoing edge set). Complete only
    /// after [`Self::close`].
    #[must_use]
    pub fn ancestors(&self, id: ConceptId) -> BTreeSet<ConceptId> {
        self.outgoing.get(&id).cloned().unwrap_or_default()
    }

    /// All descendants of a vertex (its incoming edge set). Complete only
    /// after [`Self::close`].
    #[must_use]
    pub fn descendants(&self, id: ConceptId) -> BTreeSet<ConceptId> {
        self.incoming.get(&id).cloned().unwrap_or_default()
    }

    /// Intersection of the descendant sets of several vertices.
    ///
    /// This is the query surface used by external flat-file export
    /// tooling for hierarchy flattening.
    #[must_use]
    pub fn common_descendants(&self, anchors: &[ConceptId]) -> BTreeSet<ConceptId> {
        let mut iter = anchors.iter();
        let Some(&first) = iter.next() else {
            return BTreeSet::new();
        };
        let mut result = self.descendants(first);
        for &anchor in iter {
            let next = self.descendants(anchor);
            result = result.intersection(&next).copied().collect();
        }
        result
    }

    /// Compute the transitive closure in place.
    ///
    /// Standard reachability closure: for every pair (u, v) with a
    /// directed path u ⇒ v, the edge u → v is added. Idempotent:
    /// closing an already-closed graph adds no edges.
    ///
    /// IS-A snapshots are acyclic; a back edge found during traversal is
    /// ignored with a warning rather than looping.
    pub fn close(&mut self) {
        let mut closed: BTreeMap<ConceptId, BTreeSet<ConceptId>> = BTreeMap::new();
        let mut visiting = BTreeSet::new();
        for &vertex in &self.vertices {
            self.reachable(vertex, &mut closed, &mut visiting);
        }

        let mut incoming: BTreeMap<ConceptId, BTreeSet<ConceptId>> = BTreeMap::new();
        for (&child, parents) in &closed {
            for &parent in parents {
                incoming.entry(parent).or_default().insert(child);
            }
        }

        closed.retain(|_, parents| !parents.is_empty());
        self.outgoing = closed;
        self.incoming = incoming;
    }

    /// Ancestor-reachability of one vertex, memoized across the closure
    /// pass.
    fn reachable(
        &self,
        vertex: ConceptId,
        closed: &mut BTreeMap<ConceptId, BTreeSet<ConceptId>>,
        visiting: &mut BTreeSet<ConceptId>,
    ) -> BTreeSet<ConceptId> {
        if let Some(done) = closed.get(&vertex) {
            return done.clone();
        }
        if !visiting.insert(vertex) {
            tracing::warn!(concept = vertex.0, "cycle in IS-A graph, back edge ignored");
            return BTreeSet::new();
        }

        let mut reach = BTreeSet::new();
        if let Some(parents) = self.outgoing.get(&vertex) {
            for &parent in parents {
                reach.insert(parent);
                reach.extend(self.reachable(parent, closed, visiting));
            }
        }

        visiting.remove(&vertex);
        closed.insert(vertex, reach.clone());
        reach
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(ids: &[u64]) -> IsAGraph {
        let mut graph = IsAGraph::new();
        for &id in ids {
            graph.add_vertex(ConceptId(id));
        }
        for pair in ids.windows(2) {
            graph.add_edge(ConceptId(pair[0]), ConceptId(pair[1]));
        }
        graph
    }

    #[test]
    fn closure_adds_path_edges() {
        let mut graph = chain(&[1, 2, 3, 4]);
        graph.close();

        assert!(graph.has_edge(ConceptId(1), ConceptId(4)));
        assert!(graph.has_edge(ConceptId(2), ConceptId(4)));
        assert!(!graph.has_edge(ConceptId(4), ConceptId(1)));
        assert_eq!(
            graph.ancestors(ConceptId(1)),
            [2, 3, 4].iter().map(|&v| ConceptId(v)).collect()
        );
    }

    #[test]
    fn closure_is_idempotent() {
        let mut graph = chain(&[1, 2, 3, 4, 5]);
        graph.close();
        let edges_after_first = graph.edge_count();
        let ancestors_after_first = graph.ancestors(ConceptId(1));

        graph.close();
        assert_eq!(graph.edge_count(), edges_after_first);
        assert_eq!(graph.ancestors(ConceptId(1)), ancestors_after_first);
    }

    #[test]
    fn descendants_mirror_ancestors() {
        let mut graph = chain(&[10, 20, 30]);
        graph.close();

        assert_eq!(
            graph.descendants(ConceptId(30)),
            [10, 20].iter().map(|&v| ConceptId(v)).collect()
        );
        assert!(graph.descendants(ConceptId(10)).is_empty());
    }

    #[test]
    fn common_descendants_intersects() {
        // Two roots, one shared descendant.
        let mut graph = IsAGraph::new();
        for id in [1, 2, 3, 4] {
            graph.add_vertex(ConceptId(id));
        }
        graph.add_edge(ConceptId(3), ConceptId(1));
        graph.add_edge(ConceptId(3), ConceptId(2));
        graph.add_edge(ConceptId(4), ConceptId(1));
        graph.close();

        let both = graph.common_descendants(&[ConceptId(1), ConceptId(2)]);
        assert_eq!(both, [ConceptId(3)].into_iter().collect());
        assert!(graph.common_descendants(&[]).is_empty());
    }

    #[test]
    fn dangling_edges_ignored() {
        let mut graph = IsAGraph::new();
        graph.add_vertex(ConceptId(1));
        graph.add_edge(ConceptId(1), ConceptId(999));
        graph.add_edge(ConceptId(999), ConceptId(1));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn diamond_closure_complete() {
        //   1 -> 2 -> 4
        //   1 -> 3 -> 4
        let mut graph = IsAGraph::new();
        for id in [1, 2, 3, 4] {
            graph.add_vertex(ConceptId(id));
        }
        graph.add_edge(ConceptId(1), ConceptId(2));
        graph.add_edge(ConceptId(1), ConceptId(3));
        graph.add_edge(ConceptId(2), ConceptId(4));
        graph.add_edge(ConceptId(3), ConceptId(4));
        graph.close();

        assert_eq!(
            graph.ancestors(ConceptId(1)),
            [2, 3, 4].iter().map(|&v| ConceptId(v)).collect()
        );
        assert_eq!(
            graph.descendants(ConceptId(4)),
            [1, 2, 3].iter().map(|&v| ConceptId(v)).collect()
        );
    }
}
