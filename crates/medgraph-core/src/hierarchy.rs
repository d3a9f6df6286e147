//! # Hierarchy Classifier
//!
//! Partitions the closed IS-A graph into seven disjoint product tiers,
//! each rooted at one fixed anchor concept.
//!
//! Because the graph is fully closed, a containered-trade-pack concept
//! also closure-edges into every less-specific pack anchor, so the pack
//! tiers are computed with explicit exclusion in precedence order; the
//! unit tiers likewise. Substances form a disjoint sub-graph and need no
//! exclusion. Anchor ids themselves are never tier members.

use crate::graph::IsAGraph;
use crate::types::ConceptId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

// =============================================================================
// ANCHOR CONCEPTS
// =============================================================================

/// Root of the containered-trade-pack tier.
pub const CONTAINERED_TRADE_PACK_ROOT: ConceptId = ConceptId(30_537_011_000_036_101);
/// Root of the trade-pack tier.
pub const TRADE_PACK_ROOT: ConceptId = ConceptId(30_404_011_000_036_106);
/// Root of the medicinal-pack tier.
pub const MEDICINAL_PACK_ROOT: ConceptId = ConceptId(30_513_011_000_036_104);
/// Root of the trade-unit tier.
pub const TRADE_UNIT_ROOT: ConceptId = ConceptId(30_425_011_000_036_101);
/// Root of the medicinal-unit tier.
pub const MEDICINAL_UNIT_ROOT: ConceptId = ConceptId(30_450_011_000_036_109);
/// Root of the medicinal-product tier.
pub const MEDICINAL_PRODUCT_ROOT: ConceptId = ConceptId(30_497_011_000_036_103);
/// Root of the substance tier.
pub const SUBSTANCE_ROOT: ConceptId = ConceptId(30_344_011_000_036_106);
/// Root of the trade-product (brand) hierarchy. Not a tier of its own;
/// used for brand resolution and brand-chain pruning.
pub const TRADE_PRODUCT_ROOT: ConceptId = ConceptId(30_560_011_000_036_108);

/// All synthetic anchor ids, excluded from every tier.
pub const ANCHORS: [ConceptId; 8] = [
    CONTAINERED_TRADE_PACK_ROOT,
    TRADE_PACK_ROOT,
    MEDICINAL_PACK_ROOT,
    TRADE_UNIT_ROOT,
    MEDICINAL_UNIT_ROOT,
    MEDICINAL_PRODUCT_ROOT,
    SUBSTANCE_ROOT,
    TRADE_PRODUCT_ROOT,
];

/// Whether an id is one of the fixed anchor concepts.
#[must_use]
pub fn is_anchor(id: ConceptId) -> bool {
    ANCHORS.contains(&id)
}

// =============================================================================
// TIERS
// =============================================================================

/// The seven mutually exclusive product tiers, most specific first
/// within each family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProductTier {
    ContaineredTradePack,
    TradePack,
    MedicinalPack,
    TradeUnit,
    MedicinalUnit,
    MedicinalProduct,
    Substance,
}

impl ProductTier {
    /// All tiers, in classification precedence order.
    pub const ALL: [Self; 7] = [
        Self::ContaineredTradePack,
        Self::TradePack,
        Self::MedicinalPack,
        Self::TradeUnit,
        Self::MedicinalUnit,
        Self::MedicinalProduct,
        Self::Substance,
    ];

    /// The fixed anchor concept rooting this tier.
    #[must_use]
    pub fn anchor(self) -> ConceptId {
        match self {
            Self::ContaineredTradePack => CONTAINERED_TRADE_PACK_ROOT,
            Self::TradePack => TRADE_PACK_ROOT,
            Self::MedicinalPack => MEDICINAL_PACK_ROOT,
            Self::TradeUnit => TRADE_UNIT_ROOT,
            Self::MedicinalUnit => MEDICINAL_UNIT_ROOT,
            Self::MedicinalProduct => MEDICINAL_PRODUCT_ROOT,
            Self::Substance => SUBSTANCE_ROOT,
        }
    }

    /// Whether this tier holds packages (as opposed to unit products or
    /// substances).
    #[must_use]
    pub fn is_package(self) -> bool {
        matches!(
            self,
            Self::ContaineredTradePack | Self::TradePack | Self::MedicinalPack
        )
    }

    /// Whether this tier holds unit-of-use products or abstract products.
    #[must_use]
    pub fn is_product(self) -> bool {
        matches!(
            self,
            Self::TradeUnit | Self::MedicinalUnit | Self::MedicinalProduct
        )
    }

    /// Whether members of this tier carry a brand.
    #[must_use]
    pub fn is_branded(self) -> bool {
        matches!(
            self,
            Self::ContaineredTradePack | Self::TradePack | Self::TradeUnit
        )
    }
}

/// The classification result: seven id sets, disjoint within each
/// anchor family, covering every classifiable concept. A concept
/// reachable from anchors of both families (which real releases do not
/// state) appears in one tier per family; `tier_of` reports the most
/// specific one.
#[derive(Debug, Clone, Default)]
pub struct TierIndex {
    members: BTreeMap<ProductTier, BTreeSet<ConceptId>>,
    by_concept: BTreeMap<ConceptId, ProductTier>,
}

impl TierIndex {
    /// The members of one tier.
    #[must_use]
    pub fn members(&self, tier: ProductTier) -> &BTreeSet<ConceptId> {
        static EMPTY: BTreeSet<ConceptId> = BTreeSet::new();
        self.members.get(&tier).unwrap_or(&EMPTY)
    }

    /// The tier a concept was classified into, if any.
    #[must_use]
    pub fn tier_of(&self, id: ConceptId) -> Option<ProductTier> {
        self.by_concept.get(&id).copied()
    }

    /// Total number of classified concepts.
    #[must_use]
    pub fn classified_count(&self) -> usize {
        self.by_concept.len()
    }
}

/// Classify every concept reachable from a tier anchor.
///
/// Must be called on a closed graph; tier membership is "has a closed
/// IS-A edge into the anchor", with the exclusion precedence
/// containered-trade-pack → trade-pack → medicinal-pack for packs and
/// trade-unit → medicinal-unit → medicinal-product for units. Substances
/// need no exclusion.
#[must_use]
pub fn classify(graph: &IsAGraph) -> TierIndex {
    let raw: BTreeMap<ProductTier, BTreeSet<ConceptId>> = ProductTier::ALL
        .iter()
        .map(|&tier| {
            let mut matches = graph.descendants(tier.anchor());
            matches.retain(|&id| !is_anchor(id));
            (tier, matches)
        })
        .collect();

    let mut index = TierIndex::default();
    let mut taken: BTreeSet<ConceptId> = BTreeSet::new();
    for &tier in &ProductTier::ALL {
        let mut members = raw.get(&tier).cloned().unwrap_or_default();
        // Exclusion only applies within a family; the precedence order
        // restarts at the trade-unit tier, and substances are disjoint.
        if matches!(tier, ProductTier::TradeUnit | ProductTier::Substance) {
            taken.clear();
        }
        members.retain(|id| !taken.contains(id));
        taken.extend(members.iter().copied());

        for &id in &members {
            index.by_concept.entry(id).or_insert(tier);
        }
        debug!(tier = ?tier, members = members.len(), "tier classified");
        index.members.insert(tier, members);
    }
    index
}

// =============================================================================
// TESTS
// =============================================================================
