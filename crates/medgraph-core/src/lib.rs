//! # medgraph-core
//!
//! The deterministic terminology engine for Medgraph - THE LOGIC.
//!
//! This crate turns a snapshot drug-terminology release plus a subsidy
//! schedule into a fully assembled record set: concepts are loaded with
//! temporal reconciliation, the IS-A graph is transitively closed,
//! concepts are partitioned into seven product tiers, subsidy and
//! manufacturer facts are fused onto the graph, and packages are
//! recursively expanded into output records with containment repair.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is pure computation: no I/O, no file formats (the application crate
//!   owns row parsing and hands in `ReleaseSource`/`ScheduleSource`)
//! - Is deterministic: `BTreeMap`/`BTreeSet` throughout, identical
//!   output for identical input
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod assembly;
pub mod fusion;
pub mod graph;
pub mod hierarchy;
pub mod loader;
pub mod pipeline;
pub mod rows;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AssociationKind, AttributeType, Concept, ConceptId, DataTypeProperty, DescriptionId,
    EffectiveDate, HistoricalAssociation, Manufacturer, MedgraphError, ModuleId, ProgramCode,
    PropertyType, Relationship, RelationshipId, RestrictionFlag, RoleGroupKey, Subsidy,
    TERMINOLOGY_MODULE, UNIT_EACH,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use assembly::{
    AssembledRelease, BackstitchOutcome, ContentEntry, ContentRef, IngredientEntry, NamedRef,
    OrganizationRecord, PackageRecord, ProductRecord, Quantity, Ratio, SubstanceRecord, assemble,
    backstitch,
};
pub use fusion::{ManufacturerTable, fuse};
pub use graph::IsAGraph;
pub use hierarchy::{ANCHORS, ProductTier, TierIndex, classify, is_anchor};
pub use loader::{LoadedRelease, load};
pub use pipeline::run;
pub use rows::{ReleaseSource, ScheduleSource};
pub use store::ConceptStore;
