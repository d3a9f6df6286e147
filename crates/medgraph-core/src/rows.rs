//! # Input Rows
//!
//! Typed rows at the boundary between the engine and its mechanical
//! collaborators (delimited-file readers, ZIP traversal, and the like).
//!
//! The engine consumes these rows as plain data; splitting delimited
//! lines into fields and locating files is the collaborators' job.
//! Every snapshot row carries a module id, an active flag, and an
//! effective date; rows outside the terminology's own module are
//! dropped silently during load.

use crate::types::{ConceptId, DescriptionId, EffectiveDate, ModuleId, RelationshipId};

// =============================================================================
// SNAPSHOT ROWS
// =============================================================================

/// A concept row: creates a vertex and a `Concept` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRow {
    pub id: ConceptId,
    pub effective_date: EffectiveDate,
    pub active: bool,
    pub module: ModuleId,
}

/// A relationship row. IS-A rows become graph edges; other recognized
/// attribute types go into the owning concept's role-group map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRow {
    pub id: RelationshipId,
    pub effective_date: EffectiveDate,
    pub active: bool,
    pub module: ModuleId,
    pub source: ConceptId,
    pub destination: ConceptId,
    /// Stated relationship group; 0 is the "ungrouped" sentinel.
    pub group: u32,
    /// Stated attribute-type code; unrecognized codes skip the row.
    pub attribute_code: u64,
}

/// Description-kind code for full specified names.
pub const DESCRIPTION_FULL_NAME: u64 = 900_000_000_000_003_001;
/// Description-kind code for synonyms.
pub const DESCRIPTION_SYNONYM: u64 = 900_000_000_000_013_009;
/// Acceptability code marking a description as preferred.
pub const ACCEPTABILITY_PREFERRED: u64 = 900_000_000_000_548_007;

/// A description row: resolves a concept's names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRow {
    pub id: DescriptionId,
    pub effective_date: EffectiveDate,
    pub active: bool,
    pub module: ModuleId,
    pub concept: ConceptId,
    /// `DESCRIPTION_FULL_NAME` or `DESCRIPTION_SYNONYM`.
    pub kind_code: u64,
    pub term: String,
}

/// A language-preference row: marks one description as the preferred
/// term for its concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRow {
    pub effective_date: EffectiveDate,
    pub active: bool,
    pub module: ModuleId,
    pub description: DescriptionId,
    /// `ACCEPTABILITY_PREFERRED` selects the preferred term.
    pub acceptability_code: u64,
}

/// A datatype-property row: attaches a quantity to a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatatypePropertyRow {
    pub effective_date: EffectiveDate,
    pub active: bool,
    pub module: ModuleId,
    pub relationship: RelationshipId,
    pub unit: ConceptId,
    /// Stated property-attribute code; unrecognized codes skip the row.
    pub attribute_code: u64,
    pub value: String,
}

/// An identifier-mapping row: attaches a registration identifier
/// (ARTG id) to a concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRow {
    pub effective_date: EffectiveDate,
    pub active: bool,
    pub module: ModuleId,
    pub concept: ConceptId,
    pub identifier: String,
}

/// An association row: historical replaces/replaced-by linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationRow {
    pub effective_date: EffectiveDate,
    pub active: bool,
    pub module: ModuleId,
    /// The (usually retired) concept the association is stated on.
    pub concept: ConceptId,
    /// The replacement/equivalent concept.
    pub target: ConceptId,
    /// Stated association-type code; unrecognized codes skip the row.
    pub association_code: u64,
}

/// The full set of snapshot rows for one release, as supplied by the
/// file-locating/parsing collaborator.
#[derive(Debug, Clone, Default)]
pub struct ReleaseSource {
    pub concepts: Vec<ConceptRow>,
    pub relationships: Vec<RelationshipRow>,
    pub descriptions: Vec<DescriptionRow>,
    pub language: Vec<LanguageRow>,
    pub properties: Vec<DatatypePropertyRow>,
    pub identifiers: Vec<IdentifierRow>,
    pub associations: Vec<AssociationRow>,
}

// =============================================================================
// SCHEDULE ROWS (secondary dataset)
// =============================================================================

/// A subsidy row from the pricing/subsidy extract, keyed by the scheme's
/// own item code and cross-referencing the terminology by concept id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsidyRow {
    pub item_code: String,
    pub program_code: String,
    pub restriction_code: String,
    pub max_price: String,
    pub claimed_price: String,
    /// The specific (branded) pack concept.
    pub specific_pack: ConceptId,
    /// The generic pack concept, when stated.
    pub generic_pack: Option<ConceptId>,
    /// Manufacturer code into the schedule's manufacturer table.
    pub manufacturer_code: Option<String>,
    pub notes: Vec<String>,
    pub cautions: Vec<String>,
    /// (ATC code, display) pairs.
    pub atc_codes: Vec<(String, String)>,
}

/// A manufacturer-table row from the pricing/subsidy extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerRow {
    pub code: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub fax: Option<String>,
}

/// The full secondary dataset for one release.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSource {
    pub manufacturers: Vec<ManufacturerRow>,
    pub subsidies: Vec<SubsidyRow>,
}
