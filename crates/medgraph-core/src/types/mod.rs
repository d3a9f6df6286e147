//! # Core Type Definitions
//!
//! This module contains all core types for the Medgraph concept-graph engine:
//! - Terminology identifiers (`ConceptId`, `RelationshipId`, `DescriptionId`, `ModuleId`)
//! - Effective dates (`EffectiveDate`)
//! - Concept model (`Concept`, `Relationship`, `DataTypeProperty`, `RoleGroupKey`)
//! - Secondary-dataset values (`Subsidy`, `Manufacturer`)
//! - Closed code tables (`AttributeType`, `PropertyType`, `AssociationKind`)
//! - Error types (`MedgraphError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer identifiers only (prices stay as source-text strings)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Are created once during load and read-only afterwards

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// =============================================================================
// TERMINOLOGY IDENTIFIERS
// =============================================================================

/// Unique identifier of a concept in the terminology release.
/// Concept ids are globally unique across the whole release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConceptId(pub u64);

/// Unique identifier of a relationship row.
/// Used only to attach datatype-property rows to their owning relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipId(pub u64);

/// Unique identifier of a description row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DescriptionId(pub u64);

/// Namespace partition of the terminology. Only rows in the
/// terminology's own module are processed; all others are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u64);

/// The module id of the drug terminology itself.
pub const TERMINOLOGY_MODULE: ModuleId = ModuleId(900_062_011_000_036_108);

/// The "each" unit concept, used for the implicit quantity of one that
/// component-pack containment edges carry.
pub const UNIT_EACH: ConceptId = ConceptId(700_000_801_000_036_102);

// =============================================================================
// EFFECTIVE DATES
// =============================================================================

/// The date a terminology fact became authoritative, as `YYYYMMDD`.
///
/// Later facts supersede earlier ones for the same key, so plain integer
/// ordering is the supersession order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct EffectiveDate(pub u32);

impl EffectiveDate {
    /// Parse a `YYYYMMDD` date field.
    ///
    /// A malformed effective-date value is a fatal data-integrity error,
    /// never a skippable row.
    pub fn parse(raw: &str) -> Result<Self, MedgraphError> {
        if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MedgraphError::MalformedDate(raw.to_string()));
        }
        let value: u32 = raw
            .parse()
            .map_err(|_| MedgraphError::MalformedDate(raw.to_string()))?;
        let month = (value / 100) % 100;
        let day = value % 100;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(MedgraphError::MalformedDate(raw.to_string()));
        }
        Ok(Self(value))
    }
}

// =============================================================================
// CLOSED CODE TABLES
// =============================================================================

/// The fixed set of non-taxonomic attribute types the engine understands,
/// plus IS-A. Unrecognized codes cause the row to be skipped, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    /// Taxonomic subsumption. Lives only in the parent map and the graph.
    IsA,
    /// Links a unit-of-use product to its active ingredient substance.
    HasIntendedActiveIngredient,
    /// Links a unit-of-use product to its basis-of-strength substance.
    HasBasisOfStrength,
    /// Links a unit-of-use product to its manufactured dose form.
    HasManufacturedDoseForm,
    /// Links a package to a contained sub-package.
    HasSubpack,
    /// Links a package to a contained component pack.
    HasComponentPack,
    /// Links a package to a contained unit-of-use product.
    HasUnitOfUse,
}

impl AttributeType {
    /// Map a stated attribute-type code to its variant.
    ///
    /// Returns `None` for codes outside the known set; the caller skips
    /// the owning row.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            116_680_003 => Some(Self::IsA),
            700_000_081_000_036_101 => Some(Self::HasIntendedActiveIngredient),
            700_000_071_000_036_103 => Some(Self::HasBasisOfStrength),
            700_000_091_000_036_104 => Some(Self::HasManufacturedDoseForm),
            999_000_011_000_036_105 => Some(Self::HasSubpack),
            999_000_081_000_036_102 => Some(Self::HasComponentPack),
            700_000_171_000_036_105 => Some(Self::HasUnitOfUse),
            _ => None,
        }
    }

    /// Whether this attribute states containment of one pack/product
    /// inside another.
    #[must_use]
    pub fn is_containment(self) -> bool {
        matches!(
            self,
            Self::HasSubpack | Self::HasComponentPack | Self::HasUnitOfUse
        )
    }
}

/// The quantity a datatype property attaches to its owning relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    /// Strength numerator of an ingredient group.
    StrengthNumerator,
    /// Strength denominator of an ingredient group.
    StrengthDenominator,
    /// Number of units of use inside a package.
    PackSize,
    /// Number of sub-packages inside a package.
    SubpackQuantity,
}

impl PropertyType {
    /// Map a stated property-attribute code to its variant.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            700_000_111_000_036_105 => Some(Self::StrengthNumerator),
            700_000_141_000_036_106 => Some(Self::StrengthDenominator),
            700_000_131_000_036_101 => Some(Self::PackSize),
            700_000_121_000_036_103 => Some(Self::SubpackQuantity),
            _ => None,
        }
    }
}

/// Historical-association kinds linking retired concepts to their
/// replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// The referenced concept was replaced by the target.
    ReplacedBy,
    /// The referenced concept is the same as the target.
    SameAs,
    /// The referenced concept is possibly equivalent to the target.
    PossiblyEquivalentTo,
}

impl AssociationKind {
    /// Map a stated association-type code to its variant.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            900_000_000_000_526_001 => Some(Self::ReplacedBy),
            900_000_000_000_527_005 => Some(Self::SameAs),
            900_000_000_000_523_009 => Some(Self::PossiblyEquivalentTo),
            _ => None,
        }
    }
}

// =============================================================================
// RELATIONSHIPS & PROPERTIES
// =============================================================================

/// A numeric-string quantity attached to a relationship: the value, the
/// unit concept it is expressed in, and the attribute it quantifies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataTypeProperty {
    /// Numeric value as stated in the source (never parsed to float).
    pub value: String,
    /// The unit concept, by reference.
    pub unit: ConceptId,
    /// The attribute this property quantifies.
    pub property: PropertyType,
}

/// A stated non-taxonomic relationship between two concepts.
///
/// Relationships are immutable once constructed; only the optional
/// datatype property is set afterwards, exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// The owning (source) concept.
    pub source: ConceptId,
    /// The destination concept.
    pub destination: ConceptId,
    /// The stated attribute type.
    pub attribute: AttributeType,
    /// Whether the row was active in the accepted snapshot.
    pub active: bool,
    /// The date the accepted snapshot was stated.
    pub effective_date: EffectiveDate,
    /// Optional quantity attached to this relationship.
    pub property: Option<DataTypeProperty>,
}

impl Relationship {
    /// Create a new relationship with no property attached.
    #[must_use]
    pub fn new(
        source: ConceptId,
        destination: ConceptId,
        attribute: AttributeType,
        active: bool,
        effective_date: EffectiveDate,
    ) -> Self {
        Self {
            source,
            destination,
            attribute,
            active,
            effective_date,
            property: None,
        }
    }

    /// Attach the datatype property. Single assignment: a second call is
    /// ignored and reported to the caller.
    pub fn set_property(&mut self, property: DataTypeProperty) -> bool {
        if self.property.is_some() {
            return false;
        }
        self.property = Some(property);
        true
    }
}

/// Key of a relationship group inside a concept.
///
/// The source's "ungrouped" sentinel (group id 0) is never reused
/// verbatim: distinct ungrouped singleton attributes would collide into
/// one group. It is rewritten to an explicit (attribute, destination)
/// pair, which cannot collide across attribute types by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoleGroupKey {
    /// A stated, non-zero relationship group id.
    Grouped(u32),
    /// Synthetic key for an ungrouped singleton attribute.
    Synthetic {
        attribute: AttributeType,
        destination: ConceptId,
    },
}

/// A historical-replacement triple on a retired concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistoricalAssociation {
    /// The association kind.
    pub kind: AssociationKind,
    /// The other concept in the association.
    pub other: ConceptId,
    /// The date the association was stated.
    pub date: EffectiveDate,
}

// =============================================================================
// SECONDARY-DATASET VALUES
// =============================================================================

/// A subsidy entry from the secondary pricing/subsidy extract.
///
/// Identity is value-based on (program, prices, restriction) so that
/// repeated attachment during descendant propagation is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subsidy {
    /// Scheme-specific item code.
    pub item_code: String,
    /// The subsidy program this entry belongs to.
    pub program: ProgramCode,
    /// Maximum price payable, as source text.
    pub max_price: String,
    /// Claimed/manufacturer price, as source text.
    pub claimed_price: String,
    /// Prescribing restriction level.
    pub restriction: RestrictionFlag,
    /// Free-text prescriber notes.
    pub notes: Vec<String>,
    /// Free-text cautions.
    pub cautions: Vec<String>,
    /// (ATC code, display) pairs.
    pub atc_codes: BTreeSet<(String, String)>,
}

impl Subsidy {
    fn identity(&self) -> (ProgramCode, &str, &str, RestrictionFlag) {
        (
            self.program,
            self.max_price.as_str(),
            self.claimed_price.as_str(),
            self.restriction,
        )
    }
}

impl PartialEq for Subsidy {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Subsidy {}

impl PartialOrd for Subsidy {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Subsidy {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.identity().cmp(&other.identity())
    }
}

/// The closed set of subsidy programs. The code table is exhaustive by
/// design; an unmapped code is a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProgramCode {
    GeneralBenefits,
    PalliativeCare,
    DoctorsBag,
    HighlySpecialised,
    RepatriationBenefits,
}

impl ProgramCode {
    /// Resolve a scheme program code.
    pub fn from_code(code: &str) -> Result<Self, MedgraphError> {
        match code {
            "GE" => Ok(Self::GeneralBenefits),
            "PL" => Ok(Self::PalliativeCare),
            "DB" => Ok(Self::DoctorsBag),
            "HS" => Ok(Self::HighlySpecialised),
            "RB" => Ok(Self::RepatriationBenefits),
            _ => Err(MedgraphError::UnmappedCode {
                table: "program",
                code: code.to_string(),
            }),
        }
    }

    /// Human-readable display text for the program.
    #[must_use]
    pub fn display(self) -> &'static str {
        match self {
            Self::GeneralBenefits => "General benefits",
            Self::PalliativeCare => "Palliative care",
            Self::DoctorsBag => "Prescriber bag",
            Self::HighlySpecialised => "Highly specialised drugs",
            Self::RepatriationBenefits => "Repatriation benefits",
        }
    }
}

/// The closed set of prescribing restriction levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RestrictionFlag {
    Unrestricted,
    Restricted,
    Authority,
    AuthorityStreamlined,
}

impl RestrictionFlag {
    /// Resolve a scheme restriction code.
    pub fn from_code(code: &str) -> Result<Self, MedgraphError> {
        match code {
            "U" => Ok(Self::Unrestricted),
            "R" => Ok(Self::Restricted),
            "A" => Ok(Self::Authority),
            "S" => Ok(Self::AuthorityStreamlined),
            _ => Err(MedgraphError::UnmappedCode {
                table: "restriction",
                code: code.to_string(),
            }),
        }
    }

    /// Human-readable display text for the restriction level.
    #[must_use]
    pub fn display(self) -> &'static str {
        match self {
            Self::Unrestricted => "Unrestricted",
            Self::Restricted => "Restricted benefit",
            Self::Authority => "Authority required",
            Self::AuthorityStreamlined => "Authority required (streamlined)",
        }
    }
}

/// A manufacturer from the secondary dataset. Value-equal by code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manufacturer {
    /// Scheme manufacturer code, the key.
    pub code: String,
    /// Registered name.
    pub name: String,
    /// Postal address.
    pub address: String,
    /// Contact phone number.
    pub phone: String,
    /// Optional fax number.
    pub fax: Option<String>,
}

impl PartialEq for Manufacturer {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Manufacturer {}

impl PartialOrd for Manufacturer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Manufacturer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.code.cmp(&other.code)
    }
}

// =============================================================================
// CONCEPT
// =============================================================================

/// A concept in the terminology release.
///
/// Relationships, parents, ancestors, manufacturer, and subsidies all
/// reference other concepts by numeric id, never by owning reference;
/// the [`crate::store::ConceptStore`] arena is the single owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// Globally unique concept id.
    pub id: ConceptId,
    /// Whether the concept is active in the release.
    pub active: bool,
    /// Full specified name, from the description rows.
    pub full_name: String,
    /// Preferred term, from the language-preference rows.
    pub preferred_term: String,
    /// Max effective date of any contributing fact.
    pub last_modified: EffectiveDate,
    /// Non-taxonomic relationships, grouped by role-group key.
    pub role_groups: BTreeMap<RoleGroupKey, Vec<Relationship>>,
    /// Direct IS-A parents.
    pub parents: BTreeSet<ConceptId>,
    /// All transitive ancestors. Populated once, after closure,
    /// and never recomputed.
    pub ancestors: BTreeSet<ConceptId>,
    /// Manufacturer code, at most one for the lifetime of a run.
    pub manufacturer: Option<String>,
    /// Subsidies attached by fusion. Set semantics make repeated
    /// attachment idempotent.
    pub subsidies: BTreeSet<Subsidy>,
    /// Therapeutic-goods registration identifiers.
    pub artg_ids: BTreeSet<String>,
    /// Historical "replaces" associations (this concept replaces others).
    pub replaces: Vec<HistoricalAssociation>,
    /// Historical "replaced by" associations (this concept was retired).
    pub replaced_by: Vec<HistoricalAssociation>,
}

impl Concept {
    /// Create a concept as stated by its concept row.
    #[must_use]
    pub fn new(id: ConceptId, active: bool, effective_date: EffectiveDate) -> Self {
        Self {
            id,
            active,
            full_name: String::new(),
            preferred_term: String::new(),
            last_modified: effective_date,
            role_groups: BTreeMap::new(),
            parents: BTreeSet::new(),
            ancestors: BTreeSet::new(),
            manufacturer: None,
            subsidies: BTreeSet::new(),
            artg_ids: BTreeSet::new(),
            replaces: Vec::new(),
            replaced_by: Vec::new(),
        }
    }

    /// Advance `last_modified` if the given date is later.
    pub fn touch(&mut self, date: EffectiveDate) {
        if date > self.last_modified {
            self.last_modified = date;
        }
    }

    /// Add an accepted non-taxonomic relationship under its group key.
    pub fn add_relationship(&mut self, key: RoleGroupKey, relationship: Relationship) {
        self.role_groups.entry(key).or_default().push(relationship);
    }

    /// Assign a manufacturer, enforcing the one-owner invariant.
    ///
    /// Re-assigning the same code is a no-op; a different code is a
    /// fatal data-integrity error.
    pub fn assign_manufacturer(&mut self, code: &str) -> Result<(), MedgraphError> {
        match &self.manufacturer {
            Some(existing) if existing == code => Ok(()),
            Some(existing) => Err(MedgraphError::ManufacturerConflict {
                concept: self.id,
                existing: existing.clone(),
                incoming: code.to_string(),
            }),
            None => {
                self.manufacturer = Some(code.to_string());
                Ok(())
            }
        }
    }

    /// Attach a subsidy. Idempotent under the subsidy identity key.
    pub fn attach_subsidy(&mut self, subsidy: Subsidy) {
        self.subsidies.insert(subsidy);
    }

    /// The display name of the concept: the preferred term when one was
    /// resolved, otherwise the full specified name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.preferred_term.is_empty() {
            &self.full_name
        } else {
            &self.preferred_term
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the Medgraph engine.
///
/// Every variant here is fatal: the batch pipeline has no partial-success
/// mode, so a run either yields a complete, internally consistent record
/// set or fails and produces nothing. Skippable conditions (out-of-module
/// rows, unrecognized attribute codes, subsidy rows referencing concepts
/// outside the loaded slice) are logged and dropped without error.
#[derive(Debug, Error)]
pub enum MedgraphError {
    /// An effective-date field could not be parsed as `YYYYMMDD`.
    #[error("malformed effective date: {0:?}")]
    MalformedDate(String),

    /// A required concept reference was absent from the store.
    #[error("concept not found: {0:?}")]
    ConceptNotFound(ConceptId),

    /// A second, different manufacturer was assigned to one concept.
    #[error("manufacturer conflict on {concept:?}: {existing:?} vs {incoming:?}")]
    ManufacturerConflict {
        concept: ConceptId,
        existing: String,
        incoming: String,
    },

    /// More than one trade-product ancestor qualified as the brand.
    #[error("ambiguous brand for {concept:?}: {candidates:?}")]
    AmbiguousBrand {
        concept: ConceptId,
        candidates: Vec<ConceptId>,
    },

    /// Containment repair found no brand-specific target.
    #[error("no brand-specific containment target for {pack:?} -> {destination:?}")]
    MissingContainmentTarget {
        pack: ConceptId,
        destination: ConceptId,
    },

    /// Containment repair found more than one brand-specific target.
    #[error("ambiguous containment target for {pack:?} -> {destination:?}: {candidates:?}")]
    AmbiguousContainmentTarget {
        pack: ConceptId,
        destination: ConceptId,
        candidates: Vec<ConceptId>,
    },

    /// A secondary-dataset code was absent from its closed code table.
    #[error("unmapped {table} code: {code:?}")]
    UnmappedCode { table: &'static str, code: String },

    /// An I/O error in a mechanical collaborator (file readers).
    #[error("I/O error: {0}")]
    Io(String),

    /// A delimited row a mechanical collaborator could not parse.
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_date_parses_and_orders() {
        let early = EffectiveDate::parse("20190630").expect("parse");
        let late = EffectiveDate::parse("20200101").expect("parse");
        assert!(early < late);
    }

    #[test]
    fn effective_date_rejects_malformed() {
        for raw in ["", "2020", "20201301", "20200132", "2020-101", "yyyymmdd"] {
            assert!(
                matches!(EffectiveDate::parse(raw), Err(MedgraphError::MalformedDate(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn attribute_type_round_trips_known_codes() {
        assert_eq!(AttributeType::from_code(116_680_003), Some(AttributeType::IsA));
        assert_eq!(AttributeType::from_code(42), None);
    }

    #[test]
    fn relationship_property_is_single_assignment() {
        let mut rel = Relationship::new(
            ConceptId(1),
            ConceptId(2),
            AttributeType::HasUnitOfUse,
            true,
            EffectiveDate(20_200_101),
        );
        let first = DataTypeProperty {
            value: "30".to_string(),
            unit: ConceptId(700),
            property: PropertyType::PackSize,
        };
        let second = DataTypeProperty {
            value: "60".to_string(),
            unit: ConceptId(700),
            property: PropertyType::PackSize,
        };
        assert!(rel.set_property(first.clone()));
        assert!(!rel.set_property(second));
        assert_eq!(rel.property, Some(first));
    }

    #[test]
    fn subsidy_identity_ignores_notes_and_codes() {
        let a = Subsidy {
            item_code: "1234K".to_string(),
            program: ProgramCode::GeneralBenefits,
            max_price: "17.99".to_string(),
            claimed_price: "12.50".to_string(),
            restriction: RestrictionFlag::Unrestricted,
            notes: vec!["note".to_string()],
            cautions: Vec::new(),
            atc_codes: BTreeSet::new(),
        };
        let mut b = a.clone();
        b.notes.clear();
        b.item_code = "9999X".to_string();
        assert_eq!(a, b);

        let mut set = BTreeSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn manufacturer_one_owner() {
        let mut concept = Concept::new(ConceptId(10), true, EffectiveDate(20_200_101));
        concept.assign_manufacturer("AB").expect("first assignment");
        concept.assign_manufacturer("AB").expect("same code is a no-op");
        let err = concept.assign_manufacturer("CD");
        assert!(matches!(
            err,
            Err(MedgraphError::ManufacturerConflict { .. })
        ));
    }

    #[test]
    fn touch_only_advances() {
        let mut concept = Concept::new(ConceptId(1), true, EffectiveDate(20_200_101));
        concept.touch(EffectiveDate(20_190_101));
        assert_eq!(concept.last_modified, EffectiveDate(20_200_101));
        concept.touch(EffectiveDate(20_210_101));
        assert_eq!(concept.last_modified, EffectiveDate(20_210_101));
    }

    #[test]
    fn unmapped_program_code_is_fatal() {
        assert!(matches!(
            ProgramCode::from_code("ZZ"),
            Err(MedgraphError::UnmappedCode { table: "program", .. })
        ));
        assert_eq!(
            ProgramCode::from_code("GE").expect("known code"),
            ProgramCode::GeneralBenefits
        );
    }
}
