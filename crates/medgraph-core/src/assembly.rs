//! # Resource Assembly Engine
//!
//! Walks the containered-trade-pack tier top-down and recursively
//! expands each pack into a tree of output records: package → contained
//! items (sub-packages or unit-of-use products) → ingredients →
//! substances, plus a generalization chain linking each record to its
//! less-specific ancestors.
//!
//! A concept-id memo set guards every recursive constructor, so each
//! concept produces at most one record no matter how many packages
//! reference it — the same product or substance is typically shared by
//! thousands of packages, and the memo turns the traversal from
//! exponential to linear in graph size.
//!
//! ## Containment repair ("backstitch")
//!
//! The source data only states sub-pack/component-pack containment at
//! the generic (medicinal-pack) tier; more specific tiers inherit it
//! through the closure, which loses brand specificity. The backstitch
//! re-derives the brand-specific target from the trade pack's
//! containered descendants; zero or more than one qualifying concept is
//! a fatal assembly error.

use crate::fusion::ManufacturerTable;
use crate::graph::IsAGraph;
use crate::hierarchy::{ProductTier, TRADE_PRODUCT_ROOT, TierIndex, is_anchor};
use crate::store::ConceptStore;
use crate::types::{
    AttributeType, ConceptId, HistoricalAssociation, MedgraphError, PropertyType, Subsidy,
    UNIT_EACH,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

// =============================================================================
// OUTPUT RECORDS
// =============================================================================

/// A reference to another concept carrying its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: ConceptId,
    pub name: String,
}

/// A quantity: source-text value plus unit concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: String,
    pub unit: ConceptId,
}

/// An ingredient strength as a numerator/denominator pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Ratio {
    pub numerator: Option<Quantity>,
    pub denominator: Option<Quantity>,
}

/// What a package content entry points at. Closed set: packages contain
/// either sub-packages or unit-of-use products, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentRef {
    Package(ConceptId),
    Product(ConceptId),
}

/// One contained item of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub item: ContentRef,
    pub quantity: Option<Quantity>,
}

/// One ingredient of a unit-of-use product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientEntry {
    /// The intended active ingredient substance.
    pub substance: ConceptId,
    /// The basis-of-strength substance, when distinct from the primary.
    pub basis_of_strength: Option<ConceptId>,
    /// Strength of the ingredient, when stated.
    pub strength: Option<Ratio>,
}

/// An assembled package record. The id is the source concept id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: ConceptId,
    pub name: String,
    pub tier: Option<ProductTier>,
    pub brand: Option<NamedRef>,
    pub manufacturer: Option<String>,
    pub subsidies: Vec<Subsidy>,
    pub artg_ids: Vec<String>,
    /// Replacement history, populated for retired packages.
    pub replaced_by: Vec<HistoricalAssociation>,
    pub contents: Vec<ContentEntry>,
    /// Less-specific package ancestors, each assembled exactly once.
    pub generalizations: Vec<ConceptId>,
}

/// An assembled product record (unit-of-use or abstract product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ConceptId,
    pub name: String,
    pub tier: Option<ProductTier>,
    pub brand: Option<NamedRef>,
    pub form: Option<NamedRef>,
    pub ingredients: Vec<IngredientEntry>,
    /// Less-specific product ancestors, each assembled exactly once.
    pub generalizations: Vec<ConceptId>,
}

/// An assembled substance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstanceRecord {
    pub id: ConceptId,
    pub name: String,
}

/// An assembled organization record, keyed by manufacturer code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub code: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub fax: Option<String>,
}

/// The full assembled output of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledRelease {
    pub packages: BTreeMap<ConceptId, PackageRecord>,
    pub products: BTreeMap<ConceptId, ProductRecord>,
    pub substances: BTreeMap<ConceptId, SubstanceRecord>,
    pub organizations: BTreeMap<String, OrganizationRecord>,
    /// The top-level (containered-trade-pack) package ids, in id order.
    pub roots: Vec<ConceptId>,
}

impl AssembledRelease {
    /// Total number of emitted records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.packages.len() + self.products.len() + self.substances.len()
            + self.organizations.len()
    }
}

// =============================================================================
// BACKSTITCH
// =============================================================================

/// Outcome of containment repair. Callers must handle all three cases;
/// there is no unchecked throw hiding the empty/ambiguous conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackstitchOutcome {
    /// Exactly one brand-specific target qualified.
    Unique(ConceptId),
    /// No qualifying target.
    Missing,
    /// More than one qualifying target.
    Ambiguous(Vec<ConceptId>),
}

/// Re-derive the brand-specific target of a containment relationship
/// whose stated destination is generic.
///
/// For every containered-trade-pack descendant of `package`, find its
/// own stated relationship of the same attribute type; from each such
/// target's direct parents, collect those that are descendants of the
/// original `destination`. The whole descendant set must yield exactly
/// one qualifying concept.
pub fn backstitch(
    store: &ConceptStore,
    graph: &IsAGraph,
    tiers: &TierIndex,
    package: ConceptId,
    attribute: AttributeType,
    destination: ConceptId,
) -> Result<BackstitchOutcome, MedgraphError> {
    let mut qualifying: BTreeSet<ConceptId> = BTreeSet::new();

    for candidate in graph.descendants(package) {
        if tiers.tier_of(candidate) != Some(ProductTier::ContaineredTradePack) {
            continue;
        }
        let concept = store.require(candidate)?;
        for relationship in concept.role_groups.values().flatten() {
            if relationship.attribute != attribute {
                continue;
            }
            let target = store.require(relationship.destination)?;
            for &parent in &target.parents {
                if graph.has_edge(parent, destination) {
                    qualifying.insert(parent);
                }
            }
        }
    }

    Ok(match qualifying.len() {
        0 => BackstitchOutcome::Missing,
        1 => match qualifying.into_iter().next() {
            Some(found) => BackstitchOutcome::Unique(found),
            None => BackstitchOutcome::Missing,
        },
        _ => BackstitchOutcome::Ambiguous(qualifying.into_iter().collect()),
    })
}

// =============================================================================
// ASSEMBLER
// =============================================================================

/// Assemble the full record set from the classified, fused graph.
pub fn assemble(
    store: &ConceptStore,
    graph: &IsAGraph,
    tiers: &TierIndex,
    manufacturers: &ManufacturerTable,
) -> Result<AssembledRelease, MedgraphError> {
    let mut assembler = Assembler {
        store,
        graph,
        tiers,
        manufacturers,
        emitted: BTreeSet::new(),
        form_cache: BTreeMap::new(),
        ingredient_cache: BTreeMap::new(),
        out: AssembledRelease::default(),
    };

    let roots: Vec<ConceptId> = tiers
        .members(ProductTier::ContaineredTradePack)
        .iter()
        .copied()
        .collect();
    for &root in &roots {
        assembler.package(root)?;
    }
    assembler.out.roots = roots;

    info!(
        packages = assembler.out.packages.len(),
        products = assembler.out.products.len(),
        substances = assembler.out.substances.len(),
        organizations = assembler.out.organizations.len(),
        "release assembled"
    );
    Ok(assembler.out)
}

struct Assembler<'a> {
    store: &'a ConceptStore,
    graph: &'a IsAGraph,
    tiers: &'a TierIndex,
    manufacturers: &'a ManufacturerTable,
    /// Memo set: every concept emits at most one record per run.
    emitted: BTreeSet<ConceptId>,
    /// Dose forms shared by packages with common structure.
    form_cache: BTreeMap<ConceptId, Option<NamedRef>>,
    /// Ingredient sets shared by packages with common structure.
    ingredient_cache: BTreeMap<ConceptId, Vec<IngredientEntry>>,
    out: AssembledRelease,
}

impl Assembler<'_> {
    /// Assemble one package record and everything it references.
    fn package(&mut self, id: ConceptId) -> Result<(), MedgraphError> {
        if !self.emitted.insert(id) {
            return Ok(());
        }
        let concept = self.store.require(id)?;
        let tier = self.tiers.tier_of(id);
        let brand = self.resolve_brand(id)?;

        let mut contents = Vec::new();
        for relationship in concept.role_groups.values().flatten() {
            if !relationship.attribute.is_containment() {
                continue;
            }
            let stated = relationship.destination;
            self.store.require(stated)?;

            let target = self.repair_destination(id, relationship.attribute, stated)?;
            let quantity = match relationship.attribute {
                AttributeType::HasComponentPack => Some(Quantity {
                    value: "1".to_string(),
                    unit: UNIT_EACH,
                }),
                _ => relationship.property.as_ref().map(|property| Quantity {
                    value: property.value.clone(),
                    unit: property.unit,
                }),
            };
            let item = match self.tiers.tier_of(target) {
                Some(target_tier) if target_tier.is_package() => {
                    self.package(target)?;
                    ContentRef::Package(target)
                }
                _ => {
                    self.product(target)?;
                    ContentRef::Product(target)
                }
            };
            contents.push(ContentEntry { item, quantity });
        }

        let generalizations = self.generalization_chain(id, true)?;
        for &ancestor in &generalizations {
            self.package(ancestor)?;
        }

        let manufacturer = concept.manufacturer.clone();
        if let Some(code) = &manufacturer {
            self.organization(code)?;
        }

        self.out.packages.insert(
            id,
            PackageRecord {
                id,
                name: concept.display_name().to_string(),
                tier,
                brand,
                manufacturer,
                subsidies: concept.subsidies.iter().cloned().collect(),
                artg_ids: concept.artg_ids.iter().cloned().collect(),
                replaced_by: if concept.active {
                    Vec::new()
                } else {
                    concept.replaced_by.clone()
                },
                contents,
                generalizations,
            },
        );
        Ok(())
    }

    /// Backstitch when a trade-pack-tier package states containment
    /// against a generic (medicinal-pack-tier) destination.
    fn repair_destination(
        &mut self,
        package: ConceptId,
        attribute: AttributeType,
        destination: ConceptId,
    ) -> Result<ConceptId, MedgraphError> {
        let needs_repair = matches!(
            attribute,
            AttributeType::HasSubpack | AttributeType::HasComponentPack
        ) && self.tiers.tier_of(package) == Some(ProductTier::TradePack)
            && self.tiers.tier_of(destination) == Some(ProductTier::MedicinalPack);
        if !needs_repair {
            return Ok(destination);
        }

        match backstitch(self.store, self.graph, self.tiers, package, attribute, destination)? {
            BackstitchOutcome::Unique(found) => Ok(found),
            BackstitchOutcome::Missing => Err(MedgraphError::MissingContainmentTarget {
                pack: package,
                destination,
            }),
            BackstitchOutcome::Ambiguous(candidates) => {
                Err(MedgraphError::AmbiguousContainmentTarget {
                    pack: package,
                    destination,
                    candidates,
                })
            }
        }
    }

    /// Assemble one product record and its ingredients/substances.
    fn product(&mut self, id: ConceptId) -> Result<(), MedgraphError> {
        if !self.emitted.insert(id) {
            return Ok(());
        }
        let concept = self.store.require(id)?;
        let tier = self.tiers.tier_of(id);
        let brand = self.resolve_brand(id)?;
        let form = self.form(id)?;
        let ingredients = self.ingredients(id)?;

        let generalizations = self.generalization_chain(id, false)?;
        for &ancestor in &generalizations {
            self.product(ancestor)?;
        }

        self.out.products.insert(
            id,
            ProductRecord {
                id,
                name: concept.display_name().to_string(),
                tier,
                brand,
                form,
                ingredients,
                generalizations,
            },
        );
        Ok(())
    }

    /// Assemble one substance record.
    fn substance(&mut self, id: ConceptId) -> Result<(), MedgraphError> {
        if !self.emitted.insert(id) {
            return Ok(());
        }
        let concept = self.store.require(id)?;
        self.out.substances.insert(
            id,
            SubstanceRecord {
                id,
                name: concept.display_name().to_string(),
            },
        );
        Ok(())
    }

    /// Assemble one organization record from the manufacturer table.
    fn organization(&mut self, code: &str) -> Result<(), MedgraphError> {
        if self.out.organizations.contains_key(code) {
            return Ok(());
        }
        let Some(manufacturer) = self.manufacturers.get(code) else {
            return Err(MedgraphError::UnmappedCode {
                table: "manufacturer",
                code: code.to_string(),
            });
        };
        self.out.organizations.insert(
            code.to_string(),
            OrganizationRecord {
                code: manufacturer.code.clone(),
                name: manufacturer.name.clone(),
                address: manufacturer.address.clone(),
                phone: manufacturer.phone.clone(),
                fax: manufacturer.fax.clone(),
            },
        );
        Ok(())
    }

    /// The dose form of a product, cached across packages sharing
    /// structure.
    fn form(&mut self, id: ConceptId) -> Result<Option<NamedRef>, MedgraphError> {
        if let Some(cached) = self.form_cache.get(&id) {
            return Ok(cached.clone());
        }
        let concept = self.store.require(id)?;
        let mut form = None;
        for relationship in concept.role_groups.values().flatten() {
            if relationship.attribute == AttributeType::HasManufacturedDoseForm {
                let form_concept = self.store.require(relationship.destination)?;
                form = Some(NamedRef {
                    id: relationship.destination,
                    name: form_concept.display_name().to_string(),
                });
                break;
            }
        }
        self.form_cache.insert(id, form.clone());
        Ok(form)
    }

    /// The ingredient set of a product, cached across packages sharing
    /// structure. Groups relationships by role group: the intended
    /// active ingredient is the primary substance; a distinct
    /// basis-of-strength substance carries the strength reference.
    fn ingredients(&mut self, id: ConceptId) -> Result<Vec<IngredientEntry>, MedgraphError> {
        if let Some(cached) = self.ingredient_cache.get(&id) {
            return Ok(cached.clone());
        }
        let concept = self.store.require(id)?;
        let mut entries = Vec::new();
        let mut referenced = Vec::new();

        for relationships in concept.role_groups.values() {
            let Some(primary) = relationships
                .iter()
                .find(|r| r.attribute == AttributeType::HasIntendedActiveIngredient)
            else {
                continue;
            };
            let substance = primary.destination;
            referenced.push(substance);

            let mut ratio = Ratio::default();
            for relationship in relationships {
                if let Some(property) = &relationship.property {
                    let quantity = Quantity {
                        value: property.value.clone(),
                        unit: property.unit,
                    };
                    match property.property {
                        PropertyType::StrengthNumerator => ratio.numerator = Some(quantity),
                        PropertyType::StrengthDenominator => ratio.denominator = Some(quantity),
                        PropertyType::PackSize | PropertyType::SubpackQuantity => {}
                    }
                }
            }
            let strength = if ratio.numerator.is_some() || ratio.denominator.is_some() {
                Some(ratio)
            } else {
                None
            };

            // No separate strength reference when the basis of strength
            // is the primary ingredient itself.
            let basis_of_strength = relationships
                .iter()
                .find(|r| r.attribute == AttributeType::HasBasisOfStrength)
                .map(|r| r.destination)
                .filter(|&boss| boss != substance);
            if let Some(boss) = basis_of_strength {
                referenced.push(boss);
            }

            entries.push(IngredientEntry {
                substance,
                basis_of_strength,
                strength,
            });
        }

        for substance in referenced {
            self.substance(substance)?;
        }
        self.ingredient_cache.insert(id, entries.clone());
        Ok(entries)
    }

    /// The generalization chain: ancestors in strictly-less-specific
    /// tiers of the same family. An ancestor in a generic tier that is
    /// nonetheless a descendant of the trade-product anchor is skipped —
    /// the redundant brand-chain case; brand linkage is carried by the
    /// record's own brand field.
    fn generalization_chain(
        &self,
        id: ConceptId,
        packages: bool,
    ) -> Result<Vec<ConceptId>, MedgraphError> {
        let concept = self.store.require(id)?;
        let own_rank = self.tiers.tier_of(id).map_or(-1, specificity_rank);

        let mut chain = Vec::new();
        for &ancestor in &concept.ancestors {
            if is_anchor(ancestor) {
                continue;
            }
            let Some(tier) = self.tiers.tier_of(ancestor) else {
                continue;
            };
            let in_family = if packages {
                tier.is_package()
            } else {
                tier.is_product()
            };
            if !in_family || specificity_rank(tier) <= own_rank {
                continue;
            }
            if !tier.is_branded() && self.graph.has_edge(ancestor, TRADE_PRODUCT_ROOT) {
                continue;
            }
            chain.push(ancestor);
        }
        Ok(chain)
    }

    /// The brand of a concept: the unique ancestor parented directly on
    /// the trade-product root. Branded pack/unit ancestors reach the
    /// root transitively through the brand and must not count as
    /// candidates. More than one brand is fatal.
    fn resolve_brand(&self, id: ConceptId) -> Result<Option<NamedRef>, MedgraphError> {
        let concept = self.store.require(id)?;
        let mut candidates: Vec<ConceptId> = Vec::new();
        for &ancestor in &concept.ancestors {
            if is_anchor(ancestor) {
                continue;
            }
            let Some(candidate) = self.store.get(ancestor) else {
                continue;
            };
            if candidate.parents.contains(&TRADE_PRODUCT_ROOT) {
                candidates.push(ancestor);
            }
        }

        match candidates.as_slice() {
            [] => Ok(None),
            [brand] => {
                let brand_concept = self.store.require(*brand)?;
                Ok(Some(NamedRef {
                    id: *brand,
                    name: brand_concept.display_name().to_string(),
                }))
            }
            _ => Err(MedgraphError::AmbiguousBrand {
                concept: id,
                candidates,
            }),
        }
    }
}

/// Specificity within a tier family: lower is more specific.
fn specificity_rank(tier: ProductTier) -> i8 {
    match tier {
        ProductTier::ContaineredTradePack | ProductTier::TradeUnit => 0,
        ProductTier::TradePack | ProductTier::MedicinalUnit => 1,
        ProductTier::MedicinalPack | ProductTier::MedicinalProduct => 2,
        ProductTier::Substance => 3,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{
        CONTAINERED_TRADE_PACK_ROOT, MEDICINAL_PACK_ROOT, TRADE_PACK_ROOT, classify,
    };
    use crate::types::{Concept, EffectiveDate, Relationship};

    struct Fixture {
        store: ConceptStore,
        graph: IsAGraph,
    }

    impl Fixture {
        fn new() -> Self {
            let mut graph = IsAGraph::new();
            for anchor in crate::hierarchy::ANCHORS {
                graph.add_vertex(anchor);
            }
            Self {
                store: ConceptStore::new(),
                graph,
            }
        }

        fn concept(&mut self, id: u64, parents: &[ConceptId]) {
            let mut concept = Concept::new(ConceptId(id), true, EffectiveDate(20_200_101));
            concept.preferred_term = format!("concept {id}");
            self.graph.add_vertex(ConceptId(id));
            for &parent in parents {
                concept.parents.insert(parent);
                self.graph.add_edge(ConceptId(id), parent);
            }
            self.store.insert(concept);
        }

        fn relate(&mut self, source: u64, destination: u64, attribute: AttributeType) {
            let relationship = Relationship::new(
                ConceptId(source),
                ConceptId(destination),
                attribute,
                true,
                EffectiveDate(20_200_101),
            );
            let key = crate::types::RoleGroupKey::Synthetic {
                attribute,
                destination: ConceptId(destination),
            };
            if let Some(concept) = self.store.get_mut(ConceptId(source)) {
                concept.add_relationship(key, relationship);
            }
        }

        fn finish(mut self) -> (ConceptStore, IsAGraph, TierIndex) {
            self.graph.close();
            self.store.derive_ancestors(&self.graph);
            let tiers = classify(&self.graph);
            (self.store, self.graph, tiers)
        }
    }

    /// Two containered packs under one trade pack, each stating its own
    /// component pack whose parents intersect the generic destination in
    /// exactly one concept.
    #[test]
    fn backstitch_finds_unique_brand_specific_target() {
        let mut fx = Fixture::new();
        // Generic destination 50 and its brand-specific child 51.
        fx.concept(50, &[MEDICINAL_PACK_ROOT]);
        fx.concept(51, &[ConceptId(50), TRADE_PACK_ROOT]);
        // Trade pack 10 with containered descendants 11 and 12.
        fx.concept(10, &[TRADE_PACK_ROOT]);
        fx.concept(11, &[ConceptId(10), CONTAINERED_TRADE_PACK_ROOT]);
        fx.concept(12, &[ConceptId(10), CONTAINERED_TRADE_PACK_ROOT]);
        // Their stated component packs, parented on the qualifying 51.
        fx.concept(21, &[ConceptId(51), CONTAINERED_TRADE_PACK_ROOT]);
        fx.concept(22, &[ConceptId(51), CONTAINERED_TRADE_PACK_ROOT]);
        fx.relate(11, 21, AttributeType::HasComponentPack);
        fx.relate(12, 22, AttributeType::HasComponentPack);

        let (store, graph, tiers) = fx.finish();
        let outcome = backstitch(
            &store,
            &graph,
            &tiers,
            ConceptId(10),
            AttributeType::HasComponentPack,
            ConceptId(50),
        )
        .expect("backstitch");
        assert_eq!(outcome, BackstitchOutcome::Unique(ConceptId(51)));
    }

    #[test]
    fn backstitch_reports_missing_and_ambiguous() {
        let mut fx = Fixture::new();
        fx.concept(50, &[MEDICINAL_PACK_ROOT]);
        fx.concept(51, &[ConceptId(50), TRADE_PACK_ROOT]);
        fx.concept(52, &[ConceptId(50), TRADE_PACK_ROOT]);
        fx.concept(10, &[TRADE_PACK_ROOT]);
        fx.concept(11, &[ConceptId(10), CONTAINERED_TRADE_PACK_ROOT]);
        fx.concept(12, &[ConceptId(10), CONTAINERED_TRADE_PACK_ROOT]);
        // 21 qualifies via 51, 22 via 52: two distinct qualifying parents.
        fx.concept(21, &[ConceptId(51), CONTAINERED_TRADE_PACK_ROOT]);
        fx.concept(22, &[ConceptId(52), CONTAINERED_TRADE_PACK_ROOT]);
        fx.relate(11, 21, AttributeType::HasComponentPack);
        fx.relate(12, 22, AttributeType::HasComponentPack);

        let (store, graph, tiers) = fx.finish();
        let ambiguous = backstitch(
            &store,
            &graph,
            &tiers,
            ConceptId(10),
            AttributeType::HasComponentPack,
            ConceptId(50),
        )
        .expect("backstitch");
        assert_eq!(
            ambiguous,
            BackstitchOutcome::Ambiguous(vec![ConceptId(51), ConceptId(52)])
        );

        // No containered descendant states the attribute at all.
        let missing = backstitch(
            &store,
            &graph,
            &tiers,
            ConceptId(10),
            AttributeType::HasSubpack,
            ConceptId(50),
        )
        .expect("backstitch");
        assert_eq!(missing, BackstitchOutcome::Missing);
    }

    /// A branded chain carries both the brand concept and branded pack
    /// ancestors; only the concept parented directly on the
    /// trade-product root is the brand.
    #[test]
    fn brand_resolution_ignores_branded_pack_ancestors() {
        let mut fx = Fixture::new();
        fx.concept(70, &[TRADE_PRODUCT_ROOT]);
        fx.concept(10, &[TRADE_PACK_ROOT, ConceptId(70)]);
        fx.concept(
            1,
            &[
                ConceptId(10),
                CONTAINERED_TRADE_PACK_ROOT,
                ConceptId(70),
            ],
        );
        let (store, graph, tiers) = fx.finish();

        let release = assemble(&store, &graph, &tiers, &ManufacturerTable::new())
            .expect("assemble");
        for id in [1, 10] {
            assert_eq!(
                release.packages[&ConceptId(id)]
                    .brand
                    .as_ref()
                    .map(|brand| brand.id),
                Some(ConceptId(70)),
                "package {id}"
            );
        }
    }

    #[test]
    fn unrepairable_containment_is_fatal() {
        let mut fx = Fixture::new();
        fx.concept(50, &[MEDICINAL_PACK_ROOT]);
        fx.concept(10, &[TRADE_PACK_ROOT]);
        fx.concept(11, &[ConceptId(10), CONTAINERED_TRADE_PACK_ROOT]);
        // The trade pack states a generic sub-pack, but no containered
        // descendant states one to repair from.
        fx.relate(10, 50, AttributeType::HasSubpack);
        let (store, graph, tiers) = fx.finish();

        let result = assemble(&store, &graph, &tiers, &ManufacturerTable::new());
        assert!(matches!(
            result,
            Err(MedgraphError::MissingContainmentTarget {
                pack: ConceptId(10),
                destination: ConceptId(50),
            })
        ));
    }

    #[test]
    fn ambiguous_brand_is_fatal() {
        let mut fx = Fixture::new();
        fx.concept(70, &[TRADE_PRODUCT_ROOT]);
        fx.concept(71, &[TRADE_PRODUCT_ROOT]);
        fx.concept(
            1,
            &[
                ConceptId(70),
                ConceptId(71),
                CONTAINERED_TRADE_PACK_ROOT,
            ],
        );
        let (store, graph, tiers) = fx.finish();

        let result = assemble(&store, &graph, &tiers, &ManufacturerTable::new());
        assert!(matches!(
            result,
            Err(MedgraphError::AmbiguousBrand { concept: ConceptId(1), .. })
        ));
    }

    #[test]
    fn memoized_assembly_emits_each_concept_once() {
        let mut fx = Fixture::new();
        // Two containered packs sharing one unit-of-use product.
        fx.concept(1, &[CONTAINERED_TRADE_PACK_ROOT]);
        fx.concept(2, &[CONTAINERED_TRADE_PACK_ROOT]);
        fx.concept(40, &[crate::hierarchy::MEDICINAL_UNIT_ROOT]);
        fx.concept(90, &[crate::hierarchy::SUBSTANCE_ROOT]);
        fx.relate(1, 40, AttributeType::HasUnitOfUse);
        fx.relate(2, 40, AttributeType::HasUnitOfUse);
        fx.relate(40, 90, AttributeType::HasIntendedActiveIngredient);
        let (store, graph, tiers) = fx.finish();

        let release = assemble(&store, &graph, &tiers, &ManufacturerTable::new())
            .expect("assemble");
        assert_eq!(release.packages.len(), 2);
        assert_eq!(release.products.len(), 1);
        assert_eq!(release.substances.len(), 1);
        assert_eq!(release.roots, vec![ConceptId(1), ConceptId(2)]);
    }
}
