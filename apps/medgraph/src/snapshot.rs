//! # Snapshot and Schedule Readers
//!
//! Tab-delimited file readers for the terminology snapshot and the
//! subsidy schedule. The engine itself never touches files; these
//! readers produce the row vectors it consumes.
//!
//! A release directory holds one file per row kind, each with a header
//! line:
//!
//! - `Concept.txt`: id, effectiveTime, active, moduleId
//! - `Relationship.txt`: id, effectiveTime, active, moduleId, sourceId,
//!   destinationId, relationshipGroup, typeId
//! - `Description.txt`: id, effectiveTime, active, moduleId, conceptId,
//!   typeId, term
//! - `Language.txt`: effectiveTime, active, moduleId, descriptionId,
//!   acceptabilityId
//! - `Property.txt`: effectiveTime, active, moduleId, relationshipId,
//!   unitId, attributeId, value
//! - `Identifier.txt`: effectiveTime, active, moduleId, conceptId,
//!   alternateIdentifier
//! - `Association.txt`: effectiveTime, active, moduleId, conceptId,
//!   targetId, associationTypeId
//!
//! A schedule directory holds:
//!
//! - `Manufacturer.txt`: code, name, address, phone, fax
//! - `Subsidy.txt`: itemCode, programCode, restrictionCode, maxPrice,
//!   claimedPrice, specificPackId, genericPackId, manufacturerCode,
//!   notes, cautions, atcCodes (the last three are `;`-separated lists,
//!   ATC entries as `code=display`)
//!
//! `Concept.txt` and `Relationship.txt` are required; every other file
//! is optional and contributes no rows when absent.

use medgraph_core::rows::{
    AssociationRow, ConceptRow, DatatypePropertyRow, DescriptionRow, IdentifierRow, LanguageRow,
    ManufacturerRow, RelationshipRow, SubsidyRow,
};
use medgraph_core::{
    ConceptId, DescriptionId, EffectiveDate, MedgraphError, ModuleId, RelationshipId,
    ReleaseSource, ScheduleSource,
};
use std::path::{Path, PathBuf};
use tracing::debug;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size for one snapshot file (512 MB).
///
/// This prevents memory exhaustion from malicious or accidental large
/// files; real snapshot files are an order of magnitude smaller.
const MAX_SNAPSHOT_FILE_SIZE: u64 = 512 * 1024 * 1024;

// =============================================================================
// RELEASE READER
// =============================================================================

/// Read a full release directory into engine rows.
pub fn read_release(dir: &Path) -> Result<ReleaseSource, MedgraphError> {
    let mut release = ReleaseSource::default();

    for line in required_rows(&dir.join("Concept.txt"))? {
        let fields = split_fields(&line.text, 4, &line)?;
        release.concepts.push(ConceptRow {
            id: ConceptId(parse_u64(fields[0], &line)?),
            effective_date: parse_date(fields[1], &line)?,
            active: parse_flag(fields[2], &line)?,
            module: ModuleId(parse_u64(fields[3], &line)?),
        });
    }

    for line in required_rows(&dir.join("Relationship.txt"))? {
        let fields = split_fields(&line.text, 8, &line)?;
        release.relationships.push(RelationshipRow {
            id: RelationshipId(parse_u64(fields[0], &line)?),
            effective_date: parse_date(fields[1], &line)?,
            active: parse_flag(fields[2], &line)?,
            module: ModuleId(parse_u64(fields[3], &line)?),
            source: ConceptId(parse_u64(fields[4], &line)?),
            destination: ConceptId(parse_u64(fields[5], &line)?),
            group: parse_u64(fields[6], &line)? as u32,
            attribute_code: parse_u64(fields[7], &line)?,
        });
    }

    for line in optional_rows(&dir.join("Description.txt"))? {
        let fields = split_fields(&line.text, 7, &line)?;
        release.descriptions.push(DescriptionRow {
            id: DescriptionId(parse_u64(fields[0], &line)?),
            effective_date: parse_date(fields[1], &line)?,
            active: parse_flag(fields[2], &line)?,
            module: ModuleId(parse_u64(fields[3], &line)?),
            concept: ConceptId(parse_u64(fields[4], &line)?),
            kind_code: parse_u64(fields[5], &line)?,
            term: fields[6].to_string(),
        });
    }

    for line in optional_rows(&dir.join("Language.txt"))? {
        let fields = split_fields(&line.text, 5, &line)?;
        release.language.push(LanguageRow {
            effective_date: parse_date(fields[0], &line)?,
            active: parse_flag(fields[1], &line)?,
            module: ModuleId(parse_u64(fields[2], &line)?),
            description: DescriptionId(parse_u64(fields[3], &line)?),
            acceptability_code: parse_u64(fields[4], &line)?,
        });
    }

    for line in optional_rows(&dir.join("Property.txt"))? {
        let fields = split_fields(&line.text, 7, &line)?;
        release.properties.push(DatatypePropertyRow {
            effective_date: parse_date(fields[0], &line)?,
            active: parse_flag(fields[1], &line)?,
            module: ModuleId(parse_u64(fields[2], &line)?),
            relationship: RelationshipId(parse_u64(fields[3], &line)?),
            unit: ConceptId(parse_u64(fields[4], &line)?),
            attribute_code: parse_u64(fields[5], &line)?,
            value: fields[6].to_string(),
        });
    }

    for line in optional_rows(&dir.join("Identifier.txt"))? {
        let fields = split_fields(&line.text, 5, &line)?;
        release.identifiers.push(IdentifierRow {
            effective_date: parse_date(fields[0], &line)?,
            active: parse_flag(fields[1], &line)?,
            module: ModuleId(parse_u64(fields[2], &line)?),
            concept: ConceptId(parse_u64(fields[3], &line)?),
            identifier: fields[4].to_string(),
        });
    }

    for line in optional_rows(&dir.join("Association.txt"))? {
        let fields = split_fields(&line.text, 6, &line)?;
        release.associations.push(AssociationRow {
            effective_date: parse_date(fields[0], &line)?,
            active: parse_flag(fields[1], &line)?,
            module: ModuleId(parse_u64(fields[2], &line)?),
            concept: ConceptId(parse_u64(fields[3], &line)?),
            target: ConceptId(parse_u64(fields[4], &line)?),
            association_code: parse_u64(fields[5], &line)?,
        });
    }

    debug!(
        concepts = release.concepts.len(),
        relationships = release.relationships.len(),
        descriptions = release.descriptions.len(),
        "release directory read"
    );
    Ok(release)
}

// =============================================================================
// SCHEDULE READER
// =============================================================================

/// Read a subsidy-schedule directory into engine rows.
pub fn read_schedule(dir: &Path) -> Result<ScheduleSource, MedgraphError> {
    let mut schedule = ScheduleSource::default();

    for line in optional_rows(&dir.join("Manufacturer.txt"))? {
        let fields = split_fields(&line.text, 5, &line)?;
        schedule.manufacturers.push(ManufacturerRow {
            code: fields[0].to_string(),
            name: fields[1].to_string(),
            address: fields[2].to_string(),
            phone: fields[3].to_string(),
            fax: optional_field(fields[4]),
        });
    }

    for line in optional_rows(&dir.join("Subsidy.txt"))? {
        let fields = split_fields(&line.text, 11, &line)?;
        schedule.subsidies.push(SubsidyRow {
            item_code: fields[0].to_string(),
            program_code: fields[1].to_string(),
            restriction_code: fields[2].to_string(),
            max_price: fields[3].to_string(),
            claimed_price: fields[4].to_string(),
            specific_pack: ConceptId(parse_u64(fields[5], &line)?),
            generic_pack: match optional_field(fields[6]) {
                Some(raw) => Some(ConceptId(parse_u64(&raw, &line)?)),
                None => None,
            },
            manufacturer_code: optional_field(fields[7]),
            notes: split_list(fields[8]),
            cautions: split_list(fields[9]),
            atc_codes: split_pairs(fields[10], &line)?,
        });
    }

    debug!(
        manufacturers = schedule.manufacturers.len(),
        subsidies = schedule.subsidies.len(),
        "schedule directory read"
    );
    Ok(schedule)
}

// =============================================================================
// LINE-LEVEL HELPERS
// =============================================================================

/// One data line plus its provenance for error messages.
struct SourceLine {
    file: PathBuf,
    number: usize,
    text: String,
}

impl SourceLine {
    fn context(&self) -> String {
        format!("{}:{}", self.file.display(), self.number)
    }
}

/// Read a file's data lines (header skipped). The file must exist.
fn required_rows(path: &Path) -> Result<Vec<SourceLine>, MedgraphError> {
    validate_file_size(path)?;
    let content = std::fs::read_to_string(path)
        .map_err(|e| MedgraphError::Io(format!("cannot read {}: {e}", path.display())))?;
    Ok(content
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, text)| !text.is_empty())
        .map(|(index, text)| SourceLine {
            file: path.to_path_buf(),
            number: index + 1,
            text: text.to_string(),
        })
        .collect())
}

/// Like `required_rows`, but a missing file contributes no rows.
fn optional_rows(path: &Path) -> Result<Vec<SourceLine>, MedgraphError> {
    if !path.exists() {
        debug!(file = %path.display(), "optional snapshot file absent");
        return Ok(Vec::new());
    }
    required_rows(path)
}

/// Validate file size before reading.
fn validate_file_size(path: &Path) -> Result<(), MedgraphError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        MedgraphError::Io(format!("cannot read metadata of {}: {e}", path.display()))
    })?;
    if metadata.len() > MAX_SNAPSHOT_FILE_SIZE {
        return Err(MedgraphError::Io(format!(
            "file {} is {} bytes, exceeding the {} byte limit",
            path.display(),
            metadata.len(),
            MAX_SNAPSHOT_FILE_SIZE
        )));
    }
    Ok(())
}

// =============================================================================
// FIELD-LEVEL HELPERS
// =============================================================================

fn split_fields<'a>(
    text: &'a str,
    expected: usize,
    line: &SourceLine,
) -> Result<Vec<&'a str>, MedgraphError> {
    let fields: Vec<&str> = text.split('\t').collect();
    if fields.len() != expected {
        return Err(MedgraphError::MalformedRow(format!(
            "{}: expected {expected} fields, found {}",
            line.context(),
            fields.len()
        )));
    }
    Ok(fields)
}

fn parse_u64(field: &str, line: &SourceLine) -> Result<u64, MedgraphError> {
    field.parse::<u64>().map_err(|_| {
        MedgraphError::MalformedRow(format!("{}: not a numeric id: {field:?}", line.context()))
    })
}

fn parse_date(field: &str, line: &SourceLine) -> Result<EffectiveDate, MedgraphError> {
    EffectiveDate::parse(field).map_err(|error| {
        tracing::error!(line = %line.context(), "malformed effective date");
        error
    })
}

fn parse_flag(field: &str, line: &SourceLine) -> Result<bool, MedgraphError> {
    match field {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(MedgraphError::MalformedRow(format!(
            "{}: not an active flag: {other:?}",
            line.context()
        ))),
    }
}

fn optional_field(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

fn split_list(field: &str) -> Vec<String> {
    field
        .split(';')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `code=display;code=display` ATC pairs.
fn split_pairs(field: &str, line: &SourceLine) -> Result<Vec<(String, String)>, MedgraphError> {
    let mut pairs = Vec::new();
    for part in field.split(';').filter(|part| !part.is_empty()) {
        let Some((code, display)) = part.split_once('=') else {
            return Err(MedgraphError::MalformedRow(format!(
                "{}: ATC entry missing '=': {part:?}",
                line.context()
            )));
        };
        pairs.push((code.to_string(), display.to_string()));
    }
    Ok(pairs)
}
