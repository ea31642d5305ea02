//! `biosample.*` columns to `nmdc:Biosample` records.
//!
//! Each supported slot has a [`SlotKind`] that decides how its cell is shaped
//! for the schema. Quantity slots are spread over sub-columns such as
//! `biosample.depth.has_numeric_value` and `biosample.depth.has_unit`.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Value};

use super::literal::parse_string_list;
use super::sheet::SheetRow;
use crate::app::ports::OntologyPort;
use crate::constants::nmdc_types;
use crate::error::{MetadataError, Result};
use crate::schema::{
    Biosample, ControlledIdentifiedTermValue, GeolocationValue, ProvenanceMetadata, QuantityValue, TextValue,
    TimestampValue,
};

pub const COLUMN_PREFIX: &str = "biosample.";

/// Columns that must be filled before a new biosample can be generated
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "biosample.name",
    "biosample.associated_studies",
    "biosample.env_broad_scale",
    "biosample.env_local_scale",
    "biosample.env_medium",
];

const QUANTITY_PARTS: [&str; 5] = [
    "has_numeric_value",
    "has_minimum_numeric_value",
    "has_maximum_numeric_value",
    "has_unit",
    "has_raw_value",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Plain,
    Number,
    StringList,
    Text,
    ControlledTerm,
    Quantity,
    Geolocation,
    Timestamp,
}

/// Optional biosample slots read from the sheet. The required slots live on [`Biosample`].
pub const SLOTS: &[(&str, SlotKind)] = &[
    ("description", SlotKind::Plain),
    ("samp_name", SlotKind::Plain),
    ("alternative_identifiers", SlotKind::StringList),
    ("gold_biosample_identifiers", SlotKind::StringList),
    ("collection_date", SlotKind::Timestamp),
    ("depth", SlotKind::Quantity),
    ("temp", SlotKind::Quantity),
    ("samp_store_temp", SlotKind::Quantity),
    ("tot_org_carb", SlotKind::Quantity),
    ("ph", SlotKind::Number),
    ("elev", SlotKind::Number),
    ("geo_loc_name", SlotKind::Text),
    ("lat_lon", SlotKind::Geolocation),
    ("ecosystem", SlotKind::Plain),
    ("ecosystem_category", SlotKind::Plain),
    ("ecosystem_type", SlotKind::Plain),
    ("ecosystem_subtype", SlotKind::Plain),
    ("specific_ecosystem", SlotKind::Plain),
    ("env_package", SlotKind::Text),
    ("samp_mat_process", SlotKind::Text),
    ("samp_taxon_id", SlotKind::ControlledTerm),
    ("habitat", SlotKind::Plain),
    ("location", SlotKind::Plain),
    ("sample_link", SlotKind::StringList),
    ("insdc_biosample_identifiers", SlotKind::StringList),
    ("img_identifiers", SlotKind::StringList),
    ("analysis_type", SlotKind::StringList),
    ("source_mat_id", SlotKind::Text),
    ("samp_collec_device", SlotKind::Text),
    ("samp_collec_method", SlotKind::Text),
    ("samp_size", SlotKind::Quantity),
    ("store_cond", SlotKind::Text),
    ("collection_time", SlotKind::Plain),
    ("sample_collection_site", SlotKind::Plain),
    ("collected_from", SlotKind::Plain),
    ("host_name", SlotKind::Plain),
    ("cur_vegetation", SlotKind::Text),
    ("cur_land_use", SlotKind::Plain),
    ("soil_type", SlotKind::Text),
    ("soil_horizon", SlotKind::Plain),
    ("texture", SlotKind::Text),
    ("water_content", SlotKind::StringList),
    ("salinity", SlotKind::Quantity),
    ("diss_org_carb", SlotKind::Quantity),
    ("diss_inorg_carb", SlotKind::Quantity),
    ("tot_carb", SlotKind::Quantity),
    ("tot_nitro_content", SlotKind::Quantity),
    ("tot_phosp", SlotKind::Quantity),
    ("org_matter", SlotKind::Quantity),
    ("ammonium_nitrogen", SlotKind::Quantity),
    ("nitrate_nitrogen", SlotKind::Quantity),
    ("nitrite_nitrogen", SlotKind::Quantity),
    ("microbial_biomass", SlotKind::Quantity),
    ("air_temp", SlotKind::Quantity),
    ("water_temp", SlotKind::Quantity),
    ("growth_facil", SlotKind::ControlledTerm),
    ("misc_param", SlotKind::StringList),
];

/// Columns other than slots that may carry the `biosample.` prefix
const OTHER_COLUMNS: [&str; 1] = ["biosample.id"];

fn column(slot: &str) -> String {
    format!("{}{}", COLUMN_PREFIX, slot)
}

/// Builds a biosample from one sheet row. ENVO terms are labelled through `ontology`.
pub async fn parse_biosample(row: &SheetRow, id: String, ontology: &dyn OntologyPort) -> Result<Biosample> {
    let name = row.require("biosample.name")?.to_string();
    let associated_studies = parse_string_list(row.require("biosample.associated_studies")?)?;

    reject_unknown_columns(row)?;

    let env_broad_scale = envo_term(row, "env_broad_scale", ontology).await?;
    let env_local_scale = envo_term(row, "env_local_scale", ontology).await?;
    let env_medium = envo_term(row, "env_medium", ontology).await?;

    let mut slots = BTreeMap::new();
    for (slot, kind) in SLOTS {
        if let Some(value) = slot_value(row, slot, *kind)? {
            slots.insert(slot.to_string(), value);
        }
    }

    Ok(Biosample {
        id,
        r#type: nmdc_types::BIOSAMPLE.to_string(),
        name,
        associated_studies,
        env_broad_scale,
        env_local_scale,
        env_medium,
        provenance_metadata: Some(ProvenanceMetadata::for_this_tool()),
        slots,
    })
}

fn known_column(col: &str) -> bool {
    if REQUIRED_COLUMNS.contains(&col) || OTHER_COLUMNS.contains(&col) {
        return true;
    }
    let Some(slot) = col.strip_prefix(COLUMN_PREFIX) else {
        return true;
    };
    SLOTS.iter().any(|(name, kind)| match kind {
        SlotKind::Quantity => slot
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|part| QUANTITY_PARTS.contains(&part)),
        _ => slot == *name,
    })
}

fn reject_unknown_columns(row: &SheetRow) -> Result<()> {
    let mut unknown: Vec<&str> = row.filled_columns().filter(|c| !known_column(c)).collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(MetadataError::InvalidInput(format!(
        "Unsupported biosample columns in row {}: {}",
        row.number,
        unknown.join(", ")
    )))
}

async fn envo_term(row: &SheetRow, slot: &str, ontology: &dyn OntologyPort) -> Result<ControlledIdentifiedTermValue> {
    let term_id = row.require(&column(slot))?;
    let label = ontology.envo_label(term_id).await?;
    Ok(ControlledIdentifiedTermValue::new(term_id, Some(label)))
}

fn slot_value(row: &SheetRow, slot: &str, kind: SlotKind) -> Result<Option<Value>> {
    let col = column(slot);
    let value = match (kind, row.get(&col)) {
        (SlotKind::Quantity, _) => quantity(row, slot)?.map(|q| json!(q)),
        (_, None) => None,
        (SlotKind::Plain, Some(raw)) => Some(json!(raw)),
        (SlotKind::Number, Some(raw)) => Some(json!(number(raw, &col)?)),
        (SlotKind::StringList, Some(raw)) => Some(json!(parse_string_list(raw)?)),
        (SlotKind::Text, Some(raw)) => Some(json!(TextValue::new(raw))),
        (SlotKind::ControlledTerm, Some(raw)) => {
            Some(json!(ControlledIdentifiedTermValue::new(raw, Some(raw.to_string()))))
        }
        (SlotKind::Geolocation, Some(raw)) => Some(json!(geolocation(raw, &col)?)),
        (SlotKind::Timestamp, Some(raw)) => Some(json!(TimestampValue::new(raw))),
    };
    Ok(value)
}

fn number(raw: &str, col: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| MetadataError::InvalidInput(format!("Expected a number in {}, found '{}'", col, raw)))
}

fn quantity(row: &SheetRow, slot: &str) -> Result<Option<QuantityValue>> {
    let base = column(slot);
    let part = |name: &str| row.get(&format!("{}.{}", base, name));
    let numeric = |name: &str| -> Result<Option<f64>> {
        part(name).map(|v| number(v, &format!("{}.{}", base, name))).transpose()
    };

    let mut value = QuantityValue::empty();
    value.has_numeric_value = numeric(QUANTITY_PARTS[0])?;
    value.has_minimum_numeric_value = numeric(QUANTITY_PARTS[1])?;
    value.has_maximum_numeric_value = numeric(QUANTITY_PARTS[2])?;
    value.has_unit = part(QUANTITY_PARTS[3]).map(str::to_string);
    value.has_raw_value = part(QUANTITY_PARTS[4]).map(str::to_string);

    if value.is_empty() {
        return Ok(None);
    }
    if value.has_unit.is_none() {
        return Err(MetadataError::InvalidInput(format!(
            "Missing unit for {}. `has_unit` is required for QuantityValue types.",
            base
        )));
    }
    Ok(Some(value))
}

/// `"<lat> <lon>"` to a geolocation value
fn geolocation(raw: &str, col: &str) -> Result<GeolocationValue> {
    let mut parts = raw.split_whitespace();
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(MetadataError::InvalidInput(format!(
            "Expected '<latitude> <longitude>' in {}, found '{}'",
            col, raw
        )));
    };
    Ok(GeolocationValue {
        has_raw_value: raw.to_string(),
        latitude: number(lat, col)?,
        longitude: number(lon, col)?,
        r#type: nmdc_types::GEOLOCATION_VALUE.to_string(),
    })
}

/// Writes a one-row example sheet with a column for every supported slot.
pub fn write_template(path: &Path) -> Result<()> {
    let mut headers = vec!["sample_id".to_string()];
    let mut example = vec![String::new()];

    let mut push = |header: String, value: &str| {
        headers.push(header);
        example.push(value.to_string());
    };
    push(column("name"), "");
    push(column("associated_studies"), "['nmdc:sty-00-000000']");
    for slot in ["env_broad_scale", "env_local_scale", "env_medium"] {
        push(column(slot), "ENVO:00000000");
    }
    for (slot, kind) in SLOTS {
        match kind {
            SlotKind::Quantity => {
                for part in QUANTITY_PARTS {
                    let value = if part == "has_unit" { "celcius" } else { "85" };
                    push(format!("{}.{}", column(slot), part), value);
                }
            }
            SlotKind::ControlledTerm => push(column(slot), "ENVO:00000000"),
            SlotKind::Text => push(column(slot), "textValue"),
            SlotKind::Geolocation => push(column(slot), "46.37228379 -119.2717467"),
            SlotKind::Timestamp => push(column(slot), "2014-11-25"),
            _ => push(column(slot), ""),
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&headers)?;
    writer.write_record(&example)?;
    writer.flush()?;
    Ok(())
}
