//! Embedded value types that appear inside NMDC records.

use serde::{Deserialize, Serialize};

use crate::constants::nmdc_types;

fn quantity_type() -> String {
    nmdc_types::QUANTITY_VALUE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyClass {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlledIdentifiedTermValue {
    pub has_raw_value: String,
    pub term: OntologyClass,
    #[serde(rename = "type")]
    pub r#type: String,
}

impl ControlledIdentifiedTermValue {
    pub fn new(term_id: &str, label: Option<String>) -> Self {
        Self {
            has_raw_value: term_id.to_string(),
            term: OntologyClass {
                id: term_id.to_string(),
                name: label,
                r#type: nmdc_types::ONTOLOGY_CLASS.to_string(),
            },
            r#type: nmdc_types::CONTROLLED_IDENTIFIED_TERM_VALUE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub has_raw_value: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

impl TextValue {
    pub fn new(raw: &str) -> Self {
        Self { has_raw_value: raw.to_string(), r#type: nmdc_types::TEXT_VALUE.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampValue {
    pub has_raw_value: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

impl TimestampValue {
    pub fn new(raw: &str) -> Self {
        Self { has_raw_value: raw.to_string(), r#type: nmdc_types::TIMESTAMP_VALUE.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationValue {
    pub has_raw_value: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuantityValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_numeric_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_minimum_numeric_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_maximum_numeric_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_raw_value: Option<String>,
    #[serde(rename = "type", default = "quantity_type")]
    pub r#type: String,
}

impl QuantityValue {
    pub fn empty() -> Self {
        Self { r#type: quantity_type(), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.has_numeric_value.is_none()
            && self.has_minimum_numeric_value.is_none()
            && self.has_maximum_numeric_value.is_none()
            && self.has_unit.is_none()
            && self.has_raw_value.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaboliteIdentification {
    pub metabolite_identified: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_identifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_similarity_score: Option<f64>,
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceMetadata {
    pub git_url: String,
    pub version: String,
    pub source_system_of_record: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

impl ProvenanceMetadata {
    /// Provenance stamped on records this tool creates from scratch.
    pub fn for_this_tool() -> Self {
        Self {
            git_url: crate::constants::PROVENANCE_GIT_URL.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            source_system_of_record: crate::constants::SOURCE_SYSTEM_OF_RECORD.to_string(),
            r#type: nmdc_types::PROVENANCE_METADATA.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn controlled_term_without_label_omits_name() {
        let value = serde_json::to_value(ControlledIdentifiedTermValue::new("ENVO:00002042", None)).unwrap();
        assert_eq!(
            value,
            json!({
                "has_raw_value": "ENVO:00002042",
                "term": {"id": "ENVO:00002042", "type": "nmdc:OntologyClass"},
                "type": "nmdc:ControlledIdentifiedTermValue"
            })
        );
    }

    #[test]
    fn empty_quantity_is_detected() {
        let mut quantity = QuantityValue::empty();
        assert!(quantity.is_empty());
        quantity.has_unit = Some("m".to_string());
        assert!(!quantity.is_empty());
    }
}
