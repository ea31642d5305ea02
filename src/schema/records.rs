//! Top-level NMDC records produced by the generators.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::values::{ControlledIdentifiedTermValue, MetaboliteIdentification, ProvenanceMetadata};
use crate::constants::{nmdc_types, MANIFEST_CATEGORY};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Biosample {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub associated_studies: Vec<String>,
    pub env_broad_scale: ControlledIdentifiedTermValue,
    pub env_local_scale: ControlledIdentifiedTermValue,
    pub env_medium: ControlledIdentifiedTermValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance_metadata: Option<ProvenanceMetadata>,
    /// Optional slots read from `biosample.*` columns, already shaped for the schema
    #[serde(flatten)]
    pub slots: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataObject {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub description: String,
    pub data_category: String,
    pub data_object_type: String,
    pub file_size_bytes: u64,
    pub md5_checksum: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_generated_by: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternative_identifiers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub in_manifest: Vec<String>,
}

/// A `nmdc:MassSpectrometry` data generation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MassSpectrometry {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub description: String,
    pub add_date: String,
    pub eluent_introduction_category: String,
    pub has_mass_spectrometry_configuration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_chromatography_configuration: Option<String>,
    pub analyte_category: String,
    pub instrument_used: Vec<String>,
    pub has_input: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub has_output: Vec<String>,
    pub associated_studies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument_instance_specifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generates_calibration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetabolomicsAnalysis {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_resource: Option<String>,
    pub git_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub was_informed_by: Vec<String>,
    pub has_input: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub has_output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at_time: Option<String>,
    pub metabolomics_analysis_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses_calibration: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub has_metabolite_identifications: Vec<MetaboliteIdentification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NomAnalysis {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_resource: Option<String>,
    pub git_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub was_informed_by: Vec<String>,
    pub has_input: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub has_output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at_time: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uses_calibration: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qc_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qc_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkflowExecution {
    Metabolomics(MetabolomicsAnalysis),
    Nom(NomAnalysis),
}

impl WorkflowExecution {
    pub fn id(&self) -> &str {
        match self {
            WorkflowExecution::Metabolomics(a) => &a.id,
            WorkflowExecution::Nom(a) => &a.id,
        }
    }
}

impl From<MetabolomicsAnalysis> for WorkflowExecution {
    fn from(analysis: MetabolomicsAnalysis) -> Self {
        WorkflowExecution::Metabolomics(analysis)
    }
}

impl From<NomAnalysis> for WorkflowExecution {
    fn from(analysis: NomAnalysis) -> Self {
        WorkflowExecution::Nom(analysis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationInformation {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub description: String,
    pub internal_calibration: bool,
    pub calibration_target: String,
    pub calibration_standard: String,
    pub calibration_object: String,
}

impl CalibrationInformation {
    pub fn new(id: String, name: String, description: String, target: &str, standard: &str, object_id: &str) -> Self {
        Self {
            id,
            r#type: nmdc_types::CALIBRATION_INFORMATION.to_string(),
            name,
            description,
            internal_calibration: false,
            calibration_target: target.to_string(),
            calibration_standard: standard.to_string(),
            calibration_object: object_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub manifest_category: String,
}

impl Manifest {
    pub fn instrument_run(id: String, name: &str) -> Self {
        Self {
            id,
            r#type: nmdc_types::MANIFEST.to_string(),
            name: name.to_string(),
            manifest_category: MANIFEST_CATEGORY.to_string(),
        }
    }
}
