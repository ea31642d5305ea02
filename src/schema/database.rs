use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

use super::records::{
    Biosample, CalibrationInformation, DataObject, Manifest, MassSpectrometry, WorkflowExecution,
};
use crate::error::Result;

/// In-memory collection of generated records, serialized as an NMDC `Database` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Database {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub biosample_set: Vec<Biosample>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calibration_set: Vec<CalibrationInformation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_generation_set: Vec<MassSpectrometry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_object_set: Vec<DataObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manifest_set: Vec<Manifest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workflow_execution_set: Vec<WorkflowExecution>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.biosample_set.is_empty()
            && self.calibration_set.is_empty()
            && self.data_generation_set.is_empty()
            && self.data_object_set.is_empty()
            && self.manifest_set.is_empty()
            && self.workflow_execution_set.is_empty()
    }

    /// Record counts per non-empty collection, in serialization order.
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        [
            ("biosample_set", self.biosample_set.len()),
            ("calibration_set", self.calibration_set.len()),
            ("data_generation_set", self.data_generation_set.len()),
            ("data_object_set", self.data_object_set.len()),
            ("manifest_set", self.manifest_set.len()),
            ("workflow_execution_set", self.workflow_execution_set.len()),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect()
    }

    pub fn remove_data_objects(&mut self, ids: &[String]) {
        self.data_object_set.retain(|d| !ids.contains(&d.id));
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Writes the database as pretty-printed JSON, creating parent directories as needed.
    pub fn dump(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "Database successfully dumped");
        Ok(())
    }
}
