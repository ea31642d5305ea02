#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use nmdc_ms_metadata::app::ports::{ClockPort, NmdcApiPort, OntologyPort, RecordQuery};
use nmdc_ms_metadata::config::ApiSettings;
use nmdc_ms_metadata::error::{MetadataError, Result};
use nmdc_ms_metadata::generators::GeneratorContext;

pub const TODAY: &str = "2024-03-05";
pub const STARTED: &str = "2024-03-01 10:00:00";
pub const ENDED: &str = "2024-03-01 11:30:00";

pub fn resource(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("resources").join(relative)
}

fn type_code(nmdc_type: &str) -> &'static str {
    match nmdc_type {
        "nmdc:Biosample" => "bsm",
        "nmdc:MassSpectrometry" => "dgms",
        "nmdc:DataObject" => "dobj",
        "nmdc:MetabolomicsAnalysis" => "wfmb",
        "nmdc:NomAnalysis" => "wfnom",
        "nmdc:CalibrationInformation" => "calib",
        "nmdc:Manifest" => "manif",
        _ => "unknown",
    }
}

fn field_matches(field: Option<&Value>, condition: &Value) -> bool {
    let Some(field) = field else {
        return false;
    };
    match condition {
        Value::Object(ops) if ops.contains_key("$in") => ops["$in"]
            .as_array()
            .map_or(false, |options| options.iter().any(|o| field_matches(Some(field), o))),
        Value::Object(ops) if ops.contains_key("$regex") => {
            let pattern = ops["$regex"].as_str().unwrap_or_default();
            let re = Regex::new(pattern).unwrap();
            match field {
                Value::String(s) => re.is_match(s),
                _ => false,
            }
        }
        _ => match field {
            Value::Array(items) => items.contains(condition),
            other => other == condition,
        },
    }
}

/// In-memory runtime API
#[derive(Default)]
pub struct StubNmdcApi {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    counters: Mutex<HashMap<String, usize>>,
    url_statuses: Mutex<HashMap<String, u16>>,
    texts: Mutex<HashMap<String, String>>,
    pub probed: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<(String, Value)>>,
    pub validated: Mutex<Vec<Value>>,
    pub submitted: Mutex<Vec<Value>>,
}

impl StubNmdcApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, collection: &str, record: Value) -> Self {
        self.collections.lock().unwrap().entry(collection.to_string()).or_default().push(record);
        self
    }

    pub fn with_url_status(self, url: &str, status: u16) -> Self {
        self.url_statuses.lock().unwrap().insert(url.to_string(), status);
        self
    }

    pub fn with_text(self, url: &str, text: &str) -> Self {
        self.texts.lock().unwrap().insert(url.to_string(), text.to_string());
        self
    }

    pub fn probed_urls(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl NmdcApiPort for StubNmdcApi {
    async fn mint_ids(&self, nmdc_type: &str, how_many: usize) -> Result<Vec<String>> {
        let code = type_code(nmdc_type);
        let mut counters = self.counters.lock().unwrap();
        let counter = counters.entry(code.to_string()).or_default();
        let ids = (0..how_many)
            .map(|_| {
                *counter += 1;
                format!("nmdc:{}-13-{:06}", code, counter)
            })
            .collect();
        Ok(ids)
    }

    async fn find_records(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Value>> {
        self.queries.lock().unwrap().push((collection.to_string(), query.filter.clone()));
        let collections = self.collections.lock().unwrap();
        let records = collections.get(collection).cloned().unwrap_or_default();
        let conditions = query.filter.as_object().cloned().unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|r| conditions.iter().all(|(key, condition)| field_matches(r.get(key), condition)))
            .collect())
    }

    async fn validate_json(&self, database: &Value) -> Result<()> {
        self.validated.lock().unwrap().push(database.clone());
        Ok(())
    }

    async fn submit_json(&self, database: &Value) -> Result<()> {
        self.submitted.lock().unwrap().push(database.clone());
        Ok(())
    }

    async fn url_status(&self, url: &str) -> Result<u16> {
        self.probed.lock().unwrap().push(url.to_string());
        Ok(self.url_statuses.lock().unwrap().get(url).copied().unwrap_or(200))
    }

    async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        Ok(self.texts.lock().unwrap().get(url).cloned())
    }
}

/// ENVO labels from a fixed table
pub struct StubOntology {
    labels: HashMap<String, String>,
}

impl StubOntology {
    pub fn new(labels: &[(&str, &str)]) -> Self {
        Self { labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect() }
    }
}

#[async_trait]
impl OntologyPort for StubOntology {
    async fn envo_label(&self, envo_id: &str) -> Result<String> {
        self.labels
            .get(envo_id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("No label for {}", envo_id)))
    }
}

pub struct FixedClock;

impl ClockPort for FixedClock {
    fn today(&self) -> String {
        TODAY.to_string()
    }

    fn file_window(&self, _path: &Path) -> Result<(String, String)> {
        Ok((STARTED.to_string(), ENDED.to_string()))
    }
}

pub fn context(api: Arc<StubNmdcApi>) -> GeneratorContext {
    GeneratorContext::new(api, Arc::new(FixedClock), &ApiSettings::default())
}

/// Writes a metadata CSV into `dir` and returns its path.
pub fn write_sheet(dir: &Path, name: &str, header: &[&str], rows: &[Vec<String>]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer.write_record(header).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
    path
}

pub fn path_string(path: &Path) -> String {
    path.display().to_string()
}
