//! Record builders and rerun helpers shared by every generator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::profile::{FileProfile, Profile};
use crate::app::lookup::{self, record_id};
use crate::app::ports::{ClockPort, NmdcApiPort, OntologyPort, RecordQuery};
use crate::config::ApiSettings;
use crate::constants::{collections, nmdc_types, DEFAULT_CALIBRATION_STANDARD, DEFAULT_GCMS_CONFIGURATION_FILE};
use crate::error::{MetadataError, Result};
use crate::id_pool::IdPool;
use crate::schema::{DataObject, MassSpectrometry, MetabolomicsAnalysis, NomAnalysis};

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"current_version\s*=\s*([\d.]+)").expect("valid version regex"));
static VERSION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(\d+)$").expect("valid suffix regex"));

/// Fields copied from the previous workflow execution on rerun
pub const RERUN_FIELDS: [&str; 5] =
    ["id", "uses_calibration", "execution_resource", "processing_institution", "was_informed_by"];

/// Everything a generator talks to outside the metadata sheet.
pub struct GeneratorContext {
    api: Arc<dyn NmdcApiPort>,
    ontology: Option<Arc<dyn OntologyPort>>,
    clock: Arc<dyn ClockPort>,
    ids: IdPool,
}

impl GeneratorContext {
    pub fn new(api: Arc<dyn NmdcApiPort>, clock: Arc<dyn ClockPort>, settings: &ApiSettings) -> Self {
        Self {
            api,
            ontology: None,
            clock,
            ids: IdPool::new(settings.id_pool_size, settings.id_refill_threshold),
        }
    }

    pub fn with_ontology(mut self, ontology: Arc<dyn OntologyPort>) -> Self {
        self.ontology = Some(ontology);
        self
    }

    pub fn api(&self) -> &dyn NmdcApiPort {
        self.api.as_ref()
    }

    pub fn clock(&self) -> &dyn ClockPort {
        self.clock.as_ref()
    }

    /// Ontology client, required only when new biosamples are generated.
    pub fn ontology(&self) -> Result<Arc<dyn OntologyPort>> {
        self.ontology.clone().ok_or_else(|| {
            MetadataError::Config("BIO_API_KEY is required to generate biosamples from ENVO terms.".to_string())
        })
    }

    pub async fn mint(&mut self, nmdc_type: &str) -> Result<String> {
        self.ids.get_id(self.api.as_ref(), nmdc_type).await
    }
}

/// Command-line inputs shared by the workflow generators.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    pub metadata_file: PathBuf,
    pub process_data_url: String,
    pub raw_data_url: Option<String>,
    pub workflow_version: Option<String>,
    /// Extra `has_input` ids for every LC-MS analysis
    pub existing_data_objects: Vec<String>,
    pub skip_sample_id_check: bool,
    pub calibration_standard: String,
    pub configuration_file_name: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            metadata_file: PathBuf::new(),
            process_data_url: String::new(),
            raw_data_url: None,
            workflow_version: None,
            existing_data_objects: Vec::new(),
            skip_sample_id_check: false,
            calibration_standard: DEFAULT_CALIBRATION_STANDARD.to_string(),
            configuration_file_name: DEFAULT_GCMS_CONFIGURATION_FILE.to_string(),
        }
    }
}

impl GeneratorOptions {
    pub fn raw_base_url(&self) -> &str {
        self.raw_data_url.as_deref().unwrap_or("")
    }
}

pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| MetadataError::InvalidInput(format!("Not a file path: {}", path.display())))
}

pub fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| MetadataError::InvalidInput(format!("Not a file path: {}", path.display())))
}

/// Hex MD5 of a local file.
pub fn md5_hex(path: &Path) -> Result<String> {
    let bytes = read_data_file(path)?;
    Ok(hex::encode(Md5::digest(&bytes)))
}

fn read_data_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| MetadataError::InvalidInput(format!("Could not read data file {}: {}", path.display(), e)))
}

/// Regular files below `dir`, sorted by path.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MetadataError::InvalidInput(format!("Directory not found: {}", dir.display())));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// `process_data_url` joined with the processed directory's name.
pub fn processed_base_url(process_data_url: &str, dir: &Path) -> Result<String> {
    Ok(format!("{}{}/", process_data_url, file_name(dir)?))
}

pub struct DataObjectInput<'a> {
    path: &'a Path,
    category: &'a str,
    object_type: &'a str,
    description: String,
    base_url: &'a str,
    url: Option<String>,
    was_generated_by: Option<String>,
    in_manifest: Option<String>,
}

impl<'a> DataObjectInput<'a> {
    pub fn new(path: &'a Path, profile: &'a FileProfile, base_url: &'a str) -> Self {
        Self {
            path,
            category: profile.category,
            object_type: profile.object_type,
            description: profile.description.to_string(),
            base_url,
            url: None,
            was_generated_by: None,
            in_manifest: None,
        }
    }

    pub fn with_type(path: &'a Path, category: &'a str, object_type: &'a str, base_url: &'a str) -> Self {
        Self {
            path,
            category,
            object_type,
            description: String::new(),
            base_url,
            url: None,
            was_generated_by: None,
            in_manifest: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Overrides `base_url + file name`.
    pub fn url(mut self, url: Option<&str>) -> Self {
        self.url = url.map(str::to_string);
        self
    }

    pub fn generated_by(mut self, id: &str) -> Self {
        self.was_generated_by = Some(id.to_string());
        self
    }

    pub fn manifest(mut self, manifest_id: Option<&str>) -> Self {
        self.in_manifest = manifest_id.map(str::to_string);
        self
    }
}

pub async fn build_data_object(ctx: &mut GeneratorContext, input: DataObjectInput<'_>) -> Result<DataObject> {
    let name = file_name(input.path)?;
    let bytes = read_data_file(input.path)?;
    let id = ctx.mint(nmdc_types::DATA_OBJECT).await?;
    let url = input.url.unwrap_or_else(|| format!("{}{}", input.base_url, name));
    debug!(id = %id, url = %url, "Built data object");

    Ok(DataObject {
        id,
        r#type: nmdc_types::DATA_OBJECT.to_string(),
        name,
        description: input.description,
        data_category: input.category.to_string(),
        data_object_type: input.object_type.to_string(),
        file_size_bytes: bytes.len() as u64,
        md5_checksum: hex::encode(Md5::digest(&bytes)),
        url,
        was_generated_by: input.was_generated_by,
        alternative_identifiers: Vec::new(),
        in_manifest: input.in_manifest.into_iter().collect(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct MassSpecInput {
    pub raw_file: PathBuf,
    pub sample_id: String,
    pub instrument_id: String,
    pub mass_spec_configuration_id: String,
    pub chromatography_configuration_id: Option<String>,
    pub associated_studies: Vec<String>,
    pub processing_institution: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub instrument_instance_specifier: Option<String>,
    pub calibration_id: Option<String>,
}

/// Mass spectrometry record without outputs; the raw data object is attached afterwards.
pub async fn build_mass_spectrometry(
    ctx: &mut GeneratorContext,
    profile: &Profile,
    input: MassSpecInput,
) -> Result<MassSpectrometry> {
    let id = ctx.mint(nmdc_types::MASS_SPECTROMETRY).await?;
    Ok(MassSpectrometry {
        id,
        r#type: nmdc_types::MASS_SPECTROMETRY.to_string(),
        name: file_stem(&input.raw_file)?,
        description: profile.mass_spec_description.to_string(),
        add_date: ctx.clock().today(),
        eluent_introduction_category: profile.eluent_introduction.to_string(),
        has_mass_spectrometry_configuration: input.mass_spec_configuration_id,
        has_chromatography_configuration: input.chromatography_configuration_id,
        analyte_category: profile.analyte_category.to_string(),
        instrument_used: vec![input.instrument_id],
        has_input: vec![input.sample_id],
        has_output: Vec::new(),
        associated_studies: input.associated_studies,
        processing_institution: input.processing_institution,
        start_date: input.start_date,
        end_date: input.end_date,
        instrument_instance_specifier: input.instrument_instance_specifier,
        generates_calibration: input.calibration_id,
    })
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub raw_file_name: String,
    /// Incremented id of the previous execution; a fresh id is minted when absent
    pub id: Option<String>,
    pub was_informed_by: Vec<String>,
    pub processing_institution: Option<String>,
    pub execution_resource: Option<String>,
    pub version: Option<String>,
}

async fn analysis_id(ctx: &mut GeneratorContext, nmdc_type: &str, id: Option<String>) -> Result<String> {
    match id {
        Some(id) => Ok(id),
        None => Ok(format!("{}.1", ctx.mint(nmdc_type).await?)),
    }
}

/// Metabolomics analysis without inputs, outputs or times.
pub async fn build_metabolomics_analysis(
    ctx: &mut GeneratorContext,
    profile: &Profile,
    category: &str,
    input: AnalysisInput,
) -> Result<MetabolomicsAnalysis> {
    let id = analysis_id(ctx, nmdc_types::METABOLOMICS_ANALYSIS, input.id).await?;
    Ok(MetabolomicsAnalysis {
        id,
        r#type: nmdc_types::METABOLOMICS_ANALYSIS.to_string(),
        name: format!("{} for {}", profile.workflow_name, input.raw_file_name),
        description: profile.workflow_description.to_string(),
        processing_institution: input.processing_institution,
        execution_resource: input.execution_resource,
        git_url: profile.workflow_git_url.to_string(),
        version: input.version,
        was_informed_by: input.was_informed_by,
        has_input: Vec::new(),
        has_output: Vec::new(),
        started_at_time: None,
        ended_at_time: None,
        metabolomics_analysis_category: category.to_string(),
        uses_calibration: None,
        has_metabolite_identifications: Vec::new(),
    })
}

pub async fn build_nom_analysis(
    ctx: &mut GeneratorContext,
    profile: &Profile,
    input: AnalysisInput,
) -> Result<NomAnalysis> {
    let id = analysis_id(ctx, nmdc_types::NOM_ANALYSIS, input.id).await?;
    Ok(NomAnalysis {
        id,
        r#type: nmdc_types::NOM_ANALYSIS.to_string(),
        name: format!("{} for {}", profile.workflow_name, input.raw_file_name),
        description: profile.workflow_description.to_string(),
        processing_institution: input.processing_institution,
        execution_resource: input.execution_resource,
        git_url: profile.workflow_git_url.to_string(),
        version: input.version,
        was_informed_by: input.was_informed_by,
        has_input: Vec::new(),
        has_output: Vec::new(),
        started_at_time: None,
        ended_at_time: None,
        uses_calibration: Vec::new(),
        qc_status: None,
        qc_comment: None,
    })
}

pub fn parse_version(text: &str) -> Option<String> {
    VERSION_PATTERN.captures(text).map(|c| c[1].to_string())
}

/// The given version, else the one published in the workflow repository.
pub async fn resolve_workflow_version(
    api: &dyn NmdcApiPort,
    given: Option<&str>,
    version_url: &str,
) -> Option<String> {
    if let Some(version) = given {
        return Some(version.to_string());
    }
    match api.fetch_text(version_url).await {
        Ok(Some(text)) => {
            let version = parse_version(&text);
            if version.is_none() {
                warn!(url = %version_url, "No current_version found in workflow version file");
            }
            version
        }
        Ok(None) => {
            warn!(url = %version_url, "Workflow version file unavailable");
            None
        }
        Err(e) => {
            warn!(url = %version_url, error = %e, "Failed to fetch workflow version");
            None
        }
    }
}

/// `nmdc:wfmb-11-abc.2` becomes `nmdc:wfmb-11-abc.3`; an id without a version gets `.1`.
pub fn increment_version(id: &str) -> String {
    match VERSION_SUFFIX.captures(id) {
        Some(caps) => {
            let next = caps[1].parse::<u64>().map_or(1, |n| n + 1);
            format!("{}.{}", &id[..caps.get(0).map_or(id.len(), |m| m.start())], next)
        }
        None => format!("{}.1", id),
    }
}

fn version_key(id: &str) -> (String, u64) {
    match VERSION_SUFFIX.captures(id) {
        Some(caps) => {
            let start = caps.get(0).map_or(id.len(), |m| m.start());
            (id[..start].to_string(), caps[1].parse().unwrap_or(0))
        }
        None => (id.to_string(), 0),
    }
}

/// Record with the highest version, comparing ids numerically by their suffix.
pub fn latest_record(records: &[Value]) -> Option<&Value> {
    records
        .iter()
        .filter(|r| record_id(r).is_some())
        .max_by_key(|r| version_key(record_id(r).unwrap_or_default()))
}

pub fn string_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

/// A string or array-of-strings field as a list.
pub fn string_list(record: &Value, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

pub async fn raw_data_object_id(api: &dyn NmdcApiPort, url: &str) -> Result<String> {
    lookup::find_id(api, collections::DATA_OBJECT_SET, "url", url, true)
        .await?
        .ok_or_else(|| MetadataError::NotFound(format!("Raw data object not found for URL: {}", url)))
}

/// Latest workflow execution of `analysis_type` that used `raw_id` as input.
pub async fn previous_analysis(api: &dyn NmdcApiPort, raw_id: &str, analysis_type: &str) -> Result<Value> {
    let query = RecordQuery::new(json!({"has_input": raw_id, "type": analysis_type}))
        .fields(&RERUN_FIELDS)
        .all_pages();
    let records = api.find_records(collections::WORKFLOW_EXECUTION_SET, &query).await?;
    latest_record(&records).cloned().ok_or_else(|| {
        MetadataError::NotFound(format!("No {} found with input {}.", analysis_type, raw_id))
    })
}
