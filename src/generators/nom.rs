//! Natural organic matter metadata for direct-infusion and LC FT-ICR MS.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use super::base::{
    self, build_data_object, build_mass_spectrometry, build_nom_analysis, AnalysisInput, DataObjectInput,
    GeneratorContext, GeneratorOptions, MassSpecInput,
};
use super::biosample::ensure_biosamples;
use super::checks;
use super::profile::NomProfile;
use super::MetadataGenerator;
use crate::app::lookup;
use crate::constants::{collections, nmdc_types, RAW_DATA_CATEGORY};
use crate::error::{MetadataError, Result};
use crate::observability::metrics;
use crate::parser::{MetadataSheet, SheetRow, SAMPLE_COLUMN};
use crate::schema::{CalibrationInformation, DataObject, Database, NomAnalysis};

const UNIQUE_COLUMNS: [&str; 1] = ["processed_data_directory"];

const REQUIRED_COLUMNS: [&str; 6] = [
    "raw_data_file",
    "processed_data_directory",
    "mass_spec_configuration_name",
    "instrument_used",
    "instrument_analysis_start_date",
    "instrument_analysis_end_date",
];

const SRFA_COLUMNS: [&str; 2] = ["srfa_calib_id", "srfa_calib_path"];
const SRFA_TARGET: &str = "mass_charge_ratio";
const SRFA_STANDARD: &str = "srfa";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QcStatus {
    Pass,
    Fail,
}

impl QcStatus {
    fn parse(raw: &str, row: usize) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "pass" => Ok(QcStatus::Pass),
            "fail" => Ok(QcStatus::Fail),
            other => Err(MetadataError::InvalidInput(format!(
                "Invalid qc_status '{}' in row {}: expected 'pass' or 'fail'",
                other, row
            ))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            QcStatus::Pass => "pass",
            QcStatus::Fail => "fail",
        }
    }
}

struct ProcessedOutputs {
    /// Result and QC plot objects, in directory order
    outputs: Vec<DataObject>,
    parameters: DataObject,
    window: Option<(String, String)>,
}

pub struct NomGenerator {
    profile: &'static NomProfile,
    ctx: GeneratorContext,
    opts: GeneratorOptions,
    /// SRFA calibration ids by calibration file path, for this run
    srfa_calibrations: HashMap<String, String>,
}

impl NomGenerator {
    pub fn new(profile: &'static NomProfile, ctx: GeneratorContext, opts: GeneratorOptions) -> Self {
        Self { profile, ctx, opts, srfa_calibrations: HashMap::new() }
    }

    async fn version(&self) -> Option<String> {
        base::resolve_workflow_version(
            self.ctx.api(),
            self.opts.workflow_version.as_deref(),
            self.profile.common.workflow_version_url,
        )
        .await
    }

    fn raw_description(&self, instrument: &str) -> String {
        format!("Raw {} {} data.", instrument, self.profile.common.eluent_words())
    }

    /// Calibration whose data object has the same MD5 as the local reference file.
    async fn reference_calibration(&self, row: &SheetRow) -> Result<Option<String>> {
        if let Some(id) = row.get("calibration_id") {
            return Ok(Some(id.to_string()));
        }
        let Some(path) = row.get("ref_calibration_path") else {
            return Ok(None);
        };
        let md5 = base::md5_hex(Path::new(path))?;
        let not_found =
            || MetadataError::NotFound(format!("Calibration object not found for file {} with MD5 {}", path, md5));
        let object_id = lookup::find_id(self.ctx.api(), collections::DATA_OBJECT_SET, "md5_checksum", &md5, true)
            .await?
            .ok_or_else(not_found)?;
        let calibration_id =
            lookup::find_id(self.ctx.api(), collections::CALIBRATION_SET, "calibration_object", &object_id, true)
                .await?
                .ok_or_else(not_found)?;
        Ok(Some(calibration_id))
    }

    async fn existing_srfa_calibration(&self, stem: &str) -> Result<Option<String>> {
        let Some(object_id) =
            lookup::find_id(self.ctx.api(), collections::DATA_OBJECT_SET, "name", &regex::escape(stem), false)
                .await?
        else {
            return Ok(None);
        };
        lookup::find_id(self.ctx.api(), collections::CALIBRATION_SET, "calibration_object", &object_id, true).await
    }

    /// SRFA calibration from `srfa_calib_id`, else found or generated from `srfa_calib_path`.
    async fn srfa_calibration(&mut self, row: &SheetRow, db: &mut Database) -> Result<Option<String>> {
        if let Some(id) = row.get("srfa_calib_id") {
            return Ok(Some(id.to_string()));
        }
        let Some(path) = row.get("srfa_calib_path") else {
            return Ok(None);
        };
        if let Some(id) = self.srfa_calibrations.get(path) {
            return Ok(Some(id.clone()));
        }

        let file = PathBuf::from(path);
        let id = match self.existing_srfa_calibration(&base::file_stem(&file)?).await? {
            Some(id) => id,
            None => {
                let instrument = row.require("instrument_used")?.to_string();
                let raw_base = self.opts.raw_base_url().to_string();
                let description = self.raw_description(&instrument);
                let object = build_data_object(
                    &mut self.ctx,
                    DataObjectInput::with_type(
                        &file,
                        RAW_DATA_CATEGORY,
                        self.profile.raw_data_object_type,
                        &raw_base,
                    )
                    .description(description)
                    .url(row.get("calibration_file_url")),
                )
                .await?;
                let calibration = CalibrationInformation::new(
                    self.ctx.mint(nmdc_types::CALIBRATION_INFORMATION).await?,
                    format!("SRFA calibration ({})", object.name),
                    format!("FT-ICR SRFA calibration run ({}).", object.name),
                    SRFA_TARGET,
                    SRFA_STANDARD,
                    &object.id,
                );
                info!(file = %path, id = %calibration.id, "Generated SRFA calibration");
                let id = calibration.id.clone();
                db.data_object_set.push(object);
                db.calibration_set.push(calibration);
                id
            }
        };
        self.srfa_calibrations.insert(path.to_string(), id.clone());
        Ok(Some(id))
    }

    /// Results, parameter file and QC plots of one processed directory, by last extension.
    async fn processed_outputs(&mut self, dir: &Path, analysis_id: &str) -> Result<ProcessedOutputs> {
        let files = base::list_files(dir)?;
        let base_url = base::processed_base_url(&self.opts.process_data_url, dir)?;
        let nom = self.profile;

        let mut outputs = Vec::new();
        let mut parameters = None;
        let mut window = None;
        for file in &files {
            let extension = file.extension().and_then(|e| e.to_str()).unwrap_or_default();
            let profile = match extension {
                "csv" => &nom.results,
                "json" | "toml" => &nom.parameters,
                "png" => &nom.qc_plots,
                _ => continue,
            };
            let object = build_data_object(
                &mut self.ctx,
                DataObjectInput::new(file, profile, &base_url).generated_by(analysis_id),
            )
            .await?;
            match extension {
                "json" | "toml" => parameters = Some(object),
                "csv" => {
                    window = Some(self.ctx.clock().file_window(file)?);
                    outputs.push(object);
                }
                _ => outputs.push(object),
            }
        }

        let parameters = parameters.ok_or_else(|| {
            MetadataError::InvalidInput(format!(
                "No workflow parameter file found in processed data directory: {}",
                dir.display()
            ))
        })?;
        Ok(ProcessedOutputs { outputs, parameters, window })
    }

    fn qc(row: &SheetRow) -> Result<(Option<QcStatus>, Option<String>)> {
        let status = row.get("qc_status").map(|s| QcStatus::parse(s, row.number)).transpose()?;
        Ok((status, row.get("qc_comment").map(str::to_string)))
    }

    /// Attaches outputs to the analysis; a failed QC keeps only the parameter file.
    fn finish(
        analysis: &mut NomAnalysis,
        raw_id: String,
        processed: ProcessedOutputs,
        qc_status: Option<QcStatus>,
        db: &mut Database,
    ) -> DataObject {
        analysis.has_input = vec![processed.parameters.id.clone(), raw_id];
        analysis.qc_status = qc_status.map(|s| s.as_str().to_string());
        if let Some((started, ended)) = processed.window {
            analysis.started_at_time = Some(started);
            analysis.ended_at_time = Some(ended);
        }

        let output_ids: Vec<String> = processed.outputs.iter().map(|o| o.id.clone()).collect();
        db.data_object_set.extend(processed.outputs);
        if qc_status == Some(QcStatus::Fail) {
            warn!(analysis = %analysis.id, "QC failed, dropping workflow outputs");
            db.remove_data_objects(&output_ids);
        } else {
            analysis.has_output = output_ids;
        }
        processed.parameters
    }

    async fn process_row(&mut self, row: &SheetRow, version: &Option<String>, db: &mut Database) -> Result<()> {
        let raw_file = PathBuf::from(row.require("raw_data_file")?);
        let processed_dir = PathBuf::from(row.require("processed_data_directory")?);
        let instrument = row.require("instrument_used")?.to_string();
        info!(row = row.number, raw_file = %raw_file.display(), "Generating NOM metadata");

        let mut mass_spec = build_mass_spectrometry(
            &mut self.ctx,
            &self.profile.common,
            MassSpecInput {
                raw_file: raw_file.clone(),
                sample_id: row.require(SAMPLE_COLUMN)?.to_string(),
                instrument_id: row.require("instrument_id")?.to_string(),
                mass_spec_configuration_id: row.require("mass_spec_configuration_id")?.to_string(),
                chromatography_configuration_id: row.get("lc_config_id").map(str::to_string),
                associated_studies: checks::associated_studies(row)?,
                processing_institution: checks::processing_institution(row, "generation"),
                start_date: row.get("instrument_analysis_start_date").map(str::to_string),
                end_date: row.get("instrument_analysis_end_date").map(str::to_string),
                instrument_instance_specifier: row.get("instrument_instance_specifier").map(str::to_string),
                calibration_id: None,
            },
        )
        .await?;

        let raw_base = self.opts.raw_base_url().to_string();
        let description = self.raw_description(&instrument);
        let raw = build_data_object(
            &mut self.ctx,
            DataObjectInput::with_type(&raw_file, RAW_DATA_CATEGORY, self.profile.raw_data_object_type, &raw_base)
                .description(description)
                .url(row.get("raw_data_url"))
                .generated_by(&mass_spec.id)
                .manifest(row.get("manifest_id")),
        )
        .await?;
        mass_spec.has_output = vec![raw.id.clone()];

        let mut calibrations = Vec::new();
        calibrations.extend(self.reference_calibration(row).await?);
        calibrations.extend(self.srfa_calibration(row, db).await?);
        let (qc_status, qc_comment) = Self::qc(row)?;

        let mut analysis = build_nom_analysis(
            &mut self.ctx,
            &self.profile.common,
            AnalysisInput {
                raw_file_name: raw.name.clone(),
                id: None,
                was_informed_by: vec![mass_spec.id.clone()],
                processing_institution: checks::processing_institution(row, "workflow"),
                execution_resource: row.get("execution_resource").map(str::to_string),
                version: version.clone(),
            },
        )
        .await?;
        analysis.uses_calibration = calibrations;
        analysis.qc_comment = qc_comment;

        let processed = self.processed_outputs(&processed_dir, &analysis.id).await?;
        let parameters = Self::finish(&mut analysis, raw.id.clone(), processed, qc_status, db);

        db.data_generation_set.push(mass_spec);
        db.data_object_set.push(raw);
        db.data_object_set.push(parameters);
        db.workflow_execution_set.push(analysis.into());
        metrics::generation::row_processed(self.profile.common.name);
        Ok(())
    }

    async fn reprocess_row(&mut self, row: &SheetRow, version: &Option<String>, db: &mut Database) -> Result<()> {
        let raw_file = PathBuf::from(row.require("raw_data_file")?);
        let processed_dir = PathBuf::from(row.require("processed_data_directory")?);
        info!(row = row.number, raw_file = %raw_file.display(), "Regenerating NOM workflow metadata");

        let raw_url = checks::raw_data_url(row, &self.opts)?;
        let raw_id = base::raw_data_object_id(self.ctx.api(), &raw_url).await?;
        let previous = base::previous_analysis(self.ctx.api(), &raw_id, nmdc_types::NOM_ANALYSIS).await?;
        let (qc_status, qc_comment) = Self::qc(row)?;

        let mut analysis = build_nom_analysis(
            &mut self.ctx,
            &self.profile.common,
            AnalysisInput {
                raw_file_name: base::file_name(&raw_file)?,
                id: Some(base::increment_version(&base::string_field(&previous, "id").unwrap_or_default())),
                was_informed_by: base::string_list(&previous, "was_informed_by"),
                processing_institution: base::string_field(&previous, "processing_institution"),
                execution_resource: base::string_field(&previous, "execution_resource"),
                version: version.clone(),
            },
        )
        .await?;
        analysis.uses_calibration = base::string_list(&previous, "uses_calibration");
        analysis.qc_comment = qc_comment;

        let processed = self.processed_outputs(&processed_dir, &analysis.id).await?;
        let parameters = Self::finish(&mut analysis, raw_id, processed, qc_status, db);

        db.data_object_set.push(parameters);
        db.workflow_execution_set.push(analysis.into());
        metrics::generation::row_processed(self.profile.common.name);
        Ok(())
    }
}

#[async_trait]
impl MetadataGenerator for NomGenerator {
    fn name(&self) -> &'static str {
        self.profile.common.name
    }

    async fn run(&mut self) -> Result<Database> {
        let mut sheet = MetadataSheet::from_path(&self.opts.metadata_file)?;
        checks::require_raw_source(&sheet, &self.opts)?;
        for column in UNIQUE_COLUMNS {
            sheet.check_unique(column)?;
        }
        sheet.require_columns(&REQUIRED_COLUMNS)?;
        checks::require_study_column(&sheet)?;
        checks::check_samples(&self.ctx, &sheet, &self.opts).await?;

        let mut db = Database::new();
        ensure_biosamples(&mut self.ctx, &mut sheet, &mut db).await?;
        checks::assign_manifests(&mut self.ctx, &mut sheet, &mut db).await?;
        checks::check_data_urls(&self.ctx, &sheet, &self.opts, &UNIQUE_COLUMNS).await?;
        if !SRFA_COLUMNS.iter().any(|c| sheet.has_column(c)) {
            info!("No SRFA calibration columns found; SRFA calibrations will not be attached.");
        }
        checks::resolve_mass_spec_fields(&self.ctx, &mut sheet).await?;

        let version = self.version().await;
        for row in sheet.rows() {
            self.process_row(row, &version, &mut db).await?;
        }
        info!(generator = self.name(), rows = sheet.len(), "Metadata generation complete");
        Ok(db)
    }

    async fn rerun(&mut self) -> Result<Database> {
        let sheet = MetadataSheet::from_path(&self.opts.metadata_file)?;
        checks::require_raw_source(&sheet, &self.opts)?;
        for column in UNIQUE_COLUMNS {
            sheet.check_unique(column)?;
        }
        sheet.require_columns(&["raw_data_file", "processed_data_directory"])?;
        checks::check_data_urls(&self.ctx, &sheet, &self.opts, &UNIQUE_COLUMNS).await?;

        let version = self.version().await;
        let mut db = Database::new();
        for row in sheet.rows() {
            self.reprocess_row(row, &version, &mut db).await?;
        }
        info!(generator = self.name(), rows = sheet.len(), "Rerun metadata generation complete");
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qc_status_is_case_insensitive() {
        assert_eq!(QcStatus::parse("PASS", 1).unwrap(), QcStatus::Pass);
        assert_eq!(QcStatus::parse("Fail", 1).unwrap(), QcStatus::Fail);
        let err = QcStatus::parse("maybe", 3).unwrap_err();
        assert!(err.to_string().contains("row 3"));
    }
}
