//! LC-MS lipidomics and metabolomics metadata.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::base::{
    self, build_data_object, build_mass_spectrometry, build_metabolomics_analysis, AnalysisInput, DataObjectInput,
    GeneratorContext, GeneratorOptions, MassSpecInput,
};
use super::biosample::ensure_biosamples;
use super::checks;
use super::profile::LcmsProfile;
use super::MetadataGenerator;
use crate::constants::nmdc_types;
use crate::error::{MetadataError, Result};
use crate::observability::metrics;
use crate::parser::{MetadataSheet, SheetRow, SAMPLE_COLUMN};
use crate::schema::{DataObject, Database};

const UNIQUE_COLUMNS: [&str; 1] = ["processed_data_directory"];

const REQUIRED_COLUMNS: [&str; 7] = [
    "raw_data_file",
    "processed_data_directory",
    "mass_spec_configuration_name",
    "chromat_configuration_name",
    "instrument_used",
    "instrument_analysis_start_date",
    "instrument_analysis_end_date",
];

const PROCESSED_FILE_COUNT: usize = 3;

/// Data objects for one processed directory.
struct ProcessedOutputs {
    /// In directory order
    objects: Vec<DataObject>,
    parameter_id: String,
    output_ids: Vec<String>,
    window: (String, String),
}

pub struct LcmsGenerator {
    profile: &'static LcmsProfile,
    ctx: GeneratorContext,
    opts: GeneratorOptions,
}

impl LcmsGenerator {
    pub fn new(profile: &'static LcmsProfile, ctx: GeneratorContext, opts: GeneratorOptions) -> Self {
        Self { profile, ctx, opts }
    }

    async fn version(&self) -> Option<String> {
        base::resolve_workflow_version(
            self.ctx.api(),
            self.opts.workflow_version.as_deref(),
            self.profile.common.workflow_version_url,
        )
        .await
    }

    /// Classifies the three processed files by their first extension.
    async fn processed_outputs(&mut self, dir: &Path, analysis_id: &str) -> Result<ProcessedOutputs> {
        let files = base::list_files(dir)?;
        if files.is_empty() {
            return Err(MetadataError::InvalidInput(format!(
                "No files found in processed data directory: {}",
                dir.display()
            )));
        }
        if files.len() != PROCESSED_FILE_COUNT {
            return Err(MetadataError::InvalidInput(format!(
                "Expected {} files in the processed data directory {}, found {}.",
                PROCESSED_FILE_COUNT,
                dir.display(),
                files.len()
            )));
        }

        let base_url = base::processed_base_url(&self.opts.process_data_url, dir)?;
        let mut objects = Vec::new();
        let mut parameter_id = None;
        let mut output_ids = Vec::new();
        let mut window = None;

        let lcms = self.profile;
        for file in &files {
            let name = base::file_name(file)?;
            let extension = name.split('.').nth(1).unwrap_or_default().to_string();
            let profile = match extension.as_str() {
                "toml" => &lcms.parameters,
                "csv" => &lcms.annotations,
                "hdf5" => &lcms.processed,
                _ => {
                    return Err(MetadataError::InvalidInput(format!(
                        "Unexpected file type found for file {}.",
                        file.display()
                    )))
                }
            };
            let object = build_data_object(
                &mut self.ctx,
                DataObjectInput::new(file, profile, &base_url).generated_by(analysis_id),
            )
            .await?;

            match extension.as_str() {
                "toml" => parameter_id = Some(object.id.clone()),
                "hdf5" => {
                    window = Some(self.ctx.clock().file_window(file)?);
                    output_ids.push(object.id.clone());
                }
                _ => output_ids.push(object.id.clone()),
            }
            objects.push(object);
        }

        match (parameter_id, window) {
            (Some(parameter_id), Some(window)) if output_ids.len() == 2 => {
                Ok(ProcessedOutputs { objects, parameter_id, output_ids, window })
            }
            _ => Err(MetadataError::InvalidInput(format!(
                "Expected one toml, one csv and one hdf5 file in {}.",
                dir.display()
            ))),
        }
    }

    async fn process_row(&mut self, row: &SheetRow, version: &Option<String>, db: &mut Database) -> Result<()> {
        let raw_file = PathBuf::from(row.require("raw_data_file")?);
        let processed_dir = PathBuf::from(row.require("processed_data_directory")?);
        info!(row = row.number, raw_file = %raw_file.display(), "Generating LC-MS metadata");

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
        let raw = build_data_object(
            &mut self.ctx,
            DataObjectInput::new(&raw_file, &self.profile.raw_data, &raw_base)
                .url(row.get("raw_data_url"))
                .generated_by(&mass_spec.id)
                .manifest(row.get("manifest_id")),
        )
        .await?;

        let mut analysis = build_metabolomics_analysis(
            &mut self.ctx,
            &self.profile.common,
            self.profile.analysis_category,
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

        let outputs = self.processed_outputs(&processed_dir, &analysis.id).await?;
        analysis.has_input = vec![outputs.parameter_id.clone(), raw.id.clone()];
        analysis.has_input.extend(self.opts.existing_data_objects.iter().cloned());
        analysis.has_output = outputs.output_ids;
        analysis.started_at_time = Some(outputs.window.0);
        analysis.ended_at_time = Some(outputs.window.1);
        mass_spec.has_output = vec![raw.id.clone()];

        db.data_object_set.extend(outputs.objects);
        db.data_generation_set.push(mass_spec);
        db.data_object_set.push(raw);
        db.workflow_execution_set.push(analysis.into());
        metrics::generation::row_processed(self.profile.common.name);
        Ok(())
    }

    async fn reprocess_row(&mut self, row: &SheetRow, version: &Option<String>, db: &mut Database) -> Result<()> {
        let raw_file = PathBuf::from(row.require("raw_data_file")?);
        let processed_dir = PathBuf::from(row.require("processed_data_directory")?);
        info!(row = row.number, raw_file = %raw_file.display(), "Regenerating LC-MS workflow metadata");

        let raw_url = checks::raw_data_url(row, &self.opts)?;
        let raw_id = base::raw_data_object_id(self.ctx.api(), &raw_url).await?;
        let previous = base::previous_analysis(self.ctx.api(), &raw_id, nmdc_types::METABOLOMICS_ANALYSIS).await?;
        let previous_id = base::string_field(&previous, "id").unwrap_or_default();

        let mut analysis = build_metabolomics_analysis(
            &mut self.ctx,
            &self.profile.common,
            self.profile.analysis_category,
            AnalysisInput {
                raw_file_name: base::file_name(&raw_file)?,
                id: Some(base::increment_version(&previous_id)),
                was_informed_by: base::string_list(&previous, "was_informed_by"),
                processing_institution: base::string_field(&previous, "processing_institution"),
                execution_resource: base::string_field(&previous, "execution_resource"),
                version: version.clone(),
            },
        )
        .await?;

        let outputs = self.processed_outputs(&processed_dir, &analysis.id).await?;
        analysis.has_input = vec![outputs.parameter_id.clone(), raw_id];
        analysis.has_input.extend(self.opts.existing_data_objects.iter().cloned());
        analysis.has_output = outputs.output_ids;
        analysis.started_at_time = Some(outputs.window.0);
        analysis.ended_at_time = Some(outputs.window.1);

        db.data_object_set.extend(outputs.objects);
        db.workflow_execution_set.push(analysis.into());
        metrics::generation::row_processed(self.profile.common.name);
        Ok(())
    }
}

#[async_trait]
impl MetadataGenerator for LcmsGenerator {
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
        let raw_column = checks::raw_url_column(&sheet);
        checks::check_data_urls(&self.ctx, &sheet, &self.opts, &["processed_data_directory", raw_column]).await?;
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
