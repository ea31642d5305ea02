//! GC-MS metabolomics metadata, with FAMES calibrations and metabolite identifications.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::base::{
    self, build_data_object, build_mass_spectrometry, build_metabolomics_analysis, AnalysisInput, DataObjectInput,
    GeneratorContext, GeneratorOptions, MassSpecInput,
};
use super::biosample::ensure_biosamples;
use super::checks;
use super::profile::{GcmsProfile, GCMS_METABOLOMICS};
use super::MetadataGenerator;
use crate::app::lookup;
use crate::constants::{collections, nmdc_types, DEFAULT_CALIBRATION_STANDARD};
use crate::error::{MetadataError, Result};
use crate::observability::metrics;
use crate::parser::{MetadataSheet, SheetRow, SAMPLE_COLUMN};
use crate::schema::{CalibrationInformation, Database, MetaboliteIdentification};

const UNIQUE_COLUMNS: [&str; 1] = ["processed_data_file"];

const REQUIRED_COLUMNS: [&str; 7] = [
    "raw_data_file",
    "processed_data_file",
    "mass_spec_configuration_name",
    "chromat_configuration_name",
    "instrument_used",
    "instrument_analysis_start_date",
    "instrument_analysis_end_date",
];

const CALIBRATION_TARGET: &str = "retention_index";

const PEAK_INDEX: &str = "Peak Index";
const SIMILARITY_SCORE: &str = "Similarity Score";
const CHEBI_ID: &str = "Chebi ID";
const KEGG_ID: &str = "Kegg Compound ID";

pub struct GcmsGenerator {
    profile: &'static GcmsProfile,
    ctx: GeneratorContext,
    opts: GeneratorOptions,
}

impl GcmsGenerator {
    pub fn new(ctx: GeneratorContext, opts: GeneratorOptions) -> Self {
        Self { profile: &GCMS_METABOLOMICS, ctx, opts }
    }

    fn check_calibration_standard(&self) -> Result<()> {
        if self.opts.calibration_standard.eq_ignore_ascii_case(DEFAULT_CALIBRATION_STANDARD) {
            Ok(())
        } else {
            Err(MetadataError::InvalidInput("Only FAMES calibration is supported at this time.".to_string()))
        }
    }

    async fn version(&self) -> Option<String> {
        base::resolve_workflow_version(
            self.ctx.api(),
            self.opts.workflow_version.as_deref(),
            self.profile.common.workflow_version_url,
        )
        .await
    }

    async fn configuration_object_id(&self) -> Result<String> {
        lookup::require_id(
            self.ctx.api(),
            collections::DATA_OBJECT_SET,
            "name",
            &self.opts.configuration_file_name,
            "Configuration file",
        )
        .await
    }

    /// One calibration data object and record per distinct `calibration_file`,
    /// unless the sheet already names calibrations.
    async fn generate_calibrations(&mut self, sheet: &mut MetadataSheet, db: &mut Database) -> Result<()> {
        if sheet.has_values("calibration_id") {
            return Ok(());
        }
        sheet.require_columns(&["calibration_file"])?;

        let raw_base = self.opts.raw_base_url().to_string();
        for calibration_file in sheet.unique_values("calibration_file") {
            let url = sheet
                .rows()
                .iter()
                .filter(|r| r.get("calibration_file") == Some(calibration_file.as_str()))
                .find_map(|r| r.get("calibration_file_url"))
                .map(str::to_string);
            let path = PathBuf::from(&calibration_file);
            let object = build_data_object(
                &mut self.ctx,
                DataObjectInput::new(&path, &self.profile.raw_data, &raw_base).url(url.as_deref()),
            )
            .await?;

            let id = self.ctx.mint(nmdc_types::CALIBRATION_INFORMATION).await?;
            let calibration = CalibrationInformation::new(
                id,
                format!("GC/MS FAMES calibration ({})", object.name),
                format!("Full scan GC/MS FAMES calibration run ({}).", object.name),
                CALIBRATION_TARGET,
                DEFAULT_CALIBRATION_STANDARD,
                &object.id,
            );
            info!(file = %calibration_file, id = %calibration.id, "Generated calibration");
            sheet.set_where("calibration_file", &calibration_file, "calibration_id", &calibration.id);
            db.data_object_set.push(object);
            db.calibration_set.push(calibration);
        }
        Ok(())
    }

    async fn process_row(
        &mut self,
        row: &SheetRow,
        configuration_id: &str,
        version: &Option<String>,
        db: &mut Database,
    ) -> Result<()> {
        let raw_file = PathBuf::from(row.require("raw_data_file")?);
        let processed_file = PathBuf::from(row.require("processed_data_file")?);
        let calibration_id = row.get("calibration_id").map(str::to_string);
        info!(row = row.number, raw_file = %raw_file.display(), "Generating GC-MS metadata");

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
                calibration_id: calibration_id.clone(),
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
        mass_spec.has_output = vec![raw.id.clone()];

        let identifications = metabolite_identifications(&processed_file)?;
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
        analysis.has_input = vec![configuration_id.to_string(), raw.id.clone()];
        analysis.uses_calibration = calibration_id;
        analysis.has_metabolite_identifications = identifications;

        let processed = build_data_object(
            &mut self.ctx,
            DataObjectInput::new(&processed_file, &self.profile.results, &self.opts.process_data_url)
                .generated_by(&analysis.id),
        )
        .await?;
        let (started, ended) = self.ctx.clock().file_window(&processed_file)?;
        analysis.has_output = vec![processed.id.clone()];
        analysis.started_at_time = Some(started);
        analysis.ended_at_time = Some(ended);

        db.data_generation_set.push(mass_spec);
        db.data_object_set.push(raw);
        db.data_object_set.push(processed);
        db.workflow_execution_set.push(analysis.into());
        metrics::generation::row_processed(self.profile.common.name);
        Ok(())
    }

    async fn reprocess_row(
        &mut self,
        row: &SheetRow,
        configuration_id: &str,
        version: &Option<String>,
        db: &mut Database,
    ) -> Result<()> {
        let raw_file = PathBuf::from(row.require("raw_data_file")?);
        let processed_file = PathBuf::from(row.require("processed_data_file")?);
        info!(row = row.number, raw_file = %raw_file.display(), "Regenerating GC-MS workflow metadata");

        let raw_url = checks::raw_data_url(row, &self.opts)?;
        let raw_id = base::raw_data_object_id(self.ctx.api(), &raw_url).await?;
        let previous = base::previous_analysis(self.ctx.api(), &raw_id, nmdc_types::METABOLOMICS_ANALYSIS).await?;
        let analysis_id = base::increment_version(&base::string_field(&previous, "id").unwrap_or_default());

        let processed = build_data_object(
            &mut self.ctx,
            DataObjectInput::new(&processed_file, &self.profile.results, &self.opts.process_data_url)
                .generated_by(&analysis_id),
        )
        .await?;

        let mut analysis = build_metabolomics_analysis(
            &mut self.ctx,
            &self.profile.common,
            self.profile.analysis_category,
            AnalysisInput {
                raw_file_name: base::file_name(&raw_file)?,
                id: Some(analysis_id),
                was_informed_by: base::string_list(&previous, "was_informed_by"),
                processing_institution: base::string_field(&previous, "processing_institution"),
                execution_resource: base::string_field(&previous, "execution_resource"),
                version: version.clone(),
            },
        )
        .await?;
        let (started, ended) = self.ctx.clock().file_window(&processed_file)?;
        analysis.has_input = vec![configuration_id.to_string(), raw_id];
        analysis.has_output = vec![processed.id.clone()];
        analysis.uses_calibration = base::string_list(&previous, "uses_calibration").into_iter().next();
        analysis.has_metabolite_identifications = metabolite_identifications(&processed_file)?;
        analysis.started_at_time = Some(started);
        analysis.ended_at_time = Some(ended);

        db.data_object_set.push(processed);
        db.workflow_execution_set.push(analysis.into());
        metrics::generation::row_processed(self.profile.common.name);
        Ok(())
    }
}

#[async_trait]
impl MetadataGenerator for GcmsGenerator {
    fn name(&self) -> &'static str {
        self.profile.common.name
    }

    async fn run(&mut self) -> Result<Database> {
        self.check_calibration_standard()?;
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
        let raw_column = checks::raw_url_column(&sheet);
        checks::check_data_urls(&self.ctx, &sheet, &self.opts, &["processed_data_file", raw_column]).await?;
        let configuration_id = self.configuration_object_id().await?;
        self.generate_calibrations(&mut sheet, &mut db).await?;
        checks::assign_manifests(&mut self.ctx, &mut sheet, &mut db).await?;
        checks::resolve_mass_spec_fields(&self.ctx, &mut sheet).await?;

        let version = self.version().await;
        for row in sheet.rows() {
            self.process_row(row, &configuration_id, &version, &mut db).await?;
        }
        info!(generator = self.name(), rows = sheet.len(), "Metadata generation complete");
        Ok(db)
    }

    async fn rerun(&mut self) -> Result<Database> {
        self.check_calibration_standard()?;
        let sheet = MetadataSheet::from_path(&self.opts.metadata_file)?;
        checks::require_raw_source(&sheet, &self.opts)?;
        for column in UNIQUE_COLUMNS {
            sheet.check_unique(column)?;
        }
        sheet.require_columns(&["raw_data_file", "processed_data_file"])?;
        checks::check_data_urls(&self.ctx, &sheet, &self.opts, &UNIQUE_COLUMNS).await?;
        let configuration_id = self.configuration_object_id().await?;

        let version = self.version().await;
        let mut db = Database::new();
        for row in sheet.rows() {
            self.reprocess_row(row, &configuration_id, &version, &mut db).await?;
        }
        info!(generator = self.name(), rows = sheet.len(), "Rerun metadata generation complete");
        Ok(db)
    }
}

fn parse_number(row: &SheetRow, column: &str) -> Result<Option<f64>> {
    row.get(column)
        .map(|raw| {
            raw.parse::<f64>().map_err(|_| {
                MetadataError::InvalidInput(format!("Invalid number '{}' for '{}' in row {}", raw, column, row.number))
            })
        })
        .transpose()
}

/// Best-scoring hit per peak, as metabolite identifications in peak order.
pub fn metabolite_identifications(processed_file: &Path) -> Result<Vec<MetaboliteIdentification>> {
    let sheet = MetadataSheet::from_path(processed_file)?;
    sheet.require_columns(&[PEAK_INDEX, SIMILARITY_SCORE])?;

    let mut best: BTreeMap<i64, (f64, &SheetRow)> = BTreeMap::new();
    for row in sheet.rows() {
        let Some(score) = parse_number(row, SIMILARITY_SCORE)? else {
            continue;
        };
        let Some(peak) = parse_number(row, PEAK_INDEX)? else {
            continue;
        };
        let peak = peak as i64;
        match best.get(&peak) {
            Some((top, _)) if *top >= score => {}
            _ => {
                best.insert(peak, (score, row));
            }
        }
    }

    let mut identifications = Vec::new();
    for (score, row) in best.into_values() {
        let Some(chebi) = parse_number(row, CHEBI_ID)? else {
            continue;
        };
        let kegg: BTreeSet<String> = row
            .get(KEGG_ID)
            .map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(|id| format!("kegg:{}", id))
                    .collect()
            })
            .unwrap_or_default();
        identifications.push(MetaboliteIdentification {
            metabolite_identified: format!("chebi:{}", chebi as i64),
            alternative_identifiers: kegg.into_iter().collect(),
            highest_similarity_score: Some(score),
            r#type: nmdc_types::METABOLITE_IDENTIFICATION.to_string(),
        });
    }
    Ok(identifications)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_hit_per_peak_becomes_identification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        std::fs::write(
            &path,
            "Peak Index,Similarity Score,Chebi ID,Kegg Compound ID\n\
             2,0.91,16236.0,C00469\n\
             1,0.80,15365,C01405 | C00001\n\
             1,0.95,17234,C00031|C00293\n\
             1,0.95,99999,C99999\n\
             3,,12345,C12345\n\
             4,0.70,,C00002\n",
        )
        .unwrap();

        let ids = metabolite_identifications(&path).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].metabolite_identified, "chebi:17234");
        assert_eq!(ids[0].alternative_identifiers, vec!["kegg:C00031", "kegg:C00293"]);
        assert_eq!(ids[0].highest_similarity_score, Some(0.95));
        assert_eq!(ids[1].metabolite_identified, "chebi:16236");
        assert_eq!(ids[1].alternative_identifiers, vec!["kegg:C00469"]);
    }
}
