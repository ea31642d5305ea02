//! Sheet checks and id resolution run before any workflow record is built.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::info;

use super::base::{file_name, list_files, GeneratorContext, GeneratorOptions};
use crate::app::lookup::{self, record_id};
use crate::constants::{collections, nmdc_types, URL_PROBE_LIMIT};
use crate::error::{MetadataError, Result};
use crate::observability::metrics;
use crate::parser::{parse_string_list, MetadataSheet, SheetRow, SAMPLE_COLUMN};
use crate::schema::{Database, Manifest};

pub const STUDY_COLUMNS: [&str; 2] = ["associated_studies", "biosample.associated_studies"];

/// Raw data urls come from `--raw-data-url` or a `raw_data_url` column.
pub fn require_raw_source(sheet: &MetadataSheet, opts: &GeneratorOptions) -> Result<()> {
    if opts.raw_data_url.is_none() && !sheet.has_column("raw_data_url") {
        return Err(MetadataError::Config(
            "A raw data URL is required: pass --raw-data-url or add a raw_data_url column.".to_string(),
        ));
    }
    Ok(())
}

pub fn require_study_column(sheet: &MetadataSheet) -> Result<()> {
    if STUDY_COLUMNS.iter().any(|c| sheet.has_column(c)) {
        Ok(())
    } else {
        Err(MetadataError::MissingColumns(vec![STUDY_COLUMNS[1].to_string()]))
    }
}

/// Column holding the raw file location used for url checks.
pub fn raw_url_column(sheet: &MetadataSheet) -> &'static str {
    if sheet.has_column("raw_data_url") {
        "raw_data_url"
    } else {
        "raw_data_file"
    }
}

/// The url of a row's raw data file, explicit or `raw base + file name`.
pub fn raw_data_url(row: &SheetRow, opts: &GeneratorOptions) -> Result<String> {
    if let Some(url) = row.get("raw_data_url") {
        return Ok(url.to_string());
    }
    let raw_file = Path::new(row.require("raw_data_file")?);
    Ok(format!("{}{}", opts.raw_base_url(), file_name(raw_file)?))
}

/// Collection an existing sample id belongs to, judged by its typecode
pub fn sample_collection(id: &str) -> &'static str {
    let local = id.split_once(':').map_or(id, |(_, rest)| rest);
    if local.starts_with("bsm-") {
        collections::BIOSAMPLE_SET
    } else {
        collections::PROCESSED_SAMPLE_SET
    }
}

/// Every pre-existing sample id must be in the biosample or processed sample collection.
pub async fn check_samples(ctx: &GeneratorContext, sheet: &MetadataSheet, opts: &GeneratorOptions) -> Result<()> {
    if opts.skip_sample_id_check {
        info!("Skipping sample id check");
        return Ok(());
    }
    let mut groups: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    for id in sheet.unique_values(SAMPLE_COLUMN) {
        groups.entry(sample_collection(&id)).or_default().push(id);
    }

    let mut problems = Vec::new();
    for (collection, ids) in &groups {
        let found = lookup::find_any_of(ctx.api(), collection, "id", ids, &["id"]).await?;
        let found: HashSet<&str> = found.iter().filter_map(record_id).collect();
        let missing: Vec<&str> = ids.iter().map(String::as_str).filter(|id| !found.contains(id)).collect();
        if !missing.is_empty() {
            problems.push(format!("The following sample ids do not exist in {}: {}", collection, missing.join(", ")));
        }
    }
    if !problems.is_empty() {
        return Err(MetadataError::InvalidInput(problems.join("; ")));
    }
    Ok(())
}

/// Mints one manifest per distinct `manifest_name` that has no id yet.
pub async fn assign_manifests(
    ctx: &mut GeneratorContext,
    sheet: &mut MetadataSheet,
    db: &mut Database,
) -> Result<()> {
    if sheet.has_column("manifest_id") && !sheet.any_missing("manifest_id") {
        return Ok(());
    }
    if !sheet.has_values("manifest_name") {
        info!("No manifests will be added.");
        return Ok(());
    }

    for name in sheet.unique_values("manifest_name") {
        let existing = sheet
            .rows()
            .iter()
            .filter(|r| r.get("manifest_name") == Some(name.as_str()))
            .find_map(|r| r.get("manifest_id"))
            .map(str::to_string);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = ctx.mint(nmdc_types::MANIFEST).await?;
                info!(manifest = %name, id = %id, "Generated manifest");
                db.manifest_set.push(Manifest::instrument_run(id.clone(), &name));
                id
            }
        };
        sheet.set_where("manifest_name", &name, "manifest_id", &id);
    }
    Ok(())
}

fn column_urls(sheet: &MetadataSheet, column: &str, opts: &GeneratorOptions) -> Result<Vec<String>> {
    let base = if column.contains("process") {
        opts.process_data_url.as_str()
    } else {
        opts.raw_base_url()
    };

    if column == "raw_data_url" {
        return Ok(sheet.unique_values(column));
    }

    let mut urls = Vec::new();
    if column.contains("directory") {
        for dir in sheet.unique_values(column) {
            for file in list_files(Path::new(&dir))? {
                let parent = file.parent().map(file_name).transpose()?.unwrap_or_default();
                urls.push(format!("{}{}/{}", base, parent, file_name(&file)?));
            }
        }
        if urls.is_empty() {
            return Err(MetadataError::InvalidInput(format!("No files found in {}", column)));
        }
    } else {
        for value in sheet.unique_values(column) {
            urls.push(format!("{}{}", base, file_name(Path::new(&value))?));
        }
    }
    Ok(urls)
}

/// Probes the first urls of each column and fails when any url is already registered.
pub async fn check_data_urls(
    ctx: &GeneratorContext,
    sheet: &MetadataSheet,
    opts: &GeneratorOptions,
    columns: &[&str],
) -> Result<()> {
    let mut all_urls = Vec::new();
    for column in columns {
        let urls = column_urls(sheet, column, opts)?;
        for url in urls.iter().take(URL_PROBE_LIMIT) {
            metrics::generation::url_checked();
            let status = ctx.api().url_status(url).await.map_err(|e| {
                MetadataError::InvalidInput(format!("URL {} is not accessible. Error: {}", url, e))
            })?;
            if status != 200 {
                return Err(MetadataError::InvalidInput(format!("URL {} is not accessible.", url)));
            }
        }
        all_urls.extend(urls);
    }

    let existing =
        lookup::find_any_of(ctx.api(), collections::DATA_OBJECT_SET, "url", &all_urls, &["id", "url"]).await?;
    if !existing.is_empty() {
        let found: Vec<&str> = existing
            .iter()
            .filter_map(|r| r.get("url").and_then(|u| u.as_str()).or_else(|| record_id(r)))
            .collect();
        return Err(MetadataError::InvalidInput(format!(
            "The following URLs already exist in the database: {}",
            found.join(", ")
        )));
    }
    Ok(())
}

async fn resolve_names(
    ctx: &GeneratorContext,
    sheet: &mut MetadataSheet,
    collection: &str,
    name_column: &str,
    id_column: &str,
    what: &str,
) -> Result<()> {
    for name in sheet.unique_values(name_column) {
        let id = lookup::require_id(ctx.api(), collection, "name", &name, what).await?;
        sheet.set_where(name_column, &name, id_column, &id);
    }
    Ok(())
}

/// Resolves instrument and configuration names to ids by exact name.
pub async fn resolve_mass_spec_fields(ctx: &GeneratorContext, sheet: &mut MetadataSheet) -> Result<()> {
    resolve_names(ctx, sheet, collections::INSTRUMENT_SET, "instrument_used", "instrument_id", "Instrument").await?;
    if sheet.has_column("chromat_configuration_name") {
        resolve_names(
            ctx,
            sheet,
            collections::CONFIGURATION_SET,
            "chromat_configuration_name",
            "lc_config_id",
            "Configuration",
        )
        .await?;
    }
    resolve_names(
        ctx,
        sheet,
        collections::CONFIGURATION_SET,
        "mass_spec_configuration_name",
        "mass_spec_configuration_id",
        "Configuration",
    )
    .await
}

pub fn associated_studies(row: &SheetRow) -> Result<Vec<String>> {
    match STUDY_COLUMNS.iter().find_map(|c| row.get(c)) {
        Some(raw) => parse_string_list(raw),
        None => Err(MetadataError::MissingValue { column: STUDY_COLUMNS[1].to_string(), row: row.number }),
    }
}

/// `processing_institution_{role}` when present, else `processing_institution`.
pub fn processing_institution(row: &SheetRow, role: &str) -> Option<String> {
    row.get(&format!("processing_institution_{}", role))
        .or_else(|| row.get("processing_institution"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(text: &str) -> MetadataSheet {
        MetadataSheet::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn samples_are_routed_by_typecode() {
        assert_eq!(sample_collection("nmdc:bsm-11-abc123"), collections::BIOSAMPLE_SET);
        assert_eq!(sample_collection("nmdc:procsm-11-bsm001"), collections::PROCESSED_SAMPLE_SET);
        assert_eq!(sample_collection("bsm-11-abc123"), collections::BIOSAMPLE_SET);
    }

    #[test]
    fn raw_source_is_required() {
        let s = sheet("raw_data_file\na.raw\n");
        assert!(require_raw_source(&s, &GeneratorOptions::default()).is_err());
        let opts = GeneratorOptions { raw_data_url: Some("https://x/".to_string()), ..Default::default() };
        assert!(require_raw_source(&s, &opts).is_ok());
        assert!(require_raw_source(&sheet("raw_data_url\nhttps://x/a.raw\n"), &GeneratorOptions::default()).is_ok());
    }

    #[test]
    fn raw_url_prefers_explicit_column() {
        let opts = GeneratorOptions { raw_data_url: Some("https://raw/".to_string()), ..Default::default() };
        let s = sheet("raw_data_file,raw_data_url\n/data/a.raw,https://elsewhere/a.raw\n/data/b.raw,\n");
        assert_eq!(raw_data_url(&s.rows()[0], &opts).unwrap(), "https://elsewhere/a.raw");
        assert_eq!(raw_data_url(&s.rows()[1], &opts).unwrap(), "https://raw/b.raw");
    }

    #[test]
    fn institution_overrides_by_role() {
        let s = sheet("processing_institution,processing_institution_workflow\nEMSL,NMDC\n");
        let row = &s.rows()[0];
        assert_eq!(processing_institution(row, "workflow").as_deref(), Some("NMDC"));
        assert_eq!(processing_institution(row, "generation").as_deref(), Some("EMSL"));
    }

    #[test]
    fn studies_from_either_column() {
        let s = sheet("biosample.associated_studies\n\"['nmdc:sty-11-a', 'nmdc:sty-11-b']\"\n");
        assert_eq!(associated_studies(&s.rows()[0]).unwrap(), vec!["nmdc:sty-11-a", "nmdc:sty-11-b"]);
        let s = sheet("other\nx\n");
        assert!(require_study_column(&s).is_err());
        assert!(associated_studies(&s.rows()[0]).is_err());
    }

    #[test]
    fn file_column_urls_use_raw_base() {
        let opts = GeneratorOptions { raw_data_url: Some("https://raw/".to_string()), ..Default::default() };
        let s = sheet("raw_data_file\n/data/a.raw\n/data/b.raw\n");
        assert_eq!(column_urls(&s, "raw_data_file", &opts).unwrap(), vec!["https://raw/a.raw", "https://raw/b.raw"]);
    }

    #[test]
    fn directory_urls_include_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("run_01");
        std::fs::create_dir(&run).unwrap();
        std::fs::write(run.join("out.csv"), "x").unwrap();
        let opts = GeneratorOptions { process_data_url: "https://proc/".to_string(), ..Default::default() };
        let s = sheet(&format!("processed_data_directory\n{}\n", run.display()));
        assert_eq!(
            column_urls(&s, "processed_data_directory", &opts).unwrap(),
            vec!["https://proc/run_01/out.csv"]
        );
    }
}
