mod common;

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::tempdir;

use common::{context, path_string, resource, write_sheet, StubNmdcApi};
use nmdc_ms_metadata::error::MetadataError;
use nmdc_ms_metadata::generators::profile::LCMS_LIPIDOMICS;
use nmdc_ms_metadata::generators::{create_generator, GeneratorKind, GeneratorOptions};
use nmdc_ms_metadata::validation::validate_database;

const RAW_URL: &str = "https://nmdcdemo.emsl.pnnl.gov/lipidomics/raw/";
const PROCESS_URL: &str = "https://nmdcdemo.emsl.pnnl.gov/lipidomics/processed/";

const HEADER: [&str; 13] = [
    "sample_id",
    "associated_studies",
    "raw_data_file",
    "processed_data_directory",
    "mass_spec_configuration_name",
    "chromat_configuration_name",
    "instrument_used",
    "instrument_analysis_start_date",
    "instrument_analysis_end_date",
    "processing_institution",
    "execution_resource",
    "manifest_name",
    "instrument_instance_specifier",
];

fn lipid_row(processed_dir: &str) -> Vec<String> {
    vec![
        "nmdc:bsm-11-abc123".to_string(),
        "['nmdc:sty-11-xyz789']".to_string(),
        path_string(&resource("lcms_lipid/raw/Lipid_Sample_01.raw")),
        processed_dir.to_string(),
        "EMSL lipidomics DDA mass spectrometry method, positive".to_string(),
        "EMSL LC method for lipidomics".to_string(),
        "Orbitrap Exploris 480".to_string(),
        "2024-01-10".to_string(),
        "2024-01-11".to_string(),
        "EMSL".to_string(),
        "EMSL-RZR".to_string(),
        "lipid run 1".to_string(),
        String::new(),
    ]
}

fn stub_api() -> StubNmdcApi {
    StubNmdcApi::new()
        .with_record("biosample_set", json!({"id": "nmdc:bsm-11-abc123"}))
        .with_record("instrument_set", json!({"id": "nmdc:inst-14-mwrrj632", "name": "Orbitrap Exploris 480"}))
        .with_record(
            "configuration_set",
            json!({"id": "nmdc:msconf-11-abc001", "name": "EMSL lipidomics DDA mass spectrometry method, positive"}),
        )
        .with_record("configuration_set", json!({"id": "nmdc:chrcon-11-xyz001", "name": "EMSL LC method for lipidomics"}))
        .with_text(LCMS_LIPIDOMICS.common.workflow_version_url, "[bumpversion]\ncurrent_version = 1.2.3\n")
}

fn options(metadata_file: std::path::PathBuf) -> GeneratorOptions {
    GeneratorOptions {
        metadata_file,
        process_data_url: PROCESS_URL.to_string(),
        raw_data_url: Some(RAW_URL.to_string()),
        ..Default::default()
    }
}

fn processed_dir() -> String {
    path_string(&resource("lcms_lipid/processed/Lipid_Sample_01"))
}

#[tokio::test]
async fn lipidomics_run_matches_golden_database() -> Result<()> {
    let dir = tempdir()?;
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &[lipid_row(&processed_dir())]);
    let api = Arc::new(stub_api());

    let mut generator = create_generator(GeneratorKind::LcmsLipid, context(api.clone()), options(sheet));
    let db = generator.run().await?;
    let actual = db.to_value()?;

    let expected: Value =
        serde_json::from_str(&std::fs::read_to_string(resource("lcms_lipid/expected_database.json"))?)?;
    assert_eq!(actual, expected);
    validate_database(&actual)?;

    // processed files and the raw file are probed before anything is minted
    let probed = api.probed_urls();
    assert_eq!(probed.len(), 4);
    assert!(probed.contains(&format!("{}Lipid_Sample_01.raw", RAW_URL)));
    assert!(probed.contains(&format!("{}Lipid_Sample_01/Lipid_Sample_01_params.toml", PROCESS_URL)));
    Ok(())
}

#[tokio::test]
async fn existing_data_objects_extend_analysis_inputs() -> Result<()> {
    let dir = tempdir()?;
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &[lipid_row(&processed_dir())]);
    let api = Arc::new(stub_api());
    let opts = GeneratorOptions {
        existing_data_objects: vec!["nmdc:dobj-11-extra1".to_string()],
        workflow_version: Some("9.9.9".to_string()),
        ..options(sheet)
    };

    let db = create_generator(GeneratorKind::LcmsLipid, context(api), opts).run().await?;
    let analysis = &db.to_value()?["workflow_execution_set"][0];
    assert_eq!(analysis["has_input"], json!(["nmdc:dobj-13-000004", "nmdc:dobj-13-000001", "nmdc:dobj-11-extra1"]));
    assert_eq!(analysis["version"], json!("9.9.9"));
    Ok(())
}

#[tokio::test]
async fn metabolomics_profile_changes_only_constants() -> Result<()> {
    let dir = tempdir()?;
    let sheet = write_sheet(dir.path(), "metab.csv", &HEADER, &[lipid_row(&processed_dir())]);
    let api = Arc::new(stub_api());

    let db = create_generator(GeneratorKind::LcmsMetab, context(api), options(sheet)).run().await?;
    let value = db.to_value()?;
    assert_eq!(value["data_generation_set"][0]["analyte_category"], json!("metabolome"));
    assert_eq!(value["workflow_execution_set"][0]["metabolomics_analysis_category"], json!("lc_ms_metabolomics"));
    assert_eq!(value["workflow_execution_set"][0]["name"], json!("Metabolomics analysis for Lipid_Sample_01.raw"));
    // version file for this profile is not stubbed
    assert!(value["workflow_execution_set"][0].get("version").is_none());
    Ok(())
}

#[tokio::test]
async fn processed_directory_must_hold_three_files() -> Result<()> {
    let dir = tempdir()?;
    let processed = dir.path().join("Lipid_Sample_01");
    std::fs::create_dir(&processed)?;
    std::fs::write(processed.join("Lipid_Sample_01.csv"), "a")?;
    std::fs::write(processed.join("Lipid_Sample_01.hdf5"), "b")?;
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &[lipid_row(&path_string(&processed))]);

    let err = create_generator(GeneratorKind::LcmsLipid, context(Arc::new(stub_api())), options(sheet))
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Expected 3 files in the processed data directory"));
    Ok(())
}

#[tokio::test]
async fn duplicate_processed_directories_are_rejected() -> Result<()> {
    let dir = tempdir()?;
    let rows = [lipid_row(&processed_dir()), lipid_row(&processed_dir())];
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &rows);

    let err = create_generator(GeneratorKind::LcmsLipid, context(Arc::new(stub_api())), options(sheet))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, MetadataError::DuplicateValues(c) if c == "processed_data_directory"));
    Ok(())
}

#[tokio::test]
async fn registered_urls_stop_generation() -> Result<()> {
    let dir = tempdir()?;
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &[lipid_row(&processed_dir())]);
    let raw_url = format!("{}Lipid_Sample_01.raw", RAW_URL);
    let api = stub_api().with_record("data_object_set", json!({"id": "nmdc:dobj-11-old001", "url": raw_url}));

    let err = create_generator(GeneratorKind::LcmsLipid, context(Arc::new(api)), options(sheet))
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already exist in the database"));
    assert!(err.to_string().contains(&raw_url));
    Ok(())
}

#[tokio::test]
async fn inaccessible_url_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &[lipid_row(&processed_dir())]);
    let raw_url = format!("{}Lipid_Sample_01.raw", RAW_URL);
    let api = stub_api().with_url_status(&raw_url, 404);

    let err = create_generator(GeneratorKind::LcmsLipid, context(Arc::new(api)), options(sheet))
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), format!("Invalid input: URL {} is not accessible.", raw_url));
    Ok(())
}

#[tokio::test]
async fn unknown_samples_are_listed() -> Result<()> {
    let dir = tempdir()?;
    let mut row = lipid_row(&processed_dir());
    row[0] = "nmdc:bsm-11-missing".to_string();
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &[row.clone()]);

    let err = create_generator(GeneratorKind::LcmsLipid, context(Arc::new(stub_api())), options(sheet.clone()))
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("nmdc:bsm-11-missing"));

    // the check can be skipped for samples registered elsewhere
    let opts = GeneratorOptions { skip_sample_id_check: true, ..options(sheet) };
    let db = create_generator(GeneratorKind::LcmsLipid, context(Arc::new(stub_api())), opts).run().await?;
    assert_eq!(db.data_generation_set[0].has_input, vec!["nmdc:bsm-11-missing"]);
    Ok(())
}

#[tokio::test]
async fn unknown_instrument_is_not_found() -> Result<()> {
    let dir = tempdir()?;
    let mut row = lipid_row(&processed_dir());
    row[6] = "Velos Pro".to_string();
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &[row]);

    let err = create_generator(GeneratorKind::LcmsLipid, context(Arc::new(stub_api())), options(sheet))
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Not found: Instrument 'Velos Pro' not found in the database.");
    Ok(())
}

#[tokio::test]
async fn rerun_increments_latest_analysis_version() -> Result<()> {
    let dir = tempdir()?;
    let sheet = write_sheet(dir.path(), "lipid.csv", &HEADER, &[lipid_row(&processed_dir())]);
    let raw_url = format!("{}Lipid_Sample_01.raw", RAW_URL);
    let previous = |id: &str| {
        json!({
            "id": id,
            "type": "nmdc:MetabolomicsAnalysis",
            "has_input": ["nmdc:dobj-11-param1", "nmdc:dobj-11-raw001"],
            "was_informed_by": ["nmdc:dgms-11-run001"],
            "processing_institution": "NMDC",
            "execution_resource": "NERSC-Perlmutter"
        })
    };
    let api = stub_api()
        .with_record("data_object_set", json!({"id": "nmdc:dobj-11-raw001", "url": raw_url}))
        .with_record("workflow_execution_set", previous("nmdc:wfmb-11-prev01.2"))
        .with_record("workflow_execution_set", previous("nmdc:wfmb-11-prev01.10"))
        .with_record("workflow_execution_set", previous("nmdc:wfmb-11-prev01.9"));

    let db = create_generator(GeneratorKind::LcmsLipid, context(Arc::new(api)), options(sheet)).rerun().await?;
    let value = db.to_value()?;

    assert!(value.get("data_generation_set").is_none());
    assert!(value.get("manifest_set").is_none());
    let analysis = &value["workflow_execution_set"][0];
    assert_eq!(analysis["id"], json!("nmdc:wfmb-11-prev01.11"));
    assert_eq!(analysis["was_informed_by"], json!(["nmdc:dgms-11-run001"]));
    assert_eq!(analysis["processing_institution"], json!("NMDC"));
    assert_eq!(analysis["execution_resource"], json!("NERSC-Perlmutter"));
    assert_eq!(analysis["has_input"], json!(["nmdc:dobj-13-000003", "nmdc:dobj-11-raw001"]));
    assert_eq!(analysis["has_output"], json!(["nmdc:dobj-13-000001", "nmdc:dobj-13-000002"]));

    let objects = value["data_object_set"].as_array().unwrap();
    assert_eq!(objects.len(), 3);
    assert!(objects.iter().all(|o| o["was_generated_by"] == json!("nmdc:wfmb-11-prev01.11")));
    validate_database(&value)?;
    Ok(())
}
