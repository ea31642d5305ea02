mod common;

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::tempdir;

use common::resource;
use nmdc_ms_metadata::error::MetadataError;
use nmdc_ms_metadata::validation::{load_database, validate_file};

#[test]
fn golden_dump_is_valid() -> Result<()> {
    let value = validate_file(&resource("lcms_lipid/expected_database.json"))?;
    assert_eq!(value["data_object_set"].as_array().map(Vec::len), Some(4));
    Ok(())
}

#[test]
fn tampered_dump_reports_every_problem() -> Result<()> {
    let dir = tempdir()?;
    let mut value: Value = load_database(&resource("lcms_lipid/expected_database.json"))?;
    value["data_object_set"][0]["md5_checksum"] = json!("not-a-checksum");
    value["data_object_set"][1]["data_category"] = json!("raw");
    value["workflow_execution_set"][0]["id"] = json!("nmdc:wfmb-13-000001");
    let path = dir.path().join("tampered.json");
    std::fs::write(&path, serde_json::to_string_pretty(&value)?)?;

    match validate_file(&path) {
        Err(MetadataError::Validation(problems)) => {
            assert!(problems.len() >= 3, "{problems:?}");
            assert!(problems.iter().any(|p| p.contains("/data_object_set/0/md5_checksum")));
            assert!(problems.iter().any(|p| p.contains("/data_object_set/1/data_category")));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    Ok(())
}

#[test]
fn unreadable_dump_is_invalid_input() {
    let err = load_database(&resource("missing/database.json")).unwrap_err();
    assert!(matches!(err, MetadataError::InvalidInput(msg) if msg.contains("database.json")));
}
