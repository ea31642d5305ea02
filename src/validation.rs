//! Local validation of database dumps against the bundled NMDC schema subset.

use std::fs;
use std::path::Path;

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{MetadataError, Result};
use crate::observability::metrics;

const SCHEMA_TEXT: &str = include_str!("../schemas/nmdc_database.v1.json");
const PLACEHOLDERS: [&str; 2] = ["placeholder", "nmdc:placeholder"];

fn is_placeholder(s: &str) -> bool {
    let s = s.trim();
    PLACEHOLDERS.iter().any(|p| s.eq_ignore_ascii_case(p))
}

static SCHEMA: Lazy<std::result::Result<JSONSchema, String>> = Lazy::new(|| {
    let schema_json: Value = serde_json::from_str(SCHEMA_TEXT).map_err(|e| e.to_string())?;
    // jsonschema 0.17 needs a 'static schema
    let schema_static: &'static Value = Box::leak(Box::new(schema_json));
    JSONSchema::options().compile(schema_static).map_err(|e| e.to_string())
});

fn compiled() -> Result<&'static JSONSchema> {
    SCHEMA
        .as_ref()
        .map_err(|e| MetadataError::Config(format!("Failed to compile bundled schema: {}", e)))
}

/// JSON paths of string values still carrying a template placeholder.
fn placeholders(value: &Value, path: &str, found: &mut Vec<String>) {
    match value {
        Value::String(s) if is_placeholder(s) => found.push(path.to_string()),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                placeholders(item, &format!("{}/{}", path, i), found);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                placeholders(item, &format!("{}/{}", path, key), found);
            }
        }
        _ => {}
    }
}

pub fn validate_database(database: &Value) -> Result<()> {
    let schema = compiled()?;
    let mut problems: Vec<String> = match schema.validate(database) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.map(|e| format!("{} at {}", e, e.instance_path)).collect(),
    };

    let mut found = Vec::new();
    placeholders(database, "", &mut found);
    problems.extend(found.into_iter().map(|path| format!("Placeholder value at {}", path)));

    if problems.is_empty() {
        info!("Database passed local validation");
        Ok(())
    } else {
        warn!(errors = problems.len(), "Database failed local validation");
        metrics::validation::failure("local");
        Err(MetadataError::Validation(problems))
    }
}

pub fn load_database(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| {
        MetadataError::InvalidInput(format!("Could not read database file {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Reads and locally validates a dump, returning its JSON for further use.
pub fn validate_file(path: &Path) -> Result<Value> {
    let database = load_database(path)?;
    validate_database(&database)?;
    Ok(database)
}
