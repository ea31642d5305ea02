//! Read helpers over [`NmdcApiPort`] shared by the generators.

use serde_json::Value;

use super::ports::{NmdcApiPort, RecordQuery};
use crate::constants::LOOKUP_CHUNK_SIZE;
use crate::error::{MetadataError, Result};

pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Id of the first record whose `attribute` matches `value`.
pub async fn find_id(
    api: &dyn NmdcApiPort,
    collection: &str,
    attribute: &str,
    value: &str,
    exact: bool,
) -> Result<Option<String>> {
    let records = api
        .find_records(collection, &RecordQuery::attribute(attribute, value, exact))
        .await?;
    Ok(records.first().and_then(record_id).map(str::to_string))
}

/// Like [`find_id`], but a missing record is an error naming `what`.
pub async fn require_id(
    api: &dyn NmdcApiPort,
    collection: &str,
    attribute: &str,
    value: &str,
    what: &str,
) -> Result<String> {
    find_id(api, collection, attribute, value, true)
        .await?
        .ok_or_else(|| MetadataError::NotFound(format!("{} '{}' not found in the database.", what, value)))
}

/// Records whose `attribute` is any of `values`, queried in chunks.
pub async fn find_any_of(
    api: &dyn NmdcApiPort,
    collection: &str,
    attribute: &str,
    values: &[String],
    fields: &[&str],
) -> Result<Vec<Value>> {
    let mut found = Vec::new();
    for chunk in values.chunks(LOOKUP_CHUNK_SIZE) {
        let query = RecordQuery::any_of(attribute, chunk).fields(fields).all_pages();
        found.extend(api.find_records(collection, &query).await?);
    }
    Ok(found)
}
