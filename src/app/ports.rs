use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;

use crate::error::Result;

/// A filtered read against one collection of the runtime API.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub filter: Value,
    pub fields: Vec<String>,
    pub all_pages: bool,
}

impl RecordQuery {
    pub fn new(filter: Value) -> Self {
        Self { filter, fields: vec!["id".to_string()], all_pages: false }
    }

    /// `{attribute: value}` when exact, otherwise a `$regex` match.
    pub fn attribute(attribute: &str, value: &str, exact: bool) -> Self {
        let matcher = if exact { json!(value) } else { json!({ "$regex": value }) };
        Self::new(json!({ attribute: matcher }))
    }

    pub fn any_of(attribute: &str, values: &[String]) -> Self {
        Self::new(json!({ attribute: { "$in": values } }))
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn all_pages(mut self) -> Self {
        self.all_pages = true;
        self
    }
}

#[async_trait]
pub trait NmdcApiPort: Send + Sync {
    async fn mint_ids(&self, nmdc_type: &str, how_many: usize) -> Result<Vec<String>>;
    async fn find_records(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Value>>;
    async fn validate_json(&self, database: &Value) -> Result<()>;
    async fn submit_json(&self, database: &Value) -> Result<()>;
    /// Status code of a HEAD request against a data URL
    async fn url_status(&self, url: &str) -> Result<u16>;
    /// Body of a GET request, or `None` on a non-success status
    async fn fetch_text(&self, url: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait OntologyPort: Send + Sync {
    /// Preferred label of an ENVO term such as `ENVO:00002042`
    async fn envo_label(&self, envo_id: &str) -> Result<String>;
}

/// Dates and file times, behind a seam so output can be pinned in tests.
pub trait ClockPort: Send + Sync {
    /// Today's date as `%Y-%m-%d`
    fn today(&self) -> String;
    /// Start and end time of a file as `%Y-%m-%d %H:%M:%S`
    fn file_window(&self, path: &Path) -> Result<(String, String)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_query_shapes() {
        assert_eq!(RecordQuery::attribute("name", "Orbitrap", true).filter, json!({"name": "Orbitrap"}));
        assert_eq!(
            RecordQuery::attribute("name", "srfa_01", false).filter,
            json!({"name": {"$regex": "srfa_01"}})
        );
        let q = RecordQuery::any_of("url", &["a".to_string()]).fields(&["id", "url"]).all_pages();
        assert_eq!(q.filter, json!({"url": {"$in": ["a"]}}));
        assert_eq!(q.fields, vec!["id", "url"]);
        assert!(q.all_pages);
    }
}
