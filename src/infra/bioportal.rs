use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::OntologyPort;
use crate::error::{MetadataError, Result};

const BIOPORTAL_ENVO_URL: &str = "http://data.bioontology.org/ontologies/ENVO/classes";

#[derive(Debug, Deserialize)]
struct OntologyClassResponse {
    #[serde(rename = "prefLabel")]
    pref_label: Option<String>,
}

/// ENVO label lookups against the BioPortal REST API
pub struct BioPortalClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl BioPortalClient {
    pub fn new(api_key: String) -> Self {
        Self { client: reqwest::Client::new(), api_key, base_url: BIOPORTAL_ENVO_URL.to_string() }
    }
}

#[async_trait]
impl OntologyPort for BioPortalClient {
    async fn envo_label(&self, envo_id: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, envo_id);
        debug!(envo_id = %envo_id, "Looking up ENVO term");
        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("apikey token={}", self.api_key))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(MetadataError::Api {
                status: resp.status().as_u16(),
                message: format!("ENVO lookup failed for {}", envo_id),
            });
        }
        let body: OntologyClassResponse = resp.json().await?;
        body.pref_label
            .ok_or_else(|| MetadataError::NotFound(format!("No prefLabel for ENVO term {}", envo_id)))
    }
}
