use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::app::ports::{NmdcApiPort, RecordQuery};
use crate::config::{ApiSettings, Credentials};
use crate::constants::VALIDATION_OK;
use crate::error::{MetadataError, Result};
use crate::observability::metrics;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    resources: Vec<Value>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    result: String,
    #[serde(default)]
    detail: Value,
}

/// NMDC runtime API over reqwest
pub struct ReqwestNmdcApi {
    client: reqwest::Client,
    settings: ApiSettings,
    /// Needed only for minting and submission
    credentials: Option<Credentials>,
    token: Mutex<Option<String>>,
}

impl ReqwestNmdcApi {
    pub fn new(settings: ApiSettings, credentials: Option<Credentials>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(concat!("nmdc_ms_metadata/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, settings, credentials, token: Mutex::new(None) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn cached_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            MetadataError::Config("CLIENT_ID and CLIENT_SECRET are required for this operation.".to_string())
        })?;
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        let resp = self.client.post(self.url("/token")).form(&form).send().await?;
        let resp = check_status(resp, "token").await?;
        let token: TokenResponse = resp.json().await?;
        if let Ok(mut cached) = self.token.lock() {
            *cached = Some(token.access_token.clone());
        }
        Ok(token.access_token)
    }

    async fn fetch_page(&self, collection: &str, query: &RecordQuery, page_token: Option<&str>) -> Result<Page> {
        let filter = serde_json::to_string(&query.filter)?;
        let mut params = vec![
            ("filter", filter),
            ("projection", query.fields.join(",")),
            ("max_page_size", self.settings.max_page_size.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("page_token", token.to_string()));
        }
        debug!(collection = %collection, filter = %query.filter, "Querying runtime API");
        let resp = self
            .client
            .get(self.url(&format!("/nmdcschema/{}", collection)))
            .query(&params)
            .send()
            .await?;
        let resp = check_status(resp, "nmdcschema").await?;
        Ok(resp.json().await?)
    }
}

async fn check_status(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        metrics::api::request_success(endpoint);
        return Ok(resp);
    }
    metrics::api::request_error(endpoint);
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(MetadataError::Api { status, message })
}

#[async_trait]
impl NmdcApiPort for ReqwestNmdcApi {
    async fn mint_ids(&self, nmdc_type: &str, how_many: usize) -> Result<Vec<String>> {
        let token = self.access_token().await?;
        let body = json!({ "schema_class": { "id": nmdc_type }, "how_many": how_many });
        debug!(nmdc_type = %nmdc_type, how_many, "Minting identifiers");
        let resp = self
            .client
            .post(self.url("/pids/mint"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp, "mint").await?;
        Ok(resp.json().await?)
    }

    async fn find_records(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.fetch_page(collection, query, page_token.as_deref()).await?;
            records.extend(page.resources);
            match page.next_page_token {
                Some(next) if query.all_pages && !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(records)
    }

    async fn validate_json(&self, database: &Value) -> Result<()> {
        let resp = self.client.post(self.url("/metadata/json:validate")).json(database).send().await?;
        let resp = check_status(resp, "validate").await?;
        let outcome: ValidationResponse = resp.json().await?;
        if outcome.result == VALIDATION_OK {
            return Ok(());
        }
        metrics::validation::failure("api");
        let detail = if outcome.detail.is_null() { outcome.result } else { outcome.detail.to_string() };
        Err(MetadataError::Validation(vec![detail]))
    }

    async fn submit_json(&self, database: &Value) -> Result<()> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(self.url("/metadata/json:submit"))
            .bearer_auth(token)
            .json(database)
            .send()
            .await?;
        let resp = check_status(resp, "submit").await?;
        if resp.status() != StatusCode::OK {
            return Err(MetadataError::Api {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    async fn url_status(&self, url: &str) -> Result<u16> {
        let resp = self.client.head(url).send().await?;
        Ok(resp.status().as_u16())
    }

    async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    type RequestLog = Arc<Mutex<Vec<String>>>;

    /// Answers one request per connection and records each request line.
    async fn fake_runtime_api() -> (String, RequestLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let server_log = log.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                tokio::spawn(handle_request(stream, server_log.clone()));
            }
        });
        (format!("http://{}", addr), log)
    }

    async fn handle_request(mut stream: TcpStream, log: RequestLog) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let request_line = head.lines().next().unwrap_or_default().to_string();
        log.lock().unwrap().push(request_line.clone());

        let body = if request_line.starts_with("POST /token") {
            json!({"access_token": "tok-1", "token_type": "bearer"})
        } else if request_line.starts_with("POST /pids/mint") {
            json!(["nmdc:dobj-13-000001"])
        } else if request_line.contains("page_token=p2") {
            json!({"resources": [{"id": "nmdc:dobj-11-b"}], "next_page_token": null})
        } else {
            json!({"resources": [{"id": "nmdc:dobj-11-a"}], "next_page_token": "p2"})
        };
        let body = body.to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
    }

    fn api_for(base_url: &str) -> ReqwestNmdcApi {
        let mut settings = ApiSettings::default();
        settings.base_url = base_url.to_string();
        let creds = Credentials { client_id: "id".to_string(), client_secret: "secret".to_string() };
        ReqwestNmdcApi::new(settings, Some(creds)).unwrap()
    }

    fn requests(log: &RequestLog, prefix: &str) -> Vec<String> {
        log.lock().unwrap().iter().filter(|l| l.starts_with(prefix)).cloned().collect()
    }

    #[tokio::test]
    async fn all_pages_follows_next_page_token() {
        let (base_url, log) = fake_runtime_api().await;
        let api = api_for(&base_url);

        let query = RecordQuery::attribute("name", "a.raw", true).all_pages();
        let records = api.find_records("data_object_set", &query).await.unwrap();

        let ids: Vec<&str> = records.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["nmdc:dobj-11-a", "nmdc:dobj-11-b"]);
        let pages = requests(&log, "GET /nmdcschema/data_object_set");
        assert_eq!(pages.len(), 2);
        assert!(!pages[0].contains("page_token="));
        assert!(pages[1].contains("page_token=p2"));
    }

    #[tokio::test]
    async fn single_page_query_stops_after_first_page() {
        let (base_url, log) = fake_runtime_api().await;
        let api = api_for(&base_url);

        let records = api
            .find_records("data_object_set", &RecordQuery::attribute("name", "a.raw", true))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(requests(&log, "GET /nmdcschema/").len(), 1);
    }

    #[tokio::test]
    async fn access_token_is_fetched_once() {
        let (base_url, log) = fake_runtime_api().await;
        let api = api_for(&base_url);

        assert_eq!(api.mint_ids("nmdc:DataObject", 1).await.unwrap(), vec!["nmdc:dobj-13-000001"]);
        api.mint_ids("nmdc:DataObject", 1).await.unwrap();

        assert_eq!(requests(&log, "POST /token").len(), 1);
        assert_eq!(requests(&log, "POST /pids/mint").len(), 2);
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let mut settings = ApiSettings::default();
        settings.base_url = "https://api-dev.microbiomedata.org/".to_string();
        let creds = Credentials { client_id: "id".to_string(), client_secret: "secret".to_string() };
        let api = ReqwestNmdcApi::new(settings, Some(creds)).unwrap();
        assert_eq!(api.url("/pids/mint"), "https://api-dev.microbiomedata.org/pids/mint");
        assert_eq!(api.url("token"), "https://api-dev.microbiomedata.org/token");
    }

    #[test]
    fn page_without_token_deserializes() {
        let page: Page = serde_json::from_value(json!({"resources": [{"id": "nmdc:dobj-1"}]})).unwrap();
        assert_eq!(page.resources.len(), 1);
        assert!(page.next_page_token.is_none());
    }
}
