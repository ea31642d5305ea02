use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{MetadataError, Result};

pub const PROD_API_URL: &str = "https://api.microbiomedata.org";
pub const DEV_API_URL: &str = "https://api-dev.microbiomedata.org";

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_ID_POOL_SIZE: usize = 100;
const DEFAULT_ID_REFILL_THRESHOLD: usize = 10;
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Keys accepted in a credentials TOML file. Names match the environment variables.
#[derive(Debug, Default, Deserialize)]
struct CredentialFile {
    #[serde(rename = "CLIENT_ID")]
    client_id: Option<String>,
    #[serde(rename = "CLIENT_SECRET")]
    client_secret: Option<String>,
    #[serde(rename = "BIO_API_KEY")]
    bio_api_key: Option<String>,
}

impl CredentialFile {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MetadataError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let file: CredentialFile = toml::from_str(&content)?;
        Ok(file)
    }
}

/// OAuth client credentials for the NMDC runtime API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

impl Credentials {
    /// Reads `CLIENT_ID`/`CLIENT_SECRET` from the environment, falling back to `config_file`.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::resolve(non_empty_var("CLIENT_ID"), non_empty_var("CLIENT_SECRET"), config_file)
    }

    pub fn resolve(
        env_id: Option<String>,
        env_secret: Option<String>,
        config_file: Option<&Path>,
    ) -> Result<Self> {
        if let (Some(client_id), Some(client_secret)) = (env_id, env_secret) {
            return Ok(Self { client_id, client_secret });
        }

        if let Some(path) = config_file {
            let file = CredentialFile::load(path)?;
            if let (Some(client_id), Some(client_secret)) =
                (non_empty(file.client_id), non_empty(file.client_secret))
            {
                return Ok(Self { client_id, client_secret });
            }
        }

        Err(MetadataError::Config(
            "CLIENT_ID and CLIENT_SECRET must be set either in environment variables or passed in the config file."
                .to_string(),
        ))
    }
}

/// Reads the BioPortal key from `BIO_API_KEY`, falling back to `config_file`.
pub fn load_bio_api_key(config_file: Option<&Path>) -> Result<String> {
    resolve_bio_api_key(non_empty_var("BIO_API_KEY"), config_file)
}

pub fn resolve_bio_api_key(env_key: Option<String>, config_file: Option<&Path>) -> Result<String> {
    if let Some(key) = env_key {
        return Ok(key);
    }
    if let Some(path) = config_file {
        if let Some(key) = non_empty(CredentialFile::load(path)?.bio_api_key) {
            return Ok(key);
        }
    }
    Err(MetadataError::Config(
        "BIO_API_KEY must be set either in environment variable or passed in the config file.".to_string(),
    ))
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub max_page_size: u32,
    pub id_pool_size: usize,
    pub id_refill_threshold: usize,
    pub timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self::for_env_name("prod")
    }
}

impl ApiSettings {
    /// Resolves settings from `NMDC_ENV`, `NMDC_API_URL` and the optional pool sizing variables.
    pub fn from_env() -> Self {
        let env_name = env::var("NMDC_ENV").unwrap_or_else(|_| "prod".to_string());
        let mut settings = Self::for_env_name(&env_name);
        if let Some(url) = non_empty_var("NMDC_API_URL") {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(size) = non_empty_var("NMDC_ID_POOL_SIZE").and_then(|v| v.parse().ok()) {
            settings.id_pool_size = size;
        }
        if let Some(threshold) = non_empty_var("NMDC_ID_REFILL_THRESHOLD").and_then(|v| v.parse().ok()) {
            settings.id_refill_threshold = threshold;
        }
        settings
    }

    pub fn for_env_name(env_name: &str) -> Self {
        let base_url = match env_name.trim().to_ascii_lowercase().as_str() {
            "dev" => DEV_API_URL,
            _ => PROD_API_URL,
        };
        Self {
            base_url: base_url.to_string(),
            max_page_size: DEFAULT_PAGE_SIZE,
            id_pool_size: DEFAULT_ID_POOL_SIZE,
            id_refill_threshold: DEFAULT_ID_REFILL_THRESHOLD,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_var(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn environment_credentials_take_precedence() {
        let file = write_config("CLIENT_ID = \"file-id\"\nCLIENT_SECRET = \"file-secret\"\n");
        let creds = Credentials::resolve(
            Some("env-id".to_string()),
            Some("env-secret".to_string()),
            Some(file.path()),
        )
        .unwrap();
        assert_eq!(creds.client_id, "env-id");
        assert_eq!(creds.client_secret, "env-secret");
    }

    #[test]
    fn falls_back_to_config_file() {
        let file = write_config("CLIENT_ID = \"file-id\"\nCLIENT_SECRET = \"file-secret\"\n");
        let creds = Credentials::resolve(Some("env-id".to_string()), None, Some(file.path())).unwrap();
        assert_eq!(creds.client_id, "file-id");
        assert_eq!(creds.client_secret, "file-secret");
    }

    #[test]
    fn missing_credentials_is_a_config_error() {
        let file = write_config("BIO_API_KEY = \"abc\"\n");
        let err = Credentials::resolve(None, None, Some(file.path())).unwrap_err();
        assert!(matches!(err, MetadataError::Config(msg) if msg.contains("CLIENT_ID and CLIENT_SECRET")));
    }

    #[test]
    fn unreadable_config_file_is_reported() {
        let err = Credentials::resolve(None, None, Some(Path::new("/nonexistent/creds.toml"))).unwrap_err();
        assert!(matches!(err, MetadataError::Config(msg) if msg.contains("/nonexistent/creds.toml")));
    }

    #[test]
    fn bio_api_key_from_file() {
        let file = write_config("BIO_API_KEY = \"bioportal-key\"\n");
        assert_eq!(resolve_bio_api_key(None, Some(file.path())).unwrap(), "bioportal-key");
        assert!(resolve_bio_api_key(None, None).is_err());
    }

    #[test]
    fn dev_environment_switches_base_url() {
        assert_eq!(ApiSettings::for_env_name("dev").base_url, DEV_API_URL);
        assert_eq!(ApiSettings::for_env_name("prod").base_url, PROD_API_URL);
        assert_eq!(ApiSettings::for_env_name("anything").base_url, PROD_API_URL);
        assert_eq!(ApiSettings::default().id_pool_size, 100);
        assert_eq!(ApiSettings::default().id_refill_threshold, 10);
    }
}
