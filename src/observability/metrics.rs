//! Metrics for metadata generation runs
//!
//! Counters follow the Prometheus naming conventions. Recording is a no-op
//! until [`init`] installs the recorder.

use std::fmt;
use std::path::Path;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::error::{MetadataError, Result};

/// All metric names used by the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Identifier minting
    IdsMinted,
    IdPoolRefills,

    // Runtime API
    ApiRequestsSuccess,
    ApiRequestsError,

    // Generation
    RowsProcessed,
    RecordsGenerated,
    UrlChecks,

    // Validation
    ValidationFailures,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IdsMinted => "nmdc_ms_ids_minted_total",
            MetricName::IdPoolRefills => "nmdc_ms_id_pool_refills_total",
            MetricName::ApiRequestsSuccess => "nmdc_ms_api_requests_success_total",
            MetricName::ApiRequestsError => "nmdc_ms_api_requests_error_total",
            MetricName::RowsProcessed => "nmdc_ms_rows_processed_total",
            MetricName::RecordsGenerated => "nmdc_ms_records_generated_total",
            MetricName::UrlChecks => "nmdc_ms_url_checks_total",
            MetricName::ValidationFailures => "nmdc_ms_validation_failures_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            IdsMinted,
            IdPoolRefills,
            ApiRequestsSuccess,
            ApiRequestsError,
            RowsProcessed,
            RecordsGenerated,
            UrlChecks,
            ValidationFailures,
        ]
        .into_iter()
    }
}

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the Prometheus recorder. Calling it more than once is harmless.
pub fn init() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetadataError::Config(format!("Failed to install Prometheus recorder: {}", e)))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus text rendering of everything recorded so far
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub fn write_to_file(path: &Path) -> Result<()> {
    let text = render().unwrap_or_default();
    std::fs::write(path, text)?;
    info!(path = %path.display(), "Metrics written");
    Ok(())
}

pub mod ids {
    use super::MetricName;

    pub fn minted(nmdc_type: &str, count: usize) {
        ::metrics::counter!(MetricName::IdsMinted.as_str(), "type" => nmdc_type.to_string())
            .increment(count as u64);
    }

    pub fn pool_refill(nmdc_type: &str) {
        ::metrics::counter!(MetricName::IdPoolRefills.as_str(), "type" => nmdc_type.to_string()).increment(1);
    }
}

pub mod api {
    use super::MetricName;

    pub fn request_success(endpoint: &'static str) {
        ::metrics::counter!(MetricName::ApiRequestsSuccess.as_str(), "endpoint" => endpoint).increment(1);
    }

    pub fn request_error(endpoint: &'static str) {
        ::metrics::counter!(MetricName::ApiRequestsError.as_str(), "endpoint" => endpoint).increment(1);
    }
}

pub mod generation {
    use super::MetricName;

    pub fn row_processed(generator: &'static str) {
        ::metrics::counter!(MetricName::RowsProcessed.as_str(), "generator" => generator).increment(1);
    }

    pub fn records_generated(collection: &'static str, count: usize) {
        ::metrics::counter!(MetricName::RecordsGenerated.as_str(), "collection" => collection)
            .increment(count as u64);
    }

    pub fn url_checked() {
        ::metrics::counter!(MetricName::UrlChecks.as_str()).increment(1);
    }
}

pub mod validation {
    use super::MetricName;

    pub fn failure(source: &'static str) {
        ::metrics::counter!(MetricName::ValidationFailures.as_str(), "source" => source).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_prefixed_and_unique() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        assert!(names.iter().all(|n| n.starts_with("nmdc_ms_") && n.ends_with("_total")));
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
        assert_eq!(MetricName::IdsMinted.to_string(), "nmdc_ms_ids_minted_total");
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        ids::minted("nmdc:DataObject", 3);
        api::request_error("mint");
        generation::records_generated("data_object_set", 2);
    }
}
