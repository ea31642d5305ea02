//! Block-minted NMDC identifiers, handed out one at a time per schema class.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::app::ports::NmdcApiPort;
use crate::error::{MetadataError, Result};
use crate::observability::metrics;

const REFILL_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct IdPool {
    pool_size: usize,
    refill_threshold: usize,
    pools: HashMap<String, VecDeque<String>>,
}

impl IdPool {
    /// The refill threshold is kept below the pool size so each refill serves more than one id.
    pub fn new(pool_size: usize, refill_threshold: usize) -> Self {
        let pool_size = pool_size.max(1);
        let max_threshold = pool_size - 1;
        if refill_threshold > max_threshold {
            warn!(pool_size, refill_threshold, "ID refill threshold exceeds pool size, using {}", max_threshold);
        }
        Self { pool_size, refill_threshold: refill_threshold.min(max_threshold), pools: HashMap::new() }
    }

    /// Next identifier for `nmdc_type`, minting a new block when the pool runs low.
    /// Identifiers are returned in the order the API minted them.
    pub async fn get_id(&mut self, api: &dyn NmdcApiPort, nmdc_type: &str) -> Result<String> {
        if self.available(nmdc_type) <= self.refill_threshold {
            self.refill(api, nmdc_type).await?;
        }
        self.pools
            .get_mut(nmdc_type)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                MetadataError::Config(format!("ID pool for type '{}' is empty after refill attempt.", nmdc_type))
            })
    }

    pub fn available(&self, nmdc_type: &str) -> usize {
        self.pools.get(nmdc_type).map_or(0, VecDeque::len)
    }

    async fn refill(&mut self, api: &dyn NmdcApiPort, nmdc_type: &str) -> Result<()> {
        let mut last_error = None;
        for attempt in 1..=REFILL_ATTEMPTS {
            match api.mint_ids(nmdc_type, self.pool_size).await {
                Ok(ids) => {
                    debug!(nmdc_type = %nmdc_type, count = ids.len(), "Refilled ID pool");
                    metrics::ids::pool_refill(nmdc_type);
                    metrics::ids::minted(nmdc_type, ids.len());
                    self.pools.entry(nmdc_type.to_string()).or_default().extend(ids);
                    return Ok(());
                }
                Err(e) => {
                    warn!(nmdc_type = %nmdc_type, attempt, error = %e, "ID minting failed");
                    last_error = Some(e);
                }
            }
        }
        Err(MetadataError::Config(format!(
            "Failed to refill ID pool for type '{}' after {} attempts: {}",
            nmdc_type,
            REFILL_ATTEMPTS,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::RecordQuery;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Mints sequential ids and fails the first `failures` calls.
    struct CountingMinter {
        calls: Mutex<usize>,
        failures: usize,
        next: Mutex<usize>,
    }

    impl CountingMinter {
        fn new(failures: usize) -> Self {
            Self { calls: Mutex::new(0), failures, next: Mutex::new(0) }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl NmdcApiPort for CountingMinter {
        async fn mint_ids(&self, _nmdc_type: &str, how_many: usize) -> Result<Vec<String>> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.failures {
                return Err(MetadataError::Api { status: 500, message: "unavailable".to_string() });
            }
            let mut next = self.next.lock().unwrap();
            let ids = (0..how_many).map(|i| format!("nmdc:dobj-13-{:06}", *next + i + 1)).collect();
            *next += how_many;
            Ok(ids)
        }
        async fn find_records(&self, _c: &str, _q: &RecordQuery) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
        async fn validate_json(&self, _d: &Value) -> Result<()> {
            Ok(())
        }
        async fn submit_json(&self, _d: &Value) -> Result<()> {
            Ok(())
        }
        async fn url_status(&self, _url: &str) -> Result<u16> {
            Ok(200)
        }
        async fn fetch_text(&self, _url: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn ids_come_out_in_mint_order() {
        let api = CountingMinter::new(0);
        let mut pool = IdPool::new(5, 1);
        assert_eq!(pool.get_id(&api, "nmdc:DataObject").await.unwrap(), "nmdc:dobj-13-000001");
        assert_eq!(pool.get_id(&api, "nmdc:DataObject").await.unwrap(), "nmdc:dobj-13-000002");
        assert_eq!(api.calls(), 1);
        assert_eq!(pool.available("nmdc:DataObject"), 3);
    }

    #[tokio::test]
    async fn refills_at_threshold() {
        let api = CountingMinter::new(0);
        let mut pool = IdPool::new(3, 1);
        for _ in 0..3 {
            pool.get_id(&api, "nmdc:DataObject").await.unwrap();
        }
        // 3 minted, 2 taken leaves 1 which is at the threshold
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn oversized_threshold_is_clamped() {
        let api = CountingMinter::new(0);
        let mut pool = IdPool::new(3, 10);
        for _ in 0..6 {
            pool.get_id(&api, "nmdc:DataObject").await.unwrap();
        }
        assert_eq!(api.calls(), 3);
        assert_eq!(pool.available("nmdc:DataObject"), 3);
    }

    #[tokio::test]
    async fn retries_failed_refills() {
        let api = CountingMinter::new(2);
        let mut pool = IdPool::new(2, 0);
        assert!(pool.get_id(&api, "nmdc:DataObject").await.is_ok());
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let api = CountingMinter::new(3);
        let mut pool = IdPool::new(2, 0);
        let err = pool.get_id(&api, "nmdc:DataObject").await.unwrap_err();
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
