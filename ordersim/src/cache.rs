//! Process-lifetime sample of product identifiers.
//!
//! The cache is cold until the first pick, which performs one
//! identifier-only scan bounded by [`SampleLimit`]. A non-empty result is
//! kept for the life of the engine instance and never reloaded. An empty
//! result or a failed scan leaves the cache cold, so the next invocation
//! scans again.
//!
//! Staleness is accepted: products added later are never picked, and
//! products depleted to zero keep being picked and simply fail their
//! reservation.

use std::time::Duration;

use rand::seq::IndexedRandom;
use rand::Rng;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::config::{OperationTimeoutMs, SampleLimit};
use crate::deadline::within;
use crate::errors::{EngineError, EngineResult, InventoryError};
use crate::inventory::{InventoryStore, ScanOptions};
use crate::types::ProductId;

/// Lazily populated, never invalidated product identifier sample.
#[derive(Debug)]
pub struct ProductCache {
    entries: OnceCell<Vec<ProductId>>,
    limit: SampleLimit,
    timeout: Duration,
}

impl ProductCache {
    /// Creates a cold cache that will hold at most `limit` identifiers.
    pub fn new(limit: SampleLimit) -> Self {
        Self::with_timeout(limit, OperationTimeoutMs::default())
    }

    /// Creates a cold cache whose loading scan gives up after `timeout`.
    pub fn with_timeout(limit: SampleLimit, timeout: OperationTimeoutMs) -> Self {
        Self {
            entries: OnceCell::new(),
            limit,
            timeout: timeout.as_duration(),
        }
    }

    /// Whether the sample has been loaded.
    pub fn is_warm(&self) -> bool {
        self.entries.initialized()
    }

    /// Number of cached identifiers, zero while cold.
    pub fn len(&self) -> usize {
        self.entries.get().map_or(0, Vec::len)
    }

    /// Whether no identifier is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The cached sample, loading it from `store` on first use.
    ///
    /// Concurrent first callers share a single scan.
    #[instrument(name = "cache.sample", skip(self, store), fields(limit = %self.limit))]
    pub async fn sample<S>(&self, store: &S) -> EngineResult<&[ProductId]>
    where
        S: InventoryStore + ?Sized,
    {
        let entries = self
            .entries
            .get_or_try_init(|| self.load(store))
            .await?;
        Ok(entries.as_slice())
    }

    /// Picks one cached identifier uniformly at random.
    pub async fn pick_random<S, R>(&self, store: &S, rng: &mut R) -> EngineResult<ProductId>
    where
        S: InventoryStore + ?Sized,
        R: Rng + Send + ?Sized,
    {
        self.sample(store)
            .await?
            .choose(rng)
            .cloned()
            .ok_or(EngineError::EmptyCatalog)
    }

    async fn load<S>(&self, store: &S) -> EngineResult<Vec<ProductId>>
    where
        S: InventoryStore + ?Sized,
    {
        let limit: usize = self.limit.into_inner();
        let options = ScanOptions::new().with_limit(limit);
        let page = within(
            self.timeout,
            store.scan_product_ids(&options),
            InventoryError::Timeout,
        )
        .await
        .map_err(EngineError::CatalogUnavailable)?;

        let mut product_ids = page.product_ids;
        product_ids.truncate(limit);
        if product_ids.is_empty() {
            debug!("inventory scan returned no products, cache stays cold");
            return Err(EngineError::EmptyCatalog);
        }

        info!(loaded = product_ids.len(), "product cache warmed");
        Ok(product_ids)
    }
}

impl Default for ProductCache {
    fn default() -> Self {
        Self::new(SampleLimit::default())
    }
}
