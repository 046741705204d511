//! Periodic stock top-up.
//!
//! Replenishment walks the whole catalog page by page and, for each product,
//! adds a random amount with a fixed probability. It only uses the additive
//! increment, so it can run while simulations are reserving stock.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{OperationTimeoutMs, Probability, SampleLimit, UnitRange};
use crate::deadline::within;
use crate::errors::{InventoryError, InventoryResult};
use crate::inventory::{InventoryStore, ScanOptions};

/// How much stock to add, and to which products.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplenishConfig {
    /// Units added to a selected product.
    pub amount: UnitRange,
    /// Chance that a given product is topped up.
    pub probability: Probability,
    /// Identifiers requested per scan page.
    pub page_size: SampleLimit,
    /// Deadline of each store call.
    pub timeout: OperationTimeoutMs,
}

impl Default for ReplenishConfig {
    fn default() -> Self {
        Self {
            amount: UnitRange::try_new(50, 300).expect("50..=300 is a valid range"),
            probability: Probability::try_new(0.9).expect("0.9 is a valid probability"),
            page_size: SampleLimit::default(),
            timeout: OperationTimeoutMs::default(),
        }
    }
}

impl ReplenishConfig {
    /// Sets the amount range.
    #[must_use]
    pub const fn with_amount(mut self, amount: UnitRange) -> Self {
        self.amount = amount;
        self
    }

    /// Sets the per-product probability.
    #[must_use]
    pub const fn with_probability(mut self, probability: Probability) -> Self {
        self.probability = probability;
        self
    }

    /// Sets the scan page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: SampleLimit) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Outcome of one replenishment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishReport {
    /// Products visited.
    pub scanned: u64,
    /// Products that received stock.
    pub replenished: u64,
    /// Units added in total.
    pub units_added: u64,
    /// Additive updates that failed; those products were left untouched.
    pub failures: u64,
}

/// Tops up a random subset of the catalog.
///
/// A failed scan aborts the pass; a failed update is counted and the pass
/// continues with the next product.
#[instrument(name = "replenish", skip_all)]
pub async fn replenish<S, R>(
    store: &S,
    config: &ReplenishConfig,
    rng: &mut R,
) -> InventoryResult<ReplenishReport>
where
    S: InventoryStore + ?Sized,
    R: Rng + Send + ?Sized,
{
    let timeout = config.timeout.as_duration();
    let mut report = ReplenishReport::default();
    let mut options = ScanOptions::new().with_limit(config.page_size.into_inner());

    loop {
        let page = within(
            timeout,
            store.scan_product_ids(&options),
            InventoryError::Timeout,
        )
        .await?;
        let resume = page.last_evaluated.clone();

        for product_id in page.product_ids {
            report.scanned += 1;
            if !config.probability.sample(rng) {
                continue;
            }

            let units = config.amount.sample(rng);
            let added = within(
                timeout,
                store.add_stock(&product_id, units),
                InventoryError::Timeout,
            )
            .await;
            match added {
                Ok(level) => {
                    report.replenished += 1;
                    report.units_added += units;
                    debug!(%product_id, units, stock_level = %level, "stock added");
                }
                Err(err) => {
                    report.failures += 1;
                    warn!(%product_id, error = %err, "could not add stock");
                }
            }
        }

        match resume {
            Some(last) => options = options.starting_after(last),
            None => break,
        }
    }

    info!(
        scanned = report.scanned,
        replenished = report.replenished,
        units_added = report.units_added,
        failures = report.failures,
        "replenishment complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_top_up_job() {
        let config = ReplenishConfig::default();
        assert_eq!(config.amount.min(), 50);
        assert_eq!(config.amount.max(), 300);
        assert!((config.probability.into_inner() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn config_parses_from_json() {
        let config: ReplenishConfig = serde_json::from_str(
            r#"{ "amount": { "min": 200, "max": 850 }, "probability": 0.91 }"#,
        )
        .unwrap();
        assert_eq!(config.amount.max(), 850);
        assert_eq!(config.page_size.into_inner(), 500);

        let bad = serde_json::from_str::<ReplenishConfig>(r#"{ "probability": 1.5 }"#);
        assert!(bad.is_err());
    }
}
