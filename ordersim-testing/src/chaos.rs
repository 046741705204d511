//! Fault injection for the backing-store ports.
//!
//! Each wrapper forwards to an inner adapter, but before forwarding it may
//! stall for a configured latency or fail the call outright. Draws come
//! from a seeded RNG, so a deterministic configuration replays the same
//! fault sequence on every run.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use ordersim::clock::{ClockKey, ClockStore};
use ordersim::config::Probability;
use ordersim::errors::{
    ClockError, ClockResult, InventoryError, InventoryResult, SinkError, SinkResult,
};
use ordersim::inventory::{InventoryStore, ReservationOutcome, ScanOptions, ScanPage};
use ordersim::sink::{EventRecord, EventSink, PublishReceipt};
use ordersim::types::{Product, ProductId, SimulationState, StockLevel, VirtualTime};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

/// A port operation that chaos can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChaosOperation {
    /// `InventoryStore::get_product`
    GetProduct,
    /// `InventoryStore::scan_product_ids`
    ScanProducts,
    /// `InventoryStore::decrement_if_available`
    Reserve,
    /// `InventoryStore::add_stock`
    AddStock,
    /// `ClockStore::load`
    ClockLoad,
    /// `ClockStore::set_time`
    ClockWrite,
    /// `EventSink::publish`
    Publish,
}

impl ChaosOperation {
    /// Every operation.
    pub const ALL: [Self; 7] = [
        Self::GetProduct,
        Self::ScanProducts,
        Self::Reserve,
        Self::AddStock,
        Self::ClockLoad,
        Self::ClockWrite,
        Self::Publish,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::GetProduct => "get_product",
            Self::ScanProducts => "scan_product_ids",
            Self::Reserve => "decrement_if_available",
            Self::AddStock => "add_stock",
            Self::ClockLoad => "clock_load",
            Self::ClockWrite => "clock_set_time",
            Self::Publish => "publish",
        }
    }
}

/// What to inject, where and how often.
#[derive(Debug, Clone)]
pub struct ChaosConfig {
    deterministic_seed: Option<u64>,
    failure_probability: Probability,
    latency: Duration,
    latency_probability: Probability,
    targets: BTreeSet<ChaosOperation>,
}

impl ChaosConfig {
    /// A configuration that replays the same faults on every run.
    pub fn deterministic() -> Self {
        Self {
            deterministic_seed: Some(0),
            ..Self::default()
        }
    }

    /// Uses `seed` for the fault draws.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.deterministic_seed = Some(seed);
        self
    }

    /// Fails targeted calls with `probability`, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = clamped(probability);
        self
    }

    /// Delays targeted calls by `latency` with `probability`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration, probability: f64) -> Self {
        self.latency = latency;
        self.latency_probability = clamped(probability);
        self
    }

    /// Restricts injection to `operations`.
    #[must_use]
    pub fn targeting(mut self, operations: impl IntoIterator<Item = ChaosOperation>) -> Self {
        self.targets = operations.into_iter().collect();
        self
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            deterministic_seed: None,
            failure_probability: clamped(0.0),
            latency: Duration::ZERO,
            latency_probability: clamped(0.0),
            targets: ChaosOperation::ALL.into_iter().collect(),
        }
    }
}

fn clamped(probability: f64) -> Probability {
    Probability::try_new(probability.clamp(0.0, 1.0)).expect("clamped value is always valid")
}

/// Shared draw logic of every chaos wrapper.
#[derive(Debug)]
struct Injector {
    config: ChaosConfig,
    rng: Mutex<StdRng>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Injection {
    Pass,
    Fail,
}

impl Injector {
    fn new(config: ChaosConfig) -> Self {
        let rng = config
            .deterministic_seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    fn draw(&self, probability: Probability) -> bool {
        let p: f64 = probability.into_inner();
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        probability.sample(&mut *self.rng.lock())
    }

    async fn before(&self, operation: ChaosOperation) -> Injection {
        if !self.config.targets.contains(&operation) {
            return Injection::Pass;
        }

        let stall = self.draw(self.config.latency_probability);
        let fail = self.draw(self.config.failure_probability);

        if stall && !self.config.latency.is_zero() {
            debug!(
                operation = operation.name(),
                latency = ?self.config.latency,
                "chaos: injecting latency"
            );
            tokio::time::sleep(self.config.latency).await;
        }
        if fail {
            debug!(operation = operation.name(), "chaos: injecting failure");
            return Injection::Fail;
        }
        Injection::Pass
    }
}

fn injected(operation: ChaosOperation) -> String {
    format!("chaos: injected {} failure", operation.name())
}

/// Wraps adapters in chaos.
pub trait ChaosExt: Sized {
    /// Wraps `self` with the given fault configuration.
    fn with_chaos(self, config: ChaosConfig) -> Chaos<Self>;
}

impl<S> ChaosExt for S {
    fn with_chaos(self, config: ChaosConfig) -> Chaos<Self> {
        Chaos::new(self, config)
    }
}

/// A port adapter that injects faults before delegating to `S`.
///
/// `Chaos<S>` implements whichever of [`InventoryStore`], [`ClockStore`]
/// and [`EventSink`] the inner adapter implements.
#[derive(Debug)]
pub struct Chaos<S> {
    inner: S,
    injector: Injector,
}

impl<S> Chaos<S> {
    /// Wraps `inner`.
    pub fn new(inner: S, config: ChaosConfig) -> Self {
        Self {
            inner,
            injector: Injector::new(config),
        }
    }

    /// The wrapped adapter.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S> InventoryStore for Chaos<S>
where
    S: InventoryStore,
{
    async fn get_product(&self, product_id: &ProductId) -> InventoryResult<Option<Product>> {
        let op = ChaosOperation::GetProduct;
        if self.injector.before(op).await == Injection::Fail {
            return Err(InventoryError::Unavailable(injected(op)));
        }
        self.inner.get_product(product_id).await
    }

    async fn scan_product_ids(&self, options: &ScanOptions) -> InventoryResult<ScanPage> {
        let op = ChaosOperation::ScanProducts;
        if self.injector.before(op).await == Injection::Fail {
            return Err(InventoryError::Unavailable(injected(op)));
        }
        self.inner.scan_product_ids(options).await
    }

    async fn decrement_if_available(
        &self,
        product_id: &ProductId,
    ) -> InventoryResult<ReservationOutcome> {
        let op = ChaosOperation::Reserve;
        if self.injector.before(op).await == Injection::Fail {
            return Err(InventoryError::Throttled(injected(op)));
        }
        self.inner.decrement_if_available(product_id).await
    }

    async fn add_stock(&self, product_id: &ProductId, units: u64) -> InventoryResult<StockLevel> {
        let op = ChaosOperation::AddStock;
        if self.injector.before(op).await == Injection::Fail {
            return Err(InventoryError::Throttled(injected(op)));
        }
        self.inner.add_stock(product_id, units).await
    }
}

#[async_trait]
impl<S> ClockStore for Chaos<S>
where
    S: ClockStore,
{
    async fn load(&self, key: &ClockKey) -> ClockResult<Option<SimulationState>> {
        let op = ChaosOperation::ClockLoad;
        if self.injector.before(op).await == Injection::Fail {
            return Err(ClockError::ReadFailed(injected(op)));
        }
        self.inner.load(key).await
    }

    async fn set_time(&self, key: &ClockKey, time: VirtualTime) -> ClockResult<()> {
        let op = ChaosOperation::ClockWrite;
        if self.injector.before(op).await == Injection::Fail {
            return Err(ClockError::WriteFailed(injected(op)));
        }
        self.inner.set_time(key, time).await
    }
}

#[async_trait]
impl<S> EventSink for Chaos<S>
where
    S: EventSink,
{
    async fn publish(&self, record: EventRecord) -> SinkResult<PublishReceipt> {
        let op = ChaosOperation::Publish;
        if self.injector.before(op).await == Injection::Fail {
            return Err(SinkError::PublishFailed(injected(op)));
        }
        self.inner.publish(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_config_sets_seed() {
        assert!(ChaosConfig::default().deterministic_seed.is_none());
        assert_eq!(ChaosConfig::deterministic().deterministic_seed, Some(0));
    }

    #[test]
    fn probabilities_are_clamped() {
        let config = ChaosConfig::default().with_failure_probability(3.0);
        assert!((config.failure_probability.into_inner() - 1.0).abs() < f64::EPSILON);
        let config = ChaosConfig::default().with_failure_probability(-1.0);
        assert!(config.failure_probability.into_inner().abs() < f64::EPSILON);
    }

    #[test]
    fn same_seed_same_fault_sequence() {
        let config = ChaosConfig::deterministic()
            .with_seed(42)
            .with_failure_probability(0.5);
        let a = Injector::new(config.clone());
        let b = Injector::new(config);

        let draws_a: Vec<bool> = (0..64).map(|_| a.draw(a.config.failure_probability)).collect();
        let draws_b: Vec<bool> = (0..64).map(|_| b.draw(b.config.failure_probability)).collect();

        assert_eq!(draws_a, draws_b);
        assert!(draws_a.iter().any(|fail| *fail));
        assert!(draws_a.iter().any(|fail| !*fail));
    }

    #[tokio::test]
    async fn untargeted_operations_pass_through() {
        let injector = Injector::new(
            ChaosConfig::deterministic()
                .with_failure_probability(1.0)
                .targeting([ChaosOperation::Publish]),
        );

        assert_eq!(injector.before(ChaosOperation::Reserve).await, Injection::Pass);
        assert_eq!(injector.before(ChaosOperation::Publish).await, Injection::Fail);
    }
}
