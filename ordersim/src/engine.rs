//! The simulation engine: one invocation generates one batch of orders.
//!
//! An invocation walks `ReadClock -> GenerateBatch -> AdvanceClock ->
//! Respond`. Within the batch every slot is `PickProduct -> ReserveStock ->
//! BuildOrder -> Publish`, and a slot that fails at any step is abandoned
//! without retrying another product. Catalog failures, clock failures and a
//! sink that does not answer in time abort the invocation; the remaining
//! per-slot failures are counted in the summary.
//!
//! A definite publish rejection releases the reserved unit again. A publish
//! timeout does not: the record may already be on the stream, so the unit
//! stays sold and the invocation stops before the clock is written.
//!
//! # Virtual time
//!
//! Orders are stamped progressively. Each published order consumes a step
//! of `1..=speed_factor * 60` seconds plus `0..=59` seconds of jitter, and
//! its timestamp is the previous order's timestamp plus that step. Slots
//! that produce no order consume nothing. At the end the clock advances by
//! the consumed seconds rounded up to whole minutes, so every timestamp of
//! the batch lies in `(previous_time, new_time]` and an empty batch leaves
//! the clock where it was.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::ProductCache;
use crate::clock::{ClockStore, SimulationClock};
use crate::config::SimulationConfig;
use crate::deadline::within;
use crate::errors::{EngineError, EngineResult, InventoryError, SinkError, SinkResult};
use crate::inventory::{InventoryStore, ReservationOutcome};
use crate::metrics::EngineMetrics;
use crate::order::{Order, OrderFactory};
use crate::sink::{EventRecord, EventSink, PublishReceipt};
use crate::types::{ProductId, SimulationState, SpeedFactor, VirtualTime};

/// Order slots that produced no order, by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    /// The picked product had no stock left.
    pub out_of_stock: u64,
    /// The inventory store failed or timed out.
    pub store_errors: u64,
    /// The order was built but the sink did not accept it.
    pub publish_failures: u64,
}

impl SkipCounts {
    /// Total skipped slots.
    pub const fn total(&self) -> u64 {
        self.out_of_stock + self.store_errors + self.publish_failures
    }
}

/// Outcome of one successful invocation. No order data is echoed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSummary {
    /// Slots drawn for this batch.
    pub orders_requested: u64,
    /// Orders accepted by the sink.
    pub orders_generated: u64,
    /// Virtual time read at the start.
    pub previous_time: VirtualTime,
    /// Virtual time written at the end.
    pub new_time: VirtualTime,
    /// `new_time - previous_time` in whole minutes.
    pub minutes_advanced: u64,
    /// Why the remaining slots produced nothing.
    pub skipped: SkipCounts,
}

impl InvocationSummary {
    /// Human readable outcome, `Generated N orders`.
    pub fn message(&self) -> String {
        format!("Generated {} orders", self.orders_generated)
    }

    /// JSON body returned to the invocation trigger.
    pub fn to_response_body(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message(),
            "orders_requested": self.orders_requested,
            "orders_generated": self.orders_generated,
            "previous_time": self.previous_time,
            "new_time": self.new_time,
            "minutes_advanced": self.minutes_advanced,
            "skipped": self.skipped,
        })
    }
}

/// Virtual time consumed by the orders of one batch.
#[derive(Debug, Clone, Copy)]
struct BatchTimeline {
    base: VirtualTime,
    max_offset_seconds: u64,
    consumed_seconds: u64,
}

impl BatchTimeline {
    const MAX_JITTER_SECONDS: u64 = 59;

    fn new(base: VirtualTime, speed_factor: SpeedFactor) -> Self {
        Self {
            base,
            max_offset_seconds: speed_factor.max_offset_seconds(),
            consumed_seconds: 0,
        }
    }

    fn draw_step<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.random_range(1..=self.max_offset_seconds)
            + rng.random_range(0..=Self::MAX_JITTER_SECONDS)
    }

    /// Timestamp of an order placed `step` seconds after the last one.
    fn stamp(&self, step: u64) -> VirtualTime {
        self.base
            .saturating_add_seconds(self.consumed_seconds.saturating_add(step))
    }

    fn commit(&mut self, step: u64) {
        self.consumed_seconds = self.consumed_seconds.saturating_add(step);
    }

    fn minutes_consumed(&self) -> u64 {
        self.consumed_seconds.div_ceil(60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotOutcome {
    Published,
    OutOfStock,
    StoreError,
    PublishFailed,
}

/// Orchestrates invocations over the three backing-store ports.
///
/// One engine instance owns one [`ProductCache`]; the cache survives across
/// invocations of the same instance and dies with it. Invocations may run
/// concurrently, on the same instance or on different ones.
#[derive(Debug)]
pub struct SimulationEngine<I, C, S> {
    inventory: I,
    clock: SimulationClock<C>,
    sink: S,
    cache: ProductCache,
    factory: OrderFactory,
    config: SimulationConfig,
    metrics: Arc<EngineMetrics>,
    rng: Mutex<StdRng>,
}

impl<I, C, S> SimulationEngine<I, C, S>
where
    I: InventoryStore,
    C: ClockStore,
    S: EventSink,
{
    /// Creates an engine with a cold product cache.
    pub fn new(inventory: I, clock_store: C, sink: S, config: SimulationConfig) -> Self {
        let rng = config
            .rng_seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Self {
            inventory,
            clock: SimulationClock::with_timeout(clock_store, config.timeouts.clock),
            sink,
            cache: ProductCache::with_timeout(config.sample_limit, config.timeouts.inventory),
            factory: OrderFactory::from_config(&config),
            config,
            metrics: Arc::new(EngineMetrics::new()),
            rng: Mutex::new(rng),
        }
    }

    /// Reports into `metrics` instead of private counters.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The inventory port.
    pub const fn inventory(&self) -> &I {
        &self.inventory
    }

    /// The virtual clock.
    pub const fn clock(&self) -> &SimulationClock<C> {
        &self.clock
    }

    /// The event sink port.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// The instance's product cache.
    pub const fn cache(&self) -> &ProductCache {
        &self.cache
    }

    /// The configuration the engine was built with.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Counters accumulated by this engine.
    pub const fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    /// Runs one invocation.
    #[instrument(name = "engine.run_once", skip(self))]
    pub async fn run_once(&self) -> EngineResult<InvocationSummary> {
        let result = self.invoke().await;
        match &result {
            Ok(summary) => {
                self.metrics.record_summary(summary);
                info!(
                    orders_requested = summary.orders_requested,
                    orders_generated = summary.orders_generated,
                    previous_time = %summary.previous_time,
                    new_time = %summary.new_time,
                    minutes_advanced = summary.minutes_advanced,
                    "{}",
                    summary.message()
                );
            }
            Err(err) => {
                self.metrics.record_failure();
                error!(error = %err, "invocation aborted");
            }
        }
        result
    }

    async fn invoke(&self) -> EngineResult<InvocationSummary> {
        let mut rng = StdRng::from_rng(&mut *self.rng.lock());

        let SimulationState {
            simulated_time: previous_time,
            speed_factor,
        } = self.clock.read().await.map_err(EngineError::ClockRead)?;

        let orders_requested = self.config.order_volume.sample(&mut rng);
        debug!(orders_requested, %previous_time, %speed_factor, "generating batch");

        let mut timeline = BatchTimeline::new(previous_time, speed_factor);
        let mut skipped = SkipCounts::default();
        let mut orders_generated = 0;

        for _ in 0..orders_requested {
            let product_id = self.cache.pick_random(&self.inventory, &mut rng).await?;
            match self.fill_slot(&product_id, &mut timeline, &mut rng).await? {
                SlotOutcome::Published => orders_generated += 1,
                SlotOutcome::OutOfStock => skipped.out_of_stock += 1,
                SlotOutcome::StoreError => skipped.store_errors += 1,
                SlotOutcome::PublishFailed => skipped.publish_failures += 1,
            }
        }

        let minutes_advanced = timeline.minutes_consumed();
        let new_time = self
            .clock
            .advance(previous_time, minutes_advanced)
            .await
            .map_err(EngineError::ClockWrite)?;

        Ok(InvocationSummary {
            orders_requested,
            orders_generated,
            previous_time,
            new_time,
            minutes_advanced,
            skipped,
        })
    }

    async fn fill_slot<R>(
        &self,
        product_id: &ProductId,
        timeline: &mut BatchTimeline,
        rng: &mut R,
    ) -> EngineResult<SlotOutcome>
    where
        R: Rng + Send + ?Sized,
    {
        let reservation = within(
            self.inventory_timeout(),
            self.inventory.decrement_if_available(product_id),
            InventoryError::Timeout,
        )
        .await;

        match reservation {
            Ok(ReservationOutcome::Reserved { remaining }) => {
                debug!(%product_id, %remaining, "unit reserved");
            }
            Ok(ReservationOutcome::OutOfStock) => {
                debug!(%product_id, "out of stock, skipping slot");
                return Ok(SlotOutcome::OutOfStock);
            }
            Err(err) => {
                warn!(%product_id, error = %err, "inventory store error, skipping slot");
                return Ok(SlotOutcome::StoreError);
            }
        }

        let step = timeline.draw_step(rng);
        let order = self
            .factory
            .synthesize(product_id.clone(), timeline.stamp(step), rng);

        match self.publish(&order).await {
            Ok(receipt) => {
                timeline.commit(step);
                debug!(
                    order_id = %order.order_id,
                    sequence_number = %receipt.sequence_number,
                    "order published"
                );
                Ok(SlotOutcome::Published)
            }
            Err(SinkError::Timeout(limit)) => {
                warn!(
                    order_id = %order.order_id,
                    %product_id,
                    "publish outcome unknown, keeping the reserved unit"
                );
                Err(EngineError::SinkTimeout(limit))
            }
            Err(err) => {
                warn!(
                    order_id = %order.order_id,
                    %product_id,
                    error = %err,
                    "publish failed, dropping order"
                );
                self.release(product_id).await;
                Ok(SlotOutcome::PublishFailed)
            }
        }
    }

    async fn publish(&self, order: &Order) -> SinkResult<PublishReceipt> {
        let record = EventRecord::from_order(order, self.config.max_record_bytes)?;
        within(
            self.config.timeouts.sink.as_duration(),
            self.sink.publish(record),
            SinkError::Timeout,
        )
        .await
    }

    /// Gives back a unit reserved for an order that was never published.
    async fn release(&self, product_id: &ProductId) {
        let released = within(
            self.inventory_timeout(),
            self.inventory.add_stock(product_id, 1),
            InventoryError::Timeout,
        )
        .await;

        match released {
            Ok(level) => {
                debug!(%product_id, stock_level = %level, "reserved unit released");
                self.metrics.record_compensation(true);
            }
            Err(err) => {
                warn!(%product_id, error = %err, "could not release reserved unit");
                self.metrics.record_compensation(false);
            }
        }
    }

    fn inventory_timeout(&self) -> Duration {
        self.config.timeouts.inventory.as_duration()
    }
}
