//! # ordersim
//!
//! An inventory-aware order event simulator. Each invocation reads a durable
//! virtual clock, manufactures a batch of synthetic orders against a finite
//! shared inventory, publishes every order to an event sink and advances the
//! clock.
//!
//! The engine talks to three backing stores through ports:
//!
//! - [`InventoryStore`] with an atomic conditional decrement, so concurrent
//!   invocations can never oversell a product,
//! - [`ClockStore`], a single keyed record that is only ever read and
//!   overwritten,
//! - [`EventSink`], which receives serialized orders keyed by order id.
//!
//! ```ignore
//! let engine = SimulationEngine::new(inventory, clock_store, sink, SimulationConfig::default());
//! let summary = engine.run_once().await?;
//! println!("{}", summary.to_response_body());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod clock;
pub mod config;
mod deadline;
pub mod engine;
pub mod errors;
pub mod inventory;
pub mod locale;
pub mod metrics;
pub mod order;
pub mod replenish;
pub mod runner;
pub mod sink;
pub mod types;

pub use cache::ProductCache;
pub use clock::{ClockKey, ClockStore, SimulationClock};
pub use config::{
    MaxRecordBytes, MoneyRange, OperationTimeoutMs, PortTimeouts, Probability, SampleLimit,
    SimulationConfig, UnitRange,
};
pub use engine::{InvocationSummary, SimulationEngine, SkipCounts};
pub use errors::{
    ClockError, ClockResult, ConfigError, ConfigResult, EngineError, EngineResult,
    InventoryError, InventoryResult, SinkError, SinkResult,
};
pub use inventory::{InventoryStore, ReservationOutcome, ScanOptions, ScanPage};
pub use locale::Locale;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use order::{CustomerGeo, LineItem, Order, OrderFactory, OrderStatus};
pub use replenish::{replenish, ReplenishConfig, ReplenishReport};
pub use runner::{RunnerHandle, RunnerReport, SimulationRunner, TickPeriodMs};
pub use sink::{EventRecord, EventSink, PublishReceipt};
pub use types::{Product, ProductId, SimulationState, SpeedFactor, StockLevel, VirtualTime};
