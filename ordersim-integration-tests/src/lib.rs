//! Integration tests for `ordersim`
//!
//! This crate contains tests that drive the simulation engine through the
//! in-memory adapters and the chaos wrappers together. The library part
//! holds the fixtures shared by every test binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use ordersim::config::{SimulationConfig, UnitRange};
use ordersim::engine::SimulationEngine;
use ordersim::types::{Product, ProductId, SimulationState, StockLevel};
use ordersim_memory::{InMemoryClockStore, InMemoryEventSink, InMemoryInventory};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// An engine wired to the in-memory adapters.
pub type MemoryEngine = SimulationEngine<InMemoryInventory, InMemoryClockStore, InMemoryEventSink>;

/// Installs a `RUST_LOG` driven subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Builds a product id, panicking on invalid input.
pub fn product_id(raw: &str) -> ProductId {
    ProductId::try_new(raw).expect("valid product id")
}

/// A product with `units` in stock.
pub fn product(raw: &str, units: u64) -> Product {
    Product::new(product_id(raw), StockLevel::new(units), "fixture", Decimal::TEN)
}

/// Default configuration with a fixed seed.
pub fn seeded_config(seed: u64) -> SimulationConfig {
    SimulationConfig::default().with_seed(seed)
}

/// Seeded configuration drawing exactly `orders` slots per invocation.
pub fn fixed_volume_config(seed: u64, orders: u64) -> SimulationConfig {
    seeded_config(seed)
        .with_order_volume(UnitRange::try_new(orders, orders).expect("non-inverted range"))
}

/// The three shared in-memory stores an engine runs against.
///
/// Clones share state, so several engines built from one world race on the
/// same inventory and clock, like concurrent invocations do.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    /// Inventory table.
    pub inventory: InMemoryInventory,
    /// Clock table.
    pub clock_store: InMemoryClockStore,
    /// Order stream.
    pub sink: InMemoryEventSink,
}

impl MemoryWorld {
    /// A world with `products` and no clock record.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            inventory: InMemoryInventory::with_products(products),
            ..Self::default()
        }
    }

    /// Seeds the clock record.
    #[must_use]
    pub fn with_clock(mut self, state: SimulationState) -> Self {
        self.clock_store = InMemoryClockStore::with_state(state);
        self
    }

    /// A fresh engine instance, with its own cold cache, over this world.
    pub fn engine(&self, config: SimulationConfig) -> MemoryEngine {
        SimulationEngine::new(
            self.inventory.clone(),
            self.clock_store.clone(),
            self.sink.clone(),
            config,
        )
    }
}
