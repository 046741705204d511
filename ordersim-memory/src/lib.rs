//! In-memory adapters for the `ordersim` simulation engine
//!
//! This crate provides in-memory implementations of the three backing-store
//! ports (`InventoryStore`, `ClockStore` and `EventSink`), useful for tests,
//! demos and local runs where no external store is available. Every adapter
//! is cheap to clone; clones share the same underlying state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod inventory;
mod seed;
mod sink;

pub use clock::InMemoryClockStore;
pub use inventory::InMemoryInventory;
pub use seed::{random_product_id, CatalogSeed};
pub use sink::InMemoryEventSink;
