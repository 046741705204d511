//! Inventory store port.
//!
//! The engine depends on exactly four operations: point read, paginated
//! identifier scan, conditional decrement and additive increment. Any
//! backend that can offer them (a key-value table, a SQL row with a
//! `CHECK`, an in-memory map behind a lock) can drive the simulation.

use async_trait::async_trait;

use crate::errors::InventoryResult;
use crate::types::{Product, ProductId, StockLevel};

/// Result of a conditional decrement that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// One unit was taken; `remaining` is the level after the write.
    Reserved {
        /// Stock left after the reservation
        remaining: StockLevel,
    },
    /// The condition `stock_level > 0` failed, or the product is unknown.
    /// Nothing was written.
    OutOfStock,
}

impl ReservationOutcome {
    /// Whether a unit was taken.
    pub const fn is_reserved(self) -> bool {
        matches!(self, Self::Reserved { .. })
    }
}

/// Options for an identifier scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum number of identifiers in the page (None = store default).
    pub limit: Option<usize>,
    /// Resume strictly after this identifier.
    pub exclusive_start: Option<ProductId>,
}

impl ScanOptions {
    /// Scans from the beginning with no limit.
    pub const fn new() -> Self {
        Self {
            limit: None,
            exclusive_start: None,
        }
    }

    /// Caps the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resumes after `product_id`.
    #[must_use]
    pub fn starting_after(mut self, product_id: ProductId) -> Self {
        self.exclusive_start = Some(product_id);
        self
    }
}

/// One page of an identifier-only scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Identifiers in store order.
    pub product_ids: Vec<ProductId>,
    /// Key to resume from; `None` when the scan is complete.
    pub last_evaluated: Option<ProductId>,
}

impl ScanPage {
    /// Whether more pages follow.
    pub const fn has_more(&self) -> bool {
        self.last_evaluated.is_some()
    }
}

/// Port to the inventory backing store.
///
/// # Conditional decrement contract
///
/// [`decrement_if_available`](Self::decrement_if_available) must be a single
/// atomic operation on the store side: decrement by one *only if* the
/// current level is positive. Implementations must not read the level and
/// write it back in two steps. Under N concurrent callers racing on a
/// product with one unit left, exactly one observes
/// [`ReservationOutcome::Reserved`] and the rest observe
/// [`ReservationOutcome::OutOfStock`].
///
/// # Additive increment contract
///
/// [`add_stock`](Self::add_stock) is unconditional and commutes with the
/// decrement, so replenishment may run while simulations are in flight.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Reads one product, `None` when it does not exist.
    async fn get_product(&self, product_id: &ProductId) -> InventoryResult<Option<Product>>;

    /// Scans product identifiers only, one page at a time.
    async fn scan_product_ids(&self, options: &ScanOptions) -> InventoryResult<ScanPage>;

    /// Atomically takes one unit if at least one is available.
    async fn decrement_if_available(
        &self,
        product_id: &ProductId,
    ) -> InventoryResult<ReservationOutcome>;

    /// Adds `units` to an existing product and returns the new level.
    async fn add_stock(&self, product_id: &ProductId, units: u64) -> InventoryResult<StockLevel>;
}
