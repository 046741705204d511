use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ordersim::errors::{InventoryError, InventoryResult};
use ordersim::inventory::{InventoryStore, ReservationOutcome, ScanOptions, ScanPage};
use ordersim::types::{Product, ProductId, StockLevel};
use parking_lot::RwLock;
use tracing::trace;

/// Thread-safe in-memory inventory table keyed by product id.
///
/// Scans return identifiers in key order. The conditional decrement runs
/// entirely under the write lock, so it is atomic with respect to every
/// other operation on the same table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    products: Arc<RwLock<BTreeMap<ProductId, Product>>>,
    scans: Arc<AtomicU64>,
}

impl InMemoryInventory {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding `products`.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let inventory = Self::new();
        for product in products {
            inventory.insert(product);
        }
        inventory
    }

    /// Insert or replace a product.
    pub fn insert(&self, product: Product) {
        self.products.write().insert(product.id.clone(), product);
    }

    /// Current stock of `product_id`, `None` if unknown.
    pub fn stock_of(&self, product_id: &ProductId) -> Option<StockLevel> {
        self.products
            .read()
            .get(product_id)
            .map(|product| product.stock_level)
    }

    /// Sum of every product's stock.
    pub fn total_stock(&self) -> u64 {
        self.products
            .read()
            .values()
            .map(|product| product.stock_level.units())
            .sum()
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }

    /// Number of scan calls served so far.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventory {
    async fn get_product(&self, product_id: &ProductId) -> InventoryResult<Option<Product>> {
        Ok(self.products.read().get(product_id).cloned())
    }

    async fn scan_product_ids(&self, options: &ScanOptions) -> InventoryResult<ScanPage> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let products = self.products.read();

        let lower = options
            .exclusive_start
            .as_ref()
            .map_or(Bound::Unbounded, Bound::Excluded);
        let mut remaining = products
            .range::<ProductId, _>((lower, Bound::Unbounded))
            .map(|(id, _)| id);

        let limit = options.limit.unwrap_or(usize::MAX);
        let product_ids: Vec<ProductId> = remaining.by_ref().take(limit).cloned().collect();
        let last_evaluated = if remaining.next().is_some() {
            product_ids.last().cloned()
        } else {
            None
        };
        drop(products);

        trace!(returned = product_ids.len(), more = last_evaluated.is_some(), "scan served");
        Ok(ScanPage {
            product_ids,
            last_evaluated,
        })
    }

    async fn decrement_if_available(
        &self,
        product_id: &ProductId,
    ) -> InventoryResult<ReservationOutcome> {
        let mut products = self.products.write();
        let outcome = products
            .get_mut(product_id)
            .and_then(|product| {
                let remaining = product.stock_level.checked_decrement()?;
                product.stock_level = remaining;
                Some(ReservationOutcome::Reserved { remaining })
            })
            .unwrap_or(ReservationOutcome::OutOfStock);
        drop(products);
        Ok(outcome)
    }

    async fn add_stock(&self, product_id: &ProductId, units: u64) -> InventoryResult<StockLevel> {
        let mut products = self.products.write();
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| InventoryError::ProductNotFound(product_id.clone()))?;
        let level = product
            .stock_level
            .checked_add(units)
            .ok_or_else(|| InventoryError::StockOverflow(product_id.clone()))?;
        product.stock_level = level;
        drop(products);
        Ok(level)
    }
}
