use ordersim::config::{MoneyRange, UnitRange};
use ordersim::types::{Product, ProductId, StockLevel};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::info;

use crate::InMemoryInventory;

const UNKNOWN_CATEGORY: &str = "unknown";

/// Randomized initial stock and list price for a bulk catalog load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSeed {
    /// Initial units per product.
    pub stock: UnitRange,
    /// List price per product.
    pub price: MoneyRange,
}

impl Default for CatalogSeed {
    fn default() -> Self {
        Self {
            stock: UnitRange::try_new(50, 800).expect("50..=800 is a valid range"),
            price: MoneyRange::try_new(Decimal::TEN, Decimal::new(500, 0))
                .expect("10.00..500.00 is a valid range"),
        }
    }
}

impl CatalogSeed {
    /// Builds one product; a missing or blank category becomes `unknown`.
    pub fn product<R: Rng + ?Sized>(
        &self,
        id: ProductId,
        category: Option<&str>,
        rng: &mut R,
    ) -> Product {
        let category = category
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .unwrap_or(UNKNOWN_CATEGORY);
        Product::new(
            id,
            StockLevel::new(self.stock.sample(rng)),
            category,
            self.price.sample(rng),
        )
    }

    /// Loads `entries` of `(id, category)` into `inventory`.
    pub fn load<'a, R, I>(&self, inventory: &InMemoryInventory, entries: I, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = (ProductId, Option<&'a str>)>,
    {
        let mut loaded = 0;
        for (id, category) in entries {
            inventory.insert(self.product(id, category, rng));
            loaded += 1;
        }
        info!(loaded, "catalog seeded");
        loaded
    }

    /// Builds an inventory of `count` products with random identifiers,
    /// cycling through `categories`.
    pub fn random_inventory<R: Rng + ?Sized>(
        &self,
        count: usize,
        categories: &[&str],
        rng: &mut R,
    ) -> InMemoryInventory {
        let inventory = InMemoryInventory::new();
        let ids: Vec<ProductId> = (0..count).map(|_| random_product_id(rng)).collect();
        let entries = ids
            .into_iter()
            .enumerate()
            .map(|(n, id)| (id, categories.get(n % categories.len().max(1)).copied()));
        self.load(&inventory, entries, rng);
        inventory
    }
}

/// A 32 character lowercase hex identifier, the shape of marketplace
/// product ids.
pub fn random_product_id<R: Rng + ?Sized>(rng: &mut R) -> ProductId {
    let raw: u128 = rng.random();
    ProductId::try_new(format!("{raw:032x}")).expect("hex digits form a valid product id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    #[test]
    fn seeded_products_fall_in_the_configured_ranges() {
        let seed = CatalogSeed::default();
        let mut rng = StdRng::seed_from_u64(17);

        let inventory = seed.random_inventory(200, &["toys", "garden"], &mut rng);

        assert_eq!(inventory.len(), 200);
        let total = inventory.total_stock();
        assert!((200 * 50..=200 * 800).contains(&total));
        for n in 0..20 {
            let product = seed.product(random_product_id(&mut rng), None, &mut rng);
            assert!(seed.stock.contains(product.stock_level.units()), "{n}");
            assert!(product.price >= dec!(10.00) && product.price < dec!(500.00));
        }
    }

    #[test]
    fn blank_categories_become_unknown() {
        let seed = CatalogSeed::default();
        let mut rng = StdRng::seed_from_u64(2);
        let id = random_product_id(&mut rng);

        assert_eq!(seed.product(id.clone(), Some("  "), &mut rng).category, "unknown");
        assert_eq!(seed.product(id.clone(), None, &mut rng).category, "unknown");
        assert_eq!(seed.product(id, Some("perfumaria"), &mut rng).category, "perfumaria");
    }

    #[test]
    fn random_ids_look_like_marketplace_ids() {
        let mut rng = StdRng::seed_from_u64(9);
        let id = random_product_id(&mut rng);
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
