//! Replenishment passes over the in-memory catalog.

use ordersim::config::{Probability, SampleLimit, UnitRange};
use ordersim::errors::InventoryError;
use ordersim::{replenish, ReplenishConfig};
use ordersim_integration_tests::{product, product_id};
use ordersim_memory::InMemoryInventory;
use ordersim_testing::{ChaosConfig, ChaosExt, ChaosOperation};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn catalog(count: usize, units: u64) -> InMemoryInventory {
    InMemoryInventory::with_products((0..count).map(|n| product(&format!("p{n:03}"), units)))
}

fn always() -> ReplenishConfig {
    ReplenishConfig::default().with_probability(Probability::try_new(1.0).expect("valid"))
}

#[tokio::test]
async fn certain_replenishment_tops_up_every_product_within_range() {
    let inventory = catalog(12, 0);
    let config = always();
    let mut rng = StdRng::seed_from_u64(3);

    let report = replenish(&inventory, &config, &mut rng).await.expect("pass completes");

    assert_eq!(report.scanned, 12);
    assert_eq!(report.replenished, 12);
    assert_eq!(report.failures, 0);
    assert_eq!(report.units_added, inventory.total_stock());
    for n in 0..12 {
        let level = inventory
            .stock_of(&product_id(&format!("p{n:03}")))
            .expect("product exists");
        assert!(config.amount.contains(level.units()));
    }
}

#[tokio::test]
async fn zero_probability_leaves_the_catalog_untouched() {
    let inventory = catalog(12, 7);
    let config =
        ReplenishConfig::default().with_probability(Probability::try_new(0.0).expect("valid"));
    let mut rng = StdRng::seed_from_u64(3);

    let report = replenish(&inventory, &config, &mut rng).await.expect("pass completes");

    assert_eq!(report.scanned, 12);
    assert_eq!(report.replenished, 0);
    assert_eq!(inventory.total_stock(), 12 * 7);
}

#[tokio::test]
async fn replenishment_visits_every_page() {
    // Given: 30 products and a page size that does not divide them evenly
    let inventory = catalog(30, 1);
    let config = always()
        .with_page_size(SampleLimit::try_new(7).expect("valid"))
        .with_amount(UnitRange::try_new(2, 2).expect("valid"));
    let mut rng = StdRng::seed_from_u64(9);

    // When: a pass runs
    let report = replenish(&inventory, &config, &mut rng).await.expect("pass completes");

    // Then: every product was visited exactly once across five pages
    assert_eq!(report.scanned, 30);
    assert_eq!(report.units_added, 60);
    assert_eq!(inventory.total_stock(), 30 * 3);
    assert_eq!(inventory.scan_count(), 5);
}

#[tokio::test]
async fn failed_updates_are_counted_and_the_pass_continues() {
    let inventory = catalog(10, 4);
    let flaky = inventory.clone().with_chaos(
        ChaosConfig::deterministic()
            .with_failure_probability(1.0)
            .targeting([ChaosOperation::AddStock]),
    );
    let mut rng = StdRng::seed_from_u64(1);

    let report = replenish(&flaky, &always(), &mut rng).await.expect("pass completes");

    assert_eq!(report.scanned, 10);
    assert_eq!(report.replenished, 0);
    assert_eq!(report.failures, 10);
    assert_eq!(inventory.total_stock(), 40);
}

#[tokio::test]
async fn a_failed_scan_aborts_the_pass() {
    let inventory = catalog(10, 4);
    let unreachable = inventory.clone().with_chaos(
        ChaosConfig::deterministic()
            .with_failure_probability(1.0)
            .targeting([ChaosOperation::ScanProducts]),
    );
    let mut rng = StdRng::seed_from_u64(1);

    let result = replenish(&unreachable, &always(), &mut rng).await;

    assert!(matches!(result, Err(InventoryError::Unavailable(_))));
    assert_eq!(inventory.total_stock(), 40);
}
