use std::time::Duration;

use ordersim::clock::{ClockKey, ClockStore};
use ordersim::config::MaxRecordBytes;
use ordersim::errors::{ClockError, InventoryError, SinkError};
use ordersim::inventory::{InventoryStore, ScanOptions};
use ordersim::order::OrderFactory;
use ordersim::sink::{EventRecord, EventSink};
use ordersim::types::{Product, ProductId, StockLevel, VirtualTime};
use ordersim_memory::{InMemoryClockStore, InMemoryEventSink, InMemoryInventory};
use ordersim_testing::chaos::{ChaosConfig, ChaosExt, ChaosOperation};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

fn stocked(raw: &str, units: u64) -> (ProductId, InMemoryInventory) {
    let id = ProductId::try_new(raw).expect("valid product id");
    let inventory = InMemoryInventory::with_products([Product::new(
        id.clone(),
        StockLevel::new(units),
        "chaos",
        Decimal::ONE,
    )]);
    (id, inventory)
}

#[tokio::test]
async fn chaos_mode_can_force_reservation_failures() {
    // Given: deterministic chaos failing every reservation
    let (id, inventory) = stocked("chaos-reserve", 3);
    let chaos = inventory.clone().with_chaos(
        ChaosConfig::deterministic()
            .with_failure_probability(1.0)
            .targeting([ChaosOperation::Reserve]),
    );

    // When: reserving through the chaos wrapper
    let result = chaos.decrement_if_available(&id).await;

    // Then: the call fails as a throttled store and no stock is taken
    assert!(matches!(result, Err(InventoryError::Throttled(_))));
    assert_eq!(inventory.stock_of(&id), Some(StockLevel::new(3)));

    // And: untargeted operations keep working
    let page = chaos
        .scan_product_ids(&ScanOptions::new())
        .await
        .expect("scan is not targeted");
    assert_eq!(page.product_ids, vec![id]);
}

#[tokio::test]
async fn chaos_mode_can_force_clock_failures() {
    // Given: chaos failing every clock call
    let chaos = InMemoryClockStore::new()
        .with_chaos(ChaosConfig::deterministic().with_failure_probability(1.0));

    // When / Then: both reads and writes fail with their own error kinds
    assert!(matches!(
        chaos.load(&ClockKey::global()).await,
        Err(ClockError::ReadFailed(_))
    ));
    assert!(matches!(
        chaos
            .set_time(&ClockKey::global(), VirtualTime::simulation_start())
            .await,
        Err(ClockError::WriteFailed(_))
    ));
    assert_eq!(chaos.inner().write_count(), 0);
}

#[tokio::test]
async fn chaos_mode_can_force_publish_failures() {
    // Given: a sink that rejects every record
    let sink = InMemoryEventSink::new();
    let chaos = sink
        .clone()
        .with_chaos(ChaosConfig::deterministic().with_failure_probability(1.0));
    let order = OrderFactory::default().synthesize(
        ProductId::try_new("chaos-publish").expect("valid product id"),
        VirtualTime::default(),
        &mut StdRng::seed_from_u64(1),
    );
    let record = EventRecord::from_order(&order, MaxRecordBytes::default()).expect("fits");

    // When: publishing through chaos
    let result = chaos.publish(record).await;

    // Then: the record never reaches the inner sink
    assert!(matches!(result, Err(SinkError::PublishFailed(_))));
    assert!(sink.is_empty());
}

#[tokio::test(start_paused = true)]
async fn chaos_mode_can_inject_latency() {
    // Given: every reservation stalls for ten seconds
    let (id, inventory) = stocked("chaos-latency", 1);
    let chaos = inventory.with_chaos(
        ChaosConfig::deterministic().with_latency(Duration::from_secs(10), 1.0),
    );

    // When: a caller gives up after one second
    let result =
        tokio::time::timeout(Duration::from_secs(1), chaos.decrement_if_available(&id)).await;

    // Then: the deadline fires before the store answers
    assert!(result.is_err());
}

#[tokio::test]
async fn half_probability_failures_are_reproducible() {
    // Given: two identically seeded wrappers failing half the reservations
    let config = ChaosConfig::deterministic()
        .with_seed(7)
        .with_failure_probability(0.5)
        .targeting([ChaosOperation::Reserve]);
    let (id, first) = stocked("chaos-replay", 1_000);
    let (_, second) = stocked("chaos-replay", 1_000);
    let first = first.with_chaos(config.clone());
    let second = second.with_chaos(config);

    // When: both run the same sequence of reservations
    let mut outcomes = (Vec::new(), Vec::new());
    for _ in 0..50 {
        outcomes.0.push(first.decrement_if_available(&id).await.is_ok());
        outcomes.1.push(second.decrement_if_available(&id).await.is_ok());
    }

    // Then: they fail on exactly the same calls
    assert_eq!(outcomes.0, outcomes.1);
    assert!(outcomes.0.contains(&true) && outcomes.0.contains(&false));
}
