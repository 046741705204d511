//! Cold/warm lifecycle of the per-instance product cache.

use ordersim::config::SampleLimit;
use ordersim::errors::EngineError;
use ordersim_integration_tests::{product, product_id, seeded_config, MemoryWorld};

#[tokio::test]
async fn warm_cache_never_rescans_the_store() {
    // Given: a fresh engine over a stocked catalog
    let world = MemoryWorld::with_products((0..10).map(|n| product(&format!("p{n}"), 500)));
    let engine = world.engine(seeded_config(1));
    assert!(!engine.cache().is_warm());

    // When: several invocations run
    for _ in 0..5 {
        engine.run_once().await.expect("invocation succeeds");
    }

    // Then: the store was scanned once, by the first invocation
    assert!(engine.cache().is_warm());
    assert_eq!(engine.cache().len(), 10);
    assert_eq!(world.inventory.scan_count(), 1);
}

#[tokio::test]
async fn a_new_instance_starts_cold() {
    let world = MemoryWorld::with_products([product("a", 50)]);

    world.engine(seeded_config(1)).run_once().await.expect("first instance");
    world.engine(seeded_config(2)).run_once().await.expect("second instance");

    assert_eq!(world.inventory.scan_count(), 2);
}

#[tokio::test]
async fn products_added_after_warm_up_are_never_picked() {
    let world = MemoryWorld::with_products([product("early", 1_000)]);
    let engine = world.engine(seeded_config(4));
    engine.run_once().await.expect("warms the cache");

    world.inventory.insert(product("late", 1_000));
    for _ in 0..5 {
        engine.run_once().await.expect("invocation succeeds");
    }

    let orders = world.sink.orders().expect("decodable");
    assert!(orders
        .iter()
        .all(|order| order.line_item.product_id == product_id("early")));
    assert_eq!(world.inventory.scan_count(), 1);
}

#[tokio::test]
async fn depleted_products_stay_cached_and_fail_their_reservation() {
    let world = MemoryWorld::with_products([product("a", 1)]);
    let engine = world.engine(seeded_config(5));

    let first = engine.run_once().await.expect("invocation succeeds");
    let second = engine.run_once().await.expect("invocation succeeds");

    assert_eq!(first.orders_generated, 1);
    assert_eq!(second.orders_generated, 0);
    assert_eq!(second.skipped.out_of_stock, second.orders_requested);
    assert_eq!(engine.cache().len(), 1);
}

#[tokio::test]
async fn an_empty_load_is_retried_on_the_next_invocation() {
    // Given: an engine whose first scan finds nothing
    let world = MemoryWorld::default();
    let engine = world.engine(seeded_config(1));
    assert_eq!(engine.run_once().await, Err(EngineError::EmptyCatalog));
    assert!(!engine.cache().is_warm());

    // When: the catalog gets seeded afterwards
    world.inventory.insert(product("a", 100));
    let summary = engine.run_once().await.expect("invocation succeeds");

    // Then: the second invocation scanned again and generated orders
    assert!(summary.orders_generated > 0);
    assert_eq!(world.inventory.scan_count(), 2);
    assert!(engine.cache().is_warm());
}

#[tokio::test]
async fn the_sample_is_bounded_by_the_configured_limit() {
    let world = MemoryWorld::with_products((0..40).map(|n| product(&format!("p{n:02}"), 100)));
    let limit = SampleLimit::try_new(8).expect("valid limit");
    let engine = world.engine(seeded_config(6).with_sample_limit(limit));

    engine.run_once().await.expect("invocation succeeds");

    assert_eq!(engine.cache().len(), 8);
    let sampled = engine
        .cache()
        .sample(engine.inventory())
        .await
        .expect("warm cache");
    let orders = world.sink.orders().expect("decodable");
    assert!(orders
        .iter()
        .all(|order| sampled.contains(&order.line_item.product_id)));
}
