//! Fixed-cadence runner over the in-memory adapters, on paused time.

use std::sync::Arc;
use std::time::Duration;

use ordersim::runner::{SimulationRunner, TickPeriodMs};
use ordersim::types::VirtualTime;
use ordersim_integration_tests::{fixed_volume_config, init_tracing, product, MemoryWorld};
use tokio::sync::watch;

fn period() -> TickPeriodMs {
    TickPeriodMs::try_new(1_000).expect("positive period")
}

#[tokio::test(start_paused = true)]
async fn a_bounded_runner_stops_after_its_tick_limit() {
    init_tracing();
    let world = MemoryWorld::with_products([product("a", 1_000)]);
    let engine = Arc::new(world.engine(fixed_volume_config(2, 5)));
    let (_stop, shutdown) = watch::channel(false);

    let report = SimulationRunner::new(Arc::clone(&engine), period())
        .with_max_ticks(3)
        .run(shutdown)
        .await;

    assert_eq!(report.ticks, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(world.sink.len(), 15);
    assert_eq!(world.clock_store.write_count(), 3);
    let stored = world.clock_store.state().expect("record exists");
    assert!(stored.simulated_time > VirtualTime::simulation_start());
    assert_eq!(engine.metrics().snapshot().invocations, 3);
}

#[tokio::test(start_paused = true)]
async fn a_spawned_runner_stops_on_request() {
    let world = MemoryWorld::with_products([product("a", 1_000)]);
    let engine = Arc::new(world.engine(fixed_volume_config(2, 1)));
    let handle = SimulationRunner::new(engine, period()).spawn();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(!handle.is_finished());
    let report = handle.stop().await.expect("runner task completes");

    assert!(report.ticks >= 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.succeeded, report.ticks);
    assert_eq!(world.clock_store.write_count(), report.ticks);
}

#[tokio::test(start_paused = true)]
async fn failing_ticks_do_not_stop_the_runner() {
    // Given: a runner over an empty catalog
    let world = MemoryWorld::default();
    let engine = Arc::new(world.engine(fixed_volume_config(2, 5)));

    // When: it runs four ticks
    let report = SimulationRunner::new(engine, period())
        .with_max_ticks(4)
        .spawn()
        .join()
        .await
        .expect("runner task completes");

    // Then: every tick failed, each one was attempted and the clock was untouched
    assert_eq!(report.ticks, 4);
    assert_eq!(report.failed, 4);
    assert_eq!(world.clock_store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_shutdown_sender_ends_the_loop() {
    let world = MemoryWorld::with_products([product("a", 10)]);
    let engine = Arc::new(world.engine(fixed_volume_config(2, 1)));
    let (stop, shutdown) = watch::channel(false);
    let runner = SimulationRunner::new(engine, period());

    let task = tokio::spawn(async move { runner.run(shutdown).await });
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    drop(stop);

    let report = task.await.expect("runner task completes");
    assert!(report.ticks >= 1);
}
