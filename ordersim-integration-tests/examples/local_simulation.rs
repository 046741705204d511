//! Runs a short simulation against the in-memory adapters.
//!
//! ```text
//! RUST_LOG=ordersim=debug cargo run -p ordersim-integration-tests --example local_simulation
//! ```

use std::sync::Arc;

use ordersim::config::SimulationConfig;
use ordersim::engine::SimulationEngine;
use ordersim::replenish::{replenish, ReplenishConfig};
use ordersim::runner::{SimulationRunner, TickPeriodMs};
use ordersim::types::{SimulationState, SpeedFactor, VirtualTime};
use ordersim_memory::{CatalogSeed, InMemoryClockStore, InMemoryEventSink};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

const CATEGORIES: &[&str] = &["bed_bath_table", "health_beauty", "sports_leisure", "toys"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("ordersim local simulation");
    println!("=========================\n");

    let mut rng = StdRng::seed_from_u64(2018);
    let inventory = CatalogSeed::default().random_inventory(40, CATEGORIES, &mut rng);
    println!("Seeded {} products with {} units in total", inventory.len(), inventory.total_stock());

    let clock_store = InMemoryClockStore::with_state(SimulationState::new(
        VirtualTime::simulation_start(),
        SpeedFactor::try_new(30)?,
    ));
    let sink = InMemoryEventSink::new();

    let engine = Arc::new(SimulationEngine::new(
        inventory.clone(),
        clock_store.clone(),
        sink.clone(),
        SimulationConfig::default().with_seed(7),
    ));

    let report = SimulationRunner::new(Arc::clone(&engine), TickPeriodMs::try_new(200)?)
        .with_max_ticks(5)
        .spawn()
        .join()
        .await?;
    println!(
        "Runner finished: {} ticks, {} succeeded, {} failed",
        report.ticks, report.succeeded, report.failed
    );

    if let Some(state) = clock_store.state() {
        println!("Virtual clock now at {}", state.simulated_time);
    }
    for order in sink.orders()?.iter().take(3) {
        println!(
            "  {} {} {} ({})",
            order.purchase_timestamp.to_purchase_string(),
            order.order_id,
            order.line_item.product_id,
            order.customer_geo.city
        );
    }

    let topped_up = replenish(&inventory, &ReplenishConfig::default(), &mut rng).await?;
    println!(
        "Replenished {} of {} products, {} units added",
        topped_up.replenished, topped_up.scanned, topped_up.units_added
    );

    println!("\nMetrics:");
    println!("{}", serde_json::to_string_pretty(&engine.metrics().snapshot())?);
    Ok(())
}
