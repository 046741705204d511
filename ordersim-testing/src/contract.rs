//! Behavioural contracts every backing-store adapter must satisfy.
//!
//! Each `test_*` function builds a fresh adapter through the supplied
//! factory, drives it through one scenario and reports the first violated
//! expectation. The `*_contract_tests!` macros expand the whole suite into
//! `#[tokio::test]` functions for a given adapter.

use std::fmt;
use std::sync::Arc;

use ordersim::clock::{ClockKey, ClockStore};
use ordersim::errors::{ClockError, InventoryError};
use ordersim::inventory::{InventoryStore, ReservationOutcome, ScanOptions};
use ordersim::types::{Product, ProductId, SimulationState, SpeedFactor, StockLevel, VirtualTime};
use rust_decimal::Decimal;
use tokio::sync::Barrier;

/// A violated contract expectation.
#[derive(Debug)]
pub struct ContractTestFailure {
    scenario: &'static str,
    detail: String,
}

impl ContractTestFailure {
    fn new(scenario: &'static str, detail: impl Into<String>) -> Self {
        Self {
            scenario,
            detail: detail.into(),
        }
    }

    fn inventory_error(
        scenario: &'static str,
        operation: &'static str,
        error: &InventoryError,
    ) -> Self {
        Self::new(
            scenario,
            format!("{operation} operation returned unexpected error: {error}"),
        )
    }

    fn clock_error(scenario: &'static str, operation: &'static str, error: &ClockError) -> Self {
        Self::new(
            scenario,
            format!("{operation} operation returned unexpected error: {error}"),
        )
    }
}

impl fmt::Display for ContractTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scenario, self.detail)
    }
}

impl std::error::Error for ContractTestFailure {}

/// Outcome of one contract scenario.
pub type ContractTestResult = Result<(), ContractTestFailure>;

fn contract_product_id(
    scenario: &'static str,
    label: &str,
) -> Result<ProductId, ContractTestFailure> {
    ProductId::try_new(format!("contract-{scenario}-{label}"))
        .map_err(|err| ContractTestFailure::new(scenario, format!("invalid product id: {err}")))
}

fn contract_product(id: ProductId, units: u64) -> Product {
    Product::new(id, StockLevel::new(units), "contract", Decimal::ONE_HUNDRED)
}

fn ensure(
    scenario: &'static str,
    condition: bool,
    detail: impl FnOnce() -> String,
) -> ContractTestResult {
    if condition {
        Ok(())
    } else {
        Err(ContractTestFailure::new(scenario, detail()))
    }
}

/// Reserving the last unit succeeds once, then reports out of stock.
pub async fn test_conditional_decrement<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn(Vec<Product>) -> S + Send + Sync + Clone + 'static,
    S: InventoryStore + 'static,
{
    const SCENARIO: &str = "conditional_decrement";

    let a = contract_product_id(SCENARIO, "a")?;
    let b = contract_product_id(SCENARIO, "b")?;
    let store = make_store(vec![contract_product(a.clone(), 1), contract_product(b.clone(), 0)]);

    let reserve = |id: ProductId| {
        let store = &store;
        async move {
            store
                .decrement_if_available(&id)
                .await
                .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "decrement", &err))
        }
    };

    let first = reserve(a.clone()).await?;
    ensure(
        SCENARIO,
        first
            == ReservationOutcome::Reserved {
                remaining: StockLevel::ZERO,
            },
        || format!("first reservation of the last unit returned {first:?}"),
    )?;

    let second = reserve(a.clone()).await?;
    ensure(SCENARIO, second == ReservationOutcome::OutOfStock, || {
        format!("reserving an empty shelf returned {second:?}")
    })?;

    let empty = reserve(b).await?;
    ensure(SCENARIO, empty == ReservationOutcome::OutOfStock, || {
        format!("reserving a zero-stock product returned {empty:?}")
    })?;

    let stored = store
        .get_product(&a)
        .await
        .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "get_product", &err))?;
    ensure(
        SCENARIO,
        stored.map(|product| product.stock_level) == Some(StockLevel::ZERO),
        || "stock of a depleted product is not zero".to_string(),
    )
}

/// A product the store does not know is out of stock, not an error.
pub async fn test_unknown_product_is_out_of_stock<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn(Vec<Product>) -> S + Send + Sync + Clone + 'static,
    S: InventoryStore + 'static,
{
    const SCENARIO: &str = "unknown_product";

    let ghost = contract_product_id(SCENARIO, "ghost")?;
    let store = make_store(Vec::new());

    let outcome = store
        .decrement_if_available(&ghost)
        .await
        .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "decrement", &err))?;
    ensure(SCENARIO, outcome == ReservationOutcome::OutOfStock, || {
        format!("reserving an unknown product returned {outcome:?}")
    })?;

    let product = store
        .get_product(&ghost)
        .await
        .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "get_product", &err))?;
    ensure(SCENARIO, product.is_none(), || {
        "a failed reservation created the product".to_string()
    })
}

/// Under contention, exactly `stock` of many concurrent reservations win.
pub async fn test_no_oversell_under_contention<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn(Vec<Product>) -> S + Send + Sync + Clone + 'static,
    S: InventoryStore + 'static,
{
    const SCENARIO: &str = "no_oversell";
    const STOCK: u64 = 7;
    const CALLERS: usize = 40;

    let hot = contract_product_id(SCENARIO, "hot")?;
    let store = Arc::new(make_store(vec![contract_product(hot.clone(), STOCK)]));
    let barrier = Arc::new(Barrier::new(CALLERS));

    let tasks: Vec<_> = (0..CALLERS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let hot = hot.clone();
            tokio::spawn(async move {
                let _ = barrier.wait().await;
                store.decrement_if_available(&hot).await
            })
        })
        .collect();

    let mut reserved = 0u64;
    for task in tasks {
        let outcome = task
            .await
            .map_err(|err| ContractTestFailure::new(SCENARIO, format!("task failed: {err}")))?
            .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "decrement", &err))?;
        if outcome.is_reserved() {
            reserved += 1;
        }
    }

    ensure(SCENARIO, reserved == STOCK, || {
        format!("{reserved} of {CALLERS} racing reservations won against stock {STOCK}")
    })?;

    let stored = store
        .get_product(&hot)
        .await
        .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "get_product", &err))?;
    ensure(
        SCENARIO,
        stored.map(|product| product.stock_level) == Some(StockLevel::ZERO),
        || "stock is not zero after the race".to_string(),
    )
}

/// Additive updates and reservations commute.
pub async fn test_add_stock_commutes_with_decrement<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn(Vec<Product>) -> S + Send + Sync + Clone + 'static,
    S: InventoryStore + 'static,
{
    const SCENARIO: &str = "add_stock_commutes";

    let id = contract_product_id(SCENARIO, "a")?;
    let store = make_store(vec![contract_product(id.clone(), 0)]);

    let level = store
        .add_stock(&id, 3)
        .await
        .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "add_stock", &err))?;
    ensure(SCENARIO, level == StockLevel::new(3), || {
        format!("add_stock(3) on an empty shelf returned {level}")
    })?;

    let outcome = store
        .decrement_if_available(&id)
        .await
        .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "decrement", &err))?;
    ensure(SCENARIO, outcome.is_reserved(), || {
        format!("reservation after a top-up returned {outcome:?}")
    })?;

    let level = store
        .add_stock(&id, 10)
        .await
        .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "add_stock", &err))?;
    ensure(SCENARIO, level == StockLevel::new(12), || {
        format!("expected 3 - 1 + 10 = 12 units, store reports {level}")
    })
}

/// Paginated scans visit every product exactly once.
pub async fn test_scan_pagination<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn(Vec<Product>) -> S + Send + Sync + Clone + 'static,
    S: InventoryStore + 'static,
{
    const SCENARIO: &str = "scan_pagination";
    const PRODUCTS: usize = 23;

    let mut expected = Vec::with_capacity(PRODUCTS);
    for n in 0..PRODUCTS {
        expected.push(contract_product_id(SCENARIO, &format!("{n:02}"))?);
    }
    let store = make_store(
        expected
            .iter()
            .map(|id| contract_product(id.clone(), 1))
            .collect(),
    );

    let mut seen = Vec::new();
    let mut options = ScanOptions::new().with_limit(5);
    for _ in 0..=PRODUCTS {
        let page = store
            .scan_product_ids(&options)
            .await
            .map_err(|err| ContractTestFailure::inventory_error(SCENARIO, "scan", &err))?;
        ensure(SCENARIO, page.product_ids.len() <= 5, || {
            format!("page of {} exceeds the limit of 5", page.product_ids.len())
        })?;
        seen.extend(page.product_ids);
        match page.last_evaluated {
            Some(last) => options = options.starting_after(last),
            None => break,
        }
    }

    seen.sort();
    expected.sort();
    ensure(SCENARIO, seen == expected, || {
        format!("scan visited {} ids, expected {}", seen.len(), expected.len())
    })
}

/// A store without a clock record reads as absent.
pub async fn test_clock_absent_record<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: ClockStore + 'static,
{
    const SCENARIO: &str = "clock_absent_record";

    let store = make_store();
    let state = store
        .load(&ClockKey::global())
        .await
        .map_err(|err| ContractTestFailure::clock_error(SCENARIO, "load", &err))?;
    ensure(SCENARIO, state.is_none(), || {
        format!("fresh store returned a record: {state:?}")
    })
}

/// Writing an absent record creates it with the default speed factor, and
/// later writes overwrite the time without touching the speed.
pub async fn test_clock_blind_upsert<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: ClockStore + 'static,
{
    const SCENARIO: &str = "clock_blind_upsert";

    let key = ClockKey::global();
    let store = make_store();
    let later = VirtualTime::simulation_start()
        .checked_add_minutes(120)
        .ok_or_else(|| ContractTestFailure::new(SCENARIO, "time overflow"))?;
    let earlier = VirtualTime::simulation_start()
        .checked_add_minutes(30)
        .ok_or_else(|| ContractTestFailure::new(SCENARIO, "time overflow"))?;

    for time in [later, earlier] {
        store
            .set_time(&key, time)
            .await
            .map_err(|err| ContractTestFailure::clock_error(SCENARIO, "set_time", &err))?;
    }

    let state = store
        .load(&key)
        .await
        .map_err(|err| ContractTestFailure::clock_error(SCENARIO, "load", &err))?;
    let expected = SimulationState::new(earlier, SpeedFactor::default());
    ensure(SCENARIO, state == Some(expected), || {
        format!("expected the last write {expected:?} to win, found {state:?}")
    })
}

/// Expands the inventory contract suite for one adapter.
///
/// `make_store` must be an expression of type `Fn(Vec<Product>) -> S`.
#[macro_export]
macro_rules! inventory_store_contract_tests {
    (suite = $suite:ident, make_store = $make_store:expr $(,)?) => {
        mod $suite {
            use $crate::contract::{
                test_add_stock_commutes_with_decrement, test_conditional_decrement,
                test_no_oversell_under_contention, test_scan_pagination,
                test_unknown_product_is_out_of_stock,
            };

            #[tokio::test(flavor = "multi_thread")]
            async fn conditional_decrement_contract() {
                test_conditional_decrement($make_store)
                    .await
                    .expect("inventory store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn unknown_product_contract() {
                test_unknown_product_is_out_of_stock($make_store)
                    .await
                    .expect("inventory store contract failed");
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn no_oversell_contract() {
                test_no_oversell_under_contention($make_store)
                    .await
                    .expect("inventory store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn add_stock_commutes_contract() {
                test_add_stock_commutes_with_decrement($make_store)
                    .await
                    .expect("inventory store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn scan_pagination_contract() {
                test_scan_pagination($make_store)
                    .await
                    .expect("inventory store contract failed");
            }
        }
    };
}

/// Expands the clock store contract suite for one adapter.
///
/// `make_store` must be an expression of type `Fn() -> S`.
#[macro_export]
macro_rules! clock_store_contract_tests {
    (suite = $suite:ident, make_store = $make_store:expr $(,)?) => {
        mod $suite {
            use $crate::contract::{test_clock_absent_record, test_clock_blind_upsert};

            #[tokio::test]
            async fn absent_record_contract() {
                test_clock_absent_record($make_store)
                    .await
                    .expect("clock store contract failed");
            }

            #[tokio::test]
            async fn blind_upsert_contract() {
                test_clock_blind_upsert($make_store)
                    .await
                    .expect("clock store contract failed");
            }
        }
    };
}
