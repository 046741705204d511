//! Testing support for `ordersim` adapters.
//!
//! - [`chaos`]: wrappers that inject failures and latency into any port
//!   adapter with a reproducible seed.
//! - [`contract`]: behavioural suites that every `InventoryStore` and
//!   `ClockStore` implementation must pass.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(
    rust_2018_idioms,
    unused_extern_crates,
    unused_imports,
    unused_must_use,
    unused_mut,
    unused_variables
)]

pub mod chaos;
pub mod contract;

pub use chaos::{Chaos, ChaosConfig, ChaosExt, ChaosOperation};
