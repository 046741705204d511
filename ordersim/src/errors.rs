//! Error types for the order simulation.
//!
//! Each port has its own error enum so that callers can react to the
//! failure class without inspecting messages:
//!
//! - **InventoryError**: transient inventory store faults. Never retried by
//!   the engine; the affected order slot is skipped.
//! - **ClockError**: clock store faults. Fatal to the invocation.
//! - **SinkError**: event publication faults. A rejected order is dropped;
//!   a timed-out publish aborts the invocation.
//! - **ConfigError**: invalid configuration, reported at construction.
//! - **EngineError**: the failures that abort a whole invocation.
//!
//! Depleted stock is not an error at all; it is the
//! [`ReservationOutcome::OutOfStock`](crate::inventory::ReservationOutcome)
//! branch of a successful store call.

use std::time::Duration;

use crate::types::{ProductId, VirtualTime};
use thiserror::Error;

/// Transient failures of the inventory backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// The store could not be reached.
    #[error("Inventory store connection failed: {0}")]
    ConnectionFailed(String),

    /// The store rejected the request because of its rate limits.
    #[error("Inventory store throttled the request: {0}")]
    Throttled(String),

    /// The call did not complete within its deadline.
    #[error("Inventory operation timed out after {0:?}")]
    Timeout(Duration),

    /// The store is temporarily unavailable.
    #[error("Inventory store unavailable: {0}")]
    Unavailable(String),

    /// An additive update targeted a product the store does not know.
    #[error("Product '{0}' not found")]
    ProductNotFound(ProductId),

    /// An additive update would overflow the stock counter.
    #[error("Stock overflow on product '{0}'")]
    StockOverflow(ProductId),

    /// An unexpected internal error occurred.
    #[error("Internal inventory error: {0}")]
    Internal(String),
}

/// Failures of the clock backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The clock record could not be read.
    #[error("Clock read failed: {0}")]
    ReadFailed(String),

    /// The clock record could not be written.
    #[error("Clock write failed: {0}")]
    WriteFailed(String),

    /// The stored record exists but cannot be decoded.
    #[error("Clock record is corrupt: {0}")]
    Corrupt(String),

    /// The call did not complete within its deadline.
    #[error("Clock operation timed out after {0:?}")]
    Timeout(Duration),

    /// Advancing the clock would leave the representable time range.
    #[error("Advancing {base} by {minutes} minutes overflows the virtual timeline")]
    TimeOverflow {
        /// The time the advance started from
        base: VirtualTime,
        /// The requested advance
        minutes: u64,
    },
}

/// Failures while publishing an order event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The sink refused or lost the record.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// The call did not complete within its deadline.
    #[error("Publish timed out after {0:?}")]
    Timeout(Duration),

    /// The serialized payload exceeds the sink's record size limit.
    #[error("Record of {size} bytes exceeds the {max} byte limit")]
    RecordTooLarge {
        /// Serialized payload size
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// The order could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A `min..=max` style range was empty or inverted.
    #[error("Invalid range for {field}: {min} to {max}")]
    InvalidRange {
        /// The configuration field
        field: &'static str,
        /// Lower bound as given
        min: String,
        /// Upper bound as given
        max: String,
    },

    /// A scalar value was out of bounds.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// The configuration field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("Configuration parse error: {0}")]
    Parse(String),
}

/// Failures that abort a whole invocation.
///
/// Per-order failures never surface here; they are counted in the
/// invocation summary instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The inventory store holds no products, so no order can be built.
    #[error("Product catalog is empty")]
    EmptyCatalog,

    /// The product sample could not be loaded.
    #[error("Product catalog unavailable: {0}")]
    CatalogUnavailable(#[source] InventoryError),

    /// The simulation state could not be read.
    #[error("Could not read the simulation clock: {0}")]
    ClockRead(#[source] ClockError),

    /// The advanced clock could not be persisted.
    #[error("Could not advance the simulation clock: {0}")]
    ClockWrite(#[source] ClockError),

    /// The event sink did not acknowledge a record within its deadline.
    ///
    /// The record may or may not have been delivered, so its reserved unit
    /// is not released.
    #[error("Event sink did not answer within {0:?}")]
    SinkTimeout(Duration),
}

/// Type alias for inventory store results.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Type alias for clock store results.
pub type ClockResult<T> = Result<T, ClockError>;

/// Type alias for event sink results.
pub type SinkResult<T> = Result<T, SinkError>;

/// Type alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Type alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
