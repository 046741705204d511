//! Core domain types for the order simulation.
//!
//! Identifiers and tuning scalars use smart constructors so that a value,
//! once built, is always valid. Stock arithmetic is checked: a level can
//! never go below zero and an addition that would overflow is rejected.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use nutype::nutype;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque product identifier, the partition key of the inventory store.
///
/// `ProductId` values are trimmed, non-empty and at most 255 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ProductId(String);

/// Minutes of virtual time nominally advanced per unit of generation work.
///
/// Always strictly positive; the default of 60 maps one real minute of
/// scheduler cadence onto one simulated hour.
#[nutype(
    validate(greater_or_equal = 1),
    default = 60,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Default,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct SpeedFactor(u32);

impl SpeedFactor {
    /// Upper bound, in whole seconds, of the random offset drawn per order.
    pub fn max_offset_seconds(self) -> u64 {
        u64::from(self.into_inner()) * 60
    }
}

/// Number of units of a product currently available.
///
/// The unsigned representation makes a negative level unrepresentable;
/// every mutation goes through a checked operation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StockLevel(u64);

impl StockLevel {
    /// An empty shelf.
    pub const ZERO: Self = Self(0);

    /// Creates a stock level of `units`.
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the number of units.
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Whether at least one unit can be reserved.
    pub const fn is_available(self) -> bool {
        self.0 > 0
    }

    /// Removes one unit, or `None` when the shelf is already empty.
    #[must_use]
    pub const fn checked_decrement(self) -> Option<Self> {
        match self.0.checked_sub(1) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// Adds `units`, or `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, units: u64) -> Option<Self> {
        match self.0.checked_add(units) {
            Some(total) => Some(Self(total)),
            None => None,
        }
    }
}

impl From<u64> for StockLevel {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

impl std::fmt::Display for StockLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A point on the simulation's virtual timeline.
///
/// Virtual time is zone-less, like the historical data set it replays.
/// It serializes as `2018-01-01T00:00:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualTime(NaiveDateTime);

impl VirtualTime {
    /// Format used for order purchase timestamps on the wire.
    pub const PURCHASE_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    /// Wraps a naive timestamp.
    pub const fn new(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }

    /// The default start of a fresh simulation: `2018-01-01T00:00:00`.
    pub fn simulation_start() -> Self {
        let datetime = NaiveDate::from_ymd_opt(2018, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("2018-01-01T00:00:00 is a valid timestamp");
        Self(datetime)
    }

    /// Returns the underlying timestamp.
    pub const fn as_datetime(&self) -> &NaiveDateTime {
        &self.0
    }

    /// Returns this time moved forward by `minutes`, or `None` on overflow.
    #[must_use]
    pub fn checked_add_minutes(self, minutes: u64) -> Option<Self> {
        let minutes = i64::try_from(minutes).ok()?;
        let delta = TimeDelta::try_minutes(minutes)?;
        self.0.checked_add_signed(delta).map(Self)
    }

    /// Returns this time moved forward by `seconds`, capped at the last
    /// representable instant.
    #[must_use]
    pub fn saturating_add_seconds(self, seconds: u64) -> Self {
        i64::try_from(seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map_or(Self(NaiveDateTime::MAX), Self)
    }

    /// Whole minutes elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn minutes_since(self, earlier: Self) -> u64 {
        u64::try_from((self.0 - earlier.0).num_minutes()).unwrap_or(0)
    }

    /// Renders the time in the order wire format, `2018-01-01 00:41:07`.
    pub fn to_purchase_string(self) -> String {
        self.0.format(Self::PURCHASE_FORMAT).to_string()
    }
}

impl Default for VirtualTime {
    fn default() -> Self {
        Self::simulation_start()
    }
}

impl From<NaiveDateTime> for VirtualTime {
    fn from(datetime: NaiveDateTime) -> Self {
        Self(datetime)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))
    }
}

/// The durable singleton describing where the simulation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimulationState {
    /// Current virtual time.
    pub simulated_time: VirtualTime,
    /// Minutes of virtual time per unit of generation work.
    pub speed_factor: SpeedFactor,
}

impl SimulationState {
    /// Creates a state at `simulated_time` advancing at `speed_factor`.
    pub const fn new(simulated_time: VirtualTime, speed_factor: SpeedFactor) -> Self {
        Self {
            simulated_time,
            speed_factor,
        }
    }
}

/// A catalog entry owned by the inventory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    #[serde(rename = "product_id")]
    pub id: ProductId,
    /// Units on hand.
    pub stock_level: StockLevel,
    /// Catalog category, `unknown` when the source had none.
    pub category: String,
    /// List price.
    pub price: Decimal,
}

impl Product {
    /// Creates a product.
    pub fn new(
        id: ProductId,
        stock_level: StockLevel,
        category: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            id,
            stock_level,
            category: category.into(),
            price,
        }
    }
}
