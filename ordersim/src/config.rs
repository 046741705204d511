//! Validated configuration for the simulation engine.
//!
//! Every tunable is a smart-constructed type, so an invalid configuration
//! cannot be built, whether it comes from code or from a JSON document.

use std::time::Duration;

use nutype::nutype;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};
use crate::locale::Locale;

/// Maximum number of product identifiers held by the product cache.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 10_000),
    default = 500,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Display,
        Default,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct SampleLimit(usize);

/// Deadline for a single backing-store call, in milliseconds.
///
/// Between 1ms and one minute, so no call can block an invocation forever.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 60_000),
    default = 2_000,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Display,
        Default,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct OperationTimeoutMs(u64);

impl OperationTimeoutMs {
    /// Converts to a `Duration` for use with `tokio::time::timeout`.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.into_inner())
    }
}

/// Largest serialized order accepted by the event sink, in bytes.
#[nutype(
    validate(greater_or_equal = 256, less_or_equal = 1_048_576),
    default = 1_048_576,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Display,
        Default,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct MaxRecordBytes(usize);

/// A probability in `[0.0, 1.0]`.
#[nutype(
    validate(greater_or_equal = 0.0, less_or_equal = 1.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Into, Serialize, Deserialize)
)]
pub struct Probability(f64);

impl Probability {
    /// Draws a Bernoulli trial with this probability.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> bool {
        rng.random_bool(self.into_inner())
    }
}

/// Serialized shape of every bounded range in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec<T> {
    /// Lower bound
    pub min: T,
    /// Upper bound
    pub max: T,
}

/// Inclusive range of whole units, used for per-tick order volume and
/// replenishment amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeSpec<u64>", into = "RangeSpec<u64>")]
pub struct UnitRange {
    min: u64,
    max: u64,
}

impl UnitRange {
    /// Creates `min..=max`, rejecting an inverted range.
    pub fn try_new(min: u64, max: u64) -> ConfigResult<Self> {
        if min > max {
            return Err(ConfigError::InvalidRange {
                field: "unit_range",
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self { min, max })
    }

    /// Lower bound, inclusive.
    pub const fn min(self) -> u64 {
        self.min
    }

    /// Upper bound, inclusive.
    pub const fn max(self) -> u64 {
        self.max
    }

    /// Whether `value` lies within the range.
    pub const fn contains(self, value: u64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Draws a value uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> u64 {
        rng.random_range(self.min..=self.max)
    }
}

impl TryFrom<RangeSpec<u64>> for UnitRange {
    type Error = ConfigError;

    fn try_from(spec: RangeSpec<u64>) -> Result<Self, Self::Error> {
        Self::try_new(spec.min, spec.max)
    }
}

impl From<UnitRange> for RangeSpec<u64> {
    fn from(range: UnitRange) -> Self {
        Self {
            min: range.min,
            max: range.max,
        }
    }
}

/// Half-open range of money amounts, drawn at cent precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeSpec<Decimal>", into = "RangeSpec<Decimal>")]
pub struct MoneyRange {
    min_cents: i64,
    max_cents: i64,
}

impl MoneyRange {
    /// Creates `[min, max)`. Both bounds must be non-negative, `min < max`,
    /// and representable in cents.
    pub fn try_new(min: Decimal, max: Decimal) -> ConfigResult<Self> {
        let invalid = || ConfigError::InvalidRange {
            field: "money_range",
            min: min.to_string(),
            max: max.to_string(),
        };
        let min_cents = to_cents(min).ok_or_else(invalid)?;
        let max_cents = to_cents(max).ok_or_else(invalid)?;
        if min_cents < 0 || min_cents >= max_cents {
            return Err(invalid());
        }
        Ok(Self {
            min_cents,
            max_cents,
        })
    }

    /// Lower bound, inclusive.
    pub fn min(self) -> Decimal {
        Decimal::new(self.min_cents, 2)
    }

    /// Upper bound, exclusive.
    pub fn max(self) -> Decimal {
        Decimal::new(self.max_cents, 2)
    }

    /// Whether `amount` lies within the range.
    pub fn contains(self, amount: Decimal) -> bool {
        amount >= self.min() && amount < self.max()
    }

    /// Draws an amount with two decimal places uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> Decimal {
        Decimal::new(rng.random_range(self.min_cents..self.max_cents), 2)
    }
}

fn to_cents(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

impl TryFrom<RangeSpec<Decimal>> for MoneyRange {
    type Error = ConfigError;

    fn try_from(spec: RangeSpec<Decimal>) -> Result<Self, Self::Error> {
        Self::try_new(spec.min, spec.max)
    }
}

impl From<MoneyRange> for RangeSpec<Decimal> {
    fn from(range: MoneyRange) -> Self {
        Self {
            min: range.min(),
            max: range.max(),
        }
    }
}

/// Deadlines for each backing store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTimeouts {
    /// Reads, scans, reservations and releases against the inventory store.
    pub inventory: OperationTimeoutMs,
    /// Reads and writes of the clock record.
    pub clock: OperationTimeoutMs,
    /// Event publication.
    pub sink: OperationTimeoutMs,
}

impl PortTimeouts {
    /// Uses the same deadline for every port.
    pub const fn uniform(timeout: OperationTimeoutMs) -> Self {
        Self {
            inventory: timeout,
            clock: timeout,
            sink: timeout,
        }
    }
}

/// Complete engine configuration.
///
/// ```ignore
/// let config = SimulationConfig::default()
///     .with_order_volume(UnitRange::try_new(5, 10)?)
///     .with_seed(7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Orders attempted per invocation, drawn once per invocation.
    pub order_volume: UnitRange,
    /// Upper bound of the cached product sample.
    pub sample_limit: SampleLimit,
    /// Unit price range of synthesized orders.
    pub price: MoneyRange,
    /// Freight range of synthesized orders.
    pub freight: MoneyRange,
    /// Locale of the customer geography generator.
    pub locale: Locale,
    /// Per-port call deadlines.
    pub timeouts: PortTimeouts,
    /// Largest serialized order the sink accepts.
    pub max_record_bytes: MaxRecordBytes,
    /// Seed for a reproducible run; entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            order_volume: UnitRange { min: 3, max: 20 },
            sample_limit: SampleLimit::default(),
            price: MoneyRange {
                min_cents: 2_000,
                max_cents: 15_000,
            },
            freight: MoneyRange {
                min_cents: 1_000,
                max_cents: 3_000,
            },
            locale: Locale::default(),
            timeouts: PortTimeouts::default(),
            max_record_bytes: MaxRecordBytes::default(),
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the per-invocation order volume.
    #[must_use]
    pub const fn with_order_volume(mut self, order_volume: UnitRange) -> Self {
        self.order_volume = order_volume;
        self
    }

    /// Sets the product cache bound.
    #[must_use]
    pub const fn with_sample_limit(mut self, sample_limit: SampleLimit) -> Self {
        self.sample_limit = sample_limit;
        self
    }

    /// Sets the unit price range.
    #[must_use]
    pub const fn with_price(mut self, price: MoneyRange) -> Self {
        self.price = price;
        self
    }

    /// Sets the freight range.
    #[must_use]
    pub const fn with_freight(mut self, freight: MoneyRange) -> Self {
        self.freight = freight;
        self
    }

    /// Sets the geography locale.
    #[must_use]
    pub const fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Sets the per-port deadlines.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: PortTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the sink record size limit.
    #[must_use]
    pub const fn with_max_record_bytes(mut self, max_record_bytes: MaxRecordBytes) -> Self {
        self.max_record_bytes = max_record_bytes;
        self
    }

    /// Makes every random draw reproducible.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_documented_constants() {
        let config = SimulationConfig::default();
        assert_eq!(config.order_volume.min(), 3);
        assert_eq!(config.order_volume.max(), 20);
        assert_eq!(config.sample_limit.into_inner(), 500);
        assert_eq!(config.price.min(), dec!(20.00));
        assert_eq!(config.price.max(), dec!(150.00));
        assert_eq!(config.freight.min(), dec!(10.00));
        assert_eq!(config.freight.max(), dec!(30.00));
        assert_eq!(config.locale, Locale::PtBr);
        assert_eq!(config.max_record_bytes.into_inner(), 1_048_576);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        assert!(UnitRange::try_new(5, 4).is_err());
        assert!(UnitRange::try_new(4, 4).is_ok());
        assert!(MoneyRange::try_new(dec!(10), dec!(10)).is_err());
        assert!(MoneyRange::try_new(dec!(-1), dec!(10)).is_err());
    }

    #[test]
    fn json_config_is_validated() {
        let config = SimulationConfig::from_json_str(
            r#"{ "order_volume": { "min": 1, "max": 2 }, "locale": "en_us", "rng_seed": 9 }"#,
        )
        .unwrap();
        assert_eq!(config.order_volume.max(), 2);
        assert_eq!(config.locale, Locale::EnUs);
        assert_eq!(config.rng_seed, Some(9));
        assert_eq!(config.sample_limit.into_inner(), 500);

        let inverted =
            SimulationConfig::from_json_str(r#"{ "order_volume": { "min": 9, "max": 2 } }"#);
        assert!(matches!(inverted, Err(ConfigError::Parse(_))));

        let zero_timeout = SimulationConfig::from_json_str(
            r#"{ "timeouts": { "inventory": 0, "clock": 10, "sink": 10 } }"#,
        );
        assert!(zero_timeout.is_err());
    }

    #[test]
    fn config_survives_a_json_round_trip() {
        let config = SimulationConfig::default().with_seed(3);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn probability_bounds() {
        assert!(Probability::try_new(1.5).is_err());
        assert!(Probability::try_new(-0.1).is_err());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Probability::try_new(1.0).unwrap().sample(&mut rng));
        assert!(!Probability::try_new(0.0).unwrap().sample(&mut rng));
    }

    proptest! {
        #[test]
        fn unit_samples_stay_in_range(min in 0u64..50, span in 0u64..50, seed in any::<u64>()) {
            let range = UnitRange::try_new(min, min + span).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..32 {
                prop_assert!(range.contains(range.sample(&mut rng)));
            }
        }

        #[test]
        fn money_samples_have_two_decimals(seed in any::<u64>()) {
            let range = SimulationConfig::default().price;
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..32 {
                let amount = range.sample(&mut rng);
                prop_assert!(range.contains(amount));
                prop_assert!(amount.scale() <= 2);
            }
        }
    }
}
