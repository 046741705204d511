//! Synthetic orders and the factory that builds them.
//!
//! An [`Order`] is write-once: the factory builds it, the engine serializes
//! it into an event record, and ownership ends there. The wire names follow
//! the downstream order schema (`order_status`, `items`, `customer`, ...).

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{MoneyRange, SimulationConfig};
use crate::locale::Locale;
use crate::types::{ProductId, VirtualTime};

/// Lifecycle status of an order.
///
/// The engine only ever emits [`OrderStatus::Approved`]; the other values
/// exist so that consumers can decode the full status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, payment pending.
    Created,
    /// Payment approved.
    Approved,
    /// Invoice issued.
    Invoiced,
    /// Being prepared by the seller.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled before delivery.
    Canceled,
    /// Could not be fulfilled.
    Unavailable,
}

/// The single product line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product sold.
    pub product_id: ProductId,
    /// Unit price charged.
    #[serde(rename = "price", with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    /// Freight charged for the line.
    #[serde(rename = "freight_value", with = "rust_decimal::serde::float")]
    pub freight: Decimal,
}

/// Where the customer lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerGeo {
    /// City name.
    pub city: String,
    /// State or region abbreviation.
    #[serde(rename = "state")]
    pub region_code: String,
    /// Postal code in the locale's format.
    #[serde(rename = "zip_code")]
    pub postal_code: String,
}

/// A synthetic single-item order event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Fresh random identity, also the event partition key.
    pub order_id: Uuid,
    /// Fresh random customer; customers never return.
    pub customer_id: Uuid,
    /// Always `approved` for generated orders.
    #[serde(rename = "order_status")]
    pub status: OrderStatus,
    /// Virtual time of purchase.
    #[serde(rename = "order_purchase_timestamp", with = "purchase_timestamp")]
    pub purchase_timestamp: VirtualTime,
    /// The product line.
    #[serde(rename = "items", with = "single_item")]
    pub line_item: LineItem,
    /// Customer location.
    #[serde(rename = "customer")]
    pub customer_geo: CustomerGeo,
}

impl Order {
    /// Partition key under which the order is published.
    pub fn partition_key(&self) -> String {
        self.order_id.to_string()
    }
}

mod purchase_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::types::VirtualTime;

    pub fn serialize<S: Serializer>(time: &VirtualTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.to_purchase_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<VirtualTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, VirtualTime::PURCHASE_FORMAT)
            .map(VirtualTime::new)
            .map_err(serde::de::Error::custom)
    }
}

mod single_item {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::LineItem;

    pub fn serialize<S: Serializer>(item: &LineItem, serializer: S) -> Result<S::Ok, S::Error> {
        std::slice::from_ref(item).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LineItem, D::Error> {
        let mut items = Vec::<LineItem>::deserialize(deserializer)?;
        match items.len() {
            1 => Ok(items.remove(0)),
            n => Err(D::Error::invalid_length(n, &"exactly one order item")),
        }
    }
}

/// Builds orders from a product, a timestamp and a random source.
///
/// The factory is pure: it never touches inventory or the clock, and the
/// same seed with the same inputs yields the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFactory {
    price: MoneyRange,
    freight: MoneyRange,
    locale: Locale,
}

impl OrderFactory {
    /// Creates a factory with explicit ranges and locale.
    pub const fn new(price: MoneyRange, freight: MoneyRange, locale: Locale) -> Self {
        Self {
            price,
            freight,
            locale,
        }
    }

    /// Creates the factory described by `config`.
    pub const fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.price, config.freight, config.locale)
    }

    /// Synthesizes one approved order for `product_id` purchased at `timestamp`.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        product_id: ProductId,
        timestamp: VirtualTime,
        rng: &mut R,
    ) -> Order {
        let order_id = random_uuid(rng);
        let customer_id = random_uuid(rng);
        let line_item = LineItem {
            product_id,
            unit_price: self.price.sample(rng),
            freight: self.freight.sample(rng),
        };

        Order {
            order_id,
            customer_id,
            status: OrderStatus::Approved,
            purchase_timestamp: timestamp,
            line_item,
            customer_geo: self.locale.customer_geo(rng),
        }
    }
}

impl Default for OrderFactory {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}
