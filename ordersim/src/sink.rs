//! Event sink port.
//!
//! The sink receives opaque JSON payloads routed by a partition key. The
//! engine owns serialization and the size guard; adapters only move bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::MaxRecordBytes;
use crate::errors::{SinkError, SinkResult};
use crate::order::Order;

/// A serialized order ready for publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Routing key, the order identifier.
    pub partition_key: String,
    /// JSON encoded order.
    pub payload: Vec<u8>,
}

impl EventRecord {
    /// Serializes `order`, rejecting payloads larger than `max_bytes`.
    pub fn from_order(order: &Order, max_bytes: MaxRecordBytes) -> SinkResult<Self> {
        let payload = serde_json::to_vec(order)?;
        let max = max_bytes.into_inner();
        if payload.len() > max {
            return Err(SinkError::RecordTooLarge {
                size: payload.len(),
                max,
            });
        }
        Ok(Self {
            partition_key: order.partition_key(),
            payload,
        })
    }

    /// Decodes the payload back into an order.
    pub fn decode(&self) -> SinkResult<Order> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Acknowledgement of a published record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Position assigned by the sink, monotonic per partition.
    pub sequence_number: String,
    /// Key the record was routed by.
    pub partition_key: String,
}

/// Port to the downstream event stream.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publishes one record.
    async fn publish(&self, record: EventRecord) -> SinkResult<PublishReceipt>;
}
