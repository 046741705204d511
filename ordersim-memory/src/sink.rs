use std::sync::Arc;

use async_trait::async_trait;
use ordersim::errors::SinkResult;
use ordersim::order::Order;
use ordersim::sink::{EventRecord, EventSink, PublishReceipt};
use parking_lot::Mutex;

/// In-memory event stream that keeps every published record in order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSink {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl InMemoryEventSink {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record published so far, oldest first.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    /// Every published record decoded back into an order.
    pub fn orders(&self) -> SinkResult<Vec<Order>> {
        self.records.lock().iter().map(EventRecord::decode).collect()
    }

    /// Number of published records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Forget every published record.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn publish(&self, record: EventRecord) -> SinkResult<PublishReceipt> {
        let mut records = self.records.lock();
        let receipt = PublishReceipt {
            sequence_number: format!("{:020}", records.len()),
            partition_key: record.partition_key.clone(),
        };
        records.push(record);
        drop(records);
        Ok(receipt)
    }
}
