//! Counters accumulated across invocations of one engine instance.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::engine::InvocationSummary;

/// Lock-free engine counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    invocations: AtomicU64,
    failed_invocations: AtomicU64,
    orders_published: AtomicU64,
    out_of_stock: AtomicU64,
    store_errors: AtomicU64,
    publish_failures: AtomicU64,
    compensations: AtomicU64,
    compensation_failures: AtomicU64,
    minutes_advanced: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Invocations that returned a summary.
    pub invocations: u64,
    /// Invocations aborted by a fatal error.
    pub failed_invocations: u64,
    /// Orders accepted by the sink.
    pub orders_published: u64,
    /// Slots skipped because the product was depleted.
    pub out_of_stock: u64,
    /// Slots skipped because the inventory store failed.
    pub store_errors: u64,
    /// Orders dropped because publication failed.
    pub publish_failures: u64,
    /// Reserved units released after a failed publication.
    pub compensations: u64,
    /// Releases that themselves failed.
    pub compensation_failures: u64,
    /// Virtual minutes the clock was advanced in total.
    pub minutes_advanced: u64,
}

impl EngineMetrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_summary(&self, summary: &InvocationSummary) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.orders_published
            .fetch_add(summary.orders_generated, Ordering::Relaxed);
        self.out_of_stock
            .fetch_add(summary.skipped.out_of_stock, Ordering::Relaxed);
        self.store_errors
            .fetch_add(summary.skipped.store_errors, Ordering::Relaxed);
        self.publish_failures
            .fetch_add(summary.skipped.publish_failures, Ordering::Relaxed);
        self.minutes_advanced
            .fetch_add(summary.minutes_advanced, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compensation(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.compensations
        } else {
            &self.compensation_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            invocations: self.invocations.load(Ordering::Relaxed),
            failed_invocations: self.failed_invocations.load(Ordering::Relaxed),
            orders_published: self.orders_published.load(Ordering::Relaxed),
            out_of_stock: self.out_of_stock.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            compensations: self.compensations.load(Ordering::Relaxed),
            compensation_failures: self.compensation_failures.load(Ordering::Relaxed),
            minutes_advanced: self.minutes_advanced.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SkipCounts;
    use crate::types::VirtualTime;

    #[test]
    fn summaries_accumulate() {
        let metrics = EngineMetrics::new();
        let summary = InvocationSummary {
            orders_requested: 5,
            orders_generated: 3,
            previous_time: VirtualTime::simulation_start(),
            new_time: VirtualTime::simulation_start(),
            minutes_advanced: 7,
            skipped: SkipCounts {
                out_of_stock: 1,
                store_errors: 0,
                publish_failures: 1,
            },
        };

        metrics.record_summary(&summary);
        metrics.record_summary(&summary);
        metrics.record_failure();
        metrics.record_compensation(true);
        metrics.record_compensation(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.invocations, 2);
        assert_eq!(snapshot.failed_invocations, 1);
        assert_eq!(snapshot.orders_published, 6);
        assert_eq!(snapshot.out_of_stock, 2);
        assert_eq!(snapshot.publish_failures, 2);
        assert_eq!(snapshot.compensations, 1);
        assert_eq!(snapshot.compensation_failures, 1);
        assert_eq!(snapshot.minutes_advanced, 14);
    }
}
