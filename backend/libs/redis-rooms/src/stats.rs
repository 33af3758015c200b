//! Statistics tracking for room broadcasts

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time counters for one adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomsStats {
    pub local_broadcasts: u64,
    pub deliveries: u64,
    pub delivery_errors: u64,
    pub published: u64,
    pub publish_errors: u64,
    pub relayed: u64,
    pub echoes_dropped: u64,
    pub decode_errors: u64,
}

/// Thread-safe statistics collector
#[derive(Clone, Default)]
pub struct StatsCollector {
    local_broadcasts: Arc<AtomicU64>,
    deliveries: Arc<AtomicU64>,
    delivery_errors: Arc<AtomicU64>,
    published: Arc<AtomicU64>,
    publish_errors: Arc<AtomicU64>,
    relayed: Arc<AtomicU64>,
    echoes_dropped: Arc<AtomicU64>,
    decode_errors: Arc<AtomicU64>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_local_broadcast(&self) {
        self.local_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deliveries(&self, delivered: usize, failed: usize) {
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_errors.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relayed(&self) {
        self.relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_echo(&self) {
        self.echoes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> RoomsStats {
        RoomsStats {
            local_broadcasts: self.local_broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_errors: self.delivery_errors.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            relayed: self.relayed.load(Ordering::Relaxed),
            echoes_dropped: self.echoes_dropped.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        for counter in [
            &self.local_broadcasts,
            &self.deliveries,
            &self.delivery_errors,
            &self.published,
            &self.publish_errors,
            &self.relayed,
            &self.echoes_dropped,
            &self.decode_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_collector() {
        let collector = StatsCollector::new();

        collector.record_local_broadcast();
        collector.record_deliveries(3, 1);
        collector.record_publish();
        collector.record_echo();
        collector.record_decode_error();

        let stats = collector.snapshot();
        assert_eq!(stats.local_broadcasts, 1);
        assert_eq!(stats.deliveries, 3);
        assert_eq!(stats.delivery_errors, 1);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.echoes_dropped, 1);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.relayed, 0);
    }

    #[test]
    fn test_stats_reset() {
        let collector = StatsCollector::new();
        collector.record_relayed();
        collector.record_publish_error();

        collector.reset();
        assert_eq!(collector.snapshot(), RoomsStats::default());
    }

    #[test]
    fn test_clones_share_counters() {
        let collector = StatsCollector::new();
        let clone = collector.clone();
        clone.record_relayed();

        assert_eq!(collector.snapshot().relayed, 1);
    }
}
