//! Callback-context metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
///
/// Updated from the sensor-callback context, read from the main loop.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Camera images received from the sensor
    pub frames_received: AtomicU64,

    /// Processed frames written into the slot
    pub frames_published: AtomicU64,

    /// Published frames that replaced an unread one
    pub frames_overwritten: AtomicU64,

    /// Decode / detection failures
    pub callback_errors: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("lane_session_frames_received_total").increment(1);
    }

    pub fn record_published(&self, overwrote_unread: bool) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("lane_session_frames_published_total").increment(1);
        if overwrote_unread {
            self.frames_overwritten.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("lane_session_frames_overwritten_total").increment(1);
        }
    }

    pub fn record_callback_error(&self) {
        self.callback_errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("lane_session_callback_errors_total").increment(1);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_overwritten: self.frames_overwritten.load(Ordering::Relaxed),
            callback_errors: self.callback_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_published: u64,
    pub frames_overwritten: u64,
    pub callback_errors: u64,
}
