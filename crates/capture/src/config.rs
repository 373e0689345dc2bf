//! Backpressure configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub use contracts::DropPolicy;

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Sample channel capacity
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

impl BackpressureConfig {
    /// Create new backpressure configuration
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

/// Capture metrics
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    /// Total samples captured and assembled
    pub samples_captured: AtomicU64,

    /// Total samples dropped by backpressure
    pub samples_dropped: AtomicU64,

    /// Polls that found no new frame
    pub empty_polls: AtomicU64,

    /// Frames that violated the stream contract
    pub assembly_errors: AtomicU64,

    /// Current sample channel length
    pub queue_len: AtomicUsize,
}

impl CaptureMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record sample captured
    pub fn record_captured(&self) {
        self.samples_captured.fetch_add(1, Ordering::Relaxed);
    }

    /// Record sample dropped
    pub fn record_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record empty poll
    pub fn record_empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record assembly error
    pub fn record_assembly_error(&self) {
        self.assembly_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Update sample channel length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_captured: self.samples_captured.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            assembly_errors: self.assembly_errors.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Total samples captured and assembled
    pub samples_captured: u64,

    /// Total samples dropped by backpressure
    pub samples_dropped: u64,

    /// Polls that found no new frame
    pub empty_polls: u64,

    /// Frames that violated the stream contract
    pub assembly_errors: u64,

    /// Current sample channel length
    pub queue_len: usize,
}
