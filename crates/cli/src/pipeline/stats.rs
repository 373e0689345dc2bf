//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::CaptureMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total samples successfully captured
    pub samples_captured: u64,

    /// Total samples dropped by capture backpressure
    pub samples_dropped: u64,

    /// Polls that found no fresh frame
    pub empty_polls: u64,

    /// Samples rejected during tensor assembly
    pub assembly_errors: u64,

    /// Rotation reports drained from the IMU side stream
    pub imu_reports: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Capture metrics aggregator
    pub capture_metrics: CaptureMetricsAggregator,
}

impl PipelineStats {
    /// Calculate samples per second throughput
    pub fn samples_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.samples_captured as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate drop rate as percentage
    #[allow(dead_code)]
    pub fn drop_rate(&self) -> f64 {
        let total = self.samples_captured + self.samples_dropped;
        if total > 0 {
            (self.samples_dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Samples captured: {}", self.samples_captured);
        println!("   ├─ Samples dropped: {}", self.samples_dropped);
        println!("   ├─ Empty polls: {}", self.empty_polls);
        println!("   ├─ Assembly errors: {}", self.assembly_errors);
        println!("   ├─ Samples/s: {:.2}", self.samples_per_second());
        println!("   ├─ IMU reports: {}", self.imu_reports);
        println!("   └─ Active sinks: {}", self.active_sinks);

        let summary = self.capture_metrics.summary();

        println!("\n📈 Capture Metrics");
        println!("   ├─ Stale frame serves: {}", summary.total_stale_serves);
        println!(
            "   ├─ Samples with stale streams: {} ({:.2}%)",
            summary.samples_with_stale, summary.stale_rate
        );
        println!("   ├─ Poll time (µs): {}", summary.poll_micros);
        println!("   └─ Stream skew (ms): {}", summary.skew_ms);

        if !summary.stream_stale_counts.is_empty() {
            println!("\n⚠️  Stale Serve Counts");
            for (stream, count) in &summary.stream_stale_counts {
                println!("   ├─ {}: {}", stream, count);
            }
        }

        println!();
    }
}
