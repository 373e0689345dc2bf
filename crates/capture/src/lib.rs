//! # Capture
//!
//! Blocking sample-capture loop over the device output queues.
//!
//! Responsibilities:
//! - Poll the four sample queues in their fixed order, crop-resizing the
//!   depth-family frames and keeping the color preview in its native layout
//! - Apply the empty-queue policy (block / stale / fail)
//! - Assemble each cycle into a `CapturedSample`
//! - Forward samples downstream via async-channel with drop accounting
//! - Drain the optional IMU side queue
//!
//! ## Usage Example
//!
//! ```ignore
//! use capture::{CaptureWorker, CaptureWorkerConfig, SampleReader};
//!
//! let reader = SampleReader::new(rig.taps, &sampler)?;
//! let mut worker = CaptureWorker::spawn(reader, sampler, CaptureWorkerConfig::default());
//!
//! let rx = worker.take_receiver().expect("receiver already taken");
//! while let Ok(sample) = rx.recv().await {
//!     // Hand the sample to the dispatcher
//! }
//! ```

mod config;
mod imu;
mod sample_reader;
mod worker;

// Re-exports
pub use config::{BackpressureConfig, CaptureMetrics, DropPolicy, MetricsSnapshot};
pub use contracts::CapturedSample;
pub use imu::ImuMonitor;
pub use sample_reader::SampleReader;
pub use worker::{CaptureWorker, CaptureWorkerConfig};
