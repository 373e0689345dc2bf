//! SampleSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{CapturedSample, RigError};

/// Sample output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(SampleSink: Send)]
pub trait LocalSampleSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one captured sample
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, sample: &CapturedSample) -> Result<(), RigError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), RigError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), RigError>;
}
