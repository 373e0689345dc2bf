//! LogSink - logs sample summary via tracing

use contracts::{CapturedSample, RigError, SampleSink};
use tracing::{info, instrument};

/// Sink that logs sample summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_sample_summary(&self, sample: &CapturedSample) {
        let side = sample.tensor.size();
        let stale_count = sample.meta.stale_streams.len();

        info!(
            sink = %self.name,
            cycle = sample.cycle,
            t_capture = sample.t_capture,
            side,
            stale = stale_count,
            poll_us = sample.meta.poll_micros,
            "CapturedSample received"
        );
    }
}

impl SampleSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, sample),
        fields(sink = %self.name, cycle = sample.cycle)
    )]
    async fn write(&mut self, sample: &CapturedSample) -> Result<(), RigError> {
        self.log_sample_summary(sample);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), RigError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), RigError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
