//! Dispatcher - main loop for fan-out to sinks

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{CapturedSample, SinkKind, SinkSpec};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, UdpSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkSpec>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<CapturedSample>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<CapturedSample>) -> Self {
        Self { config, input_rx }
    }

    /// Build and start the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config).await?;

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for spec in &config.sinks {
            handles.push(create_sink_handle(spec).await?);
        }
        Ok(handles)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(spec),
    fields(sink = %spec.name, kind = ?spec.kind)
)]
async fn create_sink_handle(spec: &SinkSpec) -> Result<SinkHandle, DispatcherError> {
    match spec.kind {
        SinkKind::Log => {
            let sink = LogSink::new(&spec.name);
            Ok(SinkHandle::spawn(sink, spec.queue_capacity))
        }
        SinkKind::File => {
            let sink = FileSink::from_params(&spec.name, &spec.params)
                .map_err(|e| DispatcherError::sink_creation(&spec.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, spec.queue_capacity))
        }
        SinkKind::Udp => {
            let sink = UdpSink::from_params(&spec.name, &spec.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&spec.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, spec.queue_capacity))
        }
    }
}

/// The main Dispatcher that fans out samples to sinks
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<CapturedSample>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<CapturedSample>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Consumes samples from input and fans out to all sinks.
    /// Returns when input channel is closed.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut sample_count: u64 = 0;

        while let Some(sample) = self.input_rx.recv().await {
            sample_count += 1;
            self.dispatch_sample(&sample);

            if sample_count.is_multiple_of(100) {
                debug!(samples = sample_count, "Dispatcher progress");
            }
        }

        info!(
            samples = sample_count,
            "Dispatcher input closed, shutting down"
        );

        Self::shutdown_handles(self.handles).await;

        info!("Dispatcher shutdown complete");
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    fn dispatch_sample(&self, sample: &CapturedSample) {
        for handle in &self.handles {
            handle.try_send(sample.clone());
        }
    }

    async fn shutdown_handles(handles: Vec<SinkHandle>) {
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

/// Convenience function to create a dispatcher from sink specs
#[instrument(name = "dispatcher_create", skip(sink_specs, input_rx))]
pub async fn create_dispatcher(
    sink_specs: Vec<SinkSpec>,
    input_rx: mpsc::Receiver<CapturedSample>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig { sinks: sink_specs };
    DispatcherBuilder::new(config, input_rx).build().await
}
