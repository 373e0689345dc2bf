//! Pipeline orchestrator - coordinates all components.
//!
//! The device backend is chosen at runtime: `mock` generates synthetic
//! frames, `replay` feeds a recorded session back through the queues.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use capture::{CaptureWorker, CaptureWorkerConfig, ImuMonitor, SampleReader};
use contracts::{CapturedSample, RigBlueprint};
use device_factory::{
    DeviceFactory, DeviceRuntime, MockDevice, MockDeviceConfig, ReplayConfig, ReplayDevice,
};
use observability::{record_channel_depth, record_sample_metrics};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::PipelineStats;
use crate::cli::Backend;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The rig blueprint configuration
    pub blueprint: RigBlueprint,

    /// Device backend
    pub backend: Backend,

    /// Recorded session path (replay backend only)
    pub replay_path: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = original speed)
    pub replay_speed: f64,

    /// Loop replay when finished
    pub replay_loop: bool,

    /// Maximum number of samples to capture (None = unlimited)
    pub max_samples: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Dispatcher input channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        match self.config.backend {
            Backend::Mock => {
                info!("Running in MOCK mode (no camera required)");
                let device = MockDevice::with_config(MockDeviceConfig {
                    fps: self.config.blueprint.rig.fps,
                    ..Default::default()
                });
                self.run_with_device(device).await
            }
            Backend::Replay => {
                let root = self
                    .config
                    .replay_path
                    .clone()
                    .context("Replay backend requires a recording path")?;
                let mut replay = ReplayConfig::new(root);
                replay.speed_multiplier = self.config.replay_speed;
                replay.loop_playback = self.config.replay_loop;

                info!(path = %replay.root.display(), "Running in REPLAY mode");
                self.run_with_device(ReplayDevice::new(replay)).await
            }
        }
    }

    /// Pipeline logic shared between backends
    async fn run_with_device<D: DeviceRuntime>(self, device: D) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Boot Device
        info!(backend = device.backend(), "Booting device...");
        let sampler = blueprint.to_sampler_config();
        let mut factory = DeviceFactory::new(device);
        let rig = factory
            .boot_rig(&sampler, &blueprint.imu)
            .await
            .context("Failed to boot device")?;

        info!(
            streams = rig.taps.len(),
            imu = rig.imu.is_some(),
            "Output queues opened"
        );

        // IMU side stream monitor
        let mut imu_monitor = rig.imu.map(ImuMonitor::spawn);

        // Capture worker
        info!("Starting capture worker...");
        let reader =
            SampleReader::new(rig.taps, &sampler).context("Failed to build sample reader")?;
        let mut worker = CaptureWorker::spawn(
            reader,
            sampler,
            CaptureWorkerConfig::from(&blueprint.capture),
        );
        let capture_rx = worker
            .take_receiver()
            .context("Failed to get capture receiver")?;

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let (sample_tx, sample_rx) = mpsc::channel::<CapturedSample>(self.config.buffer_size);

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - captured samples will be dropped");
        }

        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), sample_rx)
            .await
            .context("Failed to create dispatcher")?;

        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        let max_samples = self.config.max_samples;

        info!(max_samples = ?max_samples, "Pipeline running");

        // Pipeline processing task
        let pipeline_task = async move {
            let mut stats = PipelineStats {
                active_sinks,
                ..Default::default()
            };

            while let Ok(sample) = capture_rx.recv().await {
                stats.samples_captured += 1;

                // Record metrics from CaptureMeta
                record_sample_metrics(&sample.meta, sample.cycle, sample.t_capture);
                record_channel_depth(capture_rx.len());
                stats.capture_metrics.update(&sample.meta, sample.t_capture);

                info!(
                    cycle = sample.cycle,
                    t_capture = format!("{:.3}", sample.t_capture),
                    side = sample.tensor.size(),
                    poll_us = sample.meta.poll_micros,
                    stale = sample.meta.stale_streams.len(),
                    "Sample captured"
                );

                if sample_tx.send(sample).await.is_err() {
                    warn!("Dispatcher channel closed");
                    break;
                }

                // Check max samples limit
                if let Some(max) = max_samples {
                    if stats.samples_captured >= max {
                        info!(samples = stats.samples_captured, "Reached max samples limit");
                        break;
                    }
                }
            }

            stats
        };

        // Run with optional timeout
        let stats = if let Some(timeout) = self.config.timeout {
            match tokio::time::timeout(timeout, pipeline_task).await {
                Ok(stats) => stats,
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "Pipeline timed out");
                    PipelineStats::default()
                }
            }
        } else {
            pipeline_task.await
        };

        // Shutdown: close the device first so blocking polls see closed queues
        info!("Shutting down pipeline...");
        if let Err(e) = factory.shutdown().await {
            warn!(error = %e, "Error during device shutdown");
        }
        worker.shutdown();
        if let Some(monitor) = imu_monitor.as_mut() {
            monitor.join();
        }

        // Wait for dispatcher to flush
        let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;

        let capture_snapshot = worker.metrics().snapshot();

        let mut final_stats = stats;
        final_stats.duration = start_time.elapsed();
        final_stats.samples_dropped = capture_snapshot.samples_dropped;
        final_stats.empty_polls = capture_snapshot.empty_polls;
        final_stats.assembly_errors = capture_snapshot.assembly_errors;
        if let Some(monitor) = &imu_monitor {
            final_stats.imu_reports = monitor.reports_seen();
        }

        info!(
            duration_secs = final_stats.duration.as_secs_f64(),
            sps = format!("{:.2}", final_stats.samples_per_second()),
            "Pipeline shutdown complete"
        );

        Ok(final_stats)
    }
}
