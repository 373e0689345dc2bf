//! Replay Pipeline Example
//!
//! Replays a recorded session directory through the output queues and runs
//! the full capture pipeline against it.
//!
//! Run with: cargo run -p demos --bin replay_pipeline -- <recording_dir> [config_path]

use std::path::PathBuf;
use std::time::Duration;

use capture::{CaptureWorker, CaptureWorkerConfig, ImuMonitor, SampleReader};
use config_loader::ConfigLoader;
use contracts::CapturedSample;
use device_factory::{DeviceFactory, ReplayConfig, ReplayDevice};
use dispatcher::create_dispatcher;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize observability (Tracing + Prometheus)
    observability::init()?;

    info!("Starting Replay Pipeline Demo");

    // ==== Stage 1: Configure Blueprint ====
    let recording_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("Usage: replay_pipeline <recording_dir> [config_path]")?;

    let config_path = resolve_config_path();
    info!(path = %config_path.display(), "Loading rig config");
    let blueprint = ConfigLoader::load_from_path(config_path.as_path())?;

    // ==== Stage 2: Boot the Replay Device ====
    info!(recording = %recording_dir.display(), "Opening recorded session...");

    let sampler = blueprint.to_sampler_config();
    let device = ReplayDevice::new(ReplayConfig::new(recording_dir));
    let mut factory = DeviceFactory::new(device);

    info!("Booting rig (replay)...");
    let rig = factory.boot_rig(&sampler, &blueprint.imu).await?;
    info!(
        streams = rig.taps.len(),
        imu = rig.imu.is_some(),
        "Rig booted from recording"
    );

    let mut imu_monitor = rig.imu.map(ImuMonitor::spawn);

    // ==== Stage 3: Setup Dispatcher ====
    info!("Setting up dispatcher...");
    let (sample_tx, sample_rx) = mpsc::channel::<CapturedSample>(100);

    if blueprint.sinks.is_empty() {
        warn!("No sinks configured; dispatcher will drop samples");
    }

    let dispatcher = create_dispatcher(blueprint.sinks.clone(), sample_rx).await?;
    let dispatcher_handle = dispatcher.spawn();

    // ==== Stage 4: Start the capture worker ====
    info!("Setting up capture worker...");
    let reader = SampleReader::new(rig.taps, &sampler)?;
    let mut worker = CaptureWorker::spawn(
        reader,
        sampler,
        CaptureWorkerConfig::from(&blueprint.capture),
    );
    let capture_rx = worker.take_receiver().unwrap();

    // ==== Stage 5: Run Pipeline ====
    // The worker exits on its own once the recording ends and the queues close.
    let target_samples = 10000u64;
    let sample_tx_clone = sample_tx;

    info!("Running pipeline, target: {} samples", target_samples);

    let pipeline_handle = tokio::spawn(async move {
        let mut captured = 0u64;

        while let Ok(sample) = capture_rx.recv().await {
            captured += 1;
            info!(
                cycle = sample.cycle,
                t_capture = format!("{:.3}", sample.t_capture),
                side = sample.tensor.size(),
                "Sample assembled"
            );

            if sample_tx_clone.send(sample).await.is_err() {
                break;
            }

            if captured >= target_samples {
                break;
            }
        }
        captured
    });

    // Wait for pipeline or timeout
    let result = tokio::time::timeout(Duration::from_secs(1000), pipeline_handle).await;

    // ==== Stage 6: Cleanup ====
    info!("Shutting down and cleaning up...");

    factory.shutdown().await?;
    worker.shutdown();
    if let Some(monitor) = imu_monitor.as_mut() {
        monitor.join();
        info!(reports = monitor.reports_seen(), "IMU side stream drained");
    }

    // Wait for dispatcher
    let _ = tokio::time::timeout(Duration::from_secs(20), dispatcher_handle).await;

    match result {
        Ok(Ok(count)) => info!(samples = count, "Pipeline completed successfully"),
        Ok(Err(e)) => warn!("Pipeline error: {:?}", e),
        Err(_) => warn!("Pipeline timed out"),
    }

    Ok(())
}

fn resolve_config_path() -> PathBuf {
    std::env::args()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("rig.toml"))
}
