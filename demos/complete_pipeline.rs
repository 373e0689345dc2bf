//! Complete Pipeline Example
//!
//! Demonstrates reading a single configuration file, booting a mock rig,
//! running the capture worker, and fanning out via the dispatcher.
//!
//! Run with: cargo run -p demos --bin complete_pipeline -- [config_path]

use std::path::PathBuf;
use std::time::Duration;

use capture::{CaptureWorker, CaptureWorkerConfig, ImuMonitor, SampleReader};
use config_loader::ConfigLoader;
use contracts::CapturedSample;
use device_factory::{DeviceFactory, MockDevice, MockDeviceConfig};
use dispatcher::create_dispatcher;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Complete Pipeline Demo");

    let config_path = resolve_config_path();
    info!(path = %config_path.display(), "Loading rig config file");
    let blueprint = ConfigLoader::load_from_path(config_path.as_path())?;
    info!(rig = %blueprint.rig.name, "Blueprint loaded");

    // ==== Stage 1: Boot the mock rig described by config ====
    let sampler = blueprint.to_sampler_config();
    let device = MockDevice::with_config(MockDeviceConfig {
        fps: blueprint.rig.fps,
        ..Default::default()
    });
    let mut factory = DeviceFactory::new(device);
    let rig = factory.boot_rig(&sampler, &blueprint.imu).await?;
    info!(
        streams = rig.taps.len(),
        imu = rig.imu.is_some(),
        "Output queues opened"
    );

    let mut imu_monitor = rig.imu.map(ImuMonitor::spawn);

    // ==== Stage 2: Create Dispatcher with sinks from config ====
    let (sample_tx, sample_rx) = mpsc::channel::<CapturedSample>(100);
    let dispatcher = create_dispatcher(blueprint.sinks.clone(), sample_rx).await?;
    let dispatcher_handle = dispatcher.spawn();

    // ==== Stage 3: Start the capture worker ====
    let reader = SampleReader::new(rig.taps, &sampler)?;
    let mut worker = CaptureWorker::spawn(
        reader,
        sampler,
        CaptureWorkerConfig::from(&blueprint.capture),
    );
    let capture_rx = worker.take_receiver().unwrap();

    // ==== Stage 4: Run Pipeline ====
    let target_samples = 20u64;
    info!(target_samples, "Running pipeline");

    let pipeline_handle = tokio::spawn(async move {
        let mut captured = 0u64;

        while let Ok(sample) = capture_rx.recv().await {
            captured += 1;
            info!(
                cycle = sample.cycle,
                t_capture = format!("{:.3}", sample.t_capture),
                side = sample.tensor.size(),
                stale = sample.meta.stale_streams.len(),
                "Sample assembled"
            );

            if sample_tx.send(sample).await.is_err() {
                break;
            }

            if captured >= target_samples {
                break;
            }
        }

        captured
    });

    // Wait for pipeline with timeout
    let result = tokio::time::timeout(Duration::from_secs(10), pipeline_handle).await;

    // ==== Stage 5: Graceful Shutdown ====
    info!("Shutting down...");

    factory.shutdown().await?;
    worker.shutdown();
    if let Some(monitor) = imu_monitor.as_mut() {
        monitor.join();
        info!(reports = monitor.reports_seen(), "IMU side stream drained");
    }

    let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;

    match result {
        Ok(Ok(count)) => info!(samples = count, "Pipeline completed successfully"),
        Ok(Err(e)) => info!("Pipeline task error: {:?}", e),
        Err(_) => info!("Pipeline timed out"),
    }

    info!("Complete Pipeline Demo finished");
    Ok(())
}

fn resolve_config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("rig.toml"))
}
