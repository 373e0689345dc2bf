//! Mock Pipeline Example
//!
//! Demonstrates driving the capture loop against a MockDevice.
//! This example runs without requiring a camera.
//!
//! Run with: cargo run -p demos --bin mock_pipeline

use std::time::Duration;

use capture::{CaptureWorker, CaptureWorkerConfig, SampleReader};
use config_loader::ConfigLoader;
use device_factory::{DeviceFactory, MockDevice, MockDeviceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Mock Pipeline Demo");

    // ==== Stage 1: Use default config or load from file ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading rig config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        // Create a minimal test blueprint
        create_test_blueprint()
    };

    // ==== Stage 2: Boot the Mock Device ====
    tracing::info!("Creating mock stereo device...");

    let sampler = blueprint.to_sampler_config();
    let device = MockDevice::with_config(MockDeviceConfig {
        fps: blueprint.rig.fps,
        ..Default::default()
    });
    let mut factory = DeviceFactory::new(device);

    tracing::info!("Booting rig (mock)...");
    let rig = factory.boot_rig(&sampler, &blueprint.imu).await?;
    tracing::info!(
        streams = rig.taps.len(),
        imu = rig.imu.is_some(),
        "Rig booted successfully"
    );

    // ==== Stage 3: Setup Capture Worker ====
    tracing::info!("Setting up capture worker...");
    let reader = SampleReader::new(rig.taps, &sampler)?;
    let mut worker = CaptureWorker::spawn(
        reader,
        sampler,
        CaptureWorkerConfig::from(&blueprint.capture),
    );
    let capture_rx = worker.take_receiver().unwrap();

    // ==== Stage 4: Run Pipeline ====
    tracing::info!("Starting pipeline...");

    let target_samples = 50u64;

    tracing::info!("Running pipeline, target: {} samples", target_samples);

    let pipeline_handle = tokio::spawn(async move {
        let mut captured = 0u64;

        while let Ok(sample) = capture_rx.recv().await {
            tracing::debug!(
                cycle = sample.cycle,
                poll_us = sample.meta.poll_micros,
                "Received sample"
            );

            captured += 1;
            tracing::info!(
                cycle = sample.cycle,
                t_capture = format!("{:.3}", sample.t_capture),
                side = sample.tensor.size(),
                "Sample assembled"
            );

            if captured >= target_samples {
                break;
            }
        }
        captured
    });

    // Wait for pipeline or timeout
    let result = tokio::time::timeout(Duration::from_secs(30), pipeline_handle).await;

    // ==== Stage 5: Cleanup ====
    tracing::info!("Shutting down and cleaning up...");
    factory.shutdown().await?;
    worker.shutdown();

    match result {
        Ok(Ok(count)) => tracing::info!(samples = count, "Pipeline completed successfully"),
        Ok(Err(e)) => tracing::warn!("Pipeline error: {:?}", e),
        Err(_) => tracing::warn!("Pipeline timed out"),
    }

    Ok(())
}

fn create_test_blueprint() -> contracts::RigBlueprint {
    use contracts::*;

    RigBlueprint {
        version: ConfigVersion::V1,
        rig: RigSettings {
            name: "demo_rig".to_string(),
            preview_resolution: 256,
            output_size: 256,
            mono_resolution: MonoResolution::The400P,
            fps: 30.0,
        },
        stereo: StereoSettings {
            lr_check: true,
            extended_disparity: false,
            subpixel: false,
        },
        capture: CaptureSettings {
            empty_policy: EmptyPolicy::Block,
            cadence_hz: 30.0,
            channel_capacity: 64,
            drop_policy: DropPolicy::DropOldest,
        },
        imu: ImuSettings {
            enabled: false,
            rate_hz: 100,
            batch_report_threshold: 1,
            max_batch_reports: 1,
        },
        sinks: vec![],
    }
}
