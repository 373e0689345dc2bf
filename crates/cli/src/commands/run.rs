//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::{Backend, RunArgs};
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.backend == Backend::Replay && args.replay.is_none() {
        anyhow::bail!("--replay <DIR> is required with the replay backend");
    }

    info!(
        rig = %blueprint.rig.name,
        preview = blueprint.rig.preview_resolution,
        output = blueprint.rig.output_size,
        backend = ?args.backend,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        backend: args.backend,
        replay_path: args.replay.clone(),
        replay_speed: args.replay_speed,
        replay_loop: args.replay_loop,
        max_samples: if args.max_samples == 0 {
            None
        } else {
            Some(args.max_samples)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    // Run pipeline with shutdown signal
    tokio::select! {
        result = pipeline.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        samples_captured = stats.samples_captured,
                        samples_dropped = stats.samples_dropped,
                        duration_secs = stats.duration.as_secs_f64(),
                        sps = format!("{:.2}", stats.samples_per_second()),
                        "Pipeline completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Pipeline execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Stereo Sampler finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::RigBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Rig:");
    println!("  Name: {}", blueprint.rig.name);
    println!(
        "  Preview: {0}x{0} -> output {1}x{1}",
        blueprint.rig.preview_resolution, blueprint.rig.output_size
    );
    let (mono_w, mono_h) = blueprint.rig.mono_resolution.dims();
    println!(
        "  Mono cameras: {}x{} @ {} fps",
        mono_w, mono_h, blueprint.rig.fps
    );

    println!("\nStereo:");
    println!("  LR check: {}", blueprint.stereo.lr_check);
    println!(
        "  Extended disparity: {}",
        blueprint.stereo.extended_disparity
    );
    println!("  Subpixel: {}", blueprint.stereo.subpixel);

    println!("\nCapture:");
    println!("  Empty policy: {:?}", blueprint.capture.empty_policy);
    println!("  Cadence: {} Hz", blueprint.capture.cadence_hz);
    println!("  Drop policy: {:?}", blueprint.capture.drop_policy);

    if blueprint.imu.enabled {
        println!("\nIMU: enabled @ {} Hz", blueprint.imu.rate_hz);
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.kind);
        }
    }

    println!();
}
