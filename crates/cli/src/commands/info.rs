//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    rig: RigInfo,
    capture: CaptureInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    streams: Vec<StreamInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct RigInfo {
    name: String,
    preview_resolution: u32,
    output_size: u32,
    mono_resolution: String,
    fps: f64,
    lr_check: bool,
    extended_disparity: bool,
    subpixel: bool,
}

#[derive(Serialize)]
struct CaptureInfo {
    empty_policy: String,
    cadence_hz: f64,
    channel_capacity: usize,
    drop_policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    imu_rate_hz: Option<u32>,
}

#[derive(Serialize)]
struct StreamInfo {
    name: String,
    format: String,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    kind: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

/// Frame layout of every output queue the rig would expose
fn stream_layout(blueprint: &contracts::RigBlueprint) -> Vec<StreamInfo> {
    let preview = blueprint.rig.preview_resolution;
    let (mono_w, mono_h) = blueprint.rig.mono_resolution.dims();

    let mut streams = vec![
        StreamInfo {
            name: "rgb".to_string(),
            format: "rgb8_planar".to_string(),
            width: preview,
            height: preview,
        },
        StreamInfo {
            name: "depth_fac".to_string(),
            format: "gray8".to_string(),
            width: mono_w,
            height: mono_h,
        },
        StreamInfo {
            name: "depth_dist".to_string(),
            format: "gray16".to_string(),
            width: mono_w,
            height: mono_h,
        },
        StreamInfo {
            name: "depth_conf".to_string(),
            format: "gray8".to_string(),
            width: mono_w,
            height: mono_h,
        },
    ];

    if blueprint.imu.enabled {
        streams.push(StreamInfo {
            name: "imu".to_string(),
            format: "rotation_vector".to_string(),
            width: 0,
            height: 0,
        });
    }

    streams
}

fn build_config_info(blueprint: &contracts::RigBlueprint, args: &InfoArgs) -> ConfigInfo {
    let (mono_w, mono_h) = blueprint.rig.mono_resolution.dims();

    let streams = if args.streams {
        stream_layout(blueprint)
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                kind: format!("{:?}", s.kind),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        rig: RigInfo {
            name: blueprint.rig.name.clone(),
            preview_resolution: blueprint.rig.preview_resolution,
            output_size: blueprint.rig.output_size,
            mono_resolution: format!("{}x{}", mono_w, mono_h),
            fps: blueprint.rig.fps,
            lr_check: blueprint.stereo.lr_check,
            extended_disparity: blueprint.stereo.extended_disparity,
            subpixel: blueprint.stereo.subpixel,
        },
        capture: CaptureInfo {
            empty_policy: format!("{:?}", blueprint.capture.empty_policy),
            cadence_hz: blueprint.capture.cadence_hz,
            channel_capacity: blueprint.capture.channel_capacity,
            drop_policy: format!("{:?}", blueprint.capture.drop_policy),
            imu_rate_hz: blueprint.imu.enabled.then_some(blueprint.imu.rate_hz),
        },
        streams,
        sinks,
    }
}

fn print_config_info(blueprint: &contracts::RigBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Stereo Sampler Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Rig info
    let (mono_w, mono_h) = blueprint.rig.mono_resolution.dims();
    println!("📍 Rig");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", blueprint.rig.name);
    println!(
        "   ├─ Preview: {0}x{0} -> output {1}x{1}",
        blueprint.rig.preview_resolution, blueprint.rig.output_size
    );
    println!(
        "   ├─ Mono cameras: {}x{} @ {} fps",
        mono_w, mono_h, blueprint.rig.fps
    );
    println!(
        "   └─ Stereo: lr_check={}, extended={}, subpixel={}",
        blueprint.stereo.lr_check, blueprint.stereo.extended_disparity, blueprint.stereo.subpixel
    );

    // Streams
    if args.streams {
        let streams = stream_layout(blueprint);
        println!("\n🎥 Streams ({})", streams.len());
        for (i, stream) in streams.iter().enumerate() {
            let is_last = i == streams.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if stream.width > 0 {
                println!(
                    "   {} {} ({}, {}x{})",
                    prefix, stream.name, stream.format, stream.width, stream.height
                );
            } else {
                println!("   {} {} ({})", prefix, stream.name, stream.format);
            }
        }
    }

    // Capture Settings
    println!("\n⚙️  Capture Settings");
    println!("   ├─ Empty policy: {:?}", blueprint.capture.empty_policy);
    println!("   ├─ Cadence: {} Hz", blueprint.capture.cadence_hz);
    println!(
        "   ├─ Channel capacity: {}",
        blueprint.capture.channel_capacity
    );
    println!("   ├─ Drop policy: {:?}", blueprint.capture.drop_policy);
    if blueprint.imu.enabled {
        println!("   └─ IMU: enabled @ {} Hz", blueprint.imu.rate_hz);
    } else {
        println!("   └─ IMU: disabled");
    }

    // Sinks
    if args.sinks && !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue={})",
                prefix, sink.name, sink.kind, sink.queue_capacity
            );
        }
    } else if !blueprint.sinks.is_empty() {
        println!(
            "\n📤 Sinks: {} configured (--sinks for details)",
            blueprint.sinks.len()
        );
    }

    println!();
}
