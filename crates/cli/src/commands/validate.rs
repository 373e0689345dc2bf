//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    rig: String,
    preview_resolution: u32,
    output_size: u32,
    mono_resolution: String,
    imu_enabled: bool,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let (mono_w, mono_h) = blueprint.rig.mono_resolution.dims();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    rig: blueprint.rig.name.clone(),
                    preview_resolution: blueprint.rig.preview_resolution,
                    output_size: blueprint.rig.output_size,
                    mono_resolution: format!("{}x{}", mono_w, mono_h),
                    imu_enabled: blueprint.imu.enabled,
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::RigBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    // Check for empty sinks
    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - captured samples will be dropped".to_string());
    }

    // Sampling faster than the cameras produce means empty polls or stale serves
    if blueprint.capture.cadence_hz > blueprint.rig.fps {
        warnings.push(format!(
            "capture.cadence_hz ({}) exceeds rig.fps ({}) - expect empty polls or stale serves",
            blueprint.capture.cadence_hz, blueprint.rig.fps
        ));
    }

    if blueprint.capture.cadence_hz == 0.0 {
        warnings.push("capture.cadence_hz is 0 - sampling runs unthrottled".to_string());
    }

    // Check crop geometry
    if blueprint.rig.preview_resolution < blueprint.rig.output_size {
        warnings.push(format!(
            "rig.preview_resolution ({}) is below rig.output_size ({}) - frames will be upsampled",
            blueprint.rig.preview_resolution, blueprint.rig.output_size
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Rig: {}", summary.rig);
            println!(
                "  Preview: {0}x{0} -> output {1}x{1}",
                summary.preview_resolution, summary.output_size
            );
            println!("  Mono cameras: {}", summary.mono_resolution);
            println!("  IMU: {}", if summary.imu_enabled { "on" } else { "off" });
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
