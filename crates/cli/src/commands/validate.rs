//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CameraBlueprint, SinkType, SourceConfig, SynthesisMode};
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
    camera: String,
    frame_width: u32,
    frame_height: u32,
    pixel_format: &'static str,
    bit_depth: u32,
    source: String,
    sink: String,
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

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let camera = &blueprint.camera;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    camera: camera.label.clone(),
                    frame_width: camera.ccd_width / camera.binning,
                    frame_height: camera.ccd_height / camera.binning,
                    pixel_format: camera.pixel_format.name(),
                    bit_depth: camera.effective_bit_depth(),
                    source: format!("{:?}", blueprint.source),
                    sink: format!("{} ({:?})", blueprint.sink.name, blueprint.sink.sink_type),
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
fn collect_warnings(blueprint: &CameraBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let camera = &blueprint.camera;

    if blueprint.sequence.frame_count.is_none() && blueprint.sink.sink_type == SinkType::File {
        warnings.push("Unbounded sequence writing to a file sink will grow without limit".to_string());
    }

    if matches!(blueprint.source, SourceConfig::MockHardware { .. })
        && blueprint.sequence.interval_ms > 0.0
    {
        warnings.push(
            "sequence.interval_ms is ignored for mock_hardware sources (paced by frequency_hz)"
                .to_string(),
        );
    }

    if camera.fast_image && blueprint.synthesis.display_frame_number {
        warnings.push(
            "camera.fast_image re-sends the same buffer - the frame counter will not advance"
                .to_string(),
        );
    }

    if blueprint.synthesis.mode == SynthesisMode::ColorTest && !camera.pixel_format.is_color() {
        warnings.push(format!(
            "color_test on '{}' renders a single-channel ramp",
            camera.pixel_format.name()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Camera: {}", summary.camera);
            println!(
                "  Frame: {}x{} {} @ {} bit",
                summary.frame_width, summary.frame_height, summary.pixel_format, summary.bit_depth
            );
            println!("  Source: {}", summary.source);
            println!("  Sink: {}", summary.sink);
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
