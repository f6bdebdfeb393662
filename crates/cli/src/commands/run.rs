//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{CameraBlueprint, RunStatus};
use std::time::Duration;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_sequence(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after command-line overrides")?;

    info!(
        camera = %blueprint.camera.label,
        ccd_width = blueprint.camera.ccd_width,
        ccd_height = blueprint.camera.ccd_height,
        pixel_format = blueprint.camera.pixel_format.name(),
        source = ?blueprint.source,
        sink = %blueprint.sink.name,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
        ..PipelineConfig::default()
    });

    info!("Starting acquisition...");
    let stats = pipeline.run(shutdown_signal()).await?;

    info!(
        frames_delivered = stats.summary.frames_delivered,
        status = %stats.summary.status,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Acquisition finished"
    );
    stats.print_summary();

    if let RunStatus::Failed(_) = stats.summary.status {
        return Err(CliError::AcquisitionFailed {
            status: stats.summary.status,
        }
        .into());
    }

    Ok(())
}

/// Command-line flags win over the `[sequence]` section
fn apply_overrides(blueprint: &mut CameraBlueprint, args: &RunArgs) {
    if let Some(frames) = args.frames {
        info!(frames, "Overriding frame count from CLI");
        // 0 keeps running until interrupted
        blueprint.sequence.frame_count = (frames != 0).then_some(frames);
    }
    if let Some(interval_ms) = args.interval_ms {
        info!(interval_ms, "Overriding frame interval from CLI");
        blueprint.sequence.interval_ms = interval_ms;
    }
    if args.stop_on_overflow {
        blueprint.sequence.stop_on_overflow = true;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &CameraBlueprint) {
    let camera = &blueprint.camera;
    let sequence = &blueprint.sequence;

    println!("\n=== Configuration Summary ===\n");
    println!("Camera: {}", camera.label);
    println!(
        "  Sensor: {}x{} binning {} (scan mode {})",
        camera.ccd_width, camera.ccd_height, camera.binning, camera.scan_mode
    );
    println!(
        "  Format: {} @ {} bit",
        camera.pixel_format.name(),
        camera.effective_bit_depth()
    );
    println!("  Source: {:?}", blueprint.source);
    println!(
        "\nSynthesis: {:?}, exposure {} ms",
        blueprint.synthesis.mode, blueprint.synthesis.exposure_ms
    );
    println!("\nSequence:");
    match sequence.frame_count {
        Some(n) => println!("  Frames: {n}"),
        None => println!("  Frames: until interrupted"),
    }
    println!("  Interval: {} ms", sequence.interval_ms);
    println!("  Stop on overflow: {}", sequence.stop_on_overflow);
    println!(
        "\nSink: {} ({:?})",
        blueprint.sink.name, blueprint.sink.sink_type
    );
    println!();
}
