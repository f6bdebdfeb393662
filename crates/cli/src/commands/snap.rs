//! `snap` command implementation.

use anyhow::{Context, Result};
use camera::Camera;
use contracts::{FrameBuffer, PixelFormat};
use pattern_engine::{decode_frame_number, samples::pixel_value};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::SnapArgs;
use crate::error::CliError;

/// Snapped frame description for output
#[derive(Serialize)]
struct SnapReport {
    camera: String,
    width: u32,
    height: u32,
    pixel_format: &'static str,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

/// Execute the `snap` command
pub async fn run_snap(args: &SnapArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let camera = Camera::from_blueprint(&blueprint).context("Failed to build camera")?;
    let label = camera.label().to_string();

    info!(camera = %label, "Snapping single frame");
    let frame = tokio::task::spawn_blocking(move || camera.snap_single())
        .await
        .context("Snap task panicked")?
        .context("Snap failed")?;

    if let Some(path) = &args.output {
        std::fs::write(path, frame.as_bytes()).map_err(CliError::from)?;
        info!(path = %path.display(), bytes = frame.len(), "Frame written");
    }

    let report = SnapReport {
        camera: label,
        width: frame.width(),
        height: frame.height(),
        pixel_format: frame.format().name(),
        bytes: frame.len(),
        mean: mono_mean(&frame),
        frame_number: blueprint
            .synthesis
            .display_frame_number
            .then(|| decode_frame_number(&frame))
            .flatten(),
        output: args.output.as_ref().map(|p| p.display().to_string()),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize snap")?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Mean sample value of a monochrome frame
fn mono_mean(frame: &FrameBuffer) -> Option<f64> {
    match frame.format() {
        PixelFormat::Mono8 | PixelFormat::Mono16 | PixelFormat::Float32 => {
            let n = frame.pixel_count();
            if n == 0 {
                return None;
            }
            let sum: f64 = (0..n).map(|i| pixel_value(frame, i)).sum();
            Some(sum / n as f64)
        }
        PixelFormat::Rgb32 | PixelFormat::Rgb64 => None,
    }
}

fn print_report(report: &SnapReport) {
    println!("📷 {}", report.camera);
    println!(
        "   ├─ Frame: {}x{} {}",
        report.width, report.height, report.pixel_format
    );
    println!("   ├─ Bytes: {}", report.bytes);
    if let Some(mean) = report.mean {
        println!("   ├─ Mean: {mean:.2}");
    }
    if let Some(number) = report.frame_number {
        println!("   ├─ Overlay counter: {number}");
    }
    match &report.output {
        Some(path) => println!("   └─ Written to: {path}"),
        None => println!("   └─ Not written (use --output)"),
    }
}
