//! `info` command implementation.

use anyhow::{Context, Result};
use camera::Camera;
use contracts::{PixelFormat, SinkType, SynthesisMode, ALLOWED_BIT_DEPTHS};
use pattern_engine::allowed_binning_for;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

const SCAN_MODES: [u32; 3] = [1, 2, 3];

/// Capability info for JSON output
#[derive(Serialize)]
struct CapabilityInfo {
    version: &'static str,
    pixel_formats: Vec<FormatInfo>,
    bit_depths: Vec<u32>,
    scan_modes: Vec<ScanModeInfo>,
    synthesis_modes: Vec<SynthesisMode>,
    sink_types: Vec<SinkType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    camera: Option<CameraInfo>,
}

#[derive(Serialize)]
struct FormatInfo {
    name: &'static str,
    bytes_per_pixel: usize,
    components: usize,
    native_bit_depth: u32,
}

#[derive(Serialize)]
struct ScanModeInfo {
    scan_mode: u32,
    allowed_binning: Vec<u32>,
}

#[derive(Serialize)]
struct CameraInfo {
    label: String,
    width: u32,
    height: u32,
    pixel_format: &'static str,
    bit_depth: u32,
    binning: u32,
    scan_mode: u32,
    exposure_ms: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let camera = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration info");
            let blueprint = load_blueprint(path)?;
            let camera = Camera::from_blueprint(&blueprint).context("Failed to build camera")?;
            Some(describe_camera(&camera))
        }
        None => None,
    };

    let info = build_capability_info(camera);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize capability info")?;
        println!("{}", json);
    } else {
        print_capability_info(&info);
    }

    Ok(())
}

fn describe_camera(camera: &Camera) -> CameraInfo {
    let status = camera.status();
    CameraInfo {
        label: status.label,
        width: status.geometry.width,
        height: status.geometry.height,
        pixel_format: status.geometry.format.name(),
        bit_depth: status.geometry.bit_depth,
        binning: status.geometry.binning,
        scan_mode: status.scan_mode,
        exposure_ms: status.exposure_ms,
    }
}

fn build_capability_info(camera: Option<CameraInfo>) -> CapabilityInfo {
    CapabilityInfo {
        version: env!("CARGO_PKG_VERSION"),
        pixel_formats: PixelFormat::ALL
            .iter()
            .map(|format| FormatInfo {
                name: format.name(),
                bytes_per_pixel: format.bytes_per_pixel(),
                components: format.component_count(),
                native_bit_depth: format.native_bit_depth(),
            })
            .collect(),
        bit_depths: ALLOWED_BIT_DEPTHS.to_vec(),
        scan_modes: SCAN_MODES
            .iter()
            .map(|&scan_mode| ScanModeInfo {
                scan_mode,
                allowed_binning: allowed_binning_for(scan_mode),
            })
            .collect(),
        synthesis_modes: vec![
            SynthesisMode::SineWave,
            SynthesisMode::GaussianNoise,
            SynthesisMode::ColorTest,
        ],
        sink_types: vec![SinkType::CircularBuffer, SinkType::Log, SinkType::File],
        camera,
    }
}

fn print_capability_info(info: &CapabilityInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   camsim Capabilities                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🖼  Pixel Formats ({})", info.pixel_formats.len());
    for (i, format) in info.pixel_formats.iter().enumerate() {
        let prefix = if i == info.pixel_formats.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!(
            "   {} {:<9} {} byte(s), {} component(s), {} bit",
            prefix,
            format.name,
            format.bytes_per_pixel,
            format.components,
            format.native_bit_depth
        );
    }

    println!("\n🎚  Bit Depths");
    println!("   └─ {:?}", info.bit_depths);

    println!("\n🔲 Binning per Scan Mode");
    for (i, mode) in info.scan_modes.iter().enumerate() {
        let prefix = if i == info.scan_modes.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!(
            "   {} scan mode {}: {:?}",
            prefix, mode.scan_mode, mode.allowed_binning
        );
    }

    println!("\n✨ Synthesis Modes");
    println!("   └─ {:?}", info.synthesis_modes);

    println!("\n📤 Sink Types");
    println!("   └─ {:?}", info.sink_types);

    if let Some(camera) = &info.camera {
        println!("\n📷 Camera '{}'", camera.label);
        println!(
            "   ├─ Frame: {}x{} {} @ {} bit",
            camera.width, camera.height, camera.pixel_format, camera.bit_depth
        );
        println!(
            "   ├─ Binning: {} (scan mode {})",
            camera.binning, camera.scan_mode
        );
        println!("   └─ Exposure: {} ms", camera.exposure_ms);
    }

    println!();
}
