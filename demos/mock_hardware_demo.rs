//! Mock Hardware Example
//!
//! Runs a bounded sequence against the background-thread mock driver and
//! checks the delivered order by decoding the burned-in frame counter.
//!
//! Run with: cargo run -p demos --bin mock_hardware_demo [camera.toml]

use std::time::Duration;

use camera::Camera;
use config_loader::ConfigLoader;
use contracts::{CameraBlueprint, FrameBuffer, FrameCount, SourceConfig};
use observability::AcquisitionMetricsAggregator;
use pattern_engine::decode_frame_number;

const FRAMES: u64 = 30;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_thread_names(true)
        .init();

    tracing::info!("Starting Mock Hardware Demo");

    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading blueprint config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        create_demo_blueprint()
    };

    let camera = Camera::from_blueprint(&blueprint)?;
    let ring = camera
        .frame_ring()
        .ok_or("demo needs a circular_buffer sink")?;

    camera.start_sequence(FrameCount::Bounded(FRAMES), 0.0, false)?;

    let mut aggregator = AcquisitionMetricsAggregator::new();
    let mut decoded = Vec::new();
    while camera.is_capturing() || !ring.is_empty() {
        for frame in ring.drain() {
            aggregator.update(&frame.metadata);
            let mut buffer = FrameBuffer::new(
                frame.geometry.width,
                frame.geometry.height,
                frame.geometry.format,
            );
            buffer.as_bytes_mut().copy_from_slice(&frame.data);
            decoded.push(decode_frame_number(&buffer));
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    camera.wait_until_stopped(Duration::from_secs(5));

    if let Some(summary) = camera.status().acquisition.last_status {
        tracing::info!(status = %summary, "Sequence finished");
    }

    let in_order = decoded
        .windows(2)
        .all(|pair| matches!((pair[0], pair[1]), (Some(a), Some(b)) if a < b));
    tracing::info!(
        frames = decoded.len(),
        in_order,
        first = ?decoded.first().copied().flatten(),
        last = ?decoded.last().copied().flatten(),
        "Decoded frame counters"
    );

    println!("{}", aggregator.summary());
    Ok(())
}

fn create_demo_blueprint() -> CameraBlueprint {
    let mut blueprint = CameraBlueprint::default();
    blueprint.camera.label = "DemoCam".to_string();
    blueprint.camera.ccd_width = 256;
    blueprint.camera.ccd_height = 128;
    blueprint.synthesis.exposure_ms = 5.0;
    blueprint.synthesis.display_frame_number = true;
    blueprint.source = SourceConfig::MockHardware { frequency_hz: 60.0 };
    blueprint.sink.capacity = 64;
    blueprint
}
