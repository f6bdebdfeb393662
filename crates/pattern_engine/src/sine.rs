//! Drifting sine-stripe pattern

use std::f64::consts::PI;

use contracts::{FrameBuffer, PixelFormat};

use crate::engine::RenderContext;
use crate::samples::{mono_raw, pack_color, sample_max, write_raw};

/// Render stripes and advance `phase`; returns the largest raw value drawn
pub(crate) fn render(buffer: &mut FrameBuffer, ctx: &RenderContext<'_>, phase: &mut f64) -> u64 {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let sine_period = PI * ctx.params.stripe_width;
    if width == 0 || height == 0 {
        *phase += sine_period / 4.0;
        return 0;
    }

    let format = buffer.format();
    let geometry = &ctx.view.geometry;
    let max = sample_max(format, geometry.bit_depth);
    let exposure = ctx.exposure_ms;
    let bin_area = (geometry.binning * geometry.binning) as f64;
    let half_width = (width / 2).max(1) as f64;

    let (pedestal, amplitude) = match format {
        PixelFormat::Mono8 | PixelFormat::Float32 => (127.0 * exposure / 100.0 * bin_area, exposure),
        PixelFormat::Rgb32 => (127.0 * exposure / 100.0, exposure),
        PixelFormat::Mono16 | PixelFormat::Rgb64 => (
            ((max as u64) / 2) as f64 * exposure / 100.0 * bin_area,
            exposure * max / 255.0,
        ),
    };

    let mut line_phase_inc = 2.0 * sine_period / 4.0 / height as f64;
    if ctx.params.rotate_enabled {
        let tilt = ((*phase as i64 / 6) % 24) - 12;
        line_phase_inc *= tilt as f64;
    }

    let sample = |line_phase: f64, x: usize| -> f64 {
        let angle = *phase + line_phase + 2.0 * sine_period * x as f64 / half_width;
        (pedestal + amplitude * angle.sin()).clamp(0.0, max)
    };

    let mut line_phase = 0.0;
    let mut max_drawn = 0u64;
    for y in 0..height {
        for x in 0..width {
            let raw = if format.is_color() {
                pack_color(
                    format,
                    [
                        sample(line_phase, x),
                        sample(line_phase * 2.0, x),
                        sample(line_phase * 4.0, x),
                    ],
                )
            } else {
                mono_raw(format, sample(line_phase, x))
            };
            write_raw(buffer, y * width + x, raw);
            max_drawn = max_drawn.max(raw);
        }
        line_phase += line_phase_inc;
    }

    *phase += sine_period / 4.0;
    max_drawn
}
