//! Dead / hot pixel injection

use contracts::FrameBuffer;
use rand::seq::index;
use rand::Rng;

use crate::engine::RenderContext;
use crate::samples::{saturated_raw, write_raw};

/// Number of pixels a fault fraction affects
pub fn fault_count(fraction: f64, pixel_count: usize) -> usize {
    if fraction <= 0.0 || pixel_count == 0 {
        return 0;
    }
    ((0.5 + fraction * pixel_count as f64) as usize).min(pixel_count)
}

/// Saturate then drop distinct random pixels
pub(crate) fn inject<R: Rng + ?Sized>(buffer: &mut FrameBuffer, ctx: &RenderContext<'_>, rng: &mut R) {
    let pixel_count = buffer.pixel_count();

    let saturate = fault_count(ctx.params.saturate_fraction, pixel_count);
    if saturate > 0 {
        let hot = saturated_raw(buffer.format(), ctx.view.geometry.bit_depth);
        for idx in index::sample(rng, pixel_count, saturate) {
            write_raw(buffer, idx, hot);
        }
    }

    let dropped = fault_count(ctx.params.drop_fraction, pixel_count);
    for idx in index::sample(rng, pixel_count, dropped) {
        write_raw(buffer, idx, 0);
    }
}
