//! Multi-ROI masking

use contracts::{FrameBuffer, Roi};

use crate::samples::write_raw;

/// Overwrite every pixel outside the union of `rects` with `fill_raw`
///
/// `rects` are in full-frame coordinates; `origin` is the buffer's ROI origin.
pub(crate) fn apply(buffer: &mut FrameBuffer, rects: &[Roi], origin: (u32, u32), fill_raw: u64) {
    if rects.is_empty() {
        return;
    }

    let relative: Vec<Roi> = rects
        .iter()
        .map(|r| {
            Roi::new(
                r.x.saturating_sub(origin.0),
                r.y.saturating_sub(origin.1),
                r.width,
                r.height,
            )
        })
        .collect();

    let width = buffer.width();
    for y in 0..buffer.height() {
        for x in 0..width {
            if !relative.iter().any(|r| r.contains(x, y)) {
                write_raw(buffer, (y * width + x) as usize, fill_raw);
            }
        }
    }
}
