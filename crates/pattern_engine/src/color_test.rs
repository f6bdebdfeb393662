//! Fixed ramp / banding fixture, independent of exposure and noise.

use contracts::{FrameBuffer, PixelFormat};

use crate::samples::write_raw;

/// Horizontal ramp sample for column `x`
fn ramp(max: u64, x: usize, width: usize) -> u64 {
    let span = width.saturating_sub(1).max(1) as u64;
    (max * (x as u64 + 1) / span).min(max)
}

/// Render the fixture; returns `false` when the format has no fixture
pub(crate) fn render(buffer: &mut FrameBuffer) -> bool {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;

    match buffer.format() {
        PixelFormat::Mono8 | PixelFormat::Mono16 => {
            let max = if buffer.format() == PixelFormat::Mono8 {
                u8::MAX as u64
            } else {
                u16::MAX as u64
            };
            for y in 0..height {
                for x in 0..width {
                    write_raw(buffer, y * width + x, ramp(max, x, width));
                }
            }
            true
        }
        PixelFormat::Rgb32 => {
            // eight bands: pure channels first, then pairwise mixes
            for y in 0..height {
                let section = (y * 8 / height.max(1)).min(7);
                for x in 0..width {
                    let sample = ramp(u8::MAX as u64, x, width);
                    let raw = (0..4usize)
                        .filter(|&c| c == section || (section >= 4 && section - 4 != c))
                        .fold(0u64, |acc, c| acc | (sample << (8 * c)));
                    write_raw(buffer, y * width + x, raw);
                }
            }
            true
        }
        PixelFormat::Rgb64 | PixelFormat::Float32 => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::{channel_value, read_raw};

    #[test]
    fn test_mono_ramp_is_monotonic_and_row_invariant() {
        let mut buffer = FrameBuffer::new(64, 4, PixelFormat::Mono8);
        assert!(render(&mut buffer));

        let row0: Vec<u64> = (0..64).map(|x| read_raw(&buffer, x)).collect();
        assert!(row0.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(row0[63], 255);
        for y in 1..4 {
            assert_eq!(read_raw(&buffer, y * 64 + 17), row0[17]);
        }
    }

    #[test]
    fn test_rgb_bands() {
        let mut buffer = FrameBuffer::new(16, 16, PixelFormat::Rgb32);
        assert!(render(&mut buffer));

        // band 0 (rows 0-1): channel 0 only
        let px = 10;
        assert!(channel_value(&buffer, px, 0) > 0);
        assert_eq!(channel_value(&buffer, px, 1), 0);

        // band 4 (rows 8-9): every channel except 0
        let px = 16 * 8 + 10;
        assert_eq!(channel_value(&buffer, px, 0), 0);
        assert!(channel_value(&buffer, px, 1) > 0);
        assert!(channel_value(&buffer, px, 2) > 0);
    }

    #[test]
    fn test_unsupported_formats_report_false() {
        let mut buffer = FrameBuffer::new(8, 8, PixelFormat::Rgb64);
        assert!(!render(&mut buffer));
    }
}
