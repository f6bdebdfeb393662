//! Per-format pixel storage helpers
//!
//! Every pixel is handled as a little-endian "raw" word of
//! `bytes_per_pixel` bytes. Float pixels store their IEEE bit pattern, so
//! raw ordering of non-negative values matches numeric ordering.

use contracts::{max_sample_value, FrameBuffer, PixelFormat};

/// Largest sample value a component may take
pub fn sample_max(format: PixelFormat, bit_depth: u32) -> f64 {
    match format {
        PixelFormat::Mono8 | PixelFormat::Rgb32 => 255.0,
        PixelFormat::Mono16 | PixelFormat::Rgb64 => {
            max_sample_value(bit_depth).min(u16::MAX as u64) as f64
        }
        // float frames use the 8-bit intensity scale
        PixelFormat::Float32 => 255.0,
    }
}

/// Encode a monochrome sample; integer formats truncate
pub fn mono_raw(format: PixelFormat, value: f64) -> u64 {
    match format {
        PixelFormat::Mono8 => value as u8 as u64,
        PixelFormat::Mono16 => value as u16 as u64,
        PixelFormat::Float32 => (value as f32).to_bits() as u64,
        PixelFormat::Rgb32 | PixelFormat::Rgb64 => pack_color(format, [value; 3]),
    }
}

/// Pack three colour channels (alpha/padding stays zero)
pub fn pack_color(format: PixelFormat, channels: [f64; 3]) -> u64 {
    match format {
        PixelFormat::Rgb32 => channels
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, c)| acc | ((*c as u8 as u64) << (8 * i))),
        PixelFormat::Rgb64 => channels
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, c)| acc | ((*c as u16 as u64) << (16 * i))),
        _ => mono_raw(format, channels[0]),
    }
}

/// Raw value of a fully saturated pixel
pub fn saturated_raw(format: PixelFormat, bit_depth: u32) -> u64 {
    let max = sample_max(format, bit_depth);
    match format {
        PixelFormat::Rgb32 | PixelFormat::Rgb64 => pack_color(format, [max; 3]),
        _ => mono_raw(format, max),
    }
}

/// Raw value used for multi-ROI fill
pub fn fill_raw(format: PixelFormat, fill: u32) -> u64 {
    match format {
        PixelFormat::Float32 => (fill as f32).to_bits() as u64,
        _ => {
            let bits = format.bytes_per_pixel() * 8;
            if bits >= 64 {
                fill as u64
            } else {
                fill as u64 & ((1u64 << bits) - 1)
            }
        }
    }
}

/// Write a raw pixel; indices past the end are ignored
pub fn write_raw(buffer: &mut FrameBuffer, index: usize, raw: u64) {
    let bpp = buffer.bytes_per_pixel();
    let start = index * bpp;
    if let Some(dst) = buffer.as_bytes_mut().get_mut(start..start + bpp) {
        dst.copy_from_slice(&raw.to_le_bytes()[..bpp]);
    }
}

/// Write a raw pixel at `(x, y)`, clipped to the frame
pub fn write_raw_xy(buffer: &mut FrameBuffer, x: u32, y: u32, raw: u64) {
    if x < buffer.width() && y < buffer.height() {
        let index = y as usize * buffer.width() as usize + x as usize;
        write_raw(buffer, index, raw);
    }
}

/// Read a raw pixel; 0 past the end
pub fn read_raw(buffer: &FrameBuffer, index: usize) -> u64 {
    let bpp = buffer.bytes_per_pixel();
    let start = index * bpp;
    buffer
        .as_bytes()
        .get(start..start + bpp)
        .map(|src| {
            let mut word = [0u8; 8];
            word[..bpp].copy_from_slice(src);
            u64::from_le_bytes(word)
        })
        .unwrap_or(0)
}

/// Numeric value of pixel `index`; colour formats report channel 0
pub fn pixel_value(buffer: &FrameBuffer, index: usize) -> f64 {
    let raw = read_raw(buffer, index);
    match buffer.format() {
        PixelFormat::Float32 => f32::from_bits(raw as u32) as f64,
        PixelFormat::Rgb32 => (raw & 0xff) as f64,
        PixelFormat::Rgb64 => (raw & 0xffff) as f64,
        _ => raw as f64,
    }
}

/// Channel `channel` of a colour pixel
pub fn channel_value(buffer: &FrameBuffer, index: usize, channel: usize) -> u64 {
    let raw = read_raw(buffer, index);
    match buffer.format() {
        PixelFormat::Rgb32 => (raw >> (8 * channel)) & 0xff,
        PixelFormat::Rgb64 => (raw >> (16 * channel)) & 0xffff,
        _ => raw,
    }
}
