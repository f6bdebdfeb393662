//! Pixel formats and bit depths
//!
//! Formats are addressed by the names the device layer uses
//! ("8bit", "16bit", "32bitRGB", "64bitRGB", "32bit").

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bit depths accepted by `SetBitDepth`
pub const ALLOWED_BIT_DEPTHS: [u32; 7] = [8, 10, 11, 12, 14, 16, 32];

/// Pixel storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit monochrome
    #[default]
    #[serde(rename = "8bit")]
    Mono8,
    /// 16-bit monochrome (10..=16 significant bits)
    #[serde(rename = "16bit")]
    Mono16,
    /// Packed BGRA, 8 bits per component
    #[serde(rename = "32bitRGB")]
    Rgb32,
    /// Packed BGRA, 16 bits per component
    #[serde(rename = "64bitRGB")]
    Rgb64,
    /// 32-bit float monochrome
    #[serde(rename = "32bit")]
    Float32,
}

impl PixelFormat {
    /// All supported formats
    pub const ALL: [PixelFormat; 5] = [
        PixelFormat::Mono8,
        PixelFormat::Mono16,
        PixelFormat::Rgb32,
        PixelFormat::Rgb64,
        PixelFormat::Float32,
    ];

    /// Device-layer name
    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Mono8 => "8bit",
            PixelFormat::Mono16 => "16bit",
            PixelFormat::Rgb32 => "32bitRGB",
            PixelFormat::Rgb64 => "64bitRGB",
            PixelFormat::Float32 => "32bit",
        }
    }

    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Mono8 => 1,
            PixelFormat::Mono16 => 2,
            PixelFormat::Rgb32 | PixelFormat::Float32 => 4,
            PixelFormat::Rgb64 => 8,
        }
    }

    /// Number of components per pixel
    pub fn component_count(&self) -> usize {
        match self {
            PixelFormat::Rgb32 | PixelFormat::Rgb64 => 4,
            _ => 1,
        }
    }

    /// Bit depth the format resets to when selected
    pub fn native_bit_depth(&self) -> u32 {
        match self {
            PixelFormat::Mono8 | PixelFormat::Rgb32 => 8,
            PixelFormat::Mono16 | PixelFormat::Rgb64 => 16,
            PixelFormat::Float32 => 32,
        }
    }

    /// Whether pixels carry separate colour channels
    pub fn is_color(&self) -> bool {
        self.component_count() > 1
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PixelFormat::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Largest representable sample value for a bit depth
pub fn max_sample_value(bit_depth: u32) -> u64 {
    if bit_depth >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_depth) - 1
    }
}
