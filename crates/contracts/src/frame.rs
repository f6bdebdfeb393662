//! Frame data model: owned pixel buffer, geometry, regions of interest,
//! and the records handed from the handoff to the sinks.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::PixelFormat;

/// Rectangular region in binned pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Pixel count covered by the region
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `(px, py)` lies inside the region
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x
            && py >= self.y
            && (px - self.x) < self.width
            && (py - self.y) < self.height
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Rescale all coordinates by `numerator / denominator` (binning change)
    pub fn rescaled(&self, numerator: u32, denominator: u32) -> Self {
        let scale = |v: u32| ((v as u64 * numerator as u64) / denominator.max(1) as u64) as u32;
        Self {
            x: scale(self.x),
            y: scale(self.y),
            width: scale(self.width),
            height: scale(self.height),
        }
    }

    /// Smallest region enclosing every rectangle, `None` for an empty slice
    pub fn bounding_box(rects: &[Roi]) -> Option<Roi> {
        let first = rects.first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.right(), first.bottom());
        for r in &rects[1..] {
            x0 = x0.min(r.x);
            y0 = y0.min(r.y);
            x1 = x1.max(r.right());
            y1 = y1.max(r.bottom());
        }
        Some(Roi::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Geometry snapshot attached to every produced frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bit_depth: u32,
    pub binning: u32,
    /// Origin of the active ROI (0, 0 for full frame)
    pub roi_x: u32,
    pub roi_y: u32,
}

impl FrameGeometry {
    /// Expected byte length of a frame with this geometry
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Contiguous pixel storage
///
/// Capacity always equals `width * height * bytes_per_pixel`; every resize
/// reallocates before the next write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Create zero-filled buffer
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let mut buffer = Self {
            width: 0,
            height: 0,
            format,
            data: Vec::new(),
        };
        buffer.resize(width, height, format);
        buffer
    }

    /// Resize and zero; content is not preserved
    pub fn resize(&mut self, width: u32, height: u32, format: PixelFormat) {
        self.width = width;
        self.height = height;
        self.format = format;
        let len = width as usize * height as usize * format.bytes_per_pixel();
        self.data.clear();
        self.data.resize(len, 0);
        self.data.shrink_to(len);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    pub fn component_count(&self) -> usize {
        self.format.component_count()
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length, always `pixel_count * bytes_per_pixel`
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero every byte
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

/// Frame copied out of a handoff slot
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Handoff sequence number (strictly increasing per run)
    pub sequence: i64,
    pub geometry: FrameGeometry,
    pub data: Bytes,
}

/// Per-frame metadata attached at delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Camera label
    pub camera: String,
    /// Milliseconds since the run started
    pub elapsed_ms: f64,
    /// Active ROI origin
    pub roi_origin: (u32, u32),
    pub binning: u32,
    /// 0-based delivery index within the run
    pub frame_index: u64,
    pub sequence_number: i64,
}

/// Frame as handed to a sink
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Bytes,
    pub geometry: FrameGeometry,
    pub metadata: FrameMetadata,
}
