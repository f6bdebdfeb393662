//! Pixel geometry & format manager
//!
//! Owns the frame buffer and every setting that determines its shape:
//! CCD size, binning, scan mode, pixel format, bit depth, and ROIs.
//! All validation happens before any state changes, so a rejected request
//! leaves the previous geometry untouched.

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{
    CameraConfig, CameraError, FrameBuffer, FrameGeometry, PixelFormat, Roi, ALLOWED_BIT_DEPTHS,
};
use tracing::{debug, info};

/// Device bounds for geometry validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorLimits {
    pub min_ccd: u32,
    pub max_ccd: u32,
    pub max_binning: u32,
}

impl Default for SensorLimits {
    fn default() -> Self {
        Self {
            min_ccd: 16,
            max_ccd: 33000,
            max_binning: 9,
        }
    }
}

/// Binning values permitted in a scan mode
///
/// Faster scan modes read out fewer rows, so the large factors drop out.
pub fn allowed_binning_for(scan_mode: u32) -> Vec<u32> {
    let mut allowed = vec![1, 2];
    if scan_mode < 3 {
        allowed.push(4);
    }
    if scan_mode < 2 {
        allowed.push(8);
    }
    allowed
}

#[derive(Debug, Clone)]
struct GeometryState {
    ccd_width: u32,
    ccd_height: u32,
    binning: u32,
    scan_mode: u32,
    format: PixelFormat,
    bit_depth: u32,
    /// Active single ROI in binned coordinates
    roi: Option<Roi>,
    multi_roi: Vec<Roi>,
    buffer: FrameBuffer,
}

impl GeometryState {
    fn full_width(&self) -> u32 {
        self.ccd_width / self.binning
    }

    fn full_height(&self) -> u32 {
        self.ccd_height / self.binning
    }

    fn active_region(&self) -> Roi {
        self.roi
            .unwrap_or_else(|| Roi::new(0, 0, self.full_width(), self.full_height()))
    }

    fn resize_buffer(&mut self) {
        let region = self.active_region();
        self.buffer.resize(region.width, region.height, self.format);
    }

    fn geometry(&self) -> FrameGeometry {
        let region = self.active_region();
        FrameGeometry {
            width: region.width,
            height: region.height,
            format: self.format,
            bit_depth: self.bit_depth,
            binning: self.binning,
            roi_x: region.x,
            roi_y: region.y,
        }
    }
}

/// Geometry seen by one buffer operation
#[derive(Debug, Clone)]
pub struct GeometryView {
    pub geometry: FrameGeometry,
    /// Multi-ROI rectangles, relative to the full binned frame
    pub multi_roi: Vec<Roi>,
}

/// Geometry & format manager
///
/// The frame buffer never leaves the lock; callers borrow it through
/// [`GeometryManager::with_buffer`] for the duration of one operation.
pub struct GeometryManager {
    state: Mutex<GeometryState>,
    limits: SensorLimits,
}

impl GeometryManager {
    /// Create manager with full-frame geometry
    pub fn new(ccd_width: u32, ccd_height: u32, format: PixelFormat) -> Result<Self, CameraError> {
        Self::with_limits(ccd_width, ccd_height, format, SensorLimits::default())
    }

    /// Create manager with custom sensor bounds
    pub fn with_limits(
        ccd_width: u32,
        ccd_height: u32,
        format: PixelFormat,
        limits: SensorLimits,
    ) -> Result<Self, CameraError> {
        check_ccd("ccd_width", ccd_width, &limits)?;
        check_ccd("ccd_height", ccd_height, &limits)?;

        let mut state = GeometryState {
            ccd_width,
            ccd_height,
            binning: 1,
            scan_mode: 1,
            format,
            bit_depth: format.native_bit_depth(),
            roi: None,
            multi_roi: Vec::new(),
            buffer: FrameBuffer::default(),
        };
        state.resize_buffer();

        Ok(Self {
            state: Mutex::new(state),
            limits,
        })
    }

    /// Build from the camera section of a blueprint
    pub fn from_config(config: &CameraConfig) -> Result<Self, CameraError> {
        let manager = Self::new(config.ccd_width, config.ccd_height, config.pixel_format)?;
        manager.set_scan_mode(config.scan_mode)?;
        manager.set_binning(config.binning)?;
        if let Some(depth) = config.bit_depth {
            manager.set_bit_depth(depth)?;
        }
        Ok(manager)
    }

    fn lock(&self) -> MutexGuard<'_, GeometryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sensor bounds
    pub fn limits(&self) -> SensorLimits {
        self.limits
    }

    /// Current geometry snapshot
    pub fn geometry(&self) -> FrameGeometry {
        self.lock().geometry()
    }

    /// Current buffer size in bytes
    pub fn buffer_len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn ccd_size(&self) -> (u32, u32) {
        let state = self.lock();
        (state.ccd_width, state.ccd_height)
    }

    pub fn scan_mode(&self) -> u32 {
        self.lock().scan_mode
    }

    /// Binning values permitted in the current scan mode
    pub fn allowed_binning(&self) -> Vec<u32> {
        allowed_binning_for(self.lock().scan_mode)
    }

    /// Select a pixel format; bit depth resets to the format's native depth
    pub fn set_format(&self, format: PixelFormat) {
        let mut state = self.lock();
        state.format = format;
        state.bit_depth = format.native_bit_depth();
        state.resize_buffer();
        debug!(format = %format, bytes = state.buffer.len(), "Pixel format changed");
    }

    /// Select a pixel format by device name
    ///
    /// Unknown names fall back to `8bit` and report `UnknownFormat`.
    pub fn set_format_by_name(&self, name: &str) -> Result<(), CameraError> {
        match name.parse::<PixelFormat>() {
            Ok(format) => {
                self.set_format(format);
                Ok(())
            }
            Err(requested) => {
                self.set_format(PixelFormat::Mono8);
                Err(CameraError::unknown_format(
                    requested,
                    PixelFormat::Mono8.name(),
                ))
            }
        }
    }

    /// Set the significant bit depth
    ///
    /// On an 8-bit buffer, depths needing two bytes promote the format to
    /// `16bit` and 32 promotes it to `32bit`. Unknown depths fall back to 8.
    pub fn set_bit_depth(&self, bit_depth: u32) -> Result<(), CameraError> {
        let mut state = self.lock();
        let (depth, result) = if ALLOWED_BIT_DEPTHS.contains(&bit_depth) {
            (bit_depth, Ok(()))
        } else {
            (
                8,
                Err(CameraError::unknown_format(
                    format!("bit depth {bit_depth}"),
                    "bit depth 8",
                )),
            )
        };

        if state.format == PixelFormat::Mono8 {
            let promoted = match depth {
                10..=16 => Some(PixelFormat::Mono16),
                32 => Some(PixelFormat::Float32),
                _ => None,
            };
            if let Some(format) = promoted {
                info!(bit_depth = depth, format = %format, "Bit depth promoted pixel format");
                state.format = format;
            }
        }

        state.bit_depth = depth;
        state.resize_buffer();
        result
    }

    /// Set CCD size and binning together
    ///
    /// Resets any ROI; the buffer becomes `ccd / binning` in each axis.
    pub fn set_geometry(
        &self,
        ccd_width: u32,
        ccd_height: u32,
        binning: u32,
    ) -> Result<(), CameraError> {
        check_ccd("ccd_width", ccd_width, &self.limits)?;
        check_ccd("ccd_height", ccd_height, &self.limits)?;

        let mut state = self.lock();
        self.check_binning(binning, state.scan_mode)?;

        state.ccd_width = ccd_width;
        state.ccd_height = ccd_height;
        state.binning = binning;
        state.roi = None;
        state.multi_roi.clear();
        state.resize_buffer();

        info!(
            ccd_width,
            ccd_height,
            binning,
            width = state.buffer.width(),
            height = state.buffer.height(),
            "Geometry changed"
        );
        Ok(())
    }

    /// Change binning, rescaling ROIs by `old / new`
    pub fn set_binning(&self, binning: u32) -> Result<(), CameraError> {
        let mut state = self.lock();
        self.check_binning(binning, state.scan_mode)?;
        apply_binning(&mut state, binning);
        Ok(())
    }

    /// Change scan mode (1..=3), coercing binning into the new allowed set
    pub fn set_scan_mode(&self, scan_mode: u32) -> Result<(), CameraError> {
        if !(1..=3).contains(&scan_mode) {
            return Err(CameraError::invalid_size(
                "scan_mode",
                format!("scan mode must be 1..=3, got {scan_mode}"),
            ));
        }

        let mut state = self.lock();
        state.scan_mode = scan_mode;
        let coerced = match (state.binning, scan_mode) {
            (8, 3) | (4, 3) => 2,
            (8, 2) => 4,
            (b, _) => b,
        };
        if coerced != state.binning {
            debug!(from = state.binning, to = coerced, scan_mode, "Binning coerced");
            apply_binning(&mut state, coerced);
        }
        Ok(())
    }

    /// Set the single ROI (binned coordinates); a zero-sized ROI clears it
    pub fn set_roi(&self, roi: Roi) -> Result<(), CameraError> {
        if roi.width == 0 && roi.height == 0 {
            self.clear_roi();
            return Ok(());
        }

        let mut state = self.lock();
        check_inside("roi", &roi, state.full_width(), state.full_height())?;
        state.roi = Some(roi);
        state.multi_roi.clear();
        state.resize_buffer();
        debug!(x = roi.x, y = roi.y, width = roi.width, height = roi.height, "ROI set");
        Ok(())
    }

    /// Set several ROIs; the single ROI becomes their bounding box
    pub fn set_multi_roi(&self, rects: Vec<Roi>) -> Result<(), CameraError> {
        let Some(bbox) = Roi::bounding_box(&rects) else {
            self.clear_roi();
            return Ok(());
        };

        let mut state = self.lock();
        let (full_w, full_h) = (state.full_width(), state.full_height());
        for (idx, rect) in rects.iter().enumerate() {
            check_inside(&format!("multi_roi[{idx}]"), rect, full_w, full_h)?;
        }

        state.roi = Some(bbox);
        state.multi_roi = rects;
        state.resize_buffer();
        debug!(
            count = state.multi_roi.len(),
            width = bbox.width,
            height = bbox.height,
            "Multi-ROI set"
        );
        Ok(())
    }

    /// Return to full frame
    pub fn clear_roi(&self) {
        let mut state = self.lock();
        state.roi = None;
        state.multi_roi.clear();
        state.resize_buffer();
    }

    /// Active region `(x, y, width, height)`
    pub fn roi(&self) -> Roi {
        self.lock().active_region()
    }

    pub fn multi_roi(&self) -> Vec<Roi> {
        self.lock().multi_roi.clone()
    }

    /// Lend the buffer for one operation under the geometry lock
    pub fn with_buffer<R>(&self, f: impl FnOnce(&mut FrameBuffer, &GeometryView) -> R) -> R {
        let mut state = self.lock();
        let view = GeometryView {
            geometry: state.geometry(),
            multi_roi: state.multi_roi.clone(),
        };
        f(&mut state.buffer, &view)
    }

    /// Copy of the current buffer contents
    pub fn snapshot_buffer(&self) -> FrameBuffer {
        self.lock().buffer.clone()
    }

    fn check_binning(&self, binning: u32, scan_mode: u32) -> Result<(), CameraError> {
        let allowed = allowed_binning_for(scan_mode);
        if binning == 0 || binning > self.limits.max_binning || !allowed.contains(&binning) {
            return Err(CameraError::InvalidBinning {
                binning,
                scan_mode,
                allowed,
            });
        }
        Ok(())
    }
}

fn apply_binning(state: &mut GeometryState, binning: u32) {
    let old = state.binning;
    if old == binning {
        return;
    }
    state.roi = state.roi.map(|roi| roi.rescaled(old, binning));
    for rect in &mut state.multi_roi {
        *rect = rect.rescaled(old, binning);
    }
    state.binning = binning;
    state.resize_buffer();
    debug!(from = old, to = binning, "Binning changed");
}

fn check_ccd(field: &str, value: u32, limits: &SensorLimits) -> Result<(), CameraError> {
    if value < limits.min_ccd || value > limits.max_ccd {
        return Err(CameraError::invalid_size(
            field,
            format!(
                "{value} outside {}..={}",
                limits.min_ccd, limits.max_ccd
            ),
        ));
    }
    Ok(())
}

fn check_inside(field: &str, roi: &Roi, full_w: u32, full_h: u32) -> Result<(), CameraError> {
    if roi.is_empty() || roi.right() > full_w || roi.bottom() > full_h {
        return Err(CameraError::invalid_size(
            field,
            format!(
                "region {}x{}+{}+{} outside {full_w}x{full_h} frame",
                roi.width, roi.height, roi.x, roi.y
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> GeometryManager {
        GeometryManager::new(512, 512, PixelFormat::Mono8).unwrap()
    }

    #[test]
    fn test_buffer_tracks_geometry_and_format() {
        let gm = manager();
        for (w, h, bin) in [(512, 512, 1), (640, 480, 2), (1000, 16, 4), (33000, 16, 8)] {
            for format in PixelFormat::ALL {
                gm.set_format(format);
                gm.set_geometry(w, h, bin).unwrap();
                let geometry = gm.geometry();
                assert_eq!(geometry.width, w / bin);
                assert_eq!(geometry.height, h / bin);
                assert_eq!(gm.buffer_len(), geometry.byte_len());
            }
        }
    }

    #[test]
    fn test_invalid_ccd_leaves_state_untouched() {
        let gm = manager();
        gm.set_geometry(256, 128, 2).unwrap();

        let err = gm.set_geometry(8, 128, 1).unwrap_err();
        assert!(matches!(err, CameraError::InvalidSize { .. }));
        let err = gm.set_geometry(256, 40000, 1).unwrap_err();
        assert!(matches!(err, CameraError::InvalidSize { .. }));

        assert_eq!(gm.ccd_size(), (256, 128));
        assert_eq!(gm.geometry().width, 128);
    }

    #[test]
    fn test_unknown_format_falls_back_to_mono8() {
        let gm = manager();
        gm.set_format(PixelFormat::Rgb64);
        let err = gm.set_format_by_name("12bitPacked").unwrap_err();
        assert!(matches!(err, CameraError::UnknownFormat { .. }));
        assert_eq!(gm.geometry().format, PixelFormat::Mono8);
        assert_eq!(gm.buffer_len(), 512 * 512);
    }

    #[test]
    fn test_bit_depth_promotes_mono8() {
        let gm = manager();
        gm.set_bit_depth(12).unwrap();
        let geometry = gm.geometry();
        assert_eq!(geometry.format, PixelFormat::Mono16);
        assert_eq!(geometry.bit_depth, 12);

        gm.set_format(PixelFormat::Mono8);
        gm.set_bit_depth(32).unwrap();
        assert_eq!(gm.geometry().format, PixelFormat::Float32);

        gm.set_format(PixelFormat::Mono16);
        assert!(gm.set_bit_depth(9).is_err());
        assert_eq!(gm.geometry().bit_depth, 8);
    }

    #[test]
    fn test_scan_mode_restricts_binning() {
        let gm = manager();
        assert_eq!(gm.allowed_binning(), vec![1, 2, 4, 8]);
        gm.set_binning(8).unwrap();

        gm.set_scan_mode(2).unwrap();
        assert_eq!(gm.geometry().binning, 4);
        assert!(matches!(
            gm.set_binning(8),
            Err(CameraError::InvalidBinning { .. })
        ));

        gm.set_scan_mode(3).unwrap();
        assert_eq!(gm.geometry().binning, 2);
        assert_eq!(gm.allowed_binning(), vec![1, 2]);
        assert!(gm.set_binning(3).is_err());
    }

    #[test]
    fn test_binning_rescales_roi() {
        let gm = manager();
        gm.set_roi(Roi::new(100, 50, 200, 100)).unwrap();
        gm.set_binning(2).unwrap();
        assert_eq!(gm.roi(), Roi::new(50, 25, 100, 50));
        assert_eq!(gm.buffer_len(), 100 * 50);
    }

    #[test]
    fn test_roi_bounds_and_clear() {
        let gm = manager();
        assert!(gm.set_roi(Roi::new(500, 0, 20, 20)).is_err());
        gm.set_roi(Roi::new(10, 10, 20, 30)).unwrap();
        assert_eq!(gm.buffer_len(), 20 * 30);

        gm.set_roi(Roi::new(0, 0, 0, 0)).unwrap();
        assert_eq!(gm.roi(), Roi::new(0, 0, 512, 512));
    }

    #[test]
    fn test_multi_roi_uses_bounding_box() {
        let gm = manager();
        gm.set_multi_roi(vec![Roi::new(10, 10, 10, 10), Roi::new(40, 30, 10, 10)])
            .unwrap();
        assert_eq!(gm.roi(), Roi::new(10, 10, 40, 30));
        assert_eq!(gm.multi_roi().len(), 2);

        gm.clear_roi();
        assert!(gm.multi_roi().is_empty());
    }
}
