//! Pattern engine: mode dispatch plus the post-passes shared by all modes.

use contracts::{FrameBuffer, SynthesisMode, SynthesisParameters};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::trace;

use crate::geometry::GeometryView;
use crate::samples::{fill_raw, saturated_raw};
use crate::{color_test, faults, mask, noise, overlay, sine};

/// Inputs of one synthesis call
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Snapshot taken before the call
    pub params: &'a SynthesisParameters,
    /// Exposure for this frame (may differ from `params.exposure_ms` in an exposure sequence)
    pub exposure_ms: f64,
    /// Value shown by the frame counter overlay
    pub frame_number: u64,
    pub view: &'a GeometryView,
}

/// Stateful pattern generator
///
/// Holds the sine phase and the random source; everything else comes in
/// through [`RenderContext`].
pub struct PatternEngine {
    phase: f64,
    rng: StdRng,
}

impl PatternEngine {
    /// Create engine; `None` seeds from the OS
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            phase: 0.0,
            rng: make_rng(seed),
        }
    }

    /// Current sine phase (radians)
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Restart the random stream
    pub fn reseed(&mut self, seed: Option<u64>) {
        self.rng = make_rng(seed);
    }

    /// Fill `buffer` according to `ctx`
    pub fn render(&mut self, buffer: &mut FrameBuffer, ctx: &RenderContext<'_>) {
        let max_drawn = match ctx.params.mode {
            SynthesisMode::ColorTest if color_test::render(buffer) => None,
            SynthesisMode::GaussianNoise => Some(noise::render(buffer, ctx, &mut self.rng)),
            _ => Some(sine::render(buffer, ctx, &mut self.phase)),
        };

        if let Some(max_drawn) = max_drawn {
            faults::inject(buffer, ctx, &mut self.rng);
            if ctx.params.display_frame_number {
                // a black frame still needs visible segments
                let lit = if max_drawn == 0 {
                    saturated_raw(buffer.format(), ctx.view.geometry.bit_depth)
                } else {
                    max_drawn
                };
                overlay::draw(buffer, ctx.frame_number, lit);
            }
        }

        let geometry = &ctx.view.geometry;
        mask::apply(
            buffer,
            &ctx.view.multi_roi,
            (geometry.roi_x, geometry.roi_y),
            fill_raw(buffer.format(), ctx.params.multi_roi_fill_value),
        );

        trace!(
            mode = ?ctx.params.mode,
            frame_number = ctx.frame_number,
            phase = self.phase,
            "Frame synthesized"
        );
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
