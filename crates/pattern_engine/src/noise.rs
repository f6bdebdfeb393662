//! Photon shot noise + read noise model

use contracts::{FrameBuffer, PixelFormat};
use rand::Rng;

use crate::engine::RenderContext;
use crate::samples::{mono_raw, pack_color, sample_max, write_raw};

/// Normal deviate via the Marsaglia polar method
///
/// Rejected pairs cost no transcendental call; `ln` and `sqrt` run only on
/// acceptance.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    loop {
        let u = rng.random::<f64>() * 2.0 - 1.0;
        let v = rng.random::<f64>() * 2.0 - 1.0;
        let s = u * u + v * v;
        if s > 0.0 && s < 1.0 {
            return mean + std_dev * u * (-2.0 * s.ln() / s).sqrt();
        }
    }
}

/// Background level in digital numbers for a bit depth
pub fn background_offset(bit_depth: u32) -> f64 {
    if bit_depth > 8 {
        100.0
    } else {
        10.0
    }
}

/// Render read-noise background plus photon signal; returns the largest raw value
pub(crate) fn render<R: Rng + ?Sized>(
    buffer: &mut FrameBuffer,
    ctx: &RenderContext<'_>,
    rng: &mut R,
) -> u64 {
    let format = buffer.format();
    let bit_depth = ctx.view.geometry.bit_depth;
    let max = sample_max(format, bit_depth);
    let offset = background_offset(bit_depth);

    let pcf = ctx.params.photon_conversion_factor.max(f64::EPSILON);
    let read_noise_dn = ctx.params.read_noise_electrons / pcf;
    let photons = ctx.params.photon_flux * ctx.exposure_ms;
    let signal_mean = photons / pcf;
    let signal_std = photons.max(0.0).sqrt() / pcf;
    let quantize = format != PixelFormat::Float32;

    let sample = |rng: &mut R| -> f64 {
        let background = gaussian(rng, offset, read_noise_dn).clamp(0.0, max);
        let value = (background + gaussian(rng, signal_mean, signal_std)).clamp(0.0, max);
        if quantize {
            value.round()
        } else {
            value
        }
    };

    let mut max_drawn = 0u64;
    for index in 0..buffer.pixel_count() {
        let raw = if format.is_color() {
            pack_color(format, [sample(rng), sample(rng), sample(rng)])
        } else {
            mono_raw(format, sample(rng))
        };
        write_raw(buffer, index, raw);
        max_drawn = max_drawn.max(raw);
    }
    max_drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_gaussian_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<f64> = (0..20_000).map(|_| gaussian(&mut rng, 5.0, 2.0)).collect();
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!((mean - 5.0).abs() < 0.1, "mean {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std {}", var.sqrt());
    }

    #[test]
    fn test_zero_std_returns_mean() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(gaussian(&mut rng, 42.0, 0.0), 42.0);
    }

    #[test]
    fn test_background_offset() {
        assert_eq!(background_offset(8), 10.0);
        assert_eq!(background_offset(12), 100.0);
    }
}
