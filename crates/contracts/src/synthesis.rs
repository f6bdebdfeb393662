//! Synthesis parameters
//!
//! Binning and bit depth are geometry state and are read from the
//! geometry manager at render time; everything else lives here.

use serde::{Deserialize, Serialize};

/// Pattern selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    /// Drifting sine stripes
    #[default]
    SineWave,
    /// Photon shot noise + read noise model
    GaussianNoise,
    /// Fixed ramp / banding fixture
    ColorTest,
}

/// Parameters read once per synthesis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParameters {
    #[serde(default)]
    pub mode: SynthesisMode,

    /// Exposure in milliseconds
    #[serde(default = "default_exposure_ms")]
    pub exposure_ms: f64,

    /// Stripe period multiplier for the sine pattern
    #[serde(default = "default_stripe_width")]
    pub stripe_width: f64,

    /// Photons per pixel per millisecond
    #[serde(default = "default_photon_flux")]
    pub photon_flux: f64,

    /// Read noise (electrons RMS)
    #[serde(default = "default_read_noise")]
    pub read_noise_electrons: f64,

    /// Electrons per digital number
    #[serde(default = "default_pcf")]
    pub photon_conversion_factor: f64,

    /// Fraction of pixels forced to zero
    #[serde(default)]
    pub drop_fraction: f64,

    /// Fraction of pixels forced to the maximum value
    #[serde(default)]
    pub saturate_fraction: f64,

    /// Rotate the stripe direction over time
    #[serde(default)]
    pub rotate_enabled: bool,

    /// Burn a seven-segment frame counter into the top-left corner
    #[serde(default)]
    pub display_frame_number: bool,

    /// Value written outside the multi-ROI rectangles
    #[serde(default)]
    pub multi_roi_fill_value: u32,

    /// Fixed RNG seed for reproducible noise and faults
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_exposure_ms() -> f64 {
    10.0
}

fn default_stripe_width() -> f64 {
    1.0
}

fn default_photon_flux() -> f64 {
    50.0
}

fn default_read_noise() -> f64 {
    2.5
}

fn default_pcf() -> f64 {
    1.0
}

impl Default for SynthesisParameters {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::default(),
            exposure_ms: default_exposure_ms(),
            stripe_width: default_stripe_width(),
            photon_flux: default_photon_flux(),
            read_noise_electrons: default_read_noise(),
            photon_conversion_factor: default_pcf(),
            drop_fraction: 0.0,
            saturate_fraction: 0.0,
            rotate_enabled: false,
            display_frame_number: false,
            multi_roi_fill_value: 0,
            seed: None,
        }
    }
}
