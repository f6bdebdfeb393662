//! Synthesis parameter store
//!
//! Writers replace values between frames; every synthesis call starts from
//! a cloned snapshot, so a concurrent update never tears one frame.

use std::sync::{Mutex, PoisonError, RwLock};

use contracts::SynthesisParameters;

#[derive(Debug, Default)]
struct ExposureSequence {
    values: Vec<f64>,
    index: usize,
}

/// Shared, lock-protected synthesis parameters
#[derive(Debug, Default)]
pub struct ParameterStore {
    params: RwLock<SynthesisParameters>,
    exposure_sequence: Mutex<ExposureSequence>,
}

impl ParameterStore {
    pub fn new(params: SynthesisParameters) -> Self {
        Self {
            params: RwLock::new(params),
            exposure_sequence: Mutex::default(),
        }
    }

    /// Copy of the current parameters
    pub fn snapshot(&self) -> SynthesisParameters {
        self.params
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutate in place
    pub fn update(&self, f: impl FnOnce(&mut SynthesisParameters)) {
        let mut params = self.params.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut params);
    }

    pub fn replace(&self, params: SynthesisParameters) {
        self.update(|current| *current = params);
    }

    pub fn exposure_ms(&self) -> f64 {
        self.params
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .exposure_ms
    }

    pub fn set_exposure_ms(&self, exposure_ms: f64) {
        self.update(|params| params.exposure_ms = exposure_ms);
    }

    /// Install an exposure list cycled once per sequence frame
    pub fn set_exposure_sequence(&self, values: Vec<f64>) {
        let mut sequence = self
            .exposure_sequence
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sequence.values = values;
        sequence.index = 0;
    }

    pub fn exposure_sequence(&self) -> Vec<f64> {
        self.exposure_sequence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values
            .clone()
    }

    /// Next exposure of the sequence; the plain exposure when none is set
    pub fn next_sequence_exposure(&self) -> f64 {
        let mut sequence = self
            .exposure_sequence
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if sequence.values.is_empty() {
            drop(sequence);
            return self.exposure_ms();
        }
        let exposure = sequence.values[sequence.index];
        sequence.index = (sequence.index + 1) % sequence.values.len();
        exposure
    }

    /// Restart the exposure list from its first entry
    pub fn reset_exposure_sequence(&self) {
        self.exposure_sequence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .index = 0;
    }
}
