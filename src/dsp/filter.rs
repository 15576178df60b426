//! # State Variable Filter
//!
//! The tape engine shapes three signal paths (input, output and feedback)
//! with the same kind of filter: a 2-pole (12 dB/octave) state variable
//! filter that can act as a lowpass or a highpass, with adjustable
//! resonance.
//!
//! ## Topology
//!
//! This is the Topology-Preserving Transform (TPT) form from Zavalishin,
//! "The Art of VA Filter Design". Two trapezoidal integrators hold the
//! filter's memory (`ic1eq`, `ic2eq`). Per sample:
//!
//! ```text
//! v3 = x - ic2eq
//! v1 = (g * v3 + ic1eq) / (1 + g * (g + k))     // bandpass
//! v2 = ic2eq + g * v1                           // lowpass
//! hp = x - k * v1 - v2                          // highpass
//! ```
//!
//! where `g = tan(π * cutoff / sample_rate)` and `k = 1 / Q`.
//!
//! Unlike direct-form biquads, the TPT form stays well behaved when the
//! cutoff is swept every sample, which the host does while a knob moves.

use std::f32::consts::PI;

/// Which response the filter produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterType {
    /// No filtering. The signal passes through and the filter state is
    /// left untouched.
    #[default]
    Bypass,
    /// Passes frequencies below the cutoff.
    Lowpass,
    /// Passes frequencies above the cutoff.
    Highpass,
}

/// Butterworth resonance: maximally flat, no peak at the cutoff.
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// A 2-pole TPT state variable filter for one channel.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    // Integrator state
    ic1eq: f32,
    ic2eq: f32,

    // Coefficients
    g: f32,
    k: f32,

    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    filter_type: FilterType,
}

impl StateVariableFilter {
    /// Create a lowpass filter at 1 kHz with Butterworth resonance.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 0.0,
            sample_rate,
            cutoff: 1000.0,
            resonance: BUTTERWORTH_Q,
            filter_type: FilterType::Lowpass,
        };
        svf.update_coefficients();
        svf
    }

    /// Set the cutoff in Hz.
    ///
    /// Clamped to `20.0..=0.49 * sample_rate`. At Nyquist `tan()` blows up,
    /// so the filter stays just below it. The 20 Hz floor wins when the
    /// sample rate is too low (or not a number) to leave any room.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff = cutoff_hz.min(self.sample_rate * 0.49).max(20.0);
        self.update_coefficients();
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set resonance (Q), clamped to `0.1..=20.0`.
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.1, 20.0);
        self.update_coefficients();
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    pub fn set_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    fn update_coefficients(&mut self) {
        let g = (PI * self.cutoff / self.sample_rate).tan();
        // Degenerate sample rates leave the filter silent instead of NaN.
        self.g = if g.is_finite() { g } else { 0.0 };
        self.k = 1.0 / self.resonance;
    }

    /// Filter one sample.
    pub fn process(&mut self, input: f32) -> f32 {
        if self.filter_type == FilterType::Bypass {
            return input;
        }

        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.filter_type {
            FilterType::Lowpass => v2,
            FilterType::Highpass => input - self.k * v1 - v2,
            FilterType::Bypass => input,
        }
    }

    /// Clear the integrator state.
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
