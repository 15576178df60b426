//! # Tempo-Synced Head Spacing
//!
//! When tempo sync is on, the spacing knob stops meaning "seconds" and
//! instead picks one of seven note divisions. The knob's range is split
//! into seven equal-width steps:
//!
//! ```text
//! knob:  0 ─────┬─────┬─────┬─────┬─────┬─────┬───── 1
//! beats:  1/32  │1/16 │ 1/8 │ 1/4 │ 1/2 │  1  │  2
//! ```
//!
//! A division is converted to samples through the beat length:
//!
//! ```text
//! spacing = beats * (60 / bpm) * speed * sample_rate
//! ```
//!
//! The `speed` factor keeps the taps on the beat as heard: a tape running
//! at half speed plays the loop back stretched, so the physical distance
//! between heads must shrink by the same factor.

/// Fractions of a beat selectable by the spacing knob, shortest first.
pub const DIVISIONS: [f64; 7] = [
    1.0 / 32.0,
    1.0 / 16.0,
    1.0 / 8.0,
    1.0 / 4.0,
    1.0 / 2.0,
    1.0,
    2.0,
];

/// Quantize a normalized knob value (`0.0..=1.0`) to a fraction of a beat.
///
/// Out-of-range values snap to the nearest end of the table.
pub fn division(knob: f64) -> f64 {
    let steps = DIVISIONS.len();
    let step = (knob.clamp(0.0, 1.0) * steps as f64) as usize;
    DIVISIONS[step.min(steps - 1)]
}

/// Distance in samples between two tempo-synced heads.
pub fn synced_spacing(knob: f64, bpm: f64, speed: f64, sample_rate: f64) -> f64 {
    division(knob) * (60.0 / bpm) * speed * sample_rate
}
