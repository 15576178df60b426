//! # DSP (Digital Signal Processing) Core
//!
//! Everything that touches audio samples lives here, independent of the
//! plugin host:
//!
//! - **`tape_engine`**: the tape echo itself. Call
//!   [`TapeEngine::process_sample`](tape_engine::TapeEngine::process_sample)
//!   once per stereo sample.
//!
//! - **`delay_line`**: the stereo ring buffer ("tape") with nearest and
//!   linear-interpolated reads at fractional positions.
//!
//! - **`filter`**: a state variable filter used on the input, output and
//!   feedback paths.
//!
//! - **`freeze`**: the Normal → Filling → Frozen looper state machine.
//!
//! - **`tempo`**: note divisions for tempo-synced head spacing.

pub mod delay_line;
pub mod filter;
pub mod freeze;
pub mod tape_engine;
pub mod tempo;
