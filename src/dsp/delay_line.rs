//! # The Tape (Stereo Ring Buffer)
//!
//! A tape echo is a loop of magnetic tape passing a record head and one or
//! more playback heads. Here the loop is a fixed-length ring of stereo
//! frames. The record ("write") head advances exactly one frame per
//! processed sample and wraps back to the start; the playback ("read")
//! heads sit at fractional positions that the engine moves around to
//! emulate tape speed.
//!
//! ```text
//!            read heads                      write head
//!    ┌──────────┬──┬──┬──────────────────────────┬───────────┐
//!    │          ▲  ▲  ▲                          ▼           │
//!    │  ...   extra  main                      write_pos ... │
//!    └───────────────────────────────────────────────────────┘
//!      0                                             capacity
//! ```
//!
//! ## Floored Wrapping
//!
//! Head positions are computed as `write_pos - distance`, which is negative
//! whenever the head sits "behind" the start of the ring. Rust's `%` keeps
//! the sign of the dividend (`-3.0 % 10.0 == -3.0`), which would index
//! outside the buffer. [`wrap`] uses floored modulo instead, so the result
//! always lands in `[0, capacity)`.
//!
//! ## Read Modes
//!
//! - **Nearest** truncates the fractional position and reads one frame.
//!   Cheap, and gritty when the tape speed moves.
//! - **Linear** blends the two neighbouring frames by the fractional part:
//!
//! ```text
//! result = s0 + frac * (s1 - s0)
//! ```

use std::num::NonZeroUsize;

use nih_plug::nih_debug_assert;

/// Wrap a (possibly negative) position into `[0, len)` using floored
/// modulo.
///
/// `rem_euclid` can round up to exactly `len` for tiny negative inputs
/// (e.g. `-1e-18`), so that case is folded back to zero.
pub fn wrap(position: f64, len: f64) -> f64 {
    let wrapped = position.rem_euclid(len);
    if wrapped >= len {
        0.0
    } else {
        wrapped
    }
}

/// A stereo ring buffer that stores the circulating tape signal.
///
/// The buffer is allocated once when the engine is prepared. Reading,
/// writing and advancing never allocate.
pub struct DelayLine {
    /// Interleaved `[left, right]` frames. All values start at 0.0.
    frames: Vec<[f32; 2]>,

    /// Where the next frame will be recorded.
    write_pos: usize,
}

impl DelayLine {
    /// Create a silent tape holding `capacity` stereo frames.
    ///
    /// `NonZeroUsize` keeps the modulo arithmetic below free of
    /// division-by-zero.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            frames: vec![[0.0; 2]; capacity.get()],
            write_pos: 0,
        }
    }

    /// Number of stereo frames on the tape.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Current write head index, always in `[0, capacity)`.
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Record a stereo frame at the write head.
    ///
    /// This does NOT advance the write head; call [`advance()`](Self::advance)
    /// once all heads have been read for this sample.
    pub fn write(&mut self, frame: [f32; 2]) {
        self.frames[self.write_pos] = frame;
    }

    /// Read one channel at a fractional tape position.
    ///
    /// `position` is expected in `[0, capacity)` (see [`wrap`]). The integer
    /// index is reduced modulo the capacity again, so an out-of-range
    /// position can never index past the end of the tape.
    pub fn read(&self, channel: usize, position: f64, interpolate: bool) -> f32 {
        nih_debug_assert!(channel < 2);
        nih_debug_assert!(position >= 0.0 && position < self.frames.len() as f64);

        let len = self.frames.len();
        let channel = channel & 1;
        let index = position as usize % len;

        if !interpolate {
            return self.frames[index][channel];
        }

        let next = (index + 1) % len;
        let frac = (position - position.floor()) as f32;
        let s0 = self.frames[index][channel];
        let s1 = self.frames[next][channel];

        s0 + frac * (s1 - s0)
    }

    /// Advance the write head by one frame, wrapping at the end of the tape.
    pub fn advance(&mut self) {
        self.write_pos = (self.write_pos + 1) % self.frames.len();
    }

    /// Erase the whole tape and rewind the write head.
    pub fn clear(&mut self) {
        self.frames.fill([0.0; 2]);
        self.write_pos = 0;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
