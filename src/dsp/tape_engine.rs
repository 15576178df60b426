//! # Tape Engine
//!
//! The complete tape echo: one record head, one main playback head, three
//! extra playback heads, three filter paths and a freeze looper, all
//! advanced one stereo sample at a time.
//!
//! ## Signal Flow
//!
//! ```text
//!            ┌──────────┐ (hi-fi only)
//! Input ────►│ Input LP │─────────────── dry ───────────────┐
//!            └──────────┘                                   ▼
//!                                                 ┌───────────────────┐
//!   ┌────────────────────── TAPE ─────────────────┤ freeze selects    │
//!   │                                             │ dry / fb / dry+fb │
//!   │  main head ──┬────────────┐                 └───────────────────┘
//!   │  extra heads ┴─ avg × lvl ┤                           ▲
//!   │                           ├──► [Output filter] ──► Output
//!   │                           │                           │
//!   │                           └─ main + extra × weight ──►[Feedback filter] × gain
//!   └────────────────────────────────────────────────────────────────────
//! ```
//!
//! ## Tape Speed
//!
//! The record head always moves one frame per sample. The playback head
//! moves `speed` frames per sample, so the distance between the heads
//! changes by `1 - speed` every sample:
//!
//! - `speed = 1.0` → distance constant, plain echo.
//! - `speed = 0.5` → distance grows, the loop plays back an octave down.
//! - `speed = 2.0` → distance shrinks, the loop plays back an octave up.
//!
//! Because the distance *accumulates* rather than being recomputed from
//! the knob, a speed change glides the pitch the way a real capstan
//! motor would instead of snapping to a new position.

use std::num::NonZeroUsize;

use super::delay_line::{wrap, DelayLine};
use super::filter::{FilterType, StateVariableFilter, BUTTERWORTH_Q};
use super::freeze::FreezeState;
use super::tempo;

/// Tape length allocated by default. Long enough that the slowest tape
/// speed never lets the playback head lap the record head in practice.
pub const DEFAULT_MAX_DELAY_SECONDS: f64 = 128.0;

/// Smallest tape ever allocated, whatever the sample rate.
pub const MIN_TAPE_FRAMES: usize = 1024;

/// Below this level the extra heads are inaudible and not read at all.
const EXTRA_HEADS_SILENT: f32 = 0.001;

/// Number of extra playback heads trailing the main head.
pub const EXTRA_HEADS: usize = 3;

/// One filter per channel for each of the three signal paths.
struct FilterPaths {
    /// Anti-aliasing lowpass ahead of the tape, hi-fi mode only.
    input: [StateVariableFilter; 2],
    /// Tone of what the listener hears.
    output: [StateVariableFilter; 2],
    /// Tone of what goes back onto the tape. Always configured like
    /// `output`.
    feedback: [StateVariableFilter; 2],
}

impl FilterPaths {
    fn new(sample_rate: f32) -> Self {
        let make = || {
            [
                StateVariableFilter::new(sample_rate),
                StateVariableFilter::new(sample_rate),
            ]
        };
        let mut paths = Self {
            input: make(),
            output: make(),
            feedback: make(),
        };

        let input_cutoff = 20_000.0_f32.min(0.45 * sample_rate);
        for filter in &mut paths.input {
            filter.set_type(FilterType::Lowpass);
            filter.set_cutoff(input_cutoff);
        }
        paths
    }

    fn tone_filters(&mut self) -> impl Iterator<Item = &mut StateVariableFilter> {
        self.output.iter_mut().chain(self.feedback.iter_mut())
    }

    fn reset(&mut self) {
        for filter in self
            .input
            .iter_mut()
            .chain(self.output.iter_mut())
            .chain(self.feedback.iter_mut())
        {
            filter.reset();
        }
    }
}

/// How the distance between the extra heads is specified.
#[derive(Clone, Copy, Debug, PartialEq)]
enum HeadSpacing {
    /// Spacing knob read as seconds.
    Free,
    /// Spacing knob read as a note division at this tempo.
    Synced { bpm: f64 },
}

/// A stereo tape echo processed one sample at a time.
///
/// Allocation only happens in [`new()`](Self::new) and
/// [`prepare()`](Self::prepare); everything else works on the prepared
/// tape.
pub struct TapeEngine {
    sample_rate: f64,
    tape: DelayLine,

    /// Frames between the record head and the main playback head, per
    /// channel. Always in `[0, capacity)`.
    delay_distance: [f64; 2],
    /// Last distance requested through `set_main_delay`. `None` forces the
    /// next request to be applied.
    applied_delay: [Option<f64>; 2],

    main_head: [f64; 2],
    extra_heads: [[f64; 2]; EXTRA_HEADS],

    filters: FilterPaths,
    filter_type: FilterType,
    filter_cutoff: f32,
    filter_resonance: f32,

    tape_speed: [f64; 2],
    spacing: f64,
    head_spacing: HeadSpacing,
    extra_heads_level: f32,
    feedback_gain: f32,
    hi_fi: bool,
    freeze: FreezeState,
}

impl Default for TapeEngine {
    fn default() -> Self {
        // A minimal tape: safe to process before the host has told us the
        // real sample rate.
        Self::new(44100.0, 0.0)
    }
}

impl TapeEngine {
    /// Create an engine and prepare it for `sample_rate`.
    pub fn new(sample_rate: f64, max_delay_seconds: f64) -> Self {
        let capacity = tape_capacity(sample_rate, max_delay_seconds);
        Self {
            sample_rate,
            tape: DelayLine::new(capacity),
            delay_distance: [0.0; 2],
            applied_delay: [None; 2],
            main_head: [0.0; 2],
            extra_heads: [[0.0; 2]; EXTRA_HEADS],
            filters: FilterPaths::new(sample_rate as f32),
            filter_type: FilterType::Bypass,
            filter_cutoff: 1000.0,
            filter_resonance: BUTTERWORTH_Q,
            tape_speed: [1.0; 2],
            spacing: 0.0,
            head_spacing: HeadSpacing::Free,
            extra_heads_level: 0.0,
            feedback_gain: 0.0,
            hi_fi: false,
            freeze: FreezeState::Normal,
        }
    }

    /// (Re)allocate the tape for a new sample rate and reset all state.
    ///
    /// Must not run concurrently with [`process_sample()`](Self::process_sample).
    /// User-facing settings (speed, gains, filter) are kept.
    pub fn prepare(&mut self, sample_rate: f64, max_delay_seconds: f64) {
        self.sample_rate = sample_rate;
        self.tape = DelayLine::new(tape_capacity(sample_rate, max_delay_seconds));
        self.filters = FilterPaths::new(sample_rate as f32);
        self.reset();
    }

    /// Erase the tape and rewind every head without reallocating.
    ///
    /// The tone settings are reapplied to the filters, which matters after
    /// `prepare()` has rebuilt them.
    pub fn reset(&mut self) {
        self.tape.clear();
        self.delay_distance = [0.0; 2];
        self.applied_delay = [None; 2];
        self.main_head = [0.0; 2];
        self.extra_heads = [[0.0; 2]; EXTRA_HEADS];
        self.filters.reset();
        self.freeze = FreezeState::Normal;
        self.apply_filter();
    }

    // ─── Setters ────────────────────────────────────────────────────

    /// Playback speed per channel. `1.0` is normal speed; a small
    /// left/right difference gives stereo detune.
    pub fn set_tape_speed(&mut self, left: f64, right: f64) {
        self.tape_speed = [left, right];
    }

    /// `true` selects linear interpolation plus the input anti-aliasing
    /// filter, `false` selects nearest-frame reads and no input filter.
    pub fn set_interpolation_mode(&mut self, hi_fi: bool) {
        // The input filter sits idle in lo-fi mode; start it clean.
        if hi_fi && !self.hi_fi {
            for filter in &mut self.filters.input {
                filter.reset();
            }
        }
        self.hi_fi = hi_fi;
    }

    /// Request (or cancel) a freeze.
    ///
    /// Turning freeze on records exactly one loop of fresh input before the
    /// tape locks. Turning it off resumes normal echo on the next sample.
    /// Repeating the current request is a no-op, so this can be called on
    /// every block.
    pub fn set_freeze_mode(&mut self, freeze: bool) {
        if freeze {
            if !self.freeze.is_engaged() {
                let loop_length = self.loop_length();
                self.freeze.engage(loop_length);
            }
        } else {
            self.freeze.release();
        }
    }

    /// Distance of the main head behind the record head, in frames.
    ///
    /// The tape jumps to the new distance only when the request changes;
    /// between changes the distance keeps drifting with tape speed.
    pub fn set_main_delay(&mut self, left_samples: f64, right_samples: f64) {
        let capacity = self.tape.capacity() as f64;
        for (ch, requested) in [left_samples, right_samples].into_iter().enumerate() {
            if self.applied_delay[ch] != Some(requested) {
                self.delay_distance[ch] = wrap(requested, capacity);
                self.applied_delay[ch] = Some(requested);
            }
        }
    }

    /// Extra head spacing: seconds when free-running, a normalized note
    /// division selector (`0.0..=1.0`) when tempo sync is on.
    pub fn set_extra_heads_spacing(&mut self, spacing: f64) {
        self.spacing = spacing;
    }

    /// `Some(bpm)` locks extra head spacing to the host tempo, `None`
    /// returns to free-running seconds.
    pub fn set_tempo_sync(&mut self, bpm: Option<f64>) {
        self.head_spacing = match bpm {
            Some(bpm) if bpm > 0.0 => HeadSpacing::Synced { bpm },
            _ => HeadSpacing::Free,
        };
    }

    /// Volume of the extra heads, `0.0..=1.0`. Above `0.5` they also start
    /// feeding back into the tape.
    pub fn set_extra_heads_level(&mut self, level: f32) {
        self.extra_heads_level = level;
    }

    /// Configured feedback gain. While frozen, moving this away from its
    /// value at lock time hands loop level control back to the user.
    pub fn set_feedback_gain(&mut self, gain: f32) {
        self.freeze.note_feedback_gain(gain);
        self.feedback_gain = gain;
    }

    /// Tone of both the output and the feedback path.
    ///
    /// Recomputing coefficients costs a `tan()` per filter, so repeating the
    /// current settings is skipped.
    pub fn set_filter(&mut self, filter_type: FilterType, cutoff_hz: f32, resonance: f32) {
        if filter_type == self.filter_type
            && cutoff_hz == self.filter_cutoff
            && resonance == self.filter_resonance
        {
            return;
        }
        self.filter_type = filter_type;
        self.filter_cutoff = cutoff_hz;
        self.filter_resonance = resonance;
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        let (filter_type, cutoff, resonance) =
            (self.filter_type, self.filter_cutoff, self.filter_resonance);
        for filter in self.filters.tone_filters() {
            filter.set_type(filter_type);
            filter.set_cutoff(cutoff);
            filter.set_resonance(resonance);
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Tape length in stereo frames.
    pub fn capacity(&self) -> usize {
        self.tape.capacity()
    }

    pub fn write_position(&self) -> usize {
        self.tape.write_pos()
    }

    /// Main head positions used for the most recent sample.
    pub fn main_head_positions(&self) -> [f64; 2] {
        self.main_head
    }

    /// Extra head positions used for the most recent sample. Not updated
    /// while the extra heads are silent.
    pub fn extra_head_positions(&self) -> [[f64; 2]; EXTRA_HEADS] {
        self.extra_heads
    }

    pub fn delay_distance(&self) -> [f64; 2] {
        self.delay_distance
    }

    pub fn freeze_state(&self) -> FreezeState {
        self.freeze
    }

    /// Spacing between neighbouring extra heads in frames, for a channel
    /// running at `speed`.
    pub fn extra_head_spacing(&self, speed: f64) -> f64 {
        match self.head_spacing {
            HeadSpacing::Free => self.spacing * self.sample_rate,
            HeadSpacing::Synced { bpm } => {
                tempo::synced_spacing(self.spacing, bpm, speed, self.sample_rate)
            }
        }
    }

    /// Whole frames between the record head and the main head, at least 1.
    /// The longer channel wins so both channels capture a full loop.
    fn loop_length(&self) -> usize {
        let capacity = self.tape.capacity();
        let write_pos = self.tape.write_pos();
        self.delay_distance
            .iter()
            .map(|&distance| {
                let head = wrap(write_pos as f64 - distance, capacity as f64) as usize;
                (write_pos + capacity - head) % capacity
            })
            .max()
            .unwrap_or(0)
            .max(1)
    }

    // ─── Processing ─────────────────────────────────────────────────

    /// Run one stereo sample through the tape.
    ///
    /// Heads are read before the record head writes, so the main head at
    /// distance `D` hears what was recorded `D` samples ago.
    pub fn process_sample(&mut self, input: [f32; 2]) -> [f32; 2] {
        let capacity = self.tape.capacity() as f64;
        let write_pos = self.tape.write_pos() as f64;
        let bypass = self.filter_type == FilterType::Bypass;
        let level = self.extra_heads_level;
        let extra_weight = ((level - 0.5) * 2.0).max(0.0);
        let gain = self.freeze.effective_feedback_gain(self.feedback_gain);

        let mut output = [0.0; 2];
        let mut record = [0.0; 2];

        for ch in 0..2 {
            // 1. Input conditioning
            let dry = if self.hi_fi {
                self.filters.input[ch].process(input[ch])
            } else {
                input[ch]
            };

            // 2. Tape speed moves the main head relative to the record head
            let speed = self.tape_speed[ch];
            self.delay_distance[ch] = wrap(self.delay_distance[ch] + (1.0 - speed), capacity);

            // 3–4. Main head
            let main_pos = wrap(write_pos - self.delay_distance[ch], capacity);
            self.main_head[ch] = main_pos;
            let main = self.tape.read(ch, main_pos, self.hi_fi);

            // 5–6. Extra heads, trailing the main head
            let mut extra_sum = 0.0;
            if level > EXTRA_HEADS_SILENT {
                let spacing = self.extra_head_spacing(speed);
                for (i, head) in self.extra_heads.iter_mut().enumerate() {
                    let pos = wrap(main_pos - (i + 1) as f64 * spacing, capacity);
                    head[ch] = pos;
                    extra_sum += self.tape.read(ch, pos, self.hi_fi);
                }
            }
            let extra = extra_sum / EXTRA_HEADS as f32 * level;

            // 7. Output
            let combined = main + extra;
            output[ch] = if bypass {
                combined
            } else {
                self.filters.output[ch].process(combined)
            };

            // 8. Feedback
            let feedback_in = main + extra * extra_weight;
            let feedback = if bypass {
                feedback_in
            } else {
                self.filters.feedback[ch].process(feedback_in)
            };

            // 9. What goes onto the tape depends on the freeze state
            record[ch] = self.freeze.write_signal(dry, feedback * gain);
        }

        // 10–11. Record and move on
        self.tape.write(record);
        self.tape.advance();
        self.freeze.advance(self.feedback_gain);

        output
    }
}

/// `max(MIN_TAPE_FRAMES, round(sample_rate * max_delay_seconds))`.
///
/// Non-finite or negative products saturate to zero in the cast and are
/// floored like any other short tape.
fn tape_capacity(sample_rate: f64, max_delay_seconds: f64) -> NonZeroUsize {
    let frames = (sample_rate * max_delay_seconds).round() as usize;
    NonZeroUsize::new(frames.max(MIN_TAPE_FRAMES)).unwrap_or(NonZeroUsize::MIN)
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────


// ─────────────────────────────────────────────────────────────────────
// Property tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    /// One host-style parameter update followed by a burst of samples.
    #[derive(Debug, Clone)]
    struct Block {
        speed: f64,
        spread: f64,
        delay: f64,
        spacing: f64,
        synced: bool,
        level: f32,
        feedback: f32,
        hi_fi: bool,
        freeze: bool,
        filter: u8,
        samples: usize,
    }

    fn block() -> impl Strategy<Value = Block> {
        (
            (0.1f64..2.0, -0.5f64..0.5, -50.0f64..3000.0, -0.5f64..1.5),
            (any::<bool>(), 0.0f32..1.0, 0.0f32..1.2, any::<bool>()),
            (any::<bool>(), 0u8..3, 1usize..400),
        )
            .prop_map(
                |(
                    (speed, spread, delay, spacing),
                    (synced, level, feedback, hi_fi),
                    (freeze, filter, samples),
                )| Block {
                    speed,
                    spread,
                    delay,
                    spacing,
                    synced,
                    level,
                    feedback,
                    hi_fi,
                    freeze,
                    filter,
                    samples,
                },
            )
    }

    fn apply(engine: &mut TapeEngine, block: &Block) {
        engine.set_tape_speed(block.speed, block.speed + block.spread);
        engine.set_main_delay(block.delay, block.delay);
        engine.set_extra_heads_spacing(block.spacing);
        engine.set_tempo_sync(block.synced.then_some(140.0));
        engine.set_extra_heads_level(block.level);
        engine.set_feedback_gain(block.feedback);
        engine.set_interpolation_mode(block.hi_fi);
        engine.set_freeze_mode(block.freeze);
        let filter_type = match block.filter {
            0 => FilterType::Bypass,
            1 => FilterType::Lowpass,
            _ => FilterType::Highpass,
        };
        engine.set_filter(filter_type, 1200.0, BUTTERWORTH_Q);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Every head and the write cursor stay on the tape whatever the
        /// parameter sequence.
        #[test]
        fn heads_stay_on_tape(blocks in prop::collection::vec(block(), 1..12)) {
            let mut engine = TapeEngine::new(48000.0, 0.001);
            let capacity = engine.capacity();
            let len = capacity as f64;

            for (b, block) in blocks.iter().enumerate() {
                apply(&mut engine, block);
                for n in 0..block.samples {
                    let x = ((n + b) as f32 * 0.1).sin() * 0.5;
                    engine.process_sample([x, -x]);

                    prop_assert!(engine.write_position() < capacity);
                    for pos in engine.main_head_positions() {
                        prop_assert!((0.0..len).contains(&pos), "main head at {}", pos);
                    }
                    for head in engine.extra_head_positions() {
                        for pos in head {
                            prop_assert!((0.0..len).contains(&pos), "extra head at {}", pos);
                        }
                    }
                    for distance in engine.delay_distance() {
                        prop_assert!((0.0..len).contains(&distance), "distance {}", distance);
                    }
                }
            }
        }

        /// Freezing at an integer distance `D` records exactly `D` samples
        /// of dry input before locking.
        #[test]
        fn freeze_locks_after_distance(delay in 1usize..1000, warmup in 0usize..500) {
            let mut engine = TapeEngine::new(48000.0, 0.001);
            engine.set_main_delay(delay as f64, delay as f64);
            for n in 0..warmup {
                engine.process_sample([(n as f32 * 0.2).sin(); 2]);
            }

            engine.set_freeze_mode(true);
            for _ in 0..delay - 1 {
                engine.process_sample([0.5; 2]);
            }
            prop_assert!(!engine.freeze_state().is_frozen());
            engine.process_sample([0.5; 2]);
            prop_assert!(engine.freeze_state().is_frozen());
        }
    }
}
