//! # Freeze
//!
//! Freeze turns the echo into a looper: whatever is circulating on the tape
//! repeats forever and new input stops being recorded.
//!
//! Freezing the instant the button is pressed would capture a fragment of
//! the previous loop spliced with new audio. Instead the engine first
//! records one full loop of clean dry input, then locks it:
//!
//! ```text
//!             freeze on                   countdown hits 0
//!   Normal ───────────────► Filling { n } ────────────────► Frozen
//!     ▲                         │                              │
//!     └─────────────────────────┴──────────────────────────────┘
//!                              freeze off
//! ```
//!
//! | state   | written to tape          | feedback gain                 |
//! |---------|--------------------------|-------------------------------|
//! | Normal  | dry + feedback           | as configured                 |
//! | Filling | dry only                 | (feedback not written)        |
//! | Frozen  | feedback only            | 1.0 until the knob is moved   |

/// How far the feedback knob must move away from its value at the moment
/// of freezing before the frozen loop follows it.
pub const FEEDBACK_MOVE_THRESHOLD: f32 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum FreezeState {
    #[default]
    Normal,
    /// Recording one clean loop of dry input before locking it.
    Filling { samples_to_fill: usize },
    /// Recirculating the captured loop.
    Frozen {
        /// Feedback gain when the loop was locked.
        anchor_gain: f32,
        /// Set once the feedback knob moves more than
        /// [`FEEDBACK_MOVE_THRESHOLD`] away from `anchor_gain`.
        feedback_moved: bool,
    },
}

impl FreezeState {
    /// Start capturing a loop `loop_length` samples long.
    ///
    /// Ignored if a freeze is already filling or frozen.
    pub fn engage(&mut self, loop_length: usize) {
        if *self == FreezeState::Normal {
            *self = FreezeState::Filling {
                samples_to_fill: loop_length.max(1),
            };
        }
    }

    /// Return to normal echo behaviour immediately.
    pub fn release(&mut self) {
        *self = FreezeState::Normal;
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, FreezeState::Frozen { .. })
    }

    /// Whether the tape is being held or captured (not plain echo).
    pub fn is_engaged(&self) -> bool {
        *self != FreezeState::Normal
    }

    /// Latch a feedback knob movement while frozen.
    pub fn note_feedback_gain(&mut self, gain: f32) {
        if let FreezeState::Frozen {
            anchor_gain,
            feedback_moved,
        } = self
        {
            if !*feedback_moved && (gain - *anchor_gain).abs() > FEEDBACK_MOVE_THRESHOLD {
                *feedback_moved = true;
            }
        }
    }

    /// The gain actually applied to the feedback path.
    ///
    /// A fresh freeze sustains at unity so the loop never decays; once the
    /// knob has been moved the configured value takes over, letting the
    /// loop be faded out by hand.
    pub fn effective_feedback_gain(&self, configured: f32) -> f32 {
        match self {
            FreezeState::Frozen {
                feedback_moved: false,
                ..
            } => 1.0,
            _ => configured,
        }
    }

    /// Pick what gets recorded for one channel.
    pub fn write_signal(&self, dry: f32, feedback: f32) -> f32 {
        match self {
            FreezeState::Normal => dry + feedback,
            FreezeState::Filling { .. } => dry,
            FreezeState::Frozen { .. } => feedback,
        }
    }

    /// Step the countdown once per processed sample.
    ///
    /// `feedback_gain` is the configured gain, remembered as the anchor for
    /// knob-movement detection when the loop locks.
    pub fn advance(&mut self, feedback_gain: f32) {
        if let FreezeState::Filling { samples_to_fill } = self {
            *samples_to_fill = samples_to_fill.saturating_sub(1);
            if *samples_to_fill == 0 {
                *self = FreezeState::Frozen {
                    anchor_gain: feedback_gain,
                    feedback_moved: false,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engage_starts_filling() {
        let mut state = FreezeState::Normal;
        state.engage(100);
        assert_eq!(state, FreezeState::Filling { samples_to_fill: 100 });
    }

    #[test]
    fn test_engage_floors_loop_length_to_one() {
        let mut state = FreezeState::Normal;
        state.engage(0);
        assert_eq!(state, FreezeState::Filling { samples_to_fill: 1 });

        state.advance(0.5);
        assert!(state.is_frozen());
    }

    #[test]
    fn test_engage_is_ignored_while_engaged() {
        let mut state = FreezeState::Normal;
        state.engage(10);
        state.advance(0.5);
        state.engage(500);
        assert_eq!(state, FreezeState::Filling { samples_to_fill: 9 });
    }

    #[test]
    fn test_countdown_locks_after_exact_length() {
        let mut state = FreezeState::Normal;
        state.engage(3);

        state.advance(0.4);
        state.advance(0.4);
        assert!(!state.is_frozen());
        state.advance(0.4);
        assert_eq!(
            state,
            FreezeState::Frozen {
                anchor_gain: 0.4,
                feedback_moved: false
            }
        );
    }

    #[test]
    fn test_write_signal_per_state() {
        let mut state = FreezeState::Normal;
        assert_eq!(state.write_signal(0.5, 0.25), 0.75);

        state.engage(1);
        assert_eq!(state.write_signal(0.5, 0.25), 0.5);

        state.advance(0.3);
        assert_eq!(state.write_signal(0.5, 0.25), 0.25);
    }

    #[test]
    fn test_frozen_gain_is_unity_until_knob_moves() {
        let mut state = FreezeState::Normal;
        state.engage(1);
        state.advance(0.3);

        assert_eq!(state.effective_feedback_gain(0.3), 1.0);

        // Small wobble stays under the threshold.
        state.note_feedback_gain(0.305);
        assert_eq!(state.effective_feedback_gain(0.305), 1.0);

        state.note_feedback_gain(0.5);
        assert_eq!(state.effective_feedback_gain(0.5), 0.5);

        // Once latched, moving back to the anchor keeps following the knob.
        state.note_feedback_gain(0.3);
        assert_eq!(state.effective_feedback_gain(0.3), 0.3);
    }

    #[test]
    fn test_knob_moves_ignored_outside_frozen() {
        let mut state = FreezeState::Normal;
        state.note_feedback_gain(1.0);
        assert_eq!(state, FreezeState::Normal);
        assert_eq!(state.effective_feedback_gain(0.7), 0.7);
    }

    #[test]
    fn test_release_returns_to_normal() {
        let mut state = FreezeState::Normal;
        state.engage(1);
        state.advance(0.3);
        state.note_feedback_gain(0.9);

        state.release();
        assert_eq!(state, FreezeState::Normal);
        assert!(!state.is_engaged());

        // Re-freezing clears the old latch.
        state.engage(1);
        state.advance(0.9);
        assert_eq!(state.effective_feedback_gain(0.9), 1.0);
    }
}
