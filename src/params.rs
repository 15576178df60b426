//! # Plugin Parameters
//!
//! The knobs and switches the host sees. Each parameter has:
//!
//! - A **unique string ID** (`#[id = "..."]`) that the host uses to
//!   save and recall presets. Once published, never change these IDs
//!   or existing presets will break.
//! - A **human-readable name** shown in the DAW's UI.
//! - A **range** and a **default value**.
//! - Optional **smoothing**, so automation doesn't click.
//!
//! The tape engine itself knows nothing about these: `lib.rs` reads them
//! once per sample and forwards plain numbers to the engine setters.

use nih_plug::prelude::*;

/// All user-facing parameters for Out of Thyme.
#[derive(Params)]
pub struct PluginParams {
    /// **Input Gain** — level into the tape, also applied to the dry signal.
    #[id = "inputGain"]
    pub input_gain: FloatParam,

    /// **Tape Speed** — playback speed multiplier.
    ///
    /// Below 1.0 the main head falls further behind the record head and the
    /// echoes play back lower and longer; above 1.0 they play back higher
    /// and catch up.
    #[id = "tapeSpeed"]
    pub tape_speed: FloatParam,

    /// **Speed Spread** — added to the right channel's speed only. Small
    /// values detune the two sides against each other.
    #[id = "speedSpread"]
    pub speed_spread: FloatParam,

    /// **Delay** — initial distance between record and playback head,
    /// in seconds.
    #[id = "delayCoarse"]
    pub delay_coarse: FloatParam,

    /// **Spacing** — distance between the extra heads. Seconds when
    /// free-running, a note-division selector when **Sync** is on.
    #[id = "spacing"]
    pub spacing: FloatParam,

    /// **Levels** — volume of the three extra heads. Above 50% they are
    /// also fed back onto the tape.
    #[id = "levels"]
    pub levels: FloatParam,

    /// **Feedback** — how much of the playback goes back onto the tape.
    ///
    /// Values above 100% grow with each repeat; the output filter and the
    /// host's limiter are the only things keeping them in check.
    #[id = "feedback"]
    pub feedback: FloatParam,

    /// **Filter Morph** — lowpass on the left half, highpass on the right
    /// half, bypassed in the middle.
    #[id = "filter"]
    pub filter: FloatParam,

    /// **Mix** — balance between dry and tape signal.
    #[id = "mix"]
    pub mix: FloatParam,

    /// **Volume** — output level after the mix.
    #[id = "volume"]
    pub volume: FloatParam,

    /// **HiFi** — interpolated reads and input anti-aliasing. Off gives
    /// the grittier nearest-sample sound.
    #[id = "hiFi"]
    pub hi_fi: BoolParam,

    /// **Freeze** — capture one loop and repeat it indefinitely.
    #[id = "freeze"]
    pub freeze: BoolParam,

    /// **Sync** — lock extra head spacing to the host tempo.
    #[id = "sync"]
    pub tempo_sync: BoolParam,
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            input_gain: FloatParam::new(
                "Input Gain",
                1.0,
                FloatRange::Skewed {
                    min: 0.0,
                    max: 10.0,
                    factor: FloatRange::skew_factor(-1.5),
                },
            )
            .with_smoother(SmoothingStyle::Linear(20.0))
            .with_step_size(0.01),

            tape_speed: FloatParam::new(
                "Tape Speed",
                1.0,
                FloatRange::Skewed {
                    min: 0.1,
                    max: 2.0,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit("x")
            // A slow ramp, like a capstan motor spinning up or down.
            .with_smoother(SmoothingStyle::Linear(100.0))
            .with_step_size(0.001),

            speed_spread: FloatParam::new(
                "Speed Spread",
                0.0,
                FloatRange::Linear {
                    min: -0.5,
                    max: 0.5,
                },
            )
            .with_smoother(SmoothingStyle::Linear(100.0))
            .with_step_size(0.001),

            delay_coarse: FloatParam::new(
                "Delay",
                0.5,
                FloatRange::Skewed {
                    min: 0.01,
                    max: 2.7,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit(" s")
            .with_smoother(SmoothingStyle::Linear(50.0))
            .with_step_size(0.001),

            spacing: FloatParam::new("Spacing", 0.2, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_smoother(SmoothingStyle::Linear(50.0))
                .with_step_size(0.001),

            levels: FloatParam::new("Levels", 0.0, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_unit("%")
                .with_smoother(SmoothingStyle::Linear(20.0))
                .with_value_to_string(formatters::v2s_f32_percentage(1))
                .with_string_to_value(formatters::s2v_f32_percentage()),

            feedback: FloatParam::new("Feedback", 0.3, FloatRange::Linear { min: 0.0, max: 1.2 })
                .with_unit("%")
                .with_smoother(SmoothingStyle::Linear(20.0))
                .with_value_to_string(formatters::v2s_f32_percentage(1))
                .with_string_to_value(formatters::s2v_f32_percentage()),

            filter: FloatParam::new(
                "Filter Morph",
                0.5,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_smoother(SmoothingStyle::Linear(50.0))
            .with_step_size(0.001),

            mix: FloatParam::new("Dry/Wet Mix", 0.5, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_unit("%")
                .with_smoother(SmoothingStyle::Linear(20.0))
                .with_value_to_string(formatters::v2s_f32_percentage(1))
                .with_string_to_value(formatters::s2v_f32_percentage()),

            volume: FloatParam::new(
                "Output Volume",
                1.0,
                FloatRange::Linear { min: 0.0, max: 2.0 },
            )
            .with_smoother(SmoothingStyle::Linear(20.0))
            .with_step_size(0.01),

            hi_fi: BoolParam::new("HiFi Mode", false),
            freeze: BoolParam::new("Freeze Mode", false),
            tempo_sync: BoolParam::new("Tempo Sync", false),
        }
    }
}
