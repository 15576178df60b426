//! # Out of Thyme — A Tape Echo / Looper Plugin
//!
//! A tape echo built with [nih-plug](https://github.com/robbert-vdh/nih-plug),
//! exported as Audio Unit (AUv2), VST3 and CLAP. The DSP lives in
//! [`dsp::tape_engine::TapeEngine`]; this file is the host side: it reads
//! the parameters, forwards them to the engine, and wraps the engine with
//! input gain, dry/wet mix and output volume.
//!
//! ## Signal Flow
//!
//! ```text
//! Input × gain ──┬───────────────────────────────── × (1 - mix) ───┐
//!                │                                                  │
//!                │    ┌──────────────── TapeEngine ─────────────┐   │
//!                └───►│ tape · speed · extra heads · filters ·  │   │
//!                     │ feedback · freeze                       │   │
//!                     └──────────────────────┬──────────────────┘   │
//!                                            └──── × mix ─────────►(+)──► × volume ──► Output
//! ```

pub mod dsp;
mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::filter::{FilterType, BUTTERWORTH_Q};
use dsp::tape_engine::{TapeEngine, DEFAULT_MAX_DELAY_SECONDS};
use nih_plug::prelude::*;
use params::PluginParams;

/// Tempo assumed when the host doesn't report one.
const FALLBACK_BPM: f64 = 120.0;

/// The main plugin struct.
///
/// Parameters are shared with the host through an `Arc` and may be read
/// from any thread. The engine is owned by the audio thread and only
/// touched from `initialize()`, `reset()` and `process()`, which the host
/// never runs concurrently.
struct OutOfThyme {
    params: Arc<PluginParams>,

    /// The current sample rate in Hz, set during `initialize()`.
    sample_rate: f32,

    /// The stereo tape echo. Mono layouts feed it the same signal on both
    /// sides.
    engine: TapeEngine,
}

impl Default for OutOfThyme {
    fn default() -> Self {
        Self {
            params: Arc::new(PluginParams::default()),
            // Placeholder until the host tells us the real configuration.
            sample_rate: 44100.0,
            // A minimal tape; the full 128 s one is allocated in initialize().
            engine: TapeEngine::default(),
        }
    }
}

impl Plugin for OutOfThyme {
    const NAME: &'static str = "Out of Thyme";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        // Stereo layout
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        // Mono fallback
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // The engine takes new settings every sample, so automation points
    // land exactly where the host put them.
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Allocate the tape for the host's sample rate.
    ///
    /// 128 seconds of stereo tape at 48 kHz is about 49 MB. That headroom
    /// lets the tape run at its slowest speed for a long time before the
    /// playback head laps the record head.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;
        self.engine
            .prepare(self.sample_rate as f64, DEFAULT_MAX_DELAY_SECONDS);

        nih_log!(
            "tape prepared: {} frames ({} s) at {} Hz",
            self.engine.capacity(),
            DEFAULT_MAX_DELAY_SECONDS,
            self.sample_rate
        );

        true
    }

    /// Called when playback stops or the plugin is bypassed. Erases the
    /// tape so stale echoes don't come back on the next play.
    fn reset(&mut self) {
        self.engine.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        // ─── Per-block settings ───
        self.engine.set_interpolation_mode(self.params.hi_fi.value());
        let freeze = self.params.freeze.value();

        let bpm = context.transport().tempo.unwrap_or(FALLBACK_BPM);
        self.engine
            .set_tempo_sync(self.params.tempo_sync.value().then_some(bpm));

        let sample_rate = self.sample_rate as f64;

        for mut channel_samples in buffer.iter_samples() {
            // ─── Per-sample settings (smoothed) ───
            let input_gain = self.params.input_gain.smoothed.next();
            let speed = self.params.tape_speed.smoothed.next() as f64;
            let spread = self.params.speed_spread.smoothed.next() as f64;
            let delay = self.params.delay_coarse.smoothed.next() as f64 * sample_rate;
            let spacing = self.params.spacing.smoothed.next() as f64;
            let levels = self.params.levels.smoothed.next();
            let feedback = self.params.feedback.smoothed.next();
            let (filter_type, cutoff) = filter_from_morph(self.params.filter.smoothed.next());
            let mix = self.params.mix.smoothed.next();
            let volume = self.params.volume.smoothed.next();

            self.engine.set_tape_speed(speed, speed + spread);
            set_delay_then_freeze(&mut self.engine, delay, freeze);
            self.engine.set_extra_heads_spacing(spacing);
            self.engine.set_extra_heads_level(levels);
            self.engine.set_feedback_gain(feedback);
            self.engine.set_filter(filter_type, cutoff, BUTTERWORTH_Q);

            // ─── Run the tape ───
            let Some(dry_left) = channel_samples.get_mut(0).map(|s| *s * input_gain) else {
                continue;
            };
            let dry_right = channel_samples
                .get_mut(1)
                .map(|s| *s * input_gain)
                .unwrap_or(dry_left);

            let [wet_left, wet_right] = self.engine.process_sample([dry_left, dry_right]);

            if let Some(sample) = channel_samples.get_mut(0) {
                *sample = mix_output(dry_left, wet_left, mix, volume);
            }
            if let Some(sample) = channel_samples.get_mut(1) {
                *sample = mix_output(dry_right, wet_right, mix, volume);
            }
        }

        self.tail_status()
    }
}

/// The freeze loop length is measured from the main delay, so a fresh or
/// reset engine has to see the delay before the freeze request.
fn set_delay_then_freeze(engine: &mut TapeEngine, delay: f64, freeze: bool) {
    engine.set_main_delay(delay, delay);
    engine.set_freeze_mode(freeze);
}

impl OutOfThyme {
    /// How long the host should keep calling `process()` after the input
    /// goes silent.
    ///
    /// A frozen loop or a feedback of 100% or more never dies away. Otherwise
    /// the repeats fall by `feedback` per trip around the loop, and reach
    /// -60 dB after `log(0.001) / log(feedback)` trips.
    fn tail_status(&self) -> ProcessStatus {
        let feedback = self.params.feedback.value();
        if self.engine.freeze_state().is_engaged() || feedback >= 1.0 {
            return ProcessStatus::KeepAlive;
        }

        let [left, right] = self.engine.delay_distance();
        let loop_samples = left.max(right) as f32;

        let tail_samples = if feedback > 0.001 {
            let repeats = -3.0 / feedback.log10(); // log10(0.001) = -3
            repeats * loop_samples
        } else {
            loop_samples
        };

        ProcessStatus::Tail(tail_samples as u32)
    }
}

/// Map the single filter morph knob to a filter type and cutoff.
///
/// ```text
/// 0.0 ────────── 0.45 ──── 0.55 ────────── 1.0
///   lowpass 20 Hz → 15 kHz │ bypass │ highpass 20 Hz → 15 kHz
/// ```
fn filter_from_morph(morph: f32) -> (FilterType, f32) {
    const LOWPASS_END: f32 = 0.45;
    const HIGHPASS_START: f32 = 0.55;
    const SWEEP_HZ: f32 = 15000.0;
    const MIN_CUTOFF_HZ: f32 = 20.0;

    if morph < LOWPASS_END {
        let norm = morph / LOWPASS_END;
        (FilterType::Lowpass, norm * SWEEP_HZ + MIN_CUTOFF_HZ)
    } else if morph > HIGHPASS_START {
        let norm = (morph - HIGHPASS_START) / (1.0 - HIGHPASS_START);
        (FilterType::Highpass, norm * SWEEP_HZ + MIN_CUTOFF_HZ)
    } else {
        (FilterType::Bypass, 1000.0)
    }
}

/// Linear dry/wet crossfade followed by the output volume.
fn mix_output(dry: f32, wet: f32, mix: f32, volume: f32) -> f32 {
    (dry * (1.0 - mix) + wet * mix) * volume
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for OutOfThyme {
    const CLAP_ID: &'static str = "com.loveless-audio.out-of-thyme";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Tape echo with variable speed, extra playback heads and freeze");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for OutOfThyme {
    // The `*b"..."` syntax creates a `[u8; 16]` from a 16-character
    // ASCII string literal.
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssOutOfThyme1";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

nih_export_clap!(OutOfThyme);
nih_export_vst3!(OutOfThyme);

// Re-export the CLAP entry point as an Audio Unit for Logic Pro.
clap_wrapper::export_auv2!();
