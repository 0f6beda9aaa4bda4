//! The shared engine contract and the four synthesis algorithms.
//!
//! An [`Algorithm`] only describes what is unique about a synthesis method:
//! how to build a voice's state and how to render one voice. [`Engine`] wraps
//! an algorithm with everything the methods have in common (polyphony and
//! voice stealing, the shared envelope, parameters, output gain and limiting,
//! pruning, CPU accounting, observers). [`SynthEngine`] is the object-safe
//! face of an engine that the manager stores per layer.

pub mod additive;
pub mod fm;
pub mod granular;
pub mod wavetable;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::dsp::{gain, limiter, mix, Adsr};
use crate::error::SynthError;
use crate::observer::{Observers, SynthEvent, SynthObserver};
use crate::params::{ParamSpec, ParamStore};
use crate::snapshot::{AlgorithmView, EngineSnapshot};
use crate::voice::{Voice, VoiceBank};
use crate::MAX_BLOCK_SIZE;

pub use additive::Additive;
pub use fm::Fm;
pub use granular::Granular;
pub use wavetable::Wavetable;

/// Released voices quieter than this are dropped.
pub const SILENCE_FLOOR: f32 = 0.001;

/// Semitones covered by a full-scale `pitchBend` of ±1.
pub const PITCH_BEND_SEMITONES: f32 = 2.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineType {
    Wavetable,
    Fm,
    Granular,
    Additive,
}

impl EngineType {
    pub const ALL: [EngineType; 4] = [
        EngineType::Wavetable,
        EngineType::Fm,
        EngineType::Granular,
        EngineType::Additive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EngineType::Wavetable => "wavetable",
            EngineType::Fm => "fm",
            EngineType::Granular => "granular",
            EngineType::Additive => "additive",
        }
    }

    /// Position in [`EngineType::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineType {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineType::ALL
            .into_iter()
            .find(|engine| engine.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SynthError::UnknownEngine(s.to_string()))
    }
}

/// Timing information for one rendered block.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub sample_rate: f32,
    /// Logical time in seconds of the block's first sample.
    pub start: f64,
    /// Envelope built from the common `attack`/`decay`/`sustain`/`release`
    /// parameters.
    pub envelope: Adsr,
    /// Frequency multiplier from the current `pitchBend`.
    pub pitch_ratio: f32,
}

impl RenderContext {
    /// Logical time of sample `index` within the block.
    #[inline]
    pub fn time_at(&self, index: usize) -> f64 {
        self.start + index as f64 / self.sample_rate as f64
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }

    /// Sounding frequency of `voice`, pitch bend included.
    #[inline]
    pub fn frequency<S>(&self, voice: &Voice<S>) -> f32 {
        voice.frequency() * self.pitch_ratio
    }
}

/// Frequency ratio for a `pitchBend` position in -1..=1.
pub fn bend_ratio(bend: f32) -> f32 {
    (bend.clamp(-1.0, 1.0) * PITCH_BEND_SEMITONES / 12.0).exp2()
}

/// What makes one synthesis method different from the others.
pub trait Algorithm: Send + 'static {
    /// Per-voice state this algorithm attaches to a [`Voice`].
    type Voice: Send;

    const KIND: EngineType;

    /// Parameters understood on top of the common ones.
    const PARAMS: &'static [ParamSpec];

    /// Re-read cached settings after any parameter change.
    fn configure(&mut self, params: &ParamStore);

    /// Voice factory, called on every note-on.
    fn create_voice(&mut self, note: u8, velocity: f32) -> Self::Voice;

    fn on_note_on(&mut self, _voice: &mut Voice<Self::Voice>, _now: f64) {}

    fn on_note_off(&mut self, _voice: &mut Voice<Self::Voice>, _now: f64) {}

    /// Called once per block before any voice renders.
    fn begin_block(&mut self, _ctx: &RenderContext) {}

    /// Add one voice's output for the block into `out`.
    fn process_voice(&mut self, voice: &mut Voice<Self::Voice>, out: &mut [f32], ctx: &RenderContext);

    /// Snapshot data for visualizers.
    fn describe(&self, voices: &VoiceBank<Self::Voice>, now: f64) -> AlgorithmView;
}

/// Object-safe engine interface used by the manager.
pub trait SynthEngine: Send {
    fn engine_type(&self) -> EngineType;

    /// Start a note. Returns the note of a voice stolen to make room.
    fn note_on(&mut self, note: u8, velocity: f32) -> Option<u8>;

    /// Release the first held voice playing `note`. Returns whether one was
    /// found.
    fn note_off(&mut self, note: u8) -> bool;

    /// Release every held voice.
    fn all_notes_off(&mut self);

    /// Silence and drop every voice immediately.
    fn reset_voices(&mut self);

    /// Render `out.len()` samples, overwriting `out`.
    fn process_into(&mut self, out: &mut [f32]);

    fn process_audio(&mut self, num_samples: usize) -> Vec<f32> {
        let mut out = vec![0.0; num_samples];
        self.process_into(&mut out);
        out
    }

    /// Set a parameter, returning the clamped value stored. Unsupported names
    /// return `None` and change nothing.
    fn set_parameter(&mut self, name: &str, value: f64) -> Option<f64>;

    fn parameter(&self, name: &str) -> Option<f64>;

    fn parameter_specs(&self) -> &[ParamSpec];

    /// Set a per-voice override on every held voice playing `note`.
    fn set_voice_parameter(&mut self, note: u8, name: &str, value: f64) -> bool;

    fn set_sample_rate(&mut self, sample_rate: f32);

    fn set_max_voices(&mut self, max_voices: usize);

    fn voice_count(&self) -> usize;

    fn max_voices(&self) -> usize;

    /// Processing time of the last block as a fraction of its real-time
    /// budget.
    fn cpu_usage(&self) -> f32;

    /// Logical time in seconds rendered so far.
    fn time(&self) -> f64;

    fn subscribe(&mut self, observer: Box<dyn SynthObserver>);

    fn snapshot(&self) -> EngineSnapshot;
}

/// An algorithm plus the shared voice, parameter and output machinery.
pub struct Engine<A: Algorithm> {
    algorithm: A,
    voices: VoiceBank<A::Voice>,
    params: ParamStore,
    envelope: Adsr,
    amplitude: f32,
    pitch_ratio: f32,
    sample_rate: f32,
    time: f64,
    max_voice_lifetime: f64,
    cpu_usage: f32,
    scratch: Vec<f32>,
    observers: Observers,
}

impl<A: Algorithm> Engine<A> {
    pub fn new(algorithm: A, config: &EngineConfig) -> Self {
        let params = ParamStore::new(A::PARAMS);
        let mut engine = Self {
            algorithm,
            voices: VoiceBank::new(config.voice_limits.get(A::KIND)),
            params,
            envelope: Adsr::default(),
            amplitude: 0.5,
            pitch_ratio: 1.0,
            sample_rate: config.sample_rate,
            time: 0.0,
            max_voice_lifetime: config.max_voice_lifetime as f64,
            cpu_usage: 0.0,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            observers: Observers::new(),
        };
        engine.reconfigure();
        engine
    }

    fn reconfigure(&mut self) {
        self.envelope = Adsr::new(
            self.params.value("attack") as f32,
            self.params.value("decay") as f32,
            self.params.value("sustain") as f32,
            self.params.value("release") as f32,
        );
        self.amplitude = self.params.value("amplitude") as f32;
        self.pitch_ratio = bend_ratio(self.params.value("pitchBend") as f32);
        self.algorithm.configure(&self.params);
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn algorithm_mut(&mut self) -> &mut A {
        &mut self.algorithm
    }

    pub fn voices(&self) -> &VoiceBank<A::Voice> {
        &self.voices
    }

    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    pub fn envelope(&self) -> Adsr {
        self.envelope
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        let n = out.len();
        let ctx = RenderContext {
            sample_rate: self.sample_rate,
            start: self.time,
            envelope: self.envelope,
            pitch_ratio: self.pitch_ratio,
        };
        let end = ctx.time_at(n);

        out.fill(0.0);
        self.algorithm.begin_block(&ctx);

        let scratch = &mut self.scratch[..n];
        for voice in self.voices.iter_mut() {
            if !voice.is_active() {
                continue;
            }
            scratch.fill(0.0);
            self.algorithm.process_voice(voice, scratch, &ctx);
            mix::sum_in_place(out, scratch);
            voice.update_level(&self.envelope, end);
        }

        gain::apply_gain(out, self.amplitude);
        limiter::soft_limit_buffer(out, limiter::ENGINE_THRESHOLD);

        self.time = end;
        self.voices
            .prune(self.time, self.max_voice_lifetime, SILENCE_FLOOR);
    }
}

impl<A: Algorithm> SynthEngine for Engine<A> {
    fn engine_type(&self) -> EngineType {
        A::KIND
    }

    fn note_on(&mut self, note: u8, velocity: f32) -> Option<u8> {
        let note = note.min(127);
        // NaN velocity plays silently
        let velocity = if velocity.is_nan() { 0.0 } else { velocity.clamp(0.0, 1.0) };
        let now = self.time;

        let state = self.algorithm.create_voice(note, velocity);
        let stolen = self.voices.push(Voice::new(note, velocity, now, state));

        if let Some(voice) = self.voices.newest_mut() {
            self.algorithm.on_note_on(voice, now);
        }

        let engine = A::KIND;
        if let Some(stolen) = &stolen {
            self.observers.notify(SynthEvent::VoiceStolen {
                engine,
                note: stolen.note(),
            });
        }
        self.observers.notify(SynthEvent::NoteOn {
            engine,
            note,
            velocity,
        });

        stolen.map(|voice| voice.note())
    }

    fn note_off(&mut self, note: u8) -> bool {
        let now = self.time;
        let found = match self.voices.release_note(note, now) {
            Some(voice) => {
                self.algorithm.on_note_off(voice, now);
                true
            }
            None => false,
        };
        self.voices.drop_inactive();

        if found {
            self.observers.notify(SynthEvent::NoteOff {
                engine: A::KIND,
                note,
            });
        }
        found
    }

    fn all_notes_off(&mut self) {
        let now = self.time;
        for voice in self.voices.iter_mut() {
            if voice.is_held() {
                voice.release(now);
                self.algorithm.on_note_off(voice, now);
            }
        }
    }

    fn reset_voices(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.deactivate();
        }
        self.voices.clear();
    }

    fn process_into(&mut self, out: &mut [f32]) {
        let started = Instant::now();

        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }

        let budget = out.len() as f64 / self.sample_rate as f64;
        if budget > 0.0 {
            self.cpu_usage = (started.elapsed().as_secs_f64() / budget) as f32;
        }
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Option<f64> {
        let stored = self.params.set(name, value)?;
        self.reconfigure();
        Some(stored)
    }

    fn parameter(&self, name: &str) -> Option<f64> {
        self.params.get(name)
    }

    fn parameter_specs(&self) -> &[ParamSpec] {
        self.params.specs()
    }

    fn set_voice_parameter(&mut self, note: u8, name: &str, value: f64) -> bool {
        let Some(spec) = self.params.spec(name).copied() else {
            return false;
        };

        let mut found = false;
        for voice in self.voices.iter_mut().filter(|v| v.note() == note && v.is_held()) {
            voice.set_override(spec.name, spec.clamp(value));
            found = true;
        }
        found
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
    }

    fn set_max_voices(&mut self, max_voices: usize) {
        self.voices.set_max_voices(max_voices);
    }

    fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn max_voices(&self) -> usize {
        self.voices.max_voices()
    }

    fn cpu_usage(&self) -> f32 {
        self.cpu_usage
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn subscribe(&mut self, observer: Box<dyn SynthObserver>) {
        self.observers.subscribe(observer);
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            engine: A::KIND,
            cpu_usage: self.cpu_usage,
            voice_count: self.voices.len(),
            max_voices: self.voices.max_voices(),
            view: self.algorithm.describe(&self.voices, self.time),
        }
    }
}

pub type WavetableEngine = Engine<Wavetable>;
pub type FmEngine = Engine<Fm>;
pub type GranularEngine = Engine<Granular>;
pub type AdditiveEngine = Engine<Additive>;

/// Build the engine for `engine` from `config`. The random sources of the
/// granular and additive engines are seeded from `config.seed`.
pub fn build(engine: EngineType, config: &EngineConfig) -> Box<dyn SynthEngine> {
    match engine {
        EngineType::Wavetable => Box::new(Engine::new(Wavetable::new(), config)),
        EngineType::Fm => Box::new(Engine::new(Fm::new(), config)),
        EngineType::Granular => Box::new(Engine::new(Granular::new(config.seed), config)),
        EngineType::Additive => Box::new(Engine::new(
            Additive::new(config.seed.rotate_left(17)),
            config,
        )),
    }
}
