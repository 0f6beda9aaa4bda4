//! Runs the four engines side by side as mixable layers.
//!
//! The manager owns one [`SynthesisLayer`] per engine type and decides which
//! of them sound:
//!
//! - [`SynthesisMode::Single`]: only the primary engine's layer is enabled;
//!   switching primary swaps layers instantly.
//! - [`SynthesisMode::Crossfade`]: switching primary fades the old layer out
//!   and the new one in over `crossfade_time` seconds.
//! - [`SynthesisMode::Layering`]: any set of layers may be enabled at
//!   independent amplitudes and pans.
//!
//! After every note-on the aggregate CPU usage and voice count of the
//! enabled layers are compared against the configured thresholds. When one is
//! exceeded, the enabled layer with the lowest amplitude has its voices reset
//! and an [`SynthEvent::Overload`] is reported.

pub mod layer;

pub use layer::SynthesisLayer;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, RingBuffer};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::{OutputAnalysis, OutputAnalyzer, ANALYSIS_SIZE};
use crate::config::EngineConfig;
use crate::control::{ControlMessage, MessageReceiver};
use crate::dsp::{gain, limiter, mix, smoothing::SmoothedValue};
use crate::engine::{self, EngineType, SynthEngine};
use crate::error::Result;
use crate::io::{converter::midi_to_control, mapping::MidiMap, midi::MidiEvent};
use crate::observer::{Observers, SynthEvent, SynthObserver};
use crate::params::ParamSpec;
use crate::snapshot::SynthSnapshot;
use crate::MAX_BLOCK_SIZE;
#[cfg(feature = "rtrb")]
use crate::{control::SynthHandle, error::SynthError};

/// Parameters handled by the manager itself rather than an engine.
pub const MANAGER_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("masterAmplitude", 0.0, 1.0, 0.75, "gain", "Output level after mixing"),
    ParamSpec::new("masterPan", -1.0, 1.0, 0.0, "pan", "Output pan, attenuating away from centre"),
    ParamSpec::new("crossfadeTime", 0.0, 10.0, 0.5, "s", "Duration of a primary engine crossfade"),
    ParamSpec::new("cpuThreshold", 0.05, 4.0, 0.85, "fraction", "CPU usage that triggers overload mitigation"),
    ParamSpec::new("voiceThreshold", 1.0, 512.0, 64.0, "count", "Total voices that trigger overload mitigation"),
];

/// Master gain ramps over this many milliseconds.
const MASTER_SMOOTHING_MS: f32 = 20.0;

/// Crossfade progress within this distance of 1.0 counts as finished.
const PROGRESS_EPSILON: f64 = 1e-6;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisMode {
    #[default]
    Single,
    Crossfade,
    Layering,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Crossfade {
    from: EngineType,
    to: EngineType,
    progress: f64,
}

pub struct SynthesisManager {
    /// Indexed by [`EngineType::index`].
    layers: Vec<SynthesisLayer>,
    config: EngineConfig,
    primary: EngineType,
    mode: SynthesisMode,
    crossfade: Option<Crossfade>,
    master_amplitude: SmoothedValue,
    master_pan: f32,
    midi_map: MidiMap,
    observers: Observers,
    #[cfg(feature = "rtrb")]
    control: Option<Consumer<ControlMessage>>,
    /// The most recent master output, oldest sample first.
    history: Vec<f32>,
    analyzer: OutputAnalyzer,
    time: f64,
}

impl SynthesisManager {
    /// Build all four engines from `config`. The wavetable engine starts as
    /// the primary in single mode.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let layers = EngineType::ALL
            .iter()
            .map(|&kind| SynthesisLayer::new(engine::build(kind, &config)))
            .collect();

        let mut manager = Self {
            layers,
            master_amplitude: SmoothedValue::new(0.75, MASTER_SMOOTHING_MS, config.sample_rate),
            config,
            primary: EngineType::Wavetable,
            mode: SynthesisMode::Single,
            crossfade: None,
            master_pan: 0.0,
            midi_map: MidiMap::default(),
            observers: Observers::new(),
            #[cfg(feature = "rtrb")]
            control: None,
            history: vec![0.0; ANALYSIS_SIZE],
            analyzer: OutputAnalyzer::new(ANALYSIS_SIZE),
            time: 0.0,
        };
        manager.make_exclusive();
        Ok(manager)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn primary_engine(&self) -> EngineType {
        self.primary
    }

    pub fn mode(&self) -> SynthesisMode {
        self.mode
    }

    /// Seconds of audio rendered so far.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn layers(&self) -> &[SynthesisLayer] {
        &self.layers
    }

    pub fn layer(&self, engine: EngineType) -> &SynthesisLayer {
        &self.layers[engine.index()]
    }

    pub fn layer_mut(&mut self, engine: EngineType) -> &mut SynthesisLayer {
        &mut self.layers[engine.index()]
    }

    pub fn engine(&self, engine: EngineType) -> &dyn SynthEngine {
        self.layer(engine).engine()
    }

    pub fn engine_mut(&mut self, engine: EngineType) -> &mut dyn SynthEngine {
        self.layer_mut(engine).engine_mut()
    }

    /// Progress of the running crossfade, 0.0 when none is running.
    pub fn crossfade_progress(&self) -> f64 {
        self.crossfade.map_or(0.0, |fade| fade.progress)
    }

    /// Engine being faded in, if a crossfade is running.
    pub fn crossfade_target(&self) -> Option<EngineType> {
        self.crossfade.map(|fade| fade.to)
    }

    pub fn subscribe(&mut self, observer: Box<dyn SynthObserver>) {
        self.observers.subscribe(observer);
    }

    pub fn set_mode(&mut self, mode: SynthesisMode) {
        if mode == self.mode {
            return;
        }
        if let Some(fade) = self.crossfade.take() {
            self.finish_crossfade(fade);
        }
        self.mode = mode;
        if mode != SynthesisMode::Layering {
            self.make_exclusive();
        }
    }

    /// Make `engine` the primary engine, switching layers according to the
    /// current mode.
    pub fn set_primary_engine(&mut self, engine: EngineType) {
        if engine == self.primary {
            return;
        }
        // a fade already running lands on its target before a new one starts
        if let Some(fade) = self.crossfade.take() {
            self.finish_crossfade(fade);
        }

        let from = self.primary;
        self.primary = engine;

        match self.mode {
            SynthesisMode::Crossfade if self.config.crossfade_time > 0.0 => {
                let old = &mut self.layers[from.index()];
                old.set_enabled(true);
                old.set_amplitude(1.0);
                let new = &mut self.layers[engine.index()];
                new.set_enabled(true);
                new.set_amplitude(0.0);
                self.crossfade = Some(Crossfade {
                    from,
                    to: engine,
                    progress: 0.0,
                });
            }
            SynthesisMode::Single | SynthesisMode::Crossfade => self.make_exclusive(),
            SynthesisMode::Layering => self.layers[engine.index()].set_enabled(true),
        }

        self.observers
            .notify(SynthEvent::PrimaryEngineChanged { from, to: engine });
    }

    /// Advance a running crossfade by `delta_time` seconds. Rendering calls
    /// this once per block with the block's duration.
    pub fn advance_crossfade(&mut self, delta_time: f64) {
        let Some(mut fade) = self.crossfade else {
            return;
        };

        let duration = self.config.crossfade_time as f64;
        fade.progress = if duration > 0.0 {
            fade.progress + delta_time.max(0.0) / duration
        } else {
            1.0
        };

        if fade.progress >= 1.0 - PROGRESS_EPSILON {
            self.crossfade = None;
            self.finish_crossfade(fade);
        } else {
            let (outgoing, incoming) = mix::crossfade_weights(fade.progress as f32);
            self.layers[fade.from.index()].set_amplitude(outgoing);
            self.layers[fade.to.index()].set_amplitude(incoming);
            self.crossfade = Some(fade);
        }
    }

    fn finish_crossfade(&mut self, fade: Crossfade) {
        let old = &mut self.layers[fade.from.index()];
        old.set_amplitude(0.0);
        old.set_enabled(false);
        self.layers[fade.to.index()].set_amplitude(1.0);
        self.observers
            .notify(SynthEvent::CrossfadeComplete { engine: fade.to });
    }

    /// Only the primary layer enabled, at full amplitude.
    fn make_exclusive(&mut self) {
        for layer in self.layers.iter_mut() {
            let primary = layer.engine_type() == self.primary;
            layer.set_enabled(primary);
            if primary {
                layer.set_amplitude(1.0);
            }
        }
    }

    /// Start `note` on every enabled layer, then check the overload
    /// thresholds.
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        let velocity = if velocity.is_nan() { 0.0 } else { velocity.clamp(0.0, 1.0) };
        for layer in self.layers.iter_mut().filter(|layer| layer.is_enabled()) {
            let engine = layer.engine_type();
            let stolen = layer.engine_mut().note_on(note, velocity);
            if let Some(stolen) = stolen {
                self.observers
                    .notify(SynthEvent::VoiceStolen { engine, note: stolen });
            }
            self.observers.notify(SynthEvent::NoteOn {
                engine,
                note: note.min(127),
                velocity,
            });
        }
        self.check_overload();
    }

    /// Release `note` on every layer, including ones disabled mid-note.
    pub fn note_off(&mut self, note: u8) {
        for layer in self.layers.iter_mut() {
            let engine = layer.engine_type();
            if layer.engine_mut().note_off(note) {
                self.observers.notify(SynthEvent::NoteOff { engine, note });
            }
        }
    }

    pub fn all_notes_off(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.engine_mut().all_notes_off();
        }
    }

    /// Cut every voice on every layer without waiting for release tails.
    pub fn all_sound_off(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.engine_mut().reset_voices();
        }
    }

    pub fn midi_map(&self) -> &MidiMap {
        &self.midi_map
    }

    pub fn midi_map_mut(&mut self) -> &mut MidiMap {
        &mut self.midi_map
    }

    /// Decode and apply one raw MIDI message, listening on every channel.
    /// A controller that completes a pending MIDI learn only binds.
    pub fn process_midi(&mut self, status: u8, data1: u8, data2: u8) {
        let Some(event) = MidiEvent::parse(status, data1, data2) else {
            return;
        };
        if self.midi_map.capture(&event) {
            return;
        }
        if let Some(message) = midi_to_control(event, None, &self.midi_map) {
            self.apply(message);
        }
    }

    /// Total voices across enabled layers.
    pub fn total_voices(&self) -> usize {
        self.layers
            .iter()
            .filter(|layer| layer.is_enabled())
            .map(|layer| layer.engine().voice_count())
            .sum()
    }

    /// Summed CPU usage of the enabled layers.
    pub fn total_cpu(&self) -> f32 {
        self.layers
            .iter()
            .filter(|layer| layer.is_enabled())
            .map(|layer| layer.engine().cpu_usage())
            .sum()
    }

    fn check_overload(&mut self) {
        let cpu_usage = self.total_cpu();
        let voice_count = self.total_voices();
        if cpu_usage <= self.config.cpu_threshold && voice_count <= self.config.voice_threshold {
            return;
        }

        let quietest = self
            .layers
            .iter_mut()
            .filter(|layer| layer.is_enabled())
            .min_by(|a, b| a.amplitude().total_cmp(&b.amplitude()));
        if let Some(layer) = quietest {
            let engine = layer.engine_type();
            layer.engine_mut().reset_voices();
            self.observers.notify(SynthEvent::Overload {
                engine,
                cpu_usage,
                voice_count,
            });
        }
    }

    /// Set a manager parameter, or an engine parameter on every engine that
    /// declares it. Returns whether anything took the value.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> bool {
        if let Some(spec) = MANAGER_PARAMS.iter().find(|spec| spec.name == name) {
            let value = spec.clamp(value);
            match spec.name {
                "masterAmplitude" => self.master_amplitude.set_target(value as f32),
                "masterPan" => self.master_pan = value as f32,
                "crossfadeTime" => self.config.crossfade_time = value as f32,
                "cpuThreshold" => self.config.cpu_threshold = value as f32,
                "voiceThreshold" => self.config.voice_threshold = value.round() as usize,
                _ => return false,
            }
            return true;
        }

        let mut applied = false;
        for layer in self.layers.iter_mut() {
            applied |= layer.engine_mut().set_parameter(name, value).is_some();
        }
        applied
    }

    /// Set a parameter on one engine only. Returns the clamped value stored.
    pub fn set_engine_parameter(&mut self, engine: EngineType, name: &str, value: f64) -> Option<f64> {
        self.engine_mut(engine).set_parameter(name, value)
    }

    /// Read a manager parameter, or the primary engine's value for `name`.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        match name {
            "masterAmplitude" => Some(self.master_amplitude.target() as f64),
            "masterPan" => Some(self.master_pan as f64),
            "crossfadeTime" => Some(self.config.crossfade_time as f64),
            "cpuThreshold" => Some(self.config.cpu_threshold as f64),
            "voiceThreshold" => Some(self.config.voice_threshold as f64),
            _ => self.engine(self.primary).parameter(name),
        }
    }

    pub fn set_layer_enabled(&mut self, engine: EngineType, enabled: bool) {
        self.layer_mut(engine).set_enabled(enabled);
    }

    pub fn set_layer_amplitude(&mut self, engine: EngineType, amplitude: f32) {
        self.layer_mut(engine).set_amplitude(amplitude);
    }

    pub fn set_layer_pan(&mut self, engine: EngineType, pan: f32) {
        self.layer_mut(engine).set_pan(pan);
    }

    pub fn set_layer_solo(&mut self, engine: EngineType, solo: bool) {
        self.layer_mut(engine).set_solo(solo);
    }

    pub fn set_layer_mute(&mut self, engine: EngineType, muted: bool) {
        self.layer_mut(engine).set_muted(muted);
    }

    /// Ignored unless positive and finite.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return;
        }
        self.config.sample_rate = sample_rate;
        self.master_amplitude
            .configure(MASTER_SMOOTHING_MS, sample_rate);
        for layer in self.layers.iter_mut() {
            layer.engine_mut().set_sample_rate(sample_rate);
        }
    }

    /// Record the host block size. Any block size renders; this is advisory.
    pub fn set_buffer_size(&mut self, frames: usize) {
        if frames > 0 {
            self.config.buffer_size = frames;
        }
    }

    /// Apply one control message.
    pub fn apply(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::NoteOn { note, velocity } => self.note_on(note, velocity),
            ControlMessage::NoteOff { note } => self.note_off(note),
            ControlMessage::AllNotesOff => self.all_notes_off(),
            ControlMessage::AllSoundOff => self.all_sound_off(),
            ControlMessage::SetParameter { name, value } => {
                self.set_parameter(name, value);
            }
            ControlMessage::SetEngineParameter { engine, name, value } => {
                self.set_engine_parameter(engine, name, value);
            }
            ControlMessage::SetPrimaryEngine(engine) => self.set_primary_engine(engine),
            ControlMessage::SetMode(mode) => self.set_mode(mode),
            ControlMessage::SetLayerEnabled(engine, enabled) => self.set_layer_enabled(engine, enabled),
            ControlMessage::SetLayerAmplitude(engine, amplitude) => {
                self.set_layer_amplitude(engine, amplitude)
            }
            ControlMessage::SetLayerPan(engine, pan) => self.set_layer_pan(engine, pan),
            ControlMessage::SetLayerSolo(engine, solo) => self.set_layer_solo(engine, solo),
            ControlMessage::SetLayerMute(engine, muted) => self.set_layer_mute(engine, muted),
            ControlMessage::SetSampleRate(sample_rate) => self.set_sample_rate(sample_rate),
            ControlMessage::SetBufferSize(frames) => self.set_buffer_size(frames),
        }
    }

    /// Apply every message `rx` has pending.
    pub fn drain<R: MessageReceiver + ?Sized>(&mut self, rx: &mut R) {
        while let Some(message) = rx.pop() {
            self.apply(message);
        }
    }

    /// Create the queue a control thread uses to drive this manager. Pending
    /// messages are applied at the start of every rendered block.
    #[cfg(feature = "rtrb")]
    pub fn control_channel(&mut self, capacity: usize) -> Result<SynthHandle> {
        if self.control.is_some() {
            return Err(SynthError::ControlChannelTaken);
        }
        let (tx, rx) = RingBuffer::new(capacity.max(1));
        self.control = Some(rx);
        Ok(SynthHandle::new(tx))
    }

    /// Render `out.len()` samples of the master mix into `out`.
    pub fn process_into(&mut self, out: &mut [f32]) {
        #[cfg(feature = "rtrb")]
        if let Some(mut rx) = self.control.take() {
            self.drain(&mut rx);
            self.control = Some(rx);
        }

        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }
        self.remember(out);
    }

    pub fn process_audio(&mut self, num_samples: usize) -> Vec<f32> {
        let mut out = vec![0.0; num_samples];
        self.process_into(&mut out);
        out
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        let any_solo = self
            .layers
            .iter()
            .any(|layer| layer.is_enabled() && layer.is_solo());
        for layer in self.layers.iter_mut().filter(|layer| layer.is_enabled()) {
            if layer.is_audible(any_solo) {
                layer.render_into(out);
            } else {
                layer.advance(out.len());
            }
        }

        let pan = gain::pan_gain(self.master_pan);
        for sample in out.iter_mut() {
            *sample *= self.master_amplitude.next_value() * pan;
        }
        limiter::soft_limit_buffer(out, limiter::MASTER_THRESHOLD);

        let elapsed = out.len() as f64 / self.config.sample_rate as f64;
        self.time += elapsed;
        self.advance_crossfade(elapsed);
    }

    /// Keep the tail of the output for analysis.
    fn remember(&mut self, block: &[f32]) {
        let size = self.history.len();
        if block.len() >= size {
            self.history
                .copy_from_slice(&block[block.len() - size..]);
        } else {
            self.history.copy_within(block.len().., 0);
            self.history[size - block.len()..].copy_from_slice(block);
        }
    }

    /// The last [`ANALYSIS_SIZE`] output samples, oldest first.
    pub fn output_history(&self) -> &[f32] {
        &self.history
    }

    /// Read-only view of the whole manager for meters and visualizers.
    pub fn snapshot(&self) -> SynthSnapshot {
        SynthSnapshot {
            output: self
                .analyzer
                .analyze(&self.history, self.config.sample_rate),
            ..self.mix_snapshot()
        }
    }

    /// [`snapshot`](Self::snapshot) without the output analysis. Cheap enough
    /// to take while holding a lock the audio thread also wants; run an
    /// [`OutputAnalyzer`] over [`output_history`](Self::output_history) once
    /// the lock is released.
    pub fn mix_snapshot(&self) -> SynthSnapshot {
        SynthSnapshot {
            algorithm: self.primary.name(),
            primary: self.primary,
            mode: self.mode,
            crossfade: self.crossfade.map(|fade| (fade.to, fade.progress as f32)),
            layers: self.layers.iter().map(SynthesisLayer::snapshot).collect(),
            total_voices: self.total_voices(),
            total_cpu: self.total_cpu(),
            output: OutputAnalysis::default(),
        }
    }
}
