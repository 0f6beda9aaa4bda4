//! Additive synthesis: up to 128 sine harmonics per voice, with spectral
//! templates the current spectrum can morph towards.

/*
Additive Synthesis
==================

Any periodic sound is a sum of sine waves at whole multiples of its
fundamental. Here each voice owns a bank of harmonic oscillators and their
amplitudes come from the engine's *current spectrum*:

    amplitude[i] = current[i] × fundamentalAmplitude × harmonicDecay^i

Selecting a template only changes the *target* spectrum. With morphing on,
the current spectrum eases towards the target once per block:

    current += (target - current) × morphingSpeed

A speed of 1.0 jumps straight there; smaller speeds approach it
exponentially and never overshoot.

Harmonic i (1-based number n) sounds at

    note frequency × n × harmonicRatio × 2^(detune / 1200)

where `detune` is a per-voice random offset (cents) growing with the
harmonic number when `harmonicSpread` is above zero. Harmonics at or above
Nyquist are skipped. A final tilt gain brightens (tilt > 0) or darkens the
voice before velocity and amplitude are applied.
*/

pub mod templates;

pub use templates::{SpectralTemplate, TEMPLATE_COUNT};

use std::f64::consts::TAU;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::{Algorithm, EngineType, RenderContext};
use crate::dsp::Adsr;
use crate::params::{ParamSpec, ParamStore};
use crate::snapshot::AlgorithmView;
use crate::voice::{Voice, VoiceBank};

pub const MAX_HARMONICS: usize = 128;

/// Detune (cents) of harmonic n at full spread is `n × MAX_DETUNE_CENTS`.
const MAX_DETUNE_CENTS: f32 = 1.0;

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("template", 0.0, (TEMPLATE_COUNT - 1) as f64, 0.0, "index", "Target spectral template"),
    ParamSpec::new("numHarmonics", 1.0, MAX_HARMONICS as f64, 32.0, "count", "Harmonics rendered per voice"),
    ParamSpec::new("fundamentalAmplitude", 0.0, 1.0, 0.25, "gain", "Level of a full-scale harmonic"),
    ParamSpec::new("harmonicDecay", 0.5, 1.0, 1.0, "ratio", "Per-harmonic amplitude falloff"),
    ParamSpec::new("harmonicSpread", 0.0, 1.0, 0.0, "amount", "Random detune growing with harmonic number"),
    ParamSpec::new("harmonicRatio", 0.5, 4.0, 1.0, "ratio", "Stretches every harmonic frequency"),
    ParamSpec::new("morphing", 0.0, 1.0, 1.0, "switch", "Ease towards the selected template"),
    ParamSpec::new("morphingSpeed", 0.001, 1.0, 0.05, "per block", "Fraction of the remaining distance moved per block"),
    ParamSpec::new("spectralTilt", -1.0, 1.0, 0.0, "tilt", "Brighten (positive) or darken (negative)"),
];

/// One sine partial of an additive voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicOscillator {
    pub amplitude: f32,
    /// Phase in cycles.
    pub phase: f64,
    /// Harmonic number (1-based).
    pub multiplier: f32,
    pub detune_cents: f32,
    pub enabled: bool,
    pub envelope: Adsr,
}

#[derive(Debug, Clone)]
pub struct AdditiveVoice {
    pub harmonics: Vec<HarmonicOscillator>,
    /// Uniform -1..1 draw per harmonic, fixed at note-on.
    detune_offsets: Vec<f32>,
}

pub struct Additive {
    templates: Vec<SpectralTemplate>,
    selected: usize,
    current: Vec<f32>,
    target: Vec<f32>,
    harmonics: usize,
    fundamental_amplitude: f32,
    decay: f32,
    spread: f32,
    ratio: f32,
    morphing: bool,
    morph_speed: f32,
    tilt: f32,
    envelope: Adsr,
    rng: SmallRng,
}

impl Additive {
    pub fn new(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        let templates = SpectralTemplate::library();
        let target = templates[0].amplitudes().to_vec();
        Self {
            current: target.clone(),
            target,
            templates,
            selected: 0,
            harmonics: 32,
            fundamental_amplitude: 0.25,
            decay: 1.0,
            spread: 0.0,
            ratio: 1.0,
            morphing: true,
            morph_speed: 0.05,
            tilt: 0.0,
            envelope: Adsr::default(),
            rng,
        }
    }

    pub fn template(&self) -> &SpectralTemplate {
        &self.templates[self.selected]
    }

    pub fn current_spectrum(&self) -> &[f32] {
        &self.current
    }

    pub fn target_spectrum(&self) -> &[f32] {
        &self.target
    }

    /// Move the current spectrum towards the target by one step.
    pub fn morph_step(&mut self) {
        if self.morph_speed >= 1.0 {
            self.current.copy_from_slice(&self.target);
            return;
        }
        for (current, target) in self.current.iter_mut().zip(&self.target) {
            *current += (*target - *current) * self.morph_speed;
        }
    }

    /// Gain applied after summing: brighter above zero, darker below.
    pub fn tilt_gain(&self) -> f32 {
        if self.tilt > 0.0 {
            1.0 + self.tilt * 0.5
        } else {
            1.0 + self.tilt * 0.3
        }
    }

    fn select_template(&mut self, index: usize) {
        self.selected = index.min(self.templates.len().saturating_sub(1));
        self.target.copy_from_slice(self.templates[self.selected].amplitudes());
        if !self.morphing {
            self.current.copy_from_slice(&self.target);
        }
    }

    /// Recompute a voice's harmonic amplitudes, detune and enable flags from
    /// the current spectrum, with the fundamental sounding at `frequency`.
    fn update_voice(&self, voice: &mut Voice<AdditiveVoice>, frequency: f32, nyquist: f32) {
        let base = frequency * self.ratio;
        let mut falloff = 1.0;

        let state = &mut voice.state;
        for (i, harmonic) in state.harmonics.iter_mut().enumerate() {
            harmonic.amplitude = self.current[i] * self.fundamental_amplitude * falloff;
            falloff *= self.decay;

            harmonic.detune_cents = if self.spread > 0.0 {
                self.spread * MAX_DETUNE_CENTS * harmonic.multiplier * state.detune_offsets[i]
            } else {
                0.0
            };
            let freq = base * harmonic.multiplier * 2f32.powf(harmonic.detune_cents / 1200.0);
            harmonic.enabled = i < self.harmonics && freq < nyquist && harmonic.amplitude > 0.0;
        }
    }
}

impl Algorithm for Additive {
    type Voice = AdditiveVoice;

    const KIND: EngineType = EngineType::Additive;
    const PARAMS: &'static [ParamSpec] = PARAMS;

    fn configure(&mut self, params: &ParamStore) {
        self.morphing = params.value("morphing") >= 0.5;
        self.morph_speed = params.value("morphingSpeed") as f32;
        self.harmonics = (params.value("numHarmonics").round() as usize).clamp(1, MAX_HARMONICS);
        self.fundamental_amplitude = params.value("fundamentalAmplitude") as f32;
        self.decay = params.value("harmonicDecay") as f32;
        self.spread = params.value("harmonicSpread") as f32;
        self.ratio = params.value("harmonicRatio") as f32;
        self.tilt = params.value("spectralTilt") as f32;
        self.envelope = Adsr::new(
            params.value("attack") as f32,
            params.value("decay") as f32,
            params.value("sustain") as f32,
            params.value("release") as f32,
        );
        self.select_template(params.value("template").round() as usize);
    }

    fn create_voice(&mut self, _note: u8, _velocity: f32) -> AdditiveVoice {
        let phases = self.templates[self.selected].phases();
        let harmonics = (0..MAX_HARMONICS)
            .map(|i| HarmonicOscillator {
                amplitude: 0.0,
                phase: phases[i] as f64,
                multiplier: (i + 1) as f32,
                detune_cents: 0.0,
                enabled: false,
                // upper harmonics die away sooner
                envelope: self.envelope.with_decay_scale(1.0 / (1.0 + 0.02 * i as f32)),
            })
            .collect();
        let detune_offsets = (0..MAX_HARMONICS)
            .map(|_| self.rng.random_range(-1.0..1.0))
            .collect();

        AdditiveVoice {
            harmonics,
            detune_offsets,
        }
    }

    fn on_note_on(&mut self, voice: &mut Voice<AdditiveVoice>, _now: f64) {
        // nyquist and bend are refined on the first rendered block
        let frequency = voice.frequency();
        self.update_voice(voice, frequency, f32::MAX);
    }

    fn begin_block(&mut self, _ctx: &RenderContext) {
        if self.morphing {
            self.morph_step();
        }
    }

    fn process_voice(&mut self, voice: &mut Voice<AdditiveVoice>, out: &mut [f32], ctx: &RenderContext) {
        let frequency = ctx.frequency(voice);
        self.update_voice(voice, frequency, ctx.nyquist());

        let base = frequency as f64 * self.ratio as f64;
        let sample_period = 1.0 / ctx.sample_rate as f64;
        let start = voice.start_time();
        let released_at = voice.released_at();

        for harmonic in voice.state.harmonics.iter_mut().filter(|h| h.enabled) {
            let increment = base
                * harmonic.multiplier as f64
                * 2f64.powf(harmonic.detune_cents as f64 / 1200.0)
                * sample_period;

            for (i, sample) in out.iter_mut().enumerate() {
                let t = ctx.time_at(i);
                let since_on = (t - start) as f32;
                let since_off = released_at.map(|off| (t - off) as f32);
                let env = harmonic.envelope.level(since_on, since_off);

                *sample += (TAU * harmonic.phase).sin() as f32 * harmonic.amplitude * env;
                harmonic.phase = (harmonic.phase + increment).fract();
            }
        }

        let gain = self.tilt_gain() * voice.velocity() * voice.amplitude;
        for sample in out.iter_mut() {
            *sample *= gain;
        }
    }

    fn describe(&self, _voices: &VoiceBank<AdditiveVoice>, _now: f64) -> AlgorithmView {
        AlgorithmView::Additive {
            template: self.template().name(),
            spectrum: self.current[..self.harmonics].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::{Engine, SynthEngine};

    fn additive_with(template: f64, speed: f64) -> Additive {
        let mut additive = Additive::new(3);
        let mut params = ParamStore::new(PARAMS);
        params.set("morphingSpeed", speed);
        params.set("template", template);
        additive.configure(&params);
        additive
    }

    #[test]
    fn full_speed_morph_lands_in_one_step() {
        let mut additive = additive_with(0.0, 1.0);
        let mut params = ParamStore::new(PARAMS);
        params.set("morphingSpeed", 1.0);
        params.set("template", 6.0);
        additive.configure(&params);
        assert_ne!(additive.current_spectrum(), additive.target_spectrum());

        additive.morph_step();
        assert_eq!(additive.current_spectrum(), additive.target_spectrum());
    }

    #[test]
    fn slow_morph_is_monotonic_without_overshoot() {
        let mut additive = additive_with(0.0, 0.1);
        let mut params = ParamStore::new(PARAMS);
        params.set("morphingSpeed", 0.1);
        params.set("template", 7.0);
        additive.configure(&params);

        let target = additive.target_spectrum().to_vec();
        let mut previous = additive.current_spectrum().to_vec();
        for _ in 0..200 {
            additive.morph_step();
            for (i, (&now, &before)) in additive.current_spectrum().iter().zip(&previous).enumerate() {
                let (lo, hi) = if before <= target[i] {
                    (before, target[i])
                } else {
                    (target[i], before)
                };
                assert!(now >= lo && now <= hi, "harmonic {i} left [{lo}, {hi}]: {now}");
            }
            previous = additive.current_spectrum().to_vec();
        }
    }

    #[test]
    fn disabled_morphing_switches_immediately() {
        let mut additive = Additive::new(3);
        let mut params = ParamStore::new(PARAMS);
        params.set("morphing", 0.0);
        params.set("template", 2.0);
        additive.configure(&params);
        assert_eq!(additive.current_spectrum(), additive.target_spectrum());
    }

    #[test]
    fn tilt_gain_is_asymmetric() {
        let mut additive = Additive::new(0);
        additive.tilt = 1.0;
        assert!((additive.tilt_gain() - 1.5).abs() < 1e-6);
        additive.tilt = -1.0;
        assert!((additive.tilt_gain() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn harmonics_above_nyquist_are_skipped() {
        let mut additive = additive_with(0.0, 1.0);
        let state = additive.create_voice(100, 1.0);
        let mut voice = Voice::new(100, 1.0, 0.0, state);
        // note 100 ≈ 2637 Hz: only 8 harmonics fit under 22.05 kHz
        let frequency = voice.frequency();
        additive.update_voice(&mut voice, frequency, 22_050.0);
        let enabled = voice.state.harmonics.iter().filter(|h| h.enabled).count();
        assert_eq!(enabled, 8);
    }

    #[test]
    fn spread_detunes_upper_harmonics_more() {
        let mut engine = Engine::new(Additive::new(11), &EngineConfig::default());
        engine.set_parameter("harmonicSpread", 1.0);
        engine.note_on(48, 1.0);
        engine.process_audio(64);

        let voice = engine.voices().iter().next().unwrap();
        let bound = |i: usize| MAX_DETUNE_CENTS * (i + 1) as f32;
        assert!(voice
            .state
            .harmonics
            .iter()
            .enumerate()
            .all(|(i, h)| h.detune_cents.abs() <= bound(i)));
        assert!(voice.state.harmonics.iter().any(|h| h.detune_cents != 0.0));
    }

    #[test]
    fn snapshot_reports_template_and_spectrum() {
        let mut engine = Engine::new(Additive::new(5), &EngineConfig::default());
        engine.set_parameter("template", 2.0);
        engine.set_parameter("numHarmonics", 16.0);

        match engine.snapshot().view {
            AlgorithmView::Additive { template, spectrum } => {
                assert_eq!(template, "organ");
                assert_eq!(spectrum.len(), 16);
            }
            other => panic!("unexpected view {other:?}"),
        }
    }
}
