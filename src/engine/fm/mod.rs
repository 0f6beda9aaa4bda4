//! Six-operator phase-modulation synthesis.

/*
FM Synthesis
============

Each voice runs six sine operators. An operator's frequency is

    ratio[i] × globalRatio × note frequency

and its output is

    sin(2π × (phase + modulation)) × level × envelope

where `modulation` is the sum of its inputs' latest outputs, each scaled by
the connection depth and the global `modulationDepth`, plus the operator's
own previous output times its feedback amount. The modulation is added to
the phase, not the frequency (phase modulation), so the pitch stays put
however hard the operators are driven.

Operators render from index 5 down to 0, see `algorithm` for what that
means for routing. Audible (output) operators follow the engine's main
envelope; modulators follow the separate `mod*` envelope, so the timbre can
brighten and fade independently of the loudness.
*/

pub mod algorithm;

pub use algorithm::{Connection, FmAlgorithm, PRESET_COUNT};

use std::f64::consts::TAU;

use super::{Algorithm, EngineType, RenderContext};
use crate::dsp::Adsr;
use crate::params::{ParamSpec, ParamStore};
use crate::snapshot::AlgorithmView;
use crate::voice::{Voice, VoiceBank};

pub const OPERATOR_COUNT: usize = 6;

/// Frequency ratios before any `op*Ratio` change.
pub const DEFAULT_RATIOS: [f32; OPERATOR_COUNT] = [1.0, 2.0, 3.0, 4.0, 5.0, 7.0];

const RATIO_PARAMS: [&str; OPERATOR_COUNT] = [
    "op1Ratio", "op2Ratio", "op3Ratio", "op4Ratio", "op5Ratio", "op6Ratio",
];
const LEVEL_PARAMS: [&str; OPERATOR_COUNT] = [
    "op1Level", "op2Level", "op3Level", "op4Level", "op5Level", "op6Level",
];

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("algorithm", 0.0, (PRESET_COUNT - 1) as f64, 0.0, "index", "Operator routing preset"),
    ParamSpec::new("modulationDepth", 0.0, 10.0, 1.0, "cycles", "Scales every modulation connection"),
    ParamSpec::new("globalRatio", 0.125, 8.0, 1.0, "ratio", "Multiplies every operator ratio"),
    ParamSpec::new("feedback", 0.0, 1.0, 0.0, "amount", "Self-feedback of the top operator"),
    ParamSpec::new("op1Ratio", 0.125, 16.0, 1.0, "ratio", "Operator 1 frequency ratio"),
    ParamSpec::new("op2Ratio", 0.125, 16.0, 2.0, "ratio", "Operator 2 frequency ratio"),
    ParamSpec::new("op3Ratio", 0.125, 16.0, 3.0, "ratio", "Operator 3 frequency ratio"),
    ParamSpec::new("op4Ratio", 0.125, 16.0, 4.0, "ratio", "Operator 4 frequency ratio"),
    ParamSpec::new("op5Ratio", 0.125, 16.0, 5.0, "ratio", "Operator 5 frequency ratio"),
    ParamSpec::new("op6Ratio", 0.125, 16.0, 7.0, "ratio", "Operator 6 frequency ratio"),
    ParamSpec::new("op1Level", 0.0, 1.0, 1.0, "gain", "Operator 1 output level"),
    ParamSpec::new("op2Level", 0.0, 1.0, 1.0, "gain", "Operator 2 output level"),
    ParamSpec::new("op3Level", 0.0, 1.0, 1.0, "gain", "Operator 3 output level"),
    ParamSpec::new("op4Level", 0.0, 1.0, 1.0, "gain", "Operator 4 output level"),
    ParamSpec::new("op5Level", 0.0, 1.0, 1.0, "gain", "Operator 5 output level"),
    ParamSpec::new("op6Level", 0.0, 1.0, 1.0, "gain", "Operator 6 output level"),
    ParamSpec::new("modAttack", 0.0, 10.0, 0.005, "s", "Modulator envelope attack"),
    ParamSpec::new("modDecay", 0.0, 10.0, 0.3, "s", "Modulator envelope decay"),
    ParamSpec::new("modSustain", 0.0, 1.0, 0.5, "level", "Modulator envelope sustain"),
    ParamSpec::new("modRelease", 0.0, 20.0, 0.3, "s", "Modulator envelope release"),
];

/// One sine operator. Owned by its voice and rebuilt on every note-on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operator {
    pub ratio: f32,
    pub level: f32,
    /// Phase in cycles.
    pub phase: f64,
    pub feedback: f32,
    pub envelope: Adsr,
    /// Latest enveloped output.
    pub output: f32,
}

impl Default for Operator {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            level: 1.0,
            phase: 0.0,
            feedback: 0.0,
            envelope: Adsr::default(),
            output: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FmVoice {
    /// Routing preset the note started with.
    pub algorithm: usize,
    pub operators: [Operator; OPERATOR_COUNT],
}

pub struct Fm {
    algorithms: Vec<FmAlgorithm>,
    selected: usize,
    modulation_depth: f32,
    global_ratio: f32,
    feedback: f32,
    ratios: [f32; OPERATOR_COUNT],
    levels: [f32; OPERATOR_COUNT],
    carrier_envelope: Adsr,
    modulator_envelope: Adsr,
}

impl Fm {
    pub fn new() -> Self {
        Self {
            algorithms: FmAlgorithm::presets(),
            selected: 0,
            modulation_depth: 1.0,
            global_ratio: 1.0,
            feedback: 0.0,
            ratios: DEFAULT_RATIOS,
            levels: [1.0; OPERATOR_COUNT],
            carrier_envelope: Adsr::default(),
            modulator_envelope: Adsr::default(),
        }
    }

    pub fn algorithm(&self) -> &FmAlgorithm {
        &self.algorithms[self.selected]
    }

    pub fn algorithms(&self) -> &[FmAlgorithm] {
        &self.algorithms
    }
}

impl Default for Fm {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Fm {
    type Voice = FmVoice;

    const KIND: EngineType = EngineType::Fm;
    const PARAMS: &'static [ParamSpec] = PARAMS;

    fn configure(&mut self, params: &ParamStore) {
        let last = self.algorithms.len().saturating_sub(1);
        self.selected = (params.value("algorithm").round() as usize).min(last);
        self.modulation_depth = params.value("modulationDepth") as f32;
        self.global_ratio = params.value("globalRatio") as f32;
        self.feedback = params.value("feedback") as f32;
        for i in 0..OPERATOR_COUNT {
            self.ratios[i] = params.value(RATIO_PARAMS[i]) as f32;
            self.levels[i] = params.value(LEVEL_PARAMS[i]) as f32;
        }
        self.carrier_envelope = Adsr::new(
            params.value("attack") as f32,
            params.value("decay") as f32,
            params.value("sustain") as f32,
            params.value("release") as f32,
        );
        self.modulator_envelope = Adsr::new(
            params.value("modAttack") as f32,
            params.value("modDecay") as f32,
            params.value("modSustain") as f32,
            params.value("modRelease") as f32,
        );
    }

    fn create_voice(&mut self, _note: u8, _velocity: f32) -> FmVoice {
        let algorithm = &self.algorithms[self.selected];
        let operators = std::array::from_fn(|i| Operator {
            ratio: self.ratios[i],
            level: self.levels[i],
            phase: 0.0,
            feedback: if i == OPERATOR_COUNT - 1 { self.feedback } else { 0.0 },
            envelope: if algorithm.is_output(i) {
                self.carrier_envelope
            } else {
                self.modulator_envelope
            },
            output: 0.0,
        });
        FmVoice {
            algorithm: self.selected,
            operators,
        }
    }

    fn process_voice(&mut self, voice: &mut Voice<FmVoice>, out: &mut [f32], ctx: &RenderContext) {
        let Some(algorithm) = self.algorithms.get(voice.state.algorithm) else {
            return;
        };
        let base = ctx.frequency(voice) as f64 * self.global_ratio as f64;
        let sample_period = 1.0 / ctx.sample_rate as f64;
        let gain = voice.velocity() * voice.amplitude;

        for (i, sample) in out.iter_mut().enumerate() {
            let (since_on, since_off) = voice.envelope_times(ctx.time_at(i));
            let operators = &mut voice.state.operators;

            for k in (0..OPERATOR_COUNT).rev() {
                let mut modulation = operators[k].feedback * operators[k].output;
                for input in algorithm.inputs(k) {
                    modulation += input.depth * operators[input.modulator].output * self.modulation_depth;
                }

                let op = &mut operators[k];
                let env = op.envelope.level(since_on, since_off);
                op.output = ((TAU * (op.phase + modulation as f64)).sin() as f32) * op.level * env;
                op.phase = (op.phase + base * op.ratio as f64 * sample_period).fract();
            }

            let sum: f32 = algorithm
                .outputs()
                .iter()
                .map(|&k| operators[k].output)
                .sum();
            *sample = sum * gain;
        }
    }

    fn describe(&self, voices: &VoiceBank<FmVoice>, now: f64) -> AlgorithmView {
        let mut operator_levels = [0.0; OPERATOR_COUNT];
        if let Some(voice) = voices.iter().filter(|v| v.is_active()).last() {
            let (since_on, since_off) = voice.envelope_times(now);
            for (level, op) in operator_levels.iter_mut().zip(&voice.state.operators) {
                *level = op.level * op.envelope.level(since_on, since_off);
            }
        }
        AlgorithmView::Fm {
            algorithm: self.algorithm().name(),
            operator_levels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::{Engine, SynthEngine};

    fn ctx() -> RenderContext {
        RenderContext {
            sample_rate: 48_000.0,
            start: 0.0,
            envelope: Adsr::new(0.0, 0.0, 1.0, 0.1),
            pitch_ratio: 1.0,
        }
    }

    /// Parameters with every envelope held flat at 1.0.
    fn flat_params() -> ParamStore {
        let mut params = ParamStore::new(PARAMS);
        for name in ["attack", "decay", "modAttack", "modDecay"] {
            params.set(name, 0.0);
        }
        params.set("sustain", 1.0);
        params.set("modSustain", 1.0);
        params
    }

    fn flat_fm() -> Fm {
        let mut fm = Fm::new();
        fm.configure(&flat_params());
        fm
    }

    #[test]
    fn operators_use_default_ratios() {
        let mut fm = flat_fm();
        let voice = fm.create_voice(69, 1.0);
        let ratios: Vec<f32> = voice.operators.iter().map(|op| op.ratio).collect();
        assert_eq!(ratios, DEFAULT_RATIOS.to_vec());
    }

    #[test]
    fn unmodulated_carrier_is_a_sine() {
        let mut fm = Fm::new();
        let mut params = flat_params();
        params.set("algorithm", 1.0); // parallel
        for name in LEVEL_PARAMS.iter().skip(1) {
            params.set(name, 0.0);
        }
        fm.configure(&params);

        let state = fm.create_voice(69, 1.0);
        let mut voice = Voice::new(69, 1.0, 0.0, state);
        let mut out = vec![0.0; 480];
        fm.process_voice(&mut voice, &mut out, &ctx());

        for (i, sample) in out.iter().enumerate() {
            let expected = (TAU * 440.0 * i as f64 / 48_000.0).sin() as f32;
            assert!((sample - expected).abs() < 1e-3, "sample {i}");
        }
    }

    #[test]
    fn modulator_changes_the_carrier() {
        let mut plain = flat_fm();
        let mut modulated = flat_fm();

        let mut params = flat_params();
        params.set("modulationDepth", 0.0);
        plain.configure(&params);

        let mut a = Voice::new(60, 1.0, 0.0, plain.create_voice(60, 1.0));
        let mut b = Voice::new(60, 1.0, 0.0, modulated.create_voice(60, 1.0));
        let mut out_a = vec![0.0; 256];
        let mut out_b = vec![0.0; 256];
        plain.process_voice(&mut a, &mut out_a, &ctx());
        modulated.process_voice(&mut b, &mut out_b, &ctx());

        assert!(out_a.iter().zip(&out_b).any(|(x, y)| (x - y).abs() > 0.01));
    }

    #[test]
    fn higher_index_modulators_feed_the_same_sample() {
        // op 1 modulates op 0; op 1 renders first, so at the very first
        // sample op 0 already sees op 1's output
        let algorithm = FmAlgorithm::new("pair", &[(0, 1, 1.0)], &[0]).unwrap();
        let mut fm = flat_fm();
        fm.algorithms = vec![algorithm];
        fm.selected = 0;

        let mut voice = Voice::new(69, 1.0, 0.0, fm.create_voice(69, 1.0));
        voice.state.operators[1].phase = 0.25;
        let mut out = vec![0.0; 1];
        fm.process_voice(&mut voice, &mut out, &ctx());

        // op 1 outputs sin(π/2) = 1, which shifts op 0 by exactly one cycle
        assert!((voice.state.operators[1].output - 1.0).abs() < 1e-6);
        assert!(out[0].abs() < 1e-5);
    }

    #[test]
    fn held_notes_keep_their_routing_when_the_algorithm_changes() {
        let config = EngineConfig::default();
        let mut steady = Engine::new(Fm::new(), &config);
        let mut switched = Engine::new(Fm::new(), &config);
        let mut parallel = Engine::new(Fm::new(), &config);
        parallel.set_parameter("algorithm", 1.0);

        for engine in [&mut steady, &mut switched, &mut parallel] {
            engine.note_on(57, 1.0);
        }
        switched.set_parameter("algorithm", 1.0);

        let a = steady.process_audio(1024);
        let b = switched.process_audio(1024);
        let c = parallel.process_audio(1024);
        assert_eq!(a, b);
        assert!(a.iter().zip(&c).any(|(x, y)| (x - y).abs() > 1e-3));

        // the next note picks up the new routing
        switched.note_on(64, 1.0);
        let newest = switched.voices().iter().last().unwrap();
        assert_eq!(newest.state.algorithm, 1);
    }

    #[test]
    fn snapshot_reports_algorithm_and_levels() {
        let mut engine = Engine::new(Fm::new(), &EngineConfig::default());
        engine.set_parameter("algorithm", 3.0);
        engine.note_on(60, 1.0);
        engine.process_audio(4410);

        match engine.snapshot().view {
            AlgorithmView::Fm {
                algorithm,
                operator_levels,
            } => {
                assert_eq!(algorithm, "bell");
                assert!(operator_levels.iter().all(|l| *l > 0.0));
            }
            other => panic!("unexpected view {other:?}"),
        }
    }
}
