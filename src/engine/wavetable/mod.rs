//! Wavetable synthesis: single-cycle tables read at the note's pitch, with
//! optional morphing into the next table and an LFO sweeping the read
//! position.

pub mod bank;

pub use bank::{TableCategory, WavetableBank, TABLE_SIZE};

use super::{Algorithm, EngineType, RenderContext};
use crate::dsp::interpolate::{lerp, read_cubic};
use crate::dsp::lfo::Lfo;
use crate::params::{ParamSpec, ParamStore};
use crate::snapshot::AlgorithmView;
use crate::voice::{Voice, VoiceBank};

/// Number of tables in [`WavetableBank::factory`].
pub const FACTORY_TABLES: usize = 12;

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("wavetable", 0.0, (FACTORY_TABLES - 1) as f64, 2.0, "index", "Table used by new notes"),
    ParamSpec::new("morph", 0.0, 1.0, 0.0, "mix", "Blend towards the next table in the bank"),
    ParamSpec::new("morphEnabled", 0.0, 1.0, 1.0, "switch", "Allow morphing at all"),
    ParamSpec::new("lfoRate", 0.0, 20.0, 1.0, "Hz", "Read position LFO rate"),
    ParamSpec::new("lfoDepth", 0.0, 1.0, 0.0, "cycles", "Read position LFO depth"),
];

/// Per-voice wavetable state.
#[derive(Debug, Clone, Copy)]
pub struct WavetableVoice {
    /// Bank index the note started with.
    pub table: usize,
}

pub struct Wavetable {
    bank: WavetableBank,
    table: usize,
    morph: f32,
    morph_enabled: bool,
    lfo: Lfo,
}

impl Wavetable {
    pub fn new() -> Self {
        Self::with_bank(WavetableBank::factory())
    }

    pub fn with_bank(bank: WavetableBank) -> Self {
        Self {
            bank,
            table: 0,
            morph: 0.0,
            morph_enabled: true,
            lfo: Lfo::new(1.0, 0.0),
        }
    }

    pub fn bank(&self) -> &WavetableBank {
        &self.bank
    }

    pub fn current_table(&self) -> usize {
        self.table
    }

    /// One interpolated (and possibly morphed) table sample.
    pub fn read(&self, table: usize, frequency: f32, nyquist: f32, position: f32, morph: f32) -> f32 {
        let len = self.bank.len();
        let Some(first) = self.bank.get(table % len.max(1)) else {
            return 0.0;
        };
        let sample = read_cubic(&first.variant_for(frequency, nyquist).samples, position);

        if !self.morph_enabled || morph <= 0.0 {
            return sample;
        }
        match self.bank.get((table + 1) % len) {
            Some(second) => {
                let other = read_cubic(&second.variant_for(frequency, nyquist).samples, position);
                lerp(sample, other, morph.min(1.0))
            }
            None => sample,
        }
    }
}

impl Default for Wavetable {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Wavetable {
    type Voice = WavetableVoice;

    const KIND: EngineType = EngineType::Wavetable;
    const PARAMS: &'static [ParamSpec] = PARAMS;

    fn configure(&mut self, params: &ParamStore) {
        let last = self.bank.len().saturating_sub(1);
        self.table = (params.value("wavetable").round() as usize).min(last);
        self.morph = params.value("morph") as f32;
        self.morph_enabled = params.value("morphEnabled") >= 0.5;
        self.lfo = Lfo::new(
            params.value("lfoRate") as f32,
            params.value("lfoDepth") as f32,
        );
    }

    fn create_voice(&mut self, _note: u8, _velocity: f32) -> WavetableVoice {
        WavetableVoice { table: self.table }
    }

    fn process_voice(&mut self, voice: &mut Voice<WavetableVoice>, out: &mut [f32], ctx: &RenderContext) {
        let frequency = ctx.frequency(voice);
        let increment = frequency as f64 / ctx.sample_rate as f64;
        let morph = voice
            .override_value("morph")
            .map_or(self.morph, |m| m as f32);
        let gain = voice.velocity() * voice.amplitude;
        let table = voice.state.table;

        for (i, sample) in out.iter_mut().enumerate() {
            let t = ctx.time_at(i);
            let offset = self.lfo.value_at(t) as f64;
            let position = ((voice.phase + offset).rem_euclid(1.0) * TABLE_SIZE as f64) as f32;

            let value = self.read(table, frequency, ctx.nyquist(), position, morph);
            *sample = value * voice.envelope_level(&ctx.envelope, t) * gain;

            voice.phase += increment;
            if voice.phase >= 1.0 {
                voice.phase -= voice.phase.floor();
            }
        }
    }

    fn describe(&self, _voices: &VoiceBank<WavetableVoice>, _now: f64) -> AlgorithmView {
        match self.bank.get(self.table) {
            Some(table) => AlgorithmView::Wavetable {
                table: table.name(),
                category: table.category(),
                spectrum: table.spectrum().to_vec(),
            },
            None => AlgorithmView::Wavetable {
                table: "",
                category: TableCategory::Analog,
                spectrum: Vec::new(),
            },
        }
    }
}
