//! Granular synthesis: clouds of short windowed snippets cut from a source
//! buffer.

/*
Granular Synthesis
==================

Each voice runs a scheduler that starts a new grain every

    sampleRate / grainDensity

samples. The countdown carries across blocks, so the grain rhythm does not
depend on how the host slices time into blocks. Every new grain takes the
engine's size, position, pitch and amplitude settings, each nudged by an
independent uniform random offset scaled by `grainSpread`. The random source
is a seeded `SmallRng` owned by the engine, so a given seed always produces
the same cloud.

While alive, a grain contributes

    source(position + age × rate) × window(age / length) × amplitude

and is dropped once its age passes its length. The summed cloud is then
shaped by the voice envelope, velocity and amplitude like any other engine.
*/

pub mod sources;

pub use sources::{Source, SourceLibrary, FACTORY_SOURCES, SOURCE_RATE, SOURCE_ROOT};

use std::sync::Arc;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::{Algorithm, EngineType, RenderContext};
use crate::dsp::interpolate::read_linear;
use crate::dsp::WindowShape;
use crate::params::{ParamSpec, ParamStore};
use crate::snapshot::{AlgorithmView, GrainView};
use crate::voice::{Voice, VoiceBank};

/// Grains alive at once in a single voice; spawns past this are skipped.
pub const MAX_GRAINS_PER_VOICE: usize = 64;

/// Shortest grain in seconds.
pub const MIN_GRAIN_SECONDS: f32 = 0.001;

pub const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("grainSize", 0.001, 1.0, 0.05, "s", "Grain length"),
    ParamSpec::new("grainDensity", 1.0, 200.0, 20.0, "grains/s", "New grains per second per voice"),
    ParamSpec::new("grainPosition", 0.0, 1.0, 0.2, "fraction", "Read position in the source"),
    ParamSpec::new("pitchRatio", 0.25, 4.0, 1.0, "ratio", "Grain playback rate on top of the note pitch"),
    ParamSpec::new("grainAmplitude", 0.0, 1.0, 0.6, "gain", "Grain level"),
    ParamSpec::new("grainSpread", 0.0, 1.0, 0.2, "amount", "Random variation of new grains"),
    ParamSpec::new("windowShape", 0.0, 5.0, 0.0, "index", "Grain window used by new notes"),
    ParamSpec::new("source", 0.0, (FACTORY_SOURCES - 1) as f64, 0.0, "index", "Source buffer used by new notes"),
];

/// One live grain.
#[derive(Debug, Clone)]
pub struct Grain {
    pub id: u64,
    /// Logical time the grain was scheduled for.
    pub start_time: f64,
    /// Length in seconds, always > 0.
    pub duration: f32,
    /// Start position in source samples.
    pub position: f32,
    /// Source samples advanced per output sample.
    pub rate: f32,
    pub pitch: f32,
    pub pan: f32,
    pub amplitude: f32,
    pub window: WindowShape,
    source: Arc<[f32]>,
    /// Output samples rendered so far.
    age: usize,
    /// Length in output samples.
    length: usize,
    /// Samples to wait inside the first block before sounding.
    delay: usize,
}

impl Grain {
    pub fn progress(&self) -> f32 {
        self.age as f32 / self.length as f32
    }

    pub fn is_finished(&self) -> bool {
        self.age >= self.length
    }

    /// Add this grain's windowed output into `out`.
    fn render(&mut self, out: &mut [f32]) {
        let start = self.delay.min(out.len());
        self.delay -= start;

        for sample in &mut out[start..] {
            if self.age >= self.length {
                break;
            }
            let progress = self.age as f32 / self.length as f32;
            let read = self.position + self.age as f32 * self.rate;
            *sample += read_linear(&self.source, read) * self.window.value(progress) * self.amplitude;
            self.age += 1;
        }
    }
}

/// Per-voice grain cloud.
#[derive(Debug, Clone)]
pub struct GranularVoice {
    pub grains: Vec<Grain>,
    pub window: WindowShape,
    pub source: usize,
    /// Samples until the next grain is due.
    until_next: f64,
}

#[derive(Debug, Clone, Copy)]
struct GrainSettings {
    size: f32,
    density: f32,
    position: f32,
    pitch: f32,
    amplitude: f32,
    spread: f32,
    window: WindowShape,
    source: usize,
}

pub struct Granular {
    library: SourceLibrary,
    settings: GrainSettings,
    rng: SmallRng,
    next_id: u64,
    spawned: u64,
}

impl Granular {
    pub fn new(seed: u64) -> Self {
        Self::with_library(SourceLibrary::factory(), SmallRng::seed_from_u64(seed))
    }

    /// Build with a specific source library and random source.
    pub fn with_library(library: SourceLibrary, rng: SmallRng) -> Self {
        Self {
            library,
            settings: GrainSettings {
                size: 0.05,
                density: 20.0,
                position: 0.2,
                pitch: 1.0,
                amplitude: 0.6,
                spread: 0.2,
                window: WindowShape::Gaussian,
                source: 0,
            },
            rng,
            next_id: 0,
            spawned: 0,
        }
    }

    pub fn library(&self) -> &SourceLibrary {
        &self.library
    }

    /// Grains created since construction.
    pub fn grains_spawned(&self) -> u64 {
        self.spawned
    }

    fn jitter(&mut self) -> f32 {
        if self.settings.spread > 0.0 {
            self.rng.random_range(-1.0..1.0) * self.settings.spread
        } else {
            0.0
        }
    }

    fn spawn(&mut self, voice: &Voice<GranularVoice>, delay: usize, ctx: &RenderContext) -> Option<Grain> {
        let source = self.library.get(voice.state.source)?.samples().clone();
        let s = self.settings;

        let duration = (s.size * (1.0 + self.jitter())).max(MIN_GRAIN_SECONDS);
        let position = (s.position + 0.5 * self.jitter()).rem_euclid(1.0) * source.len() as f32;
        // up to a semitone either way at full spread
        let pitch = s.pitch * 2f32.powf(self.jitter() / 12.0);
        let amplitude = (s.amplitude * (1.0 + 0.5 * self.jitter())).max(0.0);
        let pan = self.jitter();

        let rate = pitch * (ctx.frequency(voice) / SOURCE_ROOT) * (SOURCE_RATE / ctx.sample_rate);
        let length = ((duration * ctx.sample_rate).round() as usize).max(1);

        self.next_id += 1;
        self.spawned += 1;
        Some(Grain {
            id: self.next_id,
            start_time: ctx.time_at(delay),
            duration,
            position,
            rate,
            pitch,
            pan,
            amplitude,
            window: voice.state.window,
            source,
            age: 0,
            length,
            delay,
        })
    }
}

impl Algorithm for Granular {
    type Voice = GranularVoice;

    const KIND: EngineType = EngineType::Granular;
    const PARAMS: &'static [ParamSpec] = PARAMS;

    fn configure(&mut self, params: &ParamStore) {
        let last = self.library.len().saturating_sub(1);
        self.settings = GrainSettings {
            size: params.value("grainSize") as f32,
            density: params.value("grainDensity") as f32,
            position: params.value("grainPosition") as f32,
            pitch: params.value("pitchRatio") as f32,
            amplitude: params.value("grainAmplitude") as f32,
            spread: params.value("grainSpread") as f32,
            window: WindowShape::from_index(params.value("windowShape")),
            source: (params.value("source").round() as usize).min(last),
        };
    }

    fn create_voice(&mut self, _note: u8, _velocity: f32) -> GranularVoice {
        GranularVoice {
            grains: Vec::with_capacity(MAX_GRAINS_PER_VOICE),
            window: self.settings.window,
            source: self.settings.source,
            until_next: 0.0,
        }
    }

    fn process_voice(&mut self, voice: &mut Voice<GranularVoice>, out: &mut [f32], ctx: &RenderContext) {
        let n = out.len();
        let interval = ctx.sample_rate as f64 / self.settings.density.max(f32::MIN_POSITIVE) as f64;

        // grains stop spawning once the key is up; the envelope fades the rest
        if voice.is_held() {
            while voice.state.until_next < n as f64 {
                let delay = voice.state.until_next.max(0.0).ceil() as usize;
                if voice.state.grains.len() < MAX_GRAINS_PER_VOICE {
                    if let Some(grain) = self.spawn(voice, delay.min(n - 1), ctx) {
                        voice.state.grains.push(grain);
                    }
                }
                voice.state.until_next += interval;
            }
            voice.state.until_next -= n as f64;
        }

        for grain in &mut voice.state.grains {
            grain.render(out);
        }
        voice.state.grains.retain(|grain| !grain.is_finished());

        let gain = voice.velocity() * voice.amplitude;
        for (i, sample) in out.iter_mut().enumerate() {
            *sample *= voice.envelope_level(&ctx.envelope, ctx.time_at(i)) * gain;
        }
    }

    fn describe(&self, voices: &VoiceBank<GranularVoice>, _now: f64) -> AlgorithmView {
        let grains = voices
            .iter()
            .flat_map(|voice| voice.state.grains.iter())
            .map(|grain| GrainView {
                id: grain.id,
                progress: grain.progress(),
                pan: grain.pan,
                amplitude: grain.amplitude,
                pitch: grain.pitch,
            })
            .collect();

        AlgorithmView::Granular {
            source: self
                .library
                .get(self.settings.source)
                .map_or("", Source::name),
            window: self.settings.window,
            grains,
        }
    }
}
