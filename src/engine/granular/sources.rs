//! Source buffers grains are cut from.
//!
//! Every source is one second of synthetic audio pitched (where it has a
//! pitch) at [`SOURCE_ROOT`], rendered once at [`SOURCE_RATE`] and shared
//! read-only by every grain.

use std::f32::consts::TAU;
use std::sync::Arc;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::dsp::waveform;

/// Sample rate the sources are rendered at.
pub const SOURCE_RATE: f32 = 44_100.0;

/// Pitch of the tonal sources (A3). A grain plays back at
/// `note frequency / SOURCE_ROOT` times its pitch ratio.
pub const SOURCE_ROOT: f32 = 220.0;

/// Number of sources in [`SourceLibrary::factory`].
pub const FACTORY_SOURCES: usize = 6;

const NOISE_SEED: u64 = 0x6E01_5E00;

#[derive(Debug, Clone)]
pub struct Source {
    name: &'static str,
    samples: Arc<[f32]>,
}

impl Source {
    pub fn new(name: &'static str, samples: Vec<f32>) -> Self {
        Self {
            name,
            samples: samples.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }
}

#[derive(Debug, Clone)]
pub struct SourceLibrary {
    sources: Vec<Source>,
}

impl SourceLibrary {
    pub fn new(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    /// tone, sawtooth, noise, vocal, bell and texture.
    pub fn factory() -> Self {
        let tone = render(|t| {
            let p = SOURCE_ROOT * t;
            waveform::sine(p) + 0.3 * waveform::sine(2.0 * p) + 0.1 * waveform::sine(3.0 * p)
        });

        let saw = render(|t| waveform::sawtooth(SOURCE_ROOT * t));

        let mut rng = SmallRng::seed_from_u64(NOISE_SEED);
        let noise: Vec<f32> = (0..SOURCE_RATE as usize)
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();

        // crude "ah": harmonics weighted by two formant humps
        let vocal = render(|t| {
            (1..=24)
                .map(|k| {
                    let freq = k as f32 * SOURCE_ROOT;
                    let f1 = (-((freq - 730.0) / 120.0).powi(2)).exp();
                    let f2 = (-((freq - 1090.0) / 150.0).powi(2)).exp();
                    (f1 + 0.7 * f2 + 0.2 / k as f32) * (TAU * freq * t).sin()
                })
                .sum::<f32>()
        });

        // inharmonic partials with their own decays, restarted every 250 ms
        let bell = render(|t| {
            let local = t % 0.25;
            [(1.0, 1.0, 6.0), (2.76, 0.6, 9.0), (5.4, 0.4, 14.0), (8.93, 0.25, 20.0)]
                .iter()
                .map(|&(ratio, gain, decay)| {
                    gain * (-decay * local).exp() * (TAU * SOURCE_ROOT * ratio * t).sin()
                })
                .sum()
        });

        // detuned cluster under a slow tremolo
        let texture = render(|t| {
            let cluster: f32 = [0.99, 1.0, 1.013, 1.5, 2.02]
                .iter()
                .map(|ratio| (TAU * SOURCE_ROOT * ratio * t).sin())
                .sum();
            cluster * (0.6 + 0.4 * (TAU * 3.0 * t).sin())
        });

        let mut sources = Vec::with_capacity(FACTORY_SOURCES);
        for (name, mut samples) in [
            ("tone", tone),
            ("sawtooth", saw),
            ("noise", noise),
            ("vocal", vocal),
            ("bell", bell),
            ("texture", texture),
        ] {
            waveform::normalize(&mut samples, 0.9);
            sources.push(Source::new(name, samples));
        }
        Self::new(sources)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
}

/// One second of `shape(t)`, `t` in seconds.
fn render(shape: impl Fn(f32) -> f32) -> Vec<f32> {
    (0..SOURCE_RATE as usize)
        .map(|i| shape(i as f32 / SOURCE_RATE))
        .collect()
}
