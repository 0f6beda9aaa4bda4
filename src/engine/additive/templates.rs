//! Spectral templates: named per-harmonic amplitude and phase tables.

use super::MAX_HARMONICS;

/// Number of templates in [`SpectralTemplate::library`].
pub const TEMPLATE_COUNT: usize = 8;

/// Immutable harmonic recipe. Index 0 is the fundamental.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralTemplate {
    name: &'static str,
    amplitudes: Vec<f32>,
    /// Start phase of each harmonic in cycles.
    phases: Vec<f32>,
}

impl SpectralTemplate {
    /// Build from the first harmonics' amplitudes; the rest are silent. The
    /// loudest harmonic is scaled to 1.0.
    pub fn new(name: &'static str, amplitudes: &[f32], phases: &[f32]) -> Self {
        let mut amps = vec![0.0; MAX_HARMONICS];
        for (slot, &a) in amps.iter_mut().zip(amplitudes) {
            *slot = a.max(0.0);
        }
        let loudest = amps.iter().fold(0.0f32, |acc, a| acc.max(*a));
        if loudest > 0.0 {
            amps.iter_mut().for_each(|a| *a /= loudest);
        }

        let mut start = vec![0.0; MAX_HARMONICS];
        for (slot, &p) in start.iter_mut().zip(phases) {
            *slot = p.rem_euclid(1.0);
        }

        Self {
            name,
            amplitudes: amps,
            phases: start,
        }
    }

    /// Build from a function of the harmonic number (1-based).
    fn from_fn(name: &'static str, f: impl Fn(usize) -> f32) -> Self {
        let amplitudes: Vec<f32> = (1..=MAX_HARMONICS).map(f).collect();
        Self::new(name, &amplitudes, &[])
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    pub fn phases(&self) -> &[f32] {
        &self.phases
    }

    /// sawtooth, square, organ, violin, vocal_a, vocal_o, bell, glass.
    pub fn library() -> Vec<SpectralTemplate> {
        vec![
            Self::from_fn("sawtooth", |n| 1.0 / n as f32),
            Self::from_fn("square", |n| if n % 2 == 1 { 1.0 / n as f32 } else { 0.0 }),
            // 16', 8', 5 1/3', 4', 2 2/3', 2' drawbars
            Self::new("organ", &[1.0, 0.8, 0.6, 0.5, 0.0, 0.3, 0.0, 0.25], &[]),
            Self::from_fn("violin", |n| {
                let body = 1.0 + 0.8 * (-((n as f32 - 4.0) / 2.0).powi(2)).exp();
                body / (n as f32).powf(0.8)
            }),
            Self::from_fn("vocal_a", |n| formants(n, &[(730.0, 110.0), (1090.0, 130.0), (2440.0, 200.0)])),
            Self::from_fn("vocal_o", |n| formants(n, &[(570.0, 90.0), (840.0, 110.0), (2410.0, 200.0)])),
            Self::new(
                "bell",
                &[1.0, 0.0, 0.6, 0.0, 0.45, 0.0, 0.3, 0.0, 0.0, 0.0, 0.2],
                &[0.0, 0.0, 0.25, 0.0, 0.5, 0.0, 0.75],
            ),
            Self::from_fn("glass", |n| match n {
                1 => 0.4,
                4 => 1.0,
                9 => 0.7,
                13 => 0.5,
                17 => 0.3,
                _ => 0.0,
            }),
        ]
    }
}

/// Harmonic `n` of a 150 Hz voice weighted by formant humps, with a little
/// glottal roll-off so every harmonic is present.
fn formants(n: usize, peaks: &[(f32, f32)]) -> f32 {
    let freq = n as f32 * 150.0;
    let hump: f32 = peaks
        .iter()
        .map(|&(centre, width)| (-0.5 * ((freq - centre) / width).powi(2)).exp())
        .sum();
    hump + 0.15 / n as f32
}
