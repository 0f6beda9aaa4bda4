//! The wavetable bank: named single-cycle tables and their band-limited
//! variants.

/*
Band-Limited Wavetables
=======================

A single-cycle table of a sawtooth contains (in principle) every harmonic.
Played at 55 Hz that is fine, but played at 5 kHz the 5th harmonic already
sits above the Nyquist frequency of a 44.1 kHz stream and folds back down
as inharmonic aliasing.

The fix is to keep several copies of every table, each with the harmonics
above a ceiling removed:

    ceiling    1  2  4  8  16  32  64  128  256  512  1024

Removal happens in the frequency domain: forward FFT of the 2048-sample
table, zero every bin above the ceiling (and its mirror), inverse FFT and
renormalise. At playback the engine picks the smallest ceiling that is at
least `nyquist / frequency`, so low notes keep their full brightness and
high notes lose only what they must.

The same forward FFT gives the table's harmonic spectrum estimate for
visualizers.
*/

use std::f32::consts::TAU;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::waveform::{self, Waveform};

/// Samples per single-cycle table.
pub const TABLE_SIZE: usize = 2048;

/// Harmonic ceilings of the precomputed variants, smallest first.
pub const HARMONIC_CEILINGS: [usize; 11] = [1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];

/// Harmonics reported in a table's spectrum estimate.
pub const SPECTRUM_BINS: usize = 32;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCategory {
    /// Classic analog oscillator shapes.
    Analog,
    /// Phase-modulated and quantised shapes.
    Digital,
    /// Formant approximations of sung vowels.
    Vocal,
}

/// One copy of a table with harmonics above `max_harmonic` removed.
#[derive(Debug, Clone)]
pub struct BandLimited {
    pub max_harmonic: usize,
    pub samples: Vec<f32>,
}

/// A named single-cycle table. Immutable once built.
#[derive(Debug, Clone)]
pub struct Table {
    name: &'static str,
    category: TableCategory,
    samples: Vec<f32>,
    variants: Vec<BandLimited>,
    spectrum: Vec<f32>,
}

impl Table {
    /// Build a table from one period of samples. `samples` must hold
    /// [`TABLE_SIZE`] values.
    pub fn new(
        name: &'static str,
        category: TableCategory,
        mut samples: Vec<f32>,
        planner: &mut FftPlanner<f32>,
    ) -> Self {
        samples.resize(TABLE_SIZE, 0.0);
        waveform::normalize(&mut samples, 1.0);

        let forward = planner.plan_fft_forward(TABLE_SIZE);
        let inverse = planner.plan_fft_inverse(TABLE_SIZE);

        let mut spectrum: Vec<Complex<f32>> =
            samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        forward.process(&mut spectrum);

        let variants = HARMONIC_CEILINGS
            .iter()
            .map(|&max_harmonic| {
                let mut bins = spectrum.clone();
                for (k, bin) in bins.iter_mut().enumerate() {
                    // keep DC-free harmonics 1..=max and their mirror images
                    let harmonic = k.min(TABLE_SIZE - k);
                    if harmonic == 0 || harmonic > max_harmonic {
                        *bin = Complex::new(0.0, 0.0);
                    }
                }
                inverse.process(&mut bins);

                let mut limited: Vec<f32> =
                    bins.iter().map(|c| c.re / TABLE_SIZE as f32).collect();
                waveform::normalize(&mut limited, 1.0);
                BandLimited {
                    max_harmonic,
                    samples: limited,
                }
            })
            .collect();

        let mut magnitudes: Vec<f32> = spectrum[1..=SPECTRUM_BINS]
            .iter()
            .map(|c| c.norm())
            .collect();
        let loudest = magnitudes.iter().fold(0.0f32, |acc, m| acc.max(*m));
        if loudest > 0.0 {
            magnitudes.iter_mut().for_each(|m| *m /= loudest);
        }

        Self {
            name,
            category,
            samples,
            variants,
            spectrum: magnitudes,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn category(&self) -> TableCategory {
        self.category
    }

    /// The unfiltered table.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn variants(&self) -> &[BandLimited] {
        &self.variants
    }

    /// Normalised magnitudes of harmonics 1..=[`SPECTRUM_BINS`].
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }

    /// The variant to play at `frequency`: the smallest ceiling at least
    /// `nyquist / frequency`, or the widest variant when none is that high.
    pub fn variant_for(&self, frequency: f32, nyquist: f32) -> &BandLimited {
        let ratio = nyquist / frequency.max(f32::MIN_POSITIVE);
        let widest = self.variants.len() - 1;
        self.variants
            .iter()
            .find(|variant| variant.max_harmonic as f32 >= ratio)
            .unwrap_or(&self.variants[widest])
    }
}

/// Immutable set of tables shared by every wavetable voice.
#[derive(Debug, Clone)]
pub struct WavetableBank {
    tables: Vec<Arc<Table>>,
}

impl WavetableBank {
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            tables: tables.into_iter().map(Arc::new).collect(),
        }
    }

    /// Analog, digital and vocal tables.
    pub fn factory() -> Self {
        let mut planner = FftPlanner::new();
        let mut tables = Vec::new();

        let analog = [
            ("sine", Waveform::Sine),
            ("triangle", Waveform::Triangle),
            ("sawtooth", Waveform::Sawtooth),
            ("square", Waveform::Square),
            ("pulse25", Waveform::Pulse(0.25)),
        ];
        for (name, shape) in analog {
            let mut samples = vec![0.0; TABLE_SIZE];
            shape.fill_table(&mut samples);
            tables.push(Table::new(name, TableCategory::Analog, samples, &mut planner));
        }

        let digital: [(&'static str, fn(f32) -> f32); 4] = [
            ("fm_bell", |p| (TAU * p + 1.5 * (TAU * 3.0 * p).sin()).sin()),
            ("fm_bright", |p| (TAU * p + 3.0 * (TAU * 2.0 * p).sin()).sin()),
            ("sync", |p| waveform::sawtooth(p * 2.5)),
            ("bitcrush", |p| (waveform::sine(p) * 4.0).round() / 4.0),
        ];
        for (name, shape) in digital {
            tables.push(Table::new(
                name,
                TableCategory::Digital,
                render(shape),
                &mut planner,
            ));
        }

        // formant centres (Hz) and bandwidths for a 110 Hz fundamental
        let vowels: [(&'static str, [(f32, f32); 3]); 3] = [
            ("vowel_a", [(730.0, 90.0), (1090.0, 110.0), (2440.0, 170.0)]),
            ("vowel_e", [(530.0, 80.0), (1840.0, 120.0), (2480.0, 170.0)]),
            ("vowel_o", [(570.0, 80.0), (840.0, 100.0), (2410.0, 170.0)]),
        ];
        for (name, formants) in vowels {
            let samples = render(|p| {
                (1..=40)
                    .map(|k| {
                        let freq = k as f32 * 110.0;
                        let gain: f32 = formants
                            .iter()
                            .map(|&(centre, width)| {
                                let x = (freq - centre) / width;
                                (-0.5 * x * x).exp()
                            })
                            .sum::<f32>()
                            + 0.3 / k as f32;
                        gain * (TAU * k as f32 * p).sin()
                    })
                    .sum()
            });
            tables.push(Table::new(name, TableCategory::Vocal, samples, &mut planner));
        }

        Self::new(tables)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Table>> {
        self.tables.get(index)
    }

    pub fn tables(&self) -> &[Arc<Table>] {
        &self.tables
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|table| table.name() == name)
    }
}

fn render(shape: impl Fn(f32) -> f32) -> Vec<f32> {
    (0..TABLE_SIZE)
        .map(|i| shape(i as f32 / TABLE_SIZE as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> WavetableBank {
        WavetableBank::factory()
    }

    #[test]
    fn factory_bank_covers_every_category() {
        let bank = bank();
        for category in [TableCategory::Analog, TableCategory::Digital, TableCategory::Vocal] {
            assert!(bank.tables().iter().any(|t| t.category() == category));
        }
        for table in bank.tables() {
            assert_eq!(table.samples().len(), TABLE_SIZE);
            assert_eq!(table.variants().len(), HARMONIC_CEILINGS.len());
        }
    }

    #[test]
    fn lowest_ceiling_of_a_saw_is_a_sine() {
        let bank = bank();
        let saw = &bank.tables()[bank.index_of("sawtooth").unwrap()];
        let fundamental = &saw.variants()[0];
        assert_eq!(fundamental.max_harmonic, 1);

        // a pure sine crosses zero exactly twice per period
        let crossings = fundamental
            .samples
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        assert!(crossings <= 3, "{crossings}");
    }

    #[test]
    fn picks_smallest_sufficient_ceiling() {
        let bank = bank();
        let table = &bank.tables()[0];
        let nyquist = 22_050.0;

        // 22050 / 440 ≈ 50.1
        assert_eq!(table.variant_for(440.0, nyquist).max_harmonic, 64);
        // above Nyquist only the fundamental survives
        assert_eq!(table.variant_for(30_000.0, nyquist).max_harmonic, 1);
        // very low notes fall back to the widest variant
        assert_eq!(table.variant_for(8.0, nyquist).max_harmonic, 1024);
    }

    #[test]
    fn spectrum_of_square_has_odd_harmonics() {
        let bank = bank();
        let square = &bank.tables()[bank.index_of("square").unwrap()];
        let spectrum = square.spectrum();
        assert_eq!(spectrum.len(), SPECTRUM_BINS);
        assert!((spectrum[0] - 1.0).abs() < 1e-6);
        assert!(spectrum[1] < 0.05, "2nd harmonic {}", spectrum[1]);
        assert!(spectrum[2] > 0.25, "3rd harmonic {}", spectrum[2]);
    }
}
