//! Level and spectrum summary of the master output, for meters.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::dsp::gain;

/// FFT length; also how much recent output the manager keeps for analysis.
pub const ANALYSIS_SIZE: usize = 2048;

/// Upper edge of the bass band in Hz.
pub const BASS_LIMIT: f32 = 250.0;
/// Upper edge of the mid band in Hz.
pub const MID_LIMIT: f32 = 4_000.0;

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputAnalysis {
    pub rms: f32,
    pub peak: f32,
    /// Share of spectral energy below [`BASS_LIMIT`].
    pub bass: f32,
    /// Share of spectral energy between the bass and [`MID_LIMIT`].
    pub mid: f32,
    /// Share of spectral energy above [`MID_LIMIT`].
    pub high: f32,
    /// Centre frequency of the loudest bin in Hz, 0.0 for silence.
    pub dominant_frequency: f32,
}

pub struct OutputAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    /// Hann window coefficients
    window: Vec<f32>,
}

impl OutputAnalyzer {
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        // Hann window - reduces spectral leakage
        let denom = (size - 1) as f32;
        let window = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos()))
            .collect();

        Self { fft, window }
    }

    pub fn size(&self) -> usize {
        self.window.len()
    }

    /// Analyse the most recent `size()` samples of `samples`, zero padding
    /// shorter input.
    pub fn analyze(&self, samples: &[f32], sample_rate: f32) -> OutputAnalysis {
        let size = self.size();
        let recent = &samples[samples.len().saturating_sub(size)..];

        let mut analysis = OutputAnalysis {
            rms: gain::rms(recent),
            peak: gain::peak(recent),
            ..OutputAnalysis::default()
        };
        if analysis.peak == 0.0 || sample_rate <= 0.0 {
            return analysis;
        }

        let mut buffer: Vec<Complex<f32>> = self
            .window
            .iter()
            .zip(recent.iter().chain(std::iter::repeat(&0.0_f32)))
            .map(|(w, s)| Complex::new(s * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        let bin_width = sample_rate / size as f32;
        let (mut bass, mut mid, mut high) = (0.0f32, 0.0f32, 0.0f32);
        let mut loudest = (0usize, 0.0f32);

        // skip DC
        for (bin, value) in buffer.iter().enumerate().take(size / 2).skip(1) {
            let energy = value.norm_sqr();
            let freq = bin as f32 * bin_width;
            if freq < BASS_LIMIT {
                bass += energy;
            } else if freq < MID_LIMIT {
                mid += energy;
            } else {
                high += energy;
            }
            if energy > loudest.1 {
                loudest = (bin, energy);
            }
        }

        let total = bass + mid + high;
        if total > 0.0 {
            analysis.bass = bass / total;
            analysis.mid = mid / total;
            analysis.high = high / total;
            analysis.dominant_frequency = loudest.0 as f32 * bin_width;
        }
        analysis
    }
}

impl Default for OutputAnalyzer {
    fn default() -> Self {
        Self::new(ANALYSIS_SIZE)
    }
}
