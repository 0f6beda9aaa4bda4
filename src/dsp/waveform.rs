//! Naive waveform primitives evaluated from a phase in cycles.
//!
//! These are the raw shapes used to build wavetables and granular source
//! buffers. They are NOT band-limited; the wavetable engine removes the
//! aliasing harmonics afterwards with an FFT (see `engine::wavetable::bank`).
//!
//! Phase is measured in cycles: 0.0 is the start of the period and 1.0 wraps
//! back to the start.

use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
    /// Rectangular wave with the given duty cycle (0.0 - 1.0).
    Pulse(f32),
}

impl Waveform {
    /// Evaluate one sample at `phase` cycles.
    pub fn evaluate(&self, phase: f32) -> f32 {
        let p = phase.rem_euclid(1.0);
        match *self {
            Waveform::Sine => sine(p),
            Waveform::Triangle => triangle(p),
            Waveform::Sawtooth => sawtooth(p),
            Waveform::Square => pulse(p, 0.5),
            Waveform::Pulse(duty) => pulse(p, duty),
        }
    }

    /// Render one full period into `table`.
    pub fn fill_table(&self, table: &mut [f32]) {
        let len = table.len() as f32;
        for (i, sample) in table.iter_mut().enumerate() {
            *sample = self.evaluate(i as f32 / len);
        }
    }
}

#[inline]
pub fn sine(phase: f32) -> f32 {
    (TAU * phase).sin()
}

/// Triangle starting at 0, peaking at +1 a quarter period in.
#[inline]
pub fn triangle(phase: f32) -> f32 {
    let p = phase.rem_euclid(1.0);
    if p < 0.25 {
        4.0 * p
    } else if p < 0.75 {
        2.0 - 4.0 * p
    } else {
        4.0 * p - 4.0
    }
}

/// Rising sawtooth, -1 → +1, crossing zero at the half period.
#[inline]
pub fn sawtooth(phase: f32) -> f32 {
    let p = phase.rem_euclid(1.0);
    2.0 * p - 1.0
}

#[inline]
pub fn pulse(phase: f32, duty: f32) -> f32 {
    if phase.rem_euclid(1.0) < duty.clamp(0.01, 0.99) {
        1.0
    } else {
        -1.0
    }
}

/// Scale `buffer` so its peak magnitude is `target` (no-op for silence).
pub fn normalize(buffer: &mut [f32], target: f32) {
    let peak = buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 1e-9 {
        let gain = target / peak;
        for sample in buffer.iter_mut() {
            *sample *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_hit_expected_points() {
        assert!(sine(0.25) > 0.999);
        assert!((triangle(0.25) - 1.0).abs() < 1e-6);
        assert!((triangle(0.75) + 1.0).abs() < 1e-6);
        assert!((sawtooth(0.5)).abs() < 1e-6);
        assert_eq!(pulse(0.1, 0.25), 1.0);
        assert_eq!(pulse(0.3, 0.25), -1.0);
    }

    #[test]
    fn normalize_sets_peak() {
        let mut buffer = [0.1, -0.4, 0.2];
        normalize(&mut buffer, 1.0);
        assert!((buffer[1] + 1.0).abs() < 1e-6);
    }
}
