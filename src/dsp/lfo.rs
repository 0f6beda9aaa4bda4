//! Low frequency oscillator evaluated on logical time.

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running below the audio band (~0.01 Hz to ~20 Hz)
whose output moves a parameter instead of being heard. The wavetable engine
uses one to sweep the read position through the table, which animates the
timbre without changing pitch.

Like the envelopes, the LFO here is a pure function of the render clock:

    value(t) = depth × sin(2π × rate × t)

so its phase never drifts with block size.

    0.1 - 0.5 Hz    slow timbral sweeps
    0.5 - 2 Hz      classic movement
    2 - 7 Hz        vibrato-like wobble
*/

use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lfo {
    /// Oscillation rate in Hz.
    pub rate: f32,
    /// Peak output (bipolar output swings ±depth).
    pub depth: f32,
}

impl Lfo {
    pub fn new(rate: f32, depth: f32) -> Self {
        Self {
            rate: rate.max(0.0),
            depth,
        }
    }

    /// Bipolar LFO output at `time` seconds.
    #[inline]
    pub fn value_at(&self, time: f64) -> f32 {
        if self.depth == 0.0 || self.rate == 0.0 {
            return 0.0;
        }
        // wrap in f64 so long sessions keep phase precision
        let phase = (self.rate as f64 * time).fract();
        self.depth * (TAU * phase).sin() as f32
    }
}

/// Convert a bipolar signal (-1.0 to 1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_period_reaches_depth() {
        let lfo = Lfo::new(2.0, 0.25);
        assert!((lfo.value_at(0.125) - 0.25).abs() < 1e-6);
        assert!(lfo.value_at(0.0).abs() < 1e-6);
    }

    #[test]
    fn zero_depth_is_silent() {
        assert_eq!(Lfo::new(5.0, 0.0).value_at(0.3), 0.0);
    }

    #[test]
    fn unipolar_conversion() {
        assert_eq!(bipolar_to_unipolar(-1.0), 0.0);
        assert_eq!(bipolar_to_unipolar(1.0), 1.0);
    }
}
