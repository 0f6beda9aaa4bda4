//! Grain window shapes.
//!
//! A grain is a few milliseconds of source audio. Cutting it out with a hard
//! edge clicks, so every grain is multiplied by a window that rises from (near)
//! zero, peaks in the middle and falls back. `progress` runs 0.0 → 1.0 over the
//! grain's lifetime.

use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowShape {
    /// Bell curve truncated at ±3σ.
    #[default]
    Gaussian,
    Hann,
    Triangular,
    Rectangular,
    Blackman,
    /// Half sine: `sin(π·progress)`.
    Sine,
}

impl WindowShape {
    pub const ALL: [WindowShape; 6] = [
        WindowShape::Gaussian,
        WindowShape::Hann,
        WindowShape::Triangular,
        WindowShape::Rectangular,
        WindowShape::Blackman,
        WindowShape::Sine,
    ];

    /// Window shape for a (clamped, rounded) parameter index.
    pub fn from_index(index: f64) -> Self {
        let i = index.round().clamp(0.0, (Self::ALL.len() - 1) as f64) as usize;
        Self::ALL[i]
    }

    pub fn name(&self) -> &'static str {
        match self {
            WindowShape::Gaussian => "gaussian",
            WindowShape::Hann => "hann",
            WindowShape::Triangular => "triangular",
            WindowShape::Rectangular => "rectangular",
            WindowShape::Blackman => "blackman",
            WindowShape::Sine => "sine",
        }
    }

    /// Window gain at `progress` (0.0 - 1.0). Outside that range the grain is
    /// silent.
    pub fn value(&self, progress: f32) -> f32 {
        if !(0.0..=1.0).contains(&progress) {
            return 0.0;
        }

        match self {
            WindowShape::Gaussian => {
                // progress 0 and 1 sit at ±3σ from the centre
                let x = (progress - 0.5) * 6.0;
                (-0.5 * x * x).exp()
            }
            WindowShape::Hann => 0.5 * (1.0 - (2.0 * PI * progress).cos()),
            WindowShape::Triangular => 1.0 - (2.0 * progress - 1.0).abs(),
            WindowShape::Rectangular => 1.0,
            WindowShape::Blackman => {
                let x = 2.0 * PI * progress;
                (0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()).max(0.0)
            }
            WindowShape::Sine => (PI * progress).sin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_peak_in_the_middle() {
        for shape in WindowShape::ALL {
            let mid = shape.value(0.5);
            assert!((mid - 1.0).abs() < 1e-3, "{} peak was {mid}", shape.name());
            assert!(shape.value(0.1) <= mid);
        }
    }

    #[test]
    fn tapered_windows_start_near_zero() {
        for shape in [WindowShape::Hann, WindowShape::Triangular, WindowShape::Blackman, WindowShape::Sine] {
            assert!(shape.value(0.0).abs() < 1e-3, "{}", shape.name());
        }
        // exp(-4.5)
        assert!(WindowShape::Gaussian.value(0.0) < 0.012);
    }

    #[test]
    fn out_of_range_progress_is_silent() {
        assert_eq!(WindowShape::Rectangular.value(1.2), 0.0);
        assert_eq!(WindowShape::Hann.value(-0.1), 0.0);
    }

    #[test]
    fn index_lookup_clamps() {
        assert_eq!(WindowShape::from_index(-3.0), WindowShape::Gaussian);
        assert_eq!(WindowShape::from_index(1.2), WindowShape::Hann);
        assert_eq!(WindowShape::from_index(99.0), WindowShape::Sine);
    }
}
