//! One-pole parameter smoothing.
//!
//! Jumping a gain straight to a new value mid-block produces a step in the
//! waveform ("zipper" noise). A smoothed value instead moves a fixed fraction
//! of the remaining distance every sample:
//!
//! ```text
//!   current += (target - current) × alpha
//!   alpha = 1 - exp(-1 / (time_seconds × sample_rate))
//! ```
//!
//! After one time constant the value has covered ~63% of the distance.

/// Distance below which the value snaps onto its target.
const SNAP_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
    alpha: f32,
}

impl SmoothedValue {
    pub fn new(initial: f32, time_ms: f32, sample_rate: f32) -> Self {
        let mut value = Self {
            current: initial,
            target: initial,
            alpha: 1.0,
        };
        value.configure(time_ms, sample_rate);
        value
    }

    /// Recompute the smoothing coefficient. Times under 1 ms are instant.
    pub fn configure(&mut self, time_ms: f32, sample_rate: f32) {
        self.alpha = if time_ms < 1.0 || sample_rate <= 0.0 {
            1.0
        } else {
            (1.0 - (-1.0 / ((time_ms / 1000.0) * sample_rate)).exp()).clamp(0.0, 1.0)
        };
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if (self.target - self.current).abs() < SNAP_EPSILON {
            self.current = self.target;
        } else {
            self.current += (self.target - self.current) * self.alpha;
        }
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_without_overshoot() {
        let mut value = SmoothedValue::new(0.0, 20.0, 1_000.0);
        value.set_target(1.0);

        let mut previous = 0.0;
        for _ in 0..400 {
            let v = value.next_value();
            assert!(v >= previous && v <= 1.0);
            previous = v;
        }
        // settled exactly on the target
        assert_eq!(value.next_value(), 1.0);
    }

    #[test]
    fn zero_time_is_instant() {
        let mut value = SmoothedValue::new(0.2, 0.0, 48_000.0);
        value.set_target(0.9);
        assert_eq!(value.next_value(), 0.9);
    }
}
