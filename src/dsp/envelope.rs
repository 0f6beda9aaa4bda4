#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
ADSR Envelope Evaluation
========================

Every engine in this crate shapes its output with a linear ADSR envelope. Unlike
a per-sample state machine, the envelope here is a pure function of logical
time: the render call carries an accumulated sample clock, and each voice
remembers when its note started and (optionally) when it was released.

    level = adsr.level(seconds_since_note_on, seconds_since_note_off)

Evaluating from time instead of stepping state has two consequences we rely on:
  - rendering the same second in one block or in a hundred blocks produces
    identical envelopes
  - many harmonics or operators can share one `Adsr` value without each
    carrying its own mutable counters


The Shape
---------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

  attack    0 → 1 linearly over `attack` seconds
  decay     1 → sustain linearly over `decay` seconds
  sustain   hold while the key is down
  release   level-at-release → 0 linearly over `release` seconds, measured
            from the note-off time

Release starts from whatever level the gate stage had reached when the key
was lifted. For a note released during sustain that is exactly the sustain
level; for a note released mid-attack it avoids a jump up to sustain.
*/

/// The stage an envelope is in at a given moment.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

/// Linear attack/decay/sustain/release envelope parameters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    /// Seconds to ramp 0 → 1.
    pub attack: f32,
    /// Seconds to ramp 1 → sustain.
    pub decay: f32,
    /// Held level while the gate is high (0.0 - 1.0).
    pub sustain: f32,
    /// Seconds to ramp from the release level → 0.
    pub release: f32,
}

impl Adsr {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(0.0),
        }
    }

    /// Level while the key is held, `t` seconds after note-on.
    fn gate_level(&self, t: f32) -> f32 {
        let t = t.max(0.0);
        if t < self.attack {
            return t / self.attack;
        }

        let t = t - self.attack;
        if t < self.decay {
            1.0 - (1.0 - self.sustain) * (t / self.decay)
        } else {
            self.sustain
        }
    }

    /// Envelope level for a note that started `since_on` seconds ago and, if
    /// released, was released `since_off` seconds ago.
    pub fn level(&self, since_on: f32, since_off: Option<f32>) -> f32 {
        match since_off {
            None => self.gate_level(since_on),
            Some(since_off) => {
                let since_off = since_off.max(0.0);
                if since_off >= self.release {
                    return 0.0;
                }
                let start = self.gate_level(since_on - since_off);
                start * (1.0 - since_off / self.release)
            }
        }
    }

    pub fn stage(&self, since_on: f32, since_off: Option<f32>) -> EnvelopeStage {
        match since_off {
            Some(since_off) if since_off >= self.release => EnvelopeStage::Finished,
            Some(_) => EnvelopeStage::Release,
            None if since_on < self.attack => EnvelopeStage::Attack,
            None if since_on < self.attack + self.decay => EnvelopeStage::Decay,
            None => EnvelopeStage::Sustain,
        }
    }

    /// Copy of this envelope with the decay time scaled, used for harmonics
    /// and modulators that should die away faster than the fundamental.
    pub fn with_decay_scale(&self, scale: f32) -> Self {
        Self {
            decay: self.decay * scale.max(0.0),
            ..*self
        }
    }
}

impl Default for Adsr {
    fn default() -> Self {
        Self::new(0.01, 0.1, 0.7, 0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn attack_starts_at_zero_and_peaks_at_one() {
        let env = Adsr::new(0.05, 0.1, 0.6, 0.2);

        assert_eq!(env.level(0.0, None), 0.0);
        assert!((env.level(0.025, None) - 0.5).abs() < EPS);
        assert!((env.level(0.05, None) - 1.0).abs() < EPS);
    }

    #[test]
    fn sustain_holds_target_level() {
        let env = Adsr::new(0.01, 0.05, 0.6, 0.2);

        assert!((env.level(0.06, None) - 0.6).abs() < EPS);
        assert!((env.level(3.0, None) - 0.6).abs() < EPS);
        assert_eq!(env.stage(3.0, None), EnvelopeStage::Sustain);
    }

    #[test]
    fn release_falls_to_zero() {
        let env = Adsr::new(0.01, 0.05, 0.5, 0.3);

        // released after one second in sustain
        assert!((env.level(1.0, Some(0.0)) - 0.5).abs() < EPS);
        assert!((env.level(1.15, Some(0.15)) - 0.25).abs() < EPS);
        assert_eq!(env.level(1.3, Some(0.3)), 0.0);
        assert_eq!(env.level(5.0, Some(4.0)), 0.0);
        assert_eq!(env.stage(5.0, Some(4.0)), EnvelopeStage::Finished);
    }

    #[test]
    fn release_during_attack_starts_from_current_level() {
        let env = Adsr::new(0.1, 0.1, 0.8, 0.1);

        // released at 0.05 s, halfway up the attack ramp
        let level = env.level(0.05, Some(0.0));
        assert!((level - 0.5).abs() < EPS);
    }

    #[test]
    fn zero_attack_is_immediate() {
        let env = Adsr::new(0.0, 0.0, 0.4, 0.1);
        assert!((env.level(0.0, None) - 0.4).abs() < EPS);
    }
}
