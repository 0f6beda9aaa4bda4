//! Engine and manager configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::EngineType;
use crate::error::{Result, SynthError};

/// Polyphony limit for each engine. Limits are per engine, never shared.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceLimits {
    pub wavetable: usize,
    pub fm: usize,
    /// Granular voices each run a grain cloud, so this stays lower.
    pub granular: usize,
    pub additive: usize,
}

impl VoiceLimits {
    pub fn get(&self, engine: EngineType) -> usize {
        match engine {
            EngineType::Wavetable => self.wavetable,
            EngineType::Fm => self.fm,
            EngineType::Granular => self.granular,
            EngineType::Additive => self.additive,
        }
    }

    pub fn set(&mut self, engine: EngineType, limit: usize) {
        match engine {
            EngineType::Wavetable => self.wavetable = limit,
            EngineType::Fm => self.fm = limit,
            EngineType::Granular => self.granular = limit,
            EngineType::Additive => self.additive = limit,
        }
    }
}

impl Default for VoiceLimits {
    fn default() -> Self {
        Self {
            wavetable: 16,
            fm: 16,
            granular: 8,
            additive: 12,
        }
    }
}

/// Configuration shared by the engines and the synthesis manager.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Audio sample rate in Hz.
    pub sample_rate: f32,
    /// Expected host block size in frames (advisory; any block size renders).
    pub buffer_size: usize,
    pub voice_limits: VoiceLimits,
    /// Aggregate CPU usage (fraction of the real-time budget) that triggers
    /// overload mitigation.
    pub cpu_threshold: f32,
    /// Total voices across enabled layers that triggers overload mitigation.
    pub voice_threshold: usize,
    /// Seconds to crossfade between primary engines.
    pub crossfade_time: f32,
    /// Voices older than this many seconds are pruned.
    pub max_voice_lifetime: f32,
    /// Seed for the jitter generators of the granular and additive engines.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            buffer_size: 512,
            voice_limits: VoiceLimits::default(),
            cpu_threshold: 0.85,
            voice_threshold: 64,
            crossfade_time: 0.5,
            max_voice_lifetime: 10.0,
            seed: 0x5EED_CAFE,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_buffer_size(mut self, frames: usize) -> Self {
        self.buffer_size = frames;
        self
    }

    pub fn with_max_voices(mut self, engine: EngineType, limit: usize) -> Self {
        self.voice_limits.set(engine, limit);
        self
    }

    pub fn with_cpu_threshold(mut self, threshold: f32) -> Self {
        self.cpu_threshold = threshold;
        self
    }

    pub fn with_voice_threshold(mut self, threshold: usize) -> Self {
        self.voice_threshold = threshold;
        self
    }

    pub fn with_crossfade_time(mut self, seconds: f32) -> Self {
        self.crossfade_time = seconds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every field is usable before building engines from it.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(invalid("sample_rate", "must be a positive number of Hz"));
        }
        if self.buffer_size == 0 {
            return Err(invalid("buffer_size", "must be at least one frame"));
        }
        for engine in EngineType::ALL {
            if self.voice_limits.get(engine) == 0 {
                return Err(invalid(
                    "voice_limits",
                    format!("{engine} needs at least one voice"),
                ));
            }
        }
        if !(self.cpu_threshold > 0.0) {
            return Err(invalid("cpu_threshold", "must be greater than zero"));
        }
        if self.voice_threshold == 0 {
            return Err(invalid("voice_threshold", "must be at least one voice"));
        }
        if !(self.crossfade_time >= 0.0) {
            return Err(invalid("crossfade_time", "must not be negative"));
        }
        if !(self.max_voice_lifetime > 0.0) {
            return Err(invalid("max_voice_lifetime", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SynthError {
    SynthError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
