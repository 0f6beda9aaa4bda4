//! Read-only views of the synthesis state for meters and visualizers.
//!
//! Snapshots are advisory: building one never changes what the engines
//! render, and nothing in the audio path depends on them.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::analysis::OutputAnalysis;
use crate::dsp::WindowShape;
use crate::engine::{fm::OPERATOR_COUNT, wavetable::TableCategory, EngineType};
use crate::manager::SynthesisMode;

/// One live grain, for particle-style displays.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainView {
    pub id: u64,
    /// 0.0 at birth, 1.0 when the grain expires.
    pub progress: f32,
    pub pan: f32,
    pub amplitude: f32,
    pub pitch: f32,
}

/// Algorithm-specific introspection data.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmView {
    Wavetable {
        table: &'static str,
        category: TableCategory,
        /// Normalised magnitude of the first harmonics of the current table.
        spectrum: Vec<f32>,
    },
    Fm {
        algorithm: &'static str,
        /// Enveloped output level of each operator on the newest voice.
        operator_levels: [f32; OPERATOR_COUNT],
    },
    Granular {
        source: &'static str,
        window: WindowShape,
        grains: Vec<GrainView>,
    },
    Additive {
        template: &'static str,
        /// Current (morphing) harmonic amplitudes.
        spectrum: Vec<f32>,
    },
}

/// State of one engine.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub engine: EngineType,
    pub cpu_usage: f32,
    pub voice_count: usize,
    pub max_voices: usize,
    pub view: AlgorithmView,
}

/// An engine snapshot plus the layer's mix state.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSnapshot {
    pub enabled: bool,
    pub amplitude: f32,
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
    pub engine: EngineSnapshot,
}

#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthSnapshot {
    /// Name of the primary engine.
    pub algorithm: &'static str,
    pub primary: EngineType,
    pub mode: SynthesisMode,
    /// Present while a crossfade is running: (target engine, progress).
    pub crossfade: Option<(EngineType, f32)>,
    pub layers: Vec<LayerSnapshot>,
    pub total_voices: usize,
    pub total_cpu: f32,
    pub output: OutputAnalysis,
}

impl SynthSnapshot {
    pub fn layer(&self, engine: EngineType) -> Option<&LayerSnapshot> {
        self.layers.iter().find(|layer| layer.engine.engine == engine)
    }
}
