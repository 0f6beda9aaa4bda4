//! Operator routing graphs.
//!
//! An [`FmAlgorithm`] says which operators modulate which, and which
//! operators are heard. Index 0 is the conventional bottom carrier; higher
//! indices sit further up a modulation stack.
//!
//! Operators are rendered from the highest index down to 0 every sample. A
//! modulator with a higher index than its target therefore feeds the target
//! its current sample, while a modulator with a lower (or equal) index feeds
//! the value it produced one sample earlier. The `bell` and `feedback_stack`
//! presets are voiced against exactly that ordering.

use super::OPERATOR_COUNT;
use crate::error::{Result, SynthError};

/// One modulation input of an operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub modulator: usize,
    pub depth: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FmAlgorithm {
    name: &'static str,
    inputs: [Vec<Connection>; OPERATOR_COUNT],
    outputs: Vec<usize>,
}

impl FmAlgorithm {
    /// Build a routing graph from `(target, modulator, depth)` triples and
    /// the audible output operators.
    pub fn new(
        name: &'static str,
        connections: &[(usize, usize, f32)],
        outputs: &[usize],
    ) -> Result<Self> {
        let invalid = |reason: String| SynthError::InvalidAlgorithm {
            name: name.to_string(),
            reason,
        };

        for &(target, modulator, depth) in connections {
            if target >= OPERATOR_COUNT || modulator >= OPERATOR_COUNT {
                return Err(invalid(format!(
                    "connection {modulator} -> {target} outside 0..{OPERATOR_COUNT}"
                )));
            }
            if !depth.is_finite() {
                return Err(invalid(format!("connection {modulator} -> {target} has no finite depth")));
            }
        }
        if outputs.is_empty() {
            return Err(invalid("no output operators".to_string()));
        }
        if let Some(&op) = outputs.iter().find(|&&op| op >= OPERATOR_COUNT) {
            return Err(invalid(format!("output operator {op} outside 0..{OPERATOR_COUNT}")));
        }

        Ok(Self::from_parts(name, connections, outputs))
    }

    fn from_parts(name: &'static str, connections: &[(usize, usize, f32)], outputs: &[usize]) -> Self {
        let mut inputs: [Vec<Connection>; OPERATOR_COUNT] = Default::default();
        for &(target, modulator, depth) in connections {
            if let Some(slot) = inputs.get_mut(target) {
                slot.push(Connection { modulator, depth });
            }
        }
        Self {
            name,
            inputs,
            outputs: outputs.to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Modulation inputs of `operator`.
    pub fn inputs(&self, operator: usize) -> &[Connection] {
        self.inputs.get(operator).map_or(&[][..], Vec::as_slice)
    }

    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    pub fn is_output(&self, operator: usize) -> bool {
        self.outputs.contains(&operator)
    }

    /// Built-in routing graphs, in `algorithm` parameter order.
    pub fn presets() -> Vec<FmAlgorithm> {
        PRESETS
            .iter()
            .map(|&(name, connections, outputs)| Self::from_parts(name, connections, outputs))
            .collect()
    }
}

type Preset = (&'static str, &'static [(usize, usize, f32)], &'static [usize]);

const PRESETS: &[Preset] = &[
    // 5 → 4 → 3 → 2 → 1 → 0
    (
        "stack",
        &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0), (4, 5, 1.0)],
        &[0],
    ),
    // six sine carriers, organ style
    ("parallel", &[], &[0, 1, 2, 3, 4, 5]),
    // 2 → 1 → 0 and 5 → 4 → 3
    (
        "dual_stack",
        &[(0, 1, 1.0), (1, 2, 1.0), (3, 4, 1.0), (4, 5, 1.0)],
        &[0, 3],
    ),
    // three modulator/carrier pairs, with op 2 also driven one sample late by op 1
    (
        "bell",
        &[(0, 1, 1.5), (2, 3, 1.0), (4, 5, 2.0), (2, 1, 0.35)],
        &[0, 2, 4],
    ),
    // two stacks whose top operators feed back on themselves
    (
        "feedback_stack",
        &[
            (0, 1, 1.0),
            (1, 2, 0.8),
            (2, 2, 0.6),
            (3, 4, 1.0),
            (4, 5, 0.8),
            (5, 5, 0.4),
        ],
        &[0, 3],
    ),
    // three modulators into one carrier plus a simple pair
    (
        "branch",
        &[(0, 1, 0.8), (0, 2, 0.6), (0, 3, 0.4), (4, 5, 1.0)],
        &[0, 4],
    ),
];

/// Number of built-in routing graphs.
pub const PRESET_COUNT: usize = 6;
