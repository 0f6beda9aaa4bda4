//! Named, range-checked parameters.
//!
//! Hosts address parameters by name (`"attack"`, `"grainDensity"`, ...). Every
//! engine declares which names it understands together with their range,
//! default, unit and a short description, so a UI can build controls without
//! hard-coding anything. Values outside the declared range are clamped, never
//! rejected.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::engine::{additive, fm, granular, wavetable};
use crate::manager::MANAGER_PARAMS;

/// Metadata for one named parameter.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub unit: &'static str,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn new(
        name: &'static str,
        min: f64,
        max: f64,
        default: f64,
        unit: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            min,
            max,
            default,
            unit,
            description,
        }
    }

    /// Clamp `value` into the declared range. NaN falls back to the default.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// Parameters every engine understands.
pub const COMMON_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("amplitude", 0.0, 1.0, 0.5, "gain", "Engine output level before limiting"),
    ParamSpec::new("attack", 0.0, 10.0, 0.01, "s", "Envelope attack time"),
    ParamSpec::new("decay", 0.0, 10.0, 0.1, "s", "Envelope decay time"),
    ParamSpec::new("sustain", 0.0, 1.0, 0.7, "level", "Envelope sustain level"),
    ParamSpec::new("release", 0.0, 20.0, 0.3, "s", "Envelope release time"),
    ParamSpec::new("pitchBend", -1.0, 1.0, 0.0, "bend", "Pitch wheel position, full scale is two semitones"),
];

/// Current values for a fixed set of parameter specs.
#[derive(Debug, Clone)]
pub struct ParamStore {
    specs: Vec<ParamSpec>,
    values: Vec<f64>,
}

impl ParamStore {
    /// Build a store from the common parameters plus engine-specific ones,
    /// every value starting at its default.
    pub fn new(specific: &[ParamSpec]) -> Self {
        let specs: Vec<ParamSpec> = COMMON_PARAMS.iter().chain(specific).copied().collect();
        let values = specs.iter().map(|spec| spec.default).collect();
        Self { specs, values }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    pub fn supports(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Set a parameter, returning the clamped value actually stored, or
    /// `None` when the name is not supported.
    pub fn set(&mut self, name: &str, value: f64) -> Option<f64> {
        let index = self.index_of(name)?;
        let clamped = self.specs[index].clamp(value);
        self.values[index] = clamped;
        Some(clamped)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|index| self.values[index])
    }

    /// Value of a parameter this store is known to hold. Unknown names read
    /// as 0.0.
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.index_of(name).map(|index| &self.specs[index])
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }
}

/// Map a runtime parameter name onto the static name used by the engines.
///
/// The control path uses this so queued messages carry `&'static str` and
/// never allocate; names no engine or the manager declares return `None`.
pub fn intern(name: &str) -> Option<&'static str> {
    lookup(name).map(|spec| spec.name)
}

/// Declaration of `name`, wherever it is declared.
pub fn lookup(name: &str) -> Option<&'static ParamSpec> {
    COMMON_PARAMS
        .iter()
        .chain(wavetable::PARAMS)
        .chain(fm::PARAMS)
        .chain(granular::PARAMS)
        .chain(additive::PARAMS)
        .chain(MANAGER_PARAMS)
        .find(|spec| spec.name == name)
}
