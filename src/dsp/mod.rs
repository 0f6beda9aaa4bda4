//! Low-level DSP primitives shared by every synthesis engine.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! call from inside a voice's render loop. They stay focused on the
//! signal-processing math; voice management and mixing live higher up.

/// Attack/decay/sustain/release envelope evaluated on logical time.
pub mod envelope;
/// Decibel conversion, pan law and level measurement.
pub mod gain;
/// Linear and cubic table interpolation.
pub mod interpolate;
/// Low frequency oscillator for parameter sweeps.
pub mod lfo;
/// Soft knee limiter used on engine and master outputs.
pub mod limiter;
/// Buffer summing and crossfade weights.
pub mod mix;
/// One-pole smoothing for zipper-free gain changes.
pub mod smoothing;
/// Naive waveform shapes evaluated from phase.
pub mod waveform;
/// Grain window functions.
pub mod window;

pub use envelope::{Adsr, EnvelopeStage};
pub use window::WindowShape;
