//! Soft Limiting
//!
//! Summing many voices easily pushes the signal past ±1.0. Hard clipping at
//! that point is harsh, so every engine (and the manager's master bus) runs its
//! output through a soft knee instead.
//!
//! # Transfer function
//!
//! Below the threshold the signal passes untouched. Above it, the excess is
//! squashed with the same `x / (1 + x)` curve used for warm soft clipping:
//!
//! ```text
//!   |x| <= T :  y = x
//!   |x| >  T :  y = sign(x) · (T + e / (1 + e)),   e = |x| - T
//! ```
//!
//! As the input grows without bound `e / (1 + e)` approaches 1, so the output
//! approaches `T + 1` but never reaches it. The curve is continuous at the
//! threshold and its slope there is 1, so there is no audible kink.
//!
//! # Thresholds
//!
//!   0.80  per-engine output (headroom for layering)
//!   0.95  master bus (final stage)

/// Knee used on each engine's summed voice output.
pub const ENGINE_THRESHOLD: f32 = 0.8;

/// Knee used on the manager's master bus.
pub const MASTER_THRESHOLD: f32 = 0.95;

/// Soft-limit one sample around `threshold`.
#[inline]
pub fn soft_limit(sample: f32, threshold: f32) -> f32 {
    let magnitude = sample.abs();
    if magnitude <= threshold {
        return sample;
    }

    let excess = magnitude - threshold;
    sample.signum() * (threshold + excess / (1.0 + excess))
}

/// Soft-limit a buffer in place. Non-finite samples degrade to silence.
pub fn soft_limit_buffer(buffer: &mut [f32], threshold: f32) {
    for sample in buffer.iter_mut() {
        *sample = if sample.is_finite() {
            soft_limit(*sample, threshold)
        } else {
            0.0
        };
    }
}
