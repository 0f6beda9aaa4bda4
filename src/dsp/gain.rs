//! Gain helpers: decibels, pan law and buffer scaling.

/// Floor used when converting silence to decibels.
pub const MIN_DB: f32 = -120.0;

/// Convert decibels to a linear amplitude factor.
///
///   0 dB → 1.0,  -6 dB → ~0.5,  -20 dB → 0.1
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear amplitude to decibels, floored at [`MIN_DB`].
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return MIN_DB;
    }
    (20.0 * linear.log10()).max(MIN_DB)
}

/// Simplified mono pan law: the signal is attenuated by how far it is panned
/// from centre, `1 - |pan|`.
#[inline]
pub fn pan_gain(pan: f32) -> f32 {
    1.0 - pan.clamp(-1.0, 1.0).abs()
}

/// Multiply every sample by `gain`.
#[inline]
pub fn apply_gain(buffer: &mut [f32], gain: f32) {
    for sample in buffer.iter_mut() {
        *sample *= gain;
    }
}

/// Root-mean-square level of a buffer.
pub fn rms(buffer: &[f32]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    let energy: f32 = buffer.iter().map(|s| s * s).sum();
    (energy / buffer.len() as f32).sqrt()
}

/// Largest absolute sample in a buffer.
pub fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_round_trip() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
        assert!((linear_to_db(0.1) + 20.0).abs() < 1e-4);
        assert_eq!(linear_to_db(0.0), MIN_DB);
    }

    #[test]
    fn pan_law_attenuates_off_centre() {
        assert_eq!(pan_gain(0.0), 1.0);
        assert_eq!(pan_gain(-0.5), 0.5);
        assert_eq!(pan_gain(1.0), 0.0);
        assert_eq!(pan_gain(3.0), 0.0);
    }

    #[test]
    fn levels() {
        let buffer = [0.5, -0.5, 0.5, -1.0];
        assert_eq!(peak(&buffer), 1.0);
        assert!((rms(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }
}
