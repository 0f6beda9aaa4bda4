//! Signal summing primitives.

/*
Summing Buses
=============

Voices inside an engine, and engine layers inside the manager, are combined
by ADDING their buffers. Each contribution is scaled first:

    bus[i] += source[i] × gain

Two uncorrelated sources at full level can reach 2.0, which is why every
bus in this crate ends with a soft limiter rather than assuming the sum
stays inside ±1.0.

Crossfades between layers use complementary gains, `1 - progress` for the
outgoing layer and `progress` for the incoming one. Those gains always sum
to 1.0, so a crossfade never boosts the level of a single sustained sound.
*/

/// Add signal B into signal A in-place (summing).
///
/// ⚠️ WARNING: Can exceed [-1.0, +1.0] range!
#[inline]
pub fn sum_in_place(a: &mut [f32], b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());

    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb;
    }
}

/// Add `source × gain` into `bus` in-place.
#[inline]
pub fn sum_scaled_in_place(bus: &mut [f32], source: &[f32], gain: f32) {
    debug_assert_eq!(bus.len(), source.len());

    if gain == 0.0 {
        return;
    }
    for (b, &s) in bus.iter_mut().zip(source.iter()) {
        *b += s * gain;
    }
}

/// Linear crossfade weights `(outgoing, incoming)` for a progress value.
#[inline]
pub fn crossfade_weights(progress: f32) -> (f32, f32) {
    let p = progress.clamp(0.0, 1.0);
    (1.0 - p, p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_can_exceed_one() {
        let mut a = [1.0, 0.5];
        sum_in_place(&mut a, &[1.0, 0.8]);
        assert_eq!(a, [2.0, 1.3]);
    }

    #[test]
    fn scaled_sum_applies_gain() {
        let mut bus = [0.25, 0.25];
        sum_scaled_in_place(&mut bus, &[1.0, -1.0], 0.5);
        assert_eq!(bus, [0.75, -0.25]);
    }

    #[test]
    fn crossfade_weights_sum_to_one() {
        for p in [0.0, 0.2, 0.5, 0.9, 1.0] {
            let (a, b) = crossfade_weights(p);
            assert!((a + b - 1.0).abs() < 1e-6);
        }
        assert_eq!(crossfade_weights(2.0), (0.0, 1.0));
    }
}
