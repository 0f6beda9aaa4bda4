//! Table lookup with fractional positions.
//!
//! Wavetables and granular source buffers are read at positions that almost
//! never land on an integer index. Linear interpolation is cheap and good
//! enough for grains; wavetables use a 4-point cubic (Catmull-Rom) read so
//! that slow sweeps through a 2048-sample table stay smooth.

/// Linear blend: `a` at t = 0.0, `b` at t = 1.0.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Catmull-Rom cubic through four neighbouring points.
///
/// `t` is the fractional position between `y1` and `y2`.
#[inline]
pub fn cubic(y0: f32, y1: f32, y2: f32, y3: f32, t: f32) -> f32 {
    let c0 = y1;
    let c1 = 0.5 * (y2 - y0);
    let c2 = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
    let c3 = 0.5 * (y3 - y0) + 1.5 * (y1 - y2);
    ((c3 * t + c2) * t + c1) * t + c0
}

/// Split a (possibly negative or out of range) position into a wrapped
/// integer index and the fractional remainder.
#[inline]
fn wrap_position(position: f32, len: usize) -> (usize, f32) {
    let wrapped = position.rem_euclid(len as f32);
    let index = wrapped.floor() as usize;
    // rem_euclid can round up to exactly `len` for tiny negative inputs
    (index % len, wrapped - wrapped.floor())
}

/// Read a periodic table at `position` (in samples) using cubic interpolation
/// over the indices `i-1, i, i+1, i+2`, all taken modulo the table length.
pub fn read_cubic(table: &[f32], position: f32) -> f32 {
    let len = table.len();
    if len == 0 {
        return 0.0;
    }

    let (i, frac) = wrap_position(position, len);
    let y0 = table[(i + len - 1) % len];
    let y1 = table[i];
    let y2 = table[(i + 1) % len];
    let y3 = table[(i + 2) % len];
    cubic(y0, y1, y2, y3, frac)
}

/// Read a looping buffer at `position` (in samples) using linear interpolation.
pub fn read_linear(buffer: &[f32], position: f32) -> f32 {
    let len = buffer.len();
    if len == 0 {
        return 0.0;
    }

    let (i, frac) = wrap_position(position, len);
    lerp(buffer[i], buffer[(i + 1) % len], frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_passes_through_sample_points() {
        let table = [0.0, 1.0, 0.0, -1.0];

        for (i, &expected) in table.iter().enumerate() {
            assert!((read_cubic(&table, i as f32) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn cubic_is_exact_on_a_line() {
        // Catmull-Rom reproduces linear data between interior points
        assert!((cubic(0.0, 1.0, 2.0, 3.0, 0.25) - 1.25).abs() < 1e-6);
    }

    #[test]
    fn reads_wrap_around_the_table() {
        let table = [0.0, 1.0, 2.0, 3.0];

        assert!((read_linear(&table, 4.5) - 0.5).abs() < 1e-6);
        assert!((read_linear(&table, -0.5) - 1.5).abs() < 1e-6);
        assert!((read_linear(&table, 3.5) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn empty_tables_read_silence() {
        assert_eq!(read_cubic(&[], 3.2), 0.0);
        assert_eq!(read_linear(&[], 3.2), 0.0);
    }
}
