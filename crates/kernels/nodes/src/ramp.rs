//! Piecewise-linear lookup tables for color ramps and curves.
//!
//! A table holds `N >= 1` evenly spaced samples over `[0, 1]`. Lookups at
//! exactly `0` and `1` return the first and last sample bit-for-bit.

use umbra_foundation::{Float3, Float4};

/// Look up a color ramp table at `f`.
///
/// With `extrapolate`, positions outside `[0, 1]` continue the slope of the
/// boundary segment; otherwise they clamp to the end samples.
pub fn rgb_ramp_lookup(table: &[Float4], f: f32, interpolate: bool, extrapolate: bool) -> Float4 {
    let size = table.len();
    match size {
        0 => return Float4::ZERO,
        1 => return table[0],
        _ => {}
    }
    let last = (size - 1) as f32;

    if extrapolate && !(0.0..=1.0).contains(&f) {
        let (t0, dy, f) = if f < 0.0 {
            (table[0], table[0] - table[1], -f)
        } else {
            (table[size - 1], table[size - 1] - table[size - 2], f - 1.0)
        };
        return t0 + dy * (f * last);
    }

    let f = f.clamp(0.0, 1.0) * last;
    let i = (f as usize).min(size - 1);
    let t = f - i as f32;

    let a = table[i];
    if interpolate && t > 0.0 && i + 1 < size {
        a * (1.0 - t) + table[i + 1] * t
    } else {
        a
    }
}

/// Scalar variant of [`rgb_ramp_lookup`].
pub fn float_ramp_lookup(table: &[f32], f: f32, interpolate: bool, extrapolate: bool) -> f32 {
    let size = table.len();
    match size {
        0 => return 0.0,
        1 => return table[0],
        _ => {}
    }
    let last = (size - 1) as f32;

    if extrapolate && !(0.0..=1.0).contains(&f) {
        let (t0, dy, f) = if f < 0.0 {
            (table[0], table[0] - table[1], -f)
        } else {
            (table[size - 1], table[size - 1] - table[size - 2], f - 1.0)
        };
        return t0 + dy * f * last;
    }

    let f = f.clamp(0.0, 1.0) * last;
    let i = (f as usize).min(size - 1);
    let t = f - i as f32;

    let a = table[i];
    if interpolate && t > 0.0 && i + 1 < size {
        (1.0 - t) * a + t * table[i + 1]
    } else {
        a
    }
}

/// Apply per-channel curves stored in the x/y/z lanes of `table`.
///
/// Input components are first mapped from `[min_x, max_x]` onto the table
/// domain. The result is blended with the input by `fac`.
pub fn curves(
    table: &[Float4],
    input: Float3,
    min_x: f32,
    max_x: f32,
    fac: f32,
    extrapolate: bool,
) -> Float3 {
    let range = max_x - min_x;
    let inv_range = if range != 0.0 { 1.0 / range } else { 0.0 };
    let lookup = |v: f32| rgb_ramp_lookup(table, (v - min_x) * inv_range, true, extrapolate);

    let out = Float3::new(lookup(input.x).x, lookup(input.y).y, lookup(input.z).z);
    input.mix(out, fac)
}

/// Scalar curve stored in the w lane of `table`.
pub fn float_curve(
    table: &[Float4],
    input: f32,
    min_x: f32,
    max_x: f32,
    fac: f32,
    extrapolate: bool,
) -> f32 {
    let range = max_x - min_x;
    let inv_range = if range != 0.0 { 1.0 / range } else { 0.0 };
    let out = rgb_ramp_lookup(table, (input - min_x) * inv_range, true, extrapolate).w;
    input * (1.0 - fac) + out * fac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Float4> {
        vec![
            Float4::new(0.1, 0.2, 0.3, 1.0),
            Float4::new(0.7, 0.1, 0.9, 0.5),
            Float4::new(0.3, 0.8, 0.2, 0.25),
            Float4::new(0.9, 0.4, 0.6, 0.0),
        ]
    }

    #[test]
    fn test_endpoints_exact_regardless_of_interpolation() {
        let t = table();
        for interpolate in [false, true] {
            for extrapolate in [false, true] {
                assert_eq!(rgb_ramp_lookup(&t, 0.0, interpolate, extrapolate), t[0]);
                assert_eq!(rgb_ramp_lookup(&t, 1.0, interpolate, extrapolate), t[3]);
            }
        }
        let f = [0.25, 0.5, 2.0];
        assert_eq!(float_ramp_lookup(&f, 0.0, true, false), 0.25);
        assert_eq!(float_ramp_lookup(&f, 1.0, true, true), 2.0);
    }

    #[test]
    fn test_linear_extrapolation_uses_boundary_slope() {
        let f = [0.0, 1.0, 3.0];
        // last segment slope is 2 per half unit
        assert!((float_ramp_lookup(&f, 1.25, true, true) - 4.0).abs() < 1e-6);
        assert!((float_ramp_lookup(&f, -0.5, true, true) + 1.0).abs() < 1e-6);
        assert_eq!(float_ramp_lookup(&f, 1.25, true, false), 3.0);
    }

    #[test]
    fn test_interpolation_midpoint() {
        let f = [0.0, 1.0];
        assert!((float_ramp_lookup(&f, 0.25, true, false) - 0.25).abs() < 1e-6);
        assert_eq!(float_ramp_lookup(&f, 0.25, false, false), 0.0);
    }

    #[test]
    fn test_identity_curve() {
        let t = vec![Float4::splat(0.0), Float4::splat(1.0)];
        let c = Float3::new(0.2, 0.5, 0.9);
        let out = curves(&t, c, 0.0, 1.0, 1.0, false);
        assert!((out - c).abs().max_component() < 1e-6);
    }
}
