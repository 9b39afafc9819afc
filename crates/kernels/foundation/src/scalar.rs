//! Scalar helpers with defined results for degenerate input.
//!
//! Every function here returns a finite, documented fallback where the plain
//! float operation would produce NaN or infinity (zero divisors, logarithms of
//! non-positive values, negative bases with fractional exponents).

/// `a / b`, or `0` when `b == 0`.
#[inline]
pub fn safe_divide(a: f32, b: f32) -> f32 {
    if b != 0.0 {
        a / b
    } else {
        0.0
    }
}

/// Truncated modulo (`fmod`), or `0` when `b == 0`.
#[inline]
pub fn safe_modulo(a: f32, b: f32) -> f32 {
    if b != 0.0 {
        a % b
    } else {
        0.0
    }
}

/// Floored modulo `a - floor(a / b) * b`, or `0` when `b == 0`.
#[inline]
pub fn safe_floored_modulo(a: f32, b: f32) -> f32 {
    if b != 0.0 {
        a - (a / b).floor() * b
    } else {
        0.0
    }
}

/// `a^b`, or `0` for a negative base with a non-integer exponent and for a
/// zero base with a negative exponent.
#[inline]
pub fn safe_pow(a: f32, b: f32) -> f32 {
    if (a < 0.0 && b != b.trunc()) || (a == 0.0 && b < 0.0) {
        return 0.0;
    }
    a.powf(b)
}

/// Logarithm of `a` in base `b`, or `0` when either is non-positive.
#[inline]
pub fn safe_log(a: f32, b: f32) -> f32 {
    if a <= 0.0 || b <= 0.0 {
        return 0.0;
    }
    safe_divide(a.ln(), b.ln())
}

#[inline]
pub fn safe_sqrt(a: f32) -> f32 {
    a.max(0.0).sqrt()
}

#[inline]
pub fn safe_inverse_sqrt(a: f32) -> f32 {
    if a > 0.0 {
        1.0 / a.sqrt()
    } else {
        0.0
    }
}

#[inline]
pub fn safe_acos(a: f32) -> f32 {
    a.clamp(-1.0, 1.0).acos()
}

#[inline]
pub fn safe_asin(a: f32) -> f32 {
    a.clamp(-1.0, 1.0).asin()
}

/// Sign with `sign(0) == 0`.
#[inline]
pub fn sign(a: f32) -> f32 {
    if a > 0.0 {
        1.0
    } else if a < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[inline]
pub fn fract(a: f32) -> f32 {
    a - a.floor()
}

/// Integer cell and fractional offset of `a`.
#[inline]
pub fn floor_frac(a: f32) -> (i32, f32) {
    let f = a.floor();
    (f as i32, a - f)
}

#[inline]
pub fn saturate(a: f32) -> f32 {
    a.clamp(0.0, 1.0)
}

/// `min(max(a, lo), hi)`. Unlike [`f32::clamp`] this never panics; when
/// `lo > hi` the result is `hi`.
#[inline]
pub fn clamp(a: f32, lo: f32, hi: f32) -> f32 {
    a.max(lo).min(hi)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Hermite step between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if x < edge0 {
        0.0
    } else if x >= edge1 {
        1.0
    } else {
        let t = (x - edge0) / (edge1 - edge0);
        t * t * (3.0 - 2.0 * t)
    }
}

/// Wrap `value` into `[min, max)`. A zero-width range returns `min`.
#[inline]
pub fn wrap(value: f32, max: f32, min: f32) -> f32 {
    let range = max - min;
    if range != 0.0 {
        value - range * ((value - min) / range).floor()
    } else {
        min
    }
}

/// Triangle wave bouncing between `0` and `scale`. Zero scale returns `0`.
#[inline]
pub fn ping_pong(a: f32, scale: f32) -> f32 {
    if scale == 0.0 {
        return 0.0;
    }
    // `a` too far from zero relative to `scale` overflows the phase.
    let phase = (a - scale) / (scale * 2.0);
    let phase = if phase.is_finite() { fract(phase) } else { 0.0 };
    (phase * scale * 2.0 - scale).abs()
}

/// Polynomial smooth minimum with blend distance `k`.
#[inline]
pub fn smooth_min(a: f32, b: f32, k: f32) -> f32 {
    if k != 0.0 {
        let h = (k - (a - b).abs()).max(0.0) / k;
        a.min(b) - h * h * h * k * (1.0 / 6.0)
    } else {
        a.min(b)
    }
}

#[inline]
pub fn smooth_max(a: f32, b: f32, k: f32) -> f32 {
    -smooth_min(-a, -b, k)
}

/// `1` when `a` and `b` are within `epsilon` (at least `1e-5`), else `0`.
#[inline]
pub fn compare(a: f32, b: f32, epsilon: f32) -> f32 {
    if (a - b).abs() <= epsilon.max(1e-5) {
        1.0
    } else {
        0.0
    }
}

/// Round `a` down to a multiple of `b`; zero `b` gives `0`.
#[inline]
pub fn snap(a: f32, b: f32) -> f32 {
    safe_divide(a, b).floor() * b
}

/// Fresnel reflectance of a dielectric interface for incident cosine `cosi`.
pub fn fresnel_dielectric_cos(cosi: f32, eta: f32) -> f32 {
    let c = cosi.abs();
    let g = eta * eta - 1.0 + c * c;
    if g > 0.0 {
        let g = g.sqrt();
        let a = (g - c) / (g + c);
        let b = (c * (g + c) - 1.0) / (c * (g - c) + 1.0);
        0.5 * a * a * (1.0 + b * b)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_divisors_return_zero() {
        assert_eq!(safe_divide(1.0, 0.0), 0.0);
        assert_eq!(safe_modulo(1.0, 0.0), 0.0);
        assert_eq!(safe_floored_modulo(-1.0, 0.0), 0.0);
        assert_eq!(snap(3.0, 0.0), 0.0);
        assert_eq!(ping_pong(3.0, 0.0), 0.0);
    }

    #[test]
    fn test_log_and_pow_fallbacks() {
        assert_eq!(safe_log(-1.0, 2.0), 0.0);
        assert_eq!(safe_log(8.0, 0.0), 0.0);
        assert_eq!(safe_log(8.0, 1.0), 0.0);
        assert!((safe_log(8.0, 2.0) - 3.0).abs() < 1e-5);
        assert_eq!(safe_pow(-2.0, 0.5), 0.0);
        assert_eq!(safe_pow(-2.0, 3.0), -8.0);
        assert_eq!(safe_pow(0.0, -1.0), 0.0);
        assert_eq!(safe_pow(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_floored_modulo_negative() {
        assert!((safe_floored_modulo(-1.0, 3.0) - 2.0).abs() < 1e-6);
        assert!((safe_modulo(-1.0, 3.0) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrap_and_ping_pong() {
        assert!((wrap(1.25, 1.0, 0.0) - 0.25).abs() < 1e-6);
        assert_eq!(wrap(5.0, 2.0, 2.0), 2.0);
        assert!((ping_pong(1.5, 1.0) - 0.5).abs() < 1e-6);
        assert!((ping_pong(0.25, 1.0) - 0.25).abs() < 1e-6);
        assert_eq!(ping_pong(-1e30, 1e-30), 1e-30);
    }

    #[test]
    fn test_smooth_min_bounds() {
        assert_eq!(smooth_min(1.0, 2.0, 0.0), 1.0);
        let s = smooth_min(1.0, 1.0, 1.0);
        assert!((s - (1.0 - 1.0 / 6.0)).abs() < 1e-6);
        assert!((smooth_max(1.0, 1.0, 1.0) - (1.0 + 1.0 / 6.0)).abs() < 1e-6);
    }

    #[test]
    fn test_compare_minimum_epsilon() {
        assert_eq!(compare(1.0, 1.000001, 0.0), 1.0);
        assert_eq!(compare(1.0, 1.1, 0.05), 0.0);
    }

    #[test]
    fn test_fresnel_normal_incidence() {
        let f = fresnel_dielectric_cos(1.0, 1.5);
        assert!((f - 0.04).abs() < 1e-4);
        assert_eq!(fresnel_dielectric_cos(0.1, 0.5), 1.0);
    }
}
