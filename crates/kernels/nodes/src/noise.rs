//! Gradient (Perlin) noise in one to four dimensions.
//!
//! Lattice corners are hashed with lookup3, gradients are picked from the low
//! bits of the hash, and corner contributions are blended with the quintic
//! fade curve. Signed noise is rescaled per dimension so that its range is
//! roughly `[-1, 1]`.

use std::ops::{Add, Mul};

use umbra_foundation::hash::{hash_uint, hash_uint2, hash_uint3, hash_uint4};
use umbra_foundation::scalar::floor_frac;
use umbra_foundation::{Float2, Float3, Float4};

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn negate_if(v: f32, cond: u32) -> f32 {
    if cond != 0 {
        -v
    } else {
        v
    }
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

#[inline]
fn bi_mix(v0: f32, v1: f32, v2: f32, v3: f32, x: f32, y: f32) -> f32 {
    let x1 = 1.0 - x;
    (1.0 - y) * (v0 * x1 + v1 * x) + y * (v2 * x1 + v3 * x)
}

#[inline]
fn tri_mix(v: &[f32; 8], x: f32, y: f32, z: f32) -> f32 {
    let x1 = 1.0 - x;
    let y1 = 1.0 - y;
    let z1 = 1.0 - z;
    z1 * (y1 * (v[0] * x1 + v[1] * x) + y * (v[2] * x1 + v[3] * x))
        + z * (y1 * (v[4] * x1 + v[5] * x) + y * (v[6] * x1 + v[7] * x))
}

#[inline]
fn grad1(hash: u32, x: f32) -> f32 {
    let h = hash & 15;
    let g = (1 + (h & 7)) as f32;
    negate_if(g, h & 8) * x
}

#[inline]
fn grad2(hash: u32, x: f32, y: f32) -> f32 {
    let h = hash & 7;
    let u = if h < 4 { x } else { y };
    let v = 2.0 * if h < 4 { y } else { x };
    negate_if(u, h & 1) + negate_if(v, h & 2)
}

#[inline]
fn grad3(hash: u32, x: f32, y: f32, z: f32) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let vt = if h == 12 || h == 14 { x } else { z };
    let v = if h < 4 { y } else { vt };
    negate_if(u, h & 1) + negate_if(v, h & 2)
}

#[inline]
fn grad4(hash: u32, x: f32, y: f32, z: f32, w: f32) -> f32 {
    let h = hash & 31;
    let u = if h < 24 { x } else { y };
    let v = if h < 16 { y } else { z };
    let s = if h < 8 { z } else { w };
    negate_if(u, h & 1) + negate_if(v, h & 2) + negate_if(s, h & 4)
}

// === Unscaled Perlin noise ===

pub fn perlin_1d(x: f32) -> f32 {
    let (xi, fx) = floor_frac(x);
    let xi = xi as u32;
    let u = fade(fx);
    mix(grad1(hash_uint(xi), fx), grad1(hash_uint(xi.wrapping_add(1)), fx - 1.0), u)
}

pub fn perlin_2d(x: f32, y: f32) -> f32 {
    let (xi, fx) = floor_frac(x);
    let (yi, fy) = floor_frac(y);
    let (x0, y0) = (xi as u32, yi as u32);
    let (x1, y1) = (x0.wrapping_add(1), y0.wrapping_add(1));
    let u = fade(fx);
    let v = fade(fy);

    bi_mix(
        grad2(hash_uint2(x0, y0), fx, fy),
        grad2(hash_uint2(x1, y0), fx - 1.0, fy),
        grad2(hash_uint2(x0, y1), fx, fy - 1.0),
        grad2(hash_uint2(x1, y1), fx - 1.0, fy - 1.0),
        u,
        v,
    )
}

pub fn perlin_3d(x: f32, y: f32, z: f32) -> f32 {
    let (xi, fx) = floor_frac(x);
    let (yi, fy) = floor_frac(y);
    let (zi, fz) = floor_frac(z);
    let (x0, y0, z0) = (xi as u32, yi as u32, zi as u32);
    let (x1, y1, z1) = (x0.wrapping_add(1), y0.wrapping_add(1), z0.wrapping_add(1));

    let corners = [
        grad3(hash_uint3(x0, y0, z0), fx, fy, fz),
        grad3(hash_uint3(x1, y0, z0), fx - 1.0, fy, fz),
        grad3(hash_uint3(x0, y1, z0), fx, fy - 1.0, fz),
        grad3(hash_uint3(x1, y1, z0), fx - 1.0, fy - 1.0, fz),
        grad3(hash_uint3(x0, y0, z1), fx, fy, fz - 1.0),
        grad3(hash_uint3(x1, y0, z1), fx - 1.0, fy, fz - 1.0),
        grad3(hash_uint3(x0, y1, z1), fx, fy - 1.0, fz - 1.0),
        grad3(hash_uint3(x1, y1, z1), fx - 1.0, fy - 1.0, fz - 1.0),
    ];
    tri_mix(&corners, fade(fx), fade(fy), fade(fz))
}

pub fn perlin_4d(x: f32, y: f32, z: f32, w: f32) -> f32 {
    let (xi, fx) = floor_frac(x);
    let (yi, fy) = floor_frac(y);
    let (zi, fz) = floor_frac(z);
    let (wi, fw) = floor_frac(w);
    let (x0, y0, z0, w0) = (xi as u32, yi as u32, zi as u32, wi as u32);
    let (x1, y1, z1, w1) = (
        x0.wrapping_add(1),
        y0.wrapping_add(1),
        z0.wrapping_add(1),
        w0.wrapping_add(1),
    );

    let slab = |wk: u32, gw: f32| {
        [
            grad4(hash_uint4(x0, y0, z0, wk), fx, fy, fz, gw),
            grad4(hash_uint4(x1, y0, z0, wk), fx - 1.0, fy, fz, gw),
            grad4(hash_uint4(x0, y1, z0, wk), fx, fy - 1.0, fz, gw),
            grad4(hash_uint4(x1, y1, z0, wk), fx - 1.0, fy - 1.0, fz, gw),
            grad4(hash_uint4(x0, y0, z1, wk), fx, fy, fz - 1.0, gw),
            grad4(hash_uint4(x1, y0, z1, wk), fx - 1.0, fy, fz - 1.0, gw),
            grad4(hash_uint4(x0, y1, z1, wk), fx, fy - 1.0, fz - 1.0, gw),
            grad4(hash_uint4(x1, y1, z1, wk), fx - 1.0, fy - 1.0, fz - 1.0, gw),
        ]
    };

    let (u, v, t, s) = (fade(fx), fade(fy), fade(fz), fade(fw));
    mix(tri_mix(&slab(w0, fw), u, v, t), tri_mix(&slab(w1, fw - 1.0), u, v, t), s)
}

// === Scaled noise ===

/// Keep coordinates in a range where `f32` still has sub-cell precision.
///
/// Large inputs are wrapped with `fmod`; inputs past `1e6` also get a half
/// cell offset so that they don't land exactly on lattice points.
#[inline]
fn precision_correct(p: f32) -> f32 {
    let correction = if p.abs() >= 1_000_000.0 { 0.5 } else { 0.0 };
    p % 100_000.0 + correction
}

pub fn snoise_1d(p: f32) -> f32 {
    0.2500 * perlin_1d(precision_correct(p))
}

pub fn snoise_2d(p: Float2) -> f32 {
    let p = p.map(precision_correct);
    0.6616 * perlin_2d(p.x, p.y)
}

pub fn snoise_3d(p: Float3) -> f32 {
    let p = p.map(precision_correct);
    0.9820 * perlin_3d(p.x, p.y, p.z)
}

pub fn snoise_4d(p: Float4) -> f32 {
    let p = p.map(precision_correct);
    0.8344 * perlin_4d(p.x, p.y, p.z, p.w)
}

/// A coordinate type noise can be evaluated over (`f32` and `Float2..4`).
pub trait NoiseCoord: Copy + Add<Output = Self> + Mul<f32, Output = Self> {
    const DIMENSIONS: usize;

    /// Signed noise, roughly in `[-1, 1]`.
    fn snoise(self) -> f32;

    /// Unsigned noise, roughly in `[0, 1]`.
    #[inline]
    fn noise(self) -> f32 {
        0.5 * self.snoise() + 0.5
    }
}

impl NoiseCoord for f32 {
    const DIMENSIONS: usize = 1;

    fn snoise(self) -> f32 {
        snoise_1d(self)
    }
}

impl NoiseCoord for Float2 {
    const DIMENSIONS: usize = 2;

    fn snoise(self) -> f32 {
        snoise_2d(self)
    }
}

impl NoiseCoord for Float3 {
    const DIMENSIONS: usize = 3;

    fn snoise(self) -> f32 {
        snoise_3d(self)
    }
}

impl NoiseCoord for Float4 {
    const DIMENSIONS: usize = 4;

    fn snoise(self) -> f32 {
        snoise_4d(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_at_lattice_points() {
        for i in -3..3 {
            let p = i as f32;
            assert_eq!(perlin_1d(p), 0.0);
            assert_eq!(perlin_2d(p, 2.0 * p), 0.0);
            assert_eq!(perlin_3d(p, 1.0, -p), 0.0);
            assert_eq!(perlin_4d(p, 0.0, 1.0, 2.0), 0.0);
        }
    }

    #[test]
    fn test_noise_bounded() {
        for i in 0..500 {
            let t = i as f32 * 0.173 - 40.0;
            for v in [
                t.noise(),
                Float2::new(t, t * 0.7).noise(),
                Float3::new(t, 1.3 - t, t * 0.3).noise(),
                Float4::new(t, -t, t * 0.5, 0.25).noise(),
            ] {
                assert!((-0.05..=1.05).contains(&v), "noise out of range: {v}");
            }
        }
    }

    #[test]
    fn test_noise_is_continuous() {
        let a = Float3::new(0.3, 0.4, 0.5).snoise();
        let b = Float3::new(0.3001, 0.4, 0.5).snoise();
        assert!((a - b).abs() < 1e-2);
    }

    #[test]
    fn test_perlin_3d_known_values() {
        for (p, expected) in [
            (Float3::new(0.3, 1.7, -2.2), 0.264_878_06),
            (Float3::new(12.5, -0.25, 3.75), 0.091_539_38),
            (Float3::new(-5.6, 0.1, 0.9), 0.349_928_44),
        ] {
            let v = perlin_3d(p.x, p.y, p.z);
            assert!((v - expected).abs() < 1e-6, "perlin_3d({p:?}) = {v}");
        }
    }

    #[test]
    fn test_huge_coordinates_stay_finite() {
        assert!(snoise_1d(3.0e9).is_finite());
        assert!(snoise_3d(Float3::new(1e7, -1e8, 5e6)).is_finite());
    }
}
