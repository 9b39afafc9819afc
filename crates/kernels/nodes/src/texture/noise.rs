//! Noise and Musgrave textures built on the fractal noise family.

use umbra_foundation::hash::{hash_float2_to_float, hash_float_to_float};
use umbra_foundation::{Float2, Float3, Float4};

use crate::fractal::{FractalParams, MAX_DETAIL};
use crate::noise::NoiseCoord;

/// Coordinates that support domain distortion and decorrelated color lookups.
pub trait NoiseTextureCoord: NoiseCoord {
    /// Pseudo-random offset in `[100, 200]^d` derived from `seed`.
    fn random_offset(seed: f32) -> Self;

    /// Offset every component by signed noise sampled at a separate seed.
    fn distort(self, distortion: f32) -> Self;
}

#[inline]
fn seed_offset(seed: f32, lane: f32) -> f32 {
    100.0 + hash_float2_to_float(Float2::new(seed, lane)) * 100.0
}

impl NoiseTextureCoord for f32 {
    fn random_offset(seed: f32) -> Self {
        100.0 + hash_float_to_float(seed) * 100.0
    }

    fn distort(self, distortion: f32) -> Self {
        self + (self + Self::random_offset(0.0)).snoise() * distortion
    }
}

impl NoiseTextureCoord for Float2 {
    fn random_offset(seed: f32) -> Self {
        Float2::new(seed_offset(seed, 0.0), seed_offset(seed, 1.0))
    }

    fn distort(self, distortion: f32) -> Self {
        self + Float2::new(
            (self + Self::random_offset(0.0)).snoise() * distortion,
            (self + Self::random_offset(1.0)).snoise() * distortion,
        )
    }
}

impl NoiseTextureCoord for Float3 {
    fn random_offset(seed: f32) -> Self {
        Float3::new(
            seed_offset(seed, 0.0),
            seed_offset(seed, 1.0),
            seed_offset(seed, 2.0),
        )
    }

    fn distort(self, distortion: f32) -> Self {
        self + Float3::new(
            (self + Self::random_offset(0.0)).snoise() * distortion,
            (self + Self::random_offset(1.0)).snoise() * distortion,
            (self + Self::random_offset(2.0)).snoise() * distortion,
        )
    }
}

impl NoiseTextureCoord for Float4 {
    fn random_offset(seed: f32) -> Self {
        Float4::new(
            seed_offset(seed, 0.0),
            seed_offset(seed, 1.0),
            seed_offset(seed, 2.0),
            seed_offset(seed, 3.0),
        )
    }

    fn distort(self, distortion: f32) -> Self {
        self + Float4::new(
            (self + Self::random_offset(0.0)).snoise() * distortion,
            (self + Self::random_offset(1.0)).snoise() * distortion,
            (self + Self::random_offset(2.0)).snoise() * distortion,
            (self + Self::random_offset(3.0)).snoise() * distortion,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoiseTextureOutput {
    pub value: f32,
    pub color: Float3,
}

/// Noise texture at an already scaled coordinate.
///
/// `params.detail` is clamped to the supported octave range and negative
/// roughness to zero. The color is only computed when `want_color` is set;
/// it reuses `value` for red and samples two decorrelated offsets for green
/// and blue.
pub fn noise_texture<T: NoiseTextureCoord>(
    p: T,
    params: &FractalParams,
    distortion: f32,
    want_color: bool,
) -> NoiseTextureOutput {
    let mut params = *params;
    params.detail = params.detail.clamp(0.0, MAX_DETAIL);
    params.roughness = params.roughness.max(0.0);

    let p = if distortion != 0.0 {
        p.distort(distortion)
    } else {
        p
    };

    let value = params.eval(p);
    let color = if want_color {
        let seed = T::DIMENSIONS as f32;
        Float3::new(
            value,
            params.eval(p + T::random_offset(seed)),
            params.eval(p + T::random_offset(seed + 1.0)),
        )
    } else {
        Float3::ZERO
    };

    NoiseTextureOutput { value, color }
}

/// Musgrave texture, expressed through the fractal family.
///
/// The fractal `dimension` maps onto `roughness = lacunarity^-dimension`; the
/// sum is never normalized.
pub fn musgrave_texture<T: NoiseCoord>(p: T, params: &FractalParams, dimension: f32) -> f32 {
    let mut params = *params;
    let dimension = dimension.max(1e-5);
    params.lacunarity = params.lacunarity.max(1e-5);
    params.detail = params.detail.clamp(0.0, MAX_DETAIL);
    params.roughness = params.lacunarity.powf(-dimension);
    params.normalize = false;
    params.eval(p)
}
