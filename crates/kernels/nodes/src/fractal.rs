//! Layered (fractal) noise.
//!
//! Every variant sums octaves of [`NoiseCoord::snoise`] at increasing
//! frequency (`lacunarity`) and decreasing amplitude (`roughness`). `detail`
//! is the octave count minus one; its fractional part blends in one extra
//! octave. Callers clamp `detail` to [`MAX_DETAIL`].

use crate::noise::NoiseCoord;

/// Highest supported `detail` (16 octaves).
pub const MAX_DETAIL: f32 = 15.0;

node_enum! {
    /// Fractal accumulation scheme.
    pub enum NoiseType {
        MultiFractal = 0 => "multifractal",
        Fbm = 1 => "fbm",
        HybridMultiFractal = 2 => "hybrid_multifractal",
        RidgedMultiFractal = 3 => "ridged_multifractal",
        HeteroTerrain = 4 => "hetero_terrain",
    }
}

#[inline]
fn octaves(detail: f32) -> i32 {
    detail as i32
}

#[inline]
fn remainder(detail: f32) -> f32 {
    detail - detail.floor()
}

/// Fractal Brownian motion.
///
/// With `normalize` the result is remapped into roughly `[0, 1]`, otherwise
/// it is the raw signed sum.
pub fn fbm<T: NoiseCoord>(
    p: T,
    detail: f32,
    roughness: f32,
    lacunarity: f32,
    normalize: bool,
) -> f32 {
    let mut fscale = 1.0;
    let mut amp = 1.0;
    let mut maxamp = 0.0;
    let mut sum = 0.0;

    for _ in 0..=octaves(detail) {
        let t = (p * fscale).snoise();
        sum += t * amp;
        maxamp += amp;
        amp *= roughness;
        fscale *= lacunarity;
    }

    let rmd = remainder(detail);
    if rmd != 0.0 {
        let t = (p * fscale).snoise();
        let sum2 = sum + t * amp;
        if normalize {
            let a = 0.5 * sum / maxamp + 0.5;
            let b = 0.5 * sum2 / (maxamp + amp) + 0.5;
            (1.0 - rmd) * a + rmd * b
        } else {
            (1.0 - rmd) * sum + rmd * sum2
        }
    } else if normalize {
        0.5 * sum / maxamp + 0.5
    } else {
        sum
    }
}

/// Multiplicative cascade of octaves.
pub fn multi_fractal<T: NoiseCoord>(p: T, detail: f32, roughness: f32, lacunarity: f32) -> f32 {
    let mut p = p;
    let mut value = 1.0;
    let mut pwr = 1.0;

    for _ in 0..=octaves(detail) {
        value *= pwr * p.snoise() + 1.0;
        pwr *= roughness;
        p = p * lacunarity;
    }

    let rmd = remainder(detail);
    if rmd != 0.0 {
        value *= rmd * pwr * p.snoise() + 1.0;
    }
    value
}

/// Heterogeneous terrain: octaves scaled by the running value.
pub fn hetero_terrain<T: NoiseCoord>(
    p: T,
    detail: f32,
    roughness: f32,
    lacunarity: f32,
    offset: f32,
) -> f32 {
    let mut p = p;
    let mut pwr = roughness;

    let mut value = offset + p.snoise();
    p = p * lacunarity;

    for _ in 1..=octaves(detail) {
        let increment = (p.snoise() + offset) * pwr * value;
        value += increment;
        pwr *= roughness;
        p = p * lacunarity;
    }

    let rmd = remainder(detail);
    if rmd != 0.0 {
        let increment = (p.snoise() + offset) * pwr * value;
        value += rmd * increment;
    }
    value
}

/// Hybrid additive/multiplicative fractal.
pub fn hybrid_multi_fractal<T: NoiseCoord>(
    p: T,
    detail: f32,
    roughness: f32,
    lacunarity: f32,
    offset: f32,
    gain: f32,
) -> f32 {
    let mut p = p;
    let mut pwr = 1.0;
    let mut value = 0.0;
    let mut weight = 1.0f32;

    for _ in 0..=octaves(detail) {
        if weight <= 0.001 {
            break;
        }
        weight = weight.min(1.0);
        let signal = (p.snoise() + offset) * pwr;
        pwr *= roughness;
        value += weight * signal;
        weight *= gain * signal;
        p = p * lacunarity;
    }

    let rmd = remainder(detail);
    if rmd != 0.0 && weight > 0.001 {
        weight = weight.min(1.0);
        let signal = (p.snoise() + offset) * pwr;
        value += rmd * weight * signal;
    }
    value
}

/// Ridged multifractal: inverted absolute noise, squared and weighted by the
/// previous octave.
pub fn ridged_multi_fractal<T: NoiseCoord>(
    p: T,
    detail: f32,
    roughness: f32,
    lacunarity: f32,
    offset: f32,
    gain: f32,
) -> f32 {
    let mut p = p;
    let mut pwr = roughness;

    let mut signal = offset - p.snoise().abs();
    signal *= signal;
    let mut value = signal;

    for _ in 1..=octaves(detail) {
        p = p * lacunarity;
        let weight = (signal * gain).clamp(0.0, 1.0);
        signal = offset - p.snoise().abs();
        signal *= signal;
        signal *= weight;
        value += signal * pwr;
        pwr *= roughness;
    }
    value
}

/// Parameters shared by the fractal noise family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalParams {
    pub kind: NoiseType,
    pub detail: f32,
    pub roughness: f32,
    pub lacunarity: f32,
    pub offset: f32,
    pub gain: f32,
    pub normalize: bool,
}

impl FractalParams {
    /// Evaluate the selected variant at `p`.
    pub fn eval<T: NoiseCoord>(&self, p: T) -> f32 {
        match self.kind {
            NoiseType::MultiFractal => {
                multi_fractal(p, self.detail, self.roughness, self.lacunarity)
            }
            NoiseType::Fbm => fbm(p, self.detail, self.roughness, self.lacunarity, self.normalize),
            NoiseType::HybridMultiFractal => hybrid_multi_fractal(
                p,
                self.detail,
                self.roughness,
                self.lacunarity,
                self.offset,
                self.gain,
            ),
            NoiseType::RidgedMultiFractal => ridged_multi_fractal(
                p,
                self.detail,
                self.roughness,
                self.lacunarity,
                self.offset,
                self.gain,
            ),
            NoiseType::HeteroTerrain => {
                hetero_terrain(p, self.detail, self.roughness, self.lacunarity, self.offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_foundation::{Float2, Float3, Float4};

    fn check_base_octave<T: NoiseCoord>(p: T) {
        let base = p.snoise();
        assert_eq!(fbm(p, 0.0, 0.5, 2.0, false), base);
        assert_eq!(fbm(p, 0.0, 0.5, 2.0, true), 0.5 * base + 0.5);
        assert_eq!(multi_fractal(p, 0.0, 0.5, 2.0), base + 1.0);
        assert_eq!(hetero_terrain(p, 0.0, 0.5, 2.0, 0.0), base);
        assert_eq!(hybrid_multi_fractal(p, 0.0, 0.5, 2.0, 0.0, 1.0), base);
        let ridge = 1.0 - base.abs();
        assert_eq!(ridged_multi_fractal(p, 0.0, 0.5, 2.0, 1.0, 1.0), ridge * ridge);
    }

    #[test]
    fn test_zero_detail_is_base_octave() {
        check_base_octave(0.37f32);
        check_base_octave(Float2::new(0.37, 1.9));
        check_base_octave(Float3::new(0.37, 1.9, -2.3));
        check_base_octave(Float4::new(0.37, 1.9, -2.3, 0.6));
    }

    fn params(kind: NoiseType, detail: f32, roughness: f32) -> FractalParams {
        FractalParams {
            kind,
            detail,
            roughness,
            lacunarity: 2.0,
            offset: 1.0,
            gain: 1.0,
            normalize: false,
        }
    }

    /// Off-lattice sample positions along a skewed line.
    fn samples<T: NoiseCoord>(make: impl Fn(f32) -> T) -> Vec<T> {
        (0..64).map(|i| make(0.173 + i as f32 * 0.731)).collect()
    }

    /// Mean squared difference between four extra octaves and the base one.
    fn high_octave_energy<T: NoiseCoord>(points: &[T], roughness: f32) -> f32 {
        let detailed = params(NoiseType::Fbm, 4.0, roughness);
        let base = params(NoiseType::Fbm, 0.0, roughness);
        let total: f32 = points
            .iter()
            .map(|&p| {
                let gap = detailed.eval(p) - base.eval(p);
                gap * gap
            })
            .sum();
        total / points.len() as f32
    }

    fn check_roughness_raises_octave_energy<T: NoiseCoord>(points: &[T]) {
        let mut last = 0.0;
        for roughness in [0.1, 0.3, 0.5, 0.7, 0.9] {
            let energy = high_octave_energy(points, roughness);
            assert!(
                energy > last,
                "{}D: roughness {roughness} gave {energy}, previous {last}",
                T::DIMENSIONS
            );
            last = energy;
        }
    }

    #[test]
    fn test_roughness_raises_high_octave_weight() {
        check_roughness_raises_octave_energy(&samples(|t| t));
        check_roughness_raises_octave_energy(&samples(|t| Float2::new(t, 0.61 * t + 0.3)));
        check_roughness_raises_octave_energy(&samples(|t| {
            Float3::new(t, 0.61 * t + 0.3, 1.7 - 0.43 * t)
        }));
        check_roughness_raises_octave_energy(&samples(|t| {
            Float4::new(t, 0.61 * t + 0.3, 1.7 - 0.43 * t, 0.29 * t - 0.8)
        }));
    }

    fn check_fractional_detail_between<T: NoiseCoord>(points: &[T]) {
        for kind in NoiseType::ALL.iter().copied() {
            for &p in points {
                let lo = params(kind, 2.0, 0.6).eval(p);
                let hi = params(kind, 3.0, 0.6).eval(p);
                let mid = params(kind, 2.4, 0.6).eval(p);
                let eps = 1e-5 * (1.0 + lo.abs().max(hi.abs()));
                assert!(
                    mid >= lo.min(hi) - eps && mid <= lo.max(hi) + eps,
                    "{:?} {}D: {mid} not between {lo} and {hi}",
                    kind,
                    T::DIMENSIONS
                );
            }
        }
    }

    #[test]
    fn test_fractional_detail_lies_between_neighbours() {
        check_fractional_detail_between(&samples(|t| t));
        check_fractional_detail_between(&samples(|t| Float2::new(t, 1.3 - t)));
        check_fractional_detail_between(&samples(|t| Float3::new(t, 1.3 - t, 0.5 * t)));
        check_fractional_detail_between(&samples(|t| Float4::new(t, 1.3 - t, 0.5 * t, -t)));
    }

    #[test]
    fn test_roughness_changes_fbm_away_from_base() {
        let p = Float3::new(0.37, 1.9, -2.3);
        let base = fbm(p, 0.0, 0.5, 2.0, false);
        let smooth = fbm(p, 4.0, 0.0, 2.0, false);
        let rough = fbm(p, 4.0, 0.9, 2.0, false);
        assert_eq!(smooth, base);
        assert_ne!(rough, base);
    }

    #[test]
    fn test_fractional_detail_blends() {
        let p = Float2::new(0.3, 0.8);
        let lo = fbm(p, 1.0, 0.5, 2.0, false);
        let hi = fbm(p, 2.0, 0.5, 2.0, false);
        let mid = fbm(p, 1.5, 0.5, 2.0, false);
        assert!((mid - 0.5 * (lo + hi)).abs() < 1e-5);
    }
}
