//! Voronoi (cellular) noise in one to four dimensions.
//!
//! Space is divided into unit cells, each holding one feature point jittered
//! from the cell corner by a hash of the cell position scaled by
//! `randomness`. Features are searched over the 3^d neighbourhood (5^d for
//! smooth F1). All routines are written once against [`VoronoiCoord`].

use std::ops::{Add, Div, Mul, Sub};

use umbra_foundation::hash::{
    hash_float2_to_float2, hash_float2_to_float3, hash_float3_to_float3, hash_float4_to_float3,
    hash_float4_to_float4, hash_float_to_float, hash_float_to_float3,
};
use umbra_foundation::scalar::smoothstep;
use umbra_foundation::{Float2, Float3, Float4};

use crate::fractal::MAX_DETAIL;

node_enum! {
    /// Output feature of the Voronoi texture.
    pub enum VoronoiFeature {
        F1 = 0 => "f1",
        F2 = 1 => "f2",
        SmoothF1 = 2 => "smooth_f1",
        DistanceToEdge = 3 => "distance_to_edge",
        NSphereRadius = 4 => "n_sphere_radius",
    }
}

node_enum! {
    /// Distance metric between a shading point and a feature point.
    pub enum VoronoiMetric {
        Euclidean = 0 => "euclidean",
        Manhattan = 1 => "manhattan",
        Chebychev = 2 => "chebychev",
        Minkowski = 3 => "minkowski",
    }
}

/// Coordinate type Voronoi can be evaluated over.
pub trait VoronoiCoord:
    Copy
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f32, Output = Self>
    + Div<f32, Output = Self>
{
    const DIMENSIONS: usize;

    fn splat(v: f32) -> Self;
    /// Build from the first `DIMENSIONS` entries of `c`.
    fn from_components(c: &[f32; 4]) -> Self;
    fn floor(self) -> Self;
    fn map(self, f: impl Fn(f32) -> f32) -> Self;
    fn dot(self, rhs: Self) -> f32;
    fn sum(self) -> f32;
    fn max_component(self) -> f32;
    /// Jitter of the feature point of the cell at `self`, in `[0, 1]^d`.
    fn cell_jitter(self) -> Self;
    /// Random color of the cell at `self`.
    fn cell_color(self) -> Float3;
    /// Pad into the 4D position output.
    fn to_position(self) -> Float4;

    #[inline]
    fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    #[inline]
    fn mix(self, rhs: Self, t: f32) -> Self {
        self * (1.0 - t) + rhs * t
    }
}

impl VoronoiCoord for f32 {
    const DIMENSIONS: usize = 1;

    fn splat(v: f32) -> Self {
        v
    }
    fn from_components(c: &[f32; 4]) -> Self {
        c[0]
    }
    fn floor(self) -> Self {
        f32::floor(self)
    }
    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        f(self)
    }
    fn dot(self, rhs: Self) -> f32 {
        self * rhs
    }
    fn sum(self) -> f32 {
        self
    }
    fn max_component(self) -> f32 {
        self
    }
    fn cell_jitter(self) -> Self {
        hash_float_to_float(self)
    }
    fn cell_color(self) -> Float3 {
        hash_float_to_float3(self)
    }
    fn to_position(self) -> Float4 {
        Float4::new(0.0, 0.0, 0.0, self)
    }
}

impl VoronoiCoord for Float2 {
    const DIMENSIONS: usize = 2;

    fn splat(v: f32) -> Self {
        Float2::splat(v)
    }
    fn from_components(c: &[f32; 4]) -> Self {
        Float2::new(c[0], c[1])
    }
    fn floor(self) -> Self {
        Float2::floor(self)
    }
    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Float2::map(self, f)
    }
    fn dot(self, rhs: Self) -> f32 {
        Float2::dot(self, rhs)
    }
    fn sum(self) -> f32 {
        self.x + self.y
    }
    fn max_component(self) -> f32 {
        Float2::max_component(self)
    }
    fn cell_jitter(self) -> Self {
        hash_float2_to_float2(self)
    }
    fn cell_color(self) -> Float3 {
        hash_float2_to_float3(self)
    }
    fn to_position(self) -> Float4 {
        Float4::new(self.x, self.y, 0.0, 0.0)
    }
}

impl VoronoiCoord for Float3 {
    const DIMENSIONS: usize = 3;

    fn splat(v: f32) -> Self {
        Float3::splat(v)
    }
    fn from_components(c: &[f32; 4]) -> Self {
        Float3::new(c[0], c[1], c[2])
    }
    fn floor(self) -> Self {
        Float3::floor(self)
    }
    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Float3::map(self, f)
    }
    fn dot(self, rhs: Self) -> f32 {
        Float3::dot(self, rhs)
    }
    fn sum(self) -> f32 {
        self.x + self.y + self.z
    }
    fn max_component(self) -> f32 {
        Float3::max_component(self)
    }
    fn cell_jitter(self) -> Self {
        hash_float3_to_float3(self)
    }
    fn cell_color(self) -> Float3 {
        hash_float3_to_float3(self)
    }
    fn to_position(self) -> Float4 {
        self.extend(0.0)
    }
}

impl VoronoiCoord for Float4 {
    const DIMENSIONS: usize = 4;

    fn splat(v: f32) -> Self {
        Float4::splat(v)
    }
    fn from_components(c: &[f32; 4]) -> Self {
        Float4::new(c[0], c[1], c[2], c[3])
    }
    fn floor(self) -> Self {
        Float4::floor(self)
    }
    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Float4::map(self, f)
    }
    fn dot(self, rhs: Self) -> f32 {
        Float4::dot(self, rhs)
    }
    fn sum(self) -> f32 {
        self.x + self.y + self.z + self.w
    }
    fn max_component(self) -> f32 {
        Float4::max_component(self)
    }
    fn cell_jitter(self) -> Self {
        hash_float4_to_float4(self)
    }
    fn cell_color(self) -> Float3 {
        hash_float4_to_float3(self)
    }
    fn to_position(self) -> Float4 {
        self
    }
}

/// Cell offsets of the `(2r + 1)^d` neighbourhood, x varying fastest.
fn neighbours<T: VoronoiCoord>(radius: i32) -> impl Iterator<Item = T> {
    let side = (2 * radius + 1) as usize;
    let count = side.pow(T::DIMENSIONS as u32);
    (0..count).map(move |index| {
        let mut rest = index;
        let mut c = [0.0f32; 4];
        for slot in c.iter_mut().take(T::DIMENSIONS) {
            *slot = (rest % side) as f32 - radius as f32;
            rest /= side;
        }
        T::from_components(&c)
    })
}

/// Evaluation parameters after clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoronoiParams {
    pub scale: f32,
    pub detail: f32,
    pub roughness: f32,
    pub lacunarity: f32,
    pub smoothness: f32,
    pub exponent: f32,
    pub randomness: f32,
    pub max_distance: f32,
    pub normalize: bool,
    pub feature: VoronoiFeature,
    pub metric: VoronoiMetric,
}

impl VoronoiParams {
    /// Clamp user-facing inputs into their valid ranges.
    ///
    /// `smoothness` is halved so that `1.0` maps onto the widest blend.
    /// `max_distance` is filled in by [`voronoi_texture`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feature: VoronoiFeature,
        metric: VoronoiMetric,
        scale: f32,
        detail: f32,
        roughness: f32,
        lacunarity: f32,
        smoothness: f32,
        exponent: f32,
        randomness: f32,
        normalize: bool,
    ) -> Self {
        Self {
            scale,
            detail: detail.clamp(0.0, MAX_DETAIL),
            roughness: roughness.clamp(0.0, 1.0),
            lacunarity,
            smoothness: (smoothness / 2.0).clamp(0.0, 0.5),
            exponent,
            randomness: randomness.clamp(0.0, 1.0),
            max_distance: 0.0,
            normalize,
            feature,
            metric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoronoiOutput {
    pub distance: f32,
    pub color: Float3,
    pub position: Float4,
}

pub fn voronoi_distance<T: VoronoiCoord>(a: T, b: T, params: &VoronoiParams) -> f32 {
    let d = a - b;
    match params.metric {
        VoronoiMetric::Euclidean => d.length(),
        VoronoiMetric::Manhattan => d.map(f32::abs).sum(),
        VoronoiMetric::Chebychev => d.map(f32::abs).max_component(),
        VoronoiMetric::Minkowski => {
            let e = params.exponent;
            d.map(|v| v.abs().powf(e)).sum().powf(1.0 / e)
        }
    }
}

#[inline]
fn feature_point<T: VoronoiCoord>(cell: T, offset: T, randomness: f32) -> T {
    offset + (cell + offset).cell_jitter() * randomness
}

pub fn voronoi_f1<T: VoronoiCoord>(params: &VoronoiParams, coord: T) -> VoronoiOutput {
    let cell = coord.floor();
    let local = coord - cell;

    let mut min_distance = f32::MAX;
    let mut target_offset = T::splat(0.0);
    let mut target_position = T::splat(0.0);
    for offset in neighbours::<T>(1) {
        let point = feature_point(cell, offset, params.randomness);
        let d = voronoi_distance(point, local, params);
        if d < min_distance {
            target_offset = offset;
            min_distance = d;
            target_position = point;
        }
    }

    VoronoiOutput {
        distance: min_distance,
        color: (cell + target_offset).cell_color(),
        position: (target_position + cell).to_position(),
    }
}

pub fn voronoi_smooth_f1<T: VoronoiCoord>(params: &VoronoiParams, coord: T) -> VoronoiOutput {
    let cell = coord.floor();
    let local = coord - cell;

    let mut smooth_distance = 0.0f32;
    let mut smooth_color = Float3::ZERO;
    let mut smooth_position = T::splat(0.0);
    let mut h = -1.0f32;
    for offset in neighbours::<T>(2) {
        let point = feature_point(cell, offset, params.randomness);
        let d = voronoi_distance(point, local, params);
        h = if h == -1.0 {
            1.0
        } else {
            smoothstep(
                0.0,
                1.0,
                0.5 + 0.5 * (smooth_distance - d) / params.smoothness,
            )
        };
        let mut correction = params.smoothness * h * (1.0 - h);
        smooth_distance = smooth_distance * (1.0 - h) + d * h - correction;
        correction /= 1.0 + 3.0 * params.smoothness;
        let cell_color = (cell + offset).cell_color();
        smooth_color = smooth_color.mix(cell_color, h) - Float3::splat(correction);
        smooth_position = smooth_position.mix(point, h) - T::splat(correction);
    }

    VoronoiOutput {
        distance: smooth_distance,
        color: smooth_color,
        position: (cell + smooth_position).to_position(),
    }
}

pub fn voronoi_f2<T: VoronoiCoord>(params: &VoronoiParams, coord: T) -> VoronoiOutput {
    let cell = coord.floor();
    let local = coord - cell;

    let mut distance_f1 = f32::MAX;
    let mut distance_f2 = f32::MAX;
    let mut offset_f1 = T::splat(0.0);
    let mut position_f1 = T::splat(0.0);
    let mut offset_f2 = T::splat(0.0);
    let mut position_f2 = T::splat(0.0);
    for offset in neighbours::<T>(1) {
        let point = feature_point(cell, offset, params.randomness);
        let d = voronoi_distance(point, local, params);
        if d < distance_f1 {
            distance_f2 = distance_f1;
            distance_f1 = d;
            offset_f2 = offset_f1;
            offset_f1 = offset;
            position_f2 = position_f1;
            position_f1 = point;
        } else if d < distance_f2 {
            distance_f2 = d;
            offset_f2 = offset;
            position_f2 = point;
        }
    }

    VoronoiOutput {
        distance: distance_f2,
        color: (cell + offset_f2).cell_color(),
        position: (position_f2 + cell).to_position(),
    }
}

/// Distance to the nearest cell boundary (always Euclidean).
pub fn voronoi_distance_to_edge<T: VoronoiCoord>(params: &VoronoiParams, coord: T) -> f32 {
    let cell = coord.floor();
    let local = coord - cell;

    let mut to_closest = T::splat(0.0);
    let mut min_distance = f32::MAX;
    for offset in neighbours::<T>(1) {
        let to_point = feature_point(cell, offset, params.randomness) - local;
        let d = to_point.dot(to_point);
        if d < min_distance {
            min_distance = d;
            to_closest = to_point;
        }
    }

    min_distance = f32::MAX;
    for offset in neighbours::<T>(1) {
        let to_point = feature_point(cell, offset, params.randomness) - local;
        let perpendicular = to_point - to_closest;
        let perp_sq = perpendicular.dot(perpendicular);
        if perp_sq > 0.0001 {
            let direction = perpendicular / perp_sq.sqrt();
            let to_edge = ((to_closest + to_point) / 2.0).dot(direction);
            min_distance = min_distance.min(to_edge);
        }
    }
    min_distance
}

/// Radius of the largest sphere around the closest feature point that does
/// not contain its nearest neighbour.
pub fn voronoi_n_sphere_radius<T: VoronoiCoord>(params: &VoronoiParams, coord: T) -> f32 {
    let cell = coord.floor();
    let local = coord - cell;

    let mut closest_point = T::splat(0.0);
    let mut closest_offset = T::splat(0.0);
    let mut min_distance = f32::MAX;
    for offset in neighbours::<T>(1) {
        let point = feature_point(cell, offset, params.randomness);
        let d = (point - local).length();
        if d < min_distance {
            min_distance = d;
            closest_point = point;
            closest_offset = offset;
        }
    }

    min_distance = f32::MAX;
    let mut closest_to_closest = T::splat(0.0);
    let zero = T::splat(0.0);
    for offset in neighbours::<T>(1) {
        if offset == zero {
            continue;
        }
        let cell_offset = offset + closest_offset;
        let point = feature_point(cell, cell_offset, params.randomness);
        let d = (closest_point - point).length();
        if d < min_distance {
            min_distance = d;
            closest_to_closest = point;
        }
    }
    (closest_to_closest - closest_point).length() / 2.0
}

/// Layered F1 / smooth F1 / F2.
pub fn fractal_voronoi_x_fx<T: VoronoiCoord>(params: &VoronoiParams, coord: T) -> VoronoiOutput {
    let mut amplitude = 1.0f32;
    let mut max_amplitude = 0.0f32;
    let mut scale = 1.0f32;

    let mut output = VoronoiOutput::default();
    let zero_input = params.detail == 0.0 || params.roughness == 0.0;

    let octave_at = |p: T| match params.feature {
        VoronoiFeature::F2 => voronoi_f2(params, p),
        VoronoiFeature::SmoothF1 if params.smoothness != 0.0 => voronoi_smooth_f1(params, p),
        _ => voronoi_f1(params, p),
    };

    for i in 0..=params.detail.ceil() as i32 {
        let octave = octave_at(coord * scale);
        if zero_input {
            max_amplitude = 1.0;
            output = octave;
            break;
        } else if i as f32 <= params.detail {
            max_amplitude += amplitude;
            output.distance += octave.distance * amplitude;
            output.color += octave.color * amplitude;
            output.position = output.position.mix(octave.position / scale, amplitude);
            scale *= params.lacunarity;
            amplitude *= params.roughness;
        } else {
            let remainder = params.detail - params.detail.floor();
            if remainder != 0.0 {
                max_amplitude = lerp(max_amplitude, max_amplitude + amplitude, remainder);
                output.distance = lerp(
                    output.distance,
                    output.distance + octave.distance * amplitude,
                    remainder,
                );
                output.color = output.color.mix(output.color + octave.color * amplitude, remainder);
                output.position = output
                    .position
                    .mix(output.position.mix(octave.position / scale, amplitude), remainder);
            }
        }
    }

    if params.normalize {
        output.distance /= max_amplitude * params.max_distance;
        output.color = output.color / max_amplitude;
    }

    output.position = if params.scale != 0.0 {
        output.position / params.scale
    } else {
        Float4::ZERO
    };
    output
}

/// Layered distance to edge.
pub fn fractal_voronoi_distance_to_edge<T: VoronoiCoord>(params: &VoronoiParams, coord: T) -> f32 {
    let mut amplitude = 1.0f32;
    let mut max_amplitude = params.max_distance;
    let mut scale = 1.0f32;
    let mut distance = 8.0f32;

    let zero_input = params.detail == 0.0 || params.roughness == 0.0;

    for i in 0..=params.detail.ceil() as i32 {
        let octave_distance = voronoi_distance_to_edge(params, coord * scale);
        if zero_input {
            distance = octave_distance;
            break;
        } else if i as f32 <= params.detail {
            max_amplitude = lerp(max_amplitude, params.max_distance / scale, amplitude);
            distance = lerp(distance, distance.min(octave_distance / scale), amplitude);
            scale *= params.lacunarity;
            amplitude *= params.roughness;
        } else {
            let remainder = params.detail - params.detail.floor();
            if remainder != 0.0 {
                let lerp_amplitude = lerp(max_amplitude, params.max_distance / scale, amplitude);
                max_amplitude = lerp(max_amplitude, lerp_amplitude, remainder);
                let lerp_distance =
                    lerp(distance, distance.min(octave_distance / scale), amplitude);
                distance = lerp(distance, distance.min(lerp_distance), remainder);
            }
        }
    }

    if params.normalize {
        distance /= max_amplitude;
    }
    distance
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

/// Full Voronoi texture evaluation at unscaled `coord`.
///
/// `distance` carries the selected feature (edge distance and sphere radius
/// included); `color` and `position` are only meaningful for F1, smooth F1
/// and F2.
pub fn voronoi_texture<T: VoronoiCoord>(coord: T, params: &VoronoiParams) -> VoronoiOutput {
    let mut params = *params;
    let coord = coord * params.scale;

    params.max_distance = match params.feature {
        VoronoiFeature::DistanceToEdge => 0.5 + 0.5 * params.randomness,
        VoronoiFeature::F2 => {
            2.0 * voronoi_distance(T::splat(0.0), T::splat(0.5 + 0.5 * params.randomness), &params)
        }
        _ => voronoi_distance(T::splat(0.0), T::splat(0.5 + 0.5 * params.randomness), &params),
    };

    match params.feature {
        VoronoiFeature::DistanceToEdge => VoronoiOutput {
            distance: fractal_voronoi_distance_to_edge(&params, coord),
            ..VoronoiOutput::default()
        },
        VoronoiFeature::NSphereRadius => VoronoiOutput {
            distance: voronoi_n_sphere_radius(&params, coord),
            ..VoronoiOutput::default()
        },
        _ => fractal_voronoi_x_fx(&params, coord),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(feature: VoronoiFeature, randomness: f32) -> VoronoiParams {
        VoronoiParams::new(
            feature,
            VoronoiMetric::Euclidean,
            1.0,
            0.0,
            0.5,
            2.0,
            1.0,
            1.0,
            randomness,
            false,
        )
    }

    #[test]
    fn test_neighbourhood_sizes() {
        assert_eq!(neighbours::<f32>(1).count(), 3);
        assert_eq!(neighbours::<Float2>(1).count(), 9);
        assert_eq!(neighbours::<Float3>(1).count(), 27);
        assert_eq!(neighbours::<Float4>(2).count(), 625);
    }

    /// With zero randomness every feature point sits on its cell corner, so
    /// F1 is the distance to the nearest integer lattice point.
    #[test]
    fn test_f1_closed_form_without_randomness() {
        let p = params(VoronoiFeature::F1, 0.0);
        for &(x, y, z) in &[(0.3, 0.2, 0.9), (2.7, -1.4, 0.5), (-0.6, 0.45, 3.1)] {
            let coord = Float3::new(x, y, z);
            let nearest = coord.map(f32::round);
            let expected = (coord - nearest).length();
            let out = voronoi_f1(&p, coord);
            assert!((out.distance - expected).abs() < 1e-5, "{coord:?}");
        }
        for x in [0.1f32, 0.6, -2.2, 7.49] {
            let out = voronoi_f1(&p, x);
            assert!((out.distance - (x - x.round()).abs()).abs() < 1e-5);
        }
    }

    #[test]
    fn test_f2_not_less_than_f1() {
        let p = params(VoronoiFeature::F1, 1.0);
        for i in 0..64 {
            let coord = Float2::new(i as f32 * 0.37, i as f32 * -0.21 + 3.0);
            let f1 = voronoi_f1(&p, coord).distance;
            let f2 = voronoi_f2(&p, coord).distance;
            assert!(f2 >= f1);
        }
    }

    #[test]
    fn test_edge_distance_midway_between_points() {
        let p = params(VoronoiFeature::DistanceToEdge, 0.0);
        // points at integers: the edge in 1D sits at x.5
        let d = voronoi_distance_to_edge(&p, 0.2f32);
        assert!((d - 0.3).abs() < 1e-5);
        // nearest edge is the horizontal one at y = 0.5
        let d = voronoi_distance_to_edge(&p, Float2::new(0.1, 0.4));
        assert!((d - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_n_sphere_radius_on_regular_grid() {
        let p = params(VoronoiFeature::NSphereRadius, 0.0);
        let r = voronoi_n_sphere_radius(&p, Float3::new(0.2, 0.3, 0.1));
        assert!((r - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_metrics() {
        let mut p = params(VoronoiFeature::F1, 0.0);
        let a = Float2::new(0.0, 0.0);
        let b = Float2::new(3.0, 4.0);
        assert_eq!(voronoi_distance(a, b, &p), 5.0);
        p.metric = VoronoiMetric::Manhattan;
        assert_eq!(voronoi_distance(a, b, &p), 7.0);
        p.metric = VoronoiMetric::Chebychev;
        assert_eq!(voronoi_distance(a, b, &p), 4.0);
        p.metric = VoronoiMetric::Minkowski;
        p.exponent = 1.0;
        assert!((voronoi_distance(a, b, &p) - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_detail_matches_single_octave() {
        let p = params(VoronoiFeature::F1, 0.8);
        let coord = Float4::new(0.3, 1.7, -0.4, 2.2);
        let layered = voronoi_texture(coord, &p);
        let single = voronoi_f1(&p, coord);
        assert_eq!(layered.distance, single.distance);
        assert_eq!(layered.color, single.color);
    }

    #[test]
    fn test_smooth_f1_close_to_f1_at_low_smoothness() {
        let mut p = params(VoronoiFeature::SmoothF1, 1.0);
        p.smoothness = 0.001;
        let coord = Float2::new(1.3, 0.7);
        let smooth = voronoi_smooth_f1(&p, coord).distance;
        let hard = voronoi_f1(&p, coord).distance;
        assert!((smooth - hard).abs() < 1e-2);
    }

    #[test]
    fn test_cell_hash_known_values() {
        // Feature point placement depends on these exact hashes.
        let jitter = Float3::new(1.0, -2.0, 3.0).cell_jitter();
        let expected = Float3::new(0.258_374_4, 0.019_448_392, 0.473_835_23);
        assert!((jitter - expected).abs().max_component() < 1e-6, "{jitter:?}");
        let color = Float3::ZERO.cell_color();
        let expected = Float3::new(0.611_067_65, 0.102_912_73, 0.865_152_7);
        assert!((color - expected).abs().max_component() < 1e-6, "{color:?}");
    }
}
