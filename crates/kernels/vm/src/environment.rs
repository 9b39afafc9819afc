//! The query surface between the VM and the renderer.
//!
//! The VM never owns scene state. Everything it needs about the current
//! shading point, coordinate frames, attributes and textures comes through
//! [`ShaderEnvironment`]. Queries are synchronous and side-effect free; a
//! `None` answer makes the node fall back to its documented default.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use umbra_foundation::{Dual3, Float2, Float3, Float4, Symbol, Transform};

/// Color returned by image textures whose handle resolves to nothing.
pub const MISSING_TEXTURE_COLOR: Float4 = Float4 {
    x: 1.0,
    y: 0.0,
    z: 1.0,
    w: 1.0,
};

/// Kind of ray that reached the shading point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RayFlags(u32);

impl std::ops::BitOr for RayFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl RayFlags {
    pub const NONE: Self = Self(0);
    pub const CAMERA: Self = Self(1 << 0);
    pub const SHADOW: Self = Self(1 << 1);
    pub const DIFFUSE: Self = Self(1 << 2);
    pub const GLOSSY: Self = Self(1 << 3);
    pub const SINGULAR: Self = Self(1 << 4);
    pub const REFLECT: Self = Self(1 << 5);
    pub const TRANSMIT: Self = Self(1 << 6);
    pub const VOLUME_SCATTER: Self = Self(1 << 7);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Geometry and ray state at the point being shaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingPoint {
    /// World-space position.
    pub position: Float3,
    /// Screen-space differentials of `position`.
    pub dpdx: Float3,
    pub dpdy: Float3,
    /// Shading normal (possibly smoothed / bumped).
    pub normal: Float3,
    /// Geometric normal.
    pub true_normal: Float3,
    /// Direction towards the ray origin.
    pub incoming: Float3,
    pub uv: Float2,
    pub time: f32,
    pub ray_flags: RayFlags,
    pub ray_length: f32,
    pub ray_depth: u32,
    pub backfacing: bool,
}

impl Default for ShadingPoint {
    fn default() -> Self {
        let up = Float3::new(0.0, 0.0, 1.0);
        Self {
            position: Float3::ZERO,
            dpdx: Float3::ZERO,
            dpdy: Float3::ZERO,
            normal: up,
            true_normal: up,
            incoming: up,
            uv: Float2::default(),
            time: 0.0,
            ray_flags: RayFlags::CAMERA,
            ray_length: 0.0,
            ray_depth: 0,
            backfacing: false,
        }
    }
}

/// Opaque texture identifier issued by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

/// Ambient occlusion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoQuery {
    pub position: Float3,
    pub normal: Float3,
    pub distance: f32,
    pub samples: u32,
    /// Trace against the inside of the object.
    pub inside: bool,
    /// Only consider the current object.
    pub only_local: bool,
}

/// Renderer services available to a running shader.
pub trait ShaderEnvironment {
    /// The point being shaded.
    fn shading_point(&self) -> ShadingPoint;

    /// Transform taking coordinates in `from` to coordinates in `to`.
    fn transform(&self, from: Symbol, to: Symbol) -> Option<Transform> {
        let _ = (from, to);
        None
    }

    /// Attribute value, with differentials when `want_derivatives` is set.
    /// Scalar attributes are returned splatted across all three lanes.
    fn attribute(&self, name: Symbol, want_derivatives: bool) -> Option<Dual3> {
        let _ = (name, want_derivatives);
        None
    }

    /// RGBA texture sample at `coords` (uv in xy).
    fn sample_texture(&self, handle: TextureHandle, coords: Float3) -> Option<Float4> {
        let _ = (handle, coords);
        None
    }

    /// Unoccluded fraction of the hemisphere. `None` when ray tracing is
    /// unavailable; shaders then see full visibility.
    fn ambient_occlusion(&self, query: &AoQuery) -> Option<f32> {
        let _ = query;
        None
    }
}

/// Small RGBA image sampled with nearest lookup and repeat wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Float4>,
}

impl ImageTexture {
    pub fn sample(&self, uv: Float2) -> Option<Float4> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let x = ((uv.x.rem_euclid(1.0) * self.width as f32) as u32).min(self.width - 1);
        let y = ((uv.y.rem_euclid(1.0) * self.height as f32) as u32).min(self.height - 1);
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Environment backed by plain tables.
///
/// Serves one shading point; used by tools and tests, and as the scene half
/// of batch shading.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    pub point: ShadingPoint,
    pub transforms: IndexMap<(Symbol, Symbol), Transform>,
    pub attributes: IndexMap<Symbol, Dual3>,
    pub textures: IndexMap<TextureHandle, ImageTexture>,
    pub occlusion: Option<f32>,
}

impl StaticEnvironment {
    pub fn new(point: ShadingPoint) -> Self {
        Self {
            point,
            ..Self::default()
        }
    }

    /// Register `transform` for `from -> to` and its inverse for `to -> from`.
    pub fn with_transform(mut self, from: Symbol, to: Symbol, transform: Transform) -> Self {
        if let Some(inverse) = transform.inverse() {
            self.transforms.insert((to, from), inverse);
        }
        self.transforms.insert((from, to), transform);
        self
    }

    pub fn with_attribute(mut self, name: Symbol, value: Dual3) -> Self {
        self.attributes.insert(name, value);
        self
    }

    pub fn with_texture(mut self, handle: TextureHandle, image: ImageTexture) -> Self {
        self.textures.insert(handle, image);
        self
    }
}

impl ShaderEnvironment for StaticEnvironment {
    fn shading_point(&self) -> ShadingPoint {
        self.point
    }

    fn transform(&self, from: Symbol, to: Symbol) -> Option<Transform> {
        if from == to {
            return Some(Transform::IDENTITY);
        }
        self.transforms.get(&(from, to)).copied()
    }

    fn attribute(&self, name: Symbol, want_derivatives: bool) -> Option<Dual3> {
        let value = *self.attributes.get(&name)?;
        Some(if want_derivatives {
            value
        } else {
            Dual3::constant(value.val)
        })
    }

    fn sample_texture(&self, handle: TextureHandle, coords: Float3) -> Option<Float4> {
        self.textures
            .get(&handle)?
            .sample(Float2::new(coords.x, coords.y))
    }

    fn ambient_occlusion(&self, _query: &AoQuery) -> Option<f32> {
        self.occlusion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_foundation::std_symbols;

    #[test]
    fn test_image_wraps() {
        let image = ImageTexture {
            width: 2,
            height: 1,
            pixels: vec![Float4::splat(0.0), Float4::splat(1.0)],
        };
        assert_eq!(image.sample(Float2::new(0.25, 0.5)), Some(Float4::splat(0.0)));
        assert_eq!(image.sample(Float2::new(1.75, 0.5)), Some(Float4::splat(1.0)));
        assert_eq!(image.sample(Float2::new(-0.25, 0.5)), Some(Float4::splat(1.0)));
    }

    #[test]
    fn test_image_index_beyond_u32() {
        // 70000 * 70000 does not fit in u32; short pixel data yields None.
        let image = ImageTexture {
            width: 70_000,
            height: 70_000,
            pixels: vec![Float4::splat(0.5); 4],
        };
        assert_eq!(image.sample(Float2::new(0.99, 0.99)), None);
        assert_eq!(image.sample(Float2::new(0.0, 0.0)), Some(Float4::splat(0.5)));
    }

    #[test]
    fn test_transform_registers_inverse() {
        let env = StaticEnvironment::default().with_transform(
            std_symbols::OBJECT,
            std_symbols::WORLD,
            Transform::translation(Float3::new(1.0, 0.0, 0.0)),
        );
        let back = env.transform(std_symbols::WORLD, std_symbols::OBJECT).unwrap();
        assert_eq!(back.point(Float3::new(1.0, 0.0, 0.0)), Float3::ZERO);
        assert!(env.transform(std_symbols::CAMERA, std_symbols::WORLD).is_none());
    }

    #[test]
    fn test_attribute_strips_unrequested_derivatives() {
        let value = Dual3::new(Float3::ONE, Float3::splat(0.1), Float3::splat(0.2));
        let env = StaticEnvironment::default().with_attribute(std_symbols::UV, value);
        assert_eq!(env.attribute(std_symbols::UV, true), Some(value));
        assert_eq!(env.attribute(std_symbols::UV, false).unwrap().dx, Float3::ZERO);
    }
}
