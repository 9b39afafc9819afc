//! Opcode definitions and metadata for the shading VM.
//!
//! Opcodes are data: each has a name, a width in words and a feature
//! category, looked up through the registry rather than matched on in the
//! dispatch loop. Each variant's doc lists its operand layout. `pack(..)`
//! means byte-packed register offsets or small enum values (see
//! [`crate::encoding::pack`]); `lit(..)` is a literal quad word; `raw(..)`
//! is an extra word read as integer fields. Unconnected inputs fall back to
//! the literal defaults; unconnected outputs are not written.
//!
//! # Opcode Categories
//!
//! - **Control** - entry selection, conditional skips, termination
//! - **Values** - constants and conversions
//! - **Math** - scalar/vector math, mixing, clamping
//! - **Color** - color adjustments, ramps and curves
//! - **Textures** - procedural and image textures
//! - **Geometry** - shading point queries, transforms, mapping, facing
//! - **Gated** - opcodes that depend on an optional [`FeatureMask`] category
//! - **Closures** - closure construction and composition

use std::fmt;

use serde::{Deserialize, Serialize};
use umbra_foundation::{std_symbols, Symbol};

use crate::encoding::Instruction;
use crate::features::FeatureMask;
use crate::registry::metadata_for;

/// Shading VM instruction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum OpcodeKind {
    // === Control ===
    /// Terminates evaluation.
    End = 0,
    /// `a`, `b`, `c`: absolute word offsets of the surface, volume and
    /// displacement graphs; [`NO_ENTRY`] ends evaluation for that kind.
    SelectEntry,
    /// `a`: scalar register, `b`: words to skip when the register is `<= 0`.
    JumpIfZero,
    /// `a`: scalar register, `b`: words to skip when the register is `>= 1`.
    JumpIfOne,

    // === Values ===
    /// `a`: out, `b`: float bits.
    ValueScalar,
    /// `a`: out; `lit(x, y, z, _)`.
    ValueVector,
    /// `a`: [`ConvertKind`], `b`: in, `c`: out.
    Convert,

    // === Math ===
    /// `a`: [`MathOp`](umbra_nodes::MathOp), `b`: `pack(a, b, c, out)`;
    /// `lit(a, b, c, _)`.
    Math,
    /// `a`: [`VectorMathOp`](umbra_nodes::VectorMathOp),
    /// `b`: `pack(a, b, c, scale)`, `c`: `pack(value_out, vector_out)`;
    /// `lit(a, scale)`, `lit(b, _)`, `lit(c, _)`.
    VectorMath,
    /// `a`: `pack(clamp_type, out)`, `b`: `pack(value, min, max)`;
    /// `lit(value, min, max, _)`.
    Clamp,
    /// `a`: `pack(map_type, clamp, out)`,
    /// `b`: `pack(value, from_min, from_max, to_min)`, `c`: `pack(to_max, steps)`;
    /// `lit(value, from_min, from_max, to_min)`, `lit(to_max, steps, _, _)`.
    MapRange,
    /// Color blend. `a`: `pack(blend_mode, clamp, out)`, `b`: `pack(fac, c1, c2)`;
    /// `lit(c1, fac)`, `lit(c2, _)`.
    Mix,
    /// Linear interpolation. `a`: `pack(mix_kind, clamp, out)`,
    /// `b`: `pack(fac, a, b)`; `lit(a, fac)`, `lit(b, _)`.
    MixValue,
    /// `a`: in, `b`: `pack(x_out, y_out, z_out)`; `lit(in, _)`.
    SeparateVector,
    /// `a`: `pack(x, y, z, out)`; `lit(x, y, z, _)`.
    CombineVector,

    // === Color ===
    /// `a`: `pack(color, gamma, out)`; `lit(color, gamma)`.
    Gamma,
    /// `a`: `pack(color, bright, contrast, out)`; `lit(color, bright)`, `lit(contrast, _, _, _)`.
    BrightContrast,
    /// `a`: `pack(fac, color, out)`; `lit(color, fac)`.
    Invert,
    /// `a`: `pack(hue, saturation, value, fac)`, `b`: `pack(color, out)`;
    /// `lit(hue, saturation, value, fac)`, `lit(color, _)`.
    HueSaturation,
    /// `a`: [`ColorModel`](umbra_nodes::color::ColorModel),
    /// `b`: `pack(color, r_out, g_out, b_out)`; `lit(color, _)`.
    SeparateColor,
    /// `a`: [`ColorModel`](umbra_nodes::color::ColorModel),
    /// `b`: `pack(r, g, b, out)`; `lit(r, g, b, _)`.
    CombineColor,
    /// `a`: color, `b`: out.
    RgbToBw,
    /// `a`: `pack(fac, color_out, alpha_out, interpolate)`, `b`: table size
    /// `n`, `c`: extrapolate; followed by `n` words `lit(r, g, b, a)`.
    RgbRamp,
    /// `a`: [`CurveKind`], `b`: `pack(fac, in, out, extrapolate)`, `c`: table
    /// size `n`; `lit(min_x, max_x, fac, _)`, then `n` table words.
    Curves,

    // === Textures ===
    /// `a`: `pack(dimensions, noise_type, normalize)`,
    /// `b`: `pack(vector, w, scale, detail)`,
    /// `c`: `pack(roughness, lacunarity, offset, gain)`;
    /// `raw(pack(distortion, value_out, color_out), _, _, _)`,
    /// `lit(w, scale, detail, roughness)`, `lit(lacunarity, offset, gain, distortion)`.
    TexNoise,
    /// `a`: `pack(dimensions, feature, metric, normalize)`,
    /// `b`: `pack(vector, w, scale, detail)`,
    /// `c`: `pack(roughness, lacunarity, smoothness, exponent)`;
    /// `raw(pack(randomness, distance_out, color_out, position_out),
    /// pack(w_out, radius_out), _, _)`,
    /// `lit(w, scale, detail, roughness)`, `lit(lacunarity, smoothness, exponent, randomness)`.
    TexVoronoi,
    /// `a`: `pack(dimensions, noise_type)`, `b`: `pack(vector, w, scale, detail)`,
    /// `c`: `pack(dimension, lacunarity, offset, gain)`; `raw(out, _, _, _)`,
    /// `lit(w, scale, detail, dimension)`, `lit(lacunarity, offset, gain, _)`.
    TexMusgrave,
    /// `a`: dimensions, `b`: `pack(vector, w, value_out, color_out)`.
    TexWhiteNoise,
    /// `a`: `pack(wave_type, bands_direction, rings_direction, profile)`,
    /// `b`: `pack(vector, scale, distortion, detail)`,
    /// `c`: `pack(detail_scale, detail_roughness, phase)`;
    /// `raw(pack(fac_out, color_out), _, _, _)`,
    /// `lit(scale, distortion, detail, detail_scale)`, `lit(detail_roughness, phase, _, _)`.
    TexWave,
    /// `a`: `pack(vector, color1, color2, mortar)`,
    /// `b`: `pack(scale, mortar_size, bias, brick_width)`,
    /// `c`: `pack(row_height, color_out, fac_out, mortar_smooth)`;
    /// `raw(offset_frequency, squash_frequency, offset_amount bits, squash_amount bits)`,
    /// `lit(color1, scale)`, `lit(color2, mortar_size)`, `lit(mortar, bias)`,
    /// `lit(brick_width, row_height, mortar_smooth, _)`.
    TexBrick,
    /// `a`: `pack(depth, color_out, fac_out)`, `b`: `pack(vector, scale, distortion)`;
    /// `lit(scale, distortion, _, _)`.
    TexMagic,
    /// `a`: `pack(vector, color1, color2, scale)`, `b`: `pack(color_out, fac_out)`;
    /// `lit(color1, scale)`, `lit(color2, _)`.
    TexChecker,
    /// `a`: [`GradientType`](umbra_nodes::texture::GradientType),
    /// `b`: `pack(vector, fac_out, color_out)`.
    TexGradient,
    /// `a`: texture handle, `b`: `pack(vector, color_out, alpha_out)`.
    TexImage,

    // === Geometry ===
    /// `a`: [`GeometryOutput`], `b`: out.
    Geometry,
    /// `a`: [`TexCoordOutput`], `b`: `pack(out, dx_out, dy_out)`.
    TextureCoordinate,
    /// `a`: `pack(attribute_output, out, dx_out, dy_out)`, `b`, `c`: symbol
    /// hash words (low, high).
    Attribute,
    /// `a`: `pack(transform_kind, from_space, to_space)`, `b`: `pack(in, out)`.
    VectorTransform,
    /// `a`: `pack(mapping_type, vector, location, rotation)`, `b`: `pack(scale, out)`,
    /// `c`: `pack(vector_dx, vector_dy, out_dx, out_dy)`;
    /// `lit(location, _)`, `lit(rotation, _)`, `lit(scale, _)`.
    Mapping,
    /// `a`: `pack(normal, ior, out)`, `b`: ior bits.
    Fresnel,
    /// `a`: `pack(normal, blend, fresnel_out, facing_out)`, `b`: blend bits.
    LayerWeight,
    /// `a`: [`LightPathOutput`], `b`: out.
    LightPath,

    // === Gated ===
    /// `a`: `pack(normal, distance, color_out, ao_out)`, `b`: `pack(samples, flags)`,
    /// `c`: distance bits.
    AmbientOcclusion,
    /// `a`: save register (3 slots), `b`: [`BumpOffset`].
    EnterBumpEval,
    /// `a`: save register written by the matching `EnterBumpEval`.
    LeaveBumpEval,
    /// `a`: `pack(normal, strength, distance, invert)`, `b`: `pack(center, dx, dy, out)`;
    /// `lit(strength, distance, _, _)`.
    Bump,
    /// `a`: `pack(aov_kind, in)`, `b`: AOV index.
    AovOutput,
    /// `a`: `pack(closure_kind, out_slot, color, density)`, `b`: anisotropy;
    /// `lit(color, density)`, `lit(anisotropy, _, _, _)`.
    ClosureVolume,

    // === Closures ===
    /// `a`: `pack(closure_kind, out_slot, color, normal)`,
    /// `b`: `pack(roughness, ior, anisotropy)`;
    /// `lit(color, roughness)`, `lit(ior, anisotropy, _, _)`.
    ClosureBsdf,
    /// `a`: `pack(closure_kind, out_slot, color, strength)`; `lit(color, strength)`.
    ClosureEmission,
    /// `a`: `pack(in_slot, out_slot, weight, is_color)`; `lit(weight, _)`.
    ClosureScale,
    /// `a`: `pack(a_slot, b_slot, out_slot)`.
    ClosureAdd,
    /// `a`: `pack(fac, a_slot, b_slot, out_slot)`, `b`: fac bits.
    ClosureMix,
    /// `a`: slot holding the result closure.
    ClosureOutput,
    /// `a`: `pack(height, midlevel, scale, normal)`, `b`: `pack(space, out)`;
    /// `lit(height, midlevel, scale, _)`.
    Displacement,
    /// `a`: displacement vector register.
    SetDisplacement,
}

/// Entry offset meaning "this program has no graph for that shader kind".
pub const NO_ENTRY: u32 = u32::MAX;

impl OpcodeKind {
    pub const ALL: &'static [OpcodeKind] = &[
        OpcodeKind::End,
        OpcodeKind::SelectEntry,
        OpcodeKind::JumpIfZero,
        OpcodeKind::JumpIfOne,
        OpcodeKind::ValueScalar,
        OpcodeKind::ValueVector,
        OpcodeKind::Convert,
        OpcodeKind::Math,
        OpcodeKind::VectorMath,
        OpcodeKind::Clamp,
        OpcodeKind::MapRange,
        OpcodeKind::Mix,
        OpcodeKind::MixValue,
        OpcodeKind::SeparateVector,
        OpcodeKind::CombineVector,
        OpcodeKind::Gamma,
        OpcodeKind::BrightContrast,
        OpcodeKind::Invert,
        OpcodeKind::HueSaturation,
        OpcodeKind::SeparateColor,
        OpcodeKind::CombineColor,
        OpcodeKind::RgbToBw,
        OpcodeKind::RgbRamp,
        OpcodeKind::Curves,
        OpcodeKind::TexNoise,
        OpcodeKind::TexVoronoi,
        OpcodeKind::TexMusgrave,
        OpcodeKind::TexWhiteNoise,
        OpcodeKind::TexWave,
        OpcodeKind::TexBrick,
        OpcodeKind::TexMagic,
        OpcodeKind::TexChecker,
        OpcodeKind::TexGradient,
        OpcodeKind::TexImage,
        OpcodeKind::Geometry,
        OpcodeKind::TextureCoordinate,
        OpcodeKind::Attribute,
        OpcodeKind::VectorTransform,
        OpcodeKind::Mapping,
        OpcodeKind::Fresnel,
        OpcodeKind::LayerWeight,
        OpcodeKind::LightPath,
        OpcodeKind::AmbientOcclusion,
        OpcodeKind::EnterBumpEval,
        OpcodeKind::LeaveBumpEval,
        OpcodeKind::Bump,
        OpcodeKind::AovOutput,
        OpcodeKind::ClosureVolume,
        OpcodeKind::ClosureBsdf,
        OpcodeKind::ClosureEmission,
        OpcodeKind::ClosureScale,
        OpcodeKind::ClosureAdd,
        OpcodeKind::ClosureMix,
        OpcodeKind::ClosureOutput,
        OpcodeKind::Displacement,
        OpcodeKind::SetDisplacement,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Decode the opcode field of an instruction word.
    #[inline]
    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    #[inline]
    pub fn metadata(self) -> &'static OpcodeMetadata {
        metadata_for(self)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.metadata().name
    }
}

impl fmt::Display for OpcodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of an opcode.
#[derive(Debug, Clone)]
pub struct OpcodeMetadata {
    pub name: &'static str,
    pub width: Width,
    /// Category that must be enabled for the opcode to run.
    pub feature: FeatureMask,
}

/// Number of words an instruction occupies, including the first.
#[derive(Debug, Clone, Copy)]
pub enum Width {
    Fixed(u32),
    /// Computed from the first word (table-carrying opcodes).
    Variable(fn(&Instruction) -> u32),
}

impl OpcodeMetadata {
    /// Width of the instruction whose first word is `first`.
    #[inline]
    pub fn width_of(&self, first: &Instruction) -> usize {
        match self.width {
            Width::Fixed(n) => n as usize,
            Width::Variable(f) => f(first) as usize,
        }
    }
}

// === Operand enums ===

umbra_nodes::node_enum! {
    /// `Convert` conversions.
    pub enum ConvertKind {
        FloatToVector = 0 => "float_to_vector",
        ColorToFloat = 1 => "color_to_float",
        VectorToFloat = 2 => "vector_to_float",
    }
}

umbra_nodes::node_enum! {
    /// `MixValue` operand shapes.
    pub enum MixKind {
        Float = 0 => "float",
        Vector = 1 => "vector",
        /// Vector mix with a per-component factor register.
        VectorNonUniform = 2 => "vector_non_uniform",
    }
}

umbra_nodes::node_enum! {
    pub enum CurveKind {
        Rgb = 0 => "rgb",
        Vector = 1 => "vector",
        Float = 2 => "float",
    }
}

umbra_nodes::node_enum! {
    pub enum GeometryOutput {
        Position = 0 => "position",
        Normal = 1 => "normal",
        TrueNormal = 2 => "true_normal",
        Incoming = 3 => "incoming",
        Parametric = 4 => "parametric",
        Backfacing = 5 => "backfacing",
        PositionDx = 6 => "position_dx",
        PositionDy = 7 => "position_dy",
    }
}

umbra_nodes::node_enum! {
    pub enum TexCoordOutput {
        Generated = 0 => "generated",
        Normal = 1 => "normal",
        Uv = 2 => "uv",
        Object = 3 => "object",
        Camera = 4 => "camera",
        Window = 5 => "window",
        Reflection = 6 => "reflection",
    }
}

umbra_nodes::node_enum! {
    pub enum AttributeOutput {
        /// Average of the components.
        Float = 0 => "float",
        Vector = 1 => "vector",
    }
}

umbra_nodes::node_enum! {
    pub enum TransformKind {
        Point = 0 => "point",
        Vector = 1 => "vector",
        Normal = 2 => "normal",
    }
}

umbra_nodes::node_enum! {
    /// Named coordinate spaces addressable from an instruction.
    pub enum CoordSpace {
        Object = 0 => "object",
        World = 1 => "world",
        Camera = 2 => "camera",
        Screen = 3 => "screen",
        Raster = 4 => "raster",
        Ndc = 5 => "ndc",
    }
}

impl CoordSpace {
    /// Interned name the environment knows this space by.
    pub fn symbol(self) -> Symbol {
        match self {
            CoordSpace::Object => std_symbols::OBJECT,
            CoordSpace::World => std_symbols::WORLD,
            CoordSpace::Camera => std_symbols::CAMERA,
            CoordSpace::Screen => std_symbols::SCREEN,
            CoordSpace::Raster => std_symbols::RASTER,
            CoordSpace::Ndc => std_symbols::NDC,
        }
    }
}

umbra_nodes::node_enum! {
    pub enum LightPathOutput {
        IsCameraRay = 0 => "is_camera_ray",
        IsShadowRay = 1 => "is_shadow_ray",
        IsDiffuseRay = 2 => "is_diffuse_ray",
        IsGlossyRay = 3 => "is_glossy_ray",
        IsSingularRay = 4 => "is_singular_ray",
        IsReflectionRay = 5 => "is_reflection_ray",
        IsTransmissionRay = 6 => "is_transmission_ray",
        IsVolumeScatterRay = 7 => "is_volume_scatter_ray",
        RayLength = 8 => "ray_length",
        RayDepth = 9 => "ray_depth",
    }
}

umbra_nodes::node_enum! {
    /// Where bump evaluation moves the shading position.
    pub enum BumpOffset {
        Center = 0 => "center",
        Dx = 1 => "dx",
        Dy = 2 => "dy",
    }
}

umbra_nodes::node_enum! {
    pub enum AovKind {
        Value = 0 => "value",
        Color = 1 => "color",
    }
}

umbra_nodes::node_enum! {
    pub enum DisplacementSpace {
        Object = 0 => "object",
        World = 1 => "world",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminants_follow_table() {
        for (index, kind) in OpcodeKind::ALL.iter().enumerate() {
            assert_eq!(*kind as usize, index);
            assert_eq!(OpcodeKind::from_u32(index as u32), Some(*kind));
        }
        assert_eq!(OpcodeKind::from_u32(OpcodeKind::COUNT as u32), None);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = OpcodeKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), OpcodeKind::COUNT);
    }
}
