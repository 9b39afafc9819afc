//! Opcode registry linking metadata to handlers.

use std::sync::OnceLock;

use tracing::debug;

use crate::encoding::Instruction;
use crate::features::FeatureMask;
use crate::handlers::{closure, color, control, geometry, math, output, texture, value, Handler};
use crate::opcode::{OpcodeKind, OpcodeMetadata, Width};

/// Metadata and handler for one opcode.
#[derive(Debug, Clone)]
pub struct OpcodeSpec {
    pub kind: OpcodeKind,
    pub metadata: OpcodeMetadata,
    pub handler: Handler,
}

/// All opcode specifications, indexed by opcode value.
///
/// Built on first use; both the verifier and every dispatch table read it.
pub fn opcode_specs() -> &'static [OpcodeSpec] {
    static SPECS: OnceLock<Vec<OpcodeSpec>> = OnceLock::new();
    SPECS.get_or_init(build_specs)
}

/// Metadata for `kind` in O(1).
#[inline]
pub fn metadata_for(kind: OpcodeKind) -> &'static OpcodeMetadata {
    &opcode_specs()[kind as usize].metadata
}

/// Unconditional handler for `kind`, ignoring feature gating.
#[inline]
pub fn handler_for(kind: OpcodeKind) -> Handler {
    opcode_specs()[kind as usize].handler
}

fn ramp_width(first: &Instruction) -> u32 {
    1u32.saturating_add(first.b)
}

fn curves_width(first: &Instruction) -> u32 {
    2u32.saturating_add(first.c)
}

fn build_specs() -> Vec<OpcodeSpec> {
    use OpcodeKind::*;

    macro_rules! op {
        ($kind:ident, $name:literal, $width:expr, $handler:path) => {
            op!($kind, $name, $width, FeatureMask::CORE, $handler)
        };
        ($kind:ident, $name:literal, $width:expr, $feature:expr, $handler:path) => {
            OpcodeSpec {
                kind: $kind,
                metadata: OpcodeMetadata {
                    name: $name,
                    width: $width,
                    feature: $feature,
                },
                handler: $handler,
            }
        };
    }

    const fn w(n: u32) -> Width {
        Width::Fixed(n)
    }

    let specs = vec![
        op!(End, "end", w(1), control::handle_end),
        op!(SelectEntry, "select_entry", w(1), control::handle_select_entry),
        op!(JumpIfZero, "jump_if_zero", w(1), control::handle_jump_if_zero),
        op!(JumpIfOne, "jump_if_one", w(1), control::handle_jump_if_one),
        op!(ValueScalar, "value_scalar", w(1), value::handle_value_scalar),
        op!(ValueVector, "value_vector", w(2), value::handle_value_vector),
        op!(Convert, "convert", w(1), value::handle_convert),
        op!(Math, "math", w(2), math::handle_math),
        op!(VectorMath, "vector_math", w(4), math::handle_vector_math),
        op!(Clamp, "clamp", w(2), math::handle_clamp),
        op!(MapRange, "map_range", w(3), math::handle_map_range),
        op!(Mix, "mix", w(3), color::handle_mix),
        op!(MixValue, "mix_value", w(3), math::handle_mix_value),
        op!(SeparateVector, "separate_vector", w(2), math::handle_separate_vector),
        op!(CombineVector, "combine_vector", w(2), math::handle_combine_vector),
        op!(Gamma, "gamma", w(2), color::handle_gamma),
        op!(BrightContrast, "bright_contrast", w(3), color::handle_bright_contrast),
        op!(Invert, "invert", w(2), color::handle_invert),
        op!(HueSaturation, "hue_saturation", w(3), color::handle_hue_saturation),
        op!(SeparateColor, "separate_color", w(2), color::handle_separate_color),
        op!(CombineColor, "combine_color", w(2), color::handle_combine_color),
        op!(RgbToBw, "rgb_to_bw", w(1), color::handle_rgb_to_bw),
        op!(RgbRamp, "rgb_ramp", Width::Variable(ramp_width), color::handle_rgb_ramp),
        op!(Curves, "curves", Width::Variable(curves_width), color::handle_curves),
        op!(TexNoise, "tex_noise", w(4), texture::handle_tex_noise),
        op!(TexVoronoi, "tex_voronoi", w(4), texture::handle_tex_voronoi),
        op!(TexMusgrave, "tex_musgrave", w(4), texture::handle_tex_musgrave),
        op!(TexWhiteNoise, "tex_white_noise", w(1), texture::handle_tex_white_noise),
        op!(TexWave, "tex_wave", w(4), texture::handle_tex_wave),
        op!(TexBrick, "tex_brick", w(6), texture::handle_tex_brick),
        op!(TexMagic, "tex_magic", w(2), texture::handle_tex_magic),
        op!(TexChecker, "tex_checker", w(3), texture::handle_tex_checker),
        op!(TexGradient, "tex_gradient", w(1), texture::handle_tex_gradient),
        op!(TexImage, "tex_image", w(1), texture::handle_tex_image),
        op!(Geometry, "geometry", w(1), geometry::handle_geometry),
        op!(TextureCoordinate, "texture_coordinate", w(1), geometry::handle_texture_coordinate),
        op!(Attribute, "attribute", w(1), geometry::handle_attribute),
        op!(VectorTransform, "vector_transform", w(1), geometry::handle_vector_transform),
        op!(Mapping, "mapping", w(4), geometry::handle_mapping),
        op!(Fresnel, "fresnel", w(1), geometry::handle_fresnel),
        op!(LayerWeight, "layer_weight", w(1), geometry::handle_layer_weight),
        op!(LightPath, "light_path", w(1), geometry::handle_light_path),
        op!(
            AmbientOcclusion,
            "ambient_occlusion",
            w(1),
            FeatureMask::RAYTRACE,
            geometry::handle_ambient_occlusion
        ),
        op!(
            EnterBumpEval,
            "enter_bump_eval",
            w(1),
            FeatureMask::BUMP,
            geometry::handle_enter_bump_eval
        ),
        op!(
            LeaveBumpEval,
            "leave_bump_eval",
            w(1),
            FeatureMask::BUMP,
            geometry::handle_leave_bump_eval
        ),
        op!(Bump, "bump", w(2), FeatureMask::BUMP, geometry::handle_bump),
        op!(AovOutput, "aov_output", w(1), FeatureMask::AOV, output::handle_aov_output),
        op!(
            ClosureVolume,
            "closure_volume",
            w(3),
            FeatureMask::VOLUME,
            closure::handle_closure_volume
        ),
        op!(ClosureBsdf, "closure_bsdf", w(3), closure::handle_closure_bsdf),
        op!(ClosureEmission, "closure_emission", w(2), closure::handle_closure_emission),
        op!(ClosureScale, "closure_scale", w(2), closure::handle_closure_scale),
        op!(ClosureAdd, "closure_add", w(1), closure::handle_closure_add),
        op!(ClosureMix, "closure_mix", w(1), closure::handle_closure_mix),
        op!(ClosureOutput, "closure_output", w(1), closure::handle_closure_output),
        op!(Displacement, "displacement", w(2), geometry::handle_displacement),
        op!(SetDisplacement, "set_displacement", w(1), geometry::handle_set_displacement),
    ];

    debug_assert!(specs
        .iter()
        .enumerate()
        .all(|(index, spec)| spec.kind as usize == index));
    specs
}

/// Handler table specialized for one feature mask.
///
/// Opcodes outside the mask get [`control::handle_disabled`]; the dispatch
/// loop still advances the cursor by their full width.
#[derive(Clone)]
pub struct DispatchTable {
    handlers: [Handler; OpcodeKind::COUNT],
    features: FeatureMask,
}

impl DispatchTable {
    pub fn build(features: FeatureMask) -> Self {
        let specs = opcode_specs();
        let handlers = std::array::from_fn(|index| {
            let spec = &specs[index];
            if features.contains(spec.metadata.feature) {
                spec.handler
            } else {
                control::handle_disabled as Handler
            }
        });
        let disabled = specs
            .iter()
            .filter(|spec| !features.contains(spec.metadata.feature))
            .count();
        debug!(?features, disabled, "built dispatch table");
        Self { handlers, features }
    }

    #[inline]
    pub fn handler(&self, kind: OpcodeKind) -> Handler {
        self.handlers[kind as usize]
    }

    pub fn features(&self) -> FeatureMask {
        self.features
    }

    /// Whether `kind` dispatches to its real handler.
    pub fn is_enabled(&self, kind: OpcodeKind) -> bool {
        self.features.contains(metadata_for(kind).feature)
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}
