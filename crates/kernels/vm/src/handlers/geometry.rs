//! Shading-point queries, coordinate transforms, bump and displacement.

use umbra_foundation::{std_symbols, Dual3, Float3, Symbol, Transform};
use umbra_nodes::geometry::{bump, displacement, fresnel, layer_weight, BumpInput};
use umbra_nodes::{LayerWeightOutput, Mapping, MappingType};

use crate::encoding::{bits_float, is_connected, unpack2, unpack3, unpack4, Instruction};
use crate::environment::{AoQuery, RayFlags, ShaderEnvironment};
use crate::error::Result;
use crate::executor::Frame;
use crate::opcode::{
    AttributeOutput, BumpOffset, CoordSpace, DisplacementSpace, GeometryOutput, LightPathOutput,
    OpcodeKind, TexCoordOutput, TransformKind,
};
use crate::stack::Stack;

// === Helpers ===

/// Transform between two spaces; an unknown pair behaves as identity.
fn lookup_transform(env: &dyn ShaderEnvironment, from: Symbol, to: Symbol) -> Transform {
    env.transform(from, to).unwrap_or(Transform::IDENTITY)
}

/// Normals go through the inverse transpose.
fn transform_normal(env: &dyn ShaderEnvironment, from: Symbol, to: Symbol, n: Float3) -> Float3 {
    lookup_transform(env, to, from)
        .direction_transposed(n)
        .safe_normalize()
}

fn store_dual_vector(stack: &mut Stack, out: u32, dx: u32, dy: u32, value: Dual3) {
    stack.store_vector(out, value.val);
    stack.store_vector(dx, value.dx);
    stack.store_vector(dy, value.dy);
}

// === Context ===

pub(crate) fn handle_geometry(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let Some(kind) = frame.decode(OpcodeKind::Geometry, word.a, GeometryOutput::from_u32)? else {
        return Ok(());
    };
    let sd = frame.point;
    let value = match kind {
        GeometryOutput::Position => sd.position,
        GeometryOutput::Normal => sd.normal,
        GeometryOutput::TrueNormal => sd.true_normal,
        GeometryOutput::Incoming => sd.incoming,
        GeometryOutput::Parametric => Float3::new(sd.uv.x, sd.uv.y, 0.0),
        GeometryOutput::PositionDx => sd.dpdx,
        GeometryOutput::PositionDy => sd.dpdy,
        GeometryOutput::Backfacing => {
            frame
                .stack
                .store_scalar(word.b, if sd.backfacing { 1.0 } else { 0.0 });
            return Ok(());
        }
    };
    frame.stack.store_vector(word.b, value);
    Ok(())
}

/// Texture coordinates with optional differentials.
///
/// Differentials are only computed when a dx or dy output is connected.
pub(crate) fn handle_texture_coordinate(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let Some(kind) =
        frame.decode(OpcodeKind::TextureCoordinate, word.a, TexCoordOutput::from_u32)?
    else {
        return Ok(());
    };
    let (out, dx, dy) = unpack3(word.b);
    let want_derivatives = is_connected(dx) || is_connected(dy);
    let env = frame.env;
    let sd = frame.point;
    let position = if want_derivatives {
        Dual3::new(sd.position, sd.dpdx, sd.dpdy)
    } else {
        Dual3::constant(sd.position)
    };
    let to_space = |space: Symbol| {
        let t = lookup_transform(env, std_symbols::WORLD, space);
        Dual3::new(t.point(position.val), t.direction(position.dx), t.direction(position.dy))
    };

    let value = match kind {
        TexCoordOutput::Generated => env
            .attribute(std_symbols::GENERATED, want_derivatives)
            .unwrap_or_else(|| to_space(std_symbols::OBJECT)),
        TexCoordOutput::Uv => env
            .attribute(std_symbols::UV, want_derivatives)
            .unwrap_or_else(|| Dual3::constant(Float3::new(sd.uv.x, sd.uv.y, 0.0))),
        TexCoordOutput::Object => to_space(std_symbols::OBJECT),
        TexCoordOutput::Camera => to_space(std_symbols::CAMERA),
        TexCoordOutput::Window => to_space(std_symbols::NDC),
        TexCoordOutput::Normal => Dual3::constant(transform_normal(
            env,
            std_symbols::WORLD,
            std_symbols::OBJECT,
            sd.normal,
        )),
        TexCoordOutput::Reflection => Dual3::constant((-sd.incoming).reflect(sd.normal)),
    };
    store_dual_vector(frame.stack, out, dx, dy, value);
    Ok(())
}

/// Named attribute with optional differentials; a missing attribute reads as
/// zero.
pub(crate) fn handle_attribute(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (kind, out, dx, dy) = unpack4(word.a);
    let Some(kind) = frame.decode(OpcodeKind::Attribute, kind, AttributeOutput::from_u32)? else {
        return Ok(());
    };
    let name = Symbol::from_words(word.b, word.c);
    let want_derivatives = is_connected(dx) || is_connected(dy);
    let value = frame
        .env
        .attribute(name, want_derivatives)
        .unwrap_or_else(|| Dual3::constant(Float3::ZERO));

    match kind {
        AttributeOutput::Vector => store_dual_vector(frame.stack, out, dx, dy, value),
        AttributeOutput::Float => {
            let value = value.average();
            frame.stack.store_scalar(out, value.val);
            frame.stack.store_scalar(dx, value.dx);
            frame.stack.store_scalar(dy, value.dy);
        }
    }
    Ok(())
}

pub(crate) fn handle_vector_transform(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (kind, from, to) = unpack3(word.a);
    let op = OpcodeKind::VectorTransform;
    let Some(kind) = frame.decode(op, kind, TransformKind::from_u32)? else {
        return Ok(());
    };
    let Some(from) = frame.decode(op, from, CoordSpace::from_u32)? else {
        return Ok(());
    };
    let Some(to) = frame.decode(op, to, CoordSpace::from_u32)? else {
        return Ok(());
    };
    let (input, out) = unpack2(word.b);

    let value = frame.stack.load_vector_or(input, Float3::ZERO);
    let (from, to) = (from.symbol(), to.symbol());
    let result = match kind {
        TransformKind::Point => lookup_transform(frame.env, from, to).point(value),
        TransformKind::Vector => lookup_transform(frame.env, from, to).direction(value),
        TransformKind::Normal => transform_normal(frame.env, from, to, value),
    };
    frame.stack.store_vector(out, result);
    Ok(())
}

/// Mapping node.
///
/// Differentials go through the mapping only when a dx or dy output is
/// connected.
///
/// # Operands
/// - a: [`MappingType`], `vector`, `location`, `rotation` registers
/// - b: `scale` register, output register
/// - c: `vector` dx and dy registers, output dx and dy registers
/// - literal words: location, rotation, scale
pub(crate) fn handle_mapping(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dlocation, _) = frame.reader.read_literal_vector()?;
    let (drotation, _) = frame.reader.read_literal_vector()?;
    let (dscale, _) = frame.reader.read_literal_vector()?;
    let (kind, vector, location, rotation) = unpack4(word.a);
    let Some(kind) = frame.decode(OpcodeKind::Mapping, kind, MappingType::from_u32)? else {
        return Ok(());
    };
    let (scale, out) = unpack2(word.b);
    let (vector_dx, vector_dy, out_dx, out_dy) = unpack4(word.c);

    let stack = &mut *frame.stack;
    let mapping = Mapping {
        location: stack.load_vector_or(location, dlocation),
        rotation: stack.load_vector_or(rotation, drotation),
        scale: stack.load_vector_or(scale, dscale),
    };
    let value = stack.load_vector_or(vector, Float3::ZERO);
    if is_connected(out_dx) || is_connected(out_dy) {
        let input = Dual3::new(
            value,
            stack.load_vector_or(vector_dx, Float3::ZERO),
            stack.load_vector_or(vector_dy, Float3::ZERO),
        );
        store_dual_vector(stack, out, out_dx, out_dy, mapping.apply_dual(kind, input));
    } else {
        stack.store_vector(out, mapping.apply(kind, value));
    }
    Ok(())
}

pub(crate) fn handle_fresnel(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (normal, ior, out) = unpack3(word.a);
    let sd = frame.point;
    let n = frame.stack.load_vector_or(normal, sd.normal);
    let ior = frame.stack.load_scalar_or(ior, bits_float(word.b));
    let f = fresnel(sd.incoming, n, ior, sd.backfacing);
    frame.stack.store_scalar(out, f);
    Ok(())
}

pub(crate) fn handle_layer_weight(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (normal, blend, fresnel_out, facing_out) = unpack4(word.a);
    let sd = frame.point;
    let n = frame.stack.load_vector_or(normal, sd.normal);
    let blend = frame.stack.load_scalar_or(blend, bits_float(word.b));
    for (output, out) in [
        (LayerWeightOutput::Fresnel, fresnel_out),
        (LayerWeightOutput::Facing, facing_out),
    ] {
        if is_connected(out) {
            let value = layer_weight(output, sd.incoming, n, blend, sd.backfacing);
            frame.stack.store_scalar(out, value);
        }
    }
    Ok(())
}

pub(crate) fn handle_light_path(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let Some(kind) = frame.decode(OpcodeKind::LightPath, word.a, LightPathOutput::from_u32)? else {
        return Ok(());
    };
    let sd = frame.point;
    let flag = |flags: RayFlags| if sd.ray_flags.contains(flags) { 1.0 } else { 0.0 };
    let value = match kind {
        LightPathOutput::IsCameraRay => flag(RayFlags::CAMERA),
        LightPathOutput::IsShadowRay => flag(RayFlags::SHADOW),
        LightPathOutput::IsDiffuseRay => flag(RayFlags::DIFFUSE),
        LightPathOutput::IsGlossyRay => flag(RayFlags::GLOSSY),
        LightPathOutput::IsSingularRay => flag(RayFlags::SINGULAR),
        LightPathOutput::IsReflectionRay => flag(RayFlags::REFLECT),
        LightPathOutput::IsTransmissionRay => flag(RayFlags::TRANSMIT),
        LightPathOutput::IsVolumeScatterRay => flag(RayFlags::VOLUME_SCATTER),
        LightPathOutput::RayLength => sd.ray_length,
        LightPathOutput::RayDepth => sd.ray_depth as f32,
    };
    frame.stack.store_scalar(word.b, value);
    Ok(())
}

// === Feature-gated ===

/// Ambient occlusion through the environment; full visibility when the
/// environment can't trace.
pub(crate) fn handle_ambient_occlusion(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (normal, distance, color_out, ao_out) = unpack4(word.a);
    let (samples, flags) = unpack2(word.b);
    let sd = frame.point;
    let query = AoQuery {
        position: sd.position,
        normal: frame.stack.load_vector_or(normal, sd.normal),
        distance: frame.stack.load_scalar_or(distance, bits_float(word.c)),
        samples,
        inside: flags & 1 != 0,
        only_local: flags & 2 != 0,
    };
    let ao = frame.env.ambient_occlusion(&query).unwrap_or(1.0);
    frame.stack.store_scalar(ao_out, ao);
    frame.stack.store_vector(color_out, Float3::splat(ao));
    Ok(())
}

/// Move the shading position for one of the three bump height samples,
/// saving the original at register `a`.
pub(crate) fn handle_enter_bump_eval(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let Some(offset) = frame.decode(OpcodeKind::EnterBumpEval, word.b, BumpOffset::from_u32)? else {
        return Ok(());
    };
    let sd = frame.point;
    frame.stack.store_vector(word.a, sd.position);
    frame.point.position = match offset {
        BumpOffset::Center => sd.position,
        BumpOffset::Dx => sd.position + sd.dpdx,
        BumpOffset::Dy => sd.position + sd.dpdy,
    };
    Ok(())
}

pub(crate) fn handle_leave_bump_eval(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let position = frame.stack.load_vector_or(word.a, frame.point.position);
    frame.point.position = position;
    Ok(())
}

pub(crate) fn handle_bump(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [dstrength, ddistance, _, _] = frame.reader.read_literal_quad()?;
    let (normal, strength, distance, invert) = unpack4(word.a);
    let (center, dx, dy, out) = unpack4(word.b);
    let sd = frame.point;
    let stack = &mut *frame.stack;
    let input = BumpInput {
        normal: stack.load_vector_or(normal, sd.normal),
        dpdx: sd.dpdx,
        dpdy: sd.dpdy,
        height_center: stack.load_scalar_or(center, 0.0),
        height_dx: stack.load_scalar_or(dx, 0.0),
        height_dy: stack.load_scalar_or(dy, 0.0),
        strength: stack.load_scalar_or(strength, dstrength),
        distance: stack.load_scalar_or(distance, ddistance),
        invert: invert != 0,
    };
    stack.store_vector(out, bump(&input));
    Ok(())
}

// === Displacement ===

/// Displacement vector along the normal, in world space.
///
/// In object space the offset is computed against the object-space normal
/// and brought back to world space, so object scale carries through.
pub(crate) fn handle_displacement(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [dheight, dmidlevel, dscale, _] = frame.reader.read_literal_quad()?;
    let (height, midlevel, scale, normal) = unpack4(word.a);
    let (space, out) = unpack2(word.b);
    let Some(space) = frame.decode(OpcodeKind::Displacement, space, DisplacementSpace::from_u32)?
    else {
        return Ok(());
    };
    let env = frame.env;
    let sd = frame.point;
    let stack = &mut *frame.stack;
    let height = stack.load_scalar_or(height, dheight);
    let midlevel = stack.load_scalar_or(midlevel, dmidlevel);
    let scale = stack.load_scalar_or(scale, dscale);
    let n = stack.load_vector_or(normal, sd.normal);

    let offset = match space {
        DisplacementSpace::World => displacement(height, midlevel, scale, n),
        DisplacementSpace::Object => {
            let n = transform_normal(env, std_symbols::WORLD, std_symbols::OBJECT, n);
            let local = displacement(height, midlevel, scale, n);
            lookup_transform(env, std_symbols::OBJECT, std_symbols::WORLD).direction(local)
        }
    };
    stack.store_vector(out, offset);
    Ok(())
}

pub(crate) fn handle_set_displacement(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    frame.displacement = Some(frame.stack.load_vector_or(word.a, Float3::ZERO));
    Ok(())
}
