//! Procedural and image texture handlers.
//!
//! An unconnected coordinate input samples at the shading position.

use umbra_foundation::scalar::saturate;
use umbra_foundation::{Float2, Float3, Float4};
use umbra_nodes::fractal::FractalParams;
use umbra_nodes::texture::wave::{WaveBandsDirection, WaveProfile, WaveRingsDirection, WaveType};
use umbra_nodes::texture::{
    brick, checker, gradient, magic, musgrave_texture, noise_texture, wave, white_noise,
    BrickParams, GradientType, WaveParams,
};
use umbra_nodes::voronoi::{voronoi_texture, VoronoiParams};
use umbra_nodes::{NoiseType, VoronoiFeature, VoronoiMetric};

use crate::encoding::{bits_float, is_connected, unpack2, unpack3, unpack4, Instruction};
use crate::environment::{TextureHandle, MISSING_TEXTURE_COLOR};
use crate::error::{Result, VmError};
use crate::executor::Frame;
use crate::opcode::OpcodeKind;

/// Evaluate `$body` with `$coord` bound to the 1D to 4D coordinate built from
/// `$p` and `$w`.
macro_rules! with_coord {
    ($dims:expr, $p:expr, $w:expr, |$coord:ident| $body:expr) => {
        match $dims {
            1 => {
                let $coord = $w;
                $body
            }
            2 => {
                let $coord = Float2::new($p.x, $p.y);
                $body
            }
            4 => {
                let $coord = Float4::new($p.x, $p.y, $p.z, $w);
                $body
            }
            _ => {
                let $coord = $p;
                $body
            }
        }
    };
}

/// Check a dimension operand, degrading on anything outside 1 to 4.
fn dimensions(frame: &mut Frame<'_>, opcode: OpcodeKind, dims: u32) -> Result<Option<u32>> {
    if (1..=4).contains(&dims) {
        return Ok(Some(dims));
    }
    frame.violation(VmError::InvalidOperand {
        opcode: opcode.name(),
        value: dims,
    })?;
    Ok(None)
}

fn coordinate(frame: &Frame<'_>, vector: u32) -> Float3 {
    frame.stack.load_vector_or(vector, frame.point.position)
}

/// Fractal noise texture with optional color output.
///
/// # Operands
/// - a: dimensions, [`NoiseType`], normalize flag
/// - b: `vector`, `w`, `scale`, `detail` registers
/// - c: `roughness`, `lacunarity`, `offset`, `gain` registers
/// - raw word: `distortion` register, value and color outputs
/// - literal words: `w`, `scale`, `detail`, `roughness`; `lacunarity`,
///   `offset`, `gain`, `distortion`
pub(crate) fn handle_tex_noise(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [routing, _, _, _] = frame.reader.read_instruction()?.to_fields();
    let [dw, dscale, ddetail, droughness] = frame.reader.read_literal_quad()?;
    let [dlacunarity, doffset, dgain, ddistortion] = frame.reader.read_literal_quad()?;

    let (dims, kind, normalize) = unpack3(word.a);
    let Some(dims) = dimensions(frame, OpcodeKind::TexNoise, dims)? else {
        return Ok(());
    };
    let Some(kind) = frame.decode(OpcodeKind::TexNoise, kind, NoiseType::from_u32)? else {
        return Ok(());
    };
    let (vector, w, scale, detail) = unpack4(word.b);
    let (roughness, lacunarity, offset, gain) = unpack4(word.c);
    let (distortion, value_out, color_out) = unpack3(routing);

    let p = coordinate(frame, vector);
    let stack = &mut *frame.stack;
    let scale = stack.load_scalar_or(scale, dscale);
    let w = stack.load_scalar_or(w, dw);
    let distortion = stack.load_scalar_or(distortion, ddistortion);
    let params = FractalParams {
        kind,
        detail: stack.load_scalar_or(detail, ddetail),
        roughness: stack.load_scalar_or(roughness, droughness),
        lacunarity: stack.load_scalar_or(lacunarity, dlacunarity),
        offset: stack.load_scalar_or(offset, doffset),
        gain: stack.load_scalar_or(gain, dgain),
        normalize: normalize != 0,
    };

    let (p, w) = (p * scale, w * scale);
    let want_color = is_connected(color_out);
    let result = with_coord!(dims, p, w, |coord| {
        noise_texture(coord, &params, distortion, want_color)
    });
    stack.store_scalar(value_out, result.value);
    stack.store_vector(color_out, result.color);
    Ok(())
}

/// Voronoi texture.
///
/// The distance-like result goes to the radius output for
/// [`VoronoiFeature::NSphereRadius`] and to the distance output otherwise.
/// The feature position is split into its xyz part and its w part.
pub(crate) fn handle_tex_voronoi(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [routing, extra, _, _] = frame.reader.read_instruction()?.to_fields();
    let [dw, dscale, ddetail, droughness] = frame.reader.read_literal_quad()?;
    let [dlacunarity, dsmoothness, dexponent, drandomness] = frame.reader.read_literal_quad()?;

    let (dims, feature, metric, normalize) = unpack4(word.a);
    let Some(dims) = dimensions(frame, OpcodeKind::TexVoronoi, dims)? else {
        return Ok(());
    };
    let Some(feature) = frame.decode(OpcodeKind::TexVoronoi, feature, VoronoiFeature::from_u32)?
    else {
        return Ok(());
    };
    let Some(metric) = frame.decode(OpcodeKind::TexVoronoi, metric, VoronoiMetric::from_u32)? else {
        return Ok(());
    };
    let (vector, w, scale, detail) = unpack4(word.b);
    let (roughness, lacunarity, smoothness, exponent) = unpack4(word.c);
    let (randomness, distance_out, color_out, position_out) = unpack4(routing);
    let (w_out, radius_out) = unpack2(extra);

    let p = coordinate(frame, vector);
    let stack = &mut *frame.stack;
    let w = stack.load_scalar_or(w, dw);
    let params = VoronoiParams::new(
        feature,
        metric,
        stack.load_scalar_or(scale, dscale),
        stack.load_scalar_or(detail, ddetail),
        stack.load_scalar_or(roughness, droughness),
        stack.load_scalar_or(lacunarity, dlacunarity),
        stack.load_scalar_or(smoothness, dsmoothness),
        stack.load_scalar_or(exponent, dexponent),
        stack.load_scalar_or(randomness, drandomness),
        normalize != 0,
    );

    let result = with_coord!(dims, p, w, |coord| voronoi_texture(coord, &params));
    if feature == VoronoiFeature::NSphereRadius {
        stack.store_scalar(radius_out, result.distance);
    } else {
        stack.store_scalar(distance_out, result.distance);
    }
    stack.store_vector(color_out, result.color);
    stack.store_vector(position_out, result.position.truncate());
    stack.store_scalar(w_out, result.position.w);
    Ok(())
}

pub(crate) fn handle_tex_musgrave(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [out, _, _, _] = frame.reader.read_instruction()?.to_fields();
    let [dw, dscale, ddetail, ddimension] = frame.reader.read_literal_quad()?;
    let [dlacunarity, doffset, dgain, _] = frame.reader.read_literal_quad()?;

    let (dims, kind) = unpack2(word.a);
    let Some(dims) = dimensions(frame, OpcodeKind::TexMusgrave, dims)? else {
        return Ok(());
    };
    let Some(kind) = frame.decode(OpcodeKind::TexMusgrave, kind, NoiseType::from_u32)? else {
        return Ok(());
    };
    let (vector, w, scale, detail) = unpack4(word.b);
    let (dimension, lacunarity, offset, gain) = unpack4(word.c);

    let p = coordinate(frame, vector);
    let stack = &mut *frame.stack;
    let scale = stack.load_scalar_or(scale, dscale);
    let w = stack.load_scalar_or(w, dw) * scale;
    let p = p * scale;
    let dimension = stack.load_scalar_or(dimension, ddimension);
    let params = FractalParams {
        kind,
        detail: stack.load_scalar_or(detail, ddetail),
        roughness: 0.0,
        lacunarity: stack.load_scalar_or(lacunarity, dlacunarity),
        offset: stack.load_scalar_or(offset, doffset),
        gain: stack.load_scalar_or(gain, dgain),
        normalize: false,
    };

    let value = with_coord!(dims, p, w, |coord| musgrave_texture(coord, &params, dimension));
    stack.store_scalar(out, value);
    Ok(())
}

pub(crate) fn handle_tex_white_noise(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let Some(dims) = dimensions(frame, OpcodeKind::TexWhiteNoise, word.a)? else {
        return Ok(());
    };
    let (vector, w, value_out, color_out) = unpack4(word.b);
    let p = coordinate(frame, vector);
    let w = frame.stack.load_scalar_or(w, 0.0);
    let (value, color) = white_noise(dims, p, w);
    frame.stack.store_scalar(value_out, value);
    frame.stack.store_vector(color_out, color);
    Ok(())
}

pub(crate) fn handle_tex_wave(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [routing, _, _, _] = frame.reader.read_instruction()?.to_fields();
    let [dscale, ddistortion, ddetail, ddetail_scale] = frame.reader.read_literal_quad()?;
    let [ddetail_roughness, dphase, _, _] = frame.reader.read_literal_quad()?;

    let (kind, bands, rings, profile) = unpack4(word.a);
    let op = OpcodeKind::TexWave;
    let Some(kind) = frame.decode(op, kind, WaveType::from_u32)? else {
        return Ok(());
    };
    let Some(bands_direction) = frame.decode(op, bands, WaveBandsDirection::from_u32)? else {
        return Ok(());
    };
    let Some(rings_direction) = frame.decode(op, rings, WaveRingsDirection::from_u32)? else {
        return Ok(());
    };
    let Some(profile) = frame.decode(op, profile, WaveProfile::from_u32)? else {
        return Ok(());
    };
    let (vector, scale, distortion, detail) = unpack4(word.b);
    let (detail_scale, detail_roughness, phase) = unpack3(word.c);
    let (fac_out, color_out) = unpack2(routing);

    let p = coordinate(frame, vector);
    let stack = &mut *frame.stack;
    let scale = stack.load_scalar_or(scale, dscale);
    let params = WaveParams {
        kind,
        bands_direction,
        rings_direction,
        profile,
        distortion: stack.load_scalar_or(distortion, ddistortion),
        detail: stack.load_scalar_or(detail, ddetail),
        detail_scale: stack.load_scalar_or(detail_scale, ddetail_scale),
        detail_roughness: stack.load_scalar_or(detail_roughness, ddetail_roughness),
        phase: stack.load_scalar_or(phase, dphase),
    };
    let f = wave(p * scale, &params);
    stack.store_scalar(fac_out, f);
    stack.store_vector(color_out, Float3::splat(f));
    Ok(())
}

/// Brick texture.
///
/// # Operands
/// - a: `vector`, `color1`, `color2`, `mortar` registers
/// - b: `scale`, `mortar_size`, `bias`, `brick_width` registers
/// - c: `row_height` register, color and fac outputs, `mortar_smooth` register
/// - raw word: offset frequency, squash frequency, offset amount and squash
///   amount (float bits)
/// - literal words: `color1`/`scale`, `color2`/`mortar_size`, `mortar`/`bias`,
///   then `brick_width`, `row_height`, `mortar_smooth`
pub(crate) fn handle_tex_brick(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [offset_frequency, squash_frequency, offset_amount, squash_amount] =
        frame.reader.read_instruction()?.to_fields();
    let (dcolor1, dscale) = frame.reader.read_literal_vector()?;
    let (dcolor2, dmortar_size) = frame.reader.read_literal_vector()?;
    let (dmortar, dbias) = frame.reader.read_literal_vector()?;
    let [dbrick_width, drow_height, dmortar_smooth, _] = frame.reader.read_literal_quad()?;

    let (vector, color1, color2, mortar) = unpack4(word.a);
    let (scale, mortar_size, bias, brick_width) = unpack4(word.b);
    let (row_height, color_out, fac_out, mortar_smooth) = unpack4(word.c);

    let p = coordinate(frame, vector);
    let stack = &mut *frame.stack;
    let color1 = stack.load_vector_or(color1, dcolor1);
    let color2 = stack.load_vector_or(color2, dcolor2);
    let mortar = stack.load_vector_or(mortar, dmortar);
    let scale = stack.load_scalar_or(scale, dscale);
    let params = BrickParams {
        mortar_size: stack.load_scalar_or(mortar_size, dmortar_size),
        mortar_smooth: stack.load_scalar_or(mortar_smooth, dmortar_smooth),
        bias: stack.load_scalar_or(bias, dbias),
        brick_width: stack.load_scalar_or(brick_width, dbrick_width),
        row_height: stack.load_scalar_or(row_height, drow_height),
        offset_amount: bits_float(offset_amount),
        offset_frequency: offset_frequency as i32,
        squash_amount: bits_float(squash_amount),
        squash_frequency: squash_frequency as i32,
    };

    let (tint, f) = brick(p * scale, &params);
    let brick_color = if f != 1.0 {
        color1 * (1.0 - tint) + color2 * tint
    } else {
        color1
    };
    stack.store_vector(color_out, brick_color.mix(mortar, f));
    stack.store_scalar(fac_out, f);
    Ok(())
}

pub(crate) fn handle_tex_magic(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [dscale, ddistortion, _, _] = frame.reader.read_literal_quad()?;
    let (depth, color_out, fac_out) = unpack3(word.a);
    let (vector, scale, distortion) = unpack3(word.b);

    let p = coordinate(frame, vector);
    let stack = &mut *frame.stack;
    let scale = stack.load_scalar_or(scale, dscale);
    let distortion = stack.load_scalar_or(distortion, ddistortion);
    let color = magic(p * scale, depth as i32, distortion);
    stack.store_vector(color_out, color);
    stack.store_scalar(fac_out, color.average());
    Ok(())
}

pub(crate) fn handle_tex_checker(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor1, dscale) = frame.reader.read_literal_vector()?;
    let (dcolor2, _) = frame.reader.read_literal_vector()?;
    let (vector, color1, color2, scale) = unpack4(word.a);
    let (color_out, fac_out) = unpack2(word.b);

    let p = coordinate(frame, vector);
    let stack = &mut *frame.stack;
    let scale = stack.load_scalar_or(scale, dscale);
    let f = checker(p * scale);
    let color = if f == 1.0 {
        stack.load_vector_or(color1, dcolor1)
    } else {
        stack.load_vector_or(color2, dcolor2)
    };
    stack.store_vector(color_out, color);
    stack.store_scalar(fac_out, f);
    Ok(())
}

pub(crate) fn handle_tex_gradient(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let Some(kind) = frame.decode(OpcodeKind::TexGradient, word.a, GradientType::from_u32)? else {
        return Ok(());
    };
    let (vector, fac_out, color_out) = unpack3(word.b);
    let p = coordinate(frame, vector);
    let f = saturate(gradient(kind, p));
    frame.stack.store_scalar(fac_out, f);
    frame.stack.store_vector(color_out, Float3::splat(f));
    Ok(())
}

/// Image texture through the environment.
///
/// An unconnected coordinate samples at the surface uv. A handle the
/// environment can't resolve yields [`MISSING_TEXTURE_COLOR`].
pub(crate) fn handle_tex_image(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (vector, color_out, alpha_out) = unpack3(word.b);
    let uv = frame.point.uv;
    let coords = frame
        .stack
        .load_vector_or(vector, Float3::new(uv.x, uv.y, 0.0));
    let sample = frame
        .env
        .sample_texture(TextureHandle(word.a), coords)
        .unwrap_or(MISSING_TEXTURE_COLOR);
    frame.stack.store_vector(color_out, sample.truncate());
    frame.stack.store_scalar(alpha_out, sample.w);
    Ok(())
}
