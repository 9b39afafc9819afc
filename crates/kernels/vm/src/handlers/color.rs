use umbra_foundation::Float3;
use umbra_nodes::color::{
    blend_clamped, bright_contrast, combine_color, gamma, hue_saturation, invert, luminance,
    separate_color, ColorModel,
};
use umbra_nodes::ramp::{curves, float_curve, rgb_ramp_lookup};
use umbra_nodes::BlendMode;

use crate::encoding::{unpack2, unpack3, unpack4, Instruction};
use crate::error::Result;
use crate::executor::Frame;
use crate::opcode::{CurveKind, OpcodeKind};

/// Color blend.
///
/// # Operands
/// - a: [`BlendMode`], clamp flag, output register
/// - b: `fac`, `color1`, `color2` registers
/// - literal words: `color1` with `fac` in w, then `color2`
pub(crate) fn handle_mix(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dc1, dfac) = frame.reader.read_literal_vector()?;
    let (dc2, _) = frame.reader.read_literal_vector()?;
    let (mode, clamp, out) = unpack3(word.a);
    let Some(mode) = frame.decode(OpcodeKind::Mix, mode, BlendMode::from_u32)? else {
        return Ok(());
    };
    let (fac, c1, c2) = unpack3(word.b);
    let stack = &mut *frame.stack;
    let result = blend_clamped(
        mode,
        stack.load_scalar_or(fac, dfac),
        stack.load_vector_or(c1, dc1),
        stack.load_vector_or(c2, dc2),
        clamp != 0,
    );
    stack.store_vector(out, result);
    Ok(())
}

pub(crate) fn handle_gamma(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor, dgamma) = frame.reader.read_literal_vector()?;
    let (color, exponent, out) = unpack3(word.a);
    let stack = &mut *frame.stack;
    let result = gamma(
        stack.load_vector_or(color, dcolor),
        stack.load_scalar_or(exponent, dgamma),
    );
    stack.store_vector(out, result);
    Ok(())
}

pub(crate) fn handle_bright_contrast(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor, dbright) = frame.reader.read_literal_vector()?;
    let [dcontrast, _, _, _] = frame.reader.read_literal_quad()?;
    let (color, bright, contrast, out) = unpack4(word.a);
    let stack = &mut *frame.stack;
    let result = bright_contrast(
        stack.load_vector_or(color, dcolor),
        stack.load_scalar_or(bright, dbright),
        stack.load_scalar_or(contrast, dcontrast),
    );
    stack.store_vector(out, result);
    Ok(())
}

pub(crate) fn handle_invert(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor, dfac) = frame.reader.read_literal_vector()?;
    let (fac, color, out) = unpack3(word.a);
    let stack = &mut *frame.stack;
    let result = invert(
        stack.load_vector_or(color, dcolor),
        stack.load_scalar_or(fac, dfac),
    );
    stack.store_vector(out, result);
    Ok(())
}

pub(crate) fn handle_hue_saturation(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [dhue, dsat, dval, dfac] = frame.reader.read_literal_quad()?;
    let (dcolor, _) = frame.reader.read_literal_vector()?;
    let (hue, saturation, value, fac) = unpack4(word.a);
    let (color, out) = unpack2(word.b);
    let stack = &mut *frame.stack;
    let result = hue_saturation(
        stack.load_vector_or(color, dcolor),
        stack.load_scalar_or(hue, dhue),
        stack.load_scalar_or(saturation, dsat),
        stack.load_scalar_or(value, dval),
        stack.load_scalar_or(fac, dfac),
    );
    stack.store_vector(out, result);
    Ok(())
}

pub(crate) fn handle_separate_color(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor, _) = frame.reader.read_literal_vector()?;
    let Some(model) = frame.decode(OpcodeKind::SeparateColor, word.a, ColorModel::from_u32)? else {
        return Ok(());
    };
    let (color, r, g, b) = unpack4(word.b);
    let stack = &mut *frame.stack;
    let channels = separate_color(model, stack.load_vector_or(color, dcolor));
    stack.store_scalar(r, channels.x);
    stack.store_scalar(g, channels.y);
    stack.store_scalar(b, channels.z);
    Ok(())
}

pub(crate) fn handle_combine_color(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [dr, dg, db, _] = frame.reader.read_literal_quad()?;
    let Some(model) = frame.decode(OpcodeKind::CombineColor, word.a, ColorModel::from_u32)? else {
        return Ok(());
    };
    let (r, g, b, out) = unpack4(word.b);
    let stack = &mut *frame.stack;
    let channels = Float3::new(
        stack.load_scalar_or(r, dr),
        stack.load_scalar_or(g, dg),
        stack.load_scalar_or(b, db),
    );
    stack.store_vector(out, combine_color(model, channels));
    Ok(())
}

pub(crate) fn handle_rgb_to_bw(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let value = luminance(frame.stack.load_vector_or(word.a, Float3::ZERO));
    frame.stack.store_scalar(word.b, value);
    Ok(())
}

/// Color ramp lookup.
///
/// # Operands
/// - a: `fac` register, color and alpha outputs, interpolate flag
/// - b: table length `n`
/// - c: extrapolate flag
/// - `n` words of RGBA samples
pub(crate) fn handle_rgb_ramp(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (fac, color_out, alpha_out, interpolate) = unpack4(word.a);
    let f = frame.stack.load_scalar_or(fac, 0.0);
    let sample = rgb_ramp_lookup(frame.read_table(word.b)?, f, interpolate != 0, word.c != 0);
    frame.stack.store_vector(color_out, sample.truncate());
    frame.stack.store_scalar(alpha_out, sample.w);
    Ok(())
}

/// RGB, vector or float curves over an `n`-sample table.
pub(crate) fn handle_curves(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [min_x, max_x, dfac, _] = frame.reader.read_literal_quad()?;
    let (fac, input, out, extrapolate) = unpack4(word.b);
    let fac = frame.stack.load_scalar_or(fac, dfac);
    let extrapolate = extrapolate != 0;

    let Some(kind) = frame.decode(OpcodeKind::Curves, word.a, CurveKind::from_u32)? else {
        return Ok(());
    };
    match kind {
        CurveKind::Rgb | CurveKind::Vector => {
            let value = frame.stack.load_vector_or(input, Float3::ZERO);
            let result = curves(frame.read_table(word.c)?, value, min_x, max_x, fac, extrapolate);
            frame.stack.store_vector(out, result);
        }
        CurveKind::Float => {
            let value = frame.stack.load_scalar_or(input, 0.0);
            let table = frame.read_table(word.c)?;
            let result = float_curve(table, value, min_x, max_x, fac, extrapolate);
            frame.stack.store_scalar(out, result);
        }
    }
    Ok(())
}
