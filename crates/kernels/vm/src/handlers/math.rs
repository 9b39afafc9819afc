use umbra_foundation::Float3;
use umbra_nodes::math::{
    clamp_node, map_range, math, mix_float, mix_vector, vector_math, ClampType, MapRange,
    MapRangeType,
};
use umbra_nodes::{MathOp, VectorMathOp};

use crate::encoding::{unpack2, unpack3, unpack4, Instruction};
use crate::error::Result;
use crate::executor::Frame;
use crate::opcode::{MixKind, OpcodeKind};

/// Scalar math.
///
/// # Operands
/// - a: [`MathOp`]
/// - b: `a`, `b`, `c` input registers and the output register
/// - literal word: defaults for `a`, `b`, `c`
pub(crate) fn handle_math(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [da, db, dc, _] = frame.reader.read_literal_quad()?;
    let Some(op) = frame.decode(OpcodeKind::Math, word.a, MathOp::from_u32)? else {
        return Ok(());
    };
    let (a, b, c, out) = unpack4(word.b);
    let stack = &mut *frame.stack;
    let value = math(
        op,
        stack.load_scalar_or(a, da),
        stack.load_scalar_or(b, db),
        stack.load_scalar_or(c, dc),
    );
    stack.store_scalar(out, value);
    Ok(())
}

/// Vector math; writes the scalar and vector result to separate outputs.
pub(crate) fn handle_vector_math(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (da, dscale) = frame.reader.read_literal_vector()?;
    let (db, _) = frame.reader.read_literal_vector()?;
    let (dc, _) = frame.reader.read_literal_vector()?;
    let Some(op) = frame.decode(OpcodeKind::VectorMath, word.a, VectorMathOp::from_u32)? else {
        return Ok(());
    };
    let (a, b, c, scale) = unpack4(word.b);
    let (value_out, vector_out) = unpack2(word.c);

    let stack = &mut *frame.stack;
    let result = vector_math(
        op,
        stack.load_vector_or(a, da),
        stack.load_vector_or(b, db),
        stack.load_vector_or(c, dc),
        stack.load_scalar_or(scale, dscale),
    );
    stack.store_scalar(value_out, result.value);
    stack.store_vector(vector_out, result.vector);
    Ok(())
}

pub(crate) fn handle_clamp(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [dvalue, dmin, dmax, _] = frame.reader.read_literal_quad()?;
    let (kind, out) = unpack2(word.a);
    let Some(kind) = frame.decode(OpcodeKind::Clamp, kind, ClampType::from_u32)? else {
        return Ok(());
    };
    let (value, min, max) = unpack3(word.b);
    let stack = &mut *frame.stack;
    let result = clamp_node(
        kind,
        stack.load_scalar_or(value, dvalue),
        stack.load_scalar_or(min, dmin),
        stack.load_scalar_or(max, dmax),
    );
    stack.store_scalar(out, result);
    Ok(())
}

pub(crate) fn handle_map_range(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [dvalue, dfrom_min, dfrom_max, dto_min] = frame.reader.read_literal_quad()?;
    let [dto_max, dsteps, _, _] = frame.reader.read_literal_quad()?;
    let (kind, clamp, out) = unpack3(word.a);
    let Some(kind) = frame.decode(OpcodeKind::MapRange, kind, MapRangeType::from_u32)? else {
        return Ok(());
    };
    let (value, from_min, from_max, to_min) = unpack4(word.b);
    let (to_max, steps) = unpack2(word.c);

    let stack = &mut *frame.stack;
    let range = MapRange {
        from_min: stack.load_scalar_or(from_min, dfrom_min),
        from_max: stack.load_scalar_or(from_max, dfrom_max),
        to_min: stack.load_scalar_or(to_min, dto_min),
        to_max: stack.load_scalar_or(to_max, dto_max),
        steps: stack.load_scalar_or(steps, dsteps),
        clamp: clamp != 0,
    };
    let result = map_range(kind, stack.load_scalar_or(value, dvalue), &range);
    stack.store_scalar(out, result);
    Ok(())
}

/// Float / vector linear interpolation.
pub(crate) fn handle_mix_value(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (da, dfac) = frame.reader.read_literal_vector()?;
    let (db, _) = frame.reader.read_literal_vector()?;
    let (kind, clamp, out) = unpack3(word.a);
    let Some(kind) = frame.decode(OpcodeKind::MixValue, kind, MixKind::from_u32)? else {
        return Ok(());
    };
    let (fac, a, b) = unpack3(word.b);
    let clamp = clamp != 0;

    let stack = &mut *frame.stack;
    match kind {
        MixKind::Float => {
            let result = mix_float(
                stack.load_scalar_or(a, da.x),
                stack.load_scalar_or(b, db.x),
                stack.load_scalar_or(fac, dfac),
                clamp,
            );
            stack.store_scalar(out, result);
        }
        MixKind::Vector | MixKind::VectorNonUniform => {
            let t = if kind == MixKind::Vector {
                Float3::splat(stack.load_scalar_or(fac, dfac))
            } else {
                stack.load_vector_or(fac, Float3::splat(dfac))
            };
            let (a, b) = (stack.load_vector_or(a, da), stack.load_vector_or(b, db));
            let result = mix_vector(a, b, t, clamp);
            stack.store_vector(out, result);
        }
    }
    Ok(())
}

pub(crate) fn handle_separate_vector(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dvalue, _) = frame.reader.read_literal_vector()?;
    let (x, y, z) = unpack3(word.b);
    let stack = &mut *frame.stack;
    let value = stack.load_vector_or(word.a, dvalue);
    stack.store_scalar(x, value.x);
    stack.store_scalar(y, value.y);
    stack.store_scalar(z, value.z);
    Ok(())
}

pub(crate) fn handle_combine_vector(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let [dx, dy, dz, _] = frame.reader.read_literal_quad()?;
    let (x, y, z, out) = unpack4(word.a);
    let stack = &mut *frame.stack;
    let value = Float3::new(
        stack.load_scalar_or(x, dx),
        stack.load_scalar_or(y, dy),
        stack.load_scalar_or(z, dz),
    );
    stack.store_vector(out, value);
    Ok(())
}
