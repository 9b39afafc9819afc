//! Closure construction and algebra over the slot bank.
//!
//! Leaves are allocated with their weight folded in; a leaf whose weight is
//! zero is never allocated and its slot reads as no closure.

use umbra_foundation::scalar::saturate;
use umbra_foundation::Float3;

use crate::closure::{ClosureKind, ClosureParams};
use crate::encoding::{bits_float, unpack3, unpack4, Instruction};
use crate::error::{Result, VmError};
use crate::executor::Frame;
use crate::opcode::OpcodeKind;

/// Decode a closure kind and check it belongs to the category `accepts`.
fn closure_kind(
    frame: &mut Frame<'_>,
    opcode: OpcodeKind,
    value: u32,
    accepts: fn(ClosureKind) -> bool,
) -> Result<Option<ClosureKind>> {
    let Some(kind) = frame.decode(opcode, value, ClosureKind::from_u32)? else {
        return Ok(None);
    };
    if accepts(kind) {
        return Ok(Some(kind));
    }
    frame.violation(VmError::InvalidOperand {
        opcode: opcode.name(),
        value,
    })?;
    Ok(None)
}

fn emit_leaf(
    frame: &mut Frame<'_>,
    kind: ClosureKind,
    out_slot: u32,
    weight: Float3,
    params: ClosureParams,
) -> Result<()> {
    let leaf = if weight.is_zero() {
        None
    } else {
        let result = frame
            .arena
            .allocate_weighted_leaf(kind, kind.param_bytes(), weight, params)
            .map(Some);
        frame.allocated(result)?
    };
    frame.store_closure(out_slot, leaf)
}

// === Leaves ===

pub(crate) fn handle_closure_bsdf(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor, droughness) = frame.reader.read_literal_vector()?;
    let [dior, danisotropy, _, _] = frame.reader.read_literal_quad()?;
    let (kind, out_slot, color, normal) = unpack4(word.a);
    let (roughness, ior, anisotropy) = unpack3(word.b);

    let Some(kind) = closure_kind(frame, OpcodeKind::ClosureBsdf, kind, ClosureKind::is_bsdf)?
    else {
        return frame.store_closure(out_slot, None);
    };
    let stack = &*frame.stack;
    let weight = stack.load_vector_or(color, dcolor);
    let params = ClosureParams {
        normal: stack.load_vector_or(normal, frame.point.normal),
        roughness: saturate(stack.load_scalar_or(roughness, droughness)),
        ior: stack.load_scalar_or(ior, dior).max(1e-5),
        anisotropy: stack.load_scalar_or(anisotropy, danisotropy).clamp(-1.0, 1.0),
    };
    emit_leaf(frame, kind, out_slot, weight, params)
}

/// Emission, background or holdout leaf weighted by `color * strength`.
pub(crate) fn handle_closure_emission(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor, dstrength) = frame.reader.read_literal_vector()?;
    let (kind, out_slot, color, strength) = unpack4(word.a);
    let Some(kind) =
        closure_kind(frame, OpcodeKind::ClosureEmission, kind, ClosureKind::is_emissive)?
    else {
        return frame.store_closure(out_slot, None);
    };
    let weight = frame.stack.load_vector_or(color, dcolor)
        * frame.stack.load_scalar_or(strength, dstrength);
    emit_leaf(frame, kind, out_slot, weight, ClosureParams::default())
}

/// Volume leaf weighted by `color * density`.
pub(crate) fn handle_closure_volume(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor, ddensity) = frame.reader.read_literal_vector()?;
    let [danisotropy, _, _, _] = frame.reader.read_literal_quad()?;
    let (kind, out_slot, color, density) = unpack4(word.a);
    let Some(kind) = closure_kind(frame, OpcodeKind::ClosureVolume, kind, ClosureKind::is_volume)?
    else {
        return frame.store_closure(out_slot, None);
    };
    let stack = &*frame.stack;
    let density = stack.load_scalar_or(density, ddensity).max(0.0);
    let weight = stack.load_vector_or(color, dcolor) * density;
    let params = ClosureParams {
        anisotropy: stack.load_scalar_or(word.b, danisotropy).clamp(-1.0, 1.0),
        ..ClosureParams::default()
    };
    emit_leaf(frame, kind, out_slot, weight, params)
}

// === Algebra ===

pub(crate) fn handle_closure_scale(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (dcolor, dscalar) = frame.reader.read_literal_vector()?;
    let (in_slot, out_slot, weight, is_color) = unpack4(word.a);
    let child = frame.load_closure(in_slot)?;
    let result = if is_color != 0 {
        let weight = frame.stack.load_vector_or(weight, dcolor);
        frame.arena.scale_by_color(child, weight)
    } else {
        let weight = frame.stack.load_scalar_or(weight, dscalar);
        frame.arena.scale_by_scalar(child, weight)
    };
    let scaled = frame.allocated(result)?;
    frame.store_closure(out_slot, scaled)
}

pub(crate) fn handle_closure_add(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (a, b, out_slot) = unpack3(word.a);
    let a = frame.load_closure(a)?;
    let b = frame.load_closure(b)?;
    let result = frame.arena.combine(a, b);
    let sum = frame.allocated(result)?;
    frame.store_closure(out_slot, sum)
}

/// `a * (1 - fac) + b * fac` with `fac` saturated.
pub(crate) fn handle_closure_mix(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (fac, a, b, out_slot) = unpack4(word.a);
    let fac = saturate(frame.stack.load_scalar_or(fac, bits_float(word.b)));
    let a = frame.load_closure(a)?;
    let b = frame.load_closure(b)?;

    let result = frame.arena.scale_by_scalar(a, 1.0 - fac);
    let a = frame.allocated(result)?;
    let result = frame.arena.scale_by_scalar(b, fac);
    let b = frame.allocated(result)?;
    let result = frame.arena.combine(a, b);
    let mixed = frame.allocated(result)?;
    frame.store_closure(out_slot, mixed)
}

pub(crate) fn handle_closure_output(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    frame.closure = frame.load_closure(word.a)?;
    Ok(())
}
