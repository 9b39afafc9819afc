use umbra_foundation::Float3;

use crate::encoding::{unpack2, Instruction};
use crate::error::{Result, VmError};
use crate::executor::Frame;
use crate::opcode::{AovKind, OpcodeKind};

/// Write a value or color into the invocation's AOV region.
///
/// Without an AOV region the write is dropped.
pub(crate) fn handle_aov_output(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (kind, input) = unpack2(word.a);
    let Some(kind) = frame.decode(OpcodeKind::AovOutput, kind, AovKind::from_u32)? else {
        return Ok(());
    };
    let values = match kind {
        AovKind::Value => [frame.stack.load_scalar_or(input, 0.0), 0.0, 0.0],
        AovKind::Color => frame.stack.load_vector_or(input, Float3::ZERO).to_array(),
    };
    let width = match kind {
        AovKind::Value => 1,
        AovKind::Color => 3,
    };

    let Some(aov) = frame.aov.as_deref_mut() else {
        return Ok(());
    };
    let start = word.b as usize;
    match aov.get_mut(start..start.saturating_add(width)) {
        Some(region) => {
            region.copy_from_slice(&values[..width]);
            Ok(())
        }
        None => {
            let len = aov.len();
            frame.violation(VmError::AovOutOfRange {
                index: word.b,
                len,
            })
        }
    }
}
