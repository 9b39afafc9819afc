use crate::encoding::Instruction;
use crate::error::Result;
use crate::executor::Frame;
use crate::opcode::NO_ENTRY;
use crate::program::ShaderKind;

pub(crate) fn handle_end(_word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    frame.halted = true;
    Ok(())
}

/// Stand-in for opcodes outside the dispatch table's feature mask.
pub(crate) fn handle_disabled(_word: Instruction, _frame: &mut Frame<'_>) -> Result<()> {
    Ok(())
}

/// Jump to the graph of the running shader kind; a kind without a graph
/// ends the invocation.
pub(crate) fn handle_select_entry(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let target = match frame.kind {
        ShaderKind::Surface => word.a,
        ShaderKind::Volume => word.b,
        ShaderKind::Displacement => word.c,
    };
    if target == NO_ENTRY {
        frame.halted = true;
    } else {
        frame.jump_target = Some(target as usize);
    }
    Ok(())
}

pub(crate) fn handle_jump_if_zero(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    if frame.stack.load_scalar_or(word.a, 0.0) <= 0.0 {
        frame.jump(word.b);
    }
    Ok(())
}

pub(crate) fn handle_jump_if_one(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    if frame.stack.load_scalar_or(word.a, 0.0) >= 1.0 {
        frame.jump(word.b);
    }
    Ok(())
}
