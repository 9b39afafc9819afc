use umbra_foundation::Float3;
use umbra_nodes::color::luminance;

use crate::encoding::{bits_float, Instruction};
use crate::error::Result;
use crate::executor::Frame;
use crate::opcode::{ConvertKind, OpcodeKind};

pub(crate) fn handle_value_scalar(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    frame.stack.store_scalar(word.a, bits_float(word.b));
    Ok(())
}

pub(crate) fn handle_value_vector(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let (value, _) = frame.reader.read_literal_vector()?;
    frame.stack.store_vector(word.a, value);
    Ok(())
}

pub(crate) fn handle_convert(word: Instruction, frame: &mut Frame<'_>) -> Result<()> {
    let Some(kind) = frame.decode(OpcodeKind::Convert, word.a, ConvertKind::from_u32)? else {
        return Ok(());
    };
    let (input, out) = (word.b, word.c);
    match kind {
        ConvertKind::FloatToVector => {
            let value = frame.stack.load_scalar_or(input, 0.0);
            frame.stack.store_vector(out, Float3::splat(value));
        }
        ConvertKind::ColorToFloat => {
            let value = luminance(frame.stack.load_vector_or(input, Float3::ZERO));
            frame.stack.store_scalar(out, value);
        }
        ConvertKind::VectorToFloat => {
            let value = frame.stack.load_vector_or(input, Float3::ZERO).average();
            frame.stack.store_scalar(out, value);
        }
    }
    Ok(())
}
