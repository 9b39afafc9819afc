//! Instruction words and operand packing.
//!
//! Every instruction is four 32-bit fields. The first field of the first
//! word selects the opcode; the other fields carry packed byte operands
//! (register offsets, small enum values) or raw scalar bits. Multi-word
//! instructions follow with extra words that are either raw fields or
//! literal quads (four `f32` stored bit-for-bit).
//!
//! Byte operands are packed little-endian: `pack(a, b, c, d)` stores `a` in
//! the low byte.

use serde::{Deserialize, Serialize};
use umbra_foundation::{Float3, Float4};

use crate::error::{Result, VmError};

/// Register offset meaning "input not connected" / "output not requested".
pub const UNCONNECTED: u32 = 255;

/// Whether a register operand refers to a real register.
#[inline]
pub const fn is_connected(offset: u32) -> bool {
    offset != UNCONNECTED
}

/// One 128-bit instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Instruction {
    pub opcode: u32,
    pub a: u32,
    pub b: u32,
    pub c: u32,
}

impl Instruction {
    pub const fn new(opcode: u32, a: u32, b: u32, c: u32) -> Self {
        Self { opcode, a, b, c }
    }

    /// A literal quad: four floats stored bit-for-bit.
    pub fn literal(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self::new(x.to_bits(), y.to_bits(), z.to_bits(), w.to_bits())
    }

    pub fn literal_vector(v: Float3, w: f32) -> Self {
        Self::literal(v.x, v.y, v.z, w)
    }

    /// Reinterpret all four fields as floats.
    pub fn as_floats(self) -> [f32; 4] {
        [
            f32::from_bits(self.opcode),
            f32::from_bits(self.a),
            f32::from_bits(self.b),
            f32::from_bits(self.c),
        ]
    }

    pub const fn to_fields(self) -> [u32; 4] {
        [self.opcode, self.a, self.b, self.c]
    }

    pub const fn from_fields(fields: [u32; 4]) -> Self {
        Self::new(fields[0], fields[1], fields[2], fields[3])
    }
}

// === Byte packing ===

#[inline]
pub const fn pack(a: u32, b: u32, c: u32, d: u32) -> u32 {
    (a & 0xff) | ((b & 0xff) << 8) | ((c & 0xff) << 16) | ((d & 0xff) << 24)
}

#[inline]
pub const fn unpack2(field: u32) -> (u32, u32) {
    (field & 0xff, (field >> 8) & 0xff)
}

#[inline]
pub const fn unpack3(field: u32) -> (u32, u32, u32) {
    (field & 0xff, (field >> 8) & 0xff, (field >> 16) & 0xff)
}

#[inline]
pub const fn unpack4(field: u32) -> (u32, u32, u32, u32) {
    (
        field & 0xff,
        (field >> 8) & 0xff,
        (field >> 16) & 0xff,
        (field >> 24) & 0xff,
    )
}

#[inline]
pub fn float_bits(value: f32) -> u32 {
    value.to_bits()
}

#[inline]
pub fn bits_float(field: u32) -> f32 {
    f32::from_bits(field)
}

// === Cursor ===

/// Forward-only cursor over an instruction stream.
///
/// Reads never index past the end; a read that would is reported as
/// [`VmError::CursorOutOfBounds`].
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    words: &'a [Instruction],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(words: &'a [Instruction], offset: usize) -> Self {
        Self { words, offset }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Return the word at the cursor and advance by one.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::CursorOutOfBounds`] at the end of the stream.
    #[inline]
    pub fn read_instruction(&mut self) -> Result<Instruction> {
        let word = self
            .words
            .get(self.offset)
            .copied()
            .ok_or(VmError::CursorOutOfBounds {
                offset: self.offset,
                len: self.words.len(),
            })?;
        self.offset += 1;
        Ok(word)
    }

    /// Read the next word as four floats.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::CursorOutOfBounds`] at the end of the stream.
    #[inline]
    pub fn read_literal_quad(&mut self) -> Result<[f32; 4]> {
        self.read_instruction().map(Instruction::as_floats)
    }

    /// Read the next word as a vector (xyz) plus a trailing scalar (w).
    pub fn read_literal_vector(&mut self) -> Result<(Float3, f32)> {
        let [x, y, z, w] = self.read_literal_quad()?;
        Ok((Float3::new(x, y, z), w))
    }

    pub fn read_literal_float4(&mut self) -> Result<Float4> {
        let [x, y, z, w] = self.read_literal_quad()?;
        Ok(Float4::new(x, y, z, w))
    }

    /// Move the cursor to an absolute word offset.
    ///
    /// Seeking to the end of the stream is allowed; the next read fails.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::CursorOutOfBounds`] past the end of the stream.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.words.len() {
            return Err(VmError::CursorOutOfBounds {
                offset,
                len: self.words.len(),
            });
        }
        self.offset = offset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_is_little_endian() {
        let field = pack(1, 2, 3, 4);
        assert_eq!(field, 0x0403_0201);
        assert_eq!(unpack4(field), (1, 2, 3, 4));
        assert_eq!(unpack3(field), (1, 2, 3));
        assert_eq!(unpack2(field), (1, 2));
    }

    #[test]
    fn test_pack_masks_each_byte() {
        assert_eq!(unpack2(pack(0x1ff, UNCONNECTED, 0, 0)), (0xff, UNCONNECTED));
    }

    #[test]
    fn test_literal_keeps_bits() {
        let word = Instruction::literal(0.5, -1.0, f32::MIN_POSITIVE, 3.25);
        assert_eq!(word.as_floats(), [0.5, -1.0, f32::MIN_POSITIVE, 3.25]);
    }

    #[test]
    fn test_reader_advances_and_stops() {
        let words = [Instruction::new(1, 2, 3, 4), Instruction::literal(1.0, 2.0, 3.0, 4.0)];
        let mut reader = Reader::new(&words, 0);
        assert_eq!(reader.read_instruction().unwrap(), words[0]);
        let (v, w) = reader.read_literal_vector().unwrap();
        assert_eq!(v, Float3::new(1.0, 2.0, 3.0));
        assert_eq!(w, 4.0);
        assert!(matches!(
            reader.read_instruction(),
            Err(VmError::CursorOutOfBounds { offset: 2, len: 2 })
        ));
        assert!(reader.seek(3).is_err());
        reader.seek(0).unwrap();
        assert_eq!(reader.offset(), 0);
    }
}
