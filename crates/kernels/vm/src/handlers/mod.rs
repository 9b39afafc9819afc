//! Opcode handlers.
//!
//! Each handler receives the first word of its instruction and the
//! invocation [`Frame`]. Register offsets come packed four to a field (see
//! [`unpack4`](crate::encoding::unpack4)); literal defaults for unconnected
//! inputs follow in trailing words. Operand layouts are documented on
//! [`OpcodeKind`](crate::OpcodeKind).

pub(crate) mod closure;
pub(crate) mod color;
pub(crate) mod control;
pub(crate) mod geometry;
pub(crate) mod math;
pub(crate) mod output;
pub(crate) mod texture;
pub(crate) mod value;

use crate::encoding::Instruction;
use crate::error::Result;
use crate::executor::Frame;

/// Functional interface for an opcode handler.
pub type Handler = fn(Instruction, &mut Frame<'_>) -> Result<()>;
