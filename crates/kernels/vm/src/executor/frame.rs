//! Per-invocation state handed to every opcode handler.

use tracing::warn;
use umbra_foundation::{Float3, Float4};

use crate::closure::{ArenaError, ClosureArena, ClosureRef};
use crate::config::ErrorPolicy;
use crate::encoding::Reader;
use crate::environment::{ShaderEnvironment, ShadingPoint};
use crate::error::{Result, VmError};
use crate::opcode::OpcodeKind;
use crate::program::ShaderKind;
use crate::stack::Stack;

/// Everything a handler may read or write during one invocation.
///
/// On entry to a handler the reader sits one word past the instruction's
/// first word; multi-word handlers read their trailing words from it. The
/// dispatch loop repositions the reader afterwards, so a handler that returns
/// early never desynchronizes the stream.
pub struct Frame<'a> {
    pub(crate) reader: Reader<'a>,
    pub(crate) stack: &'a mut Stack,
    pub(crate) arena: &'a mut ClosureArena,
    pub(crate) slots: &'a mut [Option<ClosureRef>],
    /// Scratch storage for ramp and curve tables.
    pub(crate) table: &'a mut Vec<Float4>,
    pub(crate) env: &'a dyn ShaderEnvironment,
    /// Shading point as seen by the program; bump evaluation moves its
    /// position.
    pub(crate) point: ShadingPoint,
    pub(crate) kind: ShaderKind,
    pub(crate) policy: ErrorPolicy,
    pub(crate) aov: Option<&'a mut [f32]>,

    /// Word offset of the instruction being executed.
    pub(crate) start: usize,
    pub(crate) executed: u64,
    pub(crate) jump_target: Option<usize>,
    pub(crate) halted: bool,

    pub(crate) closure: Option<ClosureRef>,
    pub(crate) displacement: Option<Float3>,
    pub(crate) violations: Vec<VmError>,
}

impl<'a> Frame<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        reader: Reader<'a>,
        stack: &'a mut Stack,
        arena: &'a mut ClosureArena,
        slots: &'a mut [Option<ClosureRef>],
        table: &'a mut Vec<Float4>,
        env: &'a dyn ShaderEnvironment,
        kind: ShaderKind,
        policy: ErrorPolicy,
        aov: Option<&'a mut [f32]>,
    ) -> Self {
        Self {
            reader,
            stack,
            arena,
            slots,
            table,
            point: env.shading_point(),
            env,
            kind,
            policy,
            aov,
            start: 0,
            executed: 0,
            jump_target: None,
            halted: false,
            closure: None,
            displacement: None,
            violations: Vec::new(),
        }
    }

    /// Report a recoverable contract violation.
    ///
    /// # Errors
    ///
    /// Under [`ErrorPolicy::Strict`] the violation is returned; under
    /// [`ErrorPolicy::Degrade`] it is recorded and execution continues.
    pub(crate) fn violation(&mut self, err: VmError) -> Result<()> {
        match self.policy {
            ErrorPolicy::Strict => Err(err),
            ErrorPolicy::Degrade => {
                warn!(offset = self.start, error = %err, "degraded shader invocation");
                self.violations.push(err);
                Ok(())
            }
        }
    }

    /// Decode an enum operand, reporting unknown values.
    ///
    /// `Ok(None)` means the value was invalid and degraded; the handler
    /// should then leave its outputs untouched.
    pub(crate) fn decode<T>(
        &mut self,
        opcode: OpcodeKind,
        value: u32,
        from_u32: fn(u32) -> Option<T>,
    ) -> Result<Option<T>> {
        match from_u32(value) {
            Some(decoded) => Ok(Some(decoded)),
            None => {
                self.violation(VmError::InvalidOperand {
                    opcode: opcode.name(),
                    value,
                })?;
                Ok(None)
            }
        }
    }

    /// Continue at `skip` words past the current instruction.
    pub(crate) fn jump(&mut self, skip: u32) {
        self.jump_target = Some(self.start + 1 + skip as usize);
    }

    /// Read `len` RGBA words into the scratch table.
    pub(crate) fn read_table(&mut self, len: u32) -> Result<&[Float4]> {
        self.table.clear();
        for _ in 0..len {
            let entry = self.reader.read_literal_float4()?;
            self.table.push(entry);
        }
        Ok(self.table.as_slice())
    }

    // === Closure slots ===

    fn slot_index(&mut self, slot: u32) -> Result<Option<usize>> {
        if (slot as usize) < self.slots.len() {
            return Ok(Some(slot as usize));
        }
        self.violation(VmError::ClosureSlotOutOfRange {
            slot,
            slots: self.slots.len(),
        })?;
        Ok(None)
    }

    /// Closure held in `slot`; an out-of-range slot reads as no closure.
    pub(crate) fn load_closure(&mut self, slot: u32) -> Result<Option<ClosureRef>> {
        Ok(self.slot_index(slot)?.and_then(|index| self.slots[index]))
    }

    pub(crate) fn store_closure(&mut self, slot: u32, closure: Option<ClosureRef>) -> Result<()> {
        if let Some(index) = self.slot_index(slot)? {
            self.slots[index] = closure;
        }
        Ok(())
    }

    /// Unwrap an arena result; exhaustion degrades to no closure.
    pub(crate) fn allocated(
        &mut self,
        result: std::result::Result<Option<ClosureRef>, ArenaError>,
    ) -> Result<Option<ClosureRef>> {
        match result {
            Ok(closure) => Ok(closure),
            Err(err) => {
                self.violation(err.into())?;
                Ok(None)
            }
        }
    }
}
