//! Shader executor: the dispatch loop over a [`Program`].
//!
//! An [`Executor`] owns everything one invocation writes (register stack,
//! closure arena, closure slots) and reuses it across invocations. Programs
//! and environments are borrowed per call, so one executor serves any number
//! of programs and shading points, one at a time.
//!
//! # Execution Model
//!
//! The cursor starts at the program's entry point for the requested shader
//! kind. Each iteration fetches the first word, decodes the opcode, and calls
//! the handler from the feature-specialized [`DispatchTable`]. The cursor
//! then moves to the jump target the handler requested, or past the
//! instruction's full width. `End` halts. Disabled opcodes run a no-op
//! handler but are still stepped over by width.

mod frame;

#[cfg(test)]
mod tests;

pub use frame::Frame;

use tracing::{trace, warn};
use umbra_foundation::{Float3, Float4};

use crate::closure::{ClosureArena, ClosureRef, ClosureTree};
use crate::config::{ConfigError, ErrorPolicy, VmConfig};
use crate::encoding::Reader;
use crate::environment::ShaderEnvironment;
use crate::error::{Result, VmError};
use crate::opcode::OpcodeKind;
use crate::program::{Program, ShaderKind};
use crate::registry::DispatchTable;
use crate::stack::Stack;

/// Result of one shader invocation.
///
/// `closure` points into the executor's arena and stays valid until the
/// next call to [`Executor::run`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderOutput {
    pub closure: Option<ClosureRef>,
    /// Set by `SetDisplacement` in displacement shaders.
    pub displacement: Option<Float3>,
    /// Instructions dispatched, including disabled ones.
    pub instructions: u64,
    /// Contract violations recorded under [`ErrorPolicy::Degrade`].
    pub violations: Vec<VmError>,
}

impl ShaderOutput {
    fn failed(err: VmError) -> Self {
        Self {
            violations: vec![err],
            ..Self::default()
        }
    }

    /// Whether any violation was recorded.
    pub fn is_degraded(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Reusable shader interpreter.
pub struct Executor {
    config: VmConfig,
    dispatch: DispatchTable,
    stack: Stack,
    arena: ClosureArena,
    slots: Vec<Option<ClosureRef>>,
    /// Scratch for ramp and curve tables.
    table: Vec<Float4>,
}

impl Executor {
    /// Create an executor for `config`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid configuration value.
    pub fn new(config: VmConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let dispatch = DispatchTable::build(config.features);
        Ok(Self::build(config, dispatch))
    }

    /// Assemble an executor around an already validated config and a table
    /// built for its feature mask.
    pub(crate) fn build(config: VmConfig, dispatch: DispatchTable) -> Self {
        Self {
            stack: Stack::new(config.stack_capacity),
            arena: ClosureArena::new(config.arena_bytes),
            slots: vec![None; config.closure_slots as usize],
            table: Vec::new(),
            dispatch,
            config,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Register file as left by the last invocation.
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn arena(&self) -> &ClosureArena {
        &self.arena
    }

    /// View the closure tree rooted at `root`, usually
    /// [`ShaderOutput::closure`] of the last run.
    pub fn closure_tree(&self, root: Option<ClosureRef>) -> ClosureTree<'_> {
        self.arena.tree(root)
    }

    /// Evaluate the `kind` graph of `program` at the environment's shading
    /// point.
    ///
    /// `aov` is this invocation's region of the AOV buffer; `AovOutput`
    /// indices are relative to it.
    ///
    /// # Errors
    ///
    /// Under [`ErrorPolicy::Strict`] the first contract violation is
    /// returned. Under [`ErrorPolicy::Degrade`] only recoverable violations
    /// let execution continue; fatal ones (unknown opcode, bad entry point,
    /// cursor out of bounds, instruction limit) end the invocation with no
    /// closure and the error recorded in [`ShaderOutput::violations`].
    pub fn run(
        &mut self,
        program: &Program,
        kind: ShaderKind,
        env: &dyn ShaderEnvironment,
        aov: Option<&mut [f32]>,
    ) -> Result<ShaderOutput> {
        let policy = self.config.error_policy;
        self.stack.reset();
        self.arena.reset();
        self.slots.fill(None);

        if program.stack_size() > self.stack.capacity() {
            return fatal(
                policy,
                kind,
                VmError::RegisterOutOfRange {
                    required: program.stack_size(),
                    capacity: self.stack.capacity(),
                },
            );
        }
        let Some(entry) = program.entries().get(kind) else {
            return fatal(policy, kind, VmError::InvalidEntryPoint { kind });
        };

        let mut frame = Frame::new(
            Reader::new(program.words(), entry as usize),
            &mut self.stack,
            &mut self.arena,
            &mut self.slots,
            &mut self.table,
            env,
            kind,
            policy,
            aov,
        );
        let result = dispatch(&self.dispatch, &mut frame, self.config.limits.max_instructions);

        let mut output = ShaderOutput {
            closure: frame.closure,
            displacement: frame.displacement,
            instructions: frame.executed,
            violations: std::mem::take(&mut frame.violations),
        };
        if let Err(err) = result {
            match policy {
                ErrorPolicy::Strict => return Err(err),
                ErrorPolicy::Degrade => {
                    warn!(%kind, error = %err, "shader invocation aborted");
                    output.closure = None;
                    output.displacement = None;
                    output.violations.push(err);
                }
            }
        }

        trace!(
            %kind,
            instructions = output.instructions,
            violations = output.violations.len(),
            "shader invocation finished"
        );
        Ok(output)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("arena_used", &self.arena.used())
            .finish_non_exhaustive()
    }
}

fn fatal(policy: ErrorPolicy, kind: ShaderKind, err: VmError) -> Result<ShaderOutput> {
    match policy {
        ErrorPolicy::Strict => Err(err),
        ErrorPolicy::Degrade => {
            warn!(%kind, error = %err, "shader invocation rejected");
            Ok(ShaderOutput::failed(err))
        }
    }
}

/// Fetch, decode and dispatch until `End` or an error.
fn dispatch(table: &DispatchTable, frame: &mut Frame<'_>, limit: u64) -> Result<()> {
    while !frame.halted {
        if frame.executed >= limit {
            return Err(VmError::InstructionLimitExceeded { limit });
        }
        let start = frame.reader.offset();
        let word = frame.reader.read_instruction()?;
        let kind = OpcodeKind::from_u32(word.opcode).ok_or(VmError::UnknownOpcode {
            opcode: word.opcode,
            offset: start,
        })?;
        let next = start + kind.metadata().width_of(&word);

        frame.start = start;
        frame.executed += 1;
        table.handler(kind)(word, frame)?;

        let target = frame.jump_target.take().unwrap_or(next);
        frame.reader.seek(target)?;
    }
    Ok(())
}
