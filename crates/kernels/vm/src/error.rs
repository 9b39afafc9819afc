//! Error types for loading, configuring and running shader programs.

use crate::closure::ArenaError;
use crate::config::ConfigError;
use crate::program::ShaderKind;

/// Crate-wide result alias for execution.
pub type Result<T> = std::result::Result<T, VmError>;

/// Shader execution error.
///
/// These represent violations of the contract between the program producer
/// and the VM. Under [`ErrorPolicy::Degrade`](crate::ErrorPolicy::Degrade)
/// they are recorded on the output instead of being returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VmError {
    /// The opcode field of an instruction does not name a known opcode.
    #[error("unknown opcode {opcode} at word {offset}")]
    UnknownOpcode {
        /// Raw opcode value.
        opcode: u32,
        /// Word offset of the instruction.
        offset: usize,
    },

    /// The program has no entry point for the requested shader kind.
    #[error("program has no {kind} entry point")]
    InvalidEntryPoint { kind: ShaderKind },

    /// A read or jump went past the end of the instruction stream.
    #[error("cursor {offset} out of bounds for {len} words")]
    CursorOutOfBounds { offset: usize, len: usize },

    /// The invocation ran more instructions than the configured ceiling.
    #[error("instruction limit of {limit} exceeded")]
    InstructionLimitExceeded { limit: u64 },

    /// The closure arena could not hold another node.
    #[error("closure arena: {0}")]
    ArenaExhausted(#[from] ArenaError),

    /// A closure slot operand is outside the slot bank.
    #[error("closure slot {slot} out of range ({slots} slots)")]
    ClosureSlotOutOfRange { slot: u32, slots: usize },

    /// The program needs more registers than the executor provides.
    #[error("program needs {required} registers, stack holds {capacity}")]
    RegisterOutOfRange { required: u32, capacity: u32 },

    /// An enum operand (math op, blend mode, ...) has no matching variant.
    #[error("invalid operand {value} for {opcode}")]
    InvalidOperand {
        /// Name of the opcode that rejected it.
        opcode: &'static str,
        value: u32,
    },

    /// An AOV write falls outside the invocation's AOV region.
    #[error("AOV index {index} out of range for a region of {len} floats")]
    AovOutOfRange { index: u32, len: usize },

    /// The AOV buffer handed to a batch does not match the point count.
    #[error("AOV buffer holds {found} floats, expected {expected}")]
    AovBufferMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Program loading and verification error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("not an umbra program (bad magic)")]
    BadMagic,

    #[error("unsupported program version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("program truncated: needed {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("unknown opcode {opcode} at word {offset}")]
    UnknownOpcode { opcode: u32, offset: usize },

    /// A multi-word instruction runs past the end of the stream.
    #[error("{opcode} at word {offset} needs {width} words, stream ends at {len}")]
    TruncatedInstruction {
        opcode: &'static str,
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("program needs {required} registers, stack holds {capacity}")]
    RegisterOutOfRange { required: u32, capacity: u32 },

    #[error("{kind} entry point {offset} is not an instruction boundary")]
    EntryOutOfRange { kind: ShaderKind, offset: u32 },

    #[error("jump at word {offset} targets {target}, not an instruction boundary")]
    JumpOutOfRange { offset: usize, target: usize },

    #[error("{opcode} at word {offset} requires disabled feature {feature}")]
    FeatureNotEnabled {
        opcode: &'static str,
        offset: usize,
        feature: &'static str,
    },
}
