//! Umbra VM.
//!
//! A bytecode interpreter for compiled shader graphs. A [`Program`] is a
//! flat stream of 128-bit instruction words; the [`Executor`] walks it for
//! one shading point at a time, reading scene state through a
//! [`ShaderEnvironment`] and producing a weighted closure tree.
//!
//! # Architecture
//!
//! - [`encoding`] - Instruction words, operand packing, the stream cursor
//! - [`opcode`] - The instruction set and operand enums
//! - [`registry`] - Opcode metadata and feature-specialized dispatch tables
//! - [`program`] - Programs, entry points, verification, byte encoding
//! - [`assembler`] - Programmatic instruction stream construction
//! - [`stack`] - The per-invocation float register file
//! - [`closure`] - Closure arena, algebra and tree flattening
//! - [`environment`] - The renderer query boundary
//! - [`executor`] - The dispatch loop
//! - [`batch`] - Parallel shading over many points
//!
//! # Example
//!
//! ```ignore
//! use umbra_vm::{Assembler, Executor, ShaderKind, StaticEnvironment, VmConfig};
//!
//! let mut asm = Assembler::new();
//! asm.entry(ShaderKind::Surface).value_scalar(0, 0.5).end();
//! let program = asm.finish();
//!
//! let mut executor = Executor::new(VmConfig::default())?;
//! let output = executor.run(&program, ShaderKind::Surface, &StaticEnvironment::default(), None)?;
//! ```

pub mod assembler;
pub mod batch;
pub mod closure;
pub mod config;
pub mod encoding;
pub mod environment;
pub mod error;
pub mod executor;
pub mod features;
pub(crate) mod handlers;
pub mod opcode;
pub mod program;
pub mod registry;
pub mod stack;

pub use assembler::{Assembler, Input, Label};
pub use batch::{shade_batch, BatchResult};
pub use closure::{
    ArenaError, ClosureArena, ClosureKind, ClosureNode, ClosureParams, ClosureRef, ClosureTree,
    WeightedClosure,
};
pub use config::{ConfigError, ErrorPolicy, Limits, VmConfig};
pub use encoding::{Instruction, UNCONNECTED};
pub use environment::{
    AoQuery, ImageTexture, RayFlags, ShaderEnvironment, ShadingPoint, StaticEnvironment,
    TextureHandle, MISSING_TEXTURE_COLOR,
};
pub use error::{ProgramError, Result, VmError};
pub use executor::{Executor, ShaderOutput};
pub use features::FeatureMask;
pub use opcode::{OpcodeKind, OpcodeMetadata};
pub use program::{EntryPoints, Program, ShaderKind};
pub use registry::DispatchTable;
pub use stack::Stack;
