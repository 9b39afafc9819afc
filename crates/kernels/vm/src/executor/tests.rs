use super::*;
use crate::assembler::{Assembler, Bsdf, Input};
use crate::closure::{ArenaError, ClosureKind};
use crate::config::Limits;
use crate::encoding::{pack, Instruction, UNCONNECTED};
use crate::environment::{ShadingPoint, StaticEnvironment};
use crate::features::FeatureMask;
use crate::opcode::{AovKind, BumpOffset, DisplacementSpace, GeometryOutput, NO_ENTRY};
use crate::program::EntryPoints;
use umbra_nodes::{BlendMode, MathOp};

const EPSILON: f32 = 1e-6;

fn strict() -> VmConfig {
    VmConfig {
        error_policy: ErrorPolicy::Strict,
        ..VmConfig::default()
    }
}

fn degrade() -> VmConfig {
    VmConfig {
        error_policy: ErrorPolicy::Degrade,
        ..VmConfig::default()
    }
}

fn surface(build: impl FnOnce(&mut Assembler)) -> Program {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface);
    build(&mut asm);
    asm.end();
    asm.finish()
}

fn run(config: VmConfig, program: &Program) -> (Executor, Result<ShaderOutput>) {
    let mut executor = Executor::new(config).unwrap();
    let result = executor.run(
        program,
        ShaderKind::Surface,
        &StaticEnvironment::default(),
        None,
    );
    (executor, result)
}

fn assert_close(actual: Float3, expected: Float3) {
    assert!(
        (actual - expected).abs().max_component() < EPSILON,
        "{actual:?} != {expected:?}"
    );
}

// === Dispatch ===

#[test]
fn test_mix_of_identical_colors() {
    let program = surface(|asm| {
        asm.value_vector(0, Float3::new(1.0, 0.0, 0.0))
            .value_scalar(3, 0.5)
            .mix(BlendMode::Mix, false, Input::Reg(3), Input::Reg(0), Input::Reg(0), 0);
    });
    let (executor, output) = run(strict(), &program);
    let output = output.unwrap();
    assert_eq!(output.instructions, 4);
    assert_close(executor.stack().load_vector(0), Float3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_instruction_limit_stops_loops() {
    // Select entry jumping back onto itself never ends.
    let words = vec![Instruction::new(
        OpcodeKind::SelectEntry as u32,
        0,
        NO_ENTRY,
        NO_ENTRY,
    )];
    let entries = EntryPoints {
        surface: Some(0),
        ..EntryPoints::default()
    };
    let program = Program::new(words, entries, 0);
    let config = VmConfig {
        limits: Limits {
            max_instructions: 100,
        },
        ..strict()
    };
    let (_, result) = run(config, &program);
    assert_eq!(
        result.unwrap_err(),
        VmError::InstructionLimitExceeded { limit: 100 }
    );
}

#[test]
fn test_unknown_opcode_is_fatal() {
    let words = vec![
        Instruction::new(OpcodeKind::ValueScalar as u32, 0, 1.0f32.to_bits(), 0),
        Instruction::new(9999, 0, 0, 0),
    ];
    let entries = EntryPoints {
        surface: Some(0),
        ..EntryPoints::default()
    };
    let program = Program::new(words, entries, 1);
    let expected = VmError::UnknownOpcode {
        opcode: 9999,
        offset: 1,
    };

    let (_, result) = run(strict(), &program);
    assert_eq!(result.unwrap_err(), expected);

    let (_, result) = run(degrade(), &program);
    let output = result.unwrap();
    assert_eq!(output.closure, None);
    assert_eq!(output.violations, vec![expected]);
}

#[test]
fn test_running_off_the_end() {
    let program = Program::new(
        vec![Instruction::new(OpcodeKind::ValueScalar as u32, 0, 0, 0)],
        EntryPoints {
            surface: Some(0),
            ..EntryPoints::default()
        },
        1,
    );
    let (_, result) = run(strict(), &program);
    assert_eq!(
        result.unwrap_err(),
        VmError::CursorOutOfBounds { offset: 1, len: 1 }
    );
}

#[test]
fn test_missing_entry_point() {
    let program = surface(|_| {});
    let mut executor = Executor::new(strict()).unwrap();
    let err = executor
        .run(&program, ShaderKind::Volume, &StaticEnvironment::default(), None)
        .unwrap_err();
    assert_eq!(
        err,
        VmError::InvalidEntryPoint {
            kind: ShaderKind::Volume
        }
    );
}

#[test]
fn test_program_larger_than_stack() {
    let program = surface(|asm| {
        asm.value_scalar(200, 1.0);
    });
    let config = VmConfig {
        stack_capacity: 64,
        ..strict()
    };
    let (_, result) = run(config, &program);
    assert_eq!(
        result.unwrap_err(),
        VmError::RegisterOutOfRange {
            required: 201,
            capacity: 64
        }
    );
}

#[test]
fn test_state_resets_between_runs() {
    let first = surface(|asm| {
        asm.value_scalar(0, 4.0);
    });
    let second = surface(|asm| {
        asm.value_scalar(1, 2.0);
    });
    let env = StaticEnvironment::default();
    let mut executor = Executor::new(strict()).unwrap();
    executor.run(&first, ShaderKind::Surface, &env, None).unwrap();
    executor.run(&second, ShaderKind::Surface, &env, None).unwrap();
    assert_eq!(executor.stack().load_scalar(0), 0.0);
    assert_eq!(executor.stack().load_scalar(1), 2.0);
}

// === Control flow ===

#[test]
fn test_select_entry_by_kind() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .entry(ShaderKind::Volume)
        .entry(ShaderKind::Displacement);
    let select = asm.select_entry();
    asm.bind_select(select, ShaderKind::Surface)
        .value_scalar(0, 1.0)
        .end();
    asm.bind_select(select, ShaderKind::Displacement)
        .value_scalar(0, 2.0)
        .end();
    let program = asm.finish();

    let env = StaticEnvironment::default();
    let mut executor = Executor::new(strict()).unwrap();

    executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    assert_eq!(executor.stack().load_scalar(0), 1.0);

    executor.run(&program, ShaderKind::Displacement, &env, None).unwrap();
    assert_eq!(executor.stack().load_scalar(0), 2.0);

    // No volume graph: the selector halts straight away.
    let output = executor.run(&program, ShaderKind::Volume, &env, None).unwrap();
    assert_eq!(output.instructions, 1);
    assert_eq!(executor.stack().load_scalar(0), 0.0);
}

#[test]
fn test_conditional_jumps_skip_subgraphs() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface).value_scalar(0, 0.0).value_scalar(1, 1.0);
    let skip_zero = asm.jump_if_zero(0);
    asm.value_scalar(2, 5.0);
    asm.bind(skip_zero);
    let skip_one = asm.jump_if_one(0);
    asm.value_scalar(3, 6.0);
    asm.bind(skip_one);
    let skip_taken = asm.jump_if_one(1);
    asm.value_scalar(4, 7.0);
    asm.bind(skip_taken);
    asm.end();
    let program = asm.finish();

    let (executor, result) = run(strict(), &program);
    result.unwrap();
    let stack = executor.stack();
    assert_eq!(stack.load_scalar(2), 0.0, "jump_if_zero taken");
    assert_eq!(stack.load_scalar(3), 6.0, "jump_if_one not taken");
    assert_eq!(stack.load_scalar(4), 0.0, "jump_if_one taken");
}

#[test]
fn test_disabled_opcodes_are_skipped_by_width() {
    let program = surface(|asm| {
        asm.ambient_occlusion(UNCONNECTED, 1.0.into(), 16, false, false, 3, 1)
            .bump(UNCONNECTED, 1.0.into(), 1.0.into(), false, (0, 0, 0), 6)
            .value_scalar(2, 3.0);
    });
    let env = StaticEnvironment {
        occlusion: Some(0.25),
        ..StaticEnvironment::default()
    };

    let config = VmConfig {
        features: FeatureMask::CORE,
        ..strict()
    };
    let mut executor = Executor::new(config).unwrap();
    let output = executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    assert_eq!(output.instructions, 4);
    assert_eq!(executor.stack().load_scalar(1), 0.0);
    assert_eq!(executor.stack().load_scalar(2), 3.0);

    let mut executor = Executor::new(strict()).unwrap();
    executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    assert_eq!(executor.stack().load_scalar(1), 0.25);
    assert_eq!(executor.stack().load_vector(3), Float3::splat(0.25));
}

#[test]
fn test_invalid_operand_degrades() {
    let words = vec![
        Instruction::new(
            OpcodeKind::Math as u32,
            999,
            pack(UNCONNECTED, UNCONNECTED, UNCONNECTED, 0),
            0,
        ),
        Instruction::literal(1.0, 2.0, 0.0, 0.0),
        Instruction::new(OpcodeKind::ValueScalar as u32, 1, 3.0f32.to_bits(), 0),
        Instruction::new(OpcodeKind::End as u32, 0, 0, 0),
    ];
    let program = Program::new(
        words,
        EntryPoints {
            surface: Some(0),
            ..EntryPoints::default()
        },
        2,
    );
    let expected = VmError::InvalidOperand {
        opcode: "math",
        value: 999,
    };

    let (_, result) = run(strict(), &program);
    assert_eq!(result.unwrap_err(), expected);

    let (executor, result) = run(degrade(), &program);
    let output = result.unwrap();
    assert!(output.is_degraded());
    assert_eq!(output.violations, vec![expected]);
    // Execution went on past the bad instruction.
    assert_eq!(executor.stack().load_scalar(1), 3.0);
    assert_eq!(executor.stack().load_scalar(0), 0.0);
}

// === Shading state ===

#[test]
fn test_bump_eval_offsets_and_restores_position() {
    let program = surface(|asm| {
        asm.enter_bump_eval(0, BumpOffset::Dx)
            .geometry(GeometryOutput::Position, 3)
            .leave_bump_eval(0)
            .geometry(GeometryOutput::Position, 6);
    });
    let env = StaticEnvironment::new(ShadingPoint {
        position: Float3::new(1.0, 2.0, 3.0),
        dpdx: Float3::new(0.5, 0.0, 0.0),
        ..ShadingPoint::default()
    });
    let mut executor = Executor::new(strict()).unwrap();
    executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    assert_close(executor.stack().load_vector(3), Float3::new(1.5, 2.0, 3.0));
    assert_close(executor.stack().load_vector(6), Float3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_aov_writes_and_bounds() {
    let program = surface(|asm| {
        asm.value_vector(0, Float3::new(0.1, 0.2, 0.3))
            .aov_output(AovKind::Color, 0, 1);
    });
    let env = StaticEnvironment::default();

    let mut aov = [0.0; 4];
    let mut executor = Executor::new(strict()).unwrap();
    executor
        .run(&program, ShaderKind::Surface, &env, Some(&mut aov[..]))
        .unwrap();
    assert_eq!(aov, [0.0, 0.1, 0.2, 0.3]);

    let mut short = [0.0; 2];
    let err = executor
        .run(&program, ShaderKind::Surface, &env, Some(&mut short[..]))
        .unwrap_err();
    assert_eq!(err, VmError::AovOutOfRange { index: 1, len: 2 });

    let mut executor = Executor::new(degrade()).unwrap();
    let output = executor
        .run(&program, ShaderKind::Surface, &env, Some(&mut short[..]))
        .unwrap();
    assert_eq!(output.violations.len(), 1);
    assert_eq!(short, [0.0, 0.0]);

    // Without a buffer the write is dropped silently.
    let output = executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    assert!(!output.is_degraded());
}

#[test]
fn test_displacement_output() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Displacement)
        .displacement(DisplacementSpace::World, 1.0.into(), 0.0.into(), 2.0.into(), UNCONNECTED, 0)
        .set_displacement(0)
        .end();
    let program = asm.finish();

    let mut executor = Executor::new(strict()).unwrap();
    let output = executor
        .run(&program, ShaderKind::Displacement, &StaticEnvironment::default(), None)
        .unwrap();
    assert_eq!(output.displacement, Some(Float3::new(0.0, 0.0, 2.0)));
}

// === Closures ===

#[test]
fn test_zero_weighted_branch_drops_out() {
    let program = surface(|asm| {
        asm.closure_bsdf(&Bsdf::new(ClosureKind::Diffuse, 0))
            .closure_bsdf(&Bsdf::new(ClosureKind::GlossyGgx, 1))
            .closure_scale_scalar(0, 2, 0.0.into())
            .closure_scale_scalar(1, 3, 1.0.into())
            .closure_add(2, 3, 4)
            .closure_output(4);
    });
    let (executor, result) = run(strict(), &program);
    let output = result.unwrap();
    let leaves = executor.closure_tree(output.closure).flatten();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].kind, ClosureKind::GlossyGgx);
    assert_eq!(leaves[0].weight, Float3::ONE);
}

#[test]
fn test_closure_mix_weights() {
    let program = surface(|asm| {
        asm.closure_bsdf(&Bsdf::new(ClosureKind::Diffuse, 0))
            .closure_emission(ClosureKind::Emission, 1, Float3::ONE.into(), 4.0.into())
            .closure_mix(0.25.into(), 0, 1, 2)
            .closure_output(2);
    });
    let (executor, result) = run(strict(), &program);
    let output = result.unwrap();
    let tree = executor.closure_tree(output.closure);
    let leaves = tree.flatten();
    assert_eq!(leaves.len(), 2);
    assert_eq!(leaves[0].kind, ClosureKind::Diffuse);
    assert_close(leaves[0].weight, Float3::splat(0.75));
    assert_eq!(leaves[1].kind, ClosureKind::Emission);
    assert_close(leaves[1].weight, Float3::splat(1.0));
    assert_close(tree.total_weight(ClosureKind::is_bsdf), Float3::splat(0.75));
}

#[test]
fn test_closure_kind_must_match_opcode() {
    let program = surface(|asm| {
        asm.closure_bsdf(&Bsdf::new(ClosureKind::Emission, 0))
            .closure_output(0);
    });
    let (_, result) = run(strict(), &program);
    assert_eq!(
        result.unwrap_err(),
        VmError::InvalidOperand {
            opcode: "closure_bsdf",
            value: ClosureKind::Emission as u32
        }
    );
}

#[test]
fn test_arena_exhaustion() {
    let program = surface(|asm| {
        asm.closure_bsdf(&Bsdf::new(ClosureKind::Diffuse, 0))
            .closure_bsdf(&Bsdf::new(ClosureKind::Diffuse, 1))
            .closure_add(0, 1, 2)
            .closure_output(2);
    });
    let small = |config: VmConfig| VmConfig {
        arena_bytes: 64,
        ..config
    };

    let (_, result) = run(small(strict()), &program);
    assert!(matches!(
        result.unwrap_err(),
        VmError::ArenaExhausted(ArenaError::Exhausted { .. })
    ));

    // The first leaf survives; the second reads as no closure.
    let (executor, result) = run(small(degrade()), &program);
    let output = result.unwrap();
    assert_eq!(output.violations.len(), 1);
    let leaves = executor.closure_tree(output.closure).flatten();
    assert_eq!(leaves.len(), 1);
}

#[test]
fn test_closure_slot_out_of_range() {
    let program = surface(|asm| {
        asm.closure_output(200);
    });
    let (_, result) = run(strict(), &program);
    assert_eq!(
        result.unwrap_err(),
        VmError::ClosureSlotOutOfRange {
            slot: 200,
            slots: 64
        }
    );
}

#[test]
fn test_volume_closure_gated() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Volume)
        .closure_volume(ClosureKind::VolumeScatter, 0, Float3::ONE.into(), 2.0.into(), 0.3.into())
        .closure_output(0)
        .end();
    let program = asm.finish();
    let env = StaticEnvironment::default();

    let mut executor = Executor::new(strict()).unwrap();
    let output = executor.run(&program, ShaderKind::Volume, &env, None).unwrap();
    let leaves = executor.closure_tree(output.closure).flatten();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].weight, Float3::splat(2.0));
    assert!((leaves[0].params.anisotropy - 0.3).abs() < EPSILON);

    let config = VmConfig {
        features: FeatureMask::ALL.without(FeatureMask::VOLUME),
        ..strict()
    };
    let mut executor = Executor::new(config).unwrap();
    let output = executor.run(&program, ShaderKind::Volume, &env, None).unwrap();
    assert_eq!(output.closure, None);
}

#[test]
fn test_math_through_literals() {
    let program = surface(|asm| {
        asm.math(MathOp::Add, 1.5.into(), 2.0.into(), 0.0.into(), 0);
    });
    let (executor, result) = run(strict(), &program);
    result.unwrap();
    assert_eq!(executor.stack().load_scalar(0), 3.5);
}
