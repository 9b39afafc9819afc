//! End-to-end shading scenarios through the public API.

use umbra_foundation::{std_symbols, Dual3, Float2, Float3, Float4, Transform};
use umbra_nodes::{BlendMode, MappingType, MathOp};
use umbra_vm::assembler::{Bsdf, NoiseTexture};
use umbra_vm::opcode::{CoordSpace, GeometryOutput, LightPathOutput, TexCoordOutput, TransformKind};
use umbra_vm::{
    shade_batch, Assembler, ClosureKind, ErrorPolicy, Executor, FeatureMask, ImageTexture, Input,
    Program, RayFlags, ShaderKind, ShadingPoint, StaticEnvironment, TextureHandle, VmConfig,
    VmError, MISSING_TEXTURE_COLOR, UNCONNECTED,
};

const EPSILON: f32 = 1e-5;

fn close(a: Float3, b: Float3) -> bool {
    (a - b).abs().max_component() < EPSILON
}

fn strict() -> VmConfig {
    VmConfig {
        error_policy: ErrorPolicy::Strict,
        ..VmConfig::default()
    }
}

#[test]
fn blend_of_a_color_with_itself_is_unchanged() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .value_vector(0, Float3::new(1.0, 0.0, 0.0))
        .value_scalar(3, 0.5)
        .mix(BlendMode::Mix, false, Input::Reg(3), Input::Reg(0), Input::Reg(0), 0)
        .end();
    let program = asm.finish();
    program.verify(FeatureMask::ALL, 255).unwrap();

    let mut executor = Executor::new(strict()).unwrap();
    executor
        .run(&program, ShaderKind::Surface, &StaticEnvironment::default(), None)
        .unwrap();
    assert!(close(executor.stack().load_vector(0), Float3::new(1.0, 0.0, 0.0)));
}

#[test]
fn zero_weighted_diffuse_leaves_only_glossy() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .closure_bsdf(&Bsdf::new(ClosureKind::Diffuse, 0))
        .closure_bsdf(&Bsdf::new(ClosureKind::GlossyGgx, 1))
        .closure_scale(0, 2, Float3::ZERO.into())
        .closure_scale(1, 3, Float3::ONE.into())
        .closure_add(2, 3, 4)
        .closure_output(4)
        .end();
    let program = asm.finish();

    let mut executor = Executor::new(strict()).unwrap();
    let output = executor
        .run(&program, ShaderKind::Surface, &StaticEnvironment::default(), None)
        .unwrap();
    let leaves = executor.closure_tree(output.closure).flatten();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].kind, ClosureKind::GlossyGgx);
    assert_eq!(leaves[0].weight, Float3::ONE);
}

#[test]
fn encoded_program_runs_the_same() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .geometry(GeometryOutput::Position, 0)
        .tex_noise(&NoiseTexture {
            vector: 0,
            value_out: 3,
            ..NoiseTexture::default()
        })
        .end();
    let program = asm.finish();
    let decoded = Program::decode(&program.encode()).unwrap();
    assert_eq!(decoded, program);

    let env = StaticEnvironment::new(ShadingPoint {
        position: Float3::new(0.3, 1.7, -2.2),
        ..ShadingPoint::default()
    });
    let mut executor = Executor::new(strict()).unwrap();
    executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    let expected = executor.stack().load_scalar(3);
    executor.run(&decoded, ShaderKind::Surface, &env, None).unwrap();
    assert_eq!(executor.stack().load_scalar(3), expected);
}

#[test]
fn texture_coordinates_use_scene_transforms() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .texture_coordinate(TexCoordOutput::Object, 0, 3, UNCONNECTED)
        .texture_coordinate(TexCoordOutput::Uv, 6, UNCONNECTED, UNCONNECTED)
        .vector_transform(TransformKind::Point, CoordSpace::Object, CoordSpace::World, 0, 9)
        .end();
    let program = asm.finish();

    let env = StaticEnvironment::new(ShadingPoint {
        position: Float3::new(2.0, 0.0, 0.0),
        dpdx: Float3::new(1.0, 0.0, 0.0),
        uv: Float2::new(0.25, 0.75),
        ..ShadingPoint::default()
    })
    .with_transform(
        std_symbols::OBJECT,
        std_symbols::WORLD,
        Transform::scale(Float3::splat(2.0)),
    );

    let mut executor = Executor::new(strict()).unwrap();
    executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    let stack = executor.stack();
    assert!(close(stack.load_vector(0), Float3::new(1.0, 0.0, 0.0)));
    assert!(close(stack.load_vector(3), Float3::new(0.5, 0.0, 0.0)));
    assert!(close(stack.load_vector(6), Float3::new(0.25, 0.75, 0.0)));
    assert!(close(stack.load_vector(9), Float3::new(2.0, 0.0, 0.0)));
}

#[test]
fn mapping_carries_texture_coordinate_derivatives() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .texture_coordinate(TexCoordOutput::Object, 0, 3, 6)
        .mapping_with_derivatives(
            MappingType::Point,
            (0, 3, 6),
            Float3::new(1.0, 0.0, 0.0).into(),
            Float3::ZERO.into(),
            Float3::splat(2.0).into(),
            (9, 12, 15),
        )
        .mapping(
            MappingType::Point,
            0,
            Float3::ZERO.into(),
            Float3::ZERO.into(),
            Float3::splat(2.0).into(),
            18,
        )
        .end();
    let program = asm.finish();

    let env = StaticEnvironment::new(ShadingPoint {
        position: Float3::new(0.5, 1.0, -1.5),
        dpdx: Float3::new(1.0, 0.0, 0.0),
        dpdy: Float3::new(0.0, 0.5, 0.0),
        ..ShadingPoint::default()
    });
    let mut executor = Executor::new(strict()).unwrap();
    executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    let stack = executor.stack();
    assert!(close(stack.load_vector(9), Float3::new(2.0, 2.0, -3.0)));
    assert!(close(stack.load_vector(12), Float3::new(2.0, 0.0, 0.0)));
    assert!(close(stack.load_vector(15), Float3::new(0.0, 1.0, 0.0)));
    assert!(close(stack.load_vector(18), Float3::new(1.0, 2.0, -3.0)));
}

#[test]
fn attributes_and_light_path() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .attribute(
            std_symbols::VERTEX_COLOR,
            umbra_vm::opcode::AttributeOutput::Float,
            0,
            UNCONNECTED,
            UNCONNECTED,
        )
        .attribute(
            std_symbols::POINTINESS,
            umbra_vm::opcode::AttributeOutput::Float,
            1,
            UNCONNECTED,
            UNCONNECTED,
        )
        .light_path(LightPathOutput::IsCameraRay, 2)
        .light_path(LightPathOutput::IsShadowRay, 3)
        .light_path(LightPathOutput::RayDepth, 4)
        .end();
    let program = asm.finish();

    let env = StaticEnvironment::new(ShadingPoint {
        ray_flags: RayFlags::CAMERA | RayFlags::GLOSSY,
        ray_depth: 2,
        ..ShadingPoint::default()
    })
    .with_attribute(
        std_symbols::VERTEX_COLOR,
        Dual3::constant(Float3::new(0.3, 0.6, 0.9)),
    );

    let mut executor = Executor::new(strict()).unwrap();
    executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    let stack = executor.stack();
    assert!((stack.load_scalar(0) - 0.6).abs() < EPSILON);
    assert_eq!(stack.load_scalar(1), 0.0, "missing attribute reads as zero");
    assert_eq!(stack.load_scalar(2), 1.0);
    assert_eq!(stack.load_scalar(3), 0.0);
    assert_eq!(stack.load_scalar(4), 2.0);
}

#[test]
fn image_textures_fall_back_to_magenta() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .tex_image(TextureHandle(1), UNCONNECTED, 0, 3)
        .tex_image(TextureHandle(2), UNCONNECTED, 4, 7)
        .end();
    let program = asm.finish();

    let env = StaticEnvironment::default().with_texture(
        TextureHandle(1),
        ImageTexture {
            width: 1,
            height: 1,
            pixels: vec![Float4::new(0.2, 0.4, 0.6, 0.5)],
        },
    );
    let mut executor = Executor::new(strict()).unwrap();
    executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
    let stack = executor.stack();
    assert!(close(stack.load_vector(0), Float3::new(0.2, 0.4, 0.6)));
    assert_eq!(stack.load_scalar(3), 0.5);
    assert_eq!(stack.load_vector(4), MISSING_TEXTURE_COLOR.truncate());
    assert_eq!(stack.load_scalar(7), MISSING_TEXTURE_COLOR.w);
}

#[test]
fn batch_matches_single_invocations() {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .geometry(GeometryOutput::Position, 0)
        .math(MathOp::Sine, Input::Reg(0), 0.0.into(), 0.0.into(), 3)
        .math(MathOp::Absolute, Input::Reg(3), 0.0.into(), 0.0.into(), 3)
        .closure_bsdf(&Bsdf::new(ClosureKind::Diffuse, 0))
        .closure_scale_scalar(0, 1, Input::Reg(3))
        .closure_output(1)
        .end();
    let program = asm.finish();

    let scene = StaticEnvironment::default();
    let points: Vec<ShadingPoint> = (0..100)
        .map(|i| ShadingPoint {
            position: Float3::new(i as f32 * 0.1, 0.0, 0.0),
            ..ShadingPoint::default()
        })
        .collect();
    let config = strict();
    let batch = shade_batch(&program, &config, ShaderKind::Surface, &scene, &points, &mut [], 0)
        .unwrap();

    let mut executor = Executor::new(config).unwrap();
    for (point, result) in points.iter().zip(&batch) {
        let env = StaticEnvironment::new(*point);
        let output = executor.run(&program, ShaderKind::Surface, &env, None).unwrap();
        assert_eq!(executor.closure_tree(output.closure).flatten(), result.closures);
    }
}

#[test]
fn degraded_config_loaded_from_json() {
    let config: VmConfig = serde_json::from_str(
        r#"{ "error_policy": "degrade", "limits": { "max_instructions": 8 } }"#,
    )
    .unwrap();
    assert_eq!(config.error_policy, ErrorPolicy::Degrade);
    assert_eq!(config.stack_capacity, VmConfig::default().stack_capacity);

    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface);
    for i in 0..16 {
        asm.value_scalar(i, i as f32);
    }
    asm.end();
    let program = asm.finish();

    let mut executor = Executor::new(config).unwrap();
    let output = executor
        .run(&program, ShaderKind::Surface, &StaticEnvironment::default(), None)
        .unwrap();
    assert_eq!(
        output.violations,
        vec![VmError::InstructionLimitExceeded { limit: 8 }]
    );
    assert_eq!(output.closure, None);
}
