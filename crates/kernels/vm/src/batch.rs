//! Parallel shading of many points with one program.
//!
//! Each rayon worker builds its own [`Executor`] once and reuses it for every
//! point it picks up. The AOV buffer is split into disjoint per-point
//! regions, so invocations never share writable state.

use rayon::prelude::*;
use tracing::{debug, instrument};
use umbra_foundation::{Dual3, Float3, Float4, Symbol, Transform};

use crate::closure::WeightedClosure;
use crate::config::VmConfig;
use crate::environment::{AoQuery, ShaderEnvironment, ShadingPoint, TextureHandle};
use crate::error::{Result, VmError};
use crate::executor::Executor;
use crate::program::{Program, ShaderKind};
use crate::registry::DispatchTable;

/// What one point of a batch produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchResult {
    /// The flattened closure tree.
    pub closures: Vec<WeightedClosure>,
    pub displacement: Option<Float3>,
    pub violations: Vec<VmError>,
}

/// Scene services re-centered on one shading point.
struct AtPoint<'a, E> {
    scene: &'a E,
    point: ShadingPoint,
}

impl<E: ShaderEnvironment> ShaderEnvironment for AtPoint<'_, E> {
    fn shading_point(&self) -> ShadingPoint {
        self.point
    }

    fn transform(&self, from: Symbol, to: Symbol) -> Option<Transform> {
        self.scene.transform(from, to)
    }

    fn attribute(&self, name: Symbol, want_derivatives: bool) -> Option<Dual3> {
        self.scene.attribute(name, want_derivatives)
    }

    fn sample_texture(&self, handle: TextureHandle, coords: Float3) -> Option<Float4> {
        self.scene.sample_texture(handle, coords)
    }

    fn ambient_occlusion(&self, query: &AoQuery) -> Option<f32> {
        self.scene.ambient_occlusion(query)
    }
}

/// Shade every point in `points` with the `kind` graph of `program`.
///
/// `scene` answers every query except [`ShaderEnvironment::shading_point`],
/// which comes from `points`. Point `i` owns
/// `aov[i * aov_stride..(i + 1) * aov_stride]`; pass an empty buffer and a
/// zero stride to shade without AOVs. Results are in point order.
///
/// # Errors
///
/// Fails on an invalid config, on an AOV buffer whose length is not
/// `points.len() * aov_stride`, and under
/// [`ErrorPolicy::Strict`](crate::ErrorPolicy::Strict) on the first
/// invocation error.
#[instrument(level = "debug", skip_all, fields(points = points.len(), kind = %kind))]
pub fn shade_batch<E: ShaderEnvironment + Sync>(
    program: &Program,
    config: &VmConfig,
    kind: ShaderKind,
    scene: &E,
    points: &[ShadingPoint],
    aov: &mut [f32],
    aov_stride: usize,
) -> Result<Vec<BatchResult>> {
    config.validate()?;
    let expected = points.len() * aov_stride;
    if aov.len() != expected {
        return Err(VmError::AovBufferMismatch {
            expected,
            found: aov.len(),
        });
    }

    let dispatch = DispatchTable::build(config.features);
    let init = || Executor::build(config.clone(), dispatch.clone());
    let shade = |executor: &mut Executor,
                 point: &ShadingPoint,
                 region: Option<&mut [f32]>|
     -> Result<BatchResult> {
        let env = AtPoint {
            scene,
            point: *point,
        };
        let output = executor.run(program, kind, &env, region)?;
        Ok(BatchResult {
            closures: executor.closure_tree(output.closure).flatten(),
            displacement: output.displacement,
            violations: output.violations,
        })
    };

    let results: Result<Vec<BatchResult>> = if aov_stride == 0 {
        points
            .par_iter()
            .map_init(init, |executor, point| shade(executor, point, None))
            .collect()
    } else {
        points
            .par_iter()
            .zip(aov.par_chunks_mut(aov_stride))
            .map_init(init, |executor, (point, region)| {
                shade(executor, point, Some(region))
            })
            .collect()
    };
    let results = results?;

    let degraded = results.iter().filter(|r| !r.violations.is_empty()).count();
    debug!(degraded, "batch shaded");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{Assembler, Bsdf, Input};
    use crate::closure::ClosureKind;
    use crate::config::ErrorPolicy;
    use crate::environment::StaticEnvironment;
    use crate::opcode::{AovKind, GeometryOutput};
    use umbra_nodes::MathOp;

    fn points(n: usize) -> Vec<ShadingPoint> {
        (0..n)
            .map(|i| ShadingPoint {
                position: Float3::new(i as f32, 0.0, 0.0),
                ..ShadingPoint::default()
            })
            .collect()
    }

    #[test]
    fn test_aov_regions_are_per_point() {
        let mut asm = Assembler::new();
        asm.entry(ShaderKind::Surface)
            .geometry(GeometryOutput::Position, 0)
            .aov_output(AovKind::Color, 0, 0)
            .aov_output(AovKind::Value, 0, 3)
            .end();
        let program = asm.finish();

        let pts = points(64);
        let mut aov = vec![0.0; pts.len() * 4];
        let results = shade_batch(
            &program,
            &VmConfig::default(),
            ShaderKind::Surface,
            &StaticEnvironment::default(),
            &pts,
            &mut aov,
            4,
        )
        .unwrap();

        assert_eq!(results.len(), 64);
        for (i, region) in aov.chunks(4).enumerate() {
            assert_eq!(region, &[i as f32, 0.0, 0.0, i as f32]);
        }
    }

    #[test]
    fn test_closures_follow_point_order() {
        // Weight is the x coordinate, so point 0 has no closure at all.
        let mut asm = Assembler::new();
        asm.entry(ShaderKind::Surface)
            .geometry(GeometryOutput::Position, 0)
            .math(MathOp::Add, Input::Reg(0), 0.0.into(), 0.0.into(), 3)
            .closure_bsdf(&Bsdf::new(ClosureKind::Diffuse, 0))
            .closure_scale_scalar(0, 1, Input::Reg(3))
            .closure_output(1)
            .end();
        let program = asm.finish();

        let pts = points(8);
        let results = shade_batch(
            &program,
            &VmConfig::default(),
            ShaderKind::Surface,
            &StaticEnvironment::default(),
            &pts,
            &mut [],
            0,
        )
        .unwrap();

        assert!(results[0].closures.is_empty());
        for (i, result) in results.iter().enumerate().skip(1) {
            assert_eq!(result.closures.len(), 1);
            assert_eq!(result.closures[0].weight, Float3::splat(i as f32));
        }
    }

    #[test]
    fn test_rejects_mismatched_aov_buffer() {
        let program = {
            let mut asm = Assembler::new();
            asm.entry(ShaderKind::Surface).end();
            asm.finish()
        };
        let err = shade_batch(
            &program,
            &VmConfig::default(),
            ShaderKind::Surface,
            &StaticEnvironment::default(),
            &points(3),
            &mut [0.0; 5],
            2,
        )
        .unwrap_err();
        assert_eq!(err, VmError::AovBufferMismatch { expected: 6, found: 5 });
    }

    #[test]
    fn test_degraded_points_carry_violations() {
        let program = {
            let mut asm = Assembler::new();
            asm.entry(ShaderKind::Surface).end();
            asm.finish()
        };
        let config = VmConfig {
            error_policy: ErrorPolicy::Degrade,
            ..VmConfig::default()
        };
        let results = shade_batch(
            &program,
            &config,
            ShaderKind::Volume,
            &StaticEnvironment::default(),
            &points(4),
            &mut [],
            0,
        )
        .unwrap();
        for result in &results {
            assert_eq!(
                result.violations,
                vec![VmError::InvalidEntryPoint {
                    kind: ShaderKind::Volume
                }]
            );
        }
    }
}
