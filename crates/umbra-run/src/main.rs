//! Umbra Run - Shades a synthetic grid and writes a PPM preview
//!
//! Each pixel becomes one shading point on a plane. The closure tree of
//! every point is flattened and its summed weight written as the pixel
//! color; an optional AOV channel is written as a grayscale PGM.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use umbra_foundation::{Float2, Float3, Float4};
use umbra_nodes::MathOp;
use umbra_vm::assembler::{Bsdf, NoiseTexture};
use umbra_vm::opcode::{AovKind, GeometryOutput};
use umbra_vm::{
    shade_batch, Assembler, BatchResult, ClosureKind, ConfigError, Input, Program, ProgramError,
    ShaderKind, ShadingPoint, StaticEnvironment, VmConfig, VmError, UNCONNECTED,
};

#[derive(Parser, Debug)]
#[command(name = "umbra-run")]
#[command(about = "Shade a grid of points with an umbra program and write a PPM image")]
struct Cli {
    /// Encoded program file; the built-in demo material when omitted
    program: Option<PathBuf>,

    /// VM configuration as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output image
    #[arg(long, short, default_value = "umbra.ppm")]
    output: PathBuf,

    /// Also write AOV channel 0 as a grayscale PGM
    #[arg(long)]
    aov: Option<PathBuf>,

    #[arg(long, default_value_t = 256)]
    width: u32,

    #[arg(long, default_value_t = 256)]
    height: u32,

    /// World-space extent of the shaded plane
    #[arg(long, default_value_t = 4.0)]
    extent: f32,
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid program: {0}")]
    Program(#[from] ProgramError),

    #[error("shading failed: {0}")]
    Shading(#[from] VmError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> RunError + '_ {
    move |source| RunError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Noise-driven ramp feeding a diffuse/glossy fresnel mix; the noise value
/// also goes to AOV channel 0.
fn demo_program() -> Program {
    let mut asm = Assembler::new();
    asm.entry(ShaderKind::Surface)
        .geometry(GeometryOutput::Position, 0)
        .tex_noise(&NoiseTexture {
            vector: 0,
            scale: 2.0.into(),
            detail: 5.0.into(),
            value_out: 3,
            ..NoiseTexture::default()
        })
        .aov_output(AovKind::Value, 3, 0)
        .rgb_ramp(
            3,
            4,
            UNCONNECTED,
            true,
            false,
            &[
                Float4::new(0.05, 0.1, 0.4, 1.0),
                Float4::new(0.8, 0.5, 0.2, 1.0),
                Float4::new(0.95, 0.9, 0.7, 1.0),
            ],
        )
        .fresnel(UNCONNECTED, 1.45.into(), 7)
        .math(MathOp::Multiply, Input::Reg(7), 0.5.into(), 0.0.into(), 8)
        .closure_bsdf(&Bsdf {
            color: Input::Reg(4),
            ..Bsdf::new(ClosureKind::Diffuse, 0)
        })
        .closure_bsdf(&Bsdf {
            roughness: 0.15.into(),
            ..Bsdf::new(ClosureKind::GlossyGgx, 1)
        })
        .closure_mix(Input::Reg(8), 0, 1, 2)
        .closure_output(2)
        .end();
    asm.finish()
}

fn load_config(path: Option<&Path>) -> Result<VmConfig, RunError> {
    let Some(path) = path else {
        return Ok(VmConfig::default());
    };
    let text = fs::read_to_string(path).map_err(io_error(path))?;
    let config: VmConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

fn load_program(path: Option<&Path>, config: &VmConfig) -> Result<Program, RunError> {
    let program = match path {
        Some(path) => Program::decode(&fs::read(path).map_err(io_error(path))?)?,
        None => demo_program(),
    };
    program.verify(config.features, config.stack_capacity)?;
    Ok(program)
}

fn grid(width: u32, height: u32, extent: f32) -> Vec<ShadingPoint> {
    let step = Float3::new(extent / width as f32, extent / height as f32, 0.0);
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let uv = Float2::new(
                (x as f32 + 0.5) / width as f32,
                1.0 - (y as f32 + 0.5) / height as f32,
            );
            ShadingPoint {
                position: Float3::new(uv.x * extent, uv.y * extent, 0.0),
                dpdx: Float3::new(step.x, 0.0, 0.0),
                dpdy: Float3::new(0.0, -step.y, 0.0),
                uv,
                ..ShadingPoint::default()
            }
        })
        .collect()
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0 + 0.5) as u8
}

fn write_ppm(path: &Path, width: u32, height: u32, results: &[BatchResult]) -> io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    write!(out, "P6\n{width} {height}\n255\n")?;
    for result in results {
        let color = result
            .closures
            .iter()
            .fold(Float3::ZERO, |acc, leaf| acc + leaf.weight);
        out.write_all(&[to_byte(color.x), to_byte(color.y), to_byte(color.z)])?;
    }
    out.flush()
}

fn write_pgm(path: &Path, width: u32, height: u32, values: &[f32]) -> io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    write!(out, "P5\n{width} {height}\n255\n")?;
    let bytes: Vec<u8> = values.iter().map(|&v| to_byte(v)).collect();
    out.write_all(&bytes)?;
    out.flush()
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let config = load_config(cli.config.as_deref())?;
    let program = load_program(cli.program.as_deref(), &config)?;
    info!(
        words = program.len(),
        registers = program.stack_size(),
        "program loaded"
    );

    let points = grid(cli.width, cli.height, cli.extent);
    let mut aov = vec![0.0; points.len()];
    let scene = StaticEnvironment::default();
    let results = shade_batch(
        &program,
        &config,
        ShaderKind::Surface,
        &scene,
        &points,
        &mut aov,
        1,
    )?;

    let degraded = results.iter().filter(|r| !r.violations.is_empty()).count();
    if let Some(first) = results.iter().find_map(|r| r.violations.first()) {
        warn!(degraded, first = %first, "some points degraded");
    }
    info!(points = results.len(), "shading finished");

    write_ppm(&cli.output, cli.width, cli.height, &results).map_err(io_error(&cli.output))?;
    info!("Wrote {}", cli.output.display());
    if let Some(path) = &cli.aov {
        write_pgm(path, cli.width, cli.height, &aov).map_err(io_error(path))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "umbra_run=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_program_verifies() {
        let config = VmConfig::default();
        demo_program()
            .verify(config.features, config.stack_capacity)
            .unwrap();
    }

    #[test]
    fn test_grid_covers_plane() {
        let points = grid(4, 2, 8.0);
        assert_eq!(points.len(), 8);
        assert_eq!(points[0].position, Float3::new(1.0, 6.0, 0.0));
        assert_eq!(points[7].position, Float3::new(7.0, 2.0, 0.0));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["umbra-run", "--width", "16", "-o", "out.ppm"]).unwrap();
        assert_eq!(cli.width, 16);
        assert_eq!(cli.height, 256);
        assert!(cli.program.is_none());
    }
}
