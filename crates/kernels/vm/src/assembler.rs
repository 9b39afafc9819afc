//! Programmatic construction of instruction streams.
//!
//! The assembler is what tools and tests use in place of the graph
//! compiler: one method per opcode, taking register offsets for outputs and
//! [`Input`]s for inputs that may be either a register or a literal.

use umbra_foundation::{Float3, Float4, Symbol};
use umbra_nodes::color::ColorModel;
use umbra_nodes::fractal::NoiseType;
use umbra_nodes::math::{ClampType, MapRangeType};
use umbra_nodes::texture::wave::{WaveBandsDirection, WaveProfile, WaveRingsDirection, WaveType};
use umbra_nodes::texture::GradientType;
use umbra_nodes::{BlendMode, MappingType, MathOp, VectorMathOp, VoronoiFeature, VoronoiMetric};

use crate::closure::ClosureKind;
use crate::encoding::{float_bits, pack, Instruction, UNCONNECTED};
use crate::environment::TextureHandle;
use crate::opcode::{
    AovKind, AttributeOutput, BumpOffset, ConvertKind, CoordSpace, CurveKind, DisplacementSpace,
    GeometryOutput, LightPathOutput, MixKind, OpcodeKind, TexCoordOutput, TransformKind, NO_ENTRY,
};
use crate::program::{EntryPoints, Program, ShaderKind};

/// An instruction input: a register offset or a literal default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input<T> {
    Reg(u32),
    Value(T),
}

impl From<f32> for Input<f32> {
    fn from(value: f32) -> Self {
        Input::Value(value)
    }
}

impl From<Float3> for Input<Float3> {
    fn from(value: Float3) -> Self {
        Input::Value(value)
    }
}

/// Position of an instruction whose target is filled in later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Label(usize);

/// Noise texture operands.
#[derive(Debug, Clone, Copy)]
pub struct NoiseTexture {
    pub dimensions: u32,
    pub noise_type: NoiseType,
    pub normalize: bool,
    /// Coordinate register; unconnected uses the shading position.
    pub vector: u32,
    pub w: Input<f32>,
    pub scale: Input<f32>,
    pub detail: Input<f32>,
    pub roughness: Input<f32>,
    pub lacunarity: Input<f32>,
    pub offset: Input<f32>,
    pub gain: Input<f32>,
    pub distortion: Input<f32>,
    pub value_out: u32,
    pub color_out: u32,
}

impl Default for NoiseTexture {
    fn default() -> Self {
        Self {
            dimensions: 3,
            noise_type: NoiseType::Fbm,
            normalize: true,
            vector: UNCONNECTED,
            w: Input::Value(0.0),
            scale: Input::Value(5.0),
            detail: Input::Value(2.0),
            roughness: Input::Value(0.5),
            lacunarity: Input::Value(2.0),
            offset: Input::Value(0.0),
            gain: Input::Value(1.0),
            distortion: Input::Value(0.0),
            value_out: UNCONNECTED,
            color_out: UNCONNECTED,
        }
    }
}

/// Voronoi texture operands.
#[derive(Debug, Clone, Copy)]
pub struct VoronoiTexture {
    pub dimensions: u32,
    pub feature: VoronoiFeature,
    pub metric: VoronoiMetric,
    pub normalize: bool,
    pub vector: u32,
    pub w: Input<f32>,
    pub scale: Input<f32>,
    pub detail: Input<f32>,
    pub roughness: Input<f32>,
    pub lacunarity: Input<f32>,
    pub smoothness: Input<f32>,
    pub exponent: Input<f32>,
    pub randomness: Input<f32>,
    pub distance_out: u32,
    pub color_out: u32,
    pub position_out: u32,
    pub w_out: u32,
    pub radius_out: u32,
}

impl Default for VoronoiTexture {
    fn default() -> Self {
        Self {
            dimensions: 3,
            feature: VoronoiFeature::F1,
            metric: VoronoiMetric::Euclidean,
            normalize: false,
            vector: UNCONNECTED,
            w: Input::Value(0.0),
            scale: Input::Value(5.0),
            detail: Input::Value(0.0),
            roughness: Input::Value(0.5),
            lacunarity: Input::Value(2.0),
            smoothness: Input::Value(1.0),
            exponent: Input::Value(0.5),
            randomness: Input::Value(1.0),
            distance_out: UNCONNECTED,
            color_out: UNCONNECTED,
            position_out: UNCONNECTED,
            w_out: UNCONNECTED,
            radius_out: UNCONNECTED,
        }
    }
}

/// Musgrave texture operands.
#[derive(Debug, Clone, Copy)]
pub struct MusgraveTexture {
    pub dimensions: u32,
    pub noise_type: NoiseType,
    pub vector: u32,
    pub w: Input<f32>,
    pub scale: Input<f32>,
    pub detail: Input<f32>,
    pub dimension: Input<f32>,
    pub lacunarity: Input<f32>,
    pub offset: Input<f32>,
    pub gain: Input<f32>,
    pub out: u32,
}

impl Default for MusgraveTexture {
    fn default() -> Self {
        Self {
            dimensions: 3,
            noise_type: NoiseType::Fbm,
            vector: UNCONNECTED,
            w: Input::Value(0.0),
            scale: Input::Value(5.0),
            detail: Input::Value(2.0),
            dimension: Input::Value(2.0),
            lacunarity: Input::Value(2.0),
            offset: Input::Value(0.0),
            gain: Input::Value(1.0),
            out: UNCONNECTED,
        }
    }
}

/// Wave texture operands.
#[derive(Debug, Clone, Copy)]
pub struct WaveTexture {
    pub kind: WaveType,
    pub bands_direction: WaveBandsDirection,
    pub rings_direction: WaveRingsDirection,
    pub profile: WaveProfile,
    pub vector: u32,
    pub scale: Input<f32>,
    pub distortion: Input<f32>,
    pub detail: Input<f32>,
    pub detail_scale: Input<f32>,
    pub detail_roughness: Input<f32>,
    pub phase: Input<f32>,
    pub fac_out: u32,
    pub color_out: u32,
}

impl Default for WaveTexture {
    fn default() -> Self {
        Self {
            kind: WaveType::Bands,
            bands_direction: WaveBandsDirection::X,
            rings_direction: WaveRingsDirection::X,
            profile: WaveProfile::Sine,
            vector: UNCONNECTED,
            scale: Input::Value(5.0),
            distortion: Input::Value(0.0),
            detail: Input::Value(2.0),
            detail_scale: Input::Value(1.0),
            detail_roughness: Input::Value(0.5),
            phase: Input::Value(0.0),
            fac_out: UNCONNECTED,
            color_out: UNCONNECTED,
        }
    }
}

/// Brick texture operands.
#[derive(Debug, Clone, Copy)]
pub struct BrickTexture {
    pub vector: u32,
    pub color1: Input<Float3>,
    pub color2: Input<Float3>,
    pub mortar: Input<Float3>,
    pub scale: Input<f32>,
    pub mortar_size: Input<f32>,
    pub mortar_smooth: Input<f32>,
    pub bias: Input<f32>,
    pub brick_width: Input<f32>,
    pub row_height: Input<f32>,
    pub offset_amount: f32,
    pub offset_frequency: i32,
    pub squash_amount: f32,
    pub squash_frequency: i32,
    pub color_out: u32,
    pub fac_out: u32,
}

impl Default for BrickTexture {
    fn default() -> Self {
        Self {
            vector: UNCONNECTED,
            color1: Input::Value(Float3::splat(0.8)),
            color2: Input::Value(Float3::splat(0.2)),
            mortar: Input::Value(Float3::ZERO),
            scale: Input::Value(5.0),
            mortar_size: Input::Value(0.02),
            mortar_smooth: Input::Value(0.1),
            bias: Input::Value(0.0),
            brick_width: Input::Value(0.5),
            row_height: Input::Value(0.25),
            offset_amount: 0.5,
            offset_frequency: 2,
            squash_amount: 1.0,
            squash_frequency: 2,
            color_out: UNCONNECTED,
            fac_out: UNCONNECTED,
        }
    }
}

/// BSDF closure operands.
#[derive(Debug, Clone, Copy)]
pub struct Bsdf {
    pub kind: ClosureKind,
    pub out_slot: u32,
    pub color: Input<Float3>,
    /// Normal register; unconnected uses the shading normal.
    pub normal: u32,
    pub roughness: Input<f32>,
    pub ior: Input<f32>,
    pub anisotropy: Input<f32>,
}

impl Bsdf {
    pub fn new(kind: ClosureKind, out_slot: u32) -> Self {
        Self {
            kind,
            out_slot,
            color: Input::Value(Float3::ONE),
            normal: UNCONNECTED,
            roughness: Input::Value(0.5),
            ior: Input::Value(1.45),
            anisotropy: Input::Value(0.0),
        }
    }
}

/// Instruction stream builder.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    words: Vec<Instruction>,
    entries: EntryPoints,
    stack_size: u32,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Word offset of the next instruction.
    pub fn offset(&self) -> u32 {
        self.words.len() as u32
    }

    /// Start the graph for `kind` at the current offset.
    pub fn entry(&mut self, kind: ShaderKind) -> &mut Self {
        let offset = self.offset();
        self.entries.set(kind, offset);
        self
    }

    pub fn finish(self) -> Program {
        Program::new(self.words, self.entries, self.stack_size)
    }

    // === Internals ===

    fn emit(&mut self, kind: OpcodeKind, a: u32, b: u32, c: u32) -> usize {
        self.words.push(Instruction::new(kind as u32, a, b, c));
        self.words.len() - 1
    }

    fn raw(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.words.push(Instruction::new(a, b, c, d));
    }

    fn lit(&mut self, x: f32, y: f32, z: f32, w: f32) {
        self.words.push(Instruction::literal(x, y, z, w));
    }

    fn lit_vector(&mut self, v: Float3, w: f32) {
        self.words.push(Instruction::literal_vector(v, w));
    }

    /// Track a register span and pass the offset through.
    fn reg(&mut self, offset: u32, width: u32) -> u32 {
        if offset != UNCONNECTED {
            self.stack_size = self.stack_size.max(offset + width);
        }
        offset
    }

    fn s(&mut self, offset: u32) -> u32 {
        self.reg(offset, 1)
    }

    fn v(&mut self, offset: u32) -> u32 {
        self.reg(offset, 3)
    }

    fn scalar(&mut self, input: Input<f32>) -> (u32, f32) {
        match input {
            Input::Reg(offset) => (self.s(offset), 0.0),
            Input::Value(value) => (UNCONNECTED, value),
        }
    }

    fn vector(&mut self, input: Input<Float3>) -> (u32, Float3) {
        match input {
            Input::Reg(offset) => (self.v(offset), Float3::ZERO),
            Input::Value(value) => (UNCONNECTED, value),
        }
    }

    /// Scalar register, or a literal carried in the x lane.
    fn scalar_lane(&mut self, input: Input<Float3>) -> (u32, Float3) {
        match input {
            Input::Reg(offset) => (self.s(offset), Float3::ZERO),
            Input::Value(value) => (UNCONNECTED, value),
        }
    }

    // === Control ===

    pub fn end(&mut self) -> &mut Self {
        self.emit(OpcodeKind::End, 0, 0, 0);
        self
    }

    /// Emit an entry selector; bind each kind with [`bind_select`](Self::bind_select).
    pub fn select_entry(&mut self) -> Label {
        Label(self.emit(OpcodeKind::SelectEntry, NO_ENTRY, NO_ENTRY, NO_ENTRY))
    }

    /// Point `kind` of the selector at the current offset.
    pub fn bind_select(&mut self, label: Label, kind: ShaderKind) -> &mut Self {
        let offset = self.offset();
        let word = &mut self.words[label.0];
        match kind {
            ShaderKind::Surface => word.a = offset,
            ShaderKind::Volume => word.b = offset,
            ShaderKind::Displacement => word.c = offset,
        }
        self
    }

    /// Skip forward to the matching [`bind`](Self::bind) when `reg <= 0`.
    pub fn jump_if_zero(&mut self, reg: u32) -> Label {
        let reg = self.s(reg);
        Label(self.emit(OpcodeKind::JumpIfZero, reg, 0, 0))
    }

    /// Skip forward to the matching [`bind`](Self::bind) when `reg >= 1`.
    pub fn jump_if_one(&mut self, reg: u32) -> Label {
        let reg = self.s(reg);
        Label(self.emit(OpcodeKind::JumpIfOne, reg, 0, 0))
    }

    /// Resolve a jump to land on the current offset.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        let skip = self.words.len() - (label.0 + 1);
        self.words[label.0].b = skip as u32;
        self
    }

    // === Values ===

    pub fn value_scalar(&mut self, out: u32, value: f32) -> &mut Self {
        let out = self.s(out);
        self.emit(OpcodeKind::ValueScalar, out, float_bits(value), 0);
        self
    }

    pub fn value_vector(&mut self, out: u32, value: Float3) -> &mut Self {
        let out = self.v(out);
        self.emit(OpcodeKind::ValueVector, out, 0, 0);
        self.lit_vector(value, 0.0);
        self
    }

    pub fn convert(&mut self, kind: ConvertKind, input: u32, out: u32) -> &mut Self {
        let (input, out) = match kind {
            ConvertKind::FloatToVector => (self.s(input), self.v(out)),
            ConvertKind::ColorToFloat | ConvertKind::VectorToFloat => (self.v(input), self.s(out)),
        };
        self.emit(OpcodeKind::Convert, kind as u32, input, out);
        self
    }

    // === Math ===

    pub fn math(
        &mut self,
        op: MathOp,
        a: Input<f32>,
        b: Input<f32>,
        c: Input<f32>,
        out: u32,
    ) -> &mut Self {
        let (a, da) = self.scalar(a);
        let (b, db) = self.scalar(b);
        let (c, dc) = self.scalar(c);
        let out = self.s(out);
        self.emit(OpcodeKind::Math, op as u32, pack(a, b, c, out), 0);
        self.lit(da, db, dc, 0.0);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn vector_math(
        &mut self,
        op: VectorMathOp,
        a: Input<Float3>,
        b: Input<Float3>,
        c: Input<Float3>,
        scale: Input<f32>,
        value_out: u32,
        vector_out: u32,
    ) -> &mut Self {
        let (a, da) = self.vector(a);
        let (b, db) = self.vector(b);
        let (c, dc) = self.vector(c);
        let (scale, dscale) = self.scalar(scale);
        let value_out = self.s(value_out);
        let vector_out = self.v(vector_out);
        self.emit(
            OpcodeKind::VectorMath,
            op as u32,
            pack(a, b, c, scale),
            pack(value_out, vector_out, 0, 0),
        );
        self.lit_vector(da, dscale);
        self.lit_vector(db, 0.0);
        self.lit_vector(dc, 0.0);
        self
    }

    pub fn clamp(
        &mut self,
        kind: ClampType,
        value: Input<f32>,
        min: Input<f32>,
        max: Input<f32>,
        out: u32,
    ) -> &mut Self {
        let (value, dv) = self.scalar(value);
        let (min, dmin) = self.scalar(min);
        let (max, dmax) = self.scalar(max);
        let out = self.s(out);
        self.emit(OpcodeKind::Clamp, pack(kind as u32, out, 0, 0), pack(value, min, max, 0), 0);
        self.lit(dv, dmin, dmax, 0.0);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn map_range(
        &mut self,
        kind: MapRangeType,
        clamp: bool,
        value: Input<f32>,
        from_min: Input<f32>,
        from_max: Input<f32>,
        to_min: Input<f32>,
        to_max: Input<f32>,
        steps: Input<f32>,
        out: u32,
    ) -> &mut Self {
        let (value, dv) = self.scalar(value);
        let (from_min, dfmin) = self.scalar(from_min);
        let (from_max, dfmax) = self.scalar(from_max);
        let (to_min, dtmin) = self.scalar(to_min);
        let (to_max, dtmax) = self.scalar(to_max);
        let (steps, dsteps) = self.scalar(steps);
        let out = self.s(out);
        self.emit(
            OpcodeKind::MapRange,
            pack(kind as u32, clamp as u32, out, 0),
            pack(value, from_min, from_max, to_min),
            pack(to_max, steps, 0, 0),
        );
        self.lit(dv, dfmin, dfmax, dtmin);
        self.lit(dtmax, dsteps, 0.0, 0.0);
        self
    }

    /// Color blend of `c1` and `c2` by `fac`.
    pub fn mix(
        &mut self,
        mode: BlendMode,
        clamp: bool,
        fac: Input<f32>,
        c1: Input<Float3>,
        c2: Input<Float3>,
        out: u32,
    ) -> &mut Self {
        let (fac, dfac) = self.scalar(fac);
        let (c1, d1) = self.vector(c1);
        let (c2, d2) = self.vector(c2);
        let out = self.v(out);
        self.emit(
            OpcodeKind::Mix,
            pack(mode as u32, clamp as u32, out, 0),
            pack(fac, c1, c2, 0),
            0,
        );
        self.lit_vector(d1, dfac);
        self.lit_vector(d2, 0.0);
        self
    }

    /// Linear interpolation. For [`MixKind::Float`] `a` and `b` are scalar
    /// registers with literals in the x lane; for
    /// [`MixKind::VectorNonUniform`] `fac` is a vector register.
    pub fn mix_value(
        &mut self,
        kind: MixKind,
        clamp: bool,
        fac: Input<f32>,
        a: Input<Float3>,
        b: Input<Float3>,
        out: u32,
    ) -> &mut Self {
        let (fac, dfac) = match (kind, fac) {
            (MixKind::VectorNonUniform, Input::Reg(r)) => (self.v(r), 0.0),
            _ => self.scalar(fac),
        };
        let (a, b, out, da, db) = if kind == MixKind::Float {
            let (a, da) = self.scalar_lane(a);
            let (b, db) = self.scalar_lane(b);
            (a, b, self.s(out), da, db)
        } else {
            let (a, da) = self.vector(a);
            let (b, db) = self.vector(b);
            (a, b, self.v(out), da, db)
        };
        self.emit(
            OpcodeKind::MixValue,
            pack(kind as u32, clamp as u32, out, 0),
            pack(fac, a, b, 0),
            0,
        );
        self.lit_vector(da, dfac);
        self.lit_vector(db, 0.0);
        self
    }

    pub fn separate_vector(&mut self, input: Input<Float3>, x: u32, y: u32, z: u32) -> &mut Self {
        let (input, d) = self.vector(input);
        let (x, y, z) = (self.s(x), self.s(y), self.s(z));
        self.emit(OpcodeKind::SeparateVector, input, pack(x, y, z, 0), 0);
        self.lit_vector(d, 0.0);
        self
    }

    pub fn combine_vector(
        &mut self,
        x: Input<f32>,
        y: Input<f32>,
        z: Input<f32>,
        out: u32,
    ) -> &mut Self {
        let (x, dx) = self.scalar(x);
        let (y, dy) = self.scalar(y);
        let (z, dz) = self.scalar(z);
        let out = self.v(out);
        self.emit(OpcodeKind::CombineVector, pack(x, y, z, out), 0, 0);
        self.lit(dx, dy, dz, 0.0);
        self
    }

    // === Color ===

    pub fn gamma(&mut self, color: Input<Float3>, gamma: Input<f32>, out: u32) -> &mut Self {
        let (color, dc) = self.vector(color);
        let (gamma, dg) = self.scalar(gamma);
        let out = self.v(out);
        self.emit(OpcodeKind::Gamma, pack(color, gamma, out, 0), 0, 0);
        self.lit_vector(dc, dg);
        self
    }

    pub fn bright_contrast(
        &mut self,
        color: Input<Float3>,
        bright: Input<f32>,
        contrast: Input<f32>,
        out: u32,
    ) -> &mut Self {
        let (color, dc) = self.vector(color);
        let (bright, db) = self.scalar(bright);
        let (contrast, dk) = self.scalar(contrast);
        let out = self.v(out);
        self.emit(OpcodeKind::BrightContrast, pack(color, bright, contrast, out), 0, 0);
        self.lit_vector(dc, db);
        self.lit(dk, 0.0, 0.0, 0.0);
        self
    }

    pub fn invert(&mut self, fac: Input<f32>, color: Input<Float3>, out: u32) -> &mut Self {
        let (fac, df) = self.scalar(fac);
        let (color, dc) = self.vector(color);
        let out = self.v(out);
        self.emit(OpcodeKind::Invert, pack(fac, color, out, 0), 0, 0);
        self.lit_vector(dc, df);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn hue_saturation(
        &mut self,
        hue: Input<f32>,
        saturation: Input<f32>,
        value: Input<f32>,
        fac: Input<f32>,
        color: Input<Float3>,
        out: u32,
    ) -> &mut Self {
        let (hue, dh) = self.scalar(hue);
        let (saturation, ds) = self.scalar(saturation);
        let (value, dv) = self.scalar(value);
        let (fac, df) = self.scalar(fac);
        let (color, dc) = self.vector(color);
        let out = self.v(out);
        self.emit(
            OpcodeKind::HueSaturation,
            pack(hue, saturation, value, fac),
            pack(color, out, 0, 0),
            0,
        );
        self.lit(dh, ds, dv, df);
        self.lit_vector(dc, 0.0);
        self
    }

    pub fn separate_color(
        &mut self,
        model: ColorModel,
        color: Input<Float3>,
        r: u32,
        g: u32,
        b: u32,
    ) -> &mut Self {
        let (color, dc) = self.vector(color);
        let (r, g, b) = (self.s(r), self.s(g), self.s(b));
        self.emit(OpcodeKind::SeparateColor, model as u32, pack(color, r, g, b), 0);
        self.lit_vector(dc, 0.0);
        self
    }

    pub fn combine_color(
        &mut self,
        model: ColorModel,
        r: Input<f32>,
        g: Input<f32>,
        b: Input<f32>,
        out: u32,
    ) -> &mut Self {
        let (r, dr) = self.scalar(r);
        let (g, dg) = self.scalar(g);
        let (b, db) = self.scalar(b);
        let out = self.v(out);
        self.emit(OpcodeKind::CombineColor, model as u32, pack(r, g, b, out), 0);
        self.lit(dr, dg, db, 0.0);
        self
    }

    pub fn rgb_to_bw(&mut self, color: u32, out: u32) -> &mut Self {
        let (color, out) = (self.v(color), self.s(out));
        self.emit(OpcodeKind::RgbToBw, color, out, 0);
        self
    }

    /// Color ramp over `table` (evenly spaced RGBA samples).
    pub fn rgb_ramp(
        &mut self,
        fac: u32,
        color_out: u32,
        alpha_out: u32,
        interpolate: bool,
        extrapolate: bool,
        table: &[Float4],
    ) -> &mut Self {
        let (fac, color_out, alpha_out) = (self.s(fac), self.v(color_out), self.s(alpha_out));
        self.emit(
            OpcodeKind::RgbRamp,
            pack(fac, color_out, alpha_out, interpolate as u32),
            table.len() as u32,
            extrapolate as u32,
        );
        for entry in table {
            self.lit(entry.x, entry.y, entry.z, entry.w);
        }
        self
    }

    /// RGB / vector / float curves. Float curves read the table's `w` lane.
    #[allow(clippy::too_many_arguments)]
    pub fn curves(
        &mut self,
        kind: CurveKind,
        fac: Input<f32>,
        input: u32,
        out: u32,
        extrapolate: bool,
        range: (f32, f32),
        table: &[Float4],
    ) -> &mut Self {
        let (fac, dfac) = self.scalar(fac);
        let (input, out) = if kind == CurveKind::Float {
            (self.s(input), self.s(out))
        } else {
            (self.v(input), self.v(out))
        };
        self.emit(
            OpcodeKind::Curves,
            kind as u32,
            pack(fac, input, out, extrapolate as u32),
            table.len() as u32,
        );
        self.lit(range.0, range.1, dfac, 0.0);
        for entry in table {
            self.lit(entry.x, entry.y, entry.z, entry.w);
        }
        self
    }

    // === Textures ===

    pub fn tex_noise(&mut self, t: &NoiseTexture) -> &mut Self {
        let vector = self.v(t.vector);
        let (w, dw) = self.scalar(t.w);
        let (scale, dscale) = self.scalar(t.scale);
        let (detail, ddetail) = self.scalar(t.detail);
        let (roughness, drough) = self.scalar(t.roughness);
        let (lacunarity, dlac) = self.scalar(t.lacunarity);
        let (offset, doffset) = self.scalar(t.offset);
        let (gain, dgain) = self.scalar(t.gain);
        let (distortion, ddist) = self.scalar(t.distortion);
        let (value_out, color_out) = (self.s(t.value_out), self.v(t.color_out));
        self.emit(
            OpcodeKind::TexNoise,
            pack(t.dimensions, t.noise_type as u32, t.normalize as u32, 0),
            pack(vector, w, scale, detail),
            pack(roughness, lacunarity, offset, gain),
        );
        self.raw(pack(distortion, value_out, color_out, 0), 0, 0, 0);
        self.lit(dw, dscale, ddetail, drough);
        self.lit(dlac, doffset, dgain, ddist);
        self
    }

    pub fn tex_voronoi(&mut self, t: &VoronoiTexture) -> &mut Self {
        let vector = self.v(t.vector);
        let (w, dw) = self.scalar(t.w);
        let (scale, dscale) = self.scalar(t.scale);
        let (detail, ddetail) = self.scalar(t.detail);
        let (roughness, drough) = self.scalar(t.roughness);
        let (lacunarity, dlac) = self.scalar(t.lacunarity);
        let (smoothness, dsmooth) = self.scalar(t.smoothness);
        let (exponent, dexp) = self.scalar(t.exponent);
        let (randomness, drand) = self.scalar(t.randomness);
        let distance_out = self.s(t.distance_out);
        let color_out = self.v(t.color_out);
        let position_out = self.v(t.position_out);
        let w_out = self.s(t.w_out);
        let radius_out = self.s(t.radius_out);
        self.emit(
            OpcodeKind::TexVoronoi,
            pack(t.dimensions, t.feature as u32, t.metric as u32, t.normalize as u32),
            pack(vector, w, scale, detail),
            pack(roughness, lacunarity, smoothness, exponent),
        );
        self.raw(
            pack(randomness, distance_out, color_out, position_out),
            pack(w_out, radius_out, 0, 0),
            0,
            0,
        );
        self.lit(dw, dscale, ddetail, drough);
        self.lit(dlac, dsmooth, dexp, drand);
        self
    }

    pub fn tex_musgrave(&mut self, t: &MusgraveTexture) -> &mut Self {
        let vector = self.v(t.vector);
        let (w, dw) = self.scalar(t.w);
        let (scale, dscale) = self.scalar(t.scale);
        let (detail, ddetail) = self.scalar(t.detail);
        let (dimension, ddim) = self.scalar(t.dimension);
        let (lacunarity, dlac) = self.scalar(t.lacunarity);
        let (offset, doffset) = self.scalar(t.offset);
        let (gain, dgain) = self.scalar(t.gain);
        let out = self.s(t.out);
        self.emit(
            OpcodeKind::TexMusgrave,
            pack(t.dimensions, t.noise_type as u32, 0, 0),
            pack(vector, w, scale, detail),
            pack(dimension, lacunarity, offset, gain),
        );
        self.raw(out, 0, 0, 0);
        self.lit(dw, dscale, ddetail, ddim);
        self.lit(dlac, doffset, dgain, 0.0);
        self
    }

    pub fn tex_white_noise(
        &mut self,
        dimensions: u32,
        vector: u32,
        w: u32,
        value_out: u32,
        color_out: u32,
    ) -> &mut Self {
        let (vector, w) = (self.v(vector), self.s(w));
        let (value_out, color_out) = (self.s(value_out), self.v(color_out));
        self.emit(OpcodeKind::TexWhiteNoise, dimensions, pack(vector, w, value_out, color_out), 0);
        self
    }

    pub fn tex_wave(&mut self, t: &WaveTexture) -> &mut Self {
        let vector = self.v(t.vector);
        let (scale, dscale) = self.scalar(t.scale);
        let (distortion, ddist) = self.scalar(t.distortion);
        let (detail, ddetail) = self.scalar(t.detail);
        let (detail_scale, ddscale) = self.scalar(t.detail_scale);
        let (detail_roughness, ddrough) = self.scalar(t.detail_roughness);
        let (phase, dphase) = self.scalar(t.phase);
        let (fac_out, color_out) = (self.s(t.fac_out), self.v(t.color_out));
        self.emit(
            OpcodeKind::TexWave,
            pack(
                t.kind as u32,
                t.bands_direction as u32,
                t.rings_direction as u32,
                t.profile as u32,
            ),
            pack(vector, scale, distortion, detail),
            pack(detail_scale, detail_roughness, phase, 0),
        );
        self.raw(pack(fac_out, color_out, 0, 0), 0, 0, 0);
        self.lit(dscale, ddist, ddetail, ddscale);
        self.lit(ddrough, dphase, 0.0, 0.0);
        self
    }

    pub fn tex_brick(&mut self, t: &BrickTexture) -> &mut Self {
        let vector = self.v(t.vector);
        let (color1, dc1) = self.vector(t.color1);
        let (color2, dc2) = self.vector(t.color2);
        let (mortar, dm) = self.vector(t.mortar);
        let (scale, dscale) = self.scalar(t.scale);
        let (mortar_size, dmsize) = self.scalar(t.mortar_size);
        let (bias, dbias) = self.scalar(t.bias);
        let (brick_width, dwidth) = self.scalar(t.brick_width);
        let (row_height, dheight) = self.scalar(t.row_height);
        let (mortar_smooth, dsmooth) = self.scalar(t.mortar_smooth);
        let (color_out, fac_out) = (self.v(t.color_out), self.s(t.fac_out));
        self.emit(
            OpcodeKind::TexBrick,
            pack(vector, color1, color2, mortar),
            pack(scale, mortar_size, bias, brick_width),
            pack(row_height, color_out, fac_out, mortar_smooth),
        );
        self.raw(
            t.offset_frequency as u32,
            t.squash_frequency as u32,
            float_bits(t.offset_amount),
            float_bits(t.squash_amount),
        );
        self.lit_vector(dc1, dscale);
        self.lit_vector(dc2, dmsize);
        self.lit_vector(dm, dbias);
        self.lit(dwidth, dheight, dsmooth, 0.0);
        self
    }

    pub fn tex_magic(
        &mut self,
        depth: u32,
        vector: u32,
        scale: Input<f32>,
        distortion: Input<f32>,
        color_out: u32,
        fac_out: u32,
    ) -> &mut Self {
        let vector = self.v(vector);
        let (scale, dscale) = self.scalar(scale);
        let (distortion, ddist) = self.scalar(distortion);
        let (color_out, fac_out) = (self.v(color_out), self.s(fac_out));
        self.emit(
            OpcodeKind::TexMagic,
            pack(depth, color_out, fac_out, 0),
            pack(vector, scale, distortion, 0),
            0,
        );
        self.lit(dscale, ddist, 0.0, 0.0);
        self
    }

    pub fn tex_checker(
        &mut self,
        vector: u32,
        color1: Input<Float3>,
        color2: Input<Float3>,
        scale: Input<f32>,
        color_out: u32,
        fac_out: u32,
    ) -> &mut Self {
        let vector = self.v(vector);
        let (color1, dc1) = self.vector(color1);
        let (color2, dc2) = self.vector(color2);
        let (scale, dscale) = self.scalar(scale);
        let (color_out, fac_out) = (self.v(color_out), self.s(fac_out));
        self.emit(
            OpcodeKind::TexChecker,
            pack(vector, color1, color2, scale),
            pack(color_out, fac_out, 0, 0),
            0,
        );
        self.lit_vector(dc1, dscale);
        self.lit_vector(dc2, 0.0);
        self
    }

    pub fn tex_gradient(
        &mut self,
        kind: GradientType,
        vector: u32,
        fac_out: u32,
        color_out: u32,
    ) -> &mut Self {
        let (vector, fac_out, color_out) = (self.v(vector), self.s(fac_out), self.v(color_out));
        self.emit(OpcodeKind::TexGradient, kind as u32, pack(vector, fac_out, color_out, 0), 0);
        self
    }

    pub fn tex_image(
        &mut self,
        handle: TextureHandle,
        vector: u32,
        color_out: u32,
        alpha_out: u32,
    ) -> &mut Self {
        let (vector, color_out, alpha_out) = (self.v(vector), self.v(color_out), self.s(alpha_out));
        self.emit(OpcodeKind::TexImage, handle.0, pack(vector, color_out, alpha_out, 0), 0);
        self
    }

    // === Geometry ===

    pub fn geometry(&mut self, kind: GeometryOutput, out: u32) -> &mut Self {
        let out = if kind == GeometryOutput::Backfacing {
            self.s(out)
        } else {
            self.v(out)
        };
        self.emit(OpcodeKind::Geometry, kind as u32, out, 0);
        self
    }

    pub fn texture_coordinate(
        &mut self,
        kind: TexCoordOutput,
        out: u32,
        dx_out: u32,
        dy_out: u32,
    ) -> &mut Self {
        let (out, dx_out, dy_out) = (self.v(out), self.v(dx_out), self.v(dy_out));
        self.emit(OpcodeKind::TextureCoordinate, kind as u32, pack(out, dx_out, dy_out, 0), 0);
        self
    }

    pub fn attribute(
        &mut self,
        name: Symbol,
        kind: AttributeOutput,
        out: u32,
        dx_out: u32,
        dy_out: u32,
    ) -> &mut Self {
        let (out, dx_out, dy_out) = match kind {
            AttributeOutput::Float => (self.s(out), self.s(dx_out), self.s(dy_out)),
            AttributeOutput::Vector => (self.v(out), self.v(dx_out), self.v(dy_out)),
        };
        let (low, high) = name.to_words();
        self.emit(
            OpcodeKind::Attribute,
            pack(kind as u32, out, dx_out, dy_out),
            low,
            high,
        );
        self
    }

    pub fn vector_transform(
        &mut self,
        kind: TransformKind,
        from: CoordSpace,
        to: CoordSpace,
        input: u32,
        out: u32,
    ) -> &mut Self {
        let (input, out) = (self.v(input), self.v(out));
        self.emit(
            OpcodeKind::VectorTransform,
            pack(kind as u32, from as u32, to as u32, 0),
            pack(input, out, 0, 0),
            0,
        );
        self
    }

    pub fn mapping(
        &mut self,
        kind: MappingType,
        vector: u32,
        location: Input<Float3>,
        rotation: Input<Float3>,
        scale: Input<Float3>,
        out: u32,
    ) -> &mut Self {
        self.mapping_with_derivatives(
            kind,
            (vector, UNCONNECTED, UNCONNECTED),
            location,
            rotation,
            scale,
            (out, UNCONNECTED, UNCONNECTED),
        )
    }

    /// Mapping that also carries differentials: `vector` and `out` are
    /// `(value, dx, dy)` register triples.
    pub fn mapping_with_derivatives(
        &mut self,
        kind: MappingType,
        vector: (u32, u32, u32),
        location: Input<Float3>,
        rotation: Input<Float3>,
        scale: Input<Float3>,
        out: (u32, u32, u32),
    ) -> &mut Self {
        let vector_dx = self.v(vector.1);
        let vector_dy = self.v(vector.2);
        let vector = self.v(vector.0);
        let (location, dl) = self.vector(location);
        let (rotation, dr) = self.vector(rotation);
        let (scale, ds) = self.vector(scale);
        let out_dx = self.v(out.1);
        let out_dy = self.v(out.2);
        let out = self.v(out.0);
        self.emit(
            OpcodeKind::Mapping,
            pack(kind as u32, vector, location, rotation),
            pack(scale, out, 0, 0),
            pack(vector_dx, vector_dy, out_dx, out_dy),
        );
        self.lit_vector(dl, 0.0);
        self.lit_vector(dr, 0.0);
        self.lit_vector(ds, 0.0);
        self
    }

    pub fn fresnel(&mut self, normal: u32, ior: Input<f32>, out: u32) -> &mut Self {
        let normal = self.v(normal);
        let (ior, dior) = self.scalar(ior);
        let out = self.s(out);
        self.emit(OpcodeKind::Fresnel, pack(normal, ior, out, 0), float_bits(dior), 0);
        self
    }

    pub fn layer_weight(
        &mut self,
        normal: u32,
        blend: Input<f32>,
        fresnel_out: u32,
        facing_out: u32,
    ) -> &mut Self {
        let normal = self.v(normal);
        let (blend, dblend) = self.scalar(blend);
        let (fresnel_out, facing_out) = (self.s(fresnel_out), self.s(facing_out));
        self.emit(
            OpcodeKind::LayerWeight,
            pack(normal, blend, fresnel_out, facing_out),
            float_bits(dblend),
            0,
        );
        self
    }

    pub fn light_path(&mut self, kind: LightPathOutput, out: u32) -> &mut Self {
        let out = self.s(out);
        self.emit(OpcodeKind::LightPath, kind as u32, out, 0);
        self
    }

    // === Gated ===

    #[allow(clippy::too_many_arguments)]
    pub fn ambient_occlusion(
        &mut self,
        normal: u32,
        distance: Input<f32>,
        samples: u32,
        inside: bool,
        only_local: bool,
        color_out: u32,
        ao_out: u32,
    ) -> &mut Self {
        let normal = self.v(normal);
        let (distance, ddist) = self.scalar(distance);
        let (color_out, ao_out) = (self.v(color_out), self.s(ao_out));
        let flags = inside as u32 | ((only_local as u32) << 1);
        self.emit(
            OpcodeKind::AmbientOcclusion,
            pack(normal, distance, color_out, ao_out),
            pack(samples, flags, 0, 0),
            float_bits(ddist),
        );
        self
    }

    pub fn enter_bump_eval(&mut self, save: u32, offset: BumpOffset) -> &mut Self {
        let save = self.v(save);
        self.emit(OpcodeKind::EnterBumpEval, save, offset as u32, 0);
        self
    }

    pub fn leave_bump_eval(&mut self, save: u32) -> &mut Self {
        let save = self.v(save);
        self.emit(OpcodeKind::LeaveBumpEval, save, 0, 0);
        self
    }

    /// Bump from three height registers sampled at P, P + dP/dx and
    /// P + dP/dy.
    #[allow(clippy::too_many_arguments)]
    pub fn bump(
        &mut self,
        normal: u32,
        strength: Input<f32>,
        distance: Input<f32>,
        invert: bool,
        heights: (u32, u32, u32),
        out: u32,
    ) -> &mut Self {
        let normal = self.v(normal);
        let (strength, dstrength) = self.scalar(strength);
        let (distance, ddistance) = self.scalar(distance);
        let (center, dx, dy) = (self.s(heights.0), self.s(heights.1), self.s(heights.2));
        let out = self.v(out);
        self.emit(
            OpcodeKind::Bump,
            pack(normal, strength, distance, invert as u32),
            pack(center, dx, dy, out),
            0,
        );
        self.lit(dstrength, ddistance, 0.0, 0.0);
        self
    }

    pub fn aov_output(&mut self, kind: AovKind, input: u32, index: u32) -> &mut Self {
        let input = match kind {
            AovKind::Value => self.s(input),
            AovKind::Color => self.v(input),
        };
        self.emit(OpcodeKind::AovOutput, pack(kind as u32, input, 0, 0), index, 0);
        self
    }

    pub fn closure_volume(
        &mut self,
        kind: ClosureKind,
        out_slot: u32,
        color: Input<Float3>,
        density: Input<f32>,
        anisotropy: Input<f32>,
    ) -> &mut Self {
        let (color, dc) = self.vector(color);
        let (density, dd) = self.scalar(density);
        let (anisotropy, da) = self.scalar(anisotropy);
        self.emit(
            OpcodeKind::ClosureVolume,
            pack(kind as u32, out_slot, color, density),
            anisotropy,
            0,
        );
        self.lit_vector(dc, dd);
        self.lit(da, 0.0, 0.0, 0.0);
        self
    }

    // === Closures ===

    pub fn closure_bsdf(&mut self, bsdf: &Bsdf) -> &mut Self {
        let (color, dc) = self.vector(bsdf.color);
        let normal = self.v(bsdf.normal);
        let (roughness, drough) = self.scalar(bsdf.roughness);
        let (ior, dior) = self.scalar(bsdf.ior);
        let (anisotropy, daniso) = self.scalar(bsdf.anisotropy);
        self.emit(
            OpcodeKind::ClosureBsdf,
            pack(bsdf.kind as u32, bsdf.out_slot, color, normal),
            pack(roughness, ior, anisotropy, 0),
            0,
        );
        self.lit_vector(dc, drough);
        self.lit(dior, daniso, 0.0, 0.0);
        self
    }

    pub fn closure_emission(
        &mut self,
        kind: ClosureKind,
        out_slot: u32,
        color: Input<Float3>,
        strength: Input<f32>,
    ) -> &mut Self {
        let (color, dc) = self.vector(color);
        let (strength, ds) = self.scalar(strength);
        self.emit(
            OpcodeKind::ClosureEmission,
            pack(kind as u32, out_slot, color, strength),
            0,
            0,
        );
        self.lit_vector(dc, ds);
        self
    }

    /// Multiply the closure in `in_slot` by a color.
    pub fn closure_scale(
        &mut self,
        in_slot: u32,
        out_slot: u32,
        weight: Input<Float3>,
    ) -> &mut Self {
        let (weight, dw) = self.vector(weight);
        self.emit(OpcodeKind::ClosureScale, pack(in_slot, out_slot, weight, 1), 0, 0);
        self.lit_vector(dw, 0.0);
        self
    }

    /// Multiply the closure in `in_slot` by a scalar.
    pub fn closure_scale_scalar(
        &mut self,
        in_slot: u32,
        out_slot: u32,
        weight: Input<f32>,
    ) -> &mut Self {
        let (weight, dw) = self.scalar(weight);
        self.emit(OpcodeKind::ClosureScale, pack(in_slot, out_slot, weight, 0), 0, 0);
        self.lit(0.0, 0.0, 0.0, dw);
        self
    }

    pub fn closure_add(&mut self, a: u32, b: u32, out_slot: u32) -> &mut Self {
        self.emit(OpcodeKind::ClosureAdd, pack(a, b, out_slot, 0), 0, 0);
        self
    }

    /// `a * (1 - fac) + b * fac`.
    pub fn closure_mix(&mut self, fac: Input<f32>, a: u32, b: u32, out_slot: u32) -> &mut Self {
        let (fac, dfac) = self.scalar(fac);
        self.emit(OpcodeKind::ClosureMix, pack(fac, a, b, out_slot), float_bits(dfac), 0);
        self
    }

    pub fn closure_output(&mut self, slot: u32) -> &mut Self {
        self.emit(OpcodeKind::ClosureOutput, slot, 0, 0);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn displacement(
        &mut self,
        space: DisplacementSpace,
        height: Input<f32>,
        midlevel: Input<f32>,
        scale: Input<f32>,
        normal: u32,
        out: u32,
    ) -> &mut Self {
        let (height, dh) = self.scalar(height);
        let (midlevel, dm) = self.scalar(midlevel);
        let (scale, ds) = self.scalar(scale);
        let normal = self.v(normal);
        let out = self.v(out);
        self.emit(
            OpcodeKind::Displacement,
            pack(height, midlevel, scale, normal),
            pack(space as u32, out, 0, 0),
            0,
        );
        self.lit(dh, dm, ds, 0.0);
        self
    }

    pub fn set_displacement(&mut self, vector: u32) -> &mut Self {
        let vector = self.v(vector);
        self.emit(OpcodeKind::SetDisplacement, vector, 0, 0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureMask;

    #[test]
    fn test_widths_match_registry() {
        let mut asm = Assembler::new();
        asm.entry(ShaderKind::Surface);
        asm.math(MathOp::Add, 1.0.into(), Input::Reg(0), 0.0.into(), 1);
        asm.rgb_ramp(1, 2, UNCONNECTED, true, false, &[Float4::splat(0.0), Float4::splat(1.0)]);
        asm.tex_noise(&NoiseTexture {
            value_out: 5,
            ..NoiseTexture::default()
        });
        asm.tex_brick(&BrickTexture {
            fac_out: 6,
            ..BrickTexture::default()
        });
        asm.curves(CurveKind::Float, 1.0.into(), 5, 6, true, (0.0, 1.0), &[Float4::splat(0.5); 3]);
        asm.end();
        let program = asm.finish();

        let kinds: Vec<_> = program.instructions().unwrap().into_iter().map(|(_, k)| k).collect();
        assert_eq!(
            kinds,
            vec![
                OpcodeKind::Math,
                OpcodeKind::RgbRamp,
                OpcodeKind::TexNoise,
                OpcodeKind::TexBrick,
                OpcodeKind::Curves,
                OpcodeKind::End
            ]
        );
        program.verify(FeatureMask::CORE, 255).unwrap();
    }

    #[test]
    fn test_tracks_stack_size() {
        let mut asm = Assembler::new();
        asm.value_vector(10, Float3::ONE).value_scalar(2, 1.0);
        assert_eq!(asm.finish().stack_size(), 13);
    }

    #[test]
    fn test_jump_labels() {
        let mut asm = Assembler::new();
        asm.entry(ShaderKind::Surface);
        let skip = asm.jump_if_one(0);
        asm.value_vector(1, Float3::ONE);
        asm.bind(skip);
        asm.end();
        let program = asm.finish();
        assert_eq!(program.words()[0].b, 2);
        program.verify(FeatureMask::CORE, 255).unwrap();
    }

    #[test]
    fn test_select_entry_binding() {
        let mut asm = Assembler::new();
        asm.entry(ShaderKind::Surface).entry(ShaderKind::Displacement);
        let select = asm.select_entry();
        asm.bind_select(select, ShaderKind::Surface);
        asm.end();
        asm.bind_select(select, ShaderKind::Displacement);
        asm.end();
        let program = asm.finish();
        let word = program.words()[0];
        assert_eq!((word.a, word.b, word.c), (1, NO_ENTRY, 2));
        program.verify(FeatureMask::CORE, 255).unwrap();
    }
}
