//! Scalar and vector math nodes.
//!
//! No operation produces NaN for finite input. Division, modulo, logarithm
//! and power variants fall back to zero on degenerate arguments; results
//! only become infinite when the exact result exceeds the `f32` range.

use umbra_foundation::scalar::{
    compare, ping_pong, safe_acos, safe_asin, safe_divide, safe_floored_modulo, safe_inverse_sqrt,
    safe_log, safe_modulo, safe_pow, safe_sqrt, sign, smooth_max, smooth_min, smoothstep, snap,
    wrap,
};
use umbra_foundation::Float3;

node_enum! {
    /// Operation of the scalar math node.
    pub enum MathOp {
        Add = 0 => "add",
        Subtract = 1 => "subtract",
        Multiply = 2 => "multiply",
        Divide = 3 => "divide",
        Sine = 4 => "sine",
        Cosine = 5 => "cosine",
        Tangent = 6 => "tangent",
        Arcsine = 7 => "arcsine",
        Arccosine = 8 => "arccosine",
        Arctangent = 9 => "arctangent",
        Power = 10 => "power",
        Logarithm = 11 => "logarithm",
        Minimum = 12 => "minimum",
        Maximum = 13 => "maximum",
        Round = 14 => "round",
        LessThan = 15 => "less_than",
        GreaterThan = 16 => "greater_than",
        Modulo = 17 => "modulo",
        Absolute = 18 => "absolute",
        Arctan2 = 19 => "arctan2",
        Floor = 20 => "floor",
        Ceil = 21 => "ceil",
        Fraction = 22 => "fraction",
        Sqrt = 23 => "sqrt",
        InverseSqrt = 24 => "inverse_sqrt",
        Sign = 25 => "sign",
        Exponent = 26 => "exponent",
        Radians = 27 => "radians",
        Degrees = 28 => "degrees",
        Sinh = 29 => "sinh",
        Cosh = 30 => "cosh",
        Tanh = 31 => "tanh",
        Trunc = 32 => "trunc",
        Snap = 33 => "snap",
        Wrap = 34 => "wrap",
        Compare = 35 => "compare",
        MultiplyAdd = 36 => "multiply_add",
        PingPong = 37 => "ping_pong",
        SmoothMin = 38 => "smooth_min",
        SmoothMax = 39 => "smooth_max",
        FlooredModulo = 40 => "floored_modulo",
    }
}

node_enum! {
    /// Operation of the vector math node.
    pub enum VectorMathOp {
        Add = 0 => "add",
        Subtract = 1 => "subtract",
        Multiply = 2 => "multiply",
        Divide = 3 => "divide",
        CrossProduct = 4 => "cross_product",
        Project = 5 => "project",
        Reflect = 6 => "reflect",
        DotProduct = 7 => "dot_product",
        Distance = 8 => "distance",
        Length = 9 => "length",
        Scale = 10 => "scale",
        Normalize = 11 => "normalize",
        Snap = 12 => "snap",
        Floor = 13 => "floor",
        Ceil = 14 => "ceil",
        Modulo = 15 => "modulo",
        Fraction = 16 => "fraction",
        Absolute = 17 => "absolute",
        Minimum = 18 => "minimum",
        Maximum = 19 => "maximum",
        Wrap = 20 => "wrap",
        Sine = 21 => "sine",
        Cosine = 22 => "cosine",
        Tangent = 23 => "tangent",
        Refract = 24 => "refract",
        Faceforward = 25 => "faceforward",
        MultiplyAdd = 26 => "multiply_add",
    }
}

node_enum! {
    /// Interpolation used by the map range node.
    pub enum MapRangeType {
        Linear = 0 => "linear",
        Stepped = 1 => "stepped",
        Smoothstep = 2 => "smoothstep",
        Smootherstep = 3 => "smootherstep",
    }
}

node_enum! {
    /// Clamp node mode.
    pub enum ClampType {
        /// Clamp to `[min, max]` as given.
        MinMax = 0 => "min_max",
        /// Clamp to the range spanned by `min` and `max` in either order.
        Range = 1 => "range",
    }
}

// === Scalar math ===

/// Evaluate a scalar math operation. `c` is only read by three-input ops.
pub fn math(op: MathOp, a: f32, b: f32, c: f32) -> f32 {
    use std::f32::consts::PI;
    match op {
        MathOp::Add => a + b,
        MathOp::Subtract => a - b,
        MathOp::Multiply => a * b,
        MathOp::Divide => safe_divide(a, b),
        MathOp::Sine => a.sin(),
        MathOp::Cosine => a.cos(),
        MathOp::Tangent => a.tan(),
        MathOp::Arcsine => safe_asin(a),
        MathOp::Arccosine => safe_acos(a),
        MathOp::Arctangent => a.atan(),
        MathOp::Power => safe_pow(a, b),
        MathOp::Logarithm => safe_log(a, b),
        MathOp::Minimum => a.min(b),
        MathOp::Maximum => a.max(b),
        MathOp::Round => (a + 0.5).floor(),
        MathOp::LessThan => (a < b) as u32 as f32,
        MathOp::GreaterThan => (a > b) as u32 as f32,
        MathOp::Modulo => safe_modulo(a, b),
        MathOp::FlooredModulo => safe_floored_modulo(a, b),
        MathOp::Absolute => a.abs(),
        MathOp::Arctan2 => a.atan2(b),
        MathOp::Floor => a.floor(),
        MathOp::Ceil => a.ceil(),
        MathOp::Fraction => a - a.floor(),
        MathOp::Sqrt => safe_sqrt(a),
        MathOp::InverseSqrt => safe_inverse_sqrt(a),
        MathOp::Sign => sign(a),
        MathOp::Exponent => a.exp(),
        MathOp::Radians => a * (PI / 180.0),
        MathOp::Degrees => a * (180.0 / PI),
        MathOp::Sinh => a.sinh(),
        MathOp::Cosh => a.cosh(),
        MathOp::Tanh => a.tanh(),
        MathOp::Trunc => a.trunc(),
        MathOp::Snap => snap(a, b),
        MathOp::Wrap => wrap(a, b, c),
        MathOp::Compare => compare(a, b, c),
        MathOp::MultiplyAdd => a * b + c,
        MathOp::PingPong => ping_pong(a, b),
        MathOp::SmoothMin => smooth_min(a, b, c),
        MathOp::SmoothMax => smooth_max(a, b, c),
    }
}

// === Vector math ===

/// Result of a vector math operation: a scalar for dot/distance/length, a
/// vector for everything else. The unused half is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VectorMathResult {
    pub value: f32,
    pub vector: Float3,
}

impl VectorMathResult {
    fn vector(vector: Float3) -> Self {
        Self { value: 0.0, vector }
    }

    fn value(value: f32) -> Self {
        Self {
            value,
            vector: Float3::ZERO,
        }
    }
}

/// Evaluate a vector math operation.
///
/// `scale` is the scalar parameter of `Scale` and the index of refraction of
/// `Refract`.
pub fn vector_math(
    op: VectorMathOp,
    a: Float3,
    b: Float3,
    c: Float3,
    scale: f32,
) -> VectorMathResult {
    use VectorMathResult as R;
    match op {
        VectorMathOp::Add => R::vector(a + b),
        VectorMathOp::Subtract => R::vector(a - b),
        VectorMathOp::Multiply => R::vector(a * b),
        VectorMathOp::Divide => R::vector(a.safe_divide(b)),
        VectorMathOp::CrossProduct => R::vector(a.cross(b)),
        VectorMathOp::Project => {
            let len_sq = b.dot(b);
            R::vector(if len_sq != 0.0 {
                b * (a.dot(b) / len_sq)
            } else {
                Float3::ZERO
            })
        }
        VectorMathOp::Reflect => R::vector(a.reflect(b.safe_normalize())),
        VectorMathOp::Refract => R::vector(a.refract(b.safe_normalize(), scale)),
        VectorMathOp::Faceforward => R::vector(a.faceforward(b, c)),
        VectorMathOp::MultiplyAdd => R::vector(a * b + c),
        VectorMathOp::DotProduct => R::value(a.dot(b)),
        VectorMathOp::Distance => R::value(a.distance(b)),
        VectorMathOp::Length => R::value(a.length()),
        VectorMathOp::Scale => R::vector(a * scale),
        VectorMathOp::Normalize => R::vector(a.safe_normalize()),
        VectorMathOp::Snap => R::vector(a.safe_divide(b).floor() * b),
        VectorMathOp::Floor => R::vector(a.floor()),
        VectorMathOp::Ceil => R::vector(a.ceil()),
        VectorMathOp::Modulo => R::vector(a.zip_map(b, safe_modulo)),
        VectorMathOp::Wrap => R::vector(Float3::new(
            wrap(a.x, b.x, c.x),
            wrap(a.y, b.y, c.y),
            wrap(a.z, b.z, c.z),
        )),
        VectorMathOp::Fraction => R::vector(a.fract()),
        VectorMathOp::Absolute => R::vector(a.abs()),
        VectorMathOp::Minimum => R::vector(a.min(b)),
        VectorMathOp::Maximum => R::vector(a.max(b)),
        VectorMathOp::Sine => R::vector(a.map(f32::sin)),
        VectorMathOp::Cosine => R::vector(a.map(f32::cos)),
        VectorMathOp::Tangent => R::vector(a.map(f32::tan)),
    }
}

// === Map range / clamp / mix ===

/// Parameters of the map range node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRange {
    pub from_min: f32,
    pub from_max: f32,
    pub to_min: f32,
    pub to_max: f32,
    pub steps: f32,
    pub clamp: bool,
}

fn smootherstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let x = safe_divide(x - edge0, edge1 - edge0).clamp(0.0, 1.0);
    x * x * x * (x * (x * 6.0 - 15.0) + 10.0)
}

/// Remap `value` from one range to another.
pub fn map_range(kind: MapRangeType, value: f32, r: &MapRange) -> f32 {
    let factor = match kind {
        MapRangeType::Linear => safe_divide(value - r.from_min, r.from_max - r.from_min),
        MapRangeType::Stepped => {
            let f = safe_divide(value - r.from_min, r.from_max - r.from_min);
            if r.steps > 0.0 {
                (f * (r.steps + 1.0)).floor() / r.steps
            } else {
                0.0
            }
        }
        MapRangeType::Smoothstep => {
            if r.from_min > r.from_max {
                1.0 - smoothstep(r.from_max, r.from_min, value)
            } else {
                smoothstep(r.from_min, r.from_max, value)
            }
        }
        MapRangeType::Smootherstep => {
            if r.from_min > r.from_max {
                1.0 - smootherstep(r.from_max, r.from_min, value)
            } else {
                smootherstep(r.from_min, r.from_max, value)
            }
        }
    };

    let mut result = r.to_min + factor * (r.to_max - r.to_min);
    if r.clamp && matches!(kind, MapRangeType::Linear | MapRangeType::Stepped) {
        result = if r.to_min > r.to_max {
            result.max(r.to_max).min(r.to_min)
        } else {
            result.max(r.to_min).min(r.to_max)
        };
    }
    result
}

pub fn clamp_node(kind: ClampType, value: f32, min: f32, max: f32) -> f32 {
    match kind {
        ClampType::MinMax => value.max(min).min(max),
        ClampType::Range if min > max => value.max(max).min(min),
        ClampType::Range => value.max(min).min(max),
    }
}

/// Linear blend of two scalars; the factor is saturated when `clamp_factor` is set.
pub fn mix_float(a: f32, b: f32, t: f32, clamp_factor: bool) -> f32 {
    let t = if clamp_factor { t.clamp(0.0, 1.0) } else { t };
    a * (1.0 - t) + b * t
}

/// Per-component blend of two vectors by a vector factor.
pub fn mix_vector(a: Float3, b: Float3, t: Float3, clamp_factor: bool) -> Float3 {
    let t = if clamp_factor {
        t.map(|v| v.clamp(0.0, 1.0))
    } else {
        t
    };
    a * (Float3::ONE - t) + b * t
}
