//! Umbra Node Library
//!
//! Pure functions behind every shading node: scalar and vector math, color
//! conversions and blend modes, ramps and curves, gradient noise and its
//! fractal variants, Voronoi, and the procedural texture patterns.
//!
//! Nothing in this crate touches the register file or the renderer. The VM
//! decodes operands, calls into these functions, and stores the results.
//! Every function is deterministic and returns finite values for finite input.

/// Declare a `u32`-encoded node mode enum.
///
/// Generates `from_u32` (the decoder used by the VM), `ALL` and `name`.
#[macro_export]
macro_rules! node_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[repr(u32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Decode from an instruction operand.
            pub fn from_u32(value: u32) -> Option<Self> {
                match value {
                    $(v if v == $value => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }
    };
}

pub mod color;
pub mod fractal;
pub mod geometry;
pub mod math;
pub mod noise;
pub mod ramp;
pub mod texture;
pub mod voronoi;

pub use color::BlendMode;
pub use fractal::NoiseType;
pub use geometry::{LayerWeightOutput, Mapping, MappingType};
pub use math::{MathOp, VectorMathOp};
pub use noise::NoiseCoord;
pub use voronoi::{VoronoiFeature, VoronoiMetric};
