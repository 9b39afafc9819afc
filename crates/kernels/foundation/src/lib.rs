//! Umbra Foundation
//!
//! Primitives shared by the node library and the shading VM: small float
//! vectors, affine transforms, values with screen-space differentials,
//! stable hashing for interned names, and the lattice hash used by every
//! procedural texture.

pub mod dual;
pub mod hash;
pub mod scalar;
pub mod stable_hash;
pub mod symbols;
pub mod transform;
pub mod vector;

pub use dual::{Dual, Dual1, Dual2, Dual3};
pub use stable_hash::{fnv1a64, fnv1a64_mix, fnv1a64_str, FNV1A_OFFSET_BASIS_64, FNV1A_PRIME_64};
pub use symbols::{std_symbols, symbol_table, Symbol, SymbolCollision, SymbolTable};
pub use transform::Transform;
pub use vector::{Float2, Float3, Float4};
