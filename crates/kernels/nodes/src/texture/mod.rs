//! Procedural texture patterns.
//!
//! Each texture takes an already mapped coordinate and returns plain values;
//! scaling and output routing happen in the VM handlers.

pub mod brick;
pub mod checker;
pub mod gradient;
pub mod magic;
pub mod noise;
pub mod wave;
pub mod white_noise;

pub use brick::{brick, BrickParams};
pub use checker::checker;
pub use gradient::{gradient, GradientType};
pub use magic::magic;
pub use noise::{musgrave_texture, noise_texture, NoiseTextureCoord, NoiseTextureOutput};
pub use wave::{wave, WaveParams};
pub use white_noise::white_noise;
