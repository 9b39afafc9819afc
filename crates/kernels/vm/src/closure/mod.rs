//! Closures: weighted light-scattering terms built per invocation.
//!
//! A shader's result is a small expression tree of [`ClosureNode`]s: leaves
//! carry a scattering model and its parameters, `Scale` nodes multiply a
//! subtree by a color, `Add` nodes sum two subtrees. Nodes live in a
//! [`ClosureArena`] and are referred to by [`ClosureRef`] handles; a missing
//! closure is `None`.

mod arena;
mod tree;

use serde::{Deserialize, Serialize};
use umbra_foundation::Float3;

pub use arena::{ArenaError, ClosureArena, MAX_ALIGN, MIN_ARENA_BYTES, NODE_ALIGN};
pub use tree::{ClosureTree, WeightedClosure};

umbra_nodes::node_enum! {
    /// Scattering model of a closure leaf.
    pub enum ClosureKind {
        Diffuse = 0 => "diffuse",
        OrenNayar = 1 => "oren_nayar",
        Translucent = 2 => "translucent",
        GlossyGgx = 3 => "glossy_ggx",
        GlossyBeckmann = 4 => "glossy_beckmann",
        GlossyAshikhminShirley = 5 => "glossy_ashikhmin_shirley",
        Refraction = 6 => "refraction",
        Glass = 7 => "glass",
        Transparent = 8 => "transparent",
        Sheen = 9 => "sheen",
        Emission = 10 => "emission",
        Background = 11 => "background",
        Holdout = 12 => "holdout",
        VolumeAbsorption = 13 => "volume_absorption",
        VolumeScatter = 14 => "volume_scatter",
    }
}

impl ClosureKind {
    pub fn is_bsdf(self) -> bool {
        (self as u32) <= ClosureKind::Sheen as u32
    }

    pub fn is_emissive(self) -> bool {
        matches!(
            self,
            ClosureKind::Emission | ClosureKind::Background | ClosureKind::Holdout
        )
    }

    pub fn is_volume(self) -> bool {
        matches!(self, ClosureKind::VolumeAbsorption | ClosureKind::VolumeScatter)
    }

    /// Size of the parameter block that trails a leaf of this kind.
    pub fn param_bytes(self) -> usize {
        const F: usize = std::mem::size_of::<f32>();
        match self {
            ClosureKind::Diffuse | ClosureKind::Translucent => 3 * F,
            ClosureKind::OrenNayar
            | ClosureKind::GlossyGgx
            | ClosureKind::GlossyBeckmann
            | ClosureKind::Sheen => 4 * F,
            ClosureKind::GlossyAshikhminShirley => 5 * F,
            ClosureKind::Refraction | ClosureKind::Glass => 5 * F,
            ClosureKind::VolumeScatter => F,
            ClosureKind::Transparent
            | ClosureKind::Emission
            | ClosureKind::Background
            | ClosureKind::Holdout
            | ClosureKind::VolumeAbsorption => 0,
        }
    }
}

/// Kind-specific leaf parameters. Fields a kind doesn't use stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClosureParams {
    pub normal: Float3,
    pub roughness: f32,
    pub ior: f32,
    /// Anisotropy for glossy models, Henyey-Greenstein `g` for volume scatter.
    pub anisotropy: f32,
}

/// Handle to a node inside a [`ClosureArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClosureRef(pub(crate) u32);

impl ClosureRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClosureNode {
    Leaf {
        kind: ClosureKind,
        weight: Float3,
        params: ClosureParams,
    },
    Scale {
        child: ClosureRef,
        weight: Float3,
    },
    Add {
        a: ClosureRef,
        b: ClosureRef,
    },
}
