//! Optional node categories.
//!
//! A [`FeatureMask`] is fixed when an executor is built. Opcodes whose
//! category is not in the mask dispatch to a no-op that still consumes the
//! instruction's full width, so a program compiled for a richer target runs
//! unchanged on a reduced one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A set of enabled opcode categories.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureMask(u32);

impl std::ops::BitOr for FeatureMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for FeatureMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl FeatureMask {
    /// Always-available opcodes.
    pub const CORE: Self = Self(0);
    /// Opcodes that trace rays (ambient occlusion).
    pub const RAYTRACE: Self = Self(1 << 0);
    /// Bump evaluation and the bump node.
    pub const BUMP: Self = Self(1 << 1);
    /// Writes to the AOV buffer.
    pub const AOV: Self = Self(1 << 2);
    /// Volume closures.
    pub const VOLUME: Self = Self(1 << 3);

    pub const ALL: Self = Self(Self::RAYTRACE.0 | Self::BUMP.0 | Self::AOV.0 | Self::VOLUME.0);

    const NAMED: [(Self, &'static str); 4] = [
        (Self::RAYTRACE, "raytrace"),
        (Self::BUMP, "bump"),
        (Self::AOV, "aov"),
        (Self::VOLUME, "volume"),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `None` if unknown bits are set.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Returns `true` if this mask includes all bits in `other`.
    ///
    /// Every mask contains [`FeatureMask::CORE`].
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Short name of a single category.
    pub fn name(self) -> &'static str {
        Self::NAMED
            .iter()
            .find(|(mask, _)| *mask == self)
            .map_or("core", |(_, name)| name)
    }

    /// Parse a category name as used in configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "core" {
            return Some(Self::CORE);
        }
        Self::NAMED
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(mask, _)| *mask)
    }
}

impl Default for FeatureMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Debug for FeatureMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = Self::NAMED
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "FeatureMask({})", names.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_is_always_contained() {
        assert!(FeatureMask::CORE.contains(FeatureMask::CORE));
        assert!(FeatureMask::BUMP.contains(FeatureMask::CORE));
        assert!(!FeatureMask::CORE.contains(FeatureMask::BUMP));
    }

    #[test]
    fn test_union_and_removal() {
        let mask = FeatureMask::BUMP | FeatureMask::AOV;
        assert!(mask.contains(FeatureMask::AOV));
        assert!(!mask.contains(FeatureMask::VOLUME));
        assert!(!FeatureMask::ALL.without(FeatureMask::VOLUME).contains(FeatureMask::VOLUME));
    }

    #[test]
    fn test_names_round_trip() {
        for mask in [
            FeatureMask::CORE,
            FeatureMask::RAYTRACE,
            FeatureMask::BUMP,
            FeatureMask::AOV,
            FeatureMask::VOLUME,
        ] {
            assert_eq!(FeatureMask::from_name(mask.name()), Some(mask));
        }
        assert_eq!(FeatureMask::from_bits(1 << 9), None);
    }

    #[test]
    fn test_serde_is_plain_bits() {
        let json = serde_json::to_string(&(FeatureMask::BUMP | FeatureMask::AOV)).unwrap();
        assert_eq!(json, "6");
    }
}
