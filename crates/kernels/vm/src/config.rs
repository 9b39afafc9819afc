//! Executor configuration.

use serde::{Deserialize, Serialize};

use crate::closure::MIN_ARENA_BYTES;
use crate::encoding::UNCONNECTED;
use crate::features::FeatureMask;

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("stack_capacity must be in 3..=255, got {0}")]
    StackCapacity(u32),

    #[error("closure_slots must be in 1..=255, got {0}")]
    ClosureSlots(u32),

    #[error("arena_bytes must be at least {min}, got {bytes}")]
    ArenaTooSmall { bytes: usize, min: usize },

    #[error("limits.max_instructions must be > 0")]
    ZeroInstructionLimit,
}

/// How contract violations are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return the first violation as an error.
    Strict,
    /// Record violations on the output and keep going with null closures and
    /// unwritten registers. Fatal violations end the invocation early.
    Degrade,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Degrade
        }
    }
}

/// Execution limits for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Instructions executed before the invocation is abandoned.
    pub max_instructions: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_instructions: 1_000_000,
        }
    }
}

/// Executor configuration.
///
/// Loaded from JSON by hosts; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Float registers per invocation.
    pub stack_capacity: u32,
    /// Closure slots addressable by closure instructions.
    pub closure_slots: u32,
    /// Byte budget of the closure arena.
    pub arena_bytes: usize,
    pub limits: Limits,
    pub features: FeatureMask,
    pub error_policy: ErrorPolicy,
}

impl VmConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(3..=UNCONNECTED).contains(&self.stack_capacity) {
            return Err(ConfigError::StackCapacity(self.stack_capacity));
        }
        if !(1..=UNCONNECTED).contains(&self.closure_slots) {
            return Err(ConfigError::ClosureSlots(self.closure_slots));
        }
        if self.arena_bytes < MIN_ARENA_BYTES {
            return Err(ConfigError::ArenaTooSmall {
                bytes: self.arena_bytes,
                min: MIN_ARENA_BYTES,
            });
        }
        if self.limits.max_instructions == 0 {
            return Err(ConfigError::ZeroInstructionLimit);
        }
        Ok(())
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_capacity: 255,
            closure_slots: 64,
            arena_bytes: 16 * 1024,
            limits: Limits::default(),
            features: FeatureMask::ALL,
            error_policy: ErrorPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        VmConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = VmConfig {
            stack_capacity: 2,
            ..VmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::StackCapacity(2)));

        let config = VmConfig {
            closure_slots: 0,
            ..VmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ClosureSlots(0)));

        let config = VmConfig {
            arena_bytes: 8,
            ..VmConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ArenaTooSmall { .. })));

        let config = VmConfig {
            limits: Limits { max_instructions: 0 },
            ..VmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroInstructionLimit));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "arena_bytes": 2048, "error_policy": "degrade", "features": 2 }"#;
        let config: VmConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.arena_bytes, 2048);
        assert_eq!(config.error_policy, ErrorPolicy::Degrade);
        assert_eq!(config.features, FeatureMask::BUMP);
        assert_eq!(config.stack_capacity, 255);
        assert_eq!(config.limits, Limits::default());
    }
}
