//! Configuration for the transaction engine.
//!
//! This module provides [`EngineConfig`], which bounds runaway transactions.
//! It implements [`serde::Deserialize`] for loading from external sources.
//!
//! # Example
//!
//! ```
//! # use armillary::config::EngineConfig;
//! let config = EngineConfig::default();
//! assert!(config.max_operations() > 0);
//! ```

use serde::Deserialize;

const DEFAULT_MAX_OPERATIONS: usize = 10_000;
const DEFAULT_MAX_RULE_PASSES: usize = 100;

/// Caps on how much work a single transaction may do.
///
/// Operations enqueue operations and rules enqueue more of both, so a buggy
/// operation set can feed itself forever. Hitting either cap aborts the
/// transaction with an error instead of spinning.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Most operations one transaction may execute, nested ones included.
    #[serde(default = "default_max_operations")]
    max_operations: usize,

    /// Most rule drain passes one transaction may run.
    #[serde(default = "default_max_rule_passes")]
    max_rule_passes: usize,
}

fn default_max_operations() -> usize {
    DEFAULT_MAX_OPERATIONS
}

fn default_max_rule_passes() -> usize {
    DEFAULT_MAX_RULE_PASSES
}

impl EngineConfig {
    /// Creates a config with explicit caps.
    ///
    /// # Arguments
    ///
    /// * `max_operations` - Most operations one transaction may execute.
    /// * `max_rule_passes` - Most rule drain passes one transaction may run.
    pub fn new(max_operations: usize, max_rule_passes: usize) -> Self {
        Self {
            max_operations,
            max_rule_passes,
        }
    }

    /// Returns the operation cap.
    pub fn max_operations(&self) -> usize {
        self.max_operations
    }

    /// Returns the rule pass cap.
    pub fn max_rule_passes(&self) -> usize {
        self.max_rule_passes
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_rule_passes: DEFAULT_MAX_RULE_PASSES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_operations(), DEFAULT_MAX_OPERATIONS);
        assert_eq!(config.max_rule_passes(), DEFAULT_MAX_RULE_PASSES);
    }

    #[test]
    fn test_explicit_caps() {
        let config = EngineConfig::new(3, 1);
        assert_eq!(config.max_operations(), 3);
        assert_eq!(config.max_rule_passes(), 1);
    }
}
