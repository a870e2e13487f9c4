//! # Allocation Configuration
//!
//! Settings that shape how the sale form splits payments.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_ALLOCATION_STRATEGY=proportional                             │
//! │     TALLY_MAX_PAYMENT_METHODS=4                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally-pos/allocation.toml (Linux)                        │
//! │     ~/Library/Application Support/com.tally.pos/allocation.toml        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ordered_sequential, 10 payment methods                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # allocation.toml
//! strategy = "ordered_sequential"  # ordered_sequential | proportional_by_coverage
//! max_payment_methods = 10
//! ```
//!
//! This is the only place in the crate that touches the file system, and
//! only when the host application asks it to.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::allocation::AllocationStrategy;
use crate::error::{CoreError, CoreResult};
use crate::MAX_PAYMENT_METHODS;

/// Environment variable overriding [`AllocationConfig::strategy`].
pub const ENV_ALLOCATION_STRATEGY: &str = "TALLY_ALLOCATION_STRATEGY";

/// Environment variable overriding [`AllocationConfig::max_payment_methods`].
pub const ENV_MAX_PAYMENT_METHODS: &str = "TALLY_MAX_PAYMENT_METHODS";

// =============================================================================
// Allocation Config
// =============================================================================

/// Configuration for one register's sale forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// How subtotals are split across payment rows.
    #[serde(default)]
    pub strategy: AllocationStrategy,

    /// Upper bound on payment rows per sale.
    #[serde(default = "default_max_payment_methods")]
    pub max_payment_methods: usize,
}

fn default_max_payment_methods() -> usize {
    MAX_PAYMENT_METHODS
}

impl Default for AllocationConfig {
    fn default() -> Self {
        AllocationConfig {
            strategy: AllocationStrategy::default(),
            max_payment_methods: default_max_payment_methods(),
        }
    }
}

impl AllocationConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (allocation.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CoreResult<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    fn load_with(
        config_path: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading allocation config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides_from(lookup);
        config.validate()?;

        info!(
            strategy = %config.strategy,
            max_payment_methods = config.max_payment_methods,
            "Allocation config loaded"
        );
        Ok(config)
    }

    /// Like [`load`](Self::load), but falls back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load allocation config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_payment_methods == 0 {
            return Err(CoreError::InvalidConfig(
                "max_payment_methods must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_ALLOCATION_STRATEGY) {
            match raw.parse::<AllocationStrategy>() {
                Ok(strategy) => {
                    debug!(strategy = %strategy, "Overriding allocation strategy from environment");
                    self.strategy = strategy;
                }
                Err(_) => warn!(value = %raw, "Unknown allocation strategy in environment"),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_PAYMENT_METHODS) {
            match raw.trim().parse::<usize>() {
                Ok(max) => {
                    debug!(max, "Overriding max payment methods from environment");
                    self.max_payment_methods = max;
                }
                Err(_) => warn!(value = %raw, "Invalid max payment methods in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("allocation.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AllocationConfig::default();
        assert_eq!(config.strategy, AllocationStrategy::OrderedSequential);
        assert_eq!(config.max_payment_methods, MAX_PAYMENT_METHODS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let config = AllocationConfig::from_toml_str(
            r#"
            strategy = "proportional_by_coverage"
            max_payment_methods = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.strategy, AllocationStrategy::ProportionalByCoverage);
        assert_eq!(config.max_payment_methods, 3);

        // Missing keys fall back to defaults
        let config = AllocationConfig::from_toml_str("").unwrap();
        assert_eq!(config, AllocationConfig::default());

        assert!(matches!(
            AllocationConfig::from_toml_str("strategy = \"coin_flip\""),
            Err(CoreError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AllocationConfig::default();
        assert!(config.validate().is_ok());

        config.max_payment_methods = 0;
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AllocationConfig::default();
        config.apply_overrides_from(env(&[
            (ENV_ALLOCATION_STRATEGY, "proportional"),
            (ENV_MAX_PAYMENT_METHODS, " 4 "),
        ]));

        assert_eq!(config.strategy, AllocationStrategy::ProportionalByCoverage);
        assert_eq!(config.max_payment_methods, 4);
    }

    #[test]
    fn test_invalid_env_overrides_are_ignored() {
        let mut config = AllocationConfig::default();
        config.apply_overrides_from(env(&[
            (ENV_ALLOCATION_STRATEGY, "round_robin"),
            (ENV_MAX_PAYMENT_METHODS, "many"),
        ]));

        assert_eq!(config, AllocationConfig::default());
    }

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir().join(format!("tally-allocation-{}.toml", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AllocationConfig::load_with(Some(temp_config_path()), env(&[])).unwrap();
        assert_eq!(config, AllocationConfig::default());
    }

    #[test]
    fn test_load_file_then_env() {
        let path = temp_config_path();
        std::fs::write(&path, "strategy = \"proportional\"\nmax_payment_methods = 2\n").unwrap();

        let from_file = AllocationConfig::load_with(Some(path.clone()), env(&[]));
        let with_env = AllocationConfig::load_with(
            Some(path.clone()),
            env(&[(ENV_MAX_PAYMENT_METHODS, "6")]),
        );
        let rejected = AllocationConfig::load_with(
            Some(path.clone()),
            env(&[(ENV_MAX_PAYMENT_METHODS, "0")]),
        );
        std::fs::remove_file(&path).unwrap();

        let from_file = from_file.unwrap();
        assert_eq!(from_file.strategy, AllocationStrategy::ProportionalByCoverage);
        assert_eq!(from_file.max_payment_methods, 2);

        let with_env = with_env.unwrap();
        assert_eq!(with_env.strategy, AllocationStrategy::ProportionalByCoverage);
        assert_eq!(with_env.max_payment_methods, 6);

        assert!(matches!(rejected, Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_toml_serialization() {
        let config = AllocationConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("strategy = \"ordered_sequential\""));
        assert!(toml_str.contains("max_payment_methods = 10"));
    }
}
