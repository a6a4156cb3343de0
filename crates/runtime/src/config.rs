//! Runtime configuration loaded from RON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use idle_core::RulesConfig;

use crate::error::{Result, RuntimeError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub rules: RulesConfig,
    /// Seed of the default random source.
    pub seed: u64,
    /// Simulated seconds per [`Runtime::step`](crate::Runtime::step).
    pub tick_seconds: f64,
    /// `tracing-subscriber` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl RuntimeConfig {
    pub const DEFAULT_TICK_SECONDS: f64 = 0.1;
    pub const DEFAULT_LOG_FILTER: &'static str = "info";

    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| RuntimeError::Ron(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_ron_str(&source)?;
        tracing::debug!(
            target: "runtime::config",
            path = %path.as_ref().display(),
            seed = config.seed,
            tick_seconds = config.tick_seconds,
            "loaded runtime config"
        );
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.tick_seconds.is_finite() || self.tick_seconds <= 0.0 {
            return Err(RuntimeError::InvalidTick(self.tick_seconds));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rules: RulesConfig::default(),
            seed: 0,
            tick_seconds: Self::DEFAULT_TICK_SECONDS,
            log_filter: Self::DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}
