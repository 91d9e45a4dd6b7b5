//! Engine configuration.

use crate::error::{EngineError, Result};
use crate::types::Axis;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of scheduler worker threads.
    pub worker_threads: usize,

    /// Prefix for worker thread names.
    pub thread_name: String,

    /// Viewport splitting of asynchronous changesets (None = disabled).
    pub split: Option<SplitConfig>,

    /// Default buffer size for channel subscriptions.
    pub subscription_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            thread_name: "cascade-worker".to_string(),
            split: None,
            subscription_buffer_size: 256,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(EngineError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.subscription_buffer_size == 0 {
            return Err(EngineError::InvalidConfig(
                "subscription_buffer_size must be at least 1".to_string(),
            ));
        }
        if let Some(split) = &self.split {
            split.validate()?;
        }
        Ok(())
    }
}

/// Tuning for the default viewport splitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Axis items are stacked along.
    pub axis: Axis,

    /// Extent assumed for items that have not been rendered yet.
    pub estimated_item_extent: f64,

    /// Max inserts/updates per off-screen sub-batch.
    pub batch_size: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            axis: Axis::Vertical,
            estimated_item_extent: 44.0,
            batch_size: 32,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EngineError::InvalidConfig(
                "split.batch_size must be at least 1".to_string(),
            ));
        }
        if !(self.estimated_item_extent > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "split.estimated_item_extent must be positive (got {})",
                self.estimated_item_extent
            )));
        }
        Ok(())
    }
}
