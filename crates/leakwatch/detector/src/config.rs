//! Detector configuration.
//!
//! Static settings loaded once at startup. The live `{delay, handler}` pair is
//! held by the callback registry and replaced through `LeakDetector::configure`;
//! `delay_ms` here only seeds it.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DetectorResult;

/// Configuration for the leak detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Grace period between a detach and its liveness probe, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Render a snapshot of leaked nodes.
    #[serde(default = "default_true")]
    pub capture_snapshots: bool,

    /// Remember reported nodes so later sweeps can note when they finally
    /// deallocate, and so a live node is never reported twice.
    #[serde(default = "default_true")]
    pub track_late_deallocation: bool,

    /// Class names added to the built-in ignore lists.
    #[serde(default)]
    pub ignore: IgnoreListConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            capture_snapshots: true,
            track_late_deallocation: true,
            ignore: IgnoreListConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing path or a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> DetectorResult<Self> {
        match path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)?;
                Self::from_toml(&contents)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> DetectorResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Initial detection delay.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = delay.as_millis() as u64;
        self
    }
}

/// Additional class names to ignore, per node kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IgnoreListConfig {
    #[serde(default)]
    pub containers: Vec<String>,

    #[serde(default)]
    pub leaves: Vec<String>,

    #[serde(default)]
    pub root_containers: Vec<String>,
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}
