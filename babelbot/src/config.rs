//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory. There are no
//! ambient globals: the loaded `Config` is broken apart in `main` and each
//! component receives exactly the piece it needs.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::policy::{PolicyConfig, PolicyKind};

/// The screen rectangle the game renders in, in global screen coordinates.
/// The agent treats it as an opaque region; where it comes from (manual
/// calibration, window lookup) is the operator's business.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// On-disk configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub region: CaptureRegion,

    /// Optional cap on frame height; larger captures are downscaled before
    /// detection. All configured pixel distances are interpreted in the
    /// (possibly downscaled) frame space.
    pub max_capture_height: Option<u32>,

    /// Color ranges and thresholds for the entity detector.
    pub detector: vision::DetectorConfig,

    /// Reference image of the level-up banner, captured once by the operator.
    /// Absent means the less reliable dark-overlay fallback is used.
    pub template_path: Option<PathBuf>,

    pub policy_kind: PolicyKind,
    pub policy: PolicyConfig,

    /// Delay between decision cycles (bounds CPU usage).
    pub tick_ms: u64,

    /// Pause after a failed capture or a failed cycle.
    pub backoff_ms: u64,

    /// Where upgrade statistics live. Default: the platform data directory.
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: CaptureRegion {
                left: 969,
                top: 50,
                width: 1574,
                height: 877,
            },
            max_capture_height: None,
            detector: vision::DetectorConfig::default(),
            template_path: None,
            policy_kind: PolicyKind::default(),
            policy: PolicyConfig::default(),
            tick_ms: 100,
            backoff_ms: 500,
            store_path: None,
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("babelbot.json"))
    }

    /// Load configuration from disk, falling back to defaults on missing file.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk.
    pub fn try_load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(&path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Resolved location of the upgrade statistics file.
    pub fn store_path_or_default(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        let base = dirs::data_dir().context("data_dir() unavailable")?;
        Ok(base.join("babelbot").join("upgrade_stats.json"))
    }
}
