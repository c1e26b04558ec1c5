use crate::catalog::Catalog;
use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

/// Playback speed for scripted steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pacing {
    /// Multiplier applied to every step delay. `0.0` plays a run instantly.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
}

fn default_time_scale() -> f64 {
    1.0
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
        }
    }
}

impl Pacing {
    pub fn instant() -> Self {
        Self { time_scale: 0.0 }
    }

    pub fn scale(&self, delay_ms: u64) -> std::time::Duration {
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return std::time::Duration::ZERO;
        }
        let scaled = (delay_ms as f64 * self.time_scale).round() as u64;
        std::time::Duration::from_millis(scaled)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Origin used for absolute share links.
    #[serde(default = "default_share_origin")]
    pub share_origin: String,
    #[serde(default)]
    pub pacing: Pacing,
    #[serde(default)]
    pub catalog: Catalog,
}

fn default_share_origin() -> String {
    "https://skillplay.dev/playground".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            share_origin: default_share_origin(),
            pacing: Pacing::default(),
            catalog: Catalog::default(),
        }
    }
}

impl Config {
    /// Load `.skillplay/config.yaml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        match crate::io::read_if_exists(&path)? {
            Some(data) => Ok(serde_yaml::from_str(&data)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::config_path(root), data.as_bytes())
    }
}
