//! Preview runner configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shotline_core::Color;
use shotline_gpu::{DeviceLimits, ProfileName};

const CONFIG_FILE: &str = "preview.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Ceiling for all tracked GPU allocations.
    pub memory_ceiling_mb: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Overrides the tier chosen from device limits.
    pub initial_profile: Option<ProfileName>,
    /// Used instead of probing the adapter when set.
    pub device_limits: Option<DeviceLimits>,
    /// Step the profile down/up from sustained FPS reports.
    pub adaptive_tiering: bool,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    /// RGBA in `[0, 1]`.
    pub background: [f32; 4],
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            memory_ceiling_mb: 256,
            canvas_width: 1280,
            canvas_height: 720,
            initial_profile: None,
            device_limits: None,
            adaptive_tiering: true,
            log_filter: "info".into(),
            background: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl PreviewConfig {
    /// `<config dir>/shotline/preview.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("shotline").join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location when it exists, or
    /// fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)?;
        anyhow::ensure!(
            config.canvas_width > 0 && config.canvas_height > 0,
            "canvas size must be non-zero"
        );
        Ok(config)
    }

    pub fn ceiling_bytes(&self) -> usize {
        self.memory_ceiling_mb.saturating_mul(1024 * 1024)
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn background_color(&self) -> Color {
        Color::from(self.background.map(|c| c.clamp(0.0, 1.0)))
    }
}
