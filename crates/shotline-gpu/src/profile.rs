//! Performance tiers and their rendering limits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Named performance tier, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileName {
    UltraLow,
    Low,
    Medium,
    High,
    UltraHigh,
}

impl ProfileName {
    pub const ALL: [ProfileName; 5] = [
        Self::UltraLow,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::UltraHigh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UltraLow => "ultra-low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::UltraHigh => "ultra-high",
        }
    }

    /// Next weaker tier, if any.
    pub fn step_down(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|p| *p == self)?;
        idx.checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Next stronger tier, if any.
    pub fn step_up(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|p| *p == self)?;
        Self::ALL.get(idx + 1).copied()
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown performance profile: {0}")]
pub struct UnknownProfile(pub String);

impl FromStr for ProfileName {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownProfile(s.to_string()))
    }
}

/// Kernel precision/cost tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShaderComplexity {
    Low,
    Medium,
    High,
}

impl ShaderComplexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Adapter power preference requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    LowPower,
    Default,
    HighPerformance,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(p: PowerPreference) -> Self {
        match p {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::Default => wgpu::PowerPreference::None,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Rendering-quality limits of one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub name: ProfileName,
    pub target_fps: u32,
    pub max_effects: usize,
    /// Longest texture edge the compositor may allocate.
    pub texture_size: u32,
    pub shader_complexity: ShaderComplexity,
    pub antialiasing: bool,
    pub power_preference: PowerPreference,
}

impl PerformanceProfile {
    /// Built-in limits for a tier, before any device policy is applied.
    pub fn preset(name: ProfileName) -> Self {
        let (target_fps, max_effects, texture_size, shader_complexity, antialiasing, power) =
            match name {
                ProfileName::UltraLow => (24, 2, 1024, ShaderComplexity::Low, false, PowerPreference::LowPower),
                ProfileName::Low => (30, 4, 2048, ShaderComplexity::Low, false, PowerPreference::LowPower),
                ProfileName::Medium => (30, 6, 2048, ShaderComplexity::Medium, false, PowerPreference::Default),
                ProfileName::High => (60, 8, 4096, ShaderComplexity::High, true, PowerPreference::HighPerformance),
                ProfileName::UltraHigh => (60, 12, 4096, ShaderComplexity::High, true, PowerPreference::HighPerformance),
            };
        Self {
            name,
            target_fps,
            max_effects,
            texture_size,
            shader_complexity,
            antialiasing,
            power_preference: power,
        }
    }

    /// Low-power, no-antialiasing variant for a device shared with
    /// another heavyweight process.
    pub fn conservative(mut self) -> Self {
        self.power_preference = PowerPreference::LowPower;
        self.antialiasing = false;
        self
    }

    /// Wall-clock budget of one frame at `target_fps`.
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }
}

impl Default for PerformanceProfile {
    fn default() -> Self {
        Self::preset(ProfileName::Low).conservative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("ultra-high".parse::<ProfileName>(), Ok(ProfileName::UltraHigh));
        assert_eq!(" Medium ".parse::<ProfileName>(), Ok(ProfileName::Medium));
        assert!("turbo".parse::<ProfileName>().is_err());
    }

    #[test]
    fn test_step_bounds() {
        assert_eq!(ProfileName::UltraLow.step_down(), None);
        assert_eq!(ProfileName::UltraHigh.step_up(), None);
        assert_eq!(ProfileName::Medium.step_down(), Some(ProfileName::Low));
        assert_eq!(ProfileName::Medium.step_up(), Some(ProfileName::High));
    }

    #[test]
    fn test_presets_scale_with_tier() {
        let caps: Vec<usize> = ProfileName::ALL
            .iter()
            .map(|n| PerformanceProfile::preset(*n).max_effects)
            .collect();
        assert!(caps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(PerformanceProfile::preset(ProfileName::Low).max_effects, 4);
    }

    #[test]
    fn test_conservative_overrides() {
        let p = PerformanceProfile::preset(ProfileName::UltraHigh).conservative();
        assert_eq!(p.power_preference, PowerPreference::LowPower);
        assert!(!p.antialiasing);
        assert_eq!(p.max_effects, 12);
    }

    #[test]
    fn test_frame_budget() {
        let p = PerformanceProfile::preset(ProfileName::High);
        assert_eq!(p.frame_budget(), Duration::from_secs_f64(1.0 / 60.0));
    }
}
