//! Rolling frame-rate windows and tier recommendations.

use std::time::{Duration, Instant};

use crate::arbiter::GpuMemoryUsage;
use crate::profile::{PerformanceProfile, ProfileName};

/// Length of one sampling window.
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

/// One completed sampling window.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub fps: f64,
    pub memory_usage: GpuMemoryUsage,
    pub profile: ProfileName,
}

/// Counts frames over consecutive windows of [`FPS_WINDOW`].
#[derive(Debug, Clone, Default)]
pub struct FpsWindow {
    start: Option<Instant>,
    frames: u32,
}

impl FpsWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a frame presented at `now`. Returns the measured FPS when
    /// this frame closes a window.
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        let start = *self.start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < FPS_WINDOW {
            return None;
        }

        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.start = Some(now);
        self.frames = 0;
        Some(fps)
    }

    pub fn reset(&mut self) {
        self.start = None;
        self.frames = 0;
    }
}

/// A tier change the caller may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierAdvice {
    StepDown(ProfileName),
    StepUp(ProfileName),
}

impl TierAdvice {
    pub fn target(self) -> ProfileName {
        match self {
            TierAdvice::StepDown(p) | TierAdvice::StepUp(p) => p,
        }
    }
}

/// Recommends tier changes from consecutive performance reports.
///
/// The advisor never mutates the arbiter; the caller decides whether to
/// apply a recommendation.
#[derive(Debug, Clone)]
pub struct TierAdvisor {
    /// Fraction of target FPS below which a window counts as slow.
    pub low_ratio: f64,
    /// Fraction of target FPS above which a window counts as headroom.
    pub high_ratio: f64,
    /// Consecutive windows required before advising.
    pub sustain: u32,
    /// Highest tier the advisor will step up to.
    pub ceiling: ProfileName,
    slow_windows: u32,
    fast_windows: u32,
}

impl Default for TierAdvisor {
    fn default() -> Self {
        Self {
            low_ratio: 0.8,
            high_ratio: 0.98,
            sustain: 3,
            ceiling: ProfileName::Medium,
            slow_windows: 0,
            fast_windows: 0,
        }
    }
}

impl TierAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ceiling(mut self, ceiling: ProfileName) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Feed one report. Returns advice once a trend has been sustained.
    pub fn observe(&mut self, report: &PerformanceReport) -> Option<TierAdvice> {
        let target = PerformanceProfile::preset(report.profile).target_fps as f64;

        if report.fps < target * self.low_ratio {
            self.fast_windows = 0;
            self.slow_windows += 1;
            if self.slow_windows >= self.sustain {
                self.slow_windows = 0;
                return report.profile.step_down().map(TierAdvice::StepDown);
            }
        } else if report.fps >= target * self.high_ratio {
            self.slow_windows = 0;
            self.fast_windows += 1;
            if self.fast_windows >= self.sustain {
                self.fast_windows = 0;
                return report
                    .profile
                    .step_up()
                    .filter(|p| *p <= self.ceiling)
                    .map(TierAdvice::StepUp);
            }
        } else {
            self.slow_windows = 0;
            self.fast_windows = 0;
        }
        None
    }
}
