//! Playback clock state machine.
//!
//! Pure bookkeeping: no threads, no wall time. The sequencer feeds it
//! elapsed deltas from its loop (or from [`crate::Sequencer::step`]).

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Result of advancing the clock by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not playing; nothing happened.
    Idle,
    /// Time moved to the contained value and a frame should be composited.
    Advanced(f64),
    /// Playback reached the end and the clock stopped.
    Ended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    state: PlayState,
    current_time: f64,
    speed: f64,
    total: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl PlaybackClock {
    pub fn new(total: f64) -> Self {
        Self {
            state: PlayState::Stopped,
            current_time: 0.0,
            speed: 1.0,
            total: sanitize_total(total),
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// New timeline length. The current time is clamped into it.
    pub fn set_total(&mut self, total: f64) {
        self.total = sanitize_total(total);
        self.current_time = self.current_time.min(self.total);
    }

    /// Returns `true` when the state changed.
    pub fn play(&mut self) -> bool {
        if self.state == PlayState::Playing {
            return false;
        }
        self.state = PlayState::Playing;
        true
    }

    /// Halt and keep the current time. Only a playing clock pauses.
    pub fn pause(&mut self) -> bool {
        if self.state != PlayState::Playing {
            return false;
        }
        self.state = PlayState::Paused;
        true
    }

    /// Halt and rewind to 0. Returns `true` when the state changed.
    pub fn stop(&mut self) -> bool {
        self.current_time = 0.0;
        if self.state == PlayState::Stopped {
            return false;
        }
        self.state = PlayState::Stopped;
        true
    }

    /// Move to `t`, clamped to `[0, total]`. NaN seeks to 0.
    pub fn seek(&mut self, t: f64) -> f64 {
        self.current_time = if t.is_nan() { 0.0 } else { t.clamp(0.0, self.total) };
        self.current_time
    }

    /// Clamp into `[MIN_SPEED, MAX_SPEED]`. NaN keeps the current speed.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        if !speed.is_nan() {
            self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        }
        self.speed
    }

    /// Advance by `elapsed` wall seconds scaled by the playback speed.
    pub fn advance(&mut self, elapsed: f64) -> TickOutcome {
        if self.state != PlayState::Playing {
            return TickOutcome::Idle;
        }
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        self.current_time += elapsed * self.speed;
        if self.current_time >= self.total {
            self.stop();
            TickOutcome::Ended
        } else {
            TickOutcome::Advanced(self.current_time)
        }
    }
}

fn sanitize_total(total: f64) -> f64 {
    if total.is_finite() {
        total.max(0.0)
    } else {
        0.0
    }
}
