//! Transition descriptors attached to the outgoing shot.

use serde::{Deserialize, Serialize};

use crate::keyframe::Easing;

/// Transition algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    #[default]
    Fade,
    Dissolve,
    Wipe,
    Slide,
    /// Any type this build does not know; rendered as a fade.
    #[serde(other)]
    Unknown,
}

/// Direction for wipes and slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionDirection {
    Left,
    Right,
    Up,
    Down,
    In,
    Out,
}

/// A timed blend into the following shot.
///
/// Transition time is appended after the outgoing shot's duration; it does
/// not overlap the incoming shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(rename = "type", default)]
    pub kind: TransitionKind,
    pub duration: f64,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<TransitionDirection>,
}

impl Transition {
    pub fn new(kind: TransitionKind, duration: f64) -> Self {
        Self {
            kind,
            duration,
            easing: Easing::Linear,
            direction: None,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_direction(mut self, direction: TransitionDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Duration that contributes to the timeline; invalid values count as 0.
    pub fn effective_duration(&self) -> f64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            self.duration
        } else {
            0.0
        }
    }

    /// Eased progress for linear progress `p`.
    pub fn eased(&self, p: f64) -> f64 {
        self.easing.apply(p)
    }
}
