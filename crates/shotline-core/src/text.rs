//! Timed text overlays.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::geometry::Vec2;
use crate::keyframe::Easing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAnimationKind {
    FadeIn,
    FadeOut,
}

/// Opacity animation for a text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnimation {
    pub kind: TextAnimationKind,
    /// Animation length in seconds; the whole layer duration when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub easing: Easing,
}

/// A text overlay shown during `[start_time, start_time + duration)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    pub id: String,
    pub text: String,
    pub start_time: f64,
    pub duration: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Anchor in normalized canvas coordinates (0,0 top-left).
    #[serde(default = "default_anchor")]
    pub anchor: Vec2,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_color")]
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<TextAnimation>,
}

fn default_true() -> bool {
    true
}

fn default_anchor() -> Vec2 {
    Vec2::new(0.5, 0.85)
}

fn default_font_size() -> f32 {
    32.0
}

fn default_color() -> Color {
    Color::WHITE
}

impl TextLayer {
    pub fn new(id: impl Into<String>, text: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            start_time,
            duration,
            enabled: true,
            anchor: default_anchor(),
            font_size: default_font_size(),
            color: default_color(),
            animation: None,
        }
    }

    pub fn with_animation(mut self, animation: TextAnimation) -> Self {
        self.animation = Some(animation);
        self
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Whether the layer is drawn at shot-relative time `t`.
    pub fn is_visible_at(&self, t: f64) -> bool {
        self.enabled && t >= self.start_time && t < self.end_time()
    }

    /// Opacity at shot-relative time `t`, in `[0, 1]`.
    ///
    /// Fade-in ramps up from the layer start; fade-out ramps down into the
    /// layer end. Outside the animation window the layer is fully opaque.
    pub fn opacity_at(&self, t: f64) -> f64 {
        let Some(anim) = &self.animation else {
            return 1.0;
        };
        let span = anim
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.duration)
            .min(self.duration);
        if !(span > 0.0) {
            return 1.0;
        }
        match anim.kind {
            TextAnimationKind::FadeIn => {
                let progress = (t - self.start_time) / span;
                anim.easing.apply(progress)
            }
            TextAnimationKind::FadeOut => {
                let progress = (t - (self.end_time() - span)) / span;
                1.0 - anim.easing.apply(progress)
            }
        }
    }
}
