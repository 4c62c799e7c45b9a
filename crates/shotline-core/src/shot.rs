//! Shots: the timed units of visual content in a sequence.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::effect::AppliedEffect;
use crate::keyframe::{KeyValue, KeyframeTrack};
use crate::text::TextLayer;
use crate::transition::Transition;

/// Opaque handle a pixel source provider resolves into frames
/// (a file path, a media id, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelSourceRef(pub String);

impl PixelSourceRef {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PixelSourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Property a keyframe track animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyKind {
    /// Canvas-pixel offset from the centered placement.
    Position,
    /// Uniform (scalar) or per-axis (vector) scale.
    Scale,
    /// Degrees, clockwise.
    Rotation,
    Opacity,
    /// Playback volume, read by audio collaborators.
    Volume,
    /// Free numeric id for caller-defined parameters.
    Param(u32),
}

impl PropertyKind {
    /// Value used when the property has no keyframes.
    pub fn default_value(self) -> KeyValue {
        match self {
            PropertyKind::Position => KeyValue::Vec2(DVec2::ZERO),
            PropertyKind::Scale | PropertyKind::Opacity | PropertyKind::Volume => {
                KeyValue::Scalar(1.0)
            }
            PropertyKind::Rotation | PropertyKind::Param(_) => KeyValue::Scalar(0.0),
        }
    }
}

/// A keyframed property of a shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatableProperty {
    pub property: PropertyKind,
    pub keyframes: KeyframeTrack,
}

impl AnimatableProperty {
    pub fn new(property: PropertyKind, keyframes: KeyframeTrack) -> Self {
        Self {
            property,
            keyframes,
        }
    }

    pub fn value_at(&self, t: f64) -> KeyValue {
        self.keyframes
            .evaluate_or(t, self.property.default_value())
    }
}

/// Evaluated transform/opacity state of a shot at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyValues {
    pub position: DVec2,
    pub scale: DVec2,
    pub rotation_degrees: f64,
    pub opacity: f64,
    pub volume: f64,
}

impl Default for PropertyValues {
    fn default() -> Self {
        Self {
            position: DVec2::ZERO,
            scale: DVec2::ONE,
            rotation_degrees: 0.0,
            opacity: 1.0,
            volume: 1.0,
        }
    }
}

/// One timed unit of visual content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Ordering index within the sequence.
    pub position: i32,
    /// Seconds.
    pub duration: f64,
    pub pixel_source: PixelSourceRef,
    #[serde(default)]
    pub effects: Vec<AppliedEffect>,
    #[serde(default)]
    pub text_layers: Vec<TextLayer>,
    #[serde(default)]
    pub animations: Vec<AnimatableProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_out: Option<Transition>,
}

impl Shot {
    pub fn new(position: i32, duration: f64, pixel_source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            duration,
            pixel_source: PixelSourceRef::new(pixel_source),
            effects: Vec::new(),
            text_layers: Vec::new(),
            animations: Vec::new(),
            transition_out: None,
        }
    }

    pub fn with_effect(mut self, effect: AppliedEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_text(mut self, layer: TextLayer) -> Self {
        self.text_layers.push(layer);
        self
    }

    pub fn with_animation(mut self, property: PropertyKind, keyframes: KeyframeTrack) -> Self {
        self.animations
            .push(AnimatableProperty::new(property, keyframes));
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition_out = Some(transition);
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

    /// Evaluate a single property at shot-relative time `t`.
    ///
    /// When several tracks target the same property the last one wins.
    pub fn property_at(&self, property: PropertyKind, t: f64) -> KeyValue {
        self.animations
            .iter()
            .rev()
            .find(|a| a.property == property)
            .map(|a| a.value_at(t))
            .unwrap_or_else(|| property.default_value())
    }

    /// Evaluate every transform/opacity property at shot-relative time `t`.
    pub fn properties_at(&self, t: f64) -> PropertyValues {
        PropertyValues {
            position: self.property_at(PropertyKind::Position, t).as_vec2(),
            scale: self.property_at(PropertyKind::Scale, t).as_vec2(),
            rotation_degrees: self.property_at(PropertyKind::Rotation, t).as_scalar(),
            opacity: self
                .property_at(PropertyKind::Opacity, t)
                .as_scalar()
                .clamp(0.0, 1.0),
            volume: self.property_at(PropertyKind::Volume, t).as_scalar().max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::{Easing, Keyframe};

    #[test]
    fn test_defaults_without_animations() {
        let shot = Shot::new(0, 5.0, "a.png");
        assert_eq!(shot.properties_at(2.0), PropertyValues::default());
    }

    #[test]
    fn test_properties_follow_keyframes() {
        let shot = Shot::new(0, 5.0, "a.png")
            .with_animation(
                PropertyKind::Opacity,
                KeyframeTrack::from_keyframes(vec![
                    Keyframe::new(0.0, 0.0),
                    Keyframe::new(2.0, 1.0),
                ]),
            )
            .with_animation(
                PropertyKind::Position,
                KeyframeTrack::from_keyframes(vec![
                    Keyframe::with_easing(0.0, DVec2::new(0.0, 0.0), Easing::Linear),
                    Keyframe::new(1.0, DVec2::new(10.0, -10.0)),
                ]),
            );
        let values = shot.properties_at(1.0);
        assert!((values.opacity - 0.5).abs() < 1e-9);
        assert_eq!(values.position, DVec2::new(10.0, -10.0));
        assert_eq!(values.scale, DVec2::ONE);
    }

    #[test]
    fn test_opacity_clamped() {
        let shot = Shot::new(0, 1.0, "a").with_animation(
            PropertyKind::Opacity,
            KeyframeTrack::from_keyframes(vec![Keyframe::new(0.0, 3.0)]),
        );
        assert_eq!(shot.properties_at(0.0).opacity, 1.0);
    }

    #[test]
    fn test_shot_deserializes_with_defaults() {
        let json = r#"{"position":2,"duration":3.5,"pixel_source":"media/a.png"}"#;
        let shot: Shot = serde_json::from_str(json).unwrap();
        assert_eq!(shot.position, 2);
        assert!(shot.effects.is_empty());
        assert!(shot.transition_out.is_none());
    }
}
