//! Effect catalog entries and their per-shot instances.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::color::Color;
use crate::keyframe::KeyframeTrack;

/// The kernel family an effect runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KernelKind {
    Brightness,
    Contrast,
    Saturation,
    Blur,
    Sepia,
    Vintage,
    Grayscale,
    Invert,
    Scale,
    Rotation,
}

impl KernelKind {
    pub const ALL: [KernelKind; 10] = [
        Self::Brightness,
        Self::Contrast,
        Self::Saturation,
        Self::Blur,
        Self::Sepia,
        Self::Vintage,
        Self::Grayscale,
        Self::Invert,
        Self::Scale,
        Self::Rotation,
    ];

    /// Stable identifier used for catalog ids and program keys.
    pub fn id(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Blur => "blur",
            Self::Sepia => "sepia",
            Self::Vintage => "vintage",
            Self::Grayscale => "grayscale",
            Self::Invert => "invert",
            Self::Scale => "scale",
            Self::Rotation => "rotation",
        }
    }
}

/// Catalog grouping for UI listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectCategory {
    Color,
    Blur,
    Stylize,
    Transform,
}

/// Effect parameter value, one variant per parameter kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ParamValue {
    Range { value: f64, min: f64, max: f64 },
    Color(Color),
    Select { options: Vec<String>, selected: usize },
    Boolean(bool),
    Number(f64),
}

impl ParamValue {
    /// Numeric view of the value, if it has one. Ranges report their value
    /// held inside `[min, max]`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Range { value, min, max } => Some(within(*value, *min, *max)),
            ParamValue::Number(v) => Some(*v),
            ParamValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Select { selected, .. } => Some(*selected as f64),
            ParamValue::Color(_) => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            ParamValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Selected option label for `Select` values.
    pub fn as_selected(&self) -> Option<&str> {
        match self {
            ParamValue::Select { options, selected } => options.get(*selected).map(String::as_str),
            _ => None,
        }
    }

    /// Replace the numeric payload, keeping range bounds.
    ///
    /// Non-numeric kinds are returned unchanged.
    pub fn with_number(&self, v: f64) -> ParamValue {
        match self {
            ParamValue::Range { min, max, .. } => ParamValue::Range {
                value: within(v, *min, *max),
                min: *min,
                max: *max,
            },
            ParamValue::Number(_) => ParamValue::Number(v),
            ParamValue::Boolean(_) => ParamValue::Boolean(v >= 0.5),
            ParamValue::Select { options, .. } => {
                let last = options.len().saturating_sub(1);
                ParamValue::Select {
                    options: options.clone(),
                    selected: (v.max(0.0).round() as usize).min(last),
                }
            }
            ParamValue::Color(_) => self.clone(),
        }
    }
}

/// `v` held inside `[min, max]`. Unlike `f64::clamp` this never panics on
/// inverted or NaN bounds.
fn within(v: f64, min: f64, max: f64) -> f64 {
    v.max(min).min(max)
}

/// One named parameter of an effect, optionally keyframed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectParameter {
    pub name: String,
    pub value: ParamValue,
    #[serde(default, skip_serializing_if = "KeyframeTrack::is_empty")]
    pub keyframes: KeyframeTrack,
}

impl EffectParameter {
    pub fn new(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
            keyframes: KeyframeTrack::new(),
        }
    }

    /// Value at shot-relative time `t`; keyframes override the static value.
    pub fn value_at(&self, t: f64) -> ParamValue {
        match (self.keyframes.evaluate(t), self.value.as_f64()) {
            (Some(kv), Some(_)) => self.value.with_number(kv.as_scalar()),
            _ => self.value.clone(),
        }
    }
}

/// Resolved parameter values keyed by name.
pub type ParamValues = HashMap<String, ParamValue>;

/// A catalog effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: String,
    pub name: String,
    pub category: EffectCategory,
    pub kernel: KernelKind,
    pub parameters: Vec<EffectParameter>,
}

impl Effect {
    pub fn parameter(&self, name: &str) -> Option<&EffectParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut EffectParameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }
}

/// An effect instantiated on a shot's stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedEffect {
    pub effect: Effect,
    pub enabled: bool,
    /// Stack position; lower acts first.
    pub order: i32,
}

impl AppliedEffect {
    pub fn new(effect: Effect, order: i32) -> Self {
        Self {
            effect,
            enabled: true,
            order,
        }
    }

    /// Resolve every parameter at shot-relative time `t`.
    pub fn params_at(&self, t: f64) -> ParamValues {
        self.effect
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.value_at(t)))
            .collect()
    }
}

/// Sort a stack by `order`, keeping insertion order for ties.
pub fn sort_stack(stack: &mut [AppliedEffect]) {
    stack.sort_by_key(|e| e.order);
}
