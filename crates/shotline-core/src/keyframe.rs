//! Keyframe interpolation with named easings and cubic Bézier curves.
//!
//! Interpolation between two keyframes always uses the easing of the
//! earlier (outgoing) keyframe. Values outside the keyframed range are
//! clamped to the first/last keyframe, never extrapolated.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Easing curves ───────────────────────────────────────────────

/// Cubic Bézier control points (x1, y1, x2, y2).
/// The curve runs from (0,0) to (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// X coordinate of the curve at parameter t.
    pub fn sample_x(&self, t: f64) -> f64 {
        Self::sample(self.x1, self.x2, t)
    }

    /// Y coordinate of the curve at parameter t.
    pub fn sample_y(&self, t: f64) -> f64 {
        Self::sample(self.y1, self.y2, t)
    }

    fn sample(c1: f64, c2: f64, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        3.0 * mt2 * t * c1 + 3.0 * mt * t2 * c2 + t3
    }

    /// Value of the curve at parametric position `p`.
    ///
    /// The control ratios are clamped to `[0, 1]` so a malformed curve can
    /// never push a property outside its keyframed range.
    pub fn at_parameter(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        let clamped = Self::new(
            self.x1.clamp(0.0, 1.0),
            self.y1.clamp(0.0, 1.0),
            self.x2.clamp(0.0, 1.0),
            self.y2.clamp(0.0, 1.0),
        );
        clamped.sample_y(p)
    }

    // Common presets
    pub const LINEAR: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    pub const EASE: Self = Self::new(0.25, 0.1, 0.25, 1.0);
    pub const EASE_IN_OUT: Self = Self::new(0.42, 0.0, 0.58, 1.0);
}

/// Easing applied to the progress between two keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    Bezier(CubicBezier),
}

impl Easing {
    /// Map linear progress in `[0, 1]` to eased progress.
    pub fn apply(self, p: f64) -> f64 {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => p,
            Easing::EaseIn => p * p,
            Easing::EaseOut => p * (2.0 - p),
            Easing::EaseInOut => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
                }
            }
            Easing::Bezier(curve) => curve.at_parameter(p),
        }
    }
}

// ── Keyframe values ─────────────────────────────────────────────

/// A keyframed value: a scalar or a 2-D vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Scalar(f64),
    Vec2(DVec2),
}

impl KeyValue {
    /// Scalar view; vectors yield their x component.
    pub fn as_scalar(self) -> f64 {
        match self {
            KeyValue::Scalar(v) => v,
            KeyValue::Vec2(v) => v.x,
        }
    }

    /// Vector view; scalars are splatted to both components.
    pub fn as_vec2(self) -> DVec2 {
        match self {
            KeyValue::Scalar(v) => DVec2::splat(v),
            KeyValue::Vec2(v) => v,
        }
    }

    /// Component-wise `self + (other - self) * t`.
    ///
    /// Mixed scalar/vector pairs hold `self`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        match (self, other) {
            (KeyValue::Scalar(a), KeyValue::Scalar(b)) => KeyValue::Scalar(a + (b - a) * t),
            (KeyValue::Vec2(a), KeyValue::Vec2(b)) => KeyValue::Vec2(a + (b - a) * t),
            _ => self,
        }
    }
}

impl From<f64> for KeyValue {
    fn from(v: f64) -> Self {
        KeyValue::Scalar(v)
    }
}

impl From<DVec2> for KeyValue {
    fn from(v: DVec2) -> Self {
        KeyValue::Vec2(v)
    }
}

// ── Keyframe ────────────────────────────────────────────────────

/// A single keyframe at a shot-relative time (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub value: KeyValue,
    /// Easing used when interpolating towards the next keyframe.
    #[serde(default)]
    pub easing: Easing,
}

impl Keyframe {
    /// Create a linear keyframe.
    pub fn new(time: f64, value: impl Into<KeyValue>) -> Self {
        Self::with_easing(time, value, Easing::Linear)
    }

    /// Create a keyframe with a specific easing.
    pub fn with_easing(time: f64, value: impl Into<KeyValue>, easing: Easing) -> Self {
        Self {
            time,
            value: value.into(),
            easing,
        }
    }
}

/// Interpolate a sorted keyframe list at time `t`.
///
/// Returns `None` for an empty list so callers can substitute the
/// property's default value.
pub fn interpolate(keyframes: &[Keyframe], t: f64) -> Option<KeyValue> {
    let first = keyframes.first()?;
    let last = keyframes.last()?;

    if keyframes.len() == 1 || t.is_nan() || t <= first.time {
        return Some(first.value);
    }
    if t >= last.time {
        return Some(last.value);
    }

    let idx = keyframes
        .partition_point(|kf| kf.time <= t)
        .saturating_sub(1);
    let prev = &keyframes[idx];
    let next = &keyframes[idx + 1];

    let span = next.time - prev.time;
    if span <= 0.0 {
        return Some(prev.value);
    }
    let progress = (t - prev.time) / span;
    let eased = prev.easing.apply(progress);
    Some(prev.value.lerp(next.value, eased))
}

// ── Keyframe track ──────────────────────────────────────────────

/// Keyframes for one animated property, sorted by time with unique times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct KeyframeTrack {
    keyframes: Vec<Keyframe>,
}

impl KeyframeTrack {
    /// Create an empty track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a track from unordered keyframes.
    ///
    /// Non-finite times are dropped; for duplicate times the later keyframe
    /// wins.
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe>) -> Self {
        let mut track = Self::new();
        for kf in keyframes {
            track.set(kf.time, kf.value, kf.easing);
        }
        track
    }

    /// Insert or replace the keyframe at `time`. Keeps sorted order.
    pub fn set(&mut self, time: f64, value: impl Into<KeyValue>, easing: Easing) {
        if !time.is_finite() {
            return;
        }
        let value = value.into();
        if let Some(kf) = self.keyframes.iter_mut().find(|kf| kf.time == time) {
            kf.value = value;
            kf.easing = easing;
            return;
        }
        let pos = self.keyframes.partition_point(|kf| kf.time < time);
        self.keyframes
            .insert(pos, Keyframe::with_easing(time, value, easing));
    }

    /// Remove the keyframe at exactly `time`.
    pub fn remove(&mut self, time: f64) -> bool {
        if let Some(pos) = self.keyframes.iter().position(|kf| kf.time == time) {
            self.keyframes.remove(pos);
            true
        } else {
            false
        }
    }

    /// Evaluate the track; `None` when there are no keyframes.
    pub fn evaluate(&self, t: f64) -> Option<KeyValue> {
        interpolate(&self.keyframes, t)
    }

    /// Evaluate the track, falling back to `default` when empty.
    pub fn evaluate_or(&self, t: f64, default: KeyValue) -> KeyValue {
        self.evaluate(t).unwrap_or(default)
    }

    /// Scalar evaluation with a default.
    pub fn evaluate_scalar(&self, t: f64, default: f64) -> f64 {
        self.evaluate(t).map(KeyValue::as_scalar).unwrap_or(default)
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Whether the value actually changes over time.
    pub fn is_animated(&self) -> bool {
        self.keyframes.len() > 1
    }

    /// First and last keyframe times.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((self.keyframes.first()?.time, self.keyframes.last()?.time))
    }
}

impl From<Vec<Keyframe>> for KeyframeTrack {
    fn from(keyframes: Vec<Keyframe>) -> Self {
        Self::from_keyframes(keyframes)
    }
}

impl From<KeyframeTrack> for Vec<Keyframe> {
    fn from(track: KeyframeTrack) -> Self {
        track.keyframes
    }
}

impl fmt::Display for KeyframeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyframeTrack({} keyframes)", self.keyframes.len())
    }
}

// ── Tests ───────────────────────────────────────────────────────
