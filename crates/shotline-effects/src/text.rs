//! Text layer placement.
//!
//! Glyph rasterization belongs to the output surface; the compositor only
//! decides which layers are visible, where, and how opaque.

use shotline_core::{Color, Shot, TextLayer, Vec2};

/// One text draw request in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw {
    pub layer_id: String,
    pub text: String,
    /// Anchor point in canvas pixels.
    pub position: Vec2,
    pub font_size: f32,
    /// Layer colour with the animated opacity folded into alpha.
    pub color: Color,
}

impl TextDraw {
    pub fn from_layer(layer: &TextLayer, t: f64, canvas: (u32, u32)) -> Self {
        let opacity = layer.opacity_at(t).clamp(0.0, 1.0) as f32;
        Self {
            layer_id: layer.id.clone(),
            text: layer.text.clone(),
            position: layer.anchor * Vec2::new(canvas.0 as f32, canvas.1 as f32),
            font_size: layer.font_size,
            color: layer.color.with_alpha(layer.color.a * opacity),
        }
    }
}

/// Draw requests for every layer of `shot` visible at shot time `t`.
pub fn visible_text(shot: &Shot, t: f64, canvas: (u32, u32)) -> Vec<TextDraw> {
    shot.text_layers
        .iter()
        .filter(|layer| layer.is_visible_at(t))
        .map(|layer| TextDraw::from_layer(layer, t, canvas))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotline_core::{Easing, TextAnimation, TextAnimationKind};

    #[test]
    fn test_only_visible_enabled_layers() {
        let mut hidden = TextLayer::new("off", "hidden", 0.0, 5.0);
        hidden.enabled = false;
        let shot = Shot::new(0, 5.0, "a")
            .with_text(TextLayer::new("title", "Hello", 0.0, 2.0))
            .with_text(TextLayer::new("later", "Later", 3.0, 1.0))
            .with_text(hidden);

        let draws = visible_text(&shot, 1.0, (100, 50));
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].layer_id, "title");
        assert_eq!(draws[0].position, Vec2::new(50.0, 42.5));
    }

    #[test]
    fn test_fade_in_scales_alpha() {
        let layer = TextLayer::new("t", "x", 0.0, 2.0).with_animation(TextAnimation {
            kind: TextAnimationKind::FadeIn,
            duration: Some(1.0),
            easing: Easing::Linear,
        });
        let draw = TextDraw::from_layer(&layer, 0.25, (10, 10));
        assert!((draw.color.a - 0.25).abs() < 1e-6);
        let draw = TextDraw::from_layer(&layer, 1.5, (10, 10));
        assert_eq!(draw.color.a, 1.0);
    }
}
