//! Geometric primitives for layer placement.

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2 as GlamVec2};
use serde::{Deserialize, Serialize};

/// 2D vector.
pub type Vec2 = GlamVec2;

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of `size` centred on `center`.
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        let origin = center - size * 0.5;
        Self::new(origin.x, origin.y, size.x, size.y)
    }

    /// Half-open containment test: `[x, x+w) × [y, y+h)`.
    #[inline]
    pub fn contains(self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

/// 2D affine transform used to place a layer on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    inner: Affine2,
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        inner: Affine2::IDENTITY,
    };

    /// Scale and rotate (radians) about `pivot`, then translate.
    pub fn from_trs_about(pivot: Vec2, translation: Vec2, rotation: f32, scale: Vec2) -> Self {
        let inner = Affine2::from_translation(pivot + translation)
            * Affine2::from_angle(rotation)
            * Affine2::from_scale(scale)
            * Affine2::from_translation(-pivot);
        Self { inner }
    }

    #[inline]
    pub fn transform_point(self, point: Vec2) -> Vec2 {
        self.inner.transform_point2(point)
    }

    #[inline]
    pub fn inverse(self) -> Self {
        Self {
            inner: self.inner.inverse(),
        }
    }

    /// Whether the transform collapses area (zero scale).
    pub fn is_degenerate(self) -> bool {
        self.inner.matrix2.determinant().abs() < f32::EPSILON
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Vec2::ZERO));
        assert!(!r.contains(Vec2::new(10.0, 5.0)));
    }

    #[test]
    fn test_centered_rect() {
        let rect = Rect::centered(Vec2::new(5.0, 5.0), Vec2::new(4.0, 2.0));
        assert_eq!(rect, Rect::new(3.0, 4.0, 4.0, 2.0));
    }

    #[test]
    fn test_scale_about_center() {
        let t = Transform2D::from_trs_about(
            Vec2::new(50.0, 50.0),
            Vec2::ZERO,
            0.0,
            Vec2::splat(2.0),
        );
        let p = t.transform_point(Vec2::new(60.0, 50.0));
        assert!((p.x - 70.0).abs() < 1e-4);
        assert!((p.y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = Transform2D::from_trs_about(
            Vec2::new(10.0, 10.0),
            Vec2::new(3.0, -2.0),
            0.7,
            Vec2::new(1.5, 0.5),
        );
        let p = Vec2::new(4.0, 9.0);
        let back = t.inverse().transform_point(t.transform_point(p));
        assert!((back - p).length() < 1e-3);
    }

    #[test]
    fn test_zero_scale_is_degenerate() {
        let t = Transform2D::from_trs_about(Vec2::ZERO, Vec2::ZERO, 0.0, Vec2::ZERO);
        assert!(t.is_degenerate());
        assert!(!Transform2D::IDENTITY.is_degenerate());
    }
}
