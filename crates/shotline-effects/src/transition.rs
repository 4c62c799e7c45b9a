//! Transition blending between an outgoing and an incoming composite.

use shotline_core::frame::BYTES_PER_PIXEL;
use shotline_core::{FrameBuffer, Rect, TransitionDirection, TransitionKind, Vec2};

/// Trait for transitions between two composited frames.
pub trait TransitionRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// Blend `outgoing` into `incoming` at eased progress `e` (0 = all
    /// outgoing, 1 = all incoming). All three frames share one size.
    fn render(&self, outgoing: &FrameBuffer, incoming: &FrameBuffer, e: f32, out: &mut FrameBuffer);
}

/// Renderer for a transition kind. Unknown kinds fade.
pub fn renderer_for(
    kind: TransitionKind,
    direction: Option<TransitionDirection>,
) -> Box<dyn TransitionRenderer> {
    match kind {
        TransitionKind::Fade | TransitionKind::Dissolve | TransitionKind::Unknown => {
            Box::new(CrossFade)
        }
        TransitionKind::Wipe => Box::new(Wipe {
            direction: direction.unwrap_or(TransitionDirection::Left),
        }),
        TransitionKind::Slide => Box::new(Slide {
            direction: direction.unwrap_or(TransitionDirection::Left),
        }),
    }
}

fn prepare(outgoing: &FrameBuffer, out: &mut FrameBuffer) {
    if out.width != outgoing.width || out.height != outgoing.height {
        *out = FrameBuffer::new(outgoing.width, outgoing.height);
    }
}

/// Per-pixel cross-fade, `outgoing·(1−e) + incoming·e`.
pub struct CrossFade;

impl TransitionRenderer for CrossFade {
    fn name(&self) -> &str {
        "Cross Fade"
    }

    fn render(&self, outgoing: &FrameBuffer, incoming: &FrameBuffer, e: f32, out: &mut FrameBuffer) {
        prepare(outgoing, out);
        let p = e.clamp(0.0, 1.0);
        for (i, o) in out.data.iter_mut().enumerate() {
            let a = outgoing.data.get(i).copied().unwrap_or(0) as f32;
            let b = incoming.data.get(i).copied().unwrap_or(0) as f32;
            *o = (a * (1.0 - p) + b * p).round() as u8;
        }
    }
}

/// Reveals the incoming frame through a rectangle that grows with `e`.
pub struct Wipe {
    pub direction: TransitionDirection,
}

impl Wipe {
    /// Region showing the incoming frame at progress `p`.
    fn incoming_region(&self, w: f32, h: f32, p: f32) -> Rect {
        match self.direction {
            TransitionDirection::Left => Rect::new(0.0, 0.0, w * p, h),
            TransitionDirection::Right => Rect::new(w * (1.0 - p), 0.0, w * p, h),
            TransitionDirection::Up => Rect::new(0.0, 0.0, w, h * p),
            TransitionDirection::Down => Rect::new(0.0, h * (1.0 - p), w, h * p),
            TransitionDirection::In => {
                Rect::centered(Vec2::new(w, h) * 0.5, Vec2::new(w, h) * p)
            }
            // Complement of the shrinking outgoing centre, handled in render
            TransitionDirection::Out => {
                Rect::centered(Vec2::new(w, h) * 0.5, Vec2::new(w, h) * (1.0 - p))
            }
        }
    }
}

impl TransitionRenderer for Wipe {
    fn name(&self) -> &str {
        "Wipe"
    }

    fn render(&self, outgoing: &FrameBuffer, incoming: &FrameBuffer, e: f32, out: &mut FrameBuffer) {
        prepare(outgoing, out);
        let p = e.clamp(0.0, 1.0);
        let (w, h) = (out.width, out.height);
        let region = self.incoming_region(w as f32, h as f32, p);
        let invert = self.direction == TransitionDirection::Out;

        for y in 0..h {
            for x in 0..w {
                let centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let use_b = region.contains(centre) != invert;
                let src = if use_b { incoming } else { outgoing };
                out.set_pixel(x, y, src.pixel(x, y).unwrap_or([0; 4]));
            }
        }
    }
}

/// Pushes the outgoing frame off-screen while the incoming one follows.
pub struct Slide {
    pub direction: TransitionDirection,
}

impl Slide {
    /// Unit vector the frames travel along. `In`/`Out` use the default
    /// horizontal axis.
    fn axis(&self) -> (i64, i64) {
        match self.direction {
            TransitionDirection::Left | TransitionDirection::In | TransitionDirection::Out => (-1, 0),
            TransitionDirection::Right => (1, 0),
            TransitionDirection::Up => (0, -1),
            TransitionDirection::Down => (0, 1),
        }
    }
}

impl TransitionRenderer for Slide {
    fn name(&self) -> &str {
        "Slide"
    }

    fn render(&self, outgoing: &FrameBuffer, incoming: &FrameBuffer, e: f32, out: &mut FrameBuffer) {
        prepare(outgoing, out);
        let p = e.clamp(0.0, 1.0);
        let (w, h) = (out.width as i64, out.height as i64);
        let (ax, ay) = self.axis();
        // Outgoing moves by size·e along the axis; incoming starts one
        // frame behind it.
        let out_dx = (ax as f32 * w as f32 * p).round() as i64;
        let out_dy = (ay as f32 * h as f32 * p).round() as i64;
        let in_dx = out_dx - ax * w;
        let in_dy = out_dy - ay * h;

        for y in 0..h {
            for x in 0..w {
                let (ox, oy) = (x - out_dx, y - out_dy);
                let (ix, iy) = (x - in_dx, y - in_dy);
                let px = if (0..w).contains(&ox) && (0..h).contains(&oy) {
                    outgoing.pixel(ox as u32, oy as u32)
                } else if (0..w).contains(&ix) && (0..h).contains(&iy) {
                    incoming.pixel(ix as u32, iy as u32)
                } else {
                    None
                };
                let i = (y * w + x) as usize * BYTES_PER_PIXEL;
                out.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&px.unwrap_or([0; 4]));
            }
        }
    }
}
