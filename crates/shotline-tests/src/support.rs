//! Shared fixtures for the integration tests.

use parking_lot::Mutex;
use shotline_core::{AppliedEffect, Color, FrameBuffer, KernelKind};
use shotline_effects::{
    Compositor, KernelRegistry, MemorySurface, OutputSurface, StaticSourceProvider, TextDraw,
};
use shotline_gpu::{DeviceLimits, ResourceArbiter};
use shotline_timeline::RenderContext;
use std::sync::Arc;

pub const MB: usize = 1024 * 1024;

/// A [`MemorySurface`] the test keeps a handle to after boxing it into a
/// render context.
#[derive(Clone)]
pub struct SharedSurface(pub Arc<Mutex<MemorySurface>>);

impl SharedSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self(Arc::new(Mutex::new(MemorySurface::new(width, height))))
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.0.lock().last_frame().and_then(|f| f.pixel(x, y))
    }

    pub fn presents(&self) -> usize {
        self.0.lock().present_count()
    }
}

impl OutputSurface for SharedSurface {
    fn size(&self) -> (u32, u32) {
        self.0.lock().size()
    }

    fn present(&mut self, frame: &FrameBuffer) {
        self.0.lock().present(frame);
    }

    fn draw_text(&mut self, draw: &TextDraw) {
        self.0.lock().draw_text(draw);
    }
}

/// Black shot "a", white shot "b", on a 16x9 canvas.
pub fn context(ceiling: usize) -> (RenderContext, SharedSurface) {
    let mut arbiter = ResourceArbiter::new(ceiling);
    arbiter.initialize(DeviceLimits::new(4096, 256));
    let provider = StaticSourceProvider::new()
        .with_frame("a", FrameBuffer::filled(16, 9, Color::BLACK))
        .with_frame("b", FrameBuffer::filled(16, 9, Color::WHITE));
    let surface = SharedSurface::new(16, 9);
    let ctx = RenderContext::new(
        arbiter,
        Compositor::default(),
        Box::new(provider),
        Box::new(surface.clone()),
    );
    (ctx, surface)
}

pub fn catalog_effect(kind: KernelKind, order: i32) -> AppliedEffect {
    let effect = KernelRegistry::new()
        .catalog_effect(kind)
        .expect("built-in kernel");
    AppliedEffect::new(effect, order)
}
