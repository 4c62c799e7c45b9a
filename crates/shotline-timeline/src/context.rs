//! Everything a frame needs besides the timeline itself.

use shotline_effects::{Compositor, FrameMetrics, FrameRequest, OutputSurface, PixelSourceProvider};
use shotline_gpu::ResourceArbiter;

/// The arbiter, compositor and collaborators the sequencer drives.
///
/// Exactly one arbiter exists per context, and the sequencer owns the
/// context behind its lock, so every arbiter mutation happens inside a
/// single critical section.
pub struct RenderContext {
    pub arbiter: ResourceArbiter,
    pub compositor: Compositor,
    pub provider: Box<dyn PixelSourceProvider>,
    pub surface: Box<dyn OutputSurface>,
}

impl RenderContext {
    pub fn new(
        arbiter: ResourceArbiter,
        compositor: Compositor,
        provider: Box<dyn PixelSourceProvider>,
        surface: Box<dyn OutputSurface>,
    ) -> Self {
        Self {
            arbiter,
            compositor,
            provider,
            surface,
        }
    }

    /// Composite one frame.
    pub fn render(&mut self, request: &FrameRequest<'_>) -> FrameMetrics {
        self.compositor.render_frame(
            &mut self.arbiter,
            self.provider.as_ref(),
            self.surface.as_mut(),
            request,
        )
    }

    /// Give every tracked resource back.
    pub fn release(&mut self) {
        self.compositor.release(&mut self.arbiter);
        self.arbiter.cleanup();
    }
}
