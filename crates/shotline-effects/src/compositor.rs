//! Frame compositor.
//!
//! Per frame: pull the shot's pixels, run its effect stack as a ping-pong
//! kernel chain at the working resolution, place the result on the canvas
//! with the shot's animated transform and opacity, blend in the incoming
//! shot during a transition, present, then draw visible text.
//!
//! All device memory is requested from the [`ResourceArbiter`]. The
//! compositor keeps the input texture and one ping-pong framebuffer (with
//! its colour texture) across frames; transition scratch textures are
//! released at the end of the frame that used them.

use glam::Vec2;
use rayon::prelude::*;
use serde::Serialize;
use shotline_core::frame::BYTES_PER_PIXEL;
use shotline_core::memory_budget::MIN_WORKING_EDGE;
use shotline_core::{
    Color, FrameBuffer, Listeners, PixelSourceRef, PropertyValues, SharedFrameBuffer, Shot,
    Transform2D, Transition,
};
use shotline_gpu::{FpsWindow, ResourceArbiter, ShaderComplexity, TextureHandle};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::chain::PingPong;
use crate::executor::sample_bilinear;
use crate::kernel::{KernelRegistry, StageDesc};
use crate::source::{OutputSurface, PixelSourceProvider, SourceFrame};
use crate::text::visible_text;
use crate::transition::renderer_for;

pub const INPUT_TEXTURE: &str = "compositor.input";
pub const PINGPONG_FRAMEBUFFER: &str = "compositor.pingpong";
pub const PINGPONG_COLOR: &str = "compositor.pingpong.color";
pub const INCOMING_TEXTURE: &str = "compositor.incoming";
pub const TRANSITION_TEXTURE: &str = "compositor.transition";
pub const UNIFORM_BUFFER: &str = "compositor.uniforms";

/// Per-frame statistics reported to metrics listeners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FrameMetrics {
    pub fps: f64,
    pub render_time_ms: f64,
    pub effect_count: usize,
    pub gpu_memory_mb: f64,
}

/// The incoming side of a transition frame.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRequest<'a> {
    pub transition: &'a Transition,
    pub incoming: &'a Shot,
    /// Linear progress in `[0, 1]`; easing is applied here.
    pub progress: f64,
}

/// What to composite this frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameRequest<'a> {
    pub shot: &'a Shot,
    pub shot_time: f64,
    pub transition: Option<TransitionRequest<'a>>,
}

impl<'a> FrameRequest<'a> {
    pub fn shot(shot: &'a Shot, shot_time: f64) -> Self {
        Self {
            shot,
            shot_time,
            transition: None,
        }
    }
}

/// Largest size not exceeding `max_edge` on its longest side, keeping the
/// canvas aspect ratio.
pub fn working_size(canvas: (u32, u32), max_edge: u32) -> (u32, u32) {
    let longest = canvas.0.max(canvas.1);
    if longest <= max_edge || longest == 0 {
        return canvas;
    }
    let scale = max_edge as f64 / longest as f64;
    (
        ((canvas.0 as f64 * scale).round() as u32).max(1),
        ((canvas.1 as f64 * scale).round() as u32).max(1),
    )
}

pub struct Compositor {
    registry: KernelRegistry,
    background: Color,
    /// Input texture; present only while the ping-pong pair is allocated too.
    input: Option<TextureHandle>,
    /// Working size the current targets were requested for.
    requested: Option<(u32, u32)>,
    /// Uniform buffer size held for the frame in flight.
    uniform_bytes: usize,
    /// Kernel programs allocated for the frame in flight.
    frame_programs: Vec<String>,
    layers: PingPong,
    incoming_layers: PingPong,
    canvas: FrameBuffer,
    incoming_canvas: FrameBuffer,
    blended: FrameBuffer,
    last_frame: Option<FrameBuffer>,
    fps_window: FpsWindow,
    fps: f64,
    warned_kernels: HashSet<String>,
    missing_source: Option<PixelSourceRef>,
    metrics_listeners: Listeners<FrameMetrics>,
}

impl Compositor {
    pub fn new(background: Color) -> Self {
        Self {
            registry: KernelRegistry::new(),
            background,
            input: None,
            requested: None,
            uniform_bytes: 0,
            frame_programs: Vec::new(),
            layers: PingPong::new(0, 0),
            incoming_layers: PingPong::new(0, 0),
            canvas: FrameBuffer::new(0, 0),
            incoming_canvas: FrameBuffer::new(0, 0),
            blended: FrameBuffer::new(0, 0),
            last_frame: None,
            fps_window: FpsWindow::new(),
            fps: 0.0,
            warned_kernels: HashSet::new(),
            missing_source: None,
            metrics_listeners: Listeners::new(),
        }
    }

    pub fn set_background(&mut self, background: Color) {
        self.background = background;
    }

    /// Current working resolution, if targets are allocated.
    pub fn working_size(&self) -> Option<(u32, u32)> {
        self.input.map(|t| (t.width, t.height))
    }

    /// Last successfully composited frame.
    pub fn last_frame(&self) -> Option<&FrameBuffer> {
        self.last_frame.as_ref()
    }

    /// Register a per-frame metrics callback.
    pub fn on_metrics(&mut self, callback: impl Fn(&FrameMetrics) + Send + Sync + 'static) {
        self.metrics_listeners.add(callback);
    }

    /// Snapshot of the metrics listeners, for emitting outside a lock.
    pub fn metrics_listeners(&self) -> Listeners<FrameMetrics> {
        self.metrics_listeners.clone()
    }

    /// Release persistent targets back to the arbiter.
    pub fn release(&mut self, arbiter: &mut ResourceArbiter) {
        self.end_frame(arbiter);
        for key in [INPUT_TEXTURE, PINGPONG_FRAMEBUFFER, PINGPONG_COLOR] {
            arbiter.deallocate_resource(key);
        }
        self.input = None;
        self.requested = None;
    }

    /// Return the frame-scoped programs and uniform buffer. Only the input
    /// texture and the ping-pong pair outlive a frame.
    fn end_frame(&mut self, arbiter: &mut ResourceArbiter) {
        for key in self.frame_programs.drain(..) {
            arbiter.deallocate_resource(&key);
        }
        if self.uniform_bytes > 0 {
            arbiter.deallocate_resource(UNIFORM_BUFFER);
            self.uniform_bytes = 0;
        }
    }

    /// Composite and present one frame. Listeners are not called; emit the
    /// returned metrics through [`Compositor::metrics_listeners`].
    pub fn render_frame(
        &mut self,
        arbiter: &mut ResourceArbiter,
        provider: &dyn PixelSourceProvider,
        surface: &mut dyn OutputSurface,
        request: &FrameRequest<'_>,
    ) -> FrameMetrics {
        let started = Instant::now();
        let canvas_size = surface.size();
        let mut effect_count = 0;

        let composed = if self.ensure_targets(arbiter, canvas_size).is_some() {
            match self.composite_outgoing(arbiter, provider, request, canvas_size) {
                Some(n) => {
                    effect_count += n;
                    if let Some(transition) = &request.transition {
                        effect_count += self.blend_incoming(arbiter, provider, transition, canvas_size);
                    }
                    true
                }
                None => false,
            }
        } else {
            warn!("No working targets available at {:?}, presenting fallback", canvas_size);
            false
        };

        if composed {
            surface.present(&self.canvas);
            match self.last_frame.as_mut() {
                Some(last) if (last.width, last.height) == (self.canvas.width, self.canvas.height) => {
                    last.data.copy_from_slice(&self.canvas.data);
                }
                _ => self.last_frame = Some(self.canvas.clone()),
            }
        } else {
            self.present_fallback(surface, canvas_size);
        }

        for draw in visible_text(request.shot, request.shot_time, canvas_size) {
            surface.draw_text(&draw);
        }

        if let Some(fps) = self.fps_window.record(Instant::now()) {
            self.fps = fps;
        }
        let metrics = FrameMetrics {
            fps: self.fps,
            render_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            effect_count,
            gpu_memory_mb: arbiter.memory_usage().total_mb(),
        };
        debug!(
            "Frame composited: {} effects, {:.2}ms, {:.1}MB",
            metrics.effect_count, metrics.render_time_ms, metrics.gpu_memory_mb
        );
        self.end_frame(arbiter);
        metrics
    }

    /// Allocate the input texture and ping-pong framebuffer, halving the
    /// working resolution until they fit.
    fn ensure_targets(&mut self, arbiter: &mut ResourceArbiter, canvas: (u32, u32)) -> Option<(u32, u32)> {
        let desired = working_size(canvas, arbiter.performance_profile().texture_size);
        if self.input.is_some() && self.requested == Some(desired) {
            return self.working_size();
        }

        let (mut w, mut h) = desired;
        loop {
            if let Some(input) = Self::allocate_targets(arbiter, w, h) {
                if (w, h) != desired {
                    warn!(
                        "Working resolution degraded to {}x{} (requested {}x{})",
                        w, h, desired.0, desired.1
                    );
                } else {
                    info!("Working resolution {}x{}", w, h);
                }
                self.input = Some(input);
                self.requested = Some(desired);
                self.layers.resize(w, h);
                self.incoming_layers.resize(w, h);
                return Some((w, h));
            }
            if w / 2 < MIN_WORKING_EDGE || h / 2 < MIN_WORKING_EDGE {
                break;
            }
            w /= 2;
            h /= 2;
        }

        for key in [INPUT_TEXTURE, PINGPONG_FRAMEBUFFER, PINGPONG_COLOR] {
            arbiter.deallocate_resource(key);
        }
        self.input = None;
        self.requested = None;
        None
    }

    fn allocate_targets(arbiter: &mut ResourceArbiter, w: u32, h: u32) -> Option<TextureHandle> {
        let input = arbiter.allocate_texture(INPUT_TEXTURE, w, h)?;
        arbiter.allocate_framebuffer(PINGPONG_FRAMEBUFFER)?;
        arbiter.allocate_texture(PINGPONG_COLOR, w, h)?;
        Some(input)
    }

    fn fetch_source(&mut self, provider: &dyn PixelSourceProvider, shot: &Shot, t: f64) -> Option<SharedFrameBuffer> {
        match provider.frame(shot, t) {
            SourceFrame::Ready { frame, decode_time } => {
                if self.missing_source.as_ref() == Some(&shot.pixel_source) {
                    self.missing_source = None;
                }
                debug!("Source '{}' ready ({:?})", shot.pixel_source, decode_time);
                Some(frame)
            }
            SourceFrame::NotReady => {
                if self.missing_source.as_ref() != Some(&shot.pixel_source) {
                    warn!("Pixel source '{}' not ready", shot.pixel_source);
                    self.missing_source = Some(shot.pixel_source.clone());
                }
                None
            }
        }
    }

    /// Build validated stages for a shot's effect stack at shot time `t`.
    /// Stages that fail validation or cannot get a program are skipped.
    fn build_stages(&mut self, arbiter: &mut ResourceArbiter, shot: &Shot, t: f64) -> Vec<StageDesc> {
        let complexity: ShaderComplexity = arbiter.performance_profile().shader_complexity;
        let capacity = arbiter.device_limits().max_fragment_uniform_vectors;

        let mut stages = Vec::new();
        for applied in arbiter.optimize_effects_for_gpu(&shot.effects) {
            if !applied.enabled {
                continue;
            }
            let kind = applied.effect.kernel;
            let key = StageDesc::program_key(kind, complexity);
            let params = applied.params_at(t);
            match self.registry.build_stage(kind, &params, complexity, capacity) {
                Ok(stage) => {
                    if !self.frame_programs.contains(&key) {
                        if arbiter.allocate_shader(&key).is_none() {
                            debug!("No program slot for '{}', stage skipped", key);
                            continue;
                        }
                        self.frame_programs.push(key);
                    }
                    stages.push(stage);
                }
                Err(e) => {
                    if self.warned_kernels.insert(key.clone()) {
                        warn!("Kernel '{}' rejected, passing through: {}", key, e);
                    } else {
                        debug!("Kernel '{}' rejected: {}", key, e);
                    }
                }
            }
        }

        let needed = stages.iter().map(StageDesc::uniform_bytes).max().unwrap_or(0);
        if needed > self.uniform_bytes {
            match arbiter.allocate_buffer(UNIFORM_BUFFER, needed) {
                Some(buffer) => self.uniform_bytes = buffer.bytes,
                None => {
                    warn!("Uniform buffer of {} bytes rejected, skipping effect chain", needed);
                    stages.clear();
                }
            }
        }
        stages
    }

    fn composite_outgoing(
        &mut self,
        arbiter: &mut ResourceArbiter,
        provider: &dyn PixelSourceProvider,
        request: &FrameRequest<'_>,
        canvas: (u32, u32),
    ) -> Option<usize> {
        let source = self.fetch_source(provider, request.shot, request.shot_time)?;
        let stages = self.build_stages(arbiter, request.shot, request.shot_time);

        self.layers.upload(&source);
        let count = self.layers.run(&stages);
        let bilinear = arbiter.performance_profile().shader_complexity != ShaderComplexity::Low;
        draw_layer(
            self.layers.front(),
            &request.shot.properties_at(request.shot_time),
            &mut self.canvas,
            canvas,
            self.background,
            bilinear,
        );
        Some(count)
    }

    /// Composite the incoming shot and blend it over the outgoing canvas.
    /// Returns the number of incoming stages run.
    fn blend_incoming(
        &mut self,
        arbiter: &mut ResourceArbiter,
        provider: &dyn PixelSourceProvider,
        transition: &TransitionRequest<'_>,
        canvas: (u32, u32),
    ) -> usize {
        let Some(source) = self.fetch_source(provider, transition.incoming, 0.0) else {
            return 0;
        };
        let (w, h) = self.layers.size();
        let held = arbiter.allocate_texture(TRANSITION_TEXTURE, w, h);
        let incoming = arbiter.allocate_texture(INCOMING_TEXTURE, w, h);

        let mut count = 0;
        if held.is_some() && incoming.is_some() {
            let stages = self.build_stages(arbiter, transition.incoming, 0.0);
            self.incoming_layers.upload(&source);
            count = self.incoming_layers.run(&stages);
            let bilinear = arbiter.performance_profile().shader_complexity != ShaderComplexity::Low;
            draw_layer(
                self.incoming_layers.front(),
                &transition.incoming.properties_at(0.0),
                &mut self.incoming_canvas,
                canvas,
                self.background,
                bilinear,
            );

            let e = transition.transition.eased(transition.progress) as f32;
            renderer_for(transition.transition.kind, transition.transition.direction).render(
                &self.canvas,
                &self.incoming_canvas,
                e,
                &mut self.blended,
            );
            std::mem::swap(&mut self.canvas, &mut self.blended);
        } else {
            warn!("Transition textures rejected, showing outgoing shot only");
        }

        arbiter.deallocate_resource(TRANSITION_TEXTURE);
        arbiter.deallocate_resource(INCOMING_TEXTURE);
        count
    }

    fn present_fallback(&mut self, surface: &mut dyn OutputSurface, canvas: (u32, u32)) {
        match &self.last_frame {
            Some(last) if (last.width, last.height) == canvas => surface.present(last),
            _ => {
                if (self.canvas.width, self.canvas.height) != canvas {
                    self.canvas = FrameBuffer::new(canvas.0, canvas.1);
                }
                self.canvas.fill(self.background);
                surface.present(&self.canvas);
            }
        }
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Color::BLACK)
    }
}

/// Fill `canvas` with `background` and draw `layer` over it, centred,
/// stretched to the canvas, then offset/scaled/rotated by `props` and
/// faded by its opacity.
pub fn draw_layer(
    layer: &FrameBuffer,
    props: &PropertyValues,
    canvas: &mut FrameBuffer,
    size: (u32, u32),
    background: Color,
    bilinear: bool,
) {
    if (canvas.width, canvas.height) != size {
        *canvas = FrameBuffer::new(size.0, size.1);
    }
    canvas.fill(background);
    let opacity = props.opacity.clamp(0.0, 1.0) as f32;
    if layer.width == 0 || layer.height == 0 || opacity <= 0.0 {
        return;
    }

    let layer_centre = Vec2::new(layer.width as f32, layer.height as f32) * 0.5;
    let canvas_centre = Vec2::new(size.0 as f32, size.1 as f32) * 0.5;
    let fit = Vec2::new(size.0 as f32 / layer.width as f32, size.1 as f32 / layer.height as f32);
    let placement = Transform2D::from_trs_about(
        layer_centre,
        canvas_centre - layer_centre + props.position.as_vec2(),
        (props.rotation_degrees as f32).to_radians(),
        fit * props.scale.as_vec2(),
    );
    if placement.is_degenerate() {
        return;
    }
    let inverse = placement.inverse();
    let bg = background.to_rgba8();
    let stride = canvas.stride().max(1);
    let width = size.0;

    canvas
        .data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let q = inverse.transform_point(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                let px = if bilinear {
                    sample_bilinear(layer, q)
                } else {
                    layer.sample_nearest(q.x, q.y)
                };
                let Some(px) = px else { continue };
                let alpha = px[3] as f32 / 255.0 * opacity;
                let o = x as usize * BYTES_PER_PIXEL;
                for c in 0..3 {
                    let v = bg[c] as f32 + (px[c] as f32 - bg[c] as f32) * alpha;
                    row[o + c] = v.round().clamp(0.0, 255.0) as u8;
                }
                let a = alpha * 255.0 + bg[3] as f32 * (1.0 - alpha);
                row[o + 3] = a.round().clamp(0.0, 255.0) as u8;
            }
        });
}
