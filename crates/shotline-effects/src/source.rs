//! Collaborator seams: where pixels come from and where frames go.

use shotline_core::{FrameBuffer, PixelSourceRef, SharedFrameBuffer, Shot};
use std::collections::HashMap;
use std::time::Duration;

use crate::text::TextDraw;

/// Result of asking a provider for a shot's pixels.
#[derive(Debug, Clone)]
pub enum SourceFrame {
    Ready {
        frame: SharedFrameBuffer,
        /// Time the provider spent producing the frame.
        decode_time: Duration,
    },
    /// Asset not decoded yet. Never an error.
    NotReady,
}

/// Supplies the drawable pixels of a shot.
pub trait PixelSourceProvider: Send {
    /// Pixels of `shot` at shot-relative time `shot_time`. Must not block on
    /// decoding.
    fn frame(&self, shot: &Shot, shot_time: f64) -> SourceFrame;
}

/// Receives composited frames.
pub trait OutputSurface: Send {
    /// Canvas size in pixels.
    fn size(&self) -> (u32, u32);

    fn present(&mut self, frame: &FrameBuffer);

    fn draw_text(&mut self, draw: &TextDraw);
}

/// In-memory provider serving pre-decoded frames by source reference.
#[derive(Debug, Default, Clone)]
pub struct StaticSourceProvider {
    frames: HashMap<PixelSourceRef, SharedFrameBuffer>,
}

impl StaticSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, frame: FrameBuffer) {
        self.frames
            .insert(PixelSourceRef::new(source), SharedFrameBuffer::new(frame));
    }

    pub fn with_frame(mut self, source: impl Into<String>, frame: FrameBuffer) -> Self {
        self.insert(source, frame);
        self
    }
}

impl PixelSourceProvider for StaticSourceProvider {
    fn frame(&self, shot: &Shot, _shot_time: f64) -> SourceFrame {
        match self.frames.get(&shot.pixel_source) {
            Some(frame) => SourceFrame::Ready {
                frame: frame.clone(),
                decode_time: Duration::ZERO,
            },
            None => SourceFrame::NotReady,
        }
    }
}

/// Surface that keeps what it was given, for headless runs and tests.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    width: u32,
    height: u32,
    last_frame: Option<FrameBuffer>,
    text: Vec<TextDraw>,
    presents: usize,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            last_frame: None,
            text: Vec::new(),
            presents: 0,
        }
    }

    pub fn last_frame(&self) -> Option<&FrameBuffer> {
        self.last_frame.as_ref()
    }

    /// Text drawn since the last present.
    pub fn text(&self) -> &[TextDraw] {
        &self.text
    }

    pub fn present_count(&self) -> usize {
        self.presents
    }
}

impl OutputSurface for MemorySurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn present(&mut self, frame: &FrameBuffer) {
        match self.last_frame.as_mut() {
            Some(last) if last.width == frame.width && last.height == frame.height => {
                last.data.copy_from_slice(&frame.data);
            }
            _ => self.last_frame = Some(frame.clone()),
        }
        self.text.clear();
        self.presents += 1;
    }

    fn draw_text(&mut self, draw: &TextDraw) {
        self.text.push(draw.clone());
    }
}
