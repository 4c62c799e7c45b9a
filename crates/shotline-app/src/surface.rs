//! Output surface that keeps the last frame for PNG snapshots.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use shotline_core::FrameBuffer;
use shotline_effects::{OutputSurface, TextDraw};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct SnapshotState {
    frame: Option<FrameBuffer>,
    text: Vec<TextDraw>,
    presents: u64,
}

/// Surface handed to the sequencer.
pub struct SnapshotSurface {
    size: (u32, u32),
    state: Arc<Mutex<SnapshotState>>,
}

/// Read side of a [`SnapshotSurface`], kept by the runner.
#[derive(Clone)]
pub struct SnapshotHandle {
    state: Arc<Mutex<SnapshotState>>,
}

impl SnapshotSurface {
    pub fn new(width: u32, height: u32) -> (Self, SnapshotHandle) {
        let state = Arc::new(Mutex::new(SnapshotState::default()));
        (
            Self {
                size: (width, height),
                state: Arc::clone(&state),
            },
            SnapshotHandle { state },
        )
    }
}

impl OutputSurface for SnapshotSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn present(&mut self, frame: &FrameBuffer) {
        let mut state = self.state.lock();
        match state.frame.as_mut() {
            Some(last) if (last.width, last.height) == (frame.width, frame.height) => {
                last.data.copy_from_slice(&frame.data);
            }
            _ => state.frame = Some(frame.clone()),
        }
        state.text.clear();
        state.presents += 1;
    }

    fn draw_text(&mut self, draw: &TextDraw) {
        debug!(
            "Text '{}' at ({:.0}, {:.0}) alpha {:.2}",
            draw.text, draw.position.x, draw.position.y, draw.color.a
        );
        self.state.lock().text.push(draw.clone());
    }
}

impl SnapshotHandle {
    pub fn presents(&self) -> u64 {
        self.state.lock().presents
    }

    /// Text drawn over the last presented frame.
    pub fn text(&self) -> Vec<TextDraw> {
        self.state.lock().text.clone()
    }

    pub fn last_frame(&self) -> Option<FrameBuffer> {
        self.state.lock().frame.clone()
    }

    /// Write the last presented frame as PNG.
    pub fn write_png(&self, path: &Path) -> Result<()> {
        let frame = self
            .last_frame()
            .context("no frame has been presented yet")?;
        let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.data)
            .context("frame buffer size does not match its dimensions")?;
        image
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Snapshot written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotline_core::Color;

    #[test]
    fn test_present_replaces_frame_and_clears_text() {
        let (mut surface, handle) = SnapshotSurface::new(4, 4);
        surface.present(&FrameBuffer::filled(4, 4, Color::WHITE));
        assert_eq!(handle.presents(), 1);
        assert_eq!(handle.last_frame().unwrap().pixel(0, 0), Some([255; 4]));

        surface.present(&FrameBuffer::filled(4, 4, Color::BLACK));
        assert_eq!(handle.last_frame().unwrap().pixel(0, 0), Some([0, 0, 0, 255]));
        assert!(handle.text().is_empty());
    }

    #[test]
    fn test_write_png_requires_frame() {
        let (_surface, handle) = SnapshotSurface::new(4, 4);
        let path = std::env::temp_dir().join("shotline-empty-snapshot.png");
        assert!(handle.write_png(&path).is_err());
    }

    #[test]
    fn test_write_png_roundtrip() {
        let (mut surface, handle) = SnapshotSurface::new(3, 2);
        surface.present(&FrameBuffer::filled(3, 2, Color::from_rgba8(1, 2, 3, 255)));
        let path = std::env::temp_dir().join(format!("shotline-snap-{}.png", std::process::id()));
        handle.write_png(&path).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [1, 2, 3, 255]);
        let _ = std::fs::remove_file(&path);
    }
}
