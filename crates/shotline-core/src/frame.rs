//! RGBA8 frame buffers used as the compositor's pixel storage.

use std::sync::Arc;

use crate::color::Color;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A tightly packed RGBA8 frame in CPU memory.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 pixels, `width * 4` bytes per row.
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    /// Create a frame filled with a single colour.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let mut frame = Self::new(width, height);
        frame.fill(color);
        frame
    }

    /// Fill the whole frame with a colour.
    pub fn fill(&mut self, color: Color) {
        let px = color.to_rgba8();
        for chunk in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Read one pixel; `None` outside the frame.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Write one pixel; ignored outside the frame.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        self.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&px);
    }

    /// Nearest-neighbour sample at continuous pixel coordinates.
    #[inline]
    pub fn sample_nearest(&self, x: f32, y: f32) -> Option<[u8; 4]> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        self.pixel(x as u32, y as u32)
    }

    /// Copy `src` into `self`, rescaling with nearest-neighbour sampling.
    pub fn blit_scaled_from(&mut self, src: &FrameBuffer) {
        if src.width == 0 || src.height == 0 {
            return;
        }
        if src.width == self.width && src.height == self.height {
            self.data.copy_from_slice(&src.data);
            return;
        }
        let (w, h) = (self.width, self.height);
        for y in 0..h {
            let sy = (y as u64 * src.height as u64 / h as u64) as u32;
            for x in 0..w {
                let sx = (x as u64 * src.width as u64 / w as u64) as u32;
                if let Some(px) = src.pixel(sx, sy) {
                    self.set_pixel(x, y, px);
                }
            }
        }
    }

    /// Create a test pattern frame (colour bars).
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 4]; 8] = [
            [255, 255, 255, 255], // White
            [255, 255, 0, 255],   // Yellow
            [0, 255, 255, 255],   // Cyan
            [0, 255, 0, 255],     // Green
            [255, 0, 255, 255],   // Magenta
            [255, 0, 0, 255],     // Red
            [0, 0, 255, 255],     // Blue
            [0, 0, 0, 255],       // Black
        ];
        let mut frame = Self::new(width, height);
        for y in 0..height {
            let row = frame.row_mut(y);
            for x in 0..width {
                let i = x as usize * BYTES_PER_PIXEL;
                let bar = (x as u64 * 8 / width.max(1) as u64) as usize;
                row[i..i + BYTES_PER_PIXEL].copy_from_slice(&BARS[bar.min(7)]);
            }
        }
        frame
    }
}

/// Arc-wrapped frame buffer for shared ownership between a pixel source
/// and the compositor.
pub type SharedFrameBuffer = Arc<FrameBuffer>;
