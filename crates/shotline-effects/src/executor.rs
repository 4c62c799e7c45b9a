//! CPU execution of pipeline stages.
//!
//! Rows are processed in parallel with rayon. Source and destination must
//! be distinct buffers of the same size.

use glam::Vec2;
use rayon::prelude::*;
use shotline_core::frame::BYTES_PER_PIXEL;
use shotline_core::FrameBuffer;
use shotline_gpu::ShaderComplexity;

use crate::kernel::{ColorMatrix, StageDesc, StageOp};

#[inline]
fn to_unit(px: &[u8]) -> [f32; 4] {
    [
        px[0] as f32 / 255.0,
        px[1] as f32 / 255.0,
        px[2] as f32 / 255.0,
        px[3] as f32 / 255.0,
    ]
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Run one stage from `src` into `dst`, resizing `dst` to match.
pub fn execute_stage(stage: &StageDesc, src: &FrameBuffer, dst: &mut FrameBuffer) {
    if dst.width != src.width || dst.height != src.height {
        *dst = FrameBuffer::new(src.width, src.height);
    }
    match &stage.op {
        StageOp::ColorMatrix(m) => color_matrix(m, src, dst),
        StageOp::Convolve { size, weights } => convolve(*size, weights, src, dst),
        StageOp::Transform(t) => {
            let inverse = t.inverse();
            let bilinear = stage.complexity != ShaderComplexity::Low;
            resample(src, dst, bilinear, |p| inverse.transform_point(p));
        }
    }
}

fn color_matrix(m: &ColorMatrix, src: &FrameBuffer, dst: &mut FrameBuffer) {
    dst.data
        .par_chunks_mut(src.stride().max(1))
        .zip(src.data.par_chunks(src.stride().max(1)))
        .for_each(|(out_row, in_row)| {
            for (o, i) in out_row
                .chunks_exact_mut(BYTES_PER_PIXEL)
                .zip(in_row.chunks_exact(BYTES_PER_PIXEL))
            {
                let px = to_unit(i);
                for c in 0..4 {
                    let r = &m[c * 5..c * 5 + 5];
                    o[c] = to_u8(r[0] * px[0] + r[1] * px[1] + r[2] * px[2] + r[3] * px[3] + r[4]);
                }
            }
        });
}

fn convolve(size: u32, weights: &[f32], src: &FrameBuffer, dst: &mut FrameBuffer) {
    if size <= 1 {
        let w = weights.first().copied().unwrap_or(1.0);
        if w == 1.0 {
            dst.data.copy_from_slice(&src.data);
            return;
        }
    }
    let radius = (size / 2) as i64;
    let (w, h) = (src.width as i64, src.height as i64);
    let stride = src.stride().max(1);

    dst.data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            let y = y as i64;
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                for ky in 0..size as i64 {
                    let sy = (y + ky - radius).clamp(0, h - 1) as usize;
                    let row = &src.data[sy * stride..(sy + 1) * stride];
                    for kx in 0..size as i64 {
                        let sx = (x + kx - radius).clamp(0, w - 1) as usize;
                        let weight = weights[(ky * size as i64 + kx) as usize];
                        let px = &row[sx * BYTES_PER_PIXEL..sx * BYTES_PER_PIXEL + BYTES_PER_PIXEL];
                        for c in 0..4 {
                            acc[c] += weight * px[c] as f32;
                        }
                    }
                }
                let o = x as usize * BYTES_PER_PIXEL;
                for c in 0..4 {
                    out_row[o + c] = acc[c].round().clamp(0.0, 255.0) as u8;
                }
            }
        });
}

/// Fill `dst` by sampling `src` at `map(p)`, where both sides use
/// centre-origin pixel coordinates. Unmapped pixels become transparent.
pub fn resample(
    src: &FrameBuffer,
    dst: &mut FrameBuffer,
    bilinear: bool,
    map: impl Fn(Vec2) -> Vec2 + Sync,
) {
    let src_centre = Vec2::new(src.width as f32, src.height as f32) * 0.5;
    let dst_centre = Vec2::new(dst.width as f32, dst.height as f32) * 0.5;
    let dst_width = dst.width;
    let stride = dst.stride().max(1);

    dst.data
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            for x in 0..dst_width {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - dst_centre;
                let s = map(p) + src_centre;
                let px = if bilinear {
                    sample_bilinear(src, s)
                } else {
                    src.sample_nearest(s.x, s.y)
                };
                let o = x as usize * BYTES_PER_PIXEL;
                out_row[o..o + BYTES_PER_PIXEL].copy_from_slice(&px.unwrap_or([0; 4]));
            }
        });
}

/// Bilinear sample at continuous coordinates (pixel centres at +0.5).
pub fn sample_bilinear(src: &FrameBuffer, p: Vec2) -> Option<[u8; 4]> {
    if p.x < 0.0 || p.y < 0.0 || p.x >= src.width as f32 || p.y >= src.height as f32 {
        return None;
    }
    let fx = (p.x - 0.5).max(0.0);
    let fy = (p.y - 0.5).max(0.0);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(src.width - 1);
    let y1 = (y0 + 1).min(src.height - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let a = src.pixel(x0, y0)?;
    let b = src.pixel(x1, y0)?;
    let c = src.pixel(x0, y1)?;
    let d = src.pixel(x1, y1)?;
    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = a[i] as f32 + (b[i] as f32 - a[i] as f32) * tx;
        let bottom = c[i] as f32 + (d[i] as f32 - c[i] as f32) * tx;
        out[i] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::blur::gaussian_weights;
    use crate::kernels::color::{brightness, IDENTITY};
    use shotline_core::{Color, Transform2D};

    fn stage(op: StageOp, complexity: ShaderComplexity) -> StageDesc {
        StageDesc::new("test", op, complexity)
    }

    #[test]
    fn test_identity_matrix_preserves_pixels() {
        let src = FrameBuffer::test_pattern(16, 8);
        let mut dst = FrameBuffer::new(1, 1);
        execute_stage(&stage(StageOp::ColorMatrix(IDENTITY), ShaderComplexity::Low), &src, &mut dst);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_brightness_offsets_and_clamps() {
        let src = FrameBuffer::filled(4, 4, Color::from_rgba8(100, 250, 0, 255));
        let mut dst = FrameBuffer::new(4, 4);
        let op = StageOp::ColorMatrix(brightness(20.0 / 255.0));
        execute_stage(&stage(op, ShaderComplexity::Low), &src, &mut dst);
        assert_eq!(dst.pixel(2, 2), Some([120, 255, 20, 255]));
    }

    #[test]
    fn test_blur_keeps_flat_field() {
        let src = FrameBuffer::filled(9, 7, Color::from_rgba8(40, 80, 120, 255));
        let mut dst = FrameBuffer::new(9, 7);
        let op = StageOp::Convolve {
            size: 5,
            weights: gaussian_weights(2),
        };
        execute_stage(&stage(op, ShaderComplexity::Medium), &src, &mut dst);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_box_blur_softens_edge() {
        let mut src = FrameBuffer::filled(6, 1, Color::BLACK);
        for x in 3..6 {
            src.set_pixel(x, 0, [255, 255, 255, 255]);
        }
        let mut dst = FrameBuffer::new(6, 1);
        let op = StageOp::Convolve {
            size: 3,
            weights: vec![1.0 / 9.0; 9],
        };
        execute_stage(&stage(op, ShaderComplexity::Low), &src, &mut dst);
        let left = dst.pixel(2, 0).unwrap()[0];
        let right = dst.pixel(3, 0).unwrap()[0];
        assert_eq!(left, 85);
        assert_eq!(right, 170);
    }

    #[test]
    fn test_identity_transform_roundtrips() {
        let src = FrameBuffer::test_pattern(32, 16);
        let mut dst = FrameBuffer::new(32, 16);
        execute_stage(
            &stage(StageOp::Transform(Transform2D::IDENTITY), ShaderComplexity::Low),
            &src,
            &mut dst,
        );
        assert_eq!(dst, src);
    }

    #[test]
    fn test_downscale_leaves_transparent_border() {
        let src = FrameBuffer::filled(16, 16, Color::WHITE);
        let mut dst = FrameBuffer::new(16, 16);
        let t = Transform2D::from_trs_about(Vec2::ZERO, Vec2::ZERO, 0.0, Vec2::splat(0.5));
        execute_stage(&stage(StageOp::Transform(t), ShaderComplexity::High), &src, &mut dst);
        assert_eq!(dst.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(dst.pixel(8, 8), Some([255, 255, 255, 255]));
    }
}
