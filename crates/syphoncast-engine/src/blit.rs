//! Blit engine: the only code that writes pixels into a destination buffer.

use crate::frame::{FrameBuffer, BYTES_PER_PIXEL};

/// Copy `source` into `destination`.
///
/// - No scaling: the overlapping `min(width) x min(height)` region is copied, which is the whole
///   frame in the normal case where both buffers match.
/// - `keep_alpha == false` forces the destination alpha to fully opaque. Receivers on some
///   platforms treat alpha as transparency, which is rarely wanted for a full-frame capture.
/// - `vflip` reads the source bottom-up, for framebuffer readbacks with a bottom-left origin.
pub fn blit(source: &FrameBuffer, destination: &mut FrameBuffer, keep_alpha: bool, vflip: bool) {
    let w = source.width().min(destination.width());
    let h = source.height().min(destination.height());
    if w == 0 || h == 0 {
        return;
    }

    let span = w as usize * BYTES_PER_PIXEL;
    for y in 0..h {
        let src_y = if vflip { source.height() - 1 - y } else { y };
        let src = &source.row(src_y)[..span];
        let dst = &mut destination.row_mut(y)[..span];
        dst.copy_from_slice(src);
        if !keep_alpha {
            for px in dst.chunks_exact_mut(BYTES_PER_PIXEL) {
                px[3] = u8::MAX;
            }
        }
    }
}

/// Reverse row order in place.
pub fn flip_vertical(buffer: &mut FrameBuffer) {
    let h = buffer.height() as usize;
    let stride = buffer.stride();
    let pixels = buffer.pixels_mut();
    for y in 0..h / 2 {
        let (top, bottom) = pixels.split_at_mut((h - 1 - y) * stride);
        top[y * stride..(y + 1) * stride].swap_with_slice(&mut bottom[..stride]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> FrameBuffer {
        let mut fb = FrameBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                fb.put_pixel(x, y, [x as u8, y as u8, (x + y) as u8, (10 * y + x) as u8]);
            }
        }
        fb
    }

    #[test]
    fn keep_alpha_preserves_source_alpha() {
        let src = gradient(4, 3);
        let mut dst = FrameBuffer::new(4, 3);
        blit(&src, &mut dst, true, false);
        assert_eq!(dst, src);
    }

    #[test]
    fn strip_alpha_forces_opaque() {
        let src = FrameBuffer::filled(5, 2, [10, 20, 30, 0]);
        let mut dst = FrameBuffer::new(5, 2);
        blit(&src, &mut dst, false, false);
        for px in dst.pixels().chunks_exact(4) {
            assert_eq!(px, &[10, 20, 30, 255]);
        }
    }

    #[test]
    fn vflip_reverses_rows() {
        let src = gradient(3, 4);
        let mut dst = FrameBuffer::new(3, 4);
        blit(&src, &mut dst, true, true);
        for y in 0..4 {
            assert_eq!(dst.row(y), src.row(3 - y));
        }
    }

    #[test]
    fn mismatched_sizes_copy_overlap_only() {
        let src = FrameBuffer::filled(2, 2, [1, 1, 1, 1]);
        let mut dst = FrameBuffer::filled(3, 3, [7, 7, 7, 7]);
        blit(&src, &mut dst, true, false);
        assert_eq!(dst.pixel(1, 1), Some([1, 1, 1, 1]));
        assert_eq!(dst.pixel(2, 2), Some([7, 7, 7, 7]));
    }

    #[test]
    fn flip_vertical_matches_vflip_blit() {
        let src = gradient(5, 5);
        let mut flipped = src.clone();
        flip_vertical(&mut flipped);
        let mut blitted = FrameBuffer::new(5, 5);
        blit(&src, &mut blitted, true, true);
        assert_eq!(flipped, blitted);
    }
}
