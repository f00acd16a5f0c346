//! Watermark compositor.
//!
//! One optional overlay image per frame, drawn after the base frame copy and before publish. The
//! overlay is drawn into a scratch copy of the destination and committed back through [`blit`],
//! so the destination buffer only ever changes inside the blit engine.

use crate::blit::blit;
use crate::config::SpriteId;
use crate::frame::FrameBuffer;
use crate::geometry::{fit_within, normalize_region, place, PixelRect, Rect, Size, Vec2};

/// Fixed overlay tint (RGBA, multiplied into every watermark texel). Half grey at half alpha gives
/// the dimmed, blended look rather than a hard paste over the frame.
pub const WATERMARK_TINT: [f32; 4] = [0.5, 0.5, 0.5, 0.5];

/// Corner of the destination frame that the watermark offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    pub enabled: bool,
    pub image: Option<SpriteId>,
    pub anchor: WatermarkAnchor,
    /// Pixels, measured inward from the anchored corner.
    pub offset: Vec2,
    pub scale: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            image: None,
            anchor: WatermarkAnchor::BottomRight,
            offset: Vec2::new(32.0, 32.0),
            scale: 1.0,
        }
    }
}

/// An image plus the crop rectangle that is actually drawn.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub texture: FrameBuffer,
    pub rect: PixelRect,
}

impl Sprite {
    /// Sprite covering the whole texture.
    pub fn full(texture: FrameBuffer) -> Self {
        let rect = PixelRect::new(0, 0, texture.width(), texture.height());
        Self { texture, rect }
    }
}

/// Where the watermark lands for a `dest_width x dest_height` frame, or `None` when nothing
/// should be drawn (empty destination, empty crop, non-positive scale).
pub fn watermark_rect(
    dest_width: u32,
    dest_height: u32,
    sprite_rect: PixelRect,
    config: &WatermarkConfig,
) -> Option<Rect> {
    if dest_width == 0 || dest_height == 0 || sprite_rect.is_empty() {
        return None;
    }
    // Also rejects NaN.
    if !(config.scale > 0.0) {
        return None;
    }

    let nominal = Size::new(
        sprite_rect.width as f32 * config.scale,
        sprite_rect.height as f32 * config.scale,
    );
    if !nominal.is_positive() {
        return None;
    }

    let bounds = Size::new(dest_width as f32, dest_height as f32);
    let size = fit_within(nominal, bounds);
    Some(place(config.anchor, config.offset, bounds, size))
}

/// Overlay the watermark onto `destination`. Returns `true` if anything was drawn.
pub fn apply_watermark(
    destination: &mut FrameBuffer,
    config: &WatermarkConfig,
    sprite: Option<&Sprite>,
    keep_alpha: bool,
) -> bool {
    if !config.enabled || config.image.is_none() {
        return false;
    }
    let Some(sprite) = sprite else { return false };
    if sprite.texture.is_empty() || destination.is_empty() {
        return false;
    }
    let Some(rect) = watermark_rect(destination.width(), destination.height(), sprite.rect, config)
    else {
        return false;
    };

    let uv = normalize_region(sprite.rect, sprite.texture.width(), sprite.texture.height());

    // Scratch copy lives for this call only.
    let mut scratch = destination.clone();
    draw_sprite(&mut scratch, &sprite.texture, rect, uv, WATERMARK_TINT);
    blit(&scratch, destination, keep_alpha, false);
    true
}

/// Draw the `uv` sub-region of `texture` into `rect` of `target` (nearest sampling), tinted and
/// composited source-over.
fn draw_sprite(target: &mut FrameBuffer, texture: &FrameBuffer, rect: Rect, uv: Rect, tint: [f32; 4]) {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let x0 = rect.x.floor().max(0.0) as u32;
    let y0 = rect.y.floor().max(0.0) as u32;
    let x1 = (rect.right().ceil() as u32).min(target.width());
    let y1 = (rect.bottom().ceil() as u32).min(target.height());
    let tw = texture.width();
    let th = texture.height();

    for py in y0..y1 {
        let cy = py as f32 + 0.5;
        if cy < rect.y || cy >= rect.bottom() {
            continue;
        }
        let v = uv.y + (cy - rect.y) / rect.height * uv.height;
        let ty = texel_index(v, th);

        for px in x0..x1 {
            let cx = px as f32 + 0.5;
            if cx < rect.x || cx >= rect.right() {
                continue;
            }
            let u = uv.x + (cx - rect.x) / rect.width * uv.width;
            let tx = texel_index(u, tw);

            let (Some(src), Some(dst)) = (texture.pixel(tx, ty), target.pixel(px, py)) else {
                continue;
            };
            target.put_pixel(px, py, blend_over(src, dst, tint));
        }
    }
}

fn texel_index(coord: f32, extent: u32) -> u32 {
    let i = (coord * extent as f32).floor();
    (i.max(0.0) as u32).min(extent.saturating_sub(1))
}

fn blend_over(src: [u8; 4], dst: [u8; 4], tint: [f32; 4]) -> [u8; 4] {
    let s = |i: usize| src[i] as f32 / 255.0 * tint[i];
    let d = |i: usize| dst[i] as f32 / 255.0;
    let a = s(3);
    let inv = 1.0 - a;
    let out = [
        s(0) * a + d(0) * inv,
        s(1) * a + d(1) * inv,
        s(2) * a + d(2) * inv,
        a + d(3) * inv,
    ];
    out.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(anchor: WatermarkAnchor, offset: Vec2, scale: f32) -> WatermarkConfig {
        WatermarkConfig {
            enabled: true,
            image: Some(SpriteId::new("wm.png")),
            anchor,
            offset,
            scale,
        }
    }

    #[test]
    fn rect_for_small_top_left_watermark() {
        let cfg = enabled(WatermarkAnchor::TopLeft, Vec2::new(32.0, 32.0), 1.0);
        let r = watermark_rect(1280, 720, PixelRect::new(0, 0, 100, 50), &cfg);
        assert_eq!(r, Some(Rect::new(32.0, 32.0, 100.0, 50.0)));
    }

    #[test]
    fn rect_for_double_scale_full_hd_watermark() {
        let cfg = enabled(WatermarkAnchor::BottomRight, Vec2::new(32.0, 32.0), 2.0);
        let r = watermark_rect(1920, 1080, PixelRect::new(0, 0, 1920, 1080), &cfg);
        assert_eq!(r, Some(Rect::new(0.0, 0.0, 1920.0, 1080.0)));
    }

    #[test]
    fn rect_rejects_bad_inputs() {
        let mut cfg = enabled(WatermarkAnchor::TopLeft, Vec2::default(), 0.0);
        assert_eq!(watermark_rect(100, 100, PixelRect::new(0, 0, 10, 10), &cfg), None);
        cfg.scale = f32::NAN;
        assert_eq!(watermark_rect(100, 100, PixelRect::new(0, 0, 10, 10), &cfg), None);
        cfg.scale = 1.0;
        assert_eq!(watermark_rect(0, 100, PixelRect::new(0, 0, 10, 10), &cfg), None);
        assert_eq!(watermark_rect(100, 100, PixelRect::new(0, 0, 0, 10), &cfg), None);
    }

    #[test]
    fn overlay_is_tinted_and_confined_to_rect() {
        let mut dest = FrameBuffer::filled(16, 8, [0, 0, 0, 255]);
        let sprite = Sprite::full(FrameBuffer::filled(4, 2, [255, 255, 255, 255]));
        let cfg = enabled(WatermarkAnchor::TopLeft, Vec2::new(2.0, 1.0), 1.0);

        assert!(apply_watermark(&mut dest, &cfg, Some(&sprite), false));

        // 255 * 0.5 tint * 0.5 alpha
        assert_eq!(dest.pixel(2, 1), Some([64, 64, 64, 255]));
        assert_eq!(dest.pixel(5, 2), Some([64, 64, 64, 255]));
        assert_eq!(dest.pixel(6, 2), Some([0, 0, 0, 255]));
        assert_eq!(dest.pixel(1, 1), Some([0, 0, 0, 255]));
        assert_eq!(dest.pixel(2, 3), Some([0, 0, 0, 255]));
    }

    #[test]
    fn overlay_samples_only_the_crop_region() {
        let mut tex = FrameBuffer::filled(4, 2, [255, 0, 0, 255]);
        for y in 0..2 {
            for x in 2..4 {
                tex.put_pixel(x, y, [0, 0, 255, 255]);
            }
        }
        let sprite = Sprite { texture: tex, rect: PixelRect::new(2, 0, 2, 2) };
        let mut dest = FrameBuffer::filled(8, 8, [0, 0, 0, 255]);
        let cfg = enabled(WatermarkAnchor::TopLeft, Vec2::new(0.0, 0.0), 2.0);

        assert!(apply_watermark(&mut dest, &cfg, Some(&sprite), true));
        for y in 0..4 {
            for x in 0..4 {
                let px = dest.pixel(x, y).unwrap();
                assert_eq!(px[0], 0, "red leaked at {x},{y}");
                assert!(px[2] > 0);
            }
        }
    }

    #[test]
    fn keep_alpha_controls_committed_alpha() {
        let sprite = Sprite::full(FrameBuffer::filled(2, 2, [255, 255, 255, 255]));
        let cfg = enabled(WatermarkAnchor::TopLeft, Vec2::default(), 1.0);

        let mut kept = FrameBuffer::new(4, 4);
        apply_watermark(&mut kept, &cfg, Some(&sprite), true);
        assert_eq!(kept.pixel(0, 0).map(|p| p[3]), Some(128));
        assert_eq!(kept.pixel(3, 3).map(|p| p[3]), Some(0));

        let mut opaque = FrameBuffer::new(4, 4);
        apply_watermark(&mut opaque, &cfg, Some(&sprite), false);
        assert!(opaque.pixels().chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn disabled_or_missing_sprite_is_a_no_op() {
        let sprite = Sprite::full(FrameBuffer::filled(2, 2, [255, 255, 255, 255]));
        let before = FrameBuffer::filled(4, 4, [1, 2, 3, 4]);

        let mut cfg = enabled(WatermarkAnchor::TopLeft, Vec2::default(), 1.0);
        cfg.enabled = false;
        let mut dest = before.clone();
        assert!(!apply_watermark(&mut dest, &cfg, Some(&sprite), true));
        assert_eq!(dest, before);

        cfg.enabled = true;
        assert!(!apply_watermark(&mut dest, &cfg, None, true));
        cfg.image = None;
        assert!(!apply_watermark(&mut dest, &cfg, Some(&sprite), true));
        assert_eq!(dest, before);
    }
}
