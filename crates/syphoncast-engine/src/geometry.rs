//! Watermark placement math, in destination pixel space (top-left origin).

use crate::watermark::WatermarkAnchor;

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Integer crop rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Uniformly shrink `nominal` so it fits inside `bounds`. Sizes that already fit are returned
/// unchanged. The limiting axis lands exactly on the bound.
pub fn fit_within(nominal: Size, bounds: Size) -> Size {
    if nominal.width <= bounds.width && nominal.height <= bounds.height {
        return nominal;
    }
    let sx = bounds.width / nominal.width;
    let sy = bounds.height / nominal.height;
    if sx <= sy {
        Size::new(bounds.width, (nominal.height * sx).min(bounds.height))
    } else {
        Size::new((nominal.width * sy).min(bounds.width), bounds.height)
    }
}

/// Position a `size` rectangle inside `bounds` from `anchor`, with `offset` measured inward from
/// the anchored corner, then clamp so the rectangle stays inside the bounds.
pub fn place(anchor: WatermarkAnchor, offset: Vec2, bounds: Size, size: Size) -> Rect {
    let (x, y) = match anchor {
        WatermarkAnchor::TopLeft => (offset.x, offset.y),
        WatermarkAnchor::TopRight => (bounds.width - offset.x - size.width, offset.y),
        WatermarkAnchor::BottomLeft => (offset.x, bounds.height - offset.y - size.height),
        WatermarkAnchor::BottomRight => (
            bounds.width - offset.x - size.width,
            bounds.height - offset.y - size.height,
        ),
    };

    Rect::new(
        clamp_axis(x, bounds.width - size.width),
        clamp_axis(y, bounds.height - size.height),
        size.width,
        size.height,
    )
}

// Lower bound wins when the range is inverted, so an oversized rect pins to the origin.
fn clamp_axis(v: f32, max: f32) -> f32 {
    if v > max {
        max.max(0.0)
    } else {
        v.max(0.0)
    }
}

/// Crop rectangle → UV rectangle relative to the full image.
pub fn normalize_region(region: PixelRect, image_width: u32, image_height: u32) -> Rect {
    let iw = image_width.max(1) as f32;
    let ih = image_height.max(1) as f32;
    Rect::new(
        region.x as f32 / iw,
        region.y as f32 / ih,
        region.width as f32 / iw,
        region.height as f32 / ih,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANCHORS: [WatermarkAnchor; 4] = [
        WatermarkAnchor::TopLeft,
        WatermarkAnchor::TopRight,
        WatermarkAnchor::BottomLeft,
        WatermarkAnchor::BottomRight,
    ];

    #[test]
    fn top_left_without_clamping() {
        let r = place(
            WatermarkAnchor::TopLeft,
            Vec2::new(32.0, 32.0),
            Size::new(1280.0, 720.0),
            Size::new(100.0, 50.0),
        );
        assert_eq!(r, Rect::new(32.0, 32.0, 100.0, 50.0));
    }

    #[test]
    fn anchors_measure_offset_from_their_corner() {
        let bounds = Size::new(1280.0, 720.0);
        let size = Size::new(100.0, 50.0);
        let off = Vec2::new(10.0, 20.0);
        assert_eq!(place(WatermarkAnchor::TopRight, off, bounds, size), Rect::new(1170.0, 20.0, 100.0, 50.0));
        assert_eq!(place(WatermarkAnchor::BottomLeft, off, bounds, size), Rect::new(10.0, 650.0, 100.0, 50.0));
        assert_eq!(place(WatermarkAnchor::BottomRight, off, bounds, size), Rect::new(1170.0, 650.0, 100.0, 50.0));
    }

    #[test]
    fn oversized_watermark_downscales_and_pins_to_origin() {
        let bounds = Size::new(1920.0, 1080.0);
        let fitted = fit_within(Size::new(3840.0, 2160.0), bounds);
        assert_eq!(fitted, Size::new(1920.0, 1080.0));

        let r = place(WatermarkAnchor::BottomRight, Vec2::new(32.0, 32.0), bounds, fitted);
        assert_eq!(r, Rect::new(0.0, 0.0, 1920.0, 1080.0));
    }

    #[test]
    fn fit_preserves_aspect_and_touches_one_bound() {
        let cases = [
            (Size::new(4000.0, 100.0), Size::new(1280.0, 720.0)),
            (Size::new(300.0, 5000.0), Size::new(1280.0, 720.0)),
            (Size::new(1300.0, 730.0), Size::new(1280.0, 720.0)),
            (Size::new(640.0, 481.0), Size::new(640.0, 480.0)),
        ];
        for (nominal, bounds) in cases {
            let f = fit_within(nominal, bounds);
            assert!(f.width <= bounds.width && f.height <= bounds.height, "{f:?} in {bounds:?}");
            assert!(f.width == bounds.width || f.height == bounds.height, "{f:?} touches {bounds:?}");
            let before = nominal.width / nominal.height;
            let after = f.width / f.height;
            assert!((before - after).abs() / before < 1e-4, "aspect {before} -> {after}");
        }
    }

    #[test]
    fn fitting_size_is_untouched() {
        let s = Size::new(100.0, 50.0);
        assert_eq!(fit_within(s, Size::new(1280.0, 720.0)), s);
    }

    #[test]
    fn placement_stays_in_bounds_for_extreme_offsets() {
        let bounds = Size::new(640.0, 360.0);
        let sizes = [Size::new(1.0, 1.0), Size::new(200.0, 100.0), Size::new(640.0, 360.0)];
        let offsets = [
            Vec2::new(0.0, 0.0),
            Vec2::new(-5000.0, -5000.0),
            Vec2::new(5000.0, 5000.0),
            Vec2::new(639.0, -1.0),
        ];
        for anchor in ANCHORS {
            for size in sizes {
                for off in offsets {
                    let r = place(anchor, off, bounds, size);
                    assert!(r.x >= 0.0 && r.y >= 0.0, "{anchor:?} {off:?} {r:?}");
                    assert!(r.right() <= bounds.width && r.bottom() <= bounds.height, "{anchor:?} {off:?} {r:?}");
                }
            }
        }
    }

    #[test]
    fn region_normalizes_against_full_image() {
        let uv = normalize_region(PixelRect::new(64, 32, 128, 64), 256, 128);
        assert_eq!(uv, Rect::new(0.25, 0.25, 0.5, 0.5));
    }
}
