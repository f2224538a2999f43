use image::{Rgba, RgbaImage, RgbImage};
use imageproc::rect::Rect;

use crate::{BoundingBox, Heatmap};

pub const DEFAULT_OVERLAY_ALPHA: u8 = 120;
const BOX_COLOR: Rgba<u8> = Rgba([0, 64, 255, 255]);

/// Green (low) → yellow → red (high) for a value in `[0, 1]`.
pub fn heat_color(value: f32, alpha: u8) -> Rgba<u8> {
    let norm = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let r = if norm < 0.5 { 2.0 * norm } else { 1.0 };
    let g = if norm < 0.5 { 1.0 } else { 2.0 * (1.0 - norm) };
    Rgba([(r * 255.0) as u8, (g * 255.0) as u8, 0, alpha])
}

/// Renders a normalized heatmap over `image` and outlines `boxes`.
///
/// The heatmap is centered when its size differs from the image.
pub fn render_overlay(
    image: &RgbImage,
    heatmap: &Heatmap,
    boxes: &[BoundingBox],
    alpha: u8,
) -> RgbaImage {
    let (w, h) = image.dimensions();
    let mut canvas: RgbaImage = image::DynamicImage::ImageRgb8(image.clone()).to_rgba8();

    let (mw, mh) = heatmap.dimensions();
    let x_offset = ((w as i64 - mw as i64) / 2).max(0) as u32;
    let y_offset = ((h as i64 - mh as i64) / 2).max(0) as u32;

    let mut layer = RgbaImage::new(w, h);
    for ((y, x), &v) in heatmap.map().indexed_iter() {
        let (px, py) = (x as u32 + x_offset, y as u32 + y_offset);
        if px < w && py < h {
            layer.put_pixel(px, py, heat_color(v, alpha));
        }
    }
    image::imageops::overlay(&mut canvas, &layer, 0, 0);

    for bbox in boxes {
        if bbox.width() == 0 || bbox.height() == 0 {
            continue;
        }
        let rect = Rect::at(bbox.x_min as i32, bbox.y_min as i32).of_size(bbox.width(), bbox.height());
        imageproc::drawing::draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
    }

    canvas
}
