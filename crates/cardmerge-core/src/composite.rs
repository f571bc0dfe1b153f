//! Raster drawing of the side-by-side composite.

use image::{Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::config::ResizeFilter;
use crate::layout::Layout;

/// Draw both sources onto a fresh canvas.
///
/// The canvas is filled with `background`, the front is scaled to exactly
/// `layout.front_box` and the back to exactly `layout.back_box`, then the
/// divider is drawn over the gutter.
/// Transparent source pixels blend over the background.
#[must_use = "returns the composited canvas"]
pub fn draw(
    front: &RgbaImage,
    back: &RgbaImage,
    layout: &Layout,
    background: [u8; 3],
    filter: ResizeFilter,
) -> RgbaImage {
    let canvas_size = layout.canvas();
    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(canvas_size.width, canvas_size.height, Rgba([r, g, b, 255]));

    let filter = filter.to_filter_type();

    let front_box = layout.front_box;
    let front_scaled = imageops::resize(front, front_box.width, front_box.height, filter);
    let (fx, fy) = layout.front_origin();
    imageops::overlay(&mut canvas, &front_scaled, i64::from(fx), i64::from(fy));

    let back_box = layout.back_box;
    let back_scaled = imageops::resize(back, back_box.width, back_box.height, filter);
    let (bx, by) = layout.back_origin();
    imageops::overlay(&mut canvas, &back_scaled, i64::from(bx), i64::from(by));

    if let Some(divider) = layout.divider {
        let [r, g, b] = divider.color;
        #[allow(clippy::cast_possible_wrap)]
        let rect = Rect::at(divider.x as i32, 0).of_size(divider.width, canvas_size.height);
        draw_filled_rect_mut(&mut canvas, rect, Rgba([r, g, b, 255]));
    }

    canvas
}
