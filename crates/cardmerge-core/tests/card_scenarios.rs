//! Integration test: compose synthetic card sides at both resolutions and
//! check canvas geometry, stretching, and the divider.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cardmerge_core::{ComposeError, Dimensions, Limits, ResolutionProfile, Slot, compose};

fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let [r, g, b] = rgb;
    let img = image::RgbaImage::from_fn(width, height, |_, _| image::Rgba([r, g, b, 255]));
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )
    .unwrap();
    buf
}

fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 95);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgb8,
    )
    .unwrap();
    buf
}

const RED: [u8; 3] = [220, 20, 20];
const BLUE: [u8; 3] = [20, 20, 220];

#[test]
fn preview_of_four_by_three_front_and_wide_back() {
    let front = solid_png(800, 600, RED);
    let back = solid_png(1000, 500, BLUE);

    let result = compose(
        &front,
        &back,
        &ResolutionProfile::preview(),
        &Limits::default(),
    )
    .expect("compose should succeed");
    assert_eq!(result.dimensions(), Dimensions::new(1620, 600));

    let decoded = image::load_from_memory(result.png()).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (1620, 600));

    // Back box spans columns 820..1620 and every row; a 2:1 source kept at
    // its own ratio would leave white bands above and below.
    for &(x, y) in &[(820, 0), (1619, 0), (820, 599), (1619, 599), (1220, 300)] {
        assert_eq!(decoded.get_pixel(x, y).0, BLUE, "back pixel ({x}, {y})");
    }
    for &(x, y) in &[(0, 0), (799, 599), (400, 300)] {
        assert_eq!(decoded.get_pixel(x, y).0, RED, "front pixel ({x}, {y})");
    }

    // Gutter: white edges and a 2px divider at columns 809 and 810.
    assert_eq!(decoded.get_pixel(800, 300).0, [255, 255, 255]);
    assert_eq!(decoded.get_pixel(819, 300).0, [255, 255, 255]);
    assert_eq!(decoded.get_pixel(809, 300).0, ResolutionProfile::DIVIDER_COLOR);
    assert_eq!(decoded.get_pixel(810, 300).0, ResolutionProfile::DIVIDER_COLOR);
}

#[test]
fn export_has_no_gutter_and_no_divider_pixels() {
    let front = solid_png(400, 300, RED);
    let back = solid_png(300, 400, BLUE);

    let result = compose(
        &front,
        &back,
        &ResolutionProfile::export(),
        &Limits::default(),
    )
    .unwrap();
    // 2400 * 400 / 300 = 3200 per box.
    assert_eq!(result.dimensions(), Dimensions::new(6400, 2400));
    assert_eq!(result.layout().back_origin(), (3200, 0));

    let decoded = image::load_from_memory(result.png()).unwrap().to_rgb8();
    assert!(
        decoded
            .pixels()
            .all(|p| p.0 != ResolutionProfile::DIVIDER_COLOR),
        "export must not contain divider pixels"
    );
    assert_eq!(decoded.get_pixel(3199, 1200).0, RED);
    assert_eq!(decoded.get_pixel(3200, 1200).0, BLUE);
}

#[test]
fn back_box_follows_front_ratio_for_any_back_shape() {
    let front = solid_png(300, 200, RED);
    for (w, h) in [(10, 200), (200, 10), (300, 200), (1, 1)] {
        let back = solid_png(w, h, BLUE);
        let result = compose(
            &front,
            &back,
            &ResolutionProfile::preview(),
            &Limits::default(),
        )
        .unwrap();
        assert_eq!(
            result.layout().back_box,
            Dimensions::new(900, 600),
            "back {w}x{h}"
        );
        assert_eq!(result.dimensions(), Dimensions::new(1820, 600));
    }
}

#[test]
fn mixed_formats_compose() {
    let front = solid_jpeg(160, 100, RED);
    let back = solid_png(160, 100, BLUE);
    let result = compose(
        &front,
        &back,
        &ResolutionProfile::preview(),
        &Limits::default(),
    )
    .unwrap();
    // 600 * 160 / 100 = 960 per box.
    assert_eq!(result.dimensions(), Dimensions::new(1940, 600));
}

#[test]
fn corrupt_front_produces_no_output() {
    let back = solid_png(10, 10, BLUE);
    let err = compose(
        b"definitely not an image",
        &back,
        &ResolutionProfile::preview(),
        &Limits::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ComposeError::Decode {
            slot: Slot::Front,
            ..
        }
    ));
}

#[test]
fn data_url_is_png() {
    let front = solid_png(4, 3, RED);
    let back = solid_png(4, 3, BLUE);
    let result = compose(
        &front,
        &back,
        &ResolutionProfile::preview(),
        &Limits::default(),
    )
    .unwrap();
    assert!(result.to_data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
}

/// An 80x60 JPEG stored sideways: the stored left half is red, and the
/// EXIF Orientation=6 tag says to rotate it clockwise for display.
fn sideways_phone_photo() -> Vec<u8> {
    let img = image::RgbImage::from_fn(80, 60, |x, _| {
        if x < 40 {
            image::Rgb([255, 0, 0])
        } else {
            image::Rgb([0, 0, 255])
        }
    });
    let mut jpeg = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 95)
        .encode_image(&img)
        .unwrap();

    // APP1: "Exif\0\0" + big-endian TIFF with one IFD entry, Orientation = 6.
    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\x00\x00MM\x00\x2a\x00\x00\x00\x08");
    app1.extend_from_slice(&[0x00, 0x01, 0x01, 0x12, 0x00, 0x03]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x06, 0x00, 0x00]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

#[test]
fn sideways_phone_photo_is_sized_and_drawn_upright() {
    let front = sideways_phone_photo();
    let back = solid_png(80, 60, BLUE);

    let result = compose(
        &front,
        &back,
        &ResolutionProfile::preview(),
        &Limits::default(),
    )
    .unwrap();
    // Displayed front is 60x80: 600 * 60 / 80 = 450 per box.
    assert_eq!(result.dimensions(), Dimensions::new(920, 600));

    let decoded = image::load_from_memory(result.png()).unwrap().to_rgb8();
    let top = decoded.get_pixel(225, 100).0;
    let bottom = decoded.get_pixel(225, 500).0;
    assert!(top[0] > 200 && top[2] < 60, "top of front box {top:?}");
    assert!(bottom[2] > 200 && bottom[0] < 60, "bottom of front box {bottom:?}");
}

#[test]
fn fractional_pair_width_truncates_canvas() {
    // 600 * 1000 / 701 = 855.92...; the pair truncates to 1711.
    let front = solid_png(1000, 701, RED);
    let back = solid_png(1000, 701, BLUE);
    let result = compose(
        &front,
        &back,
        &ResolutionProfile::preview(),
        &Limits::default(),
    )
    .unwrap();
    assert_eq!(result.dimensions(), Dimensions::new(1731, 600));
    assert_eq!(result.layout().front_box.width, 856);
    assert_eq!(result.layout().back_box.width, 855);
}
