//! Lossless PNG serialization and data URLs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, RgbaImage};

use crate::layout::Layout;
use crate::types::{Dimensions, EncodeError};

/// MIME type of every composite.
pub const PNG_MIME: &str = "image/png";

/// An encoded composite image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeImage {
    png: Vec<u8>,
    dimensions: Dimensions,
    layout: Layout,
}

impl CompositeImage {
    /// Reassemble a composite from PNG bytes encoded elsewhere with
    /// `layout`.
    pub(crate) const fn from_parts(png: Vec<u8>, layout: Layout) -> Self {
        Self {
            png,
            dimensions: layout.canvas(),
            layout,
        }
    }

    /// Encoded PNG bytes.
    #[must_use]
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// Consume and return the PNG bytes.
    #[must_use]
    pub fn into_png(self) -> Vec<u8> {
        self.png
    }

    /// Canvas size in pixels.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Layout the canvas was drawn with.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// `data:image/png;base64,...` for direct use as an `<img src>` or
    /// download href.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        to_data_url(&self.png, PNG_MIME)
    }
}

/// Encode a data URL for arbitrary bytes.
#[must_use]
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Encode the canvas as an RGB PNG.
///
/// The canvas is opaque after compositing, so the alpha channel is
/// dropped.
///
/// # Errors
///
/// Returns [`EncodeError::Png`] if the encoder fails.
pub fn encode_png(canvas: RgbaImage, layout: Layout) -> Result<CompositeImage, EncodeError> {
    let (width, height) = canvas.dimensions();
    let rgb = image::DynamicImage::ImageRgba8(canvas).into_rgb8();
    let mut png = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut png, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)?;

    Ok(CompositeImage {
        png,
        dimensions: Dimensions::new(width, height),
        layout,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{Limits, ResolutionProfile};

    fn sample() -> CompositeImage {
        let layout = Layout::for_front(
            Dimensions::new(4, 6),
            &ResolutionProfile {
                target_height: 6,
                ..ResolutionProfile::export()
            },
            &Limits::default(),
        )
        .unwrap();
        let canvas = RgbaImage::from_pixel(8, 6, image::Rgba([1, 2, 3, 255]));
        encode_png(canvas, layout).unwrap()
    }

    #[test]
    fn png_decodes_back_losslessly() {
        let composite = sample();
        assert_eq!(composite.dimensions(), Dimensions::new(8, 6));
        let decoded = image::load_from_memory(composite.png()).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert!(decoded.pixels().all(|p| p.0 == [1, 2, 3]));
    }

    #[test]
    fn data_url_has_png_prefix_and_payload() {
        let composite = sample();
        let url = composite.to_data_url();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), composite.png());
    }
}
