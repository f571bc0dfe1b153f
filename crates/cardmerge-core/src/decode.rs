//! Source inspection and decoding.
//!
//! Uploads are inspected before they enter a slot: the format is sniffed
//! from the content, and the header dimensions are checked against the
//! configured [`Limits`].  Full decoding happens only when compositing.
//!
//! Dimensions and pixels are reported as displayed: an EXIF orientation
//! tag (common on phone-camera JPEGs) is applied, so a portrait photo
//! stored sideways comes out upright, as the browser shows it.

use std::io::Cursor;
use std::sync::Arc;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbaImage};

use crate::config::Limits;
use crate::types::{ComposeError, DecodeError, Dimensions, Slot};

/// Image formats accepted for upload.
pub const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::WebP,
];

/// An uploaded file that passed inspection.
///
/// The bytes are shared so the same upload can be handed to several
/// compositing requests without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    bytes: Arc<[u8]>,
    format: ImageFormat,
    dimensions: Dimensions,
}

impl SourceFile {
    /// Inspect an upload and wrap it.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the data is empty, too large, not one
    /// of the [`ACCEPTED_FORMATS`], or its header is unreadable or reports
    /// a zero or oversize dimension.
    pub fn inspect(
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        limits: &Limits,
    ) -> Result<Self, DecodeError> {
        let bytes = bytes.into();
        let (format, dimensions) = inspect_bytes(&bytes, limits)?;
        Ok(Self {
            name: name.into(),
            bytes,
            format,
            dimensions,
        })
    }

    /// Original file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Sniffed content format.
    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type matching the sniffed format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Displayed dimensions read from the header, after orientation.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

/// Sniff the format and read header dimensions without decoding pixels.
fn inspect_bytes(bytes: &[u8], limits: &Limits) -> Result<(ImageFormat, Dimensions), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyInput);
    }
    if bytes.len() > limits.max_file_bytes {
        return Err(DecodeError::FileTooLarge {
            actual: bytes.len(),
            limit: limits.max_file_bytes,
        });
    }

    let format = image::guess_format(bytes)
        .map_err(|_| DecodeError::UnsupportedFormat("unrecognized content".into()))?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(DecodeError::UnsupportedFormat(
            format.to_mime_type().to_owned(),
        ));
    }

    let (decoder, orientation) = open(bytes, format)?;
    let dimensions = oriented_dimensions(decoder.dimensions(), orientation);
    let Dimensions { width, height } = dimensions;
    if width == 0 || height == 0 {
        return Err(DecodeError::ZeroSized);
    }
    if width > limits.max_source_dimension || height > limits.max_source_dimension {
        return Err(DecodeError::TooLarge {
            dimensions,
            limit: limits.max_source_dimension,
        });
    }
    Ok((format, dimensions))
}

/// Open a decoder and read its orientation.
///
/// A missing or unreadable EXIF block means no transform, as in browsers.
fn open(
    bytes: &[u8],
    format: ImageFormat,
) -> Result<(impl ImageDecoder + '_, Orientation), DecodeError> {
    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format).into_decoder()?;
    let orientation = decoder.orientation().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "ignoring unreadable orientation");
        Orientation::NoTransforms
    });
    Ok((decoder, orientation))
}

/// Stored `(width, height)` as displayed after `orientation`.
const fn oriented_dimensions((width, height): (u32, u32), orientation: Orientation) -> Dimensions {
    let quarter_turn = matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    );
    if quarter_turn {
        Dimensions::new(height, width)
    } else {
        Dimensions::new(width, height)
    }
}

/// Fully decode one source into upright RGBA pixels.
///
/// The content is re-inspected so raw bytes that never went through
/// [`SourceFile::inspect`] get the same checks.
///
/// # Errors
///
/// Returns a [`DecodeError`] for any inspection or decoding failure.
pub fn decode(bytes: &[u8], limits: &Limits) -> Result<RgbaImage, DecodeError> {
    let (format, _) = inspect_bytes(bytes, limits)?;
    let (decoder, orientation) = open(bytes, format)?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img.to_rgba8())
}

/// Decode the front and back sources, both of which must succeed.
///
/// On native targets the back image decodes on a scoped thread while the
/// front decodes on the caller.  On `wasm32` they run one after another.
/// If both fail, the front failure is reported.
///
/// # Errors
///
/// Returns [`ComposeError::Decode`] naming the failing slot.
pub fn decode_pair(
    front: &[u8],
    back: &[u8],
    limits: &Limits,
) -> Result<(RgbaImage, RgbaImage), ComposeError> {
    let (front, back) = decode_both(front, back, limits);
    let front = front.map_err(|source| ComposeError::Decode {
        slot: Slot::Front,
        source,
    })?;
    let back = back.map_err(|source| ComposeError::Decode {
        slot: Slot::Back,
        source,
    })?;
    Ok((front, back))
}

type Decoded = Result<RgbaImage, DecodeError>;

#[cfg(not(target_arch = "wasm32"))]
fn decode_both(front: &[u8], back: &[u8], limits: &Limits) -> (Decoded, Decoded) {
    std::thread::scope(|s| {
        let back_handle = s.spawn(|| decode(back, limits));
        let front = decode(front, limits);
        let back = back_handle
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
        (front, back)
    })
}

#[cfg(target_arch = "wasm32")]
fn decode_both(front: &[u8], back: &[u8], limits: &Limits) -> (Decoded, Decoded) {
    (decode(front, limits), decode(back, limits))
}
