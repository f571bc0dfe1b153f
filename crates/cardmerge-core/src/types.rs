//! Shared types for the cardmerge compositor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference decoded
/// sources without depending on `image` directly.
pub use image::RgbaImage;

/// One of the two upload positions for the document image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// Front page of the card.
    Front,
    /// Back page of the card.
    Back,
}

impl Slot {
    /// Both slots in display order.
    pub const ALL: [Self; 2] = [Self::Front, Self::Back];

    /// Lowercase label used in messages and element ids.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new dimensions pair.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Errors raised while inspecting or decoding one source image.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The content is not an image in one of the accepted formats.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The file exceeds the configured byte limit.
    #[error("file is {actual} bytes, the limit is {limit} bytes")]
    FileTooLarge {
        /// Size of the rejected input.
        actual: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The image exceeds the configured maximum side length.
    #[error("image is {dimensions}, the limit is {limit} pixels per side")]
    TooLarge {
        /// Dimensions read from the image header.
        dimensions: Dimensions,
        /// Configured maximum side length.
        limit: u32,
    },

    /// The image header reports a zero width or height.
    #[error("image has zero width or height")]
    ZeroSized,

    /// The `image` crate failed to read the data.
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors raised while serializing a composite.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Png(#[from] image::ImageError),
}

/// Errors that can occur while compositing two sources.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// One of the sources failed to decode.
    #[error("failed to decode {slot} image: {source}")]
    Decode {
        /// The slot whose image failed.
        slot: Slot,
        /// The underlying decode failure.
        #[source]
        source: DecodeError,
    },

    /// The composite could not be serialized.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The computed canvas is unusable (too large for the limits).
    #[error("invalid layout: {0}")]
    Layout(String),

    /// The resolution profile is inconsistent.
    #[error("invalid resolution profile: {0}")]
    InvalidProfile(String),

    /// Compositing ran in a worker and failed there, or the worker could
    /// not be reached.
    #[error("{message}")]
    Worker {
        /// The slot that caused the failure, if the worker reported one.
        slot: Option<Slot>,
        /// Description of the failure.
        message: String,
    },
}

impl ComposeError {
    /// The slot that caused the failure, when it is tied to one.
    #[must_use]
    pub const fn slot(&self) -> Option<Slot> {
        match self {
            Self::Decode { slot, .. } => Some(*slot),
            Self::Worker { slot, .. } => *slot,
            Self::Encode(_) | Self::Layout(_) | Self::InvalidProfile(_) => None,
        }
    }
}
