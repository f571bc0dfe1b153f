//! Resolution profiles, input limits, and the top-level compose config.
//!
//! A [`ResolutionProfile`] is the named set of layout constants used by
//! the compositor: target height, gutter width, divider, background and
//! resampling filter.  Two presets exist: [`ResolutionProfile::preview`]
//! for the on-page combined preview and [`ResolutionProfile::export`]
//! for the downloadable file.

use serde::{Deserialize, Serialize};

use crate::types::ComposeError;

/// Which of the two configured profiles a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileKind {
    /// Low-resolution on-page preview.
    Preview,
    /// High-resolution downloadable image.
    Export,
}

/// Resampling filter used when scaling sources into their boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation.
    Triangle,
    /// Bicubic Catmull-Rom.
    #[default]
    CatmullRom,
    /// Gaussian (smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl ResizeFilter {
    /// The matching `image` crate filter.
    #[must_use]
    pub const fn to_filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// A vertical line drawn in the middle of the gutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividerStyle {
    /// Line width in pixels.
    pub width: u32,
    /// Line color as RGB.
    pub color: [u8; 3],
}

/// Layout constants for one output resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionProfile {
    /// Height every source is scaled to, and the canvas height.
    pub target_height: u32,
    /// Horizontal gap between the front and back boxes.
    pub gutter: u32,
    /// Optional divider centred in the gutter.
    pub divider: Option<DividerStyle>,
    /// Canvas fill color as RGB.
    pub background: [u8; 3],
    /// Filter used to scale sources.
    #[serde(default)]
    pub filter: ResizeFilter,
}

impl ResolutionProfile {
    /// Preview canvas height.
    pub const PREVIEW_HEIGHT: u32 = 600;
    /// Preview gutter width.
    pub const PREVIEW_GUTTER: u32 = 20;
    /// Export canvas height.
    pub const EXPORT_HEIGHT: u32 = 2400;
    /// Divider line width for the preview.
    pub const DIVIDER_WIDTH: u32 = 2;
    /// Light gray divider (`#E5E7EB`).
    pub const DIVIDER_COLOR: [u8; 3] = [0xE5, 0xE7, 0xEB];
    /// White background.
    pub const BACKGROUND: [u8; 3] = [0xFF, 0xFF, 0xFF];

    /// The on-page preview profile: 600 high, 20 gutter, gray divider.
    #[must_use]
    pub const fn preview() -> Self {
        Self {
            target_height: Self::PREVIEW_HEIGHT,
            gutter: Self::PREVIEW_GUTTER,
            divider: Some(DividerStyle {
                width: Self::DIVIDER_WIDTH,
                color: Self::DIVIDER_COLOR,
            }),
            background: Self::BACKGROUND,
            filter: ResizeFilter::CatmullRom,
        }
    }

    /// The download profile: 2400 high, no gutter, no divider.
    #[must_use]
    pub const fn export() -> Self {
        Self {
            target_height: Self::EXPORT_HEIGHT,
            gutter: 0,
            divider: None,
            background: Self::BACKGROUND,
            filter: ResizeFilter::CatmullRom,
        }
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidProfile`] if the target height is
    /// zero, or a divider is wider than the gutter or has zero width.
    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.target_height == 0 {
            return Err(ComposeError::InvalidProfile(
                "target height must be positive".into(),
            ));
        }
        if let Some(divider) = self.divider {
            if divider.width == 0 {
                return Err(ComposeError::InvalidProfile(
                    "divider width must be positive".into(),
                ));
            }
            if divider.width > self.gutter {
                return Err(ComposeError::InvalidProfile(format!(
                    "divider width {} does not fit in gutter {}",
                    divider.width, self.gutter
                )));
            }
        }
        Ok(())
    }
}

/// Input and output size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum accepted upload size in bytes.
    pub max_file_bytes: usize,
    /// Maximum accepted source width or height in pixels.
    pub max_source_dimension: u32,
    /// Maximum composite canvas width or height in pixels.
    pub max_canvas_dimension: u32,
}

impl Limits {
    /// Default upload size limit (25 MiB).
    pub const DEFAULT_MAX_FILE_BYTES: usize = 25 * 1024 * 1024;
    /// Default source side limit.
    pub const DEFAULT_MAX_SOURCE_DIMENSION: u32 = 16_384;
    /// Default canvas side limit, matching common browser canvas caps.
    pub const DEFAULT_MAX_CANVAS_DIMENSION: u32 = 32_767;
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_bytes: Self::DEFAULT_MAX_FILE_BYTES,
            max_source_dimension: Self::DEFAULT_MAX_SOURCE_DIMENSION,
            max_canvas_dimension: Self::DEFAULT_MAX_CANVAS_DIMENSION,
        }
    }
}

/// Full configuration for the upload page and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Profile used for the automatic on-page preview.
    pub preview: ResolutionProfile,
    /// Profile used for the downloadable image.
    pub export: ResolutionProfile,
    /// Input/output size limits.
    #[serde(default)]
    pub limits: Limits,
    /// File name offered for the download.
    pub export_file_name: String,
}

impl ComposeConfig {
    /// Fixed name of the downloaded composite.
    pub const DEFAULT_EXPORT_FILE_NAME: &'static str = "aadhaar-card.png";

    /// The profile for a given kind.
    #[must_use]
    pub const fn profile(&self, kind: ProfileKind) -> &ResolutionProfile {
        match kind {
            ProfileKind::Preview => &self.preview,
            ProfileKind::Export => &self.export,
        }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            preview: ResolutionProfile::preview(),
            export: ResolutionProfile::export(),
            limits: Limits::default(),
            export_file_name: Self::DEFAULT_EXPORT_FILE_NAME.to_owned(),
        }
    }
}
