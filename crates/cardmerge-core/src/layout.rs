//! Box and canvas geometry for a side-by-side composite.
//!
//! Both boxes are derived from the FRONT image's aspect ratio.  The back
//! image is stretched into its box regardless of its own ratio.
//!
//! The two boxes together span `floor(2 * target_height * w / h)` pixels,
//! the width the fractional pair truncates to.  The front box takes the
//! rounded exact width and the back box the remainder, so the two differ
//! by at most one column.

use serde::{Deserialize, Serialize};

use crate::config::{DividerStyle, Limits, ResolutionProfile};
use crate::types::{ComposeError, Dimensions};

/// Placement of everything drawn on the composite canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Box the front image is scaled into.
    pub front_box: Dimensions,
    /// Box the back image is scaled into.
    pub back_box: Dimensions,
    /// Gap between the boxes.
    pub gutter: u32,
    /// Divider rectangle, if the profile draws one.
    pub divider: Option<DividerPlacement>,
}

/// Pixel columns covered by the divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividerPlacement {
    /// First covered column.
    pub x: u32,
    /// Number of covered columns.
    pub width: u32,
    /// Line color as RGB.
    pub color: [u8; 3],
}

impl Layout {
    /// Compute the layout for a front image of the given size.
    ///
    /// With `exact = target_height * front.width / front.height`, the
    /// front box is `round(exact)` wide and both boxes together are
    /// `floor(2 * exact)` wide.  Each box is at least one pixel.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidProfile`] if the profile is
    /// inconsistent, or [`ComposeError::Layout`] if the front image has a
    /// zero dimension or the canvas would exceed
    /// `limits.max_canvas_dimension`.
    pub fn for_front(
        front: Dimensions,
        profile: &ResolutionProfile,
        limits: &Limits,
    ) -> Result<Self, ComposeError> {
        profile.validate()?;
        if front.width == 0 || front.height == 0 {
            return Err(ComposeError::Layout(format!(
                "front image has zero dimension ({front})"
            )));
        }

        let box_height = profile.target_height;
        let scaled = u64::from(box_height) * u64::from(front.width);
        let height = u64::from(front.height);

        let pair_width = (2 * scaled / height).max(2);
        let front_width = ((2 * scaled + height) / (2 * height)).clamp(1, pair_width - 1);
        let canvas_width = pair_width + u64::from(profile.gutter);

        let max = limits.max_canvas_dimension;
        let too_large = || {
            ComposeError::Layout(format!(
                "canvas {canvas_width}x{box_height} exceeds the {max} pixel limit"
            ))
        };
        if box_height > max || canvas_width > u64::from(max) {
            return Err(too_large());
        }
        let pair_width = u32::try_from(pair_width).map_err(|_| too_large())?;
        let front_width = u32::try_from(front_width).map_err(|_| too_large())?;

        Ok(Self {
            front_box: Dimensions::new(front_width, box_height),
            back_box: Dimensions::new(pair_width - front_width, box_height),
            gutter: profile.gutter,
            divider: profile
                .divider
                .map(|style| place_divider(front_width, profile.gutter, style)),
        })
    }

    /// Total canvas size: both boxes plus the gutter.
    #[must_use]
    pub const fn canvas(&self) -> Dimensions {
        Dimensions::new(
            self.front_box.width + self.gutter + self.back_box.width,
            self.front_box.height,
        )
    }

    /// Top-left corner of the front box.
    #[must_use]
    pub const fn front_origin(&self) -> (u32, u32) {
        (0, 0)
    }

    /// Top-left corner of the back box.
    #[must_use]
    pub const fn back_origin(&self) -> (u32, u32) {
        (self.front_box.width + self.gutter, 0)
    }
}

/// A line of width `w` centred on `front_width + gutter / 2` covers the
/// columns starting at `centre - w / 2`.
const fn place_divider(front_width: u32, gutter: u32, style: DividerStyle) -> DividerPlacement {
    let centre = front_width + gutter / 2;
    DividerPlacement {
        x: centre.saturating_sub(style.width / 2),
        width: style.width,
        color: style.color,
    }
}
