//! cardmerge-core: side-by-side document image compositor (sans-IO).
//!
//! Takes the front and back images of an identity card, scales both to
//! a common height using the front image's aspect ratio, draws them side
//! by side on a white canvas and encodes the result as a PNG.
//!
//! The [`session`] module holds the upload state that decides when a
//! composite should be (re)computed, and [`remote`] is the message format
//! for running a composite in a web worker.  This crate has **no I/O
//! dependencies**: browser and filesystem interaction lives in
//! `cardmerge-io` and `cardmerge-cli`.

pub mod composite;
pub mod config;
pub mod decode;
pub mod encode;
pub mod layout;
pub mod remote;
pub mod session;
pub mod types;

pub use config::{ComposeConfig, DividerStyle, Limits, ProfileKind, ResizeFilter, ResolutionProfile};
pub use decode::SourceFile;
pub use encode::CompositeImage;
pub use layout::Layout;
pub use remote::{ComposeOrder, ComposeReply, ErrorReport};
pub use session::{
    ComposeRequest, DisplayHandle, ExportFile, FormSubmission, PhoneNumber, PreviewUpdate,
    RenderedPreview, Session,
};
pub use types::{ComposeError, DecodeError, Dimensions, EncodeError, Slot};

use tracing::debug;

/// Composite two encoded images side by side.
///
/// # Steps
///
/// 1. Decode both sources (concurrently on native targets)
/// 2. Size both boxes from the front image's aspect ratio
/// 3. Fill the background and draw front then back
/// 4. Draw the divider, if the profile has one
/// 5. Encode as lossless PNG
///
/// # Errors
///
/// Returns [`ComposeError::InvalidProfile`] for an inconsistent profile,
/// [`ComposeError::Decode`] naming the slot whose image failed,
/// [`ComposeError::Layout`] if the canvas would exceed the limits, and
/// [`ComposeError::Encode`] if PNG encoding fails.  No partial output is
/// produced on any failure.
pub fn compose(
    front: &[u8],
    back: &[u8],
    profile: &ResolutionProfile,
    limits: &Limits,
) -> Result<CompositeImage, ComposeError> {
    profile.validate()?;
    let started = web_time::Instant::now();

    // 1. Decode both, all-or-nothing.
    let (front_img, back_img) = decode::decode_pair(front, back, limits)?;

    // 2. Front-derived geometry.
    let (width, height) = front_img.dimensions();
    let layout = Layout::for_front(Dimensions::new(width, height), profile, limits)?;

    // 3 + 4. Draw.
    let canvas = composite::draw(
        &front_img,
        &back_img,
        &layout,
        profile.background,
        profile.filter,
    );

    // 5. Encode.
    let image = encode::encode_png(canvas, layout)?;

    debug!(
        canvas = %image.dimensions(),
        bytes = image.png().len(),
        elapsed_ms = started.elapsed().as_millis(),
        "composite encoded"
    );
    Ok(image)
}
