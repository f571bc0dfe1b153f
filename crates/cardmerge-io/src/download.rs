//! Saving a finished export to the user's disk.
//!
//! Dioxus offers no save-file call, so the PNG is wrapped in an
//! [`ObjectUrl`] and a detached `<a download>` element is clicked.
//! Requires a browser environment.

use cardmerge_core::ExportFile;
use cardmerge_core::encode::PNG_MIME;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlAnchorElement};

use crate::object_url::{ObjectUrl, ObjectUrlError};

/// Errors that can occur while offering a file for download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// No window, document or body to attach the link to.
    #[error("no {0} available")]
    MissingDom(&'static str),

    /// A DOM call failed.
    #[error("browser API error: {0}")]
    JsError(String),

    /// The Blob URL for the payload could not be created.
    #[error(transparent)]
    ObjectUrl(#[from] ObjectUrlError),
}

impl From<JsValue> for DownloadError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// Offer `export` to the user as a PNG download under its file name.
///
/// # Errors
///
/// Returns [`DownloadError`] if the Blob URL or the link cannot be
/// created.
pub fn save_export(export: &ExportFile) -> Result<(), DownloadError> {
    let png = export.image.png();
    // Revoked when this scope ends; the click has already been dispatched.
    let url = ObjectUrl::from_bytes(png, PNG_MIME)?;
    follow_link(url.as_str(), &export.file_name)?;
    tracing::info!(
        file_name = %export.file_name,
        bytes = png.len(),
        canvas = %export.image.dimensions(),
        "download started"
    );
    Ok(())
}

/// Navigate a temporary download link to `href`, saving as `file_name`.
///
/// # Errors
///
/// Returns [`DownloadError`] if the DOM is unavailable or rejects the
/// element.
pub fn follow_link(href: &str, file_name: &str) -> Result<(), DownloadError> {
    let document = document()?;
    let body = document.body().ok_or(DownloadError::MissingDom("document body"))?;

    let link: HtmlAnchorElement = document.create_element("a")?.unchecked_into();
    link.set_href(href);
    link.set_download(file_name);

    body.append_child(&link)?;
    link.click();
    if let Err(e) = body.remove_child(&link) {
        tracing::debug!(error = ?e, "could not detach download link");
    }
    Ok(())
}

fn document() -> Result<Document, DownloadError> {
    web_sys::window()
        .ok_or(DownloadError::MissingDom("window"))?
        .document()
        .ok_or(DownloadError::MissingDom("document"))
}
