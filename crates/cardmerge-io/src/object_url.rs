//! Owned Blob object URLs.
//!
//! An [`ObjectUrl`] wraps a URL created with `URL.createObjectURL` and
//! revokes it when dropped, so a slot that is replaced or torn down never
//! leaks its preview URL.
//!
//! Requires a browser environment (`wasm32-unknown-unknown` target).

use cardmerge_core::DisplayHandle;
use wasm_bindgen::JsValue;
use web_sys::BlobPropertyBag;

/// Errors that can occur when creating an object URL.
#[derive(Debug, thiserror::Error)]
pub enum ObjectUrlError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for ObjectUrlError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// A live object URL, revoked on drop.
#[derive(Debug, PartialEq, Eq)]
pub struct ObjectUrl {
    url: String,
}

impl ObjectUrl {
    /// Create a Blob from `bytes` with the given MIME type and mint an
    /// object URL for it.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectUrlError::JsError`] if Blob or URL creation fails.
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<Self, ObjectUrlError> {
        let uint8_array = js_sys::Uint8Array::from(bytes);
        let parts = js_sys::Array::new();
        parts.push(&uint8_array);

        let opts = BlobPropertyBag::new();
        opts.set_type(mime_type);
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

        let url = web_sys::Url::create_object_url_with_blob(&blob)?;
        Ok(Self { url })
    }

    /// The `blob:` URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl DisplayHandle for ObjectUrl {
    fn src(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        // Best-effort: the URL may already be gone with its document.
        let _ = web_sys::Url::revoke_object_url(&self.url);
        tracing::trace!(url = %self.url, "revoked object URL");
    }
}
