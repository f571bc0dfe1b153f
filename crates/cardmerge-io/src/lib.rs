//! cardmerge-io: Browser I/O and Dioxus component library.
//!
//! Handles object-URL lifetimes for uploaded files, Blob downloads,
//! blocking alerts and the compositing web worker, and provides the UI
//! components of the card upload page.

pub mod components;
pub mod download;
pub mod notify;
pub mod object_url;
pub mod worker;

pub use components::{CombinedPreview, ExportPanel, PhoneNumberForm, SidePreview, SlotUpload};
pub use object_url::ObjectUrl;
pub use worker::{ComposeWorker, Compositor};
