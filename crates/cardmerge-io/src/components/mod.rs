//! Dioxus UI components for cardmerge.
//!
//! Provides the per-side upload pickers, the front/back preview tiles,
//! the combined preview, the download panel, and the phone-number form.

mod combined;
mod export;
mod form;
mod side_preview;
mod upload;

pub use combined::CombinedPreview;
pub use export::ExportPanel;
pub use form::PhoneNumberForm;
pub use side_preview::SidePreview;
pub use upload::SlotUpload;
