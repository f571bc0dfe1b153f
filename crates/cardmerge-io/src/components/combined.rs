//! Combined side-by-side preview.

use std::rc::Rc;

use cardmerge_core::RenderedPreview;
use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::LdUpload;

/// Props for the [`CombinedPreview`] component.
#[derive(Props, Clone)]
pub struct CombinedPreviewProps {
    /// The latest applied preview composite.
    /// Wrapped in `Rc` so re-renders compare by pointer, not pixels.
    preview: Option<Rc<RenderedPreview>>,
    /// Whether a preview request is in flight.
    composing: bool,
    /// Message from the last failed preview, if any.
    error: Option<String>,
}

impl PartialEq for CombinedPreviewProps {
    fn eq(&self, other: &Self) -> bool {
        let previews_eq = match (&self.preview, &other.preview) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        previews_eq && self.composing == other.composing && self.error == other.error
    }
}

/// Displays the composite as a data-URL image.
///
/// A failed recomposition keeps the previous image on screen and shows
/// the error underneath.
#[component]
pub fn CombinedPreview(props: CombinedPreviewProps) -> Element {
    rsx! {
        div { class: "combined",
            if let Some(ref preview) = props.preview {
                img {
                    src: preview.data_url().to_owned(),
                    alt: "Combined preview",
                    class: "combined__image",
                }
            } else if props.composing {
                div { class: "placeholder combined__image",
                    span { class: "pulse", "Composing..." }
                }
            } else {
                div { class: "placeholder combined__image",
                    Icon { width: 32, height: 32, icon: LdUpload }
                    span { "Upload both images to see combined preview" }
                }
            }

            if let Some(ref err) = props.error {
                p { class: "text-error", "{err}" }
            }
        }
    }
}
