//! Individual front/back preview tile.

use cardmerge_core::Slot;
use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::LdUpload;

/// Props for the [`SidePreview`] component.
#[derive(Props, Clone, PartialEq)]
pub struct SidePreviewProps {
    /// Which side is shown.
    slot: Slot,
    /// Object URL of the uploaded image, if any.
    src: Option<String>,
}

/// Shows one uploaded side, or a placeholder until it is chosen.
#[component]
pub fn SidePreview(props: SidePreviewProps) -> Element {
    let (title, placeholder) = match props.slot {
        Slot::Front => ("Front Side", "Upload front side image"),
        Slot::Back => ("Back Side", "Upload back side image"),
    };

    rsx! {
        div { class: "side-tile",
            div { class: "side-tile__title", "{title}" }
            if let Some(ref src) = props.src {
                img {
                    src: "{src}",
                    alt: "{title}",
                    class: "side-tile__image",
                }
            } else {
                div { class: "placeholder side-tile__image",
                    Icon { width: 32, height: 32, icon: LdUpload }
                    span { "{placeholder}" }
                }
            }
        }
    }
}
