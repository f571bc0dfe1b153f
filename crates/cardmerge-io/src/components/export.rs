//! Export panel with the download button.

use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::LdDownload;

/// Props for the [`ExportPanel`] component.
#[derive(Props, Clone, PartialEq)]
pub struct ExportPanelProps {
    /// Both sides are selected.
    ready: bool,
    /// An export is being composed.
    busy: bool,
    /// Fired when the user asks for the download.
    on_export: EventHandler<()>,
}

/// Download button, disabled until both sides are selected.
#[component]
pub fn ExportPanel(props: ExportPanelProps) -> Element {
    let enabled = props.ready && !props.busy;
    let class = if enabled {
        "btn btn--primary"
    } else {
        "btn btn--disabled"
    };
    let text = if props.busy {
        "Preparing download..."
    } else {
        "Download Combined Image"
    };

    rsx! {
        div { class: "export-bar",
            button {
                class: "{class}",
                disabled: !enabled,
                onclick: move |_| {
                    if enabled {
                        props.on_export.call(());
                    }
                },
                Icon { width: 20, height: 20, icon: LdDownload }
                span { "{text}" }
            }
        }
    }
}
