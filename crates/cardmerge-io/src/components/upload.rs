//! Per-side file picker with drag-and-drop.

use cardmerge_core::{Limits, Slot, SourceFile};
use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::LdUpload;

/// Props for the [`SlotUpload`] component.
#[derive(Props, Clone, PartialEq)]
pub struct SlotUploadProps {
    /// Which side this picker fills.
    slot: Slot,
    /// Name of the currently selected file, shown on the button.
    selected: Option<String>,
    /// Limits applied when inspecting the upload.
    limits: Limits,
    /// Called with the inspected file after a successful upload.
    on_select: EventHandler<SourceFile>,
}

/// Picker label when nothing is selected yet.
const fn prompt(slot: Slot) -> &'static str {
    match slot {
        Slot::Front => "Choose Front Page Image",
        Slot::Back => "Choose Back Page Image",
    }
}

/// A dashed drop zone that doubles as the file picker for one side.
///
/// The content is sniffed and size-checked before `on_select` fires;
/// rejected files leave the previous selection in place and show the
/// reason under the picker.
#[component]
pub fn SlotUpload(props: SlotUploadProps) -> Element {
    let mut dragging = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);
    let slot = props.slot;
    let limits = props.limits;

    // Shared by the picker and drop paths.
    let process_files = move |files: Vec<FileData>| async move {
        let Some(file) = files.first() else {
            return;
        };
        let name = file.name();
        let bytes = match file.read_bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error.set(Some(format!("Failed to read file: {e}")));
                return;
            }
        };
        match SourceFile::inspect(name, bytes.to_vec(), &limits) {
            Ok(source) => {
                error.set(None);
                props.on_select.call(source);
            }
            Err(e) => {
                tracing::warn!(%slot, error = %e, "upload rejected");
                error.set(Some(format!("{e}")));
            }
        }
    };

    let handle_files = move |evt: FormEvent| async move {
        process_files(evt.files()).await;
    };

    let handle_drop = move |evt: DragEvent| async move {
        evt.prevent_default();
        dragging.set(false);
        process_files(evt.files()).await;
    };

    let input_id = format!("{slot}-upload");
    let zone_class = if dragging() {
        "upload-zone upload-zone--active"
    } else {
        "upload-zone"
    };
    let label = props.selected.clone().unwrap_or_else(|| prompt(slot).to_owned());

    rsx! {
        div {
            ondragover: move |evt| {
                evt.prevent_default();
                dragging.set(true);
            },
            ondragleave: move |_| {
                dragging.set(false);
            },
            ondrop: handle_drop,

            input {
                r#type: "file",
                id: "{input_id}",
                accept: "image/*",
                class: "hidden",
                onchange: handle_files,
            }
            label { r#for: "{input_id}", class: "{zone_class}",
                Icon { width: 20, height: 20, icon: LdUpload }
                span { "{label}" }
            }

            if let Some(ref err) = error() {
                p { class: "text-error", "{err}" }
            }
        }
    }
}
