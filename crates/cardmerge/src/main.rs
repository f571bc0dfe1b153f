use cardmerge_core::{
    ComposeConfig, ComposeRequest, PhoneNumber, PreviewUpdate, Session, Slot, SourceFile,
};
use std::rc::Rc;

use cardmerge_io::{
    CombinedPreview, Compositor, ExportPanel, ObjectUrl, PhoneNumberForm, SidePreview, SlotUpload,
    download, notify,
};
use dioxus::prelude::*;

/// wasm-bindgen JS glue for the compositing worker, built by build.rs.
const WORKER_JS: &str = include_str!(env!("WORKER_JS_PATH"));
/// Compositing worker WASM binary; empty when none was built.
const WORKER_WASM: &[u8] = include_bytes!(env!("WORKER_WASM_PATH"));

/// Alert text when the downloadable image cannot be produced.
const EXPORT_FAILED: &str = "Error generating image. Please try again.";

fn main() {
    dioxus::launch(app);
}

/// Root application component.
///
/// Owns the upload [`Session`] in a signal and wires together the
/// pickers, side previews, combined preview, and download panel.
#[allow(clippy::too_many_lines)]
fn app() -> Element {
    // --- Application state ---
    let mut session = use_signal(|| Session::<ObjectUrl>::new(ComposeConfig::default()));
    let mut composing = use_signal(|| false);
    let mut preview_error = use_signal(|| Option::<String>::None);
    let mut exporting = use_signal(|| false);

    // Separate workers so a new upload never cancels a running export.
    let preview_compositor = use_signal(|| Rc::new(Compositor::start(WORKER_JS, WORKER_WASM)));
    let export_compositor = use_signal(|| Rc::new(Compositor::start(WORKER_JS, WORKER_WASM)));

    // Revoke the slot object URLs when the page goes away.
    use_drop(move || {
        if let Ok(mut state) = session.try_write() {
            state.clear();
        }
    });

    // --- Upload handler ---
    // Every accepted upload replaces its slot; once both slots are
    // filled the session hands back a preview request to run.
    let mut select_image = move |slot: Slot, file: SourceFile| {
        let display = match ObjectUrl::from_bytes(file.bytes(), file.mime_type()) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(%slot, error = %e, "could not create preview URL");
                preview_error.set(Some(format!("Could not show {slot} image: {e}")));
                return;
            }
        };
        let Some(request) = session.write().select_image(slot, file, display) else {
            return;
        };
        composing.set(true);
        spawn(run_preview(
            preview_compositor(),
            request,
            session,
            composing,
            preview_error,
        ));
    };

    // --- Export handler ---
    let on_export = move |()| {
        let Some(request) = session.read().export_request() else {
            return;
        };
        exporting.set(true);
        let compositor = export_compositor();
        spawn(async move {
            let outcome = compositor.run(&request).await;
            let export = session.read().finish_export(outcome);
            match export {
                Ok(file) => {
                    if let Err(e) = download::save_export(&file) {
                        tracing::error!(error = %e, "download failed");
                        notify::alert(EXPORT_FAILED);
                    }
                }
                // Already logged by the session.
                Err(_) => notify::alert(EXPORT_FAILED),
            }

            exporting.set(false);
        });
    };

    // --- Form stub ---
    let on_submit = move |()| {
        let submission = session.read().submission();
        match serde_json::to_string(&submission) {
            Ok(json) => tracing::info!(form = %json, "form submitted"),
            Err(e) => tracing::warn!(error = %e, "could not serialize form state"),
        }
    };

    let on_phone_change = move |value: PhoneNumber| {
        session.write().set_phone_number(value);
    };

    // --- Snapshot for rendering ---
    let state = session.read();
    let front_src = state.display_src(Slot::Front).map(str::to_owned);
    let back_src = state.display_src(Slot::Back).map(str::to_owned);
    let front_name = state.file_name(Slot::Front).map(str::to_owned);
    let back_name = state.file_name(Slot::Back).map(str::to_owned);
    let preview = state.preview();
    let ready = state.has_both();
    let limits = state.config().limits;
    let phone_number = state.phone_number();
    drop(state);

    // --- Layout ---
    rsx! {
        style { dangerous_inner_html: include_str!("../assets/theme.css") }

        div { class: "page",
            div { class: "container",
                h1 { class: "title", "Make Aadhaar (Cards)" }

                div { class: "notice",
                    h2 { class: "notice__title", "Notice" }
                    p {
                        "Images never leave your browser. The front and back are merged "
                        "locally into a single PNG."
                    }
                }

                div { class: "grid-2",
                    // Left: form
                    div { class: "card",
                        h2 { class: "card__title", "Make Aadhaar (Cards)" }
                        p { class: "muted",
                            "Choose the front and back images of the card to generate the combined image."
                        }
                        PhoneNumberForm {
                            value: phone_number,
                            on_change: on_phone_change,
                            on_submit: on_submit,
                            SlotUpload {
                                slot: Slot::Front,
                                selected: front_name,
                                limits: limits,
                                on_select: move |file: SourceFile| select_image(Slot::Front, file),
                            }
                            SlotUpload {
                                slot: Slot::Back,
                                selected: back_name,
                                limits: limits,
                                on_select: move |file: SourceFile| select_image(Slot::Back, file),
                            }
                        }
                    }

                    // Right: individual sides
                    div { class: "card",
                        h2 { class: "card__title", "Aadhaar Card Preview" }
                        p { class: "muted", "Both sides will be displayed together" }
                        div { class: "grid-2 preview-well",
                            SidePreview { slot: Slot::Front, src: front_src }
                            SidePreview { slot: Slot::Back, src: back_src }
                        }
                    }
                }

                // Combined preview + download
                div { class: "card",
                    h2 { class: "card__title", "Combined Preview" }
                    p { class: "muted", "Front and back combined in single page" }
                    div { class: "preview-well",
                        CombinedPreview {
                            preview: preview,
                            composing: composing(),
                            error: preview_error(),
                        }
                    }
                    ExportPanel {
                        ready: ready,
                        busy: exporting(),
                        on_export: on_export,
                    }
                }
            }
        }
    }
}

/// Run one preview request and apply its result.
///
/// A newer upload cancels this run in the worker; the session then
/// discards it as stale.
async fn run_preview(
    compositor: Rc<Compositor>,
    request: ComposeRequest,
    mut session: Signal<Session<ObjectUrl>>,
    mut composing: Signal<bool>,
    mut preview_error: Signal<Option<String>>,
) {
    let outcome = compositor.run(&request).await;
    let update = session.write().finish_preview(request.token(), outcome);
    match update {
        PreviewUpdate::Applied => {
            preview_error.set(None);
            composing.set(false);
        }
        PreviewUpdate::Failed(e) => {
            // Keep the previous preview visible if one exists.
            preview_error.set(Some(format!("Could not generate preview: {e}")));
            composing.set(false);
        }
        // A newer request owns the composing flag.
        PreviewUpdate::Stale => {}
    }
}
