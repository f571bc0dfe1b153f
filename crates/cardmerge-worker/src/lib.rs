//! Web worker entry point for cardmerge compositing.
//!
//! This crate compiles to a standalone WASM module that runs inside a
//! `Worker`.  It receives both source files and a JSON
//! [`ComposeOrder`] via `postMessage`, runs the compositor and posts a
//! [`ComposeReply`](cardmerge_core::ComposeReply) back.
//!
//! The source files and the encoded PNG cross as raw `Uint8Array`
//! buffers; only the order and reply are JSON.
//!
//! Decoding and resampling a phone photo takes long enough to freeze a
//! page, so the app runs it here instead of on the main thread.

use cardmerge_core::ComposeOrder;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{DedicatedWorkerGlobalScope, MessageEvent};

/// Message protocol: the main thread sends a JS object with:
/// - `front`, `back`: `Uint8Array` source file bytes
/// - `orderJson`: `String` JSON-serialized [`ComposeOrder`]
///
/// The worker answers with:
/// - `replyJson`: `String` JSON-serialized `ComposeReply`
/// - `png`: `Uint8Array`, present only when the reply is a success
///
/// A message it cannot read at all is answered with a single `error`
/// string instead.
///
/// # Worker entry point
///
/// Called automatically when the WASM module is instantiated in the
/// worker context.
#[wasm_bindgen(start)]
pub fn worker_main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let global: DedicatedWorkerGlobalScope = js_sys::global().dyn_into()?;
    let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
        handle_message(&event);
    });
    global.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget(); // lives for the worker lifetime
    Ok(())
}

fn handle_message(event: &MessageEvent) {
    let data = event.data();
    let response = match read_message(&data) {
        Ok((order, front, back)) => {
            // Blocks this worker thread only.
            let (reply, png) = order.execute(&front, &back);
            serde_json::to_string(&reply)
                .map_err(|e| format!("failed to serialize reply: {e}"))
                .and_then(|json| reply_object(&json, png.as_deref()))
        }
        Err(msg) => Err(msg),
    };

    let response = response.unwrap_or_else(|msg| error_object(&msg));
    if let Ok(global) = js_sys::global().dyn_into::<DedicatedWorkerGlobalScope>() {
        let _ = global.post_message(&response);
    }
}

/// Pull the order and both source buffers out of a request.
fn read_message(data: &JsValue) -> Result<(ComposeOrder, Vec<u8>, Vec<u8>), String> {
    let order_json = field(data, "orderJson")?
        .as_string()
        .ok_or("orderJson is not a string")?;
    let order = serde_json::from_str(&order_json)
        .map_err(|e| format!("failed to parse order: {e}"))?;
    Ok((order, bytes_field(data, "front")?, bytes_field(data, "back")?))
}

fn field(data: &JsValue, name: &str) -> Result<JsValue, String> {
    js_sys::Reflect::get(data, &JsValue::from_str(name))
        .map_err(|_| format!("missing {name} field"))
}

fn bytes_field(data: &JsValue, name: &str) -> Result<Vec<u8>, String> {
    let array: js_sys::Uint8Array = field(data, name)?
        .dyn_into()
        .map_err(|_| format!("{name} is not a Uint8Array"))?;
    Ok(array.to_vec())
}

fn reply_object(reply_json: &str, png: Option<&[u8]>) -> Result<JsValue, String> {
    let response = js_sys::Object::new();
    let set = |key: &str, val: &JsValue| {
        js_sys::Reflect::set(&response, &JsValue::from_str(key), val)
            .map(drop)
            .map_err(|_| format!("failed to set {key}"))
    };
    set("replyJson", &JsValue::from_str(reply_json))?;
    if let Some(png) = png {
        set("png", &js_sys::Uint8Array::from(png))?;
    }
    Ok(response.into())
}

fn error_object(message: &str) -> JsValue {
    let response = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &response,
        &JsValue::from_str("error"),
        &JsValue::from_str(message),
    );
    response.into()
}
