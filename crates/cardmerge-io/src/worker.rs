//! Off-main-thread compositing.
//!
//! [`ComposeWorker`] wraps a `web_sys::Worker` running the
//! `cardmerge-worker` WASM module.  It posts both source files and the
//! request's [`ComposeOrder`](cardmerge_core::ComposeOrder) and awaits
//! the [`ComposeReply`] without blocking the page.
//!
//! The worker is created from embedded JS + WASM blobs, so no extra
//! static files need to be served.  [`Compositor`] falls back to the
//! main thread when no worker could be started.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cardmerge_core::{ComposeError, ComposeReply, ComposeRequest, CompositeImage};
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{ErrorEvent, MessageEvent, Worker};

use crate::object_url::ObjectUrl;

/// Errors talking to the compositing worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The app was built without the worker module.
    #[error("worker module is not bundled")]
    NotBundled,

    /// A browser API call failed.
    #[error("browser API error: {0}")]
    JsError(String),

    /// The run was superseded before the worker answered.
    #[error("compositing was cancelled")]
    Cancelled,

    /// The worker could not read the request.
    #[error("worker rejected the request: {0}")]
    Rejected(String),

    /// The worker's answer could not be read.
    #[error("malformed worker reply: {0}")]
    Malformed(String),

    /// The answer belongs to a different request.
    #[error("worker answered token {actual}, expected {expected}")]
    TokenMismatch {
        /// Token of the request that was sent.
        expected: u64,
        /// Token carried by the reply.
        actual: u64,
    },
}

impl From<JsValue> for WorkerError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

impl From<WorkerError> for ComposeError {
    fn from(error: WorkerError) -> Self {
        Self::Worker {
            slot: None,
            message: error.to_string(),
        }
    }
}

/// A running worker and the blob URL its WASM loads from.
struct Instance {
    worker: Worker,
    _wasm_url: ObjectUrl,
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.worker.terminate();
    }
}

/// The reject function of the run currently awaiting the worker.
struct Pending {
    run: u64,
    reject: js_sys::Function,
}

/// A compositor running in a dedicated web worker.
///
/// Holds one request at a time.  Starting a run while another is in
/// flight terminates the worker, fails the older run with
/// [`WorkerError::Cancelled`] and starts a fresh worker.
pub struct ComposeWorker {
    script: &'static str,
    wasm: &'static [u8],
    inner: RefCell<Instance>,
    pending: RefCell<Option<Pending>>,
    runs: Cell<u64>,
}

impl ComposeWorker {
    /// Start a worker from the embedded JS glue and WASM binary.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::NotBundled`] when `wasm` is empty, or
    /// [`WorkerError::JsError`] if the browser refuses to create the
    /// worker.
    pub fn new(script: &'static str, wasm: &'static [u8]) -> Result<Self, WorkerError> {
        if wasm.is_empty() {
            return Err(WorkerError::NotBundled);
        }
        Ok(Self {
            script,
            wasm,
            inner: RefCell::new(spawn_instance(script, wasm)?),
            pending: RefCell::new(None),
            runs: Cell::new(0),
        })
    }

    /// Composite `request` in the worker.
    ///
    /// The reply must carry the request's token; anything else is an
    /// error rather than a result.
    ///
    /// # Errors
    ///
    /// Returns the compositor's [`ComposeError`] as reported by the
    /// worker, or a [`ComposeError::Worker`] if the run was cancelled or
    /// the worker failed.
    #[allow(clippy::future_not_send)] // WASM is single-threaded
    pub async fn run(&self, request: &ComposeRequest) -> Result<CompositeImage, ComposeError> {
        if self.pending.borrow().is_some() {
            self.cancel()?;
        }

        let order_json = serde_json::to_string(&request.order())
            .map_err(|e| WorkerError::Malformed(format!("failed to serialize order: {e}")))?;
        let message = js_sys::Object::new();
        let front = js_sys::Uint8Array::from(request.front().bytes());
        let back = js_sys::Uint8Array::from(request.back().bytes());
        js_sys::Reflect::set(&message, &JsValue::from_str("front"), &front)
            .map_err(WorkerError::from)?;
        js_sys::Reflect::set(&message, &JsValue::from_str("back"), &back)
            .map_err(WorkerError::from)?;
        js_sys::Reflect::set(
            &message,
            &JsValue::from_str("orderJson"),
            &JsValue::from_str(&order_json),
        )
        .map_err(WorkerError::from)?;

        let (promise, resolve, reject) = new_promise()?;
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let _ = resolve.call1(&JsValue::NULL, &event.data());
        });
        let reject_on_error = reject.clone();
        let onerror = Closure::<dyn FnMut(ErrorEvent)>::new(move |event: ErrorEvent| {
            let _ = reject_on_error.call1(&JsValue::NULL, &JsValue::from_str(&event.message()));
        });

        // Our own handle: a cancel may swap `inner` while we wait.
        let worker = self.inner.borrow().worker.clone();
        worker.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        worker.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        worker.post_message(&message).map_err(WorkerError::from)?;

        let run = self.runs.get() + 1;
        self.runs.set(run);
        *self.pending.borrow_mut() = Some(Pending { run, reject });
        info!(
            kind = ?request.kind(),
            token = request.token(),
            front = request.front().name(),
            back = request.back().name(),
            "composing in worker"
        );

        let outcome = wasm_bindgen_futures::JsFuture::from(promise).await;

        worker.set_onmessage(None);
        worker.set_onerror(None);
        drop((onmessage, onerror));
        {
            let mut pending = self.pending.borrow_mut();
            if pending.as_ref().is_some_and(|p| p.run == run) {
                *pending = None;
            }
        }

        let data = outcome.map_err(|e| {
            e.as_string()
                .map_or(WorkerError::Cancelled, WorkerError::Rejected)
        })?;
        let text = |key: &str| {
            js_sys::Reflect::get(&data, &JsValue::from_str(key))
                .ok()
                .and_then(|v| v.as_string())
        };
        let png = js_sys::Reflect::get(&data, &JsValue::from_str("png"))
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Uint8Array>().ok())
            .map(|array| array.to_vec());
        read_reply(text("error"), text("replyJson"), png, request.token())
    }

    /// Stop any run in progress and start a fresh worker.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::JsError`] if the replacement worker cannot
    /// be created.
    pub fn cancel(&self) -> Result<(), WorkerError> {
        if let Some(pending) = self.pending.borrow_mut().take() {
            debug!(run = pending.run, "cancelling worker run");
            let _ = pending.reject.call0(&JsValue::NULL);
        }
        let fresh = spawn_instance(self.script, self.wasm)?;
        // Dropping the old instance terminates it.
        drop(self.inner.replace(fresh));
        Ok(())
    }
}

/// Turn the fields of a worker response into a composite.
///
/// `error` is set only when the worker could not read the request.
fn read_reply(
    error: Option<String>,
    reply_json: Option<String>,
    png: Option<Vec<u8>>,
    token: u64,
) -> Result<CompositeImage, ComposeError> {
    if let Some(message) = error {
        return Err(WorkerError::Rejected(message).into());
    }
    let json = reply_json.ok_or_else(|| WorkerError::Malformed("missing replyJson".into()))?;
    let reply: ComposeReply =
        serde_json::from_str(&json).map_err(|e| WorkerError::Malformed(e.to_string()))?;
    if reply.token != token {
        return Err(WorkerError::TokenMismatch {
            expected: token,
            actual: reply.token,
        }
        .into());
    }
    reply.into_result(png)
}

/// Runs compositing requests in a worker when one is available, and on
/// the main thread otherwise.
pub struct Compositor {
    worker: Option<ComposeWorker>,
}

impl Compositor {
    /// Try to start a worker; fall back to the main thread if that
    /// fails.
    #[must_use]
    pub fn start(script: &'static str, wasm: &'static [u8]) -> Self {
        let worker = match ComposeWorker::new(script, wasm) {
            Ok(worker) => Some(worker),
            Err(e) => {
                warn!(error = %e, "compositing on the main thread");
                None
            }
        };
        Self { worker }
    }

    /// Whether requests go to a worker.
    #[must_use]
    pub const fn in_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Composite `request`.
    ///
    /// # Errors
    ///
    /// See [`ComposeWorker::run`] and [`ComposeRequest::run`].
    #[allow(clippy::future_not_send)] // WASM is single-threaded
    pub async fn run(&self, request: &ComposeRequest) -> Result<CompositeImage, ComposeError> {
        match &self.worker {
            Some(worker) => worker.run(request).await,
            None => {
                // Let the busy state render before the thread blocks.
                gloo_timers::future::TimeoutFuture::new(0).await;
                request.run()
            }
        }
    }
}

/// Create a worker from embedded JS glue and WASM binary.
///
/// The JS glue is wrapped in a script that initializes the module from
/// a blob URL of the WASM binary.  The script URL is revoked once the
/// worker exists; the WASM URL lives as long as the worker.
fn spawn_instance(script: &str, wasm: &[u8]) -> Result<Instance, WorkerError> {
    let wasm_url = ObjectUrl::from_bytes(wasm, "application/wasm")
        .map_err(|e| WorkerError::JsError(e.to_string()))?;
    let wrapper = format!(
        r#"{script}

wasm_bindgen("{wasm_url}")
    .catch(function(e) {{ console.error("compositing worker failed to start:", e); }});
"#,
        wasm_url = wasm_url.as_str(),
    );
    let script_url = ObjectUrl::from_bytes(wrapper.as_bytes(), "application/javascript")
        .map_err(|e| WorkerError::JsError(e.to_string()))?;
    let worker = Worker::new(script_url.as_str())?;
    Ok(Instance {
        worker,
        _wasm_url: wasm_url,
    })
}

/// Create a JS Promise along with its resolve and reject functions.
fn new_promise() -> Result<(js_sys::Promise, js_sys::Function, js_sys::Function), WorkerError> {
    let captured = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&captured);
    let promise = js_sys::Promise::new(&mut move |resolve, reject| {
        *slot.borrow_mut() = Some((resolve, reject));
    });
    let (resolve, reject) = captured
        .borrow_mut()
        .take()
        .ok_or_else(|| WorkerError::JsError("promise executor did not run".into()))?;
    Ok((promise, resolve, reject))
}
