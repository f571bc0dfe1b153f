//! Blocking user-visible alerts.

/// Show a browser `alert()` dialog.
///
/// Silently does nothing outside a browser window.
pub fn alert(message: &str) {
    let Some(window) = web_sys::window() else {
        tracing::warn!(message, "no window for alert");
        return;
    };
    if let Err(e) = window.alert_with_message(message) {
        tracing::warn!(error = ?e, "alert failed");
    }
}
