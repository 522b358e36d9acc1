//! Browser clipboard implementation.
//!
//! Implements `ClipboardData` over the `DataTransfer` of a clipboard or
//! drag event. Outside of a trusted event the browser keeps the transfer
//! read-only; writes then fail with a `PlatformError`.

use blocks_editor_core::{ClipboardData, PlatformError};
use wasm_bindgen::JsValue;

/// Clipboard context wrapping an event's DataTransfer.
pub struct BrowserClipboard {
    data_transfer: Option<web_sys::DataTransfer>,
}

impl BrowserClipboard {
    /// Create from a ClipboardEvent.
    ///
    /// Call this in your copy/cut/paste event handler.
    pub fn from_event(evt: &web_sys::ClipboardEvent) -> Self {
        Self {
            data_transfer: evt.clipboard_data(),
        }
    }

    /// Create from a DragEvent (drop payloads).
    pub fn from_drag_event(evt: &web_sys::DragEvent) -> Self {
        Self {
            data_transfer: evt.data_transfer(),
        }
    }

    /// Create an empty clipboard context (for testing or non-event contexts).
    pub fn empty() -> Self {
        Self {
            data_transfer: None,
        }
    }

    fn transfer(&self) -> Result<&web_sys::DataTransfer, PlatformError> {
        self.data_transfer
            .as_ref()
            .ok_or_else(|| PlatformError::from("event has no DataTransfer"))
    }
}

pub(crate) fn js_error(err: JsValue) -> PlatformError {
    PlatformError(format!("{err:?}"))
}

impl ClipboardData for BrowserClipboard {
    fn get_data(&self, mime: &str) -> Option<String> {
        let dt = self.data_transfer.as_ref()?;
        dt.get_data(mime).ok().filter(|s| !s.is_empty())
    }

    fn set_data(&self, mime: &str, data: &str) -> Result<(), PlatformError> {
        self.transfer()?.set_data(mime, data).map_err(js_error)
    }

    fn clear_data(&self) -> Result<(), PlatformError> {
        self.transfer()?.clear_data().map_err(js_error)
    }
}
