//! Platform abstraction traits for clipboard access.
//!
//! These traits define the interface between the sanitization logic and
//! platform-specific clipboard implementations (browser `DataTransfer`, an
//! in-memory clipboard for tests and the CLI, etc.).

use std::cell::RefCell;
use std::collections::BTreeMap;

/// MIME type of the HTML clipboard part.
pub const MIME_HTML: &str = "text/html";
/// MIME type of the plain text clipboard part.
pub const MIME_PLAIN: &str = "text/plain";

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError(pub String);

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PlatformError {}

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// Access to the clipboard payload of a single clipboard or drag event.
///
/// Methods take `&self` because platform handles (a browser `DataTransfer`)
/// are shared references with interior mutability.
pub trait ClipboardData {
    /// Read the payload part for `mime`. Empty parts are reported as `None`.
    fn get_data(&self, mime: &str) -> Option<String>;

    /// Replace the payload part for `mime`.
    fn set_data(&self, mime: &str, data: &str) -> Result<(), PlatformError>;

    /// Remove every payload part.
    fn clear_data(&self) -> Result<(), PlatformError>;
}

/// Snapshot of the two clipboard parts the pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: Option<String>,
    pub text: Option<String>,
}

impl ClipboardPayload {
    pub fn new(html: Option<String>, text: Option<String>) -> Self {
        Self {
            html: html.filter(|s| !s.is_empty()),
            text: text.filter(|s| !s.is_empty()),
        }
    }

    /// Read both parts from a clipboard.
    pub fn read(clipboard: &dyn ClipboardData) -> Self {
        Self::new(clipboard.get_data(MIME_HTML), clipboard.get_data(MIME_PLAIN))
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_none() && self.text.is_none()
    }
}

/// In-memory clipboard.
///
/// Used by the CLI and tests. A read-only clipboard refuses writes the way a
/// browser does outside of a trusted clipboard event.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    parts: RefCell<BTreeMap<String, String>>,
    read_only: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose payload can be read but not replaced.
    pub fn read_only(payload: &ClipboardPayload) -> Self {
        let clipboard = Self::with_payload(payload);
        Self {
            read_only: true,
            ..clipboard
        }
    }

    pub fn with_payload(payload: &ClipboardPayload) -> Self {
        let mut parts = BTreeMap::new();
        if let Some(html) = &payload.html {
            parts.insert(MIME_HTML.to_string(), html.clone());
        }
        if let Some(text) = &payload.text {
            parts.insert(MIME_PLAIN.to_string(), text.clone());
        }
        Self {
            parts: RefCell::new(parts),
            read_only: false,
        }
    }

    pub fn payload(&self) -> ClipboardPayload {
        ClipboardPayload::read(self)
    }
}

impl ClipboardData for MemoryClipboard {
    fn get_data(&self, mime: &str) -> Option<String> {
        self.parts
            .borrow()
            .get(mime)
            .filter(|s| !s.is_empty())
            .cloned()
    }

    fn set_data(&self, mime: &str, data: &str) -> Result<(), PlatformError> {
        if self.read_only {
            return Err(PlatformError::from("clipboard is read-only"));
        }
        self.parts
            .borrow_mut()
            .insert(mime.to_string(), data.to_string());
        Ok(())
    }

    fn clear_data(&self) -> Result<(), PlatformError> {
        if self.read_only {
            return Err(PlatformError::from("clipboard is read-only"));
        }
        self.parts.borrow_mut().clear();
        Ok(())
    }
}
