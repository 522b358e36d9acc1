//! Browser DOM layer for the blocks clipboard sanitizer.
//!
//! This crate wires `blocks-editor-core` to a live editor element. It
//! assumes a `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `clipboard`: `ClipboardData` over an event's `DataTransfer`
//! - `dom`: `DOMParser` output converted to the core `HtmlNode` tree
//! - `scheduler`: `setTimeout`-backed `Scheduler`
//! - `events`: native listener mount/unmount and keyboard conversion
//!
//! # Re-exports
//!
//! This crate re-exports `blocks-editor-core` for convenience, so consumers
//! only need to depend on `blocks-editor-browser`.

// Re-export core crate
pub use blocks_editor_core;
pub use blocks_editor_core::*;

pub mod clipboard;
pub mod dom;
pub mod events;
pub mod scheduler;

pub use clipboard::BrowserClipboard;
pub use dom::{from_dom_node, parse_markup};
pub use events::{NativeInterceptor, key_chord_from_event};
pub use scheduler::TimeoutScheduler;
