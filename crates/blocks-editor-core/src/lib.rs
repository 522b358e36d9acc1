//! blocks-editor-core: clipboard sanitization for the blocks rich-text field.
//!
//! This crate provides:
//! - `scrub` - the corrupt "drag" token rule for text and markup
//! - `HtmlNode` tree model and `parse_html`
//! - `cleaner` and `deserialize` - HTML tree to block `Document`
//! - `PastePipeline` - named stages from clipboard payload to clean document
//! - `ClipboardInterceptor` - paste/copy/cut/drag coordination
//! - `BlocksEditor` - reference editor implementing `EditorDocument`
//!
//! Everything is platform-agnostic; the browser layer supplies a
//! `ClipboardData` implementation, an HTML tree, and a `Scheduler`.

pub mod cleaner;
pub mod config;
pub mod deserialize;
pub mod document;
pub mod dom;
pub mod editor;
pub mod error;
mod execute;
pub mod fragment;
pub mod interceptor;
pub mod keymap;
pub mod live;
pub mod ops;
pub mod pipeline;
pub mod platform;
pub mod registry;
pub mod schedule;
pub mod scrub;
pub mod serialize;
pub mod types;

pub use cleaner::{CleanDecision, classify};
pub use config::ClipboardConfig;
pub use deserialize::Deserializer;
pub use document::{Block, BlockKind, Document, ListFormat, Mark, Marks, Node, Path, Text};
pub use dom::{HtmlElement, HtmlNode, parse_html};
pub use editor::{BlocksEditor, EditorDocument};
pub use error::SanitizeError;
pub use fragment::{clean_document, is_clean};
pub use interceptor::{
    ClipboardInterceptor, CopyOutcome, PasteOutcome, scrub_outgoing, scrub_selection_text,
};
pub use keymap::{Key, KeyChord, KeyCommand, KeyOutcome, Modifiers};
pub use live::LiveStatus;
pub use ops::{NodeProperties, Operation};
pub use pipeline::{PasteInput, PastePipeline, Payload, Stage};
pub use platform::{
    ClipboardData, ClipboardPayload, MIME_HTML, MIME_PLAIN, MemoryClipboard, PlatformError,
};
pub use registry::{ClipboardEventKind, ListenerScope, Subscription, SubscriptionRegistry};
pub use schedule::{ManualScheduler, Scheduler};
pub use scrub::{contains_token, scrub, scrub_markup};
pub use serialize::{to_html, to_plain_text};
pub use smol_str::SmolStr;
pub use types::{Point, Selection};
