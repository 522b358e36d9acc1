//! Clipboard event interception.
//!
//! The interceptor sits between native clipboard and drag events and the
//! editor: pastes go through the [`PastePipeline`], copies and cuts have
//! their outgoing payload scrubbed, and the live status text set while a
//! block is dragged is cleared before it can leak into clipboard content.

use crate::config::ClipboardConfig;
use crate::dom::HtmlNode;
use crate::editor::EditorDocument;
use crate::live::LiveStatus;
use crate::pipeline::{PasteInput, PastePipeline};
use crate::platform::{ClipboardData, ClipboardPayload, MIME_HTML, MIME_PLAIN, PlatformError};
use crate::registry::{ClipboardEventKind, Subscription};
use crate::schedule::Scheduler;
use crate::scrub::{contains_token, scrub, scrub_markup};

/// Listeners installed on the editor element for its whole lifetime.
pub const EDITOR_SUBSCRIPTIONS: [Subscription; 7] = [
    Subscription::editor(ClipboardEventKind::Paste),
    Subscription::editor(ClipboardEventKind::Copy),
    Subscription::editor(ClipboardEventKind::Cut),
    Subscription::editor(ClipboardEventKind::DragStart),
    Subscription::editor(ClipboardEventKind::DragEnd),
    Subscription::editor(ClipboardEventKind::Drop),
    Subscription::editor(ClipboardEventKind::KeyDown),
];

/// Document-level capture listeners installed after a restricted copy/cut.
pub const FALLBACK_SUBSCRIPTIONS: [Subscription; 2] = [
    Subscription::capture(ClipboardEventKind::Copy),
    Subscription::capture(ClipboardEventKind::Cut),
];

/// What a paste inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// Sanitized HTML inserted as a block fragment.
    Fragment,
    /// Scrubbed plain text inserted.
    Text,
    /// No HTML or text part; the editor's default insertion ran.
    Default,
    /// The payload held nothing but corrupt tokens.
    Discarded,
}

impl PasteOutcome {
    /// Whether the platform should suppress its own paste handling.
    pub fn prevents_default(self) -> bool {
        !matches!(self, PasteOutcome::Default)
    }
}

/// What a copy or cut wrote to the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The selection was written and scrubbed.
    Written,
    /// Nothing selected, the clipboard was left alone.
    Empty,
    /// The platform refused to let the payload be rewritten.
    Restricted,
}

/// Read both outgoing parts, scrub them, and write them back.
///
/// Returns whether anything changed. On failure the plain text part is
/// still scrubbed when the platform allows it.
pub fn scrub_outgoing(clipboard: &dyn ClipboardData) -> Result<bool, PlatformError> {
    let html = clipboard.get_data(MIME_HTML);
    let text = clipboard.get_data(MIME_PLAIN);
    let cleaned_html = html.as_deref().map(scrub_markup);
    let cleaned_text = text.as_deref().map(scrub);

    let changed = html.as_deref() != cleaned_html.as_deref()
        || text.as_deref() != cleaned_text.as_deref();
    if !changed {
        return Ok(false);
    }

    let rewrite = || -> Result<(), PlatformError> {
        clipboard.clear_data()?;
        if let Some(html) = cleaned_html.as_deref().filter(|s| !s.is_empty()) {
            clipboard.set_data(MIME_HTML, html)?;
        }
        if let Some(text) = cleaned_text.as_deref().filter(|s| !s.is_empty()) {
            clipboard.set_data(MIME_PLAIN, text)?;
        }
        Ok(())
    };

    match rewrite() {
        Ok(()) => {
            tracing::debug!("outgoing clipboard payload scrubbed");
            Ok(true)
        }
        Err(err) => {
            if let Some(text) = cleaned_text.as_deref() {
                if let Err(fallback) = clipboard.set_data(MIME_PLAIN, text) {
                    tracing::warn!(error = %fallback, "plain text fallback scrub failed");
                }
            }
            Err(err)
        }
    }
}

/// Replace a natively selected text with its scrubbed form before the
/// browser copies it.
///
/// Runs ahead of the default copy action, when the transfer is still empty,
/// so the selection text is the only source. Returns `Ok(false)` without
/// writing anything when the text is clean; the caller then leaves the
/// default action alone. On `Ok(true)` the caller must cancel it.
pub fn scrub_selection_text(
    clipboard: &dyn ClipboardData,
    text: &str,
) -> Result<bool, PlatformError> {
    if !contains_token(text) {
        return Ok(false);
    }
    clipboard.clear_data()?;
    clipboard.set_data(MIME_PLAIN, &scrub(text))?;
    tracing::debug!("native selection scrubbed ahead of copy");
    Ok(true)
}

/// Clipboard and drag coordination for one editor instance.
#[derive(Debug)]
pub struct ClipboardInterceptor<S> {
    pipeline: PastePipeline,
    status: LiveStatus,
    scheduler: S,
}

impl<S: Scheduler> ClipboardInterceptor<S> {
    pub fn new(config: ClipboardConfig, scheduler: S) -> Self {
        Self::with_status(config, LiveStatus::new(), scheduler)
    }

    /// An interceptor sharing an existing live status handle.
    pub fn with_status(config: ClipboardConfig, status: LiveStatus, scheduler: S) -> Self {
        Self {
            pipeline: PastePipeline::new(config),
            status,
            scheduler,
        }
    }

    pub fn config(&self) -> &ClipboardConfig {
        self.pipeline.config()
    }

    pub fn pipeline(&self) -> &PastePipeline {
        &self.pipeline
    }

    pub fn status(&self) -> &LiveStatus {
        &self.status
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Listeners the platform installs when mounting the editor.
    pub fn subscriptions(&self) -> &'static [Subscription] {
        &EDITOR_SUBSCRIPTIONS
    }

    /// Paste `clipboard` into `doc` at its selection.
    pub fn handle_paste<D>(&self, doc: &mut D, clipboard: &dyn ClipboardData) -> PasteOutcome
    where
        D: EditorDocument + ?Sized,
    {
        let payload = ClipboardPayload::read(clipboard);
        let outcome = if payload.is_empty() {
            doc.insert_data(clipboard);
            PasteOutcome::Default
        } else {
            insert(doc, self.pipeline.sanitize(&payload))
        };
        tracing::debug!(?outcome, "paste handled");
        self.clear_after_settle();
        outcome
    }

    /// Paste an HTML tree the platform already parsed.
    pub fn handle_paste_tree<D>(&self, doc: &mut D, tree: HtmlNode, text: Option<&str>) -> PasteOutcome
    where
        D: EditorDocument + ?Sized,
    {
        let outcome = insert(doc, self.pipeline.sanitize_tree(tree, text));
        tracing::debug!(?outcome, "paste handled");
        self.clear_after_settle();
        outcome
    }

    pub fn handle_copy<D>(&self, doc: &D, clipboard: &dyn ClipboardData) -> CopyOutcome
    where
        D: EditorDocument + ?Sized,
    {
        self.status.clear();
        write_selection(doc, clipboard)
    }

    /// Copy, then delete the selection once it is on the clipboard.
    pub fn handle_cut<D>(&self, doc: &mut D, clipboard: &dyn ClipboardData) -> CopyOutcome
    where
        D: EditorDocument + ?Sized,
    {
        self.status.clear();
        let outcome = write_selection(&*doc, clipboard);
        if outcome == CopyOutcome::Written {
            doc.delete_selection();
        }
        outcome
    }

    pub fn handle_drag_start(&self) {
        self.status.set(&self.config().drag_status_text);
    }

    pub fn handle_drag_end(&self) {
        self.status.clear();
    }

    pub fn handle_drop(&self) {
        self.clear_after_settle();
    }

    /// Clear the live status once the editor had time to commit its update,
    /// unless a newer drag set it in the meantime.
    fn clear_after_settle(&self) {
        let status = self.status.clone();
        let generation = status.generation();
        self.scheduler.schedule(
            self.config().settle_delay(),
            Box::new(move || {
                if !status.clear_if_unchanged(generation) {
                    tracing::trace!("live status changed before settle, keeping it");
                }
            }),
        );
    }
}

fn insert<D>(doc: &mut D, input: PasteInput) -> PasteOutcome
where
    D: EditorDocument + ?Sized,
{
    match input {
        PasteInput::Fragment(fragment) => {
            doc.insert_fragment(&fragment);
            PasteOutcome::Fragment
        }
        PasteInput::PlainText(text) => {
            doc.insert_text(&text);
            PasteOutcome::Text
        }
        PasteInput::Empty => PasteOutcome::Discarded,
    }
}

fn write_selection<D>(doc: &D, clipboard: &dyn ClipboardData) -> CopyOutcome
where
    D: EditorDocument + ?Sized,
{
    match doc.write_fragment(clipboard) {
        Ok(false) => return CopyOutcome::Empty,
        Ok(true) => {}
        Err(err) => {
            tracing::warn!(error = %err, "editor could not write the selection");
            return CopyOutcome::Restricted;
        }
    }
    match scrub_outgoing(clipboard) {
        Ok(_) => CopyOutcome::Written,
        Err(err) => {
            tracing::warn!(error = %err, "clipboard rewrite refused");
            CopyOutcome::Restricted
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::document::{Block, Document, Node};
    use crate::editor::BlocksEditor;
    use crate::platform::MemoryClipboard;
    use crate::schedule::ManualScheduler;
    use crate::types::Point;

    fn interceptor() -> (ClipboardInterceptor<ManualScheduler>, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        (
            ClipboardInterceptor::new(ClipboardConfig::default(), scheduler.clone()),
            scheduler,
        )
    }

    fn clipboard(html: Option<&str>, text: Option<&str>) -> MemoryClipboard {
        MemoryClipboard::with_payload(&ClipboardPayload::new(
            html.map(str::to_owned),
            text.map(str::to_owned),
        ))
    }

    fn para(text: &str) -> Node {
        Node::Block(Block::paragraph(vec![Node::text(text)]))
    }

    #[test]
    fn test_paste_html_inserts_clean_fragment() {
        let (interceptor, _) = interceptor();
        let mut editor = BlocksEditor::default();
        let outcome = interceptor.handle_paste(
            &mut editor,
            &clipboard(Some("<p>Hello dragdrag world</p>"), Some("Hello dragdrag world")),
        );
        assert_eq!(outcome, PasteOutcome::Fragment);
        assert_eq!(editor.document().plain_text(), "Hello  world");
    }

    #[test]
    fn test_paste_plain_text_is_scrubbed() {
        let (interceptor, _) = interceptor();
        let mut editor = BlocksEditor::default();
        let outcome = interceptor.handle_paste(&mut editor, &clipboard(None, Some("dragdragabc")));
        assert_eq!(outcome, PasteOutcome::Text);
        assert_eq!(editor.document().plain_text(), "abc");
    }

    #[test]
    fn test_paste_of_only_tokens_is_discarded() {
        let (interceptor, _) = interceptor();
        let mut editor = BlocksEditor::default();
        let outcome = interceptor.handle_paste(&mut editor, &clipboard(None, Some("DragDRAG")));
        assert_eq!(outcome, PasteOutcome::Discarded);
        assert!(outcome.prevents_default());
        assert_eq!(editor.document(), &Document::empty_paragraph());
    }

    #[test]
    fn test_empty_payload_uses_default_insertion() {
        let (interceptor, _) = interceptor();
        let mut editor = BlocksEditor::default();
        let outcome = interceptor.handle_paste(&mut editor, &MemoryClipboard::new());
        assert_eq!(outcome, PasteOutcome::Default);
        assert!(!outcome.prevents_default());
    }

    #[test]
    fn test_paste_clears_status_after_settle() {
        let (interceptor, scheduler) = interceptor();
        let mut editor = BlocksEditor::default();
        interceptor.handle_drag_start();
        assert_eq!(interceptor.status().text(), "Moving block");

        interceptor.handle_paste(&mut editor, &clipboard(None, Some("x")));
        assert!(!interceptor.status().is_clear());
        scheduler.advance(Duration::from_millis(99));
        assert!(!interceptor.status().is_clear());
        scheduler.advance(Duration::from_millis(1));
        assert!(interceptor.status().is_clear());
    }

    #[test]
    fn test_new_drag_survives_earlier_drop() {
        let (interceptor, scheduler) = interceptor();
        interceptor.handle_drag_start();
        interceptor.handle_drop();
        scheduler.advance(Duration::from_millis(50));
        interceptor.handle_drag_start();
        scheduler.advance(Duration::from_millis(60));
        assert_eq!(interceptor.status().text(), "Moving block");

        interceptor.handle_drop();
        scheduler.advance(Duration::from_millis(100));
        assert!(interceptor.status().is_clear());
    }

    #[test]
    fn test_settle_delay_is_clamped() {
        let scheduler = ManualScheduler::new();
        let config = ClipboardConfig {
            settle_delay_ms: 10_000,
            ..Default::default()
        };
        let interceptor = ClipboardInterceptor::new(config, scheduler.clone());
        interceptor.handle_drag_start();
        interceptor.handle_drop();
        scheduler.advance(Duration::from_millis(150));
        assert!(interceptor.status().is_clear());
    }

    #[test]
    fn test_drag_end_clears_immediately() {
        let (interceptor, scheduler) = interceptor();
        interceptor.handle_drag_start();
        interceptor.handle_drag_end();
        assert!(interceptor.status().is_clear());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_copy_scrubs_outgoing_payload() {
        let (interceptor, _) = interceptor();
        let mut editor = BlocksEditor::new(Document::new(vec![para("Hello dragdrag")]));
        editor.select_all();
        interceptor.handle_drag_start();

        let clipboard = MemoryClipboard::new();
        assert_eq!(
            interceptor.handle_copy(&editor, &clipboard),
            CopyOutcome::Written
        );
        assert!(interceptor.status().is_clear());
        let payload = clipboard.payload();
        assert_eq!(payload.text.as_deref(), Some("Hello "));
        assert_eq!(payload.html.as_deref(), Some("<p>Hello </p>"));
    }

    #[test]
    fn test_copy_with_collapsed_selection_is_empty() {
        let (interceptor, _) = interceptor();
        let mut editor = BlocksEditor::new(Document::new(vec![para("text")]));
        let point = Point::new(vec![0, 0], 2);
        editor.select(point.clone(), point);
        let clipboard = MemoryClipboard::new();
        assert_eq!(
            interceptor.handle_copy(&editor, &clipboard),
            CopyOutcome::Empty
        );
        assert!(clipboard.payload().is_empty());
    }

    #[test]
    fn test_cut_deletes_selection() {
        let (interceptor, _) = interceptor();
        let mut editor = BlocksEditor::new(Document::new(vec![para("cut me")]));
        editor.select_all();
        let clipboard = MemoryClipboard::new();
        assert_eq!(
            interceptor.handle_cut(&mut editor, &clipboard),
            CopyOutcome::Written
        );
        assert_eq!(clipboard.payload().text.as_deref(), Some("cut me"));
        assert_eq!(editor.document().plain_text(), "");
    }

    #[test]
    fn test_restricted_clipboard() {
        let (interceptor, _) = interceptor();
        let mut editor = BlocksEditor::new(Document::new(vec![para("keep")]));
        editor.select_all();
        interceptor.handle_drag_start();
        let clipboard = MemoryClipboard::read_only(&ClipboardPayload::default());
        assert_eq!(
            interceptor.handle_cut(&mut editor, &clipboard),
            CopyOutcome::Restricted
        );
        assert!(interceptor.status().is_clear());
        assert_eq!(editor.document().plain_text(), "keep");
    }

    #[test]
    fn test_scrub_outgoing_leaves_clean_payload_alone() {
        let clipboard = clipboard(Some("<p>fine</p>"), Some("fine"));
        assert!(!scrub_outgoing(&clipboard).unwrap());

        let clipboard = clipboard_with_tokens();
        assert!(scrub_outgoing(&clipboard).unwrap());
        assert_eq!(
            clipboard.payload(),
            ClipboardPayload::new(Some("<p>a</p>".into()), Some("a".into()))
        );
    }

    #[test]
    fn test_scrub_selection_text() {
        let clipboard = MemoryClipboard::new();
        assert!(!scrub_selection_text(&clipboard, "clean text").unwrap());
        assert!(clipboard.payload().is_empty());

        assert!(scrub_selection_text(&clipboard, "before dragDRAG after").unwrap());
        assert_eq!(clipboard.payload().text.as_deref(), Some("before  after"));

        let locked = MemoryClipboard::read_only(&ClipboardPayload::default());
        assert!(scrub_selection_text(&locked, "drag").is_err());
    }

    fn clipboard_with_tokens() -> MemoryClipboard {
        clipboard(Some("<p>dragadrag</p>"), Some("DRAGa"))
    }

    #[test]
    fn test_subscriptions_are_editor_scoped() {
        let (interceptor, _) = interceptor();
        assert_eq!(interceptor.subscriptions().len(), 7);
        assert!(
            FALLBACK_SUBSCRIPTIONS
                .iter()
                .all(|sub| !interceptor.subscriptions().contains(sub))
        );
    }
}
