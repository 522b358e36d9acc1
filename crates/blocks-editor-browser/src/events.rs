//! Native listener wiring for one editor element.
//!
//! `NativeInterceptor::mount` installs one listener per subscription the
//! core interceptor asks for; `unmount` (or dropping the interceptor)
//! removes them again. The document-level capture listeners are only added
//! after a copy or cut whose payload the browser refused to rewrite.

use std::cell::RefCell;
use std::rc::Rc;

use blocks_editor_core::interceptor::FALLBACK_SUBSCRIPTIONS;
use blocks_editor_core::{
    BlocksEditor, ClipboardConfig, ClipboardEventKind, ClipboardInterceptor, ClipboardPayload,
    CopyOutcome, KeyChord, KeyOutcome, ListenerScope, LiveStatus, PasteOutcome, PlatformError,
    Subscription, SubscriptionRegistry, scrub_selection_text,
};
use gloo_events::{EventListener, EventListenerOptions, EventListenerPhase};
use wasm_bindgen::JsCast;

use crate::clipboard::BrowserClipboard;
use crate::dom::parse_markup;
use crate::scheduler::TimeoutScheduler;

/// Build a chord from a native keydown event.
pub fn key_chord_from_event(evt: &web_sys::KeyboardEvent) -> KeyChord {
    KeyChord::from_dom(&evt.key(), evt.ctrl_key(), evt.meta_key())
        .with_shift(evt.shift_key())
        .with_alt(evt.alt_key())
}

type Registry = Rc<RefCell<SubscriptionRegistry<EventListener>>>;

/// State every listener closure shares.
#[derive(Clone)]
struct Shared {
    editor: Rc<RefCell<BlocksEditor>>,
    interceptor: Rc<ClipboardInterceptor<TimeoutScheduler>>,
    registry: Registry,
    element: web_sys::Element,
}

/// Clipboard, drag and keyboard interception for a mounted editor.
pub struct NativeInterceptor {
    editor: Rc<RefCell<BlocksEditor>>,
    interceptor: Rc<ClipboardInterceptor<TimeoutScheduler>>,
    registry: Registry,
}

impl NativeInterceptor {
    pub fn new(editor: Rc<RefCell<BlocksEditor>>, config: ClipboardConfig) -> Self {
        Self {
            editor,
            interceptor: Rc::new(ClipboardInterceptor::new(config, TimeoutScheduler)),
            registry: Rc::new(RefCell::new(SubscriptionRegistry::new())),
        }
    }

    /// Live status handle, for mirroring into an `aria-live` region.
    pub fn status(&self) -> &LiveStatus {
        self.interceptor.status()
    }

    /// Number of native listeners currently installed.
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn is_mounted(&self) -> bool {
        self.registry.borrow().has_scope(ListenerScope::Editor)
    }

    /// Mount on the element with `editor_id`. A missing element skips the
    /// mount.
    pub fn mount(&self, editor_id: &str) -> bool {
        let Some(element) = gloo_utils::document().get_element_by_id(editor_id) else {
            tracing::warn!(editor_id, "editor element not found, clipboard interception disabled");
            return false;
        };
        self.mount_element(element);
        true
    }

    /// Install the editor-level listeners. Mounting twice is a no-op.
    pub fn mount_element(&self, element: web_sys::Element) {
        let shared = Shared {
            editor: self.editor.clone(),
            interceptor: self.interceptor.clone(),
            registry: self.registry.clone(),
            element,
        };
        for &subscription in self.interceptor.subscriptions() {
            let shared = shared.clone();
            let installed = self
                .registry
                .borrow_mut()
                .attach(subscription, || Ok(listen(shared, subscription)));
            if let Err(err) = installed {
                tracing::warn!(%subscription, error = %err, "listener not installed");
            }
        }
        tracing::debug!(listeners = self.registry.borrow().len(), "clipboard interception mounted");
    }

    /// Remove every listener, fallback ones included.
    pub fn unmount(&self) {
        self.registry.borrow_mut().detach_all();
        self.interceptor.status().clear();
    }
}

impl Drop for NativeInterceptor {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn listen(shared: Shared, subscription: Subscription) -> EventListener {
    let kind = subscription.kind;
    let options = match subscription.scope {
        ListenerScope::Editor => EventListenerOptions::enable_prevent_default(),
        ListenerScope::DocumentCapture => EventListenerOptions {
            phase: EventListenerPhase::Capture,
            passive: false,
        },
    };
    let target: web_sys::EventTarget = match subscription.scope {
        ListenerScope::Editor => shared.element.clone().into(),
        ListenerScope::DocumentCapture => gloo_utils::document().into(),
    };
    let scope = subscription.scope;
    EventListener::new_with_options(&target, kind.event_type(), options, move |evt| {
        match scope {
            ListenerScope::Editor => on_editor_event(&shared, kind, evt),
            ListenerScope::DocumentCapture => on_captured_copy(&shared, evt),
        }
    })
}

fn on_editor_event(shared: &Shared, kind: ClipboardEventKind, evt: &web_sys::Event) {
    let interceptor = &shared.interceptor;
    match kind {
        ClipboardEventKind::Paste => {
            let Some(evt) = evt.dyn_ref::<web_sys::ClipboardEvent>() else {
                return;
            };
            let clipboard = BrowserClipboard::from_event(evt);
            let Ok(mut editor) = shared.editor.try_borrow_mut() else {
                tracing::warn!("editor busy, paste left to the browser");
                return;
            };
            let outcome = paste(interceptor, &mut editor, &clipboard);
            if outcome.prevents_default() {
                evt.prevent_default();
            }
        }
        ClipboardEventKind::Copy | ClipboardEventKind::Cut => {
            let Some(clipboard_evt) = evt.dyn_ref::<web_sys::ClipboardEvent>() else {
                return;
            };
            let clipboard = BrowserClipboard::from_event(clipboard_evt);
            let Ok(mut editor) = shared.editor.try_borrow_mut() else {
                return;
            };
            let outcome = if kind == ClipboardEventKind::Cut {
                interceptor.handle_cut(&mut *editor, &clipboard)
            } else {
                interceptor.handle_copy(&*editor, &clipboard)
            };
            drop(editor);
            match outcome {
                CopyOutcome::Written => evt.prevent_default(),
                CopyOutcome::Empty => {}
                CopyOutcome::Restricted => install_fallback(shared),
            }
        }
        ClipboardEventKind::DragStart => interceptor.handle_drag_start(),
        ClipboardEventKind::DragEnd => interceptor.handle_drag_end(),
        ClipboardEventKind::Drop => interceptor.handle_drop(),
        ClipboardEventKind::KeyDown => {
            let Some(evt) = evt.dyn_ref::<web_sys::KeyboardEvent>() else {
                return;
            };
            if evt.is_composing() {
                return;
            }
            let chord = key_chord_from_event(evt);
            let Ok(mut editor) = shared.editor.try_borrow_mut() else {
                return;
            };
            if editor.handle_key(&chord) == KeyOutcome::Handled {
                evt.prevent_default();
            }
        }
    }
}

/// Paste through `DOMParser` when there is HTML, the core parser otherwise.
fn paste(
    interceptor: &ClipboardInterceptor<TimeoutScheduler>,
    editor: &mut BlocksEditor,
    clipboard: &BrowserClipboard,
) -> PasteOutcome {
    let payload = ClipboardPayload::read(clipboard);
    let Some(markup) = payload.html.as_deref() else {
        return interceptor.handle_paste(editor, clipboard);
    };
    match parse_markup(markup, interceptor.config()) {
        Ok(tree) => interceptor.handle_paste_tree(editor, tree, payload.text.as_deref()),
        Err(err) => {
            tracing::warn!(error = %err, "DOMParser rejected paste, using core parser");
            interceptor.handle_paste(editor, clipboard)
        }
    }
}

/// Capture-phase copy/cut listener for selections inside the editor.
///
/// It runs before the browser fills the transfer, so it reads the native
/// selection, writes the scrubbed text itself and cancels the default copy.
/// Clean selections are left to the browser.
fn on_captured_copy(shared: &Shared, evt: &web_sys::Event) {
    let inside = evt
        .target()
        .and_then(|target| target.dyn_into::<web_sys::Node>().ok())
        .is_some_and(|node| shared.element.contains(Some(&node)));
    if !inside {
        return;
    }
    shared.interceptor.status().clear();
    let Some(clipboard_evt) = evt.dyn_ref::<web_sys::ClipboardEvent>() else {
        return;
    };
    let Some(text) = selection_text() else {
        return;
    };
    match scrub_selection_text(&BrowserClipboard::from_event(clipboard_evt), &text) {
        Ok(true) => evt.prevent_default(),
        Ok(false) => {}
        Err(err) => tracing::warn!(error = %err, "capture fallback could not scrub the selection"),
    }
}

fn selection_text() -> Option<String> {
    let selection = web_sys::window()?.get_selection().ok()??;
    let text = String::from(selection.to_string());
    (!text.is_empty()).then_some(text)
}

fn install_fallback(shared: &Shared) {
    if !shared.interceptor.config().capture_fallback {
        return;
    }
    for subscription in FALLBACK_SUBSCRIPTIONS {
        let for_listener = shared.clone();
        let installed = shared
            .registry
            .borrow_mut()
            .attach(subscription, || -> Result<_, PlatformError> {
                Ok(listen(for_listener, subscription))
            });
        match installed {
            Ok(true) => tracing::debug!(%subscription, "capture fallback installed"),
            Ok(false) => {}
            Err(err) => tracing::warn!(%subscription, error = %err, "capture fallback failed"),
        }
    }
}
