//! Listener subscriptions keyed by event kind and scope.
//!
//! Handles are opaque to the registry (a `gloo_events::EventListener` in the
//! browser). Dropping a handle is what detaches the listener, so every path
//! that removes an entry detaches it.

use std::collections::BTreeMap;
use std::fmt;

use crate::platform::PlatformError;

/// Clipboard-related DOM events the interceptor listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClipboardEventKind {
    Paste,
    Copy,
    Cut,
    DragStart,
    DragEnd,
    Drop,
    KeyDown,
}

impl ClipboardEventKind {
    /// DOM event type name.
    pub fn event_type(self) -> &'static str {
        match self {
            ClipboardEventKind::Paste => "paste",
            ClipboardEventKind::Copy => "copy",
            ClipboardEventKind::Cut => "cut",
            ClipboardEventKind::DragStart => "dragstart",
            ClipboardEventKind::DragEnd => "dragend",
            ClipboardEventKind::Drop => "drop",
            ClipboardEventKind::KeyDown => "keydown",
        }
    }
}

/// Where a listener is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerScope {
    /// On the editor element, bubbling phase.
    Editor,
    /// On the document, capture phase. Used as the copy/cut fallback.
    DocumentCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subscription {
    pub kind: ClipboardEventKind,
    pub scope: ListenerScope,
}

impl Subscription {
    pub const fn editor(kind: ClipboardEventKind) -> Self {
        Self {
            kind,
            scope: ListenerScope::Editor,
        }
    }

    pub const fn capture(kind: ClipboardEventKind) -> Self {
        Self {
            kind,
            scope: ListenerScope::DocumentCapture,
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            ListenerScope::Editor => "editor",
            ListenerScope::DocumentCapture => "document-capture",
        };
        write!(f, "{}@{}", self.kind.event_type(), scope)
    }
}

/// Installed listener handles, at most one per subscription.
pub struct SubscriptionRegistry<H> {
    handles: BTreeMap<Subscription, H>,
}

impl<H> Default for SubscriptionRegistry<H> {
    fn default() -> Self {
        Self {
            handles: BTreeMap::new(),
        }
    }
}

impl<H> fmt::Debug for SubscriptionRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handles.keys()).finish()
    }
}

impl<H> SubscriptionRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `subscription` unless it already is. `install` only runs when
    /// the subscription is absent. Returns whether a listener was installed.
    pub fn attach(
        &mut self,
        subscription: Subscription,
        install: impl FnOnce() -> Result<H, PlatformError>,
    ) -> Result<bool, PlatformError> {
        if self.handles.contains_key(&subscription) {
            return Ok(false);
        }
        let handle = install()?;
        tracing::debug!(%subscription, "listener attached");
        self.handles.insert(subscription, handle);
        Ok(true)
    }

    /// Remove one subscription. Returns whether it was installed.
    pub fn detach(&mut self, subscription: Subscription) -> bool {
        let removed = self.handles.remove(&subscription).is_some();
        if removed {
            tracing::debug!(%subscription, "listener detached");
        }
        removed
    }

    pub fn detach_all(&mut self) {
        for subscription in std::mem::take(&mut self.handles).into_keys() {
            tracing::debug!(%subscription, "listener detached");
        }
    }

    pub fn is_attached(&self, subscription: Subscription) -> bool {
        self.handles.contains_key(&subscription)
    }

    pub fn has_scope(&self, scope: ListenerScope) -> bool {
        self.handles.keys().any(|s| s.scope == scope)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = Subscription> + '_ {
        self.handles.keys().copied()
    }
}

impl<H> Drop for SubscriptionRegistry<H> {
    fn drop(&mut self) {
        self.detach_all();
    }
}
