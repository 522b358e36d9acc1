//! Live status text: the transient "moving block" indicator.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Observer = Rc<dyn Fn(&str)>;

/// Shared handle to the live status text. Clones share state.
///
/// The text never enters the document; an observer mirrors it into
/// whatever live region the platform shows.
#[derive(Clone, Default)]
pub struct LiveStatus {
    text: Rc<RefCell<String>>,
    generation: Rc<Cell<u64>>,
    observer: Rc<RefCell<Option<Observer>>>,
}

impl fmt::Debug for LiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStatus")
            .field("text", &*self.text.borrow())
            .finish_non_exhaustive()
    }
}

impl LiveStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn is_clear(&self) -> bool {
        self.text.borrow().is_empty()
    }

    /// Counter bumped by every `set`, including one that repeats the text.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn set(&self, text: &str) {
        self.generation.set(self.generation.get().wrapping_add(1));
        {
            let mut current = self.text.borrow_mut();
            if *current == text {
                return;
            }
            current.clear();
            current.push_str(text);
        }
        self.notify(text);
    }

    pub fn clear(&self) {
        self.set("");
    }

    /// Clear only if nothing was set since `generation` was read.
    pub fn clear_if_unchanged(&self, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.clear();
        true
    }

    /// Register the callback that mirrors every change.
    pub fn observe(&self, observer: impl Fn(&str) + 'static) {
        *self.observer.borrow_mut() = Some(Rc::new(observer));
    }

    fn notify(&self, text: &str) {
        // Clone out of the cell so the observer may touch the status again.
        let observer = self.observer.borrow().clone();
        if let Some(observer) = observer {
            observer(text);
        }
    }
}
