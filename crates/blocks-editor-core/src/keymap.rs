//! Keyboard input types and the editor's key bindings.
//!
//! Platform code converts native key events into a [`KeyChord`]; the
//! editor maps chords to [`KeyCommand`]s and reports whether the platform
//! should suppress its default handling.

use smol_str::SmolStr;

use crate::document::Mark;

/// Key values for keyboard input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key, lowercased.
    Character(SmolStr),
    Backspace,
    Enter,
    Tab,
    /// Any other named key (`ArrowLeft`, `Escape`, ...).
    Named(SmolStr),
}

impl Key {
    /// Convert a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Backspace" => Key::Backspace,
            "Enter" => Key::Enter,
            "Tab" => Key::Tab,
            _ if key.chars().count() == 1 => Key::Character(SmolStr::new(key.to_lowercase())),
            _ => Key::Named(SmolStr::new(key)),
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// `Mod`: Cmd on Mac, Ctrl elsewhere. Either one counts.
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// A key combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// Build a chord from DOM keyboard event fields.
    pub fn from_dom(key: &str, ctrl: bool, meta: bool) -> Self {
        Self {
            key: Key::from_dom(key),
            modifiers: Modifiers {
                ctrl,
                meta,
                ..Modifiers::NONE
            },
        }
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.modifiers.shift = shift;
        self
    }

    pub fn with_alt(mut self, alt: bool) -> Self {
        self.modifiers.alt = alt;
        self
    }

    /// `Mod+<character>`.
    pub fn primary(character: &str) -> Self {
        Self::from_dom(character, true, false)
    }

    /// The editor command bound to this chord.
    pub fn command(&self) -> Option<KeyCommand> {
        let primary = self.modifiers.primary();
        match &self.key {
            Key::Tab => Some(KeyCommand::Indent {
                outdent: self.modifiers.shift,
            }),
            Key::Character(c) if primary => match c.as_str() {
                "k" => Some(KeyCommand::RequestLink),
                "b" => Some(KeyCommand::ToggleMark(Mark::Bold)),
                "i" => Some(KeyCommand::ToggleMark(Mark::Italic)),
                "u" => Some(KeyCommand::ToggleMark(Mark::Underline)),
                _ => None,
            },
            Key::Backspace if self.modifiers.is_empty() => Some(KeyCommand::ResetBlock),
            Key::Enter if self.modifiers.is_empty() => Some(KeyCommand::Break),
            _ => None,
        }
    }
}

/// Editor commands reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    /// Tab. Nests the current list item; never moves focus.
    Indent { outdent: bool },
    /// Mod+K. The shell opens its link dialog.
    RequestLink,
    ToggleMark(Mark),
    /// Backspace at the start of a heading, quote or code block.
    ResetBlock,
    /// Enter at the end of a heading or in an empty list item.
    Break,
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Event was handled, prevent default.
    Handled,
    /// Let the platform handle it.
    PassThrough,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dom() {
        let chord = KeyChord::from_dom("B", false, true);
        assert_eq!(chord.key, Key::Character("b".into()));
        assert!(chord.modifiers.primary());
        assert_eq!(KeyChord::from_dom("Tab", false, false).key, Key::Tab);
        assert_eq!(
            KeyChord::from_dom("ArrowLeft", false, false).key,
            Key::Named("ArrowLeft".into())
        );
    }

    #[test]
    fn test_bindings() {
        assert_eq!(
            KeyChord::primary("k").command(),
            Some(KeyCommand::RequestLink)
        );
        assert_eq!(
            KeyChord::from_dom("u", true, false).command(),
            Some(KeyCommand::ToggleMark(Mark::Underline))
        );
        assert_eq!(
            KeyChord::from_dom("Tab", false, false).command(),
            Some(KeyCommand::Indent { outdent: false })
        );
        assert_eq!(KeyChord::from_dom("b", false, false).command(), None);
        assert_eq!(
            KeyChord::from_dom("Enter", false, false)
                .with_shift(true)
                .command(),
            None
        );
        assert_eq!(KeyChord::primary("Enter").command(), None);
    }
}
