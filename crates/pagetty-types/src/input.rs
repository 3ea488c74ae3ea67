//! Platform-agnostic key events.
//!
//! Every front end maps its native keyboard input to [`Key`]. The terminal
//! core never sees raw platform input.

use serde::{Deserialize, Serialize};

/// A single key press delivered to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Printable character typed.
    Char(char),
    /// Delete the character left of the caret.
    Backspace,
    /// Delete the character under the caret.
    Delete,
    /// Move the caret one character left.
    Left,
    /// Move the caret one character right.
    Right,
    /// Move the caret to the start of the line.
    Home,
    /// Move the caret to the end of the line.
    End,
    /// Recall the previous history entry.
    Up,
    /// Recall the next history entry.
    Down,
    /// Submit the current line.
    Enter,
}

impl Key {
    /// Whether this key speeds up a running script playback.
    pub fn is_speed_up(self) -> bool {
        matches!(self, Key::Enter | Key::Char(' '))
    }

    /// Whether this key edits the line buffer (as opposed to navigating
    /// history or submitting).
    pub fn is_edit(self) -> bool {
        !matches!(self, Key::Up | Key::Down | Key::Enter)
    }

    /// Map every character of `text` to a [`Key::Char`], turning `\n` into
    /// [`Key::Enter`].
    pub fn from_text(text: &str) -> Vec<Key> {
        text.chars()
            .filter(|&c| c != '\r')
            .map(|c| if c == '\n' { Key::Enter } else { Key::Char(c) })
            .collect()
    }
}
