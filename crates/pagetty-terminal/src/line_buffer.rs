//! Line buffer with a caret, edited by key events.

use pagetty_types::input::Key;

/// The line the user is typing. The caret is a character index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    caret: usize,
}

impl LineBuffer {
    /// Create an empty line.
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole line.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Caret position in chars.
    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_pos(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Replace the contents and put the caret at the end.
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.caret = self.char_count();
    }

    /// Take the contents, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        self.caret = 0;
        std::mem::take(&mut self.text)
    }

    /// Text left and right of the caret.
    pub fn split_at_caret(&self) -> (&str, &str) {
        self.text.split_at(self.byte_pos(self.caret))
    }

    /// Insert a character at the caret.
    pub fn insert(&mut self, ch: char) {
        let pos = self.byte_pos(self.caret);
        self.text.insert(pos, ch);
        self.caret += 1;
    }

    /// Delete the character before the caret.
    pub fn backspace(&mut self) {
        if self.caret == 0 {
            return;
        }
        self.caret -= 1;
        let pos = self.byte_pos(self.caret);
        if pos < self.text.len() {
            self.text.remove(pos);
        }
    }

    /// Delete the character under the caret.
    pub fn delete(&mut self) {
        let pos = self.byte_pos(self.caret);
        if pos < self.text.len() {
            self.text.remove(pos);
        }
    }

    pub fn move_left(&mut self) {
        self.caret = self.caret.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.caret = (self.caret + 1).min(self.char_count());
    }

    pub fn home(&mut self) {
        self.caret = 0;
    }

    pub fn end(&mut self) {
        self.caret = self.char_count();
    }

    /// Apply an editing key. Returns `false` for keys that do not edit the
    /// line (history navigation, submit).
    pub fn apply(&mut self, key: Key) -> bool {
        match key {
            Key::Char(c) => self.insert(c),
            Key::Backspace => self.backspace(),
            Key::Delete => self.delete(),
            Key::Left => self.move_left(),
            Key::Right => self.move_right(),
            Key::Home => self.home(),
            Key::End => self.end(),
            Key::Up | Key::Down | Key::Enter => return false,
        }
        true
    }
}
