//! Rendering collaborator and an in-memory transcript implementation.
//!
//! The terminal core never paints anything. It describes output as a stream
//! of appends to the current line, line breaks, anchors, and a prompt that is
//! redrawn on every edit. A front end implements [`Surface`] for its medium;
//! [`Transcript`] records everything for tests and headless use.

use std::cell::RefCell;
use std::rc::Rc;

/// Handle to an anchor created by [`Surface::attach_anchor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(pub u32);

/// Output sink for a terminal.
pub trait Surface {
    /// Append plain text to the current line.
    fn append_text(&mut self, text: &str);

    /// Insert markup verbatim into the current line.
    fn append_markup(&mut self, markup: &str);

    /// Start a new output line.
    fn new_line(&mut self);

    /// Open an anchor pointing at `url` on the current line.
    fn attach_anchor(&mut self, url: &str) -> AnchorId;

    /// Append visible text to a previously attached anchor.
    fn append_anchor_text(&mut self, anchor: AnchorId, text: &str);

    /// Draw the prompt on the current line with the caret between `before`
    /// and `after`.
    fn render_prompt(&mut self, prompt: &str, before: &str, after: &str);

    /// Remove the prompt from the current line.
    fn clear_prompt(&mut self);

    /// Show or hide the disabled look.
    fn set_disabled(&mut self, disabled: bool);
}

/// A piece of a transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Markup(String),
    Anchor {
        id: AnchorId,
        url: String,
        text: String,
    },
}

impl Span {
    fn plain(&self) -> &str {
        match self {
            Span::Text(t) | Span::Markup(t) => t,
            Span::Anchor { text, .. } => text,
        }
    }
}

/// Prompt as last drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub prompt: String,
    pub before: String,
    pub after: String,
}

impl PromptView {
    /// `"<prompt> <before><after>"`, the way the line reads on screen.
    pub fn line(&self) -> String {
        format!("{} {}{}", self.prompt, self.before, self.after)
    }
}

#[derive(Debug)]
struct TranscriptState {
    lines: Vec<Vec<Span>>,
    prompt: Option<PromptView>,
    disabled: bool,
    next_anchor: u32,
}

/// Shared, cloneable in-memory surface.
///
/// Clones share one buffer, so a caller can hand one clone to a terminal and
/// keep another to inspect what was written.
#[derive(Debug, Clone)]
pub struct Transcript {
    state: Rc<RefCell<TranscriptState>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(TranscriptState {
                lines: vec![Vec::new()],
                prompt: None,
                disabled: false,
                next_anchor: 0,
            })),
        }
    }

    /// Plain text of every line, including the (possibly empty) current one.
    /// The prompt is not included.
    pub fn lines(&self) -> Vec<String> {
        self.state
            .borrow()
            .lines
            .iter()
            .map(|spans| spans.iter().map(Span::plain).collect::<String>())
            .collect()
    }

    /// Completed lines only (everything before the current line).
    pub fn finished_lines(&self) -> Vec<String> {
        let mut lines = self.lines();
        lines.pop();
        lines
    }

    /// Plain text of the current line.
    pub fn current_line(&self) -> String {
        self.lines().pop().unwrap_or_default()
    }

    /// All lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    /// Whether any finished line equals `line`.
    pub fn has_line(&self, line: &str) -> bool {
        self.finished_lines().iter().any(|l| l == line)
    }

    /// Raw spans of line `index`.
    pub fn spans(&self, index: usize) -> Vec<Span> {
        self.state
            .borrow()
            .lines
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// The prompt as last drawn, if it is showing.
    pub fn prompt(&self) -> Option<PromptView> {
        self.state.borrow().prompt.clone()
    }

    pub fn is_disabled(&self) -> bool {
        self.state.borrow().disabled
    }

    /// Drop all output, keeping one empty current line.
    pub fn clear(&self) {
        let mut st = self.state.borrow_mut();
        st.lines = vec![Vec::new()];
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptState {
    fn current(&mut self) -> &mut Vec<Span> {
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }
}

impl Surface for Transcript {
    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut st = self.state.borrow_mut();
        let line = st.current();
        match line.last_mut() {
            Some(Span::Text(t)) => t.push_str(text),
            _ => line.push(Span::Text(text.to_string())),
        }
    }

    fn append_markup(&mut self, markup: &str) {
        let mut st = self.state.borrow_mut();
        st.current().push(Span::Markup(markup.to_string()));
    }

    fn new_line(&mut self) {
        self.state.borrow_mut().lines.push(Vec::new());
    }

    fn attach_anchor(&mut self, url: &str) -> AnchorId {
        let mut st = self.state.borrow_mut();
        let id = AnchorId(st.next_anchor);
        st.next_anchor += 1;
        st.current().push(Span::Anchor {
            id,
            url: url.to_string(),
            text: String::new(),
        });
        id
    }

    fn append_anchor_text(&mut self, anchor: AnchorId, text: &str) {
        let mut st = self.state.borrow_mut();
        let target = st.lines.iter_mut().rev().flatten().find_map(|span| match span {
            Span::Anchor { id, text: label, .. } if *id == anchor => Some(label),
            _ => None,
        });
        match target {
            Some(t) => t.push_str(text),
            None => log::debug!("append to unknown anchor {anchor:?} ignored"),
        }
    }

    fn render_prompt(&mut self, prompt: &str, before: &str, after: &str) {
        self.state.borrow_mut().prompt = Some(PromptView {
            prompt: prompt.to_string(),
            before: before.to_string(),
            after: after.to_string(),
        });
    }

    fn clear_prompt(&mut self) {
        self.state.borrow_mut().prompt = None;
    }

    fn set_disabled(&mut self, disabled: bool) {
        self.state.borrow_mut().disabled = disabled;
    }
}
