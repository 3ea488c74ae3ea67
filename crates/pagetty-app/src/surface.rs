//! Surface that writes to a byte stream (stdout in the binary).

use std::collections::HashMap;
use std::io::Write;

use pagetty_terminal::{AnchorId, Surface};

const CLEAR_LINE: &str = "\r\x1b[2K";
const CURSOR_UP: &str = "\x1b[1A";

/// Renders terminal output as ANSI text.
///
/// Anchors print their text followed by the target in angle brackets when
/// the line ends. When `echoed` is set, the host tty has already echoed the
/// submitted line below the prompt, so clearing the prompt also removes that
/// echo.
pub struct WriterSurface<W: Write> {
    out: W,
    echoed: bool,
    prompt_shown: bool,
    next_anchor: u32,
    anchors: HashMap<AnchorId, String>,
    pending_urls: Vec<String>,
}

impl<W: Write> WriterSurface<W> {
    /// Create a renderer writing to `out`. Set `echoed` when the host tty echoes input.
    pub fn new(out: W, echoed: bool) -> Self {
        Self {
            out,
            echoed,
            prompt_shown: false,
            next_anchor: 0,
            anchors: HashMap::new(),
            pending_urls: Vec::new(),
        }
    }

    /// Consume the renderer and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()) {
            log::debug!("output write failed: {e}");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            log::debug!("output flush failed: {e}");
        }
    }

    fn hide_prompt(&mut self) {
        if self.prompt_shown {
            self.write(CLEAR_LINE);
            self.prompt_shown = false;
        }
    }
}

impl<W: Write> Surface for WriterSurface<W> {
    fn append_text(&mut self, text: &str) {
        self.hide_prompt();
        self.write(text);
    }

    fn append_markup(&mut self, markup: &str) {
        self.hide_prompt();
        self.write(markup);
    }

    fn new_line(&mut self) {
        self.hide_prompt();
        let urls = std::mem::take(&mut self.pending_urls);
        for url in urls {
            self.write(&format!(" <{url}>"));
        }
        self.write("\n");
        self.flush();
    }

    fn attach_anchor(&mut self, url: &str) -> AnchorId {
        let id = AnchorId(self.next_anchor);
        self.next_anchor += 1;
        self.anchors.insert(id, url.to_string());
        self.pending_urls.push(url.to_string());
        id
    }

    fn append_anchor_text(&mut self, anchor: AnchorId, text: &str) {
        if self.anchors.contains_key(&anchor) {
            self.hide_prompt();
            self.write(text);
        }
    }

    fn render_prompt(&mut self, prompt: &str, before: &str, after: &str) {
        if self.echoed {
            // The tty draws what the user types; only the prompt is ours.
            if !self.prompt_shown {
                self.write(&format!("{CLEAR_LINE}{prompt} "));
                self.prompt_shown = true;
                self.flush();
            }
            return;
        }
        self.write(&format!("{CLEAR_LINE}{prompt} {before}{after}"));
        self.prompt_shown = true;
        self.flush();
    }

    fn clear_prompt(&mut self) {
        if self.prompt_shown && self.echoed {
            self.write(CURSOR_UP);
        }
        self.hide_prompt();
    }

    fn set_disabled(&mut self, disabled: bool) {
        log::debug!("terminal {}", if disabled { "disabled" } else { "enabled" });
    }
}
