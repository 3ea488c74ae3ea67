use pagetty_terminal::Terminal;
use pagetty_types::input::Key;

/// Result of handling one line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Quit,
}

/// Feed a line read from stdin as typed keys followed by Enter.
///
/// Lines arrive whole, so an empty line is a bare Enter (which also speeds
/// up a running script).
pub fn handle_line(term: &mut Terminal, line: &str) -> InputResult {
    let keys = Key::from_text(line).into_iter().chain([Key::Enter]);
    for key in keys {
        if let Err(e) = term.handle_key(key) {
            log::error!("{e}");
            term.append_line(&format!("error: {e}"));
        }
    }
    InputResult::Continue
}

/// Translate end of input: quit once nothing is left to run.
pub fn handle_eof(term: &Terminal) -> InputResult {
    if term.is_idle() && !term.is_playing() {
        InputResult::Quit
    } else {
        InputResult::Continue
    }
}
