//! Auto-typing scripts.
//!
//! A script is plain text, one output line per input line, with inline
//! directives of the form `#{TYPE}` or `#{TYPE:ARGS}`:
//!
//! ```text
//! Welcome!#{SLEEP:500} Type #{PRINT:help} to begin.#{HTML:&nbsp;}
//! Source: <a href="https://example.com">example.com</a>
//! ```
//!
//! Text between directives is typed character by character. Anchors written
//! as `<a href="URL">TEXT</a>` become `LINK` directives; every other markup
//! tag on the line, directive arguments included, is dropped before the
//! directive scan. Playback lives in [`player`].

pub mod player;

use std::sync::OnceLock;

use regex::Regex;

/// Pause inserted for a line that produced no commands.
pub const DEFAULT_BLANK_PAUSE_MS: u64 = 400;

/// One step of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    /// Type text into the current line.
    Print(String),
    /// Wait for the given number of milliseconds.
    Sleep(u64),
    /// Type `text` into an anchor pointing at `url`.
    Link { url: String, text: String },
    /// Insert markup at once.
    Html(String),
    /// Start a new output line.
    LineBreak,
    /// A directive type nobody handles. Completes immediately.
    Unknown(String),
}

/// A parsed script: lines of commands, each line ending in
/// [`ScriptCommand::LineBreak`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<Vec<ScriptCommand>>,
}

fn directive_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"#\{(.*?)(:(.*?))?\}").expect("directive regex must compile")
    })
}

fn anchor_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r#"<a href="(.*?)">(.*?)</a>"#).expect("anchor regex must compile")
    })
}

fn tag_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"<.*?>").expect("tag regex must compile"))
}

impl Script {
    /// Parse script text with the default blank-line pause.
    pub fn parse(text: &str) -> Self {
        Self::parse_with_pause(text, DEFAULT_BLANK_PAUSE_MS)
    }

    /// Parse script text; lines without content pause for `pause_ms`.
    pub fn parse_with_pause(text: &str, pause_ms: u64) -> Self {
        let lines = text
            .trim()
            .split('\n')
            .map(|line| parse_line(line, pause_ms))
            .collect();
        Self { lines }
    }

    /// Parsed lines in order.
    pub fn lines(&self) -> &[Vec<ScriptCommand>] {
        &self.lines
    }

    /// Command `cmd` of line `line`.
    pub fn get(&self, line: usize, cmd: usize) -> Option<&ScriptCommand> {
        self.lines.get(line)?.get(cmd)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of commands across all lines.
    pub fn command_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }
}

fn parse_line(line: &str, pause_ms: u64) -> Vec<ScriptCommand> {
    let line = anchor_regex().replace_all(line.trim(), "#{LINK:${1};${2}}");
    let line = tag_regex().replace_all(&line, "");
    let mut commands = Vec::new();
    let mut last = 0;
    for caps in directive_regex().captures_iter(&line) {
        let Some(whole) = caps.get(0) else { continue };
        push_print(&mut commands, &line[last..whole.start()]);
        let kind = caps.get(1).map_or("", |m| m.as_str());
        let arg = caps.get(3).map(|m| m.as_str());
        commands.push(directive(kind, arg));
        last = whole.end();
    }
    push_print(&mut commands, &line[last..]);

    if commands.is_empty() {
        commands.push(ScriptCommand::Sleep(pause_ms));
    }
    commands.push(ScriptCommand::LineBreak);
    commands
}

fn push_print(commands: &mut Vec<ScriptCommand>, text: &str) {
    if !text.is_empty() {
        commands.push(ScriptCommand::Print(text.to_string()));
    }
}

fn directive(kind: &str, arg: Option<&str>) -> ScriptCommand {
    let arg = arg.unwrap_or("");
    match kind {
        "PRINT" => ScriptCommand::Print(arg.to_string()),
        "SLEEP" => ScriptCommand::Sleep(leading_millis(arg)),
        "HTML" => ScriptCommand::Html(arg.to_string()),
        "LINEBREAK" => ScriptCommand::LineBreak,
        "LINK" => {
            let (url, text) = arg.split_once(';').unwrap_or((arg, ""));
            let text = if text.is_empty() { url } else { text };
            ScriptCommand::Link {
                url: url.to_string(),
                text: text.to_string(),
            }
        },
        other => ScriptCommand::Unknown(other.to_string()),
    }
}

/// Leading decimal digits of `arg`, 0 when there are none.
fn leading_millis(arg: &str) -> u64 {
    let arg = arg.trim_start();
    let digits = arg.len() - arg.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return 0;
    }
    arg[..digits].parse().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::ScriptCommand::*;
    use super::*;

    fn p(s: &str) -> ScriptCommand {
        Print(s.to_string())
    }

    #[test]
    fn sleep_between_text() {
        let script = Script::parse("Hello #{SLEEP:500}world");
        assert_eq!(
            script.lines(),
            &[vec![p("Hello "), Sleep(500), p("world"), LineBreak]]
        );
    }

    #[test]
    fn blank_line_pauses() {
        let script = Script::parse("one\n\ntwo");
        assert_eq!(script.len(), 3);
        assert_eq!(script.lines()[1], vec![Sleep(400), LineBreak]);
        assert_eq!(script.lines()[2], vec![p("two"), LineBreak]);
    }

    #[test]
    fn configured_blank_pause() {
        let script = Script::parse_with_pause("a\n   \nb", 250);
        assert_eq!(script.lines()[1], vec![Sleep(250), LineBreak]);
    }

    #[test]
    fn whole_text_and_lines_are_trimmed() {
        let script = Script::parse("\n\n  first  \n  second\n\n");
        assert_eq!(
            script.lines(),
            &[vec![p("first"), LineBreak], vec![p("second"), LineBreak]]
        );
    }

    #[test]
    fn empty_text_is_one_pause_line() {
        let script = Script::parse("");
        assert_eq!(script.lines(), &[vec![Sleep(400), LineBreak]]);
    }

    #[test]
    fn directive_only_line_has_no_implicit_pause() {
        let script = Script::parse("#{SLEEP:1000}");
        assert_eq!(script.lines(), &[vec![Sleep(1000), LineBreak]]);
    }

    #[test]
    fn anchor_tag_becomes_link() {
        let script = Script::parse(r#"see <a href="https://example.com">the site</a>!"#);
        assert_eq!(
            script.lines()[0],
            vec![
                p("see "),
                Link {
                    url: "https://example.com".into(),
                    text: "the site".into(),
                },
                p("!"),
                LineBreak,
            ]
        );
    }

    #[test]
    fn link_directive_text_defaults_to_url() {
        let script = Script::parse("#{LINK:https://a.example}");
        assert_eq!(
            script.lines()[0][0],
            Link {
                url: "https://a.example".into(),
                text: "https://a.example".into(),
            }
        );
    }

    #[test]
    fn other_tags_are_stripped_from_the_whole_line() {
        let script = Script::parse("<b>bold</b> and #{HTML:<i>plain</i>}");
        assert_eq!(
            script.lines()[0],
            vec![p("bold and "), Html("plain".into()), LineBreak]
        );
    }

    #[test]
    fn tags_inside_anchor_text_are_stripped() {
        let script = Script::parse(r#"<a href="u"><b>x</b></a>"#);
        assert_eq!(
            script.lines()[0],
            vec![
                Link {
                    url: "u".into(),
                    text: "x".into(),
                },
                LineBreak,
            ]
        );
    }

    #[test]
    fn line_of_only_tags_pauses() {
        let script = Script::parse("<br>");
        assert_eq!(script.lines()[0], vec![Sleep(400), LineBreak]);
    }

    #[test]
    fn print_directive_keeps_semicolons() {
        let script = Script::parse("#{PRINT:a;b;c}");
        assert_eq!(script.lines()[0][0], p("a;b;c"));
    }

    #[test]
    fn sleep_argument_parsing() {
        assert_eq!(leading_millis("250"), 250);
        assert_eq!(leading_millis("250ms"), 250);
        assert_eq!(leading_millis(" 7"), 7);
        assert_eq!(leading_millis("abc"), 0);
        assert_eq!(leading_millis(""), 0);
        assert_eq!(Script::parse("#{SLEEP}").lines()[0][0], Sleep(0));
    }

    #[test]
    fn unknown_and_lowercase_types_are_inert() {
        let script = Script::parse("#{BEEP:3}#{sleep:10}");
        assert_eq!(
            script.lines()[0],
            vec![Unknown("BEEP".into()), Unknown("sleep".into()), LineBreak]
        );
    }

    #[test]
    fn explicit_linebreak_directive() {
        let script = Script::parse("a#{LINEBREAK}b");
        assert_eq!(script.lines()[0], vec![p("a"), LineBreak, p("b"), LineBreak]);
    }

    #[test]
    fn accessors() {
        let script = Script::parse("a\nb #{SLEEP:1}");
        assert_eq!(script.get(1, 1), Some(&Sleep(1)));
        assert_eq!(script.get(2, 0), None);
        assert_eq!(script.command_count(), 5);
        assert!(!script.is_empty());
        assert!(Script::default().is_empty());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_line_ends_with_one_linebreak(
                lines in proptest::collection::vec("[a-z ]{0,12}", 1..10),
            ) {
                let text = lines.join("\n");
                let script = Script::parse(&text);
                prop_assert_eq!(script.len(), text.trim().split('\n').count());
                for line in script.lines() {
                    prop_assert_eq!(line.last(), Some(&LineBreak));
                    prop_assert_eq!(
                        line.iter().filter(|c| **c == LineBreak).count(),
                        1
                    );
                }
            }

            #[test]
            fn plain_text_is_preserved(line in "[a-zA-Z0-9][a-zA-Z0-9 ,.!?]{0,30}[a-zA-Z0-9]") {
                let script = Script::parse(&line);
                prop_assert_eq!(
                    script.lines(),
                    &[vec![Print(line.clone()), LineBreak]]
                );
            }

            #[test]
            fn sleep_values_round_trip(ms in 0u64..1_000_000) {
                let script = Script::parse(&format!("x#{{SLEEP:{ms}}}"));
                prop_assert_eq!(script.get(0, 1), Some(&Sleep(ms)));
            }
        }
    }
}
