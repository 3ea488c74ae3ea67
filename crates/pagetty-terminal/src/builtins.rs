//! Example commands: help and introspection, sleep, search links, history,
//! and fetch-backed script/JSON/resource loading.

use pagetty_types::error::{PagettyError, Result};

use crate::registry::{Command, CommandRegistry};
use crate::script::Script;
use crate::terminal::{Done, Terminal};

/// Register every example command.
pub fn register_builtins(reg: &mut CommandRegistry) {
    reg.register(Box::new(CommandsCmd));
    reg.register(Box::new(HelpCmd));
    reg.register(Box::new(VersionCmd));
    reg.register(Box::new(SleepCmd));
    reg.register(Box::new(GoogleCmd));
    reg.register(Box::new(HistoryCmd));
    reg.register(Box::new(PlayCmd));
    reg.register(Box::new(JsonCmd));
    reg.register(Box::new(LoadCmd));
}

// ---------------------------------------------------------------------------
// commands
// ---------------------------------------------------------------------------

struct CommandsCmd;
impl Command for CommandsCmd {
    fn name(&self) -> &str {
        "commands"
    }
    fn description(&self) -> &str {
        "Just prints a list of all available commands. Use \"help\" for more info."
    }
    fn run(&self, term: &mut Terminal, _args: &str, done: Done) -> Result<()> {
        let names = term.registry().borrow().names().join(", ");
        term.append_line(&format!("All available commands: {names}"));
        done.finish(term);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn description(&self) -> &str {
        "Shows all available commands."
    }
    fn run(&self, term: &mut Terminal, _args: &str, done: Done) -> Result<()> {
        let rows = term.registry().borrow().list_commands();
        let width = rows.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);
        term.append_line("All available commands: ");
        for (name, desc) in rows {
            term.append_line(format!("{name:<width$}  {desc}").trim_end());
        }
        done.finish(term);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

struct VersionCmd;
impl Command for VersionCmd {
    fn name(&self) -> &str {
        "version"
    }
    fn description(&self) -> &str {
        "Displays the version number of this terminal."
    }
    fn run(&self, term: &mut Terminal, _args: &str, done: Done) -> Result<()> {
        term.append_line(env!("CARGO_PKG_VERSION"));
        done.finish(term);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// sleep
// ---------------------------------------------------------------------------

struct SleepCmd;
impl Command for SleepCmd {
    fn name(&self) -> &str {
        "sleep"
    }
    fn description(&self) -> &str {
        "Sleeps for given amount of seconds. Good night."
    }
    fn usage(&self) -> &str {
        "sleep SECONDS"
    }
    fn run(&self, term: &mut Terminal, args: &str, done: Done) -> Result<()> {
        match args.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs >= 0.0 => {
                done.finish_after(term, (secs * 1000.0).round() as u64);
            },
            _ => {
                term.append_line("Usage: sleep SECONDS");
                done.finish(term);
            },
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// google
// ---------------------------------------------------------------------------

struct GoogleCmd;
impl Command for GoogleCmd {
    fn name(&self) -> &str {
        "google"
    }
    fn description(&self) -> &str {
        "Links a google search for the given terms"
    }
    fn usage(&self) -> &str {
        "google TERMS"
    }
    fn run(&self, term: &mut Terminal, args: &str, done: Done) -> Result<()> {
        let terms = args.trim();
        if terms.is_empty() {
            term.append_line("Usage: google your search term");
        } else {
            let link = url::Url::parse_with_params(
                "https://www.google.com/search",
                [("q", terms)],
            )
            .map_err(|e| PagettyError::Command(format!("google: {e}")))?;
            let surface = term.surface_mut();
            let anchor = surface.attach_anchor(link.as_str());
            surface.append_anchor_text(anchor, link.as_str());
            term.new_line();
        }
        done.finish(term);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

struct HistoryCmd;
impl Command for HistoryCmd {
    fn name(&self) -> &str {
        "history"
    }
    fn description(&self) -> &str {
        "Lists previous input. -c clears it."
    }
    fn usage(&self) -> &str {
        "history [-c]"
    }
    fn run(&self, term: &mut Terminal, args: &str, done: Done) -> Result<()> {
        match args.trim() {
            "" => {
                let lines: Vec<String> = term
                    .history()
                    .entries()
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| format!("{:>5}  {entry}", i + 1))
                    .collect();
                for line in lines {
                    term.append_line(&line);
                }
            },
            "-c" => {
                term.history_mut().clear();
                term.append_line("History cleared.");
            },
            _ => term.append_line("Usage: history [-c]"),
        }
        done.finish(term);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// play
// ---------------------------------------------------------------------------

struct PlayCmd;
impl Command for PlayCmd {
    fn name(&self) -> &str {
        "play"
    }
    fn description(&self) -> &str {
        "Fetches a typing script and plays it"
    }
    fn usage(&self) -> &str {
        "play URL"
    }
    fn run(&self, term: &mut Terminal, args: &str, done: Done) -> Result<()> {
        let url = args.trim();
        if url.is_empty() {
            term.append_line("Usage: play URL");
            done.finish(term);
            return Ok(());
        }
        let body = fetch(term, url)?;
        let pause = term.config().typing.blank_line_pause_ms;
        term.play(Script::parse_with_pause(&body, pause), move |t| done.finish(t));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// json
// ---------------------------------------------------------------------------

struct JsonCmd;
impl Command for JsonCmd {
    fn name(&self) -> &str {
        "json"
    }
    fn description(&self) -> &str {
        "Fetches a JSON document and pretty-prints it"
    }
    fn usage(&self) -> &str {
        "json URL"
    }
    fn run(&self, term: &mut Terminal, args: &str, done: Done) -> Result<()> {
        let url = args.trim();
        if url.is_empty() {
            term.append_line("Usage: json URL");
            done.finish(term);
            return Ok(());
        }
        term.append_line(&format!("Fetching: {url}"));
        let body = fetch(term, url)?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| PagettyError::Command(format!("json: {url}: {e}")))?;
        let pretty = serde_json::to_string_pretty(&value)?;
        for line in pretty.lines() {
            term.append_line(line);
        }
        done.finish(term);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

struct LoadCmd;
impl Command for LoadCmd {
    fn name(&self) -> &str {
        "load"
    }
    fn description(&self) -> &str {
        "Loads a js or css file"
    }
    fn usage(&self) -> &str {
        "load FILE_URL"
    }
    fn run(&self, term: &mut Terminal, args: &str, done: Done) -> Result<()> {
        let url = args.trim();
        if url.is_empty() {
            term.append_line("Usage: load FILE_URL");
            done.finish(term);
            return Ok(());
        }
        term.append_line(&format!("Loading script: {url}"));
        let outcome = if url.ends_with(".js") || url.ends_with(".css") {
            fetch(term, url)
        } else {
            Err(PagettyError::Fetch(format!("{url}: not a .js or .css resource")))
        };
        match outcome {
            Ok(body) => {
                log::debug!("loaded {url} ({} bytes)", body.len());
                term.append_line("Done.");
            },
            Err(e) => {
                log::debug!("load failed: {e}");
                term.append_line("Failed. Sorry");
            },
        }
        done.finish(term);
        Ok(())
    }
}

fn fetch(term: &Terminal, url: &str) -> Result<String> {
    let fetcher = term
        .fetcher()
        .ok_or_else(|| PagettyError::Fetch("no fetcher configured".to_string()))?;
    fetcher.fetch(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MapFetcher;
    use crate::surface::{Span, Transcript};
    use pagetty_types::config::TerminalConfig;
    use std::rc::Rc;

    fn term_with(fetcher: MapFetcher) -> (Terminal, Transcript) {
        let transcript = Transcript::new();
        let registry = CommandRegistry::shared();
        register_builtins(&mut registry.borrow_mut());
        let mut t = Terminal::new(
            TerminalConfig::default(),
            registry,
            Box::new(transcript.clone()),
        )
        .with_fetcher(Rc::new(fetcher));
        t.boot();
        (t, transcript)
    }

    fn term() -> (Terminal, Transcript) {
        term_with(MapFetcher::new())
    }

    #[test]
    fn commands_lists_names() {
        let (mut t, out) = term();
        t.eval_input("commands").unwrap();
        assert!(out.has_line(
            "All available commands: commands, google, help, history, json, load, play, sleep, version"
        ));
        assert!(t.is_waiting());
    }

    #[test]
    fn help_aligns_and_shows_aliases() {
        let (mut t, out) = term();
        t.registry().borrow_mut().add_alias("h", "help").unwrap();
        t.eval_input("help").unwrap();
        assert!(out.has_line("All available commands: "));
        assert!(out.has_line("h         Alias for help"));
        assert!(out.has_line("help      Shows all available commands."));
    }

    #[test]
    fn version_prints_crate_version() {
        let (mut t, out) = term();
        t.eval_input("version").unwrap();
        assert!(out.has_line(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn sleep_completes_after_delay() {
        let (mut t, _) = term();
        t.eval_input("sleep 1.5").unwrap();
        assert!(!t.is_waiting());
        t.advance(1499);
        assert!(!t.is_waiting());
        t.advance(1);
        assert!(t.is_waiting());
    }

    #[test]
    fn sleep_without_number_prints_usage() {
        let (mut t, out) = term();
        t.eval_input("sleep soon").unwrap();
        assert!(out.has_line("Usage: sleep SECONDS"));
        assert!(t.is_waiting());
    }

    #[test]
    fn google_renders_encoded_link() {
        let (mut t, out) = term();
        t.eval_input("google rust & terminals").unwrap();
        let url = "https://www.google.com/search?q=rust+%26+terminals";
        let line = out
            .lines()
            .iter()
            .position(|l| l == url)
            .expect("link line");
        assert!(matches!(&out.spans(line)[0], Span::Anchor { url: u, .. } if u == url));
    }

    #[test]
    fn google_without_terms_prints_usage() {
        let (mut t, out) = term();
        t.eval_input("google").unwrap();
        assert!(out.has_line("Usage: google your search term"));
    }

    #[test]
    fn history_lists_and_clears() {
        let (mut t, out) = term();
        t.eval_input("version").unwrap();
        t.eval_input("history").unwrap();
        assert!(out.has_line("    1  version"));
        assert!(out.has_line("    2  history"));
        t.eval_input("history -c").unwrap();
        assert!(out.has_line("History cleared."));
        assert!(t.history().is_empty());
    }

    #[test]
    fn play_runs_fetched_script_then_prompts() {
        let (mut t, out) = term_with(MapFetcher::new().with("intro.txt", "Hi #{SLEEP:100}there"));
        t.eval_input("play intro.txt").unwrap();
        assert!(t.is_playing());
        assert!(!t.is_waiting());
        t.run_until_idle();
        assert!(out.has_line("Hi there"));
        assert!(t.is_waiting());
    }

    #[test]
    fn play_missing_script_fails_the_command() {
        let (mut t, _) = term();
        let err = t.eval_input("play nowhere.txt").unwrap_err();
        assert!(matches!(err, PagettyError::Fetch(_)));
        assert!(t.is_waiting());
    }

    #[test]
    fn json_pretty_prints() {
        let (mut t, out) = term_with(MapFetcher::new().with("data.json", r#"{"a":[1,2]}"#));
        t.eval_input("json data.json").unwrap();
        assert!(out.has_line("Fetching: data.json"));
        assert!(out.has_line("{"));
        assert!(out.has_line("  \"a\": ["));
        assert!(out.has_line("    1,"));
        assert!(out.has_line("}"));
    }

    #[test]
    fn json_parse_error_propagates() {
        let (mut t, _) = term_with(MapFetcher::new().with("bad.json", "{nope"));
        assert!(matches!(
            t.eval_input("json bad.json"),
            Err(PagettyError::Command(ref m)) if m.starts_with("json: bad.json:")
        ));
        assert!(t.is_waiting());
    }

    #[test]
    fn load_reports_outcome() {
        let (mut t, out) = term_with(MapFetcher::new().with("style.css", "body {}"));
        t.eval_input("load style.css").unwrap();
        assert!(out.has_line("Loading script: style.css"));
        assert!(out.has_line("Done."));
        t.eval_input("load missing.js").unwrap();
        assert!(out.has_line("Failed. Sorry"));
    }

    #[test]
    fn load_rejects_other_extensions() {
        let (mut t, out) = term_with(MapFetcher::new().with("page.html", "<p>"));
        t.eval_input("load page.html").unwrap();
        assert!(out.has_line("Failed. Sorry"));
        assert!(!out.has_line("Done."));
    }

    #[test]
    fn google_encodes_non_ascii_terms() {
        let (mut t, out) = term();
        t.eval_input("google über").unwrap();
        assert!(out.has_line("https://www.google.com/search?q=%C3%BCber"));
    }
}
