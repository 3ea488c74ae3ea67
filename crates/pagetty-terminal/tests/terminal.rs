//! End-to-end terminal behaviour: typing, dispatch, aliases, pattern
//! commands, error handling, history navigation, and script playback.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pagetty_terminal::{
    CommandRegistry, FnPattern, InputState, KvStore, MemoryStore, NamedCommand, Script,
    SharedRegistry, Terminal, Transcript, register_builtins,
};
use pagetty_types::config::TerminalConfig;
use pagetty_types::error::PagettyError;
use pagetty_types::input::Key;

fn registry() -> SharedRegistry {
    let reg = CommandRegistry::shared();
    {
        let mut r = reg.borrow_mut();
        register_builtins(&mut r);
        r.register(Box::new(
            NamedCommand::new("echo", |term, args, done| {
                term.append_line(args);
                done.finish(term);
                Ok(())
            })
            .description("Print arguments"),
        ));
        r.register(Box::new(NamedCommand::new("breakingbad", |_, _, _| {
            Err(PagettyError::Command("bad".into()))
        })));
    }
    reg
}

fn booted(reg: SharedRegistry) -> (Terminal, Transcript) {
    let out = Transcript::new();
    let mut term = Terminal::new(TerminalConfig::default(), reg, Box::new(out.clone()));
    term.boot();
    (term, out)
}

fn type_line(term: &mut Terminal, line: &str) {
    term.handle_keys(Key::from_text(line)).unwrap();
    term.handle_key(Key::Enter).unwrap();
}

fn flag() -> (Rc<Cell<bool>>, Rc<Cell<bool>>) {
    let f = Rc::new(Cell::new(false));
    (Rc::clone(&f), f)
}

#[test]
fn echo_hi_end_to_end() {
    let (mut term, out) = booted(registry());
    type_line(&mut term, "echo hi");
    assert_eq!(out.finished_lines(), vec!["$ echo hi", "hi"]);
    assert!(term.is_waiting());
    assert_eq!(out.prompt().unwrap().line(), "$ ");
}

#[test]
fn unknown_command_is_reported_inline() {
    let (mut term, out) = booted(registry());
    type_line(&mut term, "zzz");
    assert!(out.has_line("zzz: Command not found"));
    assert!(term.is_waiting());
}

#[test]
fn on_start_hook_delays_first_prompt() {
    let out = Transcript::new();
    let mut term = Terminal::new(
        TerminalConfig::default(),
        registry(),
        Box::new(out.clone()),
    );
    let held = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&held);
    term.boot_with(move |_, done| {
        *slot.borrow_mut() = Some(done);
    });
    assert_eq!(term.state(), InputState::Booting);
    assert!(out.prompt().is_none());

    let done = held.borrow_mut().take().unwrap();
    done.finish(&mut term);
    assert!(term.is_waiting());
    assert!(out.prompt().is_some());
}

#[test]
fn welcome_script_then_prompt() {
    let out = Transcript::new();
    let mut term = Terminal::new(
        TerminalConfig::default(),
        registry(),
        Box::new(out.clone()),
    );
    term.boot_with(|t, done| {
        t.play(Script::parse("Welcome!"), move |t| done.finish(t));
    });
    term.run_until_idle();
    assert!(out.has_line("Welcome!"));
    assert!(term.is_waiting());
}

#[test]
fn failing_command_propagates_without_handler() {
    let (mut term, _) = booted(registry());
    let err = term.eval_input("breakingbad").unwrap_err();
    assert!(matches!(err, PagettyError::Command(ref m) if m == "bad"));
    assert!(term.is_waiting());
}

#[test]
fn failing_command_reaches_error_handler() {
    let (mut term, out) = booted(registry());
    let (called, seen) = flag();
    term.set_error_handler(move |t, e| {
        called.set(true);
        t.append_line(&format!("error: {e}"));
    });
    assert!(term.eval_input("breakingbad").is_ok());
    assert!(seen.get());
    assert!(out.has_line("error: command error: bad"));
    assert!(term.is_waiting());
}

#[test]
fn aliases_from_list_and_string() {
    let reg = registry();
    let (called, seen) = flag();
    reg.borrow_mut().register(Box::new(
        NamedCommand::new("test", move |term, _, done| {
            called.set(true);
            done.finish(term);
            Ok(())
        })
        .alias("testing")
        .alias("testen"),
    ));
    reg.borrow_mut().add_alias("mytest", "test").unwrap();
    let (mut term, _) = booted(reg);

    for token in ["test", "testing", "testen", "mytest"] {
        seen.set(false);
        term.eval_input(token).unwrap();
        assert!(seen.get(), "{token} should run test");
    }
}

#[test]
fn pattern_sees_token_and_args() {
    let reg = registry();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    reg.borrow_mut().add_pattern(Box::new(FnPattern::new(
        move |token, args| {
            log.borrow_mut().push((token.to_string(), args.to_string()));
            true
        },
        |term, _, done, _| {
            done.finish(term);
            Ok(())
        },
    )));
    let (mut term, _) = booted(reg);
    term.eval_input("testing it good").unwrap();
    assert_eq!(
        seen.borrow().as_slice(),
        &[("testing".to_string(), "it good".to_string())]
    );
}

#[test]
fn pattern_suppresses_named_command() {
    let reg = registry();
    let (ran, pattern_ran) = flag();
    let id = reg.borrow_mut().add_pattern(Box::new(FnPattern::new(
        |_, _| true,
        move |term, _, done, _| {
            ran.set(true);
            done.finish(term);
            Ok(())
        },
    )));
    let (mut term, out) = booted(Rc::clone(&reg));
    term.eval_input("echo hidden").unwrap();
    assert!(pattern_ran.get());
    assert!(!out.has_line("hidden"));

    reg.borrow_mut().remove_pattern(id);
    term.eval_input("echo shown").unwrap();
    assert!(out.has_line("shown"));
}

#[test]
fn pattern_next_runs_named_command() {
    let reg = registry();
    let (ran, pattern_ran) = flag();
    reg.borrow_mut().add_pattern(Box::new(FnPattern::new(
        |_, _| true,
        move |term, _, done, next| {
            ran.set(true);
            assert_eq!(next.token(), "echo");
            next.run(term, done)
        },
    )));
    let (mut term, out) = booted(reg);
    term.eval_input("echo through").unwrap();
    assert!(pattern_ran.get());
    assert!(out.has_line("through"));
    assert!(term.is_waiting());
}

#[test]
fn pattern_next_for_unknown_token_reports_not_found() {
    let reg = registry();
    reg.borrow_mut().add_pattern(Box::new(FnPattern::new(
        |token, _| token.starts_with('x'),
        |term, _, done, next| next.run(term, done),
    )));
    let (mut term, out) = booted(reg);
    term.eval_input("xyz").unwrap();
    assert!(out.has_line("xyz: Command not found"));
    assert!(term.is_waiting());
}

#[test]
fn false_pattern_does_not_run() {
    let reg = registry();
    let (ran, pattern_ran) = flag();
    reg.borrow_mut().add_pattern(Box::new(FnPattern::new(
        |_, _| false,
        move |term, _, done, next| {
            ran.set(true);
            next.run(term, done)
        },
    )));
    let (mut term, out) = booted(reg);
    term.eval_input("echo plain").unwrap();
    assert!(!pattern_ran.get());
    assert!(out.has_line("plain"));
}

#[test]
fn commands_can_be_removed_between_dispatches() {
    let reg = registry();
    let (mut term, out) = booted(Rc::clone(&reg));
    assert!(reg.borrow_mut().remove_command("echo"));
    assert!(!reg.borrow_mut().remove_command("echo"));
    term.eval_input("echo gone").unwrap();
    assert!(out.has_line("echo: Command not found"));
}

#[test]
fn history_navigation_with_arrow_keys() {
    let (mut term, out) = booted(registry());
    type_line(&mut term, "echo one");
    type_line(&mut term, "echo two");

    term.handle_keys(Key::from_text("draft")).unwrap();
    term.handle_key(Key::Up).unwrap();
    assert_eq!(term.input(), "echo two");
    term.handle_key(Key::Up).unwrap();
    assert_eq!(term.input(), "echo one");
    term.handle_key(Key::Up).unwrap();
    assert_eq!(term.input(), "echo one");
    term.handle_key(Key::Down).unwrap();
    assert_eq!(term.input(), "echo two");
    term.handle_key(Key::Down).unwrap();
    assert_eq!(term.input(), "draft");
    term.handle_key(Key::Down).unwrap();
    assert_eq!(term.input(), "draft");
    assert_eq!(out.prompt().unwrap().line(), "$ draft");
}

#[test]
fn editing_a_recalled_entry_resets_cursor() {
    let (mut term, _) = booted(registry());
    type_line(&mut term, "echo one");
    term.handle_key(Key::Up).unwrap();
    term.handle_key(Key::Char('!')).unwrap();
    assert!(term.history().is_at_end());
    term.handle_key(Key::Down).unwrap();
    assert_eq!(term.input(), "echo one!");
}

#[test]
fn disabled_terminal_buffers_but_ignores_enter() {
    let (mut term, out) = booted(registry());
    term.disable();
    assert!(out.is_disabled());
    term.handle_keys(Key::from_text("echo later\n")).unwrap();
    term.handle_key(Key::Up).unwrap();
    assert_eq!(term.state(), InputState::Disabled);
    assert!(!out.has_line("later"));

    term.enable();
    assert!(term.is_waiting());
    assert!(!out.is_disabled());
    assert_eq!(term.input(), "echo later");
    term.handle_key(Key::Enter).unwrap();
    assert!(out.has_line("later"));
}

#[test]
fn command_finishing_while_disabled_resumes_waiting() {
    let (mut term, _) = booted(registry());
    term.eval_input("sleep 1").unwrap();
    term.disable();
    term.advance(1000);
    assert_eq!(term.state(), InputState::Disabled);
    term.enable();
    assert!(term.is_waiting());
}

#[test]
fn keys_during_processing_are_buffered() {
    let (mut term, out) = booted(registry());
    type_line(&mut term, "sleep 0.5");
    assert_eq!(term.state(), InputState::Processing);
    term.handle_keys(Key::from_text("echo queued")).unwrap();
    term.handle_key(Key::Enter).unwrap();
    assert!(!out.has_line("queued"));
    term.advance(500);
    assert!(term.is_waiting());
    assert_eq!(term.input(), "echo queued");
}

#[test]
fn speed_keys_go_to_playback_not_the_line() {
    let out = Transcript::new();
    let mut term = Terminal::new(TerminalConfig::default(), registry(), Box::new(out.clone()));
    term.boot_with(|t, done| {
        t.play(Script::parse("#{SLEEP:10000}fast"), move |t| done.finish(t));
    });
    term.handle_key(Key::Char(' ')).unwrap();
    term.handle_key(Key::Enter).unwrap();
    assert_eq!(term.input(), "");
    let start = term.now();
    term.run_until_idle();
    assert!(term.now() - start < 100);
    assert!(out.has_line("fast"));
    assert!(!term.is_playing());
    assert!(term.is_waiting());
}

#[test]
fn background_playback_does_not_eat_prompt_keys() {
    let (mut term, out) = booted(registry());
    let id = term.play(Script::parse("background #{SLEEP:100000}"), |_| {});
    term.handle_keys(Key::from_text("echo a b")).unwrap();
    assert_eq!(term.input(), "echo a b");
    assert!(term.playback_speed(id).is_some_and(|s| s.is_instant()));
    term.handle_key(Key::Enter).unwrap();
    assert!(out.has_line("$ echo a b"));
    assert!(out.has_line("a b"));
}

#[test]
fn history_persists_across_terminals() {
    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<MemoryStore>>);
    impl KvStore for Shared {
        fn write(&mut self, k: &str, v: &str) -> pagetty_types::error::Result<()> {
            self.0.borrow_mut().write(k, v)
        }
        fn read(&self, k: &str) -> pagetty_types::error::Result<Option<String>> {
            self.0.borrow().read(k)
        }
        fn remove(&mut self, k: &str) -> pagetty_types::error::Result<()> {
            self.0.borrow_mut().remove(k)
        }
    }

    let store = Shared::default();
    let reg = registry();
    {
        let mut term = Terminal::new(
            TerminalConfig::default(),
            Rc::clone(&reg),
            Box::new(Transcript::new()),
        )
        .with_store(Box::new(store.clone()));
        term.boot();
        type_line(&mut term, "echo saved");
    }
    let mut term = Terminal::new(TerminalConfig::default(), reg, Box::new(Transcript::new()))
        .with_store(Box::new(store));
    term.boot();
    assert!(term.history().is_persistent());
    term.handle_key(Key::Up).unwrap();
    assert_eq!(term.input(), "echo saved");
}

#[test]
fn custom_prompt_from_config() {
    let config = TerminalConfig::from_toml_str("prompt = \">\"").unwrap();
    let out = Transcript::new();
    let mut term = Terminal::new(config, registry(), Box::new(out.clone()));
    term.boot();
    type_line(&mut term, "echo x");
    assert!(out.has_line("> echo x"));
}
