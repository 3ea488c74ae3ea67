//! pagetty desktop entry point.
//!
//! Reads input a line at a time from stdin, renders to stdout, and maps wall
//! time onto the terminal's scheduler so sleeps and scripted typing play out
//! in real time. `exit` (or end of input) quits.

mod commands;
mod fetcher;
mod input;
mod options;
mod surface;

use std::cell::Cell;
use std::io::IsTerminal;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use input::InputResult;
use pagetty_terminal::{
    CommandRegistry, FileStore, Script, Terminal, XorShiftRng, register_builtins,
};
use pagetty_types::config::TerminalConfig;

/// How long to block on stdin when nothing is scheduled.
const IDLE_POLL: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = options::parse(std::env::args().skip(1))?;
    if opts.help {
        println!("{}", options::USAGE);
        return Ok(());
    }

    let config = match &opts.config {
        Some(path) => TerminalConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TerminalConfig::default(),
    };
    log::info!("Starting pagetty v{}", env!("CARGO_PKG_VERSION"));

    let quit = Rc::new(Cell::new(false));
    let registry = CommandRegistry::shared();
    {
        let mut reg = registry.borrow_mut();
        register_builtins(&mut reg);
        commands::register_app_commands(&mut reg, Rc::clone(&quit));
    }

    let interactive = std::io::stdin().is_terminal();
    let root = opts.root.clone().unwrap_or_else(|| ".".into());
    let mut term = Terminal::new(
        config,
        registry,
        Box::new(surface::WriterSurface::new(std::io::stdout(), interactive)),
    )
    .with_fetcher(Rc::new(fetcher::DirFetcher::new(root)))
    .with_rng(Box::new(XorShiftRng::from_time()));
    if let Some(dir) = &opts.history_dir {
        log::info!("History stored in {}", dir.display());
        term = term.with_store(Box::new(FileStore::new(dir)));
    }
    term.set_error_handler(|t, e| {
        log::warn!("command failed: {e}");
        t.append_line(&format!("error: {e}"));
    });

    match &opts.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            let script = Script::parse_with_pause(&text, term.config().typing.blank_line_pause_ms);
            term.boot_with(move |t, done| {
                t.play(script, move |t| done.finish(t));
            });
        },
        None => term.boot(),
    }

    run(&mut term, spawn_stdin_reader(), &quit);
    println!();
    log::info!("pagetty shut down cleanly");
    Ok(())
}

/// Forward stdin lines over a channel so the main loop can wait on both
/// input and the scheduler.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                },
                Err(e) => {
                    log::warn!("stdin read failed: {e}");
                    break;
                },
            }
        }
    });
    rx
}

fn run(term: &mut Terminal, lines: Receiver<String>, quit: &Cell<bool>) {
    let start = Instant::now();
    let mut eof = false;
    loop {
        let wall = start.elapsed().as_millis() as u64;
        let now = term.now();
        if wall > now {
            term.advance(wall - now);
        }
        if quit.get() {
            break;
        }
        if eof && input::handle_eof(term) == InputResult::Quit {
            break;
        }

        let wait = term
            .next_deadline()
            .map(|d| Duration::from_millis(d.saturating_sub(term.now())))
            .unwrap_or(IDLE_POLL);
        if eof {
            std::thread::sleep(wait);
            continue;
        }
        match lines.recv_timeout(wait) {
            Ok(line) => {
                if input::handle_line(term, &line) == InputResult::Quit {
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => {},
            Err(RecvTimeoutError::Disconnected) => eof = true,
        }
    }
}
