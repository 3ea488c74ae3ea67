//! The input/eval state machine.
//!
//! A [`Terminal`] owns the line buffer, the history, the scheduler, and the
//! output surface. Keys arrive through [`Terminal::handle_key`]; a submitted
//! line is tokenised, resolved against the shared registry, and handed to a
//! command together with a [`Done`] token. The prompt comes back when that
//! token is finished, which may be immediately or from a scheduled task.

use std::collections::BTreeMap;
use std::rc::Rc;

use pagetty_types::config::TerminalConfig;
use pagetty_types::error::{PagettyError, Result};
use pagetty_types::input::Key;
use rand_core::RngCore;

use crate::fetch::Fetcher;
use crate::history::History;
use crate::line_buffer::LineBuffer;
use crate::registry::{Resolved, SharedRegistry};
use crate::scheduler::{self, Scheduler};
use crate::script::player::{Playback, PlaybackId, XorShiftRng};
use crate::store::KvStore;
use crate::surface::Surface;

/// Called with every command failure when installed; the failure is then
/// treated as handled.
pub type ErrorHandler = Box<dyn FnMut(&mut Terminal, &PagettyError)>;

/// Where the terminal is in its input cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Before the first prompt, while an on-start hook runs.
    Booting,
    /// Prompt shown, keys edit the line.
    Waiting,
    /// A command is running.
    Processing,
    /// Input is buffered but Enter and history keys are ignored.
    Disabled,
}

/// Completion token handed to every dispatch.
///
/// Finishing it returns the terminal to its prompt. It can only be finished
/// once; a token from a dispatch that already completed is ignored.
#[must_use = "call `finish` to return the terminal to its prompt"]
#[derive(Debug)]
pub struct Done {
    generation: u64,
}

impl Done {
    /// Complete the dispatch and bring the prompt back.
    pub fn finish(self, term: &mut Terminal) {
        term.complete(self.generation);
    }

    /// Finish after `delay_ms` on the terminal's clock.
    pub fn finish_after(self, term: &mut Terminal, delay_ms: u64) {
        term.schedule(delay_ms, move |t| self.finish(t));
    }

    /// Fail a dispatch whose work outlived `run`, such as a scheduled task.
    ///
    /// The error handler sees `err` and the prompt returns. With no handler
    /// installed the error is logged.
    pub fn fail(self, term: &mut Terminal, err: PagettyError) {
        let generation = self.generation;
        if let Err(e) = term.recover(generation, err) {
            log::error!("dispatch #{generation} failed: {e}");
        }
    }
}

/// Continuation given to pattern commands: runs the regular command for the
/// same input.
#[derive(Debug)]
pub struct Next {
    token: String,
    args: String,
}

impl Next {
    /// The first word of the input.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Everything after the first space.
    pub fn args(&self) -> &str {
        &self.args
    }

    /// Dispatch to the named command (or alias) for this token, bypassing
    /// pattern commands. Unknown tokens report "Command not found".
    pub fn run(self, term: &mut Terminal, done: Done) -> Result<()> {
        term.run_named(&self.token, &self.args, done).map(|_| ())
    }
}

/// One interactive terminal session.
pub struct Terminal {
    config: TerminalConfig,
    registry: SharedRegistry,
    surface: Box<dyn Surface>,
    history: History,
    line: LineBuffer,
    temp_input: Option<String>,
    state: InputState,
    resume_state: InputState,
    hidden: bool,
    generation: u64,
    in_flight: Option<u64>,
    scheduler: Scheduler<Terminal>,
    pub(crate) playbacks: BTreeMap<PlaybackId, Playback>,
    pub(crate) next_playback: u64,
    pub(crate) rng: Box<dyn RngCore>,
    fetcher: Option<Rc<dyn Fetcher>>,
    on_error: Option<ErrorHandler>,
}

fn scheduler_of(term: &mut Terminal) -> &mut Scheduler<Terminal> {
    &mut term.scheduler
}

impl Terminal {
    /// A terminal with memory-only history. Call [`boot`](Self::boot) or
    /// [`boot_with`](Self::boot_with) to show the first prompt.
    pub fn new(config: TerminalConfig, registry: SharedRegistry, surface: Box<dyn Surface>) -> Self {
        let history = History::new(config.history_limit);
        Self {
            config,
            registry,
            surface,
            history,
            line: LineBuffer::new(),
            temp_input: None,
            state: InputState::Booting,
            resume_state: InputState::Booting,
            hidden: false,
            generation: 0,
            in_flight: None,
            scheduler: Scheduler::new(),
            playbacks: BTreeMap::new(),
            next_playback: 0,
            rng: Box::new(XorShiftRng::default()),
            fetcher: None,
            on_error: None,
        }
    }

    /// Persist history through `store` under the configured key.
    pub fn with_store(mut self, store: Box<dyn KvStore>) -> Self {
        self.history = History::open(self.config.history_limit, &self.config.history_key, store);
        self
    }

    /// Use `fetcher` for commands that load resources.
    pub fn with_fetcher(mut self, fetcher: Rc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the jitter source used by script playback.
    pub fn with_rng(mut self, rng: Box<dyn RngCore>) -> Self {
        self.rng = rng;
        self
    }

    /// Route command failures to `handler` instead of returning them.
    pub fn set_error_handler(&mut self, handler: impl FnMut(&mut Terminal, &PagettyError) + 'static) {
        self.on_error = Some(Box::new(handler));
    }

    /// Return command failures from `eval_input` again.
    pub fn clear_error_handler(&mut self) {
        self.on_error = None;
    }

    // -- Accessors ----------------------------------------------------------

    /// Active configuration.
    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    /// Handle to the shared command registry.
    pub fn registry(&self) -> SharedRegistry {
        Rc::clone(&self.registry)
    }

    /// The configured fetcher, if any.
    pub fn fetcher(&self) -> Option<Rc<dyn Fetcher>> {
        self.fetcher.as_ref().map(Rc::clone)
    }

    /// Input history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Mutable input history.
    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Current input state.
    pub fn state(&self) -> InputState {
        self.state
    }

    /// True exactly when the prompt is waiting for input.
    pub fn is_waiting(&self) -> bool {
        self.state == InputState::Waiting
    }

    /// True while a dispatch has not completed.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The line being edited.
    pub fn input(&self) -> &str {
        self.line.text()
    }

    /// True when input is masked.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Hidden mode masks the echo with `*` and keeps input out of history.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
        if self.state == InputState::Waiting {
            self.render_prompt();
        }
    }

    // -- Output -------------------------------------------------------------

    /// The rendering surface.
    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        self.surface.as_mut()
    }

    /// Append text to the current output line.
    pub fn append(&mut self, text: &str) {
        self.surface.append_text(text);
    }

    /// Append text and end the line.
    pub fn append_line(&mut self, text: &str) {
        self.surface.append_text(text);
        self.surface.new_line();
    }

    /// Append markup to the current output line.
    pub fn append_markup(&mut self, markup: &str) {
        self.surface.append_markup(markup);
    }

    /// End the current output line.
    pub fn new_line(&mut self) {
        self.surface.new_line();
    }

    // -- Time ---------------------------------------------------------------

    /// Run `task` after `delay_ms` on the terminal's clock.
    pub fn schedule(&mut self, delay_ms: u64, task: impl FnOnce(&mut Terminal) + 'static) {
        self.scheduler.schedule(delay_ms, Box::new(task));
    }

    /// Move the clock forward, running every task that comes due.
    pub fn advance(&mut self, ms: u64) -> usize {
        scheduler::advance(self, ms, scheduler_of)
    }

    /// Run scheduled tasks until none remain.
    pub fn run_until_idle(&mut self) -> usize {
        scheduler::run_until_idle(self, scheduler_of)
    }

    /// Current time on the terminal's clock, in milliseconds.
    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// When the earliest scheduled task is due.
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    /// No scheduled work and no command in flight.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle() && self.in_flight.is_none()
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Show the first prompt.
    pub fn boot(&mut self) {
        self.prompt();
    }

    /// Run `hook` before the first prompt. The prompt appears once the hook
    /// finishes its [`Done`].
    pub fn boot_with(&mut self, hook: impl FnOnce(&mut Terminal, Done)) {
        let done = self.begin(InputState::Booting);
        hook(self, done);
    }

    /// Stop Enter and history keys from acting until [`Terminal::enable`].
    pub fn disable(&mut self) {
        if self.state == InputState::Disabled {
            return;
        }
        self.resume_state = self.state;
        self.state = InputState::Disabled;
        self.surface.set_disabled(true);
    }

    /// Return to the state held before [`disable`](Self::disable), keeping
    /// anything typed meanwhile.
    pub fn enable(&mut self) {
        if self.state != InputState::Disabled {
            return;
        }
        self.state = self.resume_state;
        self.surface.set_disabled(false);
        if self.state == InputState::Waiting {
            self.render_prompt();
        }
    }

    // -- Input --------------------------------------------------------------

    /// Feed one key event.
    ///
    /// While a script is playing, Enter and Space speed it up. At the prompt
    /// the key still reaches the line; otherwise it is consumed.
    pub fn handle_key(&mut self, key: Key) -> Result<()> {
        if key.is_speed_up()
            && self.speed_up_playbacks()
            && self.state != InputState::Waiting
        {
            return Ok(());
        }
        match self.state {
            InputState::Waiting => self.handle_prompt_key(key),
            InputState::Booting | InputState::Processing | InputState::Disabled => {
                if key.is_edit() {
                    self.line.apply(key);
                }
                Ok(())
            },
        }
    }

    /// Feed every key in `keys`, stopping at the first error.
    pub fn handle_keys(&mut self, keys: impl IntoIterator<Item = Key>) -> Result<()> {
        for key in keys {
            self.handle_key(key)?;
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: Key) -> Result<()> {
        match key {
            Key::Enter => return self.submit(),
            Key::Up => {
                if let Some(entry) = self.history.prev().map(str::to_string) {
                    self.line.set(&entry);
                }
            },
            Key::Down => {
                let recalled = match self.history.next() {
                    Ok(Some(entry)) => Some(entry.to_string()),
                    Ok(None) | Err(PagettyError::HistoryAtEnd) => None,
                    Err(e) => return Err(e),
                };
                match recalled {
                    Some(entry) => self.line.set(&entry),
                    None => {
                        let typed = self.temp_input.clone().unwrap_or_default();
                        self.line.set(&typed);
                    },
                }
            },
            edit => {
                self.line.apply(edit);
                self.temp_input = Some(self.line.text().to_string());
                self.history.to_end();
            },
        }
        self.render_prompt();
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        let input = self.line.take();
        self.temp_input = None;
        let echo = if self.hidden { mask(&input) } else { input.clone() };
        self.surface.clear_prompt();
        self.surface.append_text(&format!("{} {echo}", self.config.prompt));
        self.surface.new_line();
        self.eval_input(&input)
    }

    /// Evaluate a line as if it had been typed and submitted.
    ///
    /// Command failures reach the error handler when one is installed and are
    /// returned otherwise. Fails with [`PagettyError::Busy`] while another
    /// command is in flight.
    pub fn eval_input(&mut self, input: &str) -> Result<()> {
        if self.in_flight.is_some() {
            return Err(PagettyError::Busy);
        }
        let input = input.trim();
        if input.is_empty() {
            self.prompt();
            return Ok(());
        }
        if !self.hidden {
            self.history.add(input);
        }
        self.history.to_end();

        let (token, args) = split_command(input);
        let done = self.begin(InputState::Processing);
        let generation = self.generation;
        log::debug!("dispatch #{generation}: {token:?}");
        match self.dispatch(token, args, done) {
            Ok(_) => Ok(()),
            Err(e) => self.recover(generation, e),
        }
    }

    fn dispatch(&mut self, token: &str, args: &str, done: Done) -> Result<bool> {
        let resolved = self.registry.borrow().resolve(token, args);
        match resolved {
            Some(Resolved::Pattern(cmd)) => {
                let next = Next {
                    token: token.to_string(),
                    args: args.to_string(),
                };
                cmd.run(self, args, done, next)?;
                Ok(true)
            },
            Some(Resolved::Named(cmd)) => {
                cmd.run(self, args, done)?;
                Ok(true)
            },
            None => {
                self.not_found(token, done);
                Ok(false)
            },
        }
    }

    /// Run the named command (or alias) for `token`, skipping pattern
    /// commands. Returns whether a command was found; an unknown token is
    /// reported in the transcript and `done` is finished.
    pub fn run_named(&mut self, token: &str, args: &str, done: Done) -> Result<bool> {
        let cmd = self.registry.borrow().resolve_named(token);
        match cmd {
            Some(cmd) => {
                cmd.run(self, args, done)?;
                Ok(true)
            },
            None => {
                self.not_found(token, done);
                Ok(false)
            },
        }
    }

    fn not_found(&mut self, token: &str, done: Done) {
        self.append_line(&format!("{token}: Command not found"));
        done.finish(self);
    }

    fn recover(&mut self, generation: u64, err: PagettyError) -> Result<()> {
        log::debug!("dispatch #{generation} failed: {err}");
        let handled = match self.on_error.take() {
            Some(mut handler) => {
                handler(self, &err);
                if self.on_error.is_none() {
                    self.on_error = Some(handler);
                }
                true
            },
            None => false,
        };
        if self.in_flight == Some(generation) {
            self.complete(generation);
        }
        if handled { Ok(()) } else { Err(err) }
    }

    // -- Dispatch bookkeeping -------------------------------------------------

    fn begin(&mut self, state: InputState) -> Done {
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.surface.clear_prompt();
        if self.state == InputState::Disabled {
            self.resume_state = state;
        } else {
            self.state = state;
        }
        Done {
            generation: self.generation,
        }
    }

    fn complete(&mut self, generation: u64) {
        if self.in_flight != Some(generation) {
            log::warn!("ignoring completion of finished dispatch #{generation}");
            return;
        }
        self.in_flight = None;
        self.prompt();
    }

    fn prompt(&mut self) {
        self.history.to_end();
        if self.state == InputState::Disabled {
            self.resume_state = InputState::Waiting;
        } else {
            self.state = InputState::Waiting;
            self.render_prompt();
        }
    }

    fn render_prompt(&mut self) {
        let (before, after) = self.line.split_at_caret();
        if self.hidden {
            let (before, after) = (mask(before), mask(after));
            self.surface.render_prompt(&self.config.prompt, &before, &after);
        } else {
            self.surface.render_prompt(&self.config.prompt, before, after);
        }
    }
}

/// Split at the first space: the token, and everything after that space.
pub fn split_command(input: &str) -> (&str, &str) {
    input.split_once(' ').unwrap_or((input, ""))
}

fn mask(text: &str) -> String {
    "*".repeat(text.chars().count())
}
