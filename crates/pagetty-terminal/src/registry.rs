//! Command trait, registry, and resolution rules.
//!
//! Three kinds of entries live here:
//!
//! - **named commands**, looked up by exact token,
//! - **aliases**, which redirect one token to a named command (one hop, never
//!   chained),
//! - **pattern commands**, an ordered list of predicates checked before any
//!   name lookup. The first pattern whose `test` accepts the input wins.
//!
//! Handlers are stored behind `Rc` so [`CommandRegistry::resolve`] can hand
//! out a clone and release the registry borrow before the handler runs. That
//! lets handlers register or remove commands themselves.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pagetty_types::error::{PagettyError, Result};
use regex::Regex;

use crate::terminal::{Done, Next, Terminal};

/// A command selected by exact name.
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str {
        ""
    }

    /// Usage string (e.g. "sleep SECONDS").
    fn usage(&self) -> &str {
        self.name()
    }

    /// Extra tokens that resolve to this command.
    fn aliases(&self) -> Vec<String> {
        Vec::new()
    }

    /// Run with the raw argument string. Call `done.finish(term)` exactly
    /// once, now or later, to hand the prompt back.
    fn run(&self, term: &mut Terminal, args: &str, done: Done) -> Result<()>;
}

/// A command selected by a predicate over the input.
pub trait PatternCommand {
    /// Whether this command claims `token` (the first word) with `args`
    /// (everything after it).
    fn test(&self, token: &str, args: &str) -> bool;

    /// Run the claimed input. Calling `next.run(term, done)` falls through
    /// to regular name dispatch; otherwise regular dispatch is skipped.
    fn run(&self, term: &mut Terminal, args: &str, done: Done, next: Next) -> Result<()>;
}

/// Stable handle for a registered pattern command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(u64);

/// What a token resolved to.
pub enum Resolved {
    Pattern(Rc<dyn PatternCommand>),
    Named(Rc<dyn Command>),
}

enum Entry {
    Named(Rc<dyn Command>),
    Alias { target: String },
}

/// Registry shared by every terminal in the process.
pub type SharedRegistry = Rc<RefCell<CommandRegistry>>;

/// Table of named commands, aliases, and ordered pattern commands.
pub struct CommandRegistry {
    entries: BTreeMap<String, Entry>,
    patterns: Vec<(PatternId, Rc<dyn PatternCommand>)>,
    next_pattern: u64,
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            patterns: Vec::new(),
            next_pattern: 0,
        }
    }

    /// Create an empty registry wrapped for sharing between terminals.
    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Register a named command and its aliases. Replaces any existing entry
    /// (command or alias) with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        let cmd: Rc<dyn Command> = Rc::from(cmd);
        let name = cmd.name().to_string();
        let aliases = cmd.aliases();
        self.entries.insert(name.clone(), Entry::Named(cmd));
        for alias in aliases {
            if let Err(e) = self.add_alias(&alias, &name) {
                log::warn!("skipping alias {alias:?} of {name:?}: {e}");
            }
        }
    }

    /// Make `alias` resolve to the command named `target`.
    ///
    /// The target does not have to exist yet, but it must not be an alias
    /// itself, and nothing may already alias `alias`: resolution is always a
    /// single hop.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<()> {
        if alias == target {
            return Err(PagettyError::Registry(format!(
                "alias {alias:?} cannot point at itself"
            )));
        }
        if let Some(Entry::Alias { .. }) = self.entries.get(target) {
            return Err(PagettyError::Registry(format!(
                "alias {alias:?} targets {target:?}, which is itself an alias"
            )));
        }
        let pointed_at = self
            .entries
            .values()
            .any(|e| matches!(e, Entry::Alias { target: t } if t == alias));
        if pointed_at {
            return Err(PagettyError::Registry(format!(
                "{alias:?} is already an alias target and cannot become an alias"
            )));
        }
        self.entries.insert(
            alias.to_string(),
            Entry::Alias {
                target: target.to_string(),
            },
        );
        Ok(())
    }

    /// Append a pattern command. Earlier registrations take precedence.
    pub fn add_pattern(&mut self, cmd: Box<dyn PatternCommand>) -> PatternId {
        let id = PatternId(self.next_pattern);
        self.next_pattern += 1;
        self.patterns.push((id, Rc::from(cmd)));
        id
    }

    /// Remove a named command or alias. Returns whether anything was removed.
    pub fn remove_command(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Remove a pattern command. Returns whether anything was removed.
    pub fn remove_pattern(&mut self, id: PatternId) -> bool {
        match self.patterns.iter().position(|(pid, _)| *pid == id) {
            Some(idx) => {
                self.patterns.remove(idx);
                true
            },
            None => false,
        }
    }

    /// Resolve input to a handler: pattern commands first, in order, then
    /// named lookup with one alias hop.
    pub fn resolve(&self, token: &str, args: &str) -> Option<Resolved> {
        self.patterns
            .iter()
            .find(|(_, p)| p.test(token, args))
            .map(|(_, p)| Resolved::Pattern(Rc::clone(p)))
            .or_else(|| self.resolve_named(token).map(Resolved::Named))
    }

    /// Name and alias lookup only, ignoring pattern commands.
    pub fn resolve_named(&self, token: &str) -> Option<Rc<dyn Command>> {
        match self.entries.get(token)? {
            Entry::Named(cmd) => Some(Rc::clone(cmd)),
            Entry::Alias { target } => match self.entries.get(target)? {
                Entry::Named(cmd) => Some(Rc::clone(cmd)),
                Entry::Alias { .. } => None,
            },
        }
    }

    /// Whether `token` names a command or an alias of one.
    pub fn contains(&self, token: &str) -> bool {
        self.resolve_named(token).is_some()
    }

    /// Target of `alias`, if it is an alias.
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        match self.entries.get(alias)? {
            Entry::Alias { target } => Some(target),
            Entry::Named(_) => None,
        }
    }

    /// All command and alias names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Sorted `(name, description)` pairs. Aliases read "Alias for <target>".
    pub fn list_commands(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let desc = match entry {
                    Entry::Named(cmd) => cmd.description().to_string(),
                    Entry::Alias { target } => format!("Alias for {target}"),
                };
                (name.clone(), desc)
            })
            .collect()
    }

    /// Names and aliases starting with `partial`, sorted.
    pub fn completions(&self, partial: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|name| name.starts_with(partial))
            .cloned()
            .collect()
    }

    /// Number of registered pattern commands.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of names, aliases included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when neither names nor patterns are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.patterns.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Closure-backed commands
// ---------------------------------------------------------------------------

type RunFn = dyn Fn(&mut Terminal, &str, Done) -> Result<()>;
type TestFn = dyn Fn(&str, &str) -> bool;
type PatternRunFn = dyn Fn(&mut Terminal, &str, Done, Next) -> Result<()>;

/// A named command built from a closure.
///
/// ```ignore
/// reg.register(Box::new(
///     NamedCommand::new("echo", |term, args, done| {
///         term.append_line(args);
///         done.finish(term);
///         Ok(())
///     })
///     .description("Print arguments")
///     .alias("say"),
/// ));
/// ```
pub struct NamedCommand {
    name: String,
    description: String,
    usage: String,
    aliases: Vec<String>,
    run: Box<RunFn>,
}

impl NamedCommand {
    /// Create a command named `name` that runs `run`. Usage defaults to the name.
    pub fn new(
        name: &str,
        run: impl Fn(&mut Terminal, &str, Done) -> Result<()> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            usage: name.to_string(),
            aliases: Vec::new(),
            run: Box::new(run),
        }
    }

    /// Set the text shown by `help`.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the usage line.
    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    /// Add an alias registered alongside the command.
    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }
}

impl Command for NamedCommand {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn usage(&self) -> &str {
        &self.usage
    }
    fn aliases(&self) -> Vec<String> {
        self.aliases.clone()
    }
    fn run(&self, term: &mut Terminal, args: &str, done: Done) -> Result<()> {
        (self.run)(term, args, done)
    }
}

/// A pattern command built from a predicate and a closure.
pub struct FnPattern {
    test: Box<TestFn>,
    run: Box<PatternRunFn>,
}

impl FnPattern {
    /// Create a pattern from a `(token, args)` predicate and its handler.
    pub fn new(
        test: impl Fn(&str, &str) -> bool + 'static,
        run: impl Fn(&mut Terminal, &str, Done, Next) -> Result<()> + 'static,
    ) -> Self {
        Self {
            test: Box::new(test),
            run: Box::new(run),
        }
    }

    /// Claim every token matching `pattern`.
    pub fn regex(
        pattern: &str,
        run: impl Fn(&mut Terminal, &str, Done, Next) -> Result<()> + 'static,
    ) -> Result<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| PagettyError::Registry(format!("bad pattern {pattern:?}: {e}")))?;
        Ok(Self::new(move |token, _args| re.is_match(token), run))
    }
}

impl PatternCommand for FnPattern {
    fn test(&self, token: &str, args: &str) -> bool {
        (self.test)(token, args)
    }
    fn run(&self, term: &mut Terminal, args: &str, done: Done, next: Next) -> Result<()> {
        (self.run)(term, args, done, next)
    }
}
