//! Input/command dispatch core for a document-hosted terminal.
//!
//! The terminal is a registry-based dispatch system. Commands implement the
//! `Command` trait (or the `PatternCommand` trait for predicate matches) and
//! are registered in a shared `CommandRegistry`. A `Terminal` edits the input
//! line, keeps history, resolves submitted lines, and hands each command a
//! `Done` token that returns the prompt when finished. Scripts replay typed
//! output through the same terminal on a cooperative scheduler.

pub mod builtins;
pub mod fetch;
pub mod history;
pub mod line_buffer;
pub mod registry;
pub mod scheduler;
pub mod script;
pub mod store;
pub mod surface;
pub mod terminal;

/// Register the example commands (help, sleep, play, ...) into a registry.
pub use builtins::register_builtins;
/// Loads resources for fetch-backed commands.
pub use fetch::{Fetcher, MapFetcher};
/// Bounded input history with a recall cursor.
pub use history::History;
/// A command selected by exact name.
pub use registry::Command;
/// Registry of named commands, aliases, and pattern commands.
pub use registry::CommandRegistry;
/// Closure-backed command builders.
pub use registry::{FnPattern, NamedCommand};
/// A command selected by a predicate over the input.
pub use registry::{PatternCommand, PatternId, SharedRegistry};
/// Parsed auto-typing script.
pub use script::{Script, ScriptCommand};
/// Playback handles and speed state.
pub use script::player::{PlaybackId, TypingSpeed, XorShiftRng};
/// History persistence backends.
pub use store::{FileStore, KvStore, MemoryStore};
/// Rendering collaborator and in-memory transcript.
pub use surface::{AnchorId, Surface, Transcript};
/// The input/eval state machine.
pub use terminal::{Done, InputState, Next, Terminal};
