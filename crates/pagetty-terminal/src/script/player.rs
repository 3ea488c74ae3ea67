//! Script playback on the terminal's scheduler.
//!
//! Each command runs as one or more scheduled tasks. Once it completes the
//! cursor moves on and the next command is scheduled one typing tick later,
//! so commands never overlap. Enter or Space escalates every active playback:
//! first to half delays, then to no delays at all.

use std::rc::Rc;

use pagetty_types::config::ScriptConfig;
use rand_core::RngCore;

use super::{Script, ScriptCommand};
use crate::surface::AnchorId;
use crate::terminal::Terminal;

/// Handle for a running playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(u64);

/// Typing delays of one playback. Escalation only goes forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingSpeed {
    speed_ms: u64,
    variance_ms: u64,
    faster: bool,
    instant: bool,
}

impl TypingSpeed {
    /// Initial delays from `config`.
    pub fn new(config: &ScriptConfig) -> Self {
        Self {
            speed_ms: config.speed_ms,
            variance_ms: config.variance_ms,
            faster: false,
            instant: false,
        }
    }

    /// First call halves speed and variance; any later call drops all delays.
    pub fn escalate(&mut self) {
        if self.faster {
            self.instant = true;
        } else {
            self.faster = true;
            self.speed_ms /= 2;
            self.variance_ms /= 2;
        }
    }

    pub fn is_faster(&self) -> bool {
        self.faster
    }

    pub fn is_instant(&self) -> bool {
        self.instant
    }

    pub fn speed_ms(&self) -> u64 {
        self.speed_ms
    }

    pub fn variance_ms(&self) -> u64 {
        self.variance_ms
    }

    /// Pause between two script commands.
    pub fn tick_ms(&self) -> u64 {
        if self.instant { 0 } else { self.speed_ms }
    }

    /// Actual length of a `SLEEP(ms)`.
    pub fn sleep_ms(&self, ms: u64) -> u64 {
        if self.instant {
            0
        } else if self.faster {
            ms / 2
        } else {
            ms
        }
    }

    /// Delay after one typed character: `speed ± variance`.
    pub fn char_delay(&self, rng: &mut dyn RngCore) -> u64 {
        if self.instant {
            return 0;
        }
        if self.variance_ms == 0 {
            return self.speed_ms;
        }
        let span = self.variance_ms.saturating_mul(2).saturating_add(1);
        let jitter = rng.next_u64() % span;
        self.speed_ms.saturating_add(jitter).saturating_sub(self.variance_ms)
    }
}

/// State of one running playback.
pub(crate) struct Playback {
    script: Rc<Script>,
    line: usize,
    cmd: usize,
    speed: TypingSpeed,
    then: Box<dyn FnOnce(&mut Terminal)>,
}

impl Playback {
    fn current(&self) -> Option<&ScriptCommand> {
        self.script.get(self.line, self.cmd)
    }

    fn step_forward(&mut self) {
        self.cmd += 1;
        let line_len = self.script.lines().get(self.line).map_or(0, Vec::len);
        if self.cmd >= line_len {
            self.line += 1;
            self.cmd = 0;
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TypeTarget {
    Line,
    Anchor(AnchorId),
}

impl Terminal {
    /// Start playing `script`. `then` runs once the last command completes.
    pub fn play(&mut self, script: Script, then: impl FnOnce(&mut Terminal) + 'static) -> PlaybackId {
        let id = PlaybackId(self.next_playback);
        self.next_playback += 1;
        log::debug!(
            "playback {id:?}: {} lines, {} commands",
            script.len(),
            script.command_count()
        );
        let playback = Playback {
            script: Rc::new(script),
            line: 0,
            cmd: 0,
            speed: TypingSpeed::new(&self.config().typing),
            then: Box::new(then),
        };
        self.playbacks.insert(id, playback);
        self.schedule(0, move |t| t.step_playback(id));
        id
    }

    /// True while any playback is running.
    pub fn is_playing(&self) -> bool {
        !self.playbacks.is_empty()
    }

    /// Current speed of a running playback.
    pub fn playback_speed(&self, id: PlaybackId) -> Option<TypingSpeed> {
        self.playbacks.get(&id).map(|p| p.speed)
    }

    /// Escalate every active playback. Returns false when none is running.
    pub fn speed_up_playbacks(&mut self) -> bool {
        if self.playbacks.is_empty() {
            return false;
        }
        for playback in self.playbacks.values_mut() {
            playback.speed.escalate();
        }
        true
    }

    fn step_playback(&mut self, id: PlaybackId) {
        let Some(playback) = self.playbacks.get(&id) else {
            return;
        };
        let speed = playback.speed;
        let Some(command) = playback.current().cloned() else {
            self.finish_playback(id);
            return;
        };

        match command {
            ScriptCommand::Print(text) => self.type_step(id, TypeTarget::Line, Rc::from(text), 0),
            ScriptCommand::Link { url, text } => {
                let anchor = self.surface_mut().attach_anchor(&url);
                self.type_step(id, TypeTarget::Anchor(anchor), Rc::from(text), 0);
            },
            ScriptCommand::Sleep(ms) => {
                self.schedule(speed.sleep_ms(ms), move |t| t.advance_playback(id));
            },
            ScriptCommand::Html(markup) => {
                self.append_markup(&markup);
                self.advance_playback(id);
            },
            ScriptCommand::LineBreak => {
                self.new_line();
                self.advance_playback(id);
            },
            ScriptCommand::Unknown(kind) => {
                log::debug!("playback {id:?}: skipping unknown directive {kind:?}");
                self.advance_playback(id);
            },
        }
    }

    /// Type the character at byte offset `pos`, then schedule the next one.
    fn type_step(&mut self, id: PlaybackId, target: TypeTarget, text: Rc<str>, pos: usize) {
        let Some(speed) = self.playback_speed(id) else {
            return;
        };
        let rest = &text[pos..];
        let Some(ch) = rest.chars().next() else {
            self.advance_playback(id);
            return;
        };
        if speed.is_instant() {
            self.write_typed(target, rest);
            self.advance_playback(id);
            return;
        }
        let end = pos + ch.len_utf8();
        self.write_typed(target, &text[pos..end]);
        let delay = speed.char_delay(self.rng.as_mut());
        self.schedule(delay, move |t| t.type_step(id, target, text, end));
    }

    fn write_typed(&mut self, target: TypeTarget, text: &str) {
        match target {
            TypeTarget::Line => self.append(text),
            TypeTarget::Anchor(anchor) => self.surface_mut().append_anchor_text(anchor, text),
        }
    }

    fn advance_playback(&mut self, id: PlaybackId) {
        let Some(playback) = self.playbacks.get_mut(&id) else {
            return;
        };
        playback.step_forward();
        let tick = playback.speed.tick_ms();
        self.schedule(tick, move |t| t.step_playback(id));
    }

    fn finish_playback(&mut self, id: PlaybackId) {
        if let Some(playback) = self.playbacks.remove(&id) {
            log::debug!("playback {id:?} finished");
            (playback.then)(self);
        }
    }
}

// ---------------------------------------------------------------------------
// Jitter source
// ---------------------------------------------------------------------------

/// Small xorshift64* generator for typing jitter. Not for anything that needs
/// real randomness.
#[derive(Debug, Clone)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    /// Create a generator from `seed`.
    pub fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self {
            state: if seed == 0 { 0x2545_F491_4F6C_DD1D } else { seed },
        }
    }

    /// Seeded from the wall clock.
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos)
    }
}

impl Default for XorShiftRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RngCore for XorShiftRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
