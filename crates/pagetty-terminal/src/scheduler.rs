//! Cooperative timer queue on a virtual millisecond clock.
//!
//! Nothing here spawns threads or sleeps. The owner advances the clock
//! explicitly (a front end maps wall time onto it, tests jump it), and due
//! tasks run one at a time in `(deadline, sequence)` order.

use std::collections::BTreeMap;

/// A deferred unit of work that gets exclusive access to its context.
pub type Task<C> = Box<dyn FnOnce(&mut C)>;

/// Timer queue keyed by deadline, ties broken by scheduling order.
pub struct Scheduler<C> {
    now_ms: u64,
    seq: u64,
    queue: BTreeMap<(u64, u64), Task<C>>,
}

impl<C> Scheduler<C> {
    /// Create an empty scheduler at time zero.
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            seq: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Queue `task` to run `delay_ms` after the current time.
    pub fn schedule(&mut self, delay_ms: u64, task: Task<C>) {
        let deadline = self.now_ms.saturating_add(delay_ms);
        self.queue.insert((deadline, self.seq), task);
        self.seq += 1;
    }

    /// Deadline of the earliest pending task.
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.keys().next().map(|&(deadline, _)| deadline)
    }

    /// Number of pending tasks.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop the earliest task due at or before `limit_ms`, moving the clock to
    /// its deadline.
    pub fn pop_due(&mut self, limit_ms: u64) -> Option<Task<C>> {
        let (&(deadline, _), _) = self.queue.first_key_value()?;
        if deadline > limit_ms {
            return None;
        }
        let ((deadline, _), task) = self.queue.pop_first()?;
        self.now_ms = self.now_ms.max(deadline);
        Some(task)
    }

    /// Move the clock forward to `ms` (never backwards).
    pub fn set_now(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run every task due within the next `ms` milliseconds against `ctx`.
///
/// Tasks queued by running tasks are picked up in the same pass when they
/// fall inside the window. Returns the number of tasks run.
pub fn advance<C>(ctx: &mut C, ms: u64, sched: fn(&mut C) -> &mut Scheduler<C>) -> usize {
    let target = sched(ctx).now().saturating_add(ms);
    let mut ran = 0;
    while let Some(task) = sched(ctx).pop_due(target) {
        task(ctx);
        ran += 1;
    }
    sched(ctx).set_now(target);
    ran
}

/// Upper bound on tasks run by [`run_until_idle`].
pub const MAX_IDLE_STEPS: usize = 1_000_000;

/// Jump the clock from deadline to deadline until no task is pending.
///
/// Returns the number of tasks run. Stops after [`MAX_IDLE_STEPS`] tasks so
/// a self-rescheduling task cannot hang the caller.
pub fn run_until_idle<C>(ctx: &mut C, sched: fn(&mut C) -> &mut Scheduler<C>) -> usize {
    let mut ran = 0;
    while let Some(deadline) = sched(ctx).next_deadline() {
        if ran >= MAX_IDLE_STEPS {
            log::warn!("scheduler still busy after {MAX_IDLE_STEPS} tasks, giving up");
            break;
        }
        if let Some(task) = sched(ctx).pop_due(deadline) {
            task(ctx);
            ran += 1;
        }
    }
    ran
}
