//! Notification batching.
//!
//! Mutations commit immediately; what is deferred is the *notification*.
//! Each committed change is queued in an [`UpdateBatcher`] and the first
//! change of a batch asks a [`TickScheduler`] for one tick. When the tick runs
//! the queue is drained in arrival order and subscribers hear about the whole
//! batch once.
//!
//! # Schedulers
//!
//! | Scheduler             | Tick runs                         | Use                      |
//! |-----------------------|-----------------------------------|--------------------------|
//! | [`ImmediateScheduler`]| inline, inside `schedule`         | unit tests, no batching  |
//! | [`ManualScheduler`]   | when `run_pending` is called      | deterministic coalescing |
//! | [`TokioScheduler`]    | next task turn on a tokio runtime | production streaming     |

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Deferred unit of work handed to a scheduler.
pub type Tick = Box<dyn FnOnce() + Send + 'static>;

/// Decides when a requested tick runs.
pub trait TickScheduler: Send + Sync {
    /// Arranges for `tick` to run once, no later than the next scheduling turn.
    fn schedule(&self, tick: Tick);
}

/// Runs every tick inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl TickScheduler for ImmediateScheduler {
    fn schedule(&self, tick: Tick) {
        tick();
    }
}

/// Holds ticks until the owner calls [`ManualScheduler::run_pending`].
#[derive(Default)]
pub struct ManualScheduler {
    ticks: Mutex<VecDeque<Tick>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks waiting to run.
    pub fn pending(&self) -> usize {
        self.ticks.lock().len()
    }

    /// Runs the ticks queued before this call and returns how many ran.
    ///
    /// Ticks scheduled while these run wait for the next call.
    pub fn run_pending(&self) -> usize {
        let ticks: Vec<Tick> = self.ticks.lock().drain(..).collect();
        let count = ticks.len();
        for tick in ticks {
            tick();
        }
        count
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&self, tick: Tick) {
        self.ticks.lock().push_back(tick);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Spawns each tick onto a tokio runtime after yielding once.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime of the calling context, if there is one.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl TickScheduler for TokioScheduler {
    fn schedule(&self, tick: Tick) {
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            tick();
        });
    }
}

#[derive(Debug)]
struct Queue<C> {
    items: Vec<C>,
    tick_requested: bool,
}

/// FIFO queue of committed changes awaiting one combined notification.
///
/// Only notifications are merged: every queued change is handed to the
/// notifier, in the order it was scheduled.
#[derive(Debug)]
pub struct UpdateBatcher<C> {
    queue: Mutex<Queue<C>>,
}

impl<C> UpdateBatcher<C> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Queue {
                items: Vec::new(),
                tick_requested: false,
            }),
        }
    }

    /// Queues a change.
    ///
    /// Returns `true` for the first change of a batch, i.e. when the caller
    /// must request a tick. Any number of calls may precede a flush.
    pub fn schedule(&self, change: C) -> bool {
        let mut queue = self.queue.lock();
        queue.items.push(change);
        if queue.tick_requested {
            false
        } else {
            queue.tick_requested = true;
            true
        }
    }

    /// Drains the queue and, if anything was queued, calls `notify` once with
    /// the changes in arrival order. Returns the number of changes delivered.
    pub fn flush(&self, notify: impl FnOnce(Vec<C>)) -> usize {
        let items = {
            let mut queue = self.queue.lock();
            queue.tick_requested = false;
            std::mem::take(&mut queue.items)
        };
        let count = items.len();
        if count > 0 {
            notify(items);
        }
        count
    }

    /// Drops queued changes without notifying.
    pub fn discard(&self) -> usize {
        let mut queue = self.queue.lock();
        queue.tick_requested = false;
        std::mem::take(&mut queue.items).len()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().items.len()
    }
}

impl<C> Default for UpdateBatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}
