//! Layout-settled barrier for deferred work.
//!
//! Scroll extents are not final until the layout pass triggered by new
//! content or new style variables has run, so anything that reads or writes
//! scroll offsets after such a change waits for a fixed number of
//! render-settled signals (two by default). Waiting tasks run in FIFO order.

use heapless::Deque;

/// Render-settled signals a task waits for by default.
pub const DEFAULT_SETTLE_FRAMES: u8 = 2;

/// Maximum number of tasks that may wait at once.
pub const MAX_DEFERRED: usize = 4;

struct Waiting<T> {
    task: T,
    remaining: u8,
}

/// Bounded FIFO of tasks waiting for layout to settle.
pub struct FrameBarrier<T> {
    queue: Deque<Waiting<T>, MAX_DEFERRED>,
    settle_frames: u8,
}

impl<T> Default for FrameBarrier<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_FRAMES)
    }
}

impl<T> FrameBarrier<T> {
    /// Barrier that releases tasks after `settle_frames` signals.
    pub fn new(settle_frames: u8) -> Self {
        Self {
            queue: Deque::new(),
            settle_frames,
        }
    }

    /// Queue a task. When the queue is full the oldest task is displaced and returned.
    pub fn defer(&mut self, task: T) -> Option<T> {
        let mut displaced = None;
        if self.queue.is_full() {
            displaced = self.queue.pop_front().map(|w| w.task);
            log::warn!(
                "[ENGINE] Deferred queue full ({}), dropping oldest task",
                MAX_DEFERRED
            );
        }
        let waiting = Waiting {
            task,
            remaining: self.settle_frames,
        };
        if let Err(rejected) = self.queue.push_back(waiting) {
            // Only reachable with a zero-capacity queue.
            return Some(rejected.task);
        }
        displaced
    }

    /// Re-arm the newest task matching `pred` so it waits the full settle
    /// count again, keeping its place in the queue. Returns whether one matched.
    pub fn rearm_last(&mut self, pred: impl Fn(&T) -> bool) -> bool {
        let settle_frames = self.settle_frames;
        match self.queue.iter_mut().rev().find(|w| pred(&w.task)) {
            Some(waiting) => {
                waiting.remaining = settle_frames;
                true
            }
            None => false,
        }
    }

    /// Remove every waiting task regardless of its remaining count, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        let mut tasks = Vec::with_capacity(self.queue.len());
        while let Some(waiting) = self.queue.pop_front() {
            tasks.push(waiting.task);
        }
        tasks
    }

    /// Record one render-settled signal and return the tasks now ready, oldest first.
    pub fn on_layout_settled(&mut self) -> Vec<T> {
        for waiting in self.queue.iter_mut() {
            waiting.remaining = waiting.remaining.saturating_sub(1);
        }
        let mut ready = Vec::new();
        while self.queue.front().is_some_and(|w| w.remaining == 0) {
            if let Some(waiting) = self.queue.pop_front() {
                ready.push(waiting.task);
            }
        }
        ready
    }

    /// Number of tasks still waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is waiting.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}
