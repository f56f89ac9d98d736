// Wed Jul 29 2026 - Alex

use parking_lot::Mutex;
use std::collections::VecDeque;

/// One worker's task deque.
///
/// The owning worker pushes and pops at the front, so it keeps running the
/// task it queued most recently (LIFO, cache-warm). Thieves take from the
/// back (FIFO), which grabs the oldest task and keeps contention away from
/// the owner's end. Not lock-free: a plain mutex per queue spreads the
/// contention that a single shared queue would concentrate.
#[derive(Debug, Default)]
pub struct WorkStealingQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> WorkStealingQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Owner side: push to the front.
    pub fn push(&self, item: T) {
        self.inner.lock().push_front(item);
    }

    /// Owner side: pop from the front.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Thief side: take from the back.
    pub fn steal(&self) -> Option<T> {
        self.inner.lock().pop_back()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
