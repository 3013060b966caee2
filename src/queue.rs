//! Shared work queue with completion tracking.
//!
//! A FIFO buffer whose items are not "done" until a consumer acknowledges
//! them with [`WorkQueue::task_done`]. [`WorkQueue::join`] suspends until
//! every item ever put has been acknowledged.
//!
//! Wakeups go through `tokio::sync::Notify`. Every waiter registers
//! interest (`enable`) before inspecting state, so a notification sent
//! between the check and the await is never lost.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::trace;

use crate::error::{Error, Result};

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    /// Items put but not yet acknowledged.
    unfinished: usize,
    total_put: u64,
    total_acknowledged: u64,
}

/// An async FIFO queue with an unfinished-work counter.
///
/// Share it between tasks with `Arc<WorkQueue<T>>`.
#[derive(Debug)]
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    /// 0 = unbounded.
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
    all_done: Notify,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> WorkQueue<T> {
    /// A queue that never blocks on insertion.
    pub fn unbounded() -> Self {
        Self::bounded(0)
    }

    /// A queue holding at most `capacity` items. A capacity of 0 means unbounded.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                unfinished: 0,
                total_put: 0,
                total_acknowledged: 0,
            }),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
            all_done: Notify::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        // The lock is never held across an await or user code, so a
        // poisoned mutex still guards consistent state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert an item, suspending while a bounded queue is full.
    pub async fn put(&self, mut item: T) {
        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_put(item) {
                Ok(()) => return,
                Err((rejected, _)) => item = rejected,
            }
            notified.await;
        }
    }

    /// Insert an item without waiting.
    ///
    /// On a full queue the item is handed back alongside `Error::QueueFull`.
    pub fn try_put(&self, item: T) -> std::result::Result<(), (T, Error)> {
        let mut inner = self.lock();
        if self.capacity > 0 && inner.items.len() >= self.capacity {
            return Err((
                item,
                Error::QueueFull {
                    capacity: self.capacity,
                },
            ));
        }
        inner.items.push_back(item);
        inner.unfinished += 1;
        inner.total_put += 1;
        trace!(len = inner.items.len(), unfinished = inner.unfinished, "put");
        drop(inner);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove and return the oldest item, suspending until one is available.
    pub async fn get(&self) -> T {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_get() {
                return item;
            }
            notified.await;
        }
    }

    /// Remove and return the oldest item if there is one.
    pub fn try_get(&self) -> Option<T> {
        let mut inner = self.lock();
        let item = inner.items.pop_front()?;
        let remaining = inner.items.len();
        drop(inner);

        self.not_full.notify_one();
        // A single put may have raced several getters; pass the wakeup on.
        if remaining > 0 {
            self.not_empty.notify_one();
        }
        Some(item)
    }

    /// Acknowledge that one previously retrieved item is fully processed.
    ///
    /// Returns `Error::TaskDoneOverflow` when there is nothing left to
    /// acknowledge.
    pub fn task_done(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.unfinished == 0 {
            return Err(Error::TaskDoneOverflow);
        }
        inner.unfinished -= 1;
        inner.total_acknowledged += 1;
        let finished = inner.unfinished == 0;
        drop(inner);

        if finished {
            self.all_done.notify_waiters();
        }
        Ok(())
    }

    /// Suspend until every item put so far has been acknowledged.
    pub async fn join(&self) {
        loop {
            let notified = self.all_done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.lock().unfinished == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.len() >= self.capacity
    }

    /// Maximum number of buffered items, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    /// Items put but not yet acknowledged.
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }

    pub fn total_put(&self) -> u64 {
        self.lock().total_put
    }

    pub fn total_acknowledged(&self) -> u64 {
        self.lock().total_acknowledged
    }
}
