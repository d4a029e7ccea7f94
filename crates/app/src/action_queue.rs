//! Bounded FIFO queue feeding the asynchronous action worker.
//!
//! Producers wait a bounded time for room; the consumer waits a bounded time
//! for work. Both sides are woken through [`Notify`], armed before the
//! queue state is inspected so no wake-up is lost.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Why a push was refused. The rejected item is handed back.
#[derive(Debug)]
pub enum PushError<T> {
    /// No room appeared before the deadline.
    Full(T),
    /// The queue was closed.
    Closed(T),
}

/// Returned when work is submitted to a closed queue.
#[derive(Debug, thiserror::Error)]
#[error("action queue is closed")]
pub struct QueueClosed;

/// Outcome of waiting for an item.
#[derive(Debug)]
pub enum Popped<T> {
    Item(T),
    /// Nothing arrived within the poll interval.
    TimedOut,
    /// The queue is closed and drained.
    Closed,
}

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity multi-producer queue.
#[derive(Debug)]
pub struct ActionQueue<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    item_ready: Notify,
    space_ready: Notify,
}

impl<T> ActionQueue<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            item_ready: Notify::new(),
            space_ready: Notify::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries waiting to be popped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Append `item`, waiting up to `wait` for room.
    ///
    /// Returns the queue depth right after the push.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Full`] when the queue stayed full for `wait`,
    /// or [`PushError::Closed`] once [`close`](Self::close) was called.
    pub async fn push(&self, item: T, wait: Duration) -> Result<usize, PushError<T>> {
        let deadline = Instant::now() + wait;
        let mut item = item;
        loop {
            let space = self.space_ready.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            item = match self.try_push(item) {
                Ok(depth) => {
                    self.item_ready.notify_one();
                    return Ok(depth);
                }
                Err(PushError::Closed(item)) => return Err(PushError::Closed(item)),
                Err(PushError::Full(item)) => item,
            };

            if tokio::time::timeout_at(deadline, space.as_mut()).await.is_err() {
                return Err(PushError::Full(item));
            }
        }
    }

    /// Take the oldest item, waiting up to `poll` for one.
    pub async fn pop(&self, poll: Duration) -> Popped<T> {
        let deadline = Instant::now() + poll;
        loop {
            let ready = self.item_ready.notified();
            tokio::pin!(ready);
            ready.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    drop(state);
                    self.space_ready.notify_one();
                    return Popped::Item(item);
                }
                if state.closed {
                    return Popped::Closed;
                }
            }

            if tokio::time::timeout_at(deadline, ready.as_mut()).await.is_err() {
                return Popped::TimedOut;
            }
        }
    }

    /// Remove every waiting item, oldest first.
    pub fn clear(&self) -> Vec<T> {
        let drained: Vec<T> = self.lock().items.drain(..).collect();
        if !drained.is_empty() {
            self.space_ready.notify_waiters();
        }
        drained
    }

    /// Refuse further pushes. Items already queued can still be popped.
    pub fn close(&self) {
        self.lock().closed = true;
        self.item_ready.notify_waiters();
        self.space_ready.notify_waiters();
    }

    fn try_push(&self, item: T) -> Result<usize, PushError<T>> {
        let mut state = self.lock();
        if state.closed {
            return Err(PushError::Closed(item));
        }
        if state.items.len() >= self.capacity {
            return Err(PushError::Full(item));
        }
        state.items.push_back(item);
        Ok(state.items.len())
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
