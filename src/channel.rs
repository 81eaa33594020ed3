//! Typed FIFO channels connecting the data pipeline stages.
//!
//! A channel is either unbounded or bounded with one of three overflow
//! policies. Any number of senders and receivers may share one channel
//! behind an `Arc`; each queued element is delivered to exactly one
//! receiver, FIFO per channel.
//!
//! Closure is a normal outcome, not an error: `send` on a closed channel
//! reports failure, `recv` drains whatever is queued and then returns
//! `None`. `close` is idempotent and wakes every blocked sender and
//! receiver.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// What a bounded channel does with a send when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Suspend the sender until space appears or the channel closes.
    Block,
    /// Discard the oldest queued element and enqueue the new one.
    DropOldest,
    /// Refuse the new element, leaving the queue untouched.
    Reject,
}

#[derive(Debug)]
struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
}

#[derive(Debug)]
pub struct Channel<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
    policy: OverflowPolicy,
}

impl<T> Channel<T> {
    /// Channel with no capacity limit; `send` never blocks.
    pub fn unbounded() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
            policy: OverflowPolicy::Block,
        }
    }

    /// Channel holding at most `capacity` elements, overflowing per `policy`.
    pub fn bounded(capacity: usize, policy: OverflowPolicy) -> Self {
        assert!(capacity > 0, "bounded channel needs capacity >= 1");
        Self {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: Some(capacity),
            policy,
        }
    }

    /// Enqueue a value. Returns false when the channel is closed, or when a
    /// full Reject-policy queue refuses the value, or when a Block-policy
    /// sender is woken by closure before space appears. The value is dropped
    /// on failure.
    pub fn send(&self, value: T) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }

        let cap = match self.capacity {
            None => {
                state.queue.push_back(value);
                drop(state);
                self.not_empty.notify_one();
                return true;
            }
            Some(cap) => cap,
        };

        if state.queue.len() < cap {
            state.queue.push_back(value);
            drop(state);
            self.not_empty.notify_one();
            return true;
        }

        match self.policy {
            OverflowPolicy::Reject => false,
            OverflowPolicy::DropOldest => {
                state.queue.pop_front();
                state.queue.push_back(value);
                drop(state);
                self.not_empty.notify_one();
                true
            }
            OverflowPolicy::Block => {
                while state.queue.len() >= cap && !state.closed {
                    self.not_full.wait(&mut state);
                }
                if state.closed {
                    return false;
                }
                state.queue.push_back(value);
                drop(state);
                self.not_empty.notify_one();
                true
            }
        }
    }

    /// Dequeue the head, waiting while the channel is empty and open.
    /// `None` means closed and fully drained.
    pub fn recv(&self) -> Option<T> {
        let mut state = self.state.lock();
        while state.queue.is_empty() && !state.closed {
            self.not_empty.wait(&mut state);
        }
        let value = state.queue.pop_front();
        drop(state);
        if value.is_some() {
            self.not_full.notify_one();
        }
        value
    }

    /// Dequeue the head if one is immediately available. Never blocks.
    pub fn try_recv(&self) -> Option<T> {
        let mut state = self.state.lock();
        let value = state.queue.pop_front();
        drop(state);
        if value.is_some() {
            self.not_full.notify_one();
        }
        value
    }

    /// Close the channel and wake everyone blocked on it. Idempotent.
    /// Elements already queued stay receivable.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }
}
