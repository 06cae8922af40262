//! Suspended tasks: per-owner queues of delayed continuations.
//!
//! Bursts, beam ticks, cooldowns, watchdogs, and the player's delayed death
//! all suspend for a fixed time and then resume on the simulation thread.
//! Each owner keeps a [`Scheduler`] and advances it with the frame delta; due
//! tasks come back in resume order so the owner can apply them.

use std::cmp::Ordering;

#[derive(Debug, Clone)]
struct Scheduled<T> {
    resume_at: f32,
    seq: u64,
    task: T,
}

/// Queue of `(resume time, continuation)` pairs driven by the simulation tick.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: f32,
    next_seq: u64,
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Local clock: total time advanced so far.
    #[must_use]
    pub const fn now(&self) -> f32 {
        self.now
    }

    /// Resume `task` after `delay` seconds. Negative delays resume on the next advance.
    pub fn schedule(&mut self, delay: f32, task: T) {
        self.pending.push(Scheduled {
            resume_at: self.now + delay.max(0.0),
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
    }

    /// Move the clock forward and return every task now due, earliest first.
    /// Tasks due at the same instant resume in the order they were scheduled.
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.now += dt.max(0.0);
        let now = self.now;

        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|s| s.resume_at <= now);
        self.pending = pending;

        due.sort_by(|a, b| {
            a.resume_at
                .partial_cmp(&b.resume_at)
                .unwrap_or(Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        due.into_iter().map(|s| s.task).collect()
    }

    /// Drop every pending task matching `predicate`. Returns how many were removed.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|s| !predicate(&s.task));
        before - self.pending.len()
    }

    /// Drop everything pending.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Whether a matching task is in flight. Used as a reentrancy guard.
    pub fn contains(&self, mut predicate: impl FnMut(&T) -> bool) -> bool {
        self.pending.iter().any(|s| predicate(&s.task))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
