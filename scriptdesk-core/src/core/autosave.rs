//! Cancellable single-shot timers for debounced auto-save.
//!
//! A [`Debouncer`] keeps at most one pending deadline per key. Scheduling a key
//! that is already pending pushes its deadline back, so a save only fires once
//! edits have paused for the configured delay. Time is passed in explicitly and
//! due keys are collected by polling; nothing runs in the background.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Delay used by the note editor between the last keystroke and the save.
pub const DEFAULT_AUTO_SAVE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay: Duration,
    pending: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Changes the delay for timers armed from now on.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Arms the timer for `key` to fire `delay` after `now`.
    ///
    /// Returns `true` if an earlier pending deadline was replaced.
    pub fn schedule(&mut self, key: K, now: Instant) -> bool {
        self.pending.insert(key, now + self.delay).is_some()
    }

    /// Disarms the timer for `key`. Returns `true` if one was pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest deadline among pending timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Removes and returns every key whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(K, Instant)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (key.clone(), *deadline))
            .collect();
        due.sort_by_key(|(_, deadline)| *deadline);
        for (key, _) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(key, _)| key).collect()
    }

    /// Removes and returns every pending key regardless of deadline,
    /// earliest first.
    pub fn drain(&mut self) -> Vec<K> {
        let mut all: Vec<(K, Instant)> = self.pending.drain().collect();
        all.sort_by_key(|(_, deadline)| *deadline);
        all.into_iter().map(|(key, _)| key).collect()
    }
}

impl<K: Eq + Hash + Clone> Default for Debouncer<K> {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_SAVE_DELAY)
    }
}
