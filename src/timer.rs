use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// When a keyed job runs relative to the input that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPolicy {
    /// Run synchronously on every request.
    Immediate,
    /// Coalesce: each request cancels the pending deadline and schedules a
    /// new one `Duration` later.
    Deferred(Duration),
}

/// One cancellable deadline per key, polled from the event loop.
///
/// Rescheduling a key replaces its deadline, so at most one pending job per
/// key exists at any time and the last request wins.
#[derive(Debug)]
pub struct DebounceTimers<K> {
    deadlines: HashMap<K, Instant>,
}

impl<K> Default for DebounceTimers<K> {
    fn default() -> Self {
        Self {
            deadlines: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> DebounceTimers<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending deadline for `key` and arm a new one.
    pub fn schedule(&mut self, key: K, delay: Duration, now: Instant) {
        self.deadlines.insert(key, now + delay);
    }

    /// Returns `true` if a deadline was pending.
    pub fn cancel(&mut self, key: K) -> bool {
        self.deadlines.remove(&key).is_some()
    }

    #[cfg(test)]
    pub fn is_pending(&self, key: K) -> bool {
        self.deadlines.contains_key(&key)
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.deadlines.len()
    }

    /// Remove and return every key whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(K, Instant)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(k, at)| (*k, *at))
            .collect();
        due.sort_by_key(|(_, at)| *at);
        for (k, _) in &due {
            self.deadlines.remove(k);
        }
        due.into_iter().map(|(k, _)| k).collect()
    }

    /// Time until the earliest pending deadline, for sizing the event poll.
    pub fn next_deadline_in(&self, now: Instant) -> Option<Duration> {
        self.deadlines
            .values()
            .min()
            .map(|at| at.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn reschedule_replaces_deadline() {
        let t0 = Instant::now();
        let mut timers = DebounceTimers::new();
        timers.schedule("a", MS * 10, t0);
        timers.schedule("a", MS * 10, t0 + MS * 8);
        assert!(timers.take_due(t0 + MS * 12).is_empty());
        assert_eq!(timers.take_due(t0 + MS * 18), vec!["a"]);
        assert!(timers.take_due(t0 + MS * 100).is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let t0 = Instant::now();
        let mut timers = DebounceTimers::new();
        timers.schedule(1, MS * 5, t0);
        timers.schedule(2, MS * 2, t0);
        assert_eq!(timers.pending_count(), 2);
        assert_eq!(timers.take_due(t0 + MS * 6), vec![2, 1]);
    }

    #[test]
    fn cancel_removes_pending() {
        let t0 = Instant::now();
        let mut timers = DebounceTimers::new();
        timers.schedule('x', MS, t0);
        assert!(timers.is_pending('x'));
        assert!(timers.cancel('x'));
        assert!(!timers.cancel('x'));
        assert!(timers.take_due(t0 + MS * 5).is_empty());
    }

    #[test]
    fn next_deadline_reports_earliest() {
        let t0 = Instant::now();
        let mut timers = DebounceTimers::new();
        assert_eq!(timers.next_deadline_in(t0), None);
        timers.schedule(1, MS * 30, t0);
        timers.schedule(2, MS * 10, t0);
        assert_eq!(timers.next_deadline_in(t0), Some(MS * 10));
        assert_eq!(timers.next_deadline_in(t0 + MS * 50), Some(Duration::ZERO));
    }
}
