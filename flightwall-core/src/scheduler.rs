//! Named fixed-interval timers on a virtual clock.
//!
//! Time is a [`Duration`] since the scheduler was created. Tests move the
//! clock by hand; the async driver maps wall-clock time onto it. Nothing
//! here sleeps or spawns.

use std::time::Duration;

/// Shortest period a timer may have.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing<K> {
    pub key: K,
    pub at: Duration,
}

#[derive(Debug, Clone)]
struct Timer<K> {
    key: K,
    period: Duration,
    next: Duration,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct VirtualScheduler<K> {
    now: Duration,
    timers: Vec<Timer<K>>,
    seq: u64,
}

impl<K: Clone + PartialEq> Default for VirtualScheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + PartialEq> VirtualScheduler<K> {
    pub fn new() -> Self {
        VirtualScheduler {
            now: Duration::ZERO,
            timers: Vec::new(),
            seq: 0,
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Start (or restart) `key`, first firing one period from now.
    pub fn start(&mut self, key: K, period: Duration) {
        let period = period.max(MIN_PERIOD);
        self.stop(&key);
        self.seq += 1;
        self.timers.push(Timer {
            key,
            period,
            next: self.now + period,
            seq: self.seq,
        });
    }

    /// Stop `key`. Returns whether it was running.
    pub fn stop(&mut self, key: &K) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| &t.key != key);
        self.timers.len() != before
    }

    pub fn stop_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_running(&self, key: &K) -> bool {
        self.timers.iter().any(|t| &t.key == key)
    }

    pub fn period(&self, key: &K) -> Option<Duration> {
        self.timers.iter().find(|t| &t.key == key).map(|t| t.period)
    }

    /// Earliest pending deadline across all running timers.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.next).min()
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline and rescheduling it one period later. Ties fire in the
    /// order the timers were started.
    pub fn pop_due(&mut self, until: Duration) -> Option<Firing<K>> {
        let timer = self
            .timers
            .iter_mut()
            .filter(|t| t.next <= until)
            .min_by_key(|t| (t.next, t.seq))?;
        let at = timer.next;
        timer.next += timer.period;
        let key = timer.key.clone();
        self.now = self.now.max(at);
        Some(Firing { key, at })
    }

    /// Run the clock forward to `now`, returning every firing in order.
    pub fn advance_to(&mut self, now: Duration) -> Vec<Firing<K>> {
        let mut fired = Vec::new();
        while let Some(f) = self.pop_due(now) {
            fired.push(f);
        }
        self.now = self.now.max(now);
        fired
    }

    pub fn advance_by(&mut self, elapsed: Duration) -> Vec<Firing<K>> {
        self.advance_to(self.now + elapsed)
    }
}
