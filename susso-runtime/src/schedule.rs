//! Timer bookkeeping for the driver
//!
//! Nothing here sleeps. Callers ask for the next deadline, wait however
//! their host waits, then hand the current time back in. Scheduled work is
//! never cancelled; it fires and the driver checks whether it still matters.

use chrono::{DateTime, Duration, Utc};

/// Trailing-edge debouncer: fires once a burst has been quiet for `window`
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<DateTime<Utc>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Record activity at `now`, pushing the deadline out
    pub fn poke(&mut self, now: DateTime<Utc>) {
        self.deadline = Some(now + self.window);
    }

    /// Arm for `at` unless already armed
    pub fn arm_at(&mut self, at: DateTime<Utc>) {
        if self.deadline.is_none() {
            self.deadline = Some(at);
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// True once per burst, when the deadline has passed
    pub fn fire(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Scheduled<T> {
    due: DateTime<Utc>,
    seq: u64,
    item: T,
}

/// One-shot delayed items, released in deadline order
#[derive(Debug, Clone)]
pub struct DelayQueue<T> {
    pending: Vec<Scheduled<T>>,
    next_seq: u64,
}

impl<T> DelayQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, due: DateTime<Utc>, item: T) {
        self.pending.push(Scheduled {
            due,
            seq: self.next_seq,
            item,
        });
        self.next_seq += 1;
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.iter().map(|s| s.due).min()
    }

    /// Remove and return every item due at `now`, earliest first, FIFO on ties
    pub fn drain_due(&mut self, now: DateTime<Utc>) -> Vec<T> {
        let (mut due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|s| s.due <= now);
        self.pending = waiting;

        due.sort_by_key(|s| (s.due, s.seq));
        due.into_iter().map(|s| s.item).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    #[test]
    fn test_debounce_collapses_burst() {
        let mut debounce = Debouncer::new(ms(100));
        debounce.poke(t0());
        debounce.poke(t0() + ms(40));
        debounce.poke(t0() + ms(80));

        assert!(!debounce.fire(t0() + ms(150)));
        assert_eq!(debounce.deadline(), Some(t0() + ms(180)));
        assert!(debounce.fire(t0() + ms(180)));
        assert!(!debounce.fire(t0() + ms(500)));
        assert_eq!(debounce.deadline(), None);
    }

    #[test]
    fn test_arm_at_does_not_override() {
        let mut debounce = Debouncer::new(ms(100));
        debounce.arm_at(t0() + ms(500));
        debounce.arm_at(t0() + ms(900));
        assert_eq!(debounce.deadline(), Some(t0() + ms(500)));

        debounce.poke(t0() + ms(10));
        assert_eq!(debounce.deadline(), Some(t0() + ms(110)));
    }

    #[test]
    fn test_delay_queue_order() {
        let mut queue = DelayQueue::new();
        queue.schedule(t0() + ms(200), "late");
        queue.schedule(t0() + ms(100), "first");
        queue.schedule(t0() + ms(100), "second");

        assert_eq!(queue.next_deadline(), Some(t0() + ms(100)));
        assert!(queue.drain_due(t0() + ms(99)).is_empty());
        assert_eq!(queue.drain_due(t0() + ms(150)), vec!["first", "second"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(t0() + ms(200)), vec!["late"]);
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
    }
}
