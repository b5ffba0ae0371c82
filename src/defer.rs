//! Deferred single-shot callbacks on an explicit clock.
//!
//! The coordinator never sleeps: it schedules work for a later instant
//! and the owner of the event loop polls [`DeferredQueue::due`] with the
//! current time.  The binary passes `Instant::now()`; tests pass
//! synthetic instants, which makes every debounce law deterministic.
//!
//! A handle identifies one pending entry.  The scheduling discipline used
//! throughout the crate is *cancel before replace*: a purpose (startup
//! delay, reset delay, profile settle) holds at most one handle, and
//! scheduling a successor first cancels the pending one.

use std::time::{Duration, Instant};

/// Identifies one pending deferred entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Pending {
    handle: TimerHandle,
    due: Instant,
}

/// An ordered set of pending single-shot timers.
#[derive(Default)]
pub struct DeferredQueue {
    next_handle: u64,
    pending: Vec<Pending>,
}

impl DeferredQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a new entry due at `now + delay`.
    pub fn schedule(&mut self, now: Instant, delay: Duration) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.pending.push(Pending {
            handle,
            due: now + delay,
        });
        handle
    }

    /// Cancel a pending entry.  Returns `false` if it already fired or
    /// was cancelled before.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.pending.iter().position(|p| p.handle == handle) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether the entry is still pending.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    /// Drop every pending entry.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The earliest due instant among pending entries, if any.
    ///
    /// Lets a blocking loop pick a sensible poll timeout.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Remove and return every entry due at or before `now`, earliest
    /// first.
    pub fn due(&mut self, now: Instant) -> Vec<TimerHandle> {
        let mut fired: Vec<(Instant, TimerHandle)> = Vec::new();
        self.pending.retain(|p| {
            if p.due <= now {
                fired.push((p.due, p.handle));
                false
            } else {
                true
            }
        });
        fired.sort_by_key(|(due, handle)| (*due, handle.0));
        fired.into_iter().map(|(_, handle)| handle).collect()
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_at_due_time_not_before() {
        let base = Instant::now();
        let mut q = DeferredQueue::new();
        let h = q.schedule(base, 200 * MS);

        assert!(q.due(base + 199 * MS).is_empty());
        assert_eq!(q.due(base + 200 * MS), vec![h]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_entry_never_fires() {
        let base = Instant::now();
        let mut q = DeferredQueue::new();
        let h = q.schedule(base, 100 * MS);
        assert!(q.cancel(h));
        assert!(!q.is_pending(h));
        assert!(q.due(base + 500 * MS).is_empty());
    }

    #[test]
    fn cancel_after_fire_reports_false() {
        let base = Instant::now();
        let mut q = DeferredQueue::new();
        let h = q.schedule(base, 10 * MS);
        q.due(base + 10 * MS);
        assert!(!q.cancel(h));
    }

    #[test]
    fn cancel_before_replace_coalesces() {
        // The discipline the coordinator applies to every debounce slot:
        // schedule at t=0 and again at t=50, both with a 200 ms delay —
        // exactly one entry fires, at t=250.
        let base = Instant::now();
        let mut q = DeferredQueue::new();

        let first = q.schedule(base, 200 * MS);
        q.cancel(first);
        let second = q.schedule(base + 50 * MS, 200 * MS);

        assert!(q.due(base + 200 * MS).is_empty(), "nothing fires at t=200");
        assert_eq!(q.due(base + 250 * MS), vec![second], "one fire at t=250");
        assert!(q.is_empty());
    }

    #[test]
    fn due_returns_in_due_order() {
        let base = Instant::now();
        let mut q = DeferredQueue::new();
        let late = q.schedule(base, 300 * MS);
        let early = q.schedule(base, 100 * MS);
        assert_eq!(q.due(base + 400 * MS), vec![early, late]);
    }

    #[test]
    fn next_due_tracks_earliest() {
        let base = Instant::now();
        let mut q = DeferredQueue::new();
        assert!(q.next_due().is_none());
        q.schedule(base, 300 * MS);
        let early = q.schedule(base, 100 * MS);
        assert_eq!(q.next_due(), Some(base + 100 * MS));
        q.cancel(early);
        assert_eq!(q.next_due(), Some(base + 300 * MS));
    }

    #[test]
    fn clear_drops_everything() {
        let base = Instant::now();
        let mut q = DeferredQueue::new();
        q.schedule(base, 100 * MS);
        q.schedule(base, 200 * MS);
        q.clear();
        assert!(q.is_empty());
        assert!(q.due(base + 500 * MS).is_empty());
    }
}
