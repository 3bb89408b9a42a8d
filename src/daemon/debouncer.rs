//! Per-target debouncing of filesystem events.
//!
//! Debouncing coalesces bursts of events (editor save + rename, glob
//! directories changing several files at once) into a single rebuild per
//! target.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Debounces rebuild requests by target index.
///
/// Records the last event time per target and releases targets that have
/// been quiet for the configured duration.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending rebuilds: target index -> last event timestamp.
    pending: HashMap<usize, Instant>,
    /// How long a target must be quiet before rebuilding.
    duration: Duration,
}

impl Debouncer {
    pub fn new(duration: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            duration,
        }
    }

    /// Record an event for a target, re-arming its quiet window.
    pub fn record(&mut self, target: usize) {
        self.pending.insert(target, Instant::now());
    }

    /// Drop all pending entries without side effects.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Take every target whose quiet window has elapsed.
    ///
    /// Released targets are returned in index order and removed from
    /// pending.
    pub fn take_ready(&mut self) -> Vec<usize> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|target, last_event| {
            if now.duration_since(*last_event) >= self.duration {
                ready.push(*target);
                false
            } else {
                true
            }
        });

        ready.sort_unstable();
        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn nothing_ready_before_quiet_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        debouncer.record(0);
        assert!(debouncer.take_ready().is_empty());
        assert!(debouncer.has_pending());

        sleep(Duration::from_millis(60));

        assert_eq!(debouncer.take_ready(), vec![0]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn new_event_rearms_the_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        debouncer.record(0);
        sleep(Duration::from_millis(30));

        // Re-arm; the target needs another full quiet window.
        debouncer.record(0);
        sleep(Duration::from_millis(30));
        assert!(debouncer.take_ready().is_empty());

        sleep(Duration::from_millis(30));
        assert_eq!(debouncer.take_ready(), vec![0]);
    }

    #[test]
    fn targets_release_independently_in_index_order() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        debouncer.record(2);
        debouncer.record(1);
        sleep(Duration::from_millis(60));
        debouncer.record(3);

        assert_eq!(debouncer.take_ready(), vec![1, 2]);
        assert!(debouncer.has_pending());

        sleep(Duration::from_millis(60));
        assert_eq!(debouncer.take_ready(), vec![3]);
    }

    #[test]
    fn clear_cancels_everything() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));

        debouncer.record(0);
        debouncer.record(1);
        debouncer.clear();
        assert!(!debouncer.has_pending());

        sleep(Duration::from_millis(20));
        assert!(debouncer.take_ready().is_empty());
    }
}
