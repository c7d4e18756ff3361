//! # Fibonacci Backoff
//!
//! Progressive requeue delays for failed reconciliations. The sequence grows
//! more slowly than exponential backoff: 5s, 5s, 10s, 15s, 25s, 40s, ... up
//! to 300s. Each resource keeps its own sequence, which restarts after a
//! successful reconciliation.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Shortest requeue delay in seconds
pub const MIN_BACKOFF_SECONDS: u64 = 5;

/// Longest requeue delay in seconds
pub const MAX_BACKOFF_SECONDS: u64 = 300;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at the maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev_seconds: u64,
    current_seconds: u64,
    max_seconds: u64,
}

impl FibonacciBackoff {
    /// Create a new backoff running from `min_seconds` up to `max_seconds`
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_seconds;

        let next = self.prev_seconds + self.current_seconds;
        self.prev_seconds = self.current_seconds;
        self.current_seconds = std::cmp::min(next, self.max_seconds);

        Duration::from_secs(result)
    }
}

/// Per-resource backoff bookkeeping, keyed by `namespace/name`
#[derive(Debug)]
pub struct RetryTracker {
    min_seconds: u64,
    max_seconds: u64,
    entries: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new(MIN_BACKOFF_SECONDS, MAX_BACKOFF_SECONDS)
    }
}

impl RetryTracker {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            max_seconds,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before retrying `key` after another failure
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(key.to_string())
            .or_insert_with(|| FibonacciBackoff::new(self.min_seconds, self.max_seconds))
            .next_backoff()
    }

    /// Forget the failures of `key`
    pub fn reset(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut FibonacciBackoff) -> u64 {
        backoff.next_backoff().as_secs()
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(5, 300);

        let sequence: Vec<u64> = (0..9).map(|_| secs(&mut backoff)).collect();
        assert_eq!(sequence, vec![5, 5, 10, 15, 25, 40, 65, 105, 170]);
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(5, 300);

        for _ in 0..9 {
            backoff.next_backoff();
        }
        // Next would be 275, then 445 capped at 300
        assert_eq!(secs(&mut backoff), 275);
        assert_eq!(secs(&mut backoff), 300);
        assert_eq!(secs(&mut backoff), 300);
    }

    #[test]
    fn test_tracker_keeps_sequences_per_resource() {
        let tracker = RetryTracker::default();

        assert_eq!(tracker.next_delay("default/a").as_secs(), 5);
        assert_eq!(tracker.next_delay("default/a").as_secs(), 5);
        assert_eq!(tracker.next_delay("default/a").as_secs(), 10);
        assert_eq!(tracker.next_delay("default/b").as_secs(), 5);

        tracker.reset("default/a");
        assert_eq!(tracker.next_delay("default/a").as_secs(), 5);
        assert_eq!(tracker.next_delay("default/b").as_secs(), 5);
    }
}
