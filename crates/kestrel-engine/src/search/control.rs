//! Search control: stop flag, time budget and node limit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::time::TimeBudget;

/// Clock is consulted once every this many nodes.
const CLOCK_CHECK_MASK: u64 = 1023;

/// Decides when a running search must abort.
///
/// The external flag is read on every call; the clock only every 1024 nodes.
/// Once the budget or node limit is exceeded the flag is latched so every
/// later call returns immediately.
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    budget: Option<Duration>,
    node_limit: Option<u64>,
}

impl SearchControl {
    /// Start the clock now.
    pub fn new(stopped: Arc<AtomicBool>, budget: TimeBudget, node_limit: Option<u64>) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            budget: budget.limit,
            node_limit,
        }
    }

    /// Only the external flag can stop this search.
    pub fn unbounded(stopped: Arc<AtomicBool>) -> Self {
        Self::new(stopped, TimeBudget::UNBOUNDED, None)
    }

    /// Whether the search must stop, given the nodes visited so far.
    pub fn aborted(&self, nodes: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        if let Some(limit) = self.node_limit
            && nodes >= limit
        {
            self.stopped.store(true, Ordering::Relaxed);
            return true;
        }

        if nodes & CLOCK_CHECK_MASK != 0 {
            return false;
        }

        if let Some(budget) = self.budget
            && self.start.elapsed() >= budget
        {
            self.stopped.store(true, Ordering::Relaxed);
            return true;
        }

        false
    }

    /// Time since the search started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_flag_stops_immediately() {
        let flag = Arc::new(AtomicBool::new(false));
        let control = SearchControl::unbounded(Arc::clone(&flag));
        assert!(!control.aborted(1));
        flag.store(true, Ordering::Relaxed);
        assert!(control.aborted(1));
    }

    #[test]
    fn node_limit_latches() {
        let flag = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new(Arc::clone(&flag), TimeBudget::UNBOUNDED, Some(100));
        assert!(!control.aborted(99));
        assert!(control.aborted(100));
        assert!(flag.load(Ordering::Relaxed));
        assert!(control.aborted(0));
    }

    #[test]
    fn clock_checked_only_on_boundary() {
        let flag = Arc::new(AtomicBool::new(false));
        let budget = TimeBudget {
            limit: Some(Duration::ZERO),
        };
        let control = SearchControl::new(Arc::clone(&flag), budget, None);
        assert!(!control.aborted(1));
        assert!(control.aborted(1024));
        assert!(flag.load(Ordering::Relaxed));
    }
}
