// Network idle tracking: in-flight request bookkeeping fed by CDP events.
//
// A page is idle once no more than `max_inflight` requests are open and
// nothing has started or finished for the quiet window. Redirects reuse the
// request id, so an id is counted once until it finishes or fails.

use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct NetworkTracker {
    inflight: HashSet<String>,
    last_activity: Instant,
    max_inflight: usize,
}

impl NetworkTracker {
    pub fn new(max_inflight: usize, now: Instant) -> Self {
        Self {
            inflight: HashSet::new(),
            last_activity: now,
            max_inflight,
        }
    }

    /// `Network.requestWillBeSent`
    pub fn request_started(&mut self, request_id: &str, now: Instant) {
        self.inflight.insert(request_id.to_string());
        self.last_activity = now;
    }

    /// `Network.loadingFinished` or `Network.loadingFailed`. Ids we never
    /// saw start are ignored.
    pub fn request_finished(&mut self, request_id: &str, now: Instant) {
        if self.inflight.remove(request_id) {
            self.last_activity = now;
        }
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_idle(&self, now: Instant, quiet: Duration) -> bool {
        self.inflight.len() <= self.max_inflight
            && now.saturating_duration_since(self.last_activity) >= quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(500);

    #[test]
    fn slow_request_keeps_the_page_busy() {
        let t0 = Instant::now();
        let mut tracker = NetworkTracker::new(0, t0);
        tracker.request_started("doc", t0);
        tracker.request_finished("doc", t0 + Duration::from_millis(100));

        // Table XHR starts after load and takes two seconds.
        tracker.request_started("xhr", t0 + Duration::from_millis(200));
        assert!(!tracker.is_idle(t0 + Duration::from_millis(1500), QUIET));
        assert!(!tracker.is_idle(t0 + Duration::from_millis(2100), QUIET));

        tracker.request_finished("xhr", t0 + Duration::from_millis(2200));
        assert!(!tracker.is_idle(t0 + Duration::from_millis(2500), QUIET));
        assert!(tracker.is_idle(t0 + Duration::from_millis(2700), QUIET));
    }

    #[test]
    fn redirects_count_once() {
        let t0 = Instant::now();
        let mut tracker = NetworkTracker::new(0, t0);
        tracker.request_started("r1", t0);
        tracker.request_started("r1", t0);
        assert_eq!(tracker.inflight(), 1);
        tracker.request_finished("r1", t0);
        assert_eq!(tracker.inflight(), 0);
    }

    #[test]
    fn unknown_finish_does_not_reset_the_quiet_window() {
        let t0 = Instant::now();
        let mut tracker = NetworkTracker::new(0, t0);
        tracker.request_finished("stray", t0 + Duration::from_millis(400));
        assert!(tracker.is_idle(t0 + QUIET, QUIET));
    }

    #[test]
    fn burst_threshold_tolerates_long_polls() {
        let t0 = Instant::now();
        let mut tracker = NetworkTracker::new(1, t0);
        tracker.request_started("poll", t0);
        assert!(tracker.is_idle(t0 + QUIET, QUIET));
        tracker.request_started("xhr", t0 + QUIET);
        assert!(!tracker.is_idle(t0 + QUIET * 3, QUIET));
    }
}
