//! Sliding-window admission control.
//!
//! At most `max_requests` admissions per identity in any trailing `window`.
//! No burst allowance.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use hiroba_shared::time::Clock;

pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    /// identity -> ascending admission timestamps (millis)
    windows: DashMap<String, Vec<i64>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window,
            clock,
            windows: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request for `identity`.
    ///
    /// Pruning, the count check and the append all happen under the entry's
    /// shard lock, so concurrent checks for one identity cannot both slip in.
    pub fn allow(&self, identity: &str) -> bool {
        let now = self.clock.now_millis();
        let window_start = now - self.window_millis();

        let mut timestamps = self.windows.entry(identity.to_string()).or_default();
        let first_valid = timestamps.partition_point(|&t| t < window_start);
        timestamps.drain(..first_valid);

        if timestamps.len() >= self.max_requests {
            tracing::debug!(
                "rate limit hit for '{}' ({} in window)",
                identity,
                timestamps.len()
            );
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Drop identities with no admissions inside the current window.
    /// Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let window_start = self.clock.now_millis() - self.window_millis();
        let before = self.windows.len();
        self.windows
            .retain(|_, timestamps| timestamps.last().is_some_and(|&t| t >= window_start));
        before.saturating_sub(self.windows.len())
    }

    /// Number of identities currently tracked
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    fn window_millis(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }
}
