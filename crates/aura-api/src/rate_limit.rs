//! Per-user fixed-window rate limiter for completion submissions. Pure
//! traffic shaping: it never affects correctness, which rests on the DB
//! uniqueness constraint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Window {
    started: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<i64, Window>>>,
    max_per_window: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_per_window,
            window,
        }
    }

    /// Record one attempt for `user_id`; false means over the cap.
    pub fn check(&self, user_id: i64) -> bool {
        self.check_at(user_id, Instant::now())
    }

    fn check_at(&self, user_id: i64, now: Instant) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(w) => w,
            // A poisoned limiter should never block requests
            Err(poisoned) => poisoned.into_inner(),
        };

        // Lapsed windows (including this user's) are dropped wholesale, so
        // idle users never accumulate in the map.
        windows.retain(|_, w| now.duration_since(w.started) < self.window);

        let w = windows.entry(user_id).or_insert(Window { started: now, count: 0 });
        w.count += 1;
        w.count <= self.max_per_window
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_within_window() {
        let rl = RateLimiter::new(3, Duration::from_secs(3600));
        let t0 = Instant::now();
        assert!(rl.check_at(1, t0));
        assert!(rl.check_at(1, t0));
        assert!(rl.check_at(1, t0));
        assert!(!rl.check_at(1, t0));
    }

    #[test]
    fn test_window_rollover_resets_count() {
        let rl = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(rl.check_at(1, t0));
        assert!(!rl.check_at(1, t0));
        assert!(rl.check_at(1, t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_stale_windows_evicted() {
        let rl = RateLimiter::new(5, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(rl.check_at(1, t0));
        assert!(rl.check_at(2, t0));
        assert_eq!(rl.tracked_users(), 2);

        // A later request sweeps out both lapsed windows
        assert!(rl.check_at(3, t0 + Duration::from_secs(61)));
        assert_eq!(rl.tracked_users(), 1);
    }

    #[test]
    fn test_users_are_independent() {
        let rl = RateLimiter::new(1, Duration::from_secs(3600));
        let t0 = Instant::now();
        assert!(rl.check_at(1, t0));
        assert!(rl.check_at(2, t0));
        assert!(!rl.check_at(1, t0));
    }
}
