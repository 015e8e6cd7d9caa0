//! Fixed-window rate limiting keyed by client IP.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Allows `max_requests` per client in each window.
///
/// A client's window opens with its first request and is replaced by a fresh
/// one on the first request after it has expired.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, ip: IpAddr) -> RateDecision {
        self.check_at(ip, Instant::now())
    }

    /// Record a request from `ip` at `now` and decide whether it may proceed
    pub fn check_at(&self, ip: IpAddr, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock();
        let entry = windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            RateDecision::Allowed {
                remaining: self.max_requests - entry.count,
            }
        } else {
            let elapsed = now.saturating_duration_since(entry.started);
            RateDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        }
    }

    /// Drop windows that have expired; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before - windows.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_allows_up_to_limit_then_blocks() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();

        assert_eq!(limiter.check_at(ip(1), t0), RateDecision::Allowed { remaining: 2 });
        assert_eq!(limiter.check_at(ip(1), t0), RateDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at(ip(1), t0), RateDecision::Allowed { remaining: 0 });

        let blocked = limiter.check_at(ip(1), t0 + Duration::from_secs(20));
        assert_eq!(
            blocked,
            RateDecision::Limited {
                retry_after: Duration::from_secs(40)
            }
        );
    }

    #[test]
    fn test_window_resets_after_sixty_seconds() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.check_at(ip(1), t0).is_allowed());
        assert!(!limiter.check_at(ip(1), t0 + Duration::from_secs(59)).is_allowed());
        assert!(limiter.check_at(ip(1), t0 + Duration::from_secs(60)).is_allowed());
        assert!(!limiter.check_at(ip(1), t0 + Duration::from_secs(61)).is_allowed());
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.check_at(ip(1), t0).is_allowed());
        assert!(!limiter.check_at(ip(1), t0).is_allowed());
        assert!(limiter.check_at(ip(2), t0).is_allowed());
    }

    #[test]
    fn test_purge_drops_only_expired_windows() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60));
        let t0 = Instant::now();

        limiter.check_at(ip(1), t0);
        limiter.check_at(ip(2), t0 + Duration::from_secs(30));
        assert_eq!(limiter.tracked_clients(), 2);

        assert_eq!(limiter.purge_expired_at(t0 + Duration::from_secs(70)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_zero_limit_blocks_everything() {
        let limiter = FixedWindowLimiter::new(0, Duration::from_secs(60));
        assert!(!limiter.check_at(ip(1), Instant::now()).is_allowed());
    }
}
