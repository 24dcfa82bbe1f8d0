//! Per-minute request limiter for the provider API.
//!
//! The window resets wholesale once it is older than a minute, so a burst at
//! the end of one window can be followed by a full burst at the start of the
//! next.

use std::time::{Duration, Instant};

/// Length of one rate-limit window
pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    requests_in_window: u32,
    window_start: Instant,
}

impl RateLimiter {
    /// Allow `limit` requests per 60 second window.
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            requests_in_window: 0,
            window_start: Instant::now(),
        }
    }

    /// Consume one request slot. `false` means the caller must not make the call.
    pub fn can_make_request(&mut self) -> bool {
        self.can_make_request_at(Instant::now())
    }

    pub fn can_make_request_at(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) > WINDOW {
            self.requests_in_window = 0;
            self.window_start = now;
        }

        if self.requests_in_window >= self.limit {
            tracing::warn!(
                "Rate limit reached: {} requests in the current window",
                self.requests_in_window
            );
            return false;
        }

        self.requests_in_window += 1;
        true
    }

    /// Slots left in the current window
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.requests_in_window)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_exactly_limit_requests_per_window() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(30);

        let allowed = (0..40)
            .filter(|i| limiter.can_make_request_at(start + Duration::from_millis(*i)))
            .count();

        assert_eq!(allowed, 30);
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_rejects_until_window_resets() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(2);

        assert!(limiter.can_make_request_at(start));
        assert!(limiter.can_make_request_at(start));
        assert!(!limiter.can_make_request_at(start + Duration::from_secs(30)));
        // Exactly 60s is still inside the window
        assert!(!limiter.can_make_request_at(start + WINDOW));
        assert!(limiter.can_make_request_at(start + WINDOW + Duration::from_millis(1)));
    }

    #[test]
    fn test_burst_across_window_boundary() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(3);
        let late = start + Duration::from_secs(59);
        let early_next = start + Duration::from_secs(61);

        let first: usize = (0..3).filter(|_| limiter.can_make_request_at(late)).count();
        let second: usize = (0..3).filter(|_| limiter.can_make_request_at(early_next)).count();

        // Two seconds apart, yet 2x the limit got through
        assert_eq!(first + second, 6);
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let mut limiter = RateLimiter::new(0);
        assert!(!limiter.can_make_request());
        assert_eq!(limiter.limit(), 0);
    }
}
