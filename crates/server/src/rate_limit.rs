//! Per-connection rate limiting for the media-stream WebSocket (spec §4.10,
//! ambient stack). Each connection gets its own sliding-window limiter over
//! both message count and byte volume so a single misbehaving carrier leg
//! can't starve the others sharing a process.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use thiserror::Error;

use voxloop_config::RateLimitConfig;

#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    #[error("message rate limit exceeded; retry after {retry_after_ms}ms")]
    MessagesExceeded { retry_after_ms: u64 },

    #[error("byte rate limit exceeded; retry after {retry_after_ms}ms")]
    BytesExceeded { retry_after_ms: u64 },
}

/// Sliding one-second window over inbound carrier frames, with a small burst
/// allowance layered on top so a single 20ms audio frame burst at connect
/// time doesn't immediately trip the limiter.
#[derive(Debug)]
pub struct ConnectionRateLimiter {
    messages_per_sec: u32,
    bytes_per_sec: u32,
    burst: u32,
    message_window: VecDeque<Instant>,
    byte_window: VecDeque<(Instant, u32)>,
}

impl ConnectionRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            messages_per_sec: config.messages_per_sec,
            bytes_per_sec: config.bytes_per_sec,
            burst: config.burst,
            message_window: VecDeque::new(),
            byte_window: VecDeque::new(),
        }
    }

    fn evict_before(window: &mut VecDeque<Instant>, cutoff: Instant) {
        while let Some(&front) = window.front() {
            if front < cutoff {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    fn evict_bytes_before(window: &mut VecDeque<(Instant, u32)>, cutoff: Instant) {
        while let Some(&(ts, _)) = window.front() {
            if ts < cutoff {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records one inbound frame of `len` bytes and checks both limits.
    /// Call once per carrier WebSocket message before handing it to the
    /// media bridge.
    pub fn check(&mut self, len: usize) -> Result<(), RateLimitError> {
        let now = Instant::now();
        let window_start = now - Duration::from_secs(1);
        let allowance = self.messages_per_sec.saturating_add(self.burst);
        let byte_allowance = self.bytes_per_sec.saturating_add(self.burst * 1024);

        Self::evict_before(&mut self.message_window, window_start);
        if self.message_window.len() >= allowance as usize {
            let oldest = *self.message_window.front().expect("non-empty checked above");
            let retry_after_ms = Duration::from_secs(1).saturating_sub(now.duration_since(oldest)).as_millis() as u64;
            return Err(RateLimitError::MessagesExceeded { retry_after_ms });
        }

        Self::evict_bytes_before(&mut self.byte_window, window_start);
        let bytes_in_window: u32 = self.byte_window.iter().map(|(_, n)| *n).sum();
        if bytes_in_window.saturating_add(len as u32) > byte_allowance {
            let oldest = self.byte_window.front().map(|(ts, _)| *ts).unwrap_or(now);
            let retry_after_ms = Duration::from_secs(1).saturating_sub(now.duration_since(oldest)).as_millis() as u64;
            return Err(RateLimitError::BytesExceeded { retry_after_ms });
        }

        self.message_window.push_back(now);
        self.byte_window.push_back((now, len as u32));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(messages_per_sec: u32, bytes_per_sec: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig { messages_per_sec, bytes_per_sec, burst }
    }

    #[test]
    fn allows_within_limit() {
        let mut limiter = ConnectionRateLimiter::new(&config(5, 100_000, 0));
        for _ in 0..5 {
            assert!(limiter.check(100).is_ok());
        }
    }

    #[test]
    fn blocks_messages_exceeding_limit() {
        let mut limiter = ConnectionRateLimiter::new(&config(3, 100_000, 0));
        for _ in 0..3 {
            assert!(limiter.check(10).is_ok());
        }
        let result = limiter.check(10);
        assert!(matches!(result, Err(RateLimitError::MessagesExceeded { .. })));
    }

    #[test]
    fn blocks_bytes_exceeding_limit() {
        let mut limiter = ConnectionRateLimiter::new(&config(1000, 500, 0));
        assert!(limiter.check(400).is_ok());
        let result = limiter.check(200);
        assert!(matches!(result, Err(RateLimitError::BytesExceeded { .. })));
    }

    #[test]
    fn burst_allowance_extends_message_limit() {
        let mut limiter = ConnectionRateLimiter::new(&config(2, 100_000, 3));
        for _ in 0..5 {
            assert!(limiter.check(10).is_ok());
        }
        assert!(limiter.check(10).is_err());
    }
}
