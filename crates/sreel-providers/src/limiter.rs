//! Token-bucket pacing for external calls.
//!
//! Provider backends and job starts are paced with `governor` limiters
//! rather than fixed sleeps, so the pacing is enforced even when calls are
//! issued back to back and tests need not wait on wall-clock delays.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paces calls to a shared external service.
pub struct Pacer {
    limiter: DirectLimiter,
}

impl Pacer {
    /// Allow `n` calls per second.
    pub fn per_second(n: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(n.max(1)).expect("non-zero"));
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Allow `n` calls per minute.
    pub fn per_minute(n: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(n.max(1)).expect("non-zero"));
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Image generation pacing: one call per second (the nominal 1000 ms
    /// inter-call gap).
    pub fn for_images() -> Self {
        Self::per_second(1)
    }

    /// Voice synthesis pacing: two calls per second (the nominal 500 ms
    /// inter-call gap).
    pub fn for_audio() -> Self {
        Self::per_second(2)
    }

    /// Wait until a call is permitted.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Non-blocking check, used by callers that would rather skip than wait.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_permit_is_immediate() {
        let pacer = Pacer::per_second(1);
        assert!(pacer.try_acquire());
    }

    #[tokio::test]
    async fn burst_is_bounded() {
        let pacer = Pacer::per_minute(2);
        assert!(pacer.try_acquire());
        assert!(pacer.try_acquire());
        assert!(!pacer.try_acquire());
    }
}
