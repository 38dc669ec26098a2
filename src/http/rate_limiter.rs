use std::num::NonZeroU32;

use governor::{
    clock::Clock,
    middleware::NoOpMiddleware,
    nanos::Nanos,
    state::{InMemoryState, NotKeyed},
    Quota,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::HttpError;

/// `governor` clock driven by `tokio::time`, so waits follow the runtime timer
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Instant,
}

impl Default for TokioClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    type Instant = Nanos;

    fn now(&self) -> Self::Instant {
        Nanos::from(self.origin.elapsed())
    }
}

type DirectLimiter =
    governor::RateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<Nanos>>;

/// GCRA limiter allowing a burst of `requests_per_second`, then one request
/// every `1s / requests_per_second`
///
/// Idle time never earns more than the initial burst.
pub struct RateLimiter {
    limiter: DirectLimiter,
    clock: TokioClock,
    capacity: NonZeroU32,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let capacity = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let clock = TokioClock::default();
        let limiter = governor::RateLimiter::direct_with_clock(Quota::per_second(capacity), &clock);

        tracing::debug!(capacity = capacity.get(), "Rate limiter ready");

        Self {
            limiter,
            clock,
            capacity,
        }
    }

    /// Waits until a request may be sent
    ///
    /// Returns [`HttpError::Cancelled`] as soon as `cancel` fires, even while
    /// waiting for the next slot.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), HttpError> {
        loop {
            if cancel.is_cancelled() {
                return Err(HttpError::Cancelled);
            }

            let wait = match self.limiter.check() {
                Ok(()) => return Ok(()),
                Err(not_until) => not_until.wait_time_from(self.clock.now()),
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HttpError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity.get()
    }
}
