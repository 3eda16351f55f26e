//! Proactive admission control for outbound registry calls.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::nanos::Nanos;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::Quota;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::debug;

/// Call budget: at most `max_calls` admissions in any rolling `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateBudget {
    pub max_calls: u32,
    #[serde(rename = "window_secs", with = "duration_secs")]
    pub window: Duration,
}

impl RateBudget {
    pub const fn new(max_calls: u32, window: Duration) -> Self {
        Self { max_calls, window }
    }

    /// Minimum spacing between two admissions, rounded up to the next
    /// nanosecond so `max_calls` spacings never fall short of `window`.
    pub fn spacing(&self) -> Duration {
        let calls = u128::from(self.max_calls.max(1));
        let nanos = self.window.as_nanos().div_ceil(calls).max(1);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl Default for RateBudget {
    /// Upstream allows 600 calls per 300s; stay under both numbers.
    fn default() -> Self {
        Self::new(530, Duration::from_secs(290))
    }
}

/// GCRA quota with a burst of one: one cell per [`RateBudget::spacing`].
///
/// With admissions at least `window / max_calls` apart, no half-open window
/// of length `window` can hold more than `max_calls` of them.
pub fn quota_for(budget: &RateBudget) -> Quota {
    Quota::with_period(budget.spacing())
        .expect("spacing is always greater than zero")
        .allow_burst(NonZeroU32::MIN)
}

/// Monotonic clock on tokio's timer, so a paused runtime also pauses the limiter.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    type Instant = Nanos;

    fn now(&self) -> Self::Instant {
        Nanos::from(self.origin.elapsed())
    }
}

type DirectRateLimiter =
    governor::RateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<Nanos>>;

/// Rate limiter shared by every registry endpoint.
///
/// `acquire` suspends the caller until the quota admits another call.
pub struct RateLimiter {
    budget: RateBudget,
    clock: TokioClock,
    limiter: DirectRateLimiter,
}

impl RateLimiter {
    pub fn new(budget: RateBudget) -> Self {
        let clock = TokioClock::new();
        Self {
            budget,
            clock,
            limiter: governor::RateLimiter::direct_with_clock(quota_for(&budget), &clock),
        }
    }

    pub fn budget(&self) -> RateBudget {
        self.budget
    }

    pub async fn acquire(&self) {
        loop {
            match self.limiter.check() {
                Ok(()) => return,
                Err(not_until) => {
                    let wait = not_until.wait_time_from(self.clock.now());
                    debug!(
                        wait_ms = wait.as_millis() as u64,
                        max_calls = self.budget.max_calls,
                        "rate budget exhausted; sleeping"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateBudget::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("budget", &self.budget)
            .finish()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
