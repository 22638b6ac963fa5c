//! Per-source call budgets for upstream data APIs
//!
//! A source admits at most `max_calls` in any trailing `window`. A GCRA
//! limiter paces calls at the budget's average rate; a log of admitted call
//! instants holds the hard ceiling, which GCRA alone overshoots once its
//! burst starts refilling.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};

type GcraLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Upstream data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Finnhub,
    NewsApi,
    Yahoo,
}

impl Source {
    pub const ALL: [Self; 3] = [Self::Finnhub, Self::NewsApi, Self::Yahoo];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Finnhub => "finnhub",
            Self::NewsApi => "newsapi",
            Self::Yahoo => "yahoo",
        }
    }

    /// Call ceiling for this source
    pub fn budget(self) -> Budget {
        match self {
            Self::Finnhub => Budget::new(60, Duration::from_secs(60)),
            Self::NewsApi => Budget::new(100, Duration::from_secs(24 * 60 * 60)),
            Self::Yahoo => Budget::new(100, Duration::from_secs(60)),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most `max_calls` per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_calls: u32,
    pub window: Duration,
}

impl Budget {
    pub const fn new(max_calls: u32, window: Duration) -> Self {
        Self { max_calls, window }
    }

    fn quota(self) -> Quota {
        let burst = NonZeroU32::new(self.max_calls).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(self.window / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst)
    }
}

/// Instants of the calls admitted inside the trailing window
#[derive(Debug)]
struct CallLog {
    budget: Budget,
    calls: VecDeque<Instant>,
}

impl CallLog {
    fn new(budget: Budget) -> Self {
        Self {
            budget,
            calls: VecDeque::with_capacity(budget.max_calls as usize),
        }
    }

    /// Drop expired calls and report whether one more fits
    fn has_room(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.calls.front() {
            if now.saturating_duration_since(oldest) < self.budget.window {
                break;
            }
            self.calls.pop_front();
        }
        self.calls.len() < self.budget.max_calls as usize
    }

    fn record(&mut self, now: Instant) {
        self.calls.push_back(now);
    }
}

struct SourceLimiter {
    gcra: GcraLimiter,
    log: Mutex<CallLog>,
}

impl SourceLimiter {
    fn new(budget: Budget) -> Self {
        Self {
            gcra: RateLimiter::direct(budget.quota()),
            log: Mutex::new(CallLog::new(budget)),
        }
    }

    fn try_acquire(&self) -> bool {
        let now = Instant::now();
        // a poisoned log only means another caller panicked mid-update
        let mut log = self.log.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !log.has_room(now) || self.gcra.check().is_err() {
            return false;
        }
        log.record(now);
        true
    }
}

/// Non-blocking limiter shared by every data client
#[derive(Clone)]
pub struct SourceRateLimiter {
    limiters: Arc<HashMap<Source, SourceLimiter>>,
}

impl SourceRateLimiter {
    pub fn new() -> Self {
        Self::with_budgets(Source::ALL.map(|source| (source, source.budget())))
    }

    /// Limiter with explicit budgets; sources left out are never limited
    pub fn with_budgets(budgets: impl IntoIterator<Item = (Source, Budget)>) -> Self {
        let limiters = budgets
            .into_iter()
            .map(|(source, budget)| (source, SourceLimiter::new(budget)))
            .collect();
        Self {
            limiters: Arc::new(limiters),
        }
    }

    /// Check and record one call. `false` means the budget is spent.
    pub fn try_acquire(&self, source: Source) -> bool {
        let allowed = self
            .limiters
            .get(&source)
            .is_none_or(SourceLimiter::try_acquire);
        if !allowed {
            tracing::warn!(source = %source, "rate limit reached, skipping call");
        }
        allowed
    }
}

impl Default for SourceRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SourceRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRateLimiter")
            .field("sources", &self.limiters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        assert_eq!(Source::Finnhub.budget(), Budget::new(60, Duration::from_secs(60)));
        assert_eq!(Source::NewsApi.budget().max_calls, 100);
        assert_eq!(Source::NewsApi.budget().window, Duration::from_secs(86_400));
        assert_eq!(Source::Yahoo.budget(), Budget::new(100, Duration::from_secs(60)));
    }

    #[test]
    fn test_finnhub_denies_after_sixty_calls() {
        let limiter = SourceRateLimiter::new();
        for _ in 0..60 {
            assert!(limiter.try_acquire(Source::Finnhub));
        }
        assert!(!limiter.try_acquire(Source::Finnhub));
        // other sources keep their own budget
        assert!(limiter.try_acquire(Source::NewsApi));
    }

    #[test]
    fn test_clones_share_budget() {
        let limiter = SourceRateLimiter::with_budgets([(Source::NewsApi, Budget::new(2, Duration::from_secs(3600)))]);
        let other = limiter.clone();
        assert!(limiter.try_acquire(Source::NewsApi));
        assert!(other.try_acquire(Source::NewsApi));
        assert!(!limiter.try_acquire(Source::NewsApi));
    }

    #[test]
    fn test_ceiling_holds_across_refill_interval() {
        // GCRA alone would hand back a cell every 500ms here
        let limiter = SourceRateLimiter::with_budgets([(Source::Finnhub, Budget::new(4, Duration::from_secs(2)))]);
        let mut admitted = (0..4).filter(|_| limiter.try_acquire(Source::Finnhub)).count();
        std::thread::sleep(Duration::from_millis(600));
        admitted += (0..4).filter(|_| limiter.try_acquire(Source::Finnhub)).count();
        assert_eq!(admitted, 4);
    }

    #[test]
    fn test_call_log_slides_with_the_window() {
        let budget = Budget::new(3, Duration::from_secs(60));
        let mut log = CallLog::new(budget);
        let start = Instant::now();

        for offset in [0, 10, 20] {
            let at = start + Duration::from_secs(offset);
            assert!(log.has_room(at));
            log.record(at);
        }
        assert!(!log.has_room(start + Duration::from_secs(59)));
        // the first call ages out at exactly one window
        assert!(log.has_room(start + Duration::from_secs(60)));
        log.record(start + Duration::from_secs(60));
        assert!(!log.has_room(start + Duration::from_secs(69)));
        assert!(log.has_room(start + Duration::from_secs(70)));
    }

    #[test]
    fn test_unlisted_source_is_unlimited() {
        let limiter = SourceRateLimiter::with_budgets([]);
        for _ in 0..500 {
            assert!(limiter.try_acquire(Source::Yahoo));
        }
    }
}
