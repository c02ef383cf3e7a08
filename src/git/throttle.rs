//! Per-repository pull throttle.
//!
//! One token bucket per mirror directory with burst 1 and a refill rate of one
//! token per cooldown, so at most one refresh per cooldown is granted no matter
//! how many callers ask at once. Buckets are created on first use and kept for
//! the lifetime of the throttle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::config::DEFAULT_PULL_COOLDOWN;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    cooldown: Duration,
    last_update: Instant,
}

impl TokenBucket {
    /// Starts full, so the first caller is always let through.
    fn new(cooldown: Duration, now: Instant) -> Self {
        Self {
            tokens: 1.0,
            capacity: 1.0,
            cooldown,
            last_update: now,
        }
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed / self.cooldown.as_secs_f64()).min(self.capacity);
        self.last_update = self.last_update.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
pub struct PullThrottle {
    cooldown: Duration,
    buckets: RwLock<HashMap<String, Arc<Mutex<TokenBucket>>>>,
}

impl PullThrottle {
    /// A zero cooldown falls back to the default.
    pub fn new(cooldown: Duration) -> Self {
        let cooldown = if cooldown.is_zero() {
            DEFAULT_PULL_COOLDOWN
        } else {
            cooldown
        };
        Self {
            cooldown,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether a refresh of `key` may happen now. Consumes the permit when granted.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let bucket = self.bucket(key, now);
        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_consume(now)
    }

    fn bucket(&self, key: &str, now: Instant) -> Arc<Mutex<TokenBucket>> {
        {
            let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(bucket) = buckets.get(key) {
                return bucket.clone();
            }
        }
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::new(self.cooldown, now))))
            .clone()
    }

    /// Number of keys seen so far.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.read().map(|b| b.len()).unwrap_or(0)
    }
}

impl Default for PullThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_PULL_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;

    #[test]
    fn one_permit_among_concurrent_callers() {
        let throttle = PullThrottle::new(Duration::from_secs(2));
        let count = 6;
        let barrier = Barrier::new(count);

        let granted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..count)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        throttle.allow("test")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum()
        });

        assert_eq!(granted, 1);
        assert_eq!(throttle.tracked_keys(), 1);
    }

    #[test]
    fn permit_returns_after_cooldown() {
        let throttle = PullThrottle::new(Duration::from_secs(2));
        let start = Instant::now();

        assert!(throttle.allow_at("repo", start));
        assert!(!throttle.allow_at("repo", start + Duration::from_secs(1)));
        assert!(throttle.allow_at("repo", start + Duration::from_secs(2)));
        assert!(!throttle.allow_at("repo", start + Duration::from_millis(2500)));
    }

    #[test]
    fn keys_are_independent() {
        let throttle = PullThrottle::new(Duration::from_secs(60));
        assert!(throttle.allow("a"));
        assert!(throttle.allow("b"));
        assert!(!throttle.allow("a"));
        assert_eq!(throttle.tracked_keys(), 2);
    }

    #[test]
    fn zero_cooldown_uses_default() {
        assert_eq!(PullThrottle::new(Duration::ZERO).cooldown(), DEFAULT_PULL_COOLDOWN);
    }
}
