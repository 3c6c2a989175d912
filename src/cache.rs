/// Single-slot, time-expiring memo for load results.
///
/// Holds at most one value together with the time it was produced. A read
/// within `ttl` of that time returns the stored value; anything later
/// replaces it wholesale by running the refresh closure. There is no
/// content-based invalidation and no locking: the owner is the only user.
///
/// `now` is passed in by the caller so expiry can be tested without sleeping.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug)]
struct CachedValue<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TimedCache<T> {
    slot: Option<CachedValue<T>>,
    ttl: Duration,
}

impl<T> TimedCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { slot: None, ttl }
    }

    /// True when a value is stored and younger than `ttl` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|cached| now - cached.fetched_at < self.ttl)
    }

    /// Time the stored value was produced, if any.
    #[cfg(test)]
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.slot.as_ref().map(|cached| cached.fetched_at)
    }

    /// Returns the stored value if fresh at `now`, otherwise stores and
    /// returns the result of `refresh`.
    pub fn get_or_refresh<F>(&mut self, now: DateTime<Utc>, refresh: F) -> &T
    where
        F: FnOnce() -> T,
    {
        if !self.is_fresh(now) {
            tracing::debug!(ttl_secs = self.ttl.num_seconds(), "cache expired, refreshing");
            self.slot = None;
        }
        let cached = self.slot.get_or_insert_with(|| CachedValue {
            value: refresh(),
            fetched_at: now,
        });
        &cached.value
    }

    /// Drops the stored value so the next read refreshes.
    #[cfg(test)]
    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_first_read_refreshes() {
        let mut cache = TimedCache::new(Duration::seconds(30));
        assert!(!cache.is_fresh(t0()));
        assert_eq!(*cache.get_or_refresh(t0(), || 1), 1);
        assert_eq!(cache.fetched_at(), Some(t0()));
    }

    #[test]
    fn test_read_within_ttl_reuses_value() {
        let mut cache = TimedCache::new(Duration::seconds(30));
        let mut calls = 0;
        cache.get_or_refresh(t0(), || {
            calls += 1;
            "first"
        });
        let value = *cache.get_or_refresh(t0() + Duration::seconds(29), || {
            calls += 1;
            "second"
        });
        assert_eq!(value, "first");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_read_at_ttl_boundary_refreshes() {
        let mut cache = TimedCache::new(Duration::seconds(30));
        cache.get_or_refresh(t0(), || "first");
        let later = t0() + Duration::seconds(30);
        assert_eq!(*cache.get_or_refresh(later, || "second"), "second");
        assert_eq!(cache.fetched_at(), Some(later));
    }

    #[test]
    fn test_invalidate_forces_refresh() {
        let mut cache = TimedCache::new(Duration::hours(1));
        cache.get_or_refresh(t0(), || 1);
        cache.invalidate();
        assert_eq!(*cache.get_or_refresh(t0(), || 2), 2);
    }
}
