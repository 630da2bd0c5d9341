//! TTL freshness decision

use super::store::MetadataRecord;
use chrono::{DateTime, Duration, Utc};

/// Default time-to-live for cached assets, in days
pub const DEFAULT_TTL_DAYS: i64 = 14;

/// Decides whether a cached resource has outlived its TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    ttl: Duration,
}

impl FreshnessPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A missing record is always expired. Otherwise the entry expires once
    /// its age strictly exceeds the TTL.
    pub fn is_expired(&self, record: Option<&MetadataRecord>, now: DateTime<Utc>) -> bool {
        match record {
            None => true,
            Some(record) => now - record.cached_at > self.ttl,
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_TTL_DAYS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_ttl_is_fourteen_days_in_millis() {
        assert_eq!(FreshnessPolicy::default().ttl().num_milliseconds(), 1_209_600_000);
    }

    #[test]
    fn test_missing_record_is_expired() {
        assert!(FreshnessPolicy::default().is_expired(None, t0()));
    }

    #[test]
    fn test_expired_one_millisecond_past_ttl() {
        let policy = FreshnessPolicy::default();
        let record = MetadataRecord::new(t0());
        let now = t0() + Duration::milliseconds(1_209_600_001);
        assert!(policy.is_expired(Some(&record), now));
    }

    #[test]
    fn test_fresh_one_millisecond_before_ttl() {
        let policy = FreshnessPolicy::default();
        let record = MetadataRecord::new(t0());
        let now = t0() + Duration::milliseconds(1_209_599_999);
        assert!(!policy.is_expired(Some(&record), now));
    }

    #[test]
    fn test_exactly_at_ttl_is_fresh() {
        let policy = FreshnessPolicy::default();
        let record = MetadataRecord::new(t0());
        assert!(!policy.is_expired(Some(&record), t0() + Duration::days(14)));
    }

    #[test]
    fn test_custom_ttl() {
        let policy = FreshnessPolicy::new(Duration::hours(1));
        let record = MetadataRecord::new(t0());
        assert!(!policy.is_expired(Some(&record), t0() + Duration::minutes(59)));
        assert!(policy.is_expired(Some(&record), t0() + Duration::minutes(61)));
    }

    #[test]
    fn test_record_from_the_future_is_fresh() {
        let policy = FreshnessPolicy::default();
        let record = MetadataRecord::new(t0() + Duration::hours(1));
        assert!(!policy.is_expired(Some(&record), t0()));
    }
}
