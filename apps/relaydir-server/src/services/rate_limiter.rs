use chrono::{DateTime, DurationRound, TimeDelta, Utc};

use crate::error::ApiError;
use relaydir_db::repositories::access_log_repo::AccessLogRepository;
use relaydir_db::repositories::credential_repo::CredentialRepository;

const WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: i32,
    pub remaining: i32,
    /// Advertised as the start of the next wall-clock minute, not the true
    /// sliding-window expiry. Kept as the original service reported it.
    pub reset_at: DateTime<Utc>,
}

/// Counting limiter over the access log: no token bucket, no in-process
/// counters, recomputed from the table on every check. The check runs before
/// the current call is logged and the boundary is inclusive: a check that
/// sees count == limit is still admitted (with remaining 0), the one after
/// it is rejected. Concurrent bursts racing the logger can briefly overshoot
/// the cap; that looseness is accepted.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    credentials: CredentialRepository,
    access_log: AccessLogRepository,
}

impl RateLimiter {
    pub fn new(credentials: CredentialRepository, access_log: AccessLogRepository) -> Self {
        Self {
            credentials,
            access_log,
        }
    }

    pub async fn check(&self, credential_id: i64) -> Result<RateDecision, ApiError> {
        let now = Utc::now();

        let Some(credential) = self.credentials.get_by_id(credential_id).await? else {
            // Deleted or never existed: deny with nothing left to wait for.
            return Ok(RateDecision {
                allowed: false,
                limit: 0,
                remaining: 0,
                reset_at: now,
            });
        };

        let cutoff = now - TimeDelta::seconds(WINDOW_SECS);
        let count = self.access_log.count_since(credential_id, cutoff).await?;

        Ok(decide(credential.rate_limit, count, now))
    }
}

fn decide(limit: i32, count: i64, now: DateTime<Utc>) -> RateDecision {
    let remaining = (limit as i64 - count).max(0) as i32;
    RateDecision {
        allowed: count <= limit as i64,
        limit,
        remaining,
        reset_at: next_minute(now),
    }
}

fn next_minute(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(TimeDelta::minutes(1)).unwrap_or(now) + TimeDelta::minutes(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn under_the_limit_is_allowed() {
        let d = decide(5, 3, Utc::now());
        assert!(d.allowed);
        assert_eq!(d.remaining, 2);
    }

    #[test]
    fn full_window_is_still_admitted_with_nothing_remaining() {
        // Inclusive boundary: with five entries already logged and a limit
        // of five, this check is admitted and reports remaining 0.
        let d = decide(5, 5, Utc::now());
        assert!(d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn first_entry_past_the_limit_is_rejected() {
        let d = decide(5, 6, Utc::now());
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn overshoot_never_reports_negative_remaining() {
        let d = decide(5, 9, Utc::now());
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn reset_is_aligned_to_the_next_minute() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let d = decide(5, 0, now);
        assert_eq!(d.reset_at, Utc.with_ymd_and_hms(2026, 3, 14, 9, 27, 0).unwrap());
    }

    #[test]
    fn reset_on_an_exact_minute_moves_forward() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 27, 0).unwrap();
        assert_eq!(
            next_minute(now),
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 28, 0).unwrap()
        );
    }

    #[test]
    fn window_cutoff_excludes_sixty_one_second_old_entries() {
        // The SQL count uses `created_at >= cutoff`; an entry 61s old falls
        // strictly before the cutoff, one exactly 60s old does not.
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 27, 0).unwrap();
        let cutoff = now - TimeDelta::seconds(WINDOW_SECS);
        let entry_61s = now - TimeDelta::seconds(61);
        let entry_60s = now - TimeDelta::seconds(60);
        assert!(entry_61s < cutoff);
        assert!(entry_60s >= cutoff);
    }
}
