use serde::Serialize;
use time::PrimitiveDateTime;

const WARNING_THRESHOLD_SECONDS: i64 = 5 * 60;
const CRITICAL_THRESHOLD_SECONDS: i64 = 60;

/// Presentation-only urgency tiers; they never affect when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TimerSeverity {
    Normal,
    Warning,
    Critical,
}

impl TimerSeverity {
    pub(crate) fn for_remaining(seconds: i64) -> Self {
        if seconds <= CRITICAL_THRESHOLD_SECONDS {
            Self::Critical
        } else if seconds <= WARNING_THRESHOLD_SECONDS {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// Seconds left on a running attempt, clamped at zero. Computed from the
/// fixed start timestamp so a reloaded client resumes mid-countdown and a
/// stale attempt comes back as already elapsed.
pub(crate) fn remaining_seconds(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
) -> i64 {
    let elapsed = now.assume_utc().unix_timestamp() - started_at.assume_utc().unix_timestamp();
    let total = i64::from(duration_minutes) * 60;
    (total - elapsed).max(0)
}

pub(crate) fn is_elapsed(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
) -> bool {
    remaining_seconds(started_at, duration_minutes, now) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Duration, Time};

    fn at(hour: u8, minute: u8) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, time::Month::June, 10).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(hour, minute, 0).unwrap())
    }

    #[test]
    fn expired_session_reports_zero_remaining() {
        let started = at(10, 0);
        let now = started + Duration::minutes(11);
        assert_eq!(remaining_seconds(started, 10, now), 0);
        assert!(is_elapsed(started, 10, now));
    }

    #[test]
    fn mid_exam_remaining_counts_from_start() {
        let started = at(10, 0);
        let now = started + Duration::minutes(2);
        assert_eq!(remaining_seconds(started, 10, now), 480);
        assert!(!is_elapsed(started, 10, now));
    }

    #[test]
    fn severity_thresholds() {
        assert_eq!(TimerSeverity::for_remaining(480), TimerSeverity::Normal);
        assert_eq!(TimerSeverity::for_remaining(300), TimerSeverity::Warning);
        assert_eq!(TimerSeverity::for_remaining(61), TimerSeverity::Warning);
        assert_eq!(TimerSeverity::for_remaining(60), TimerSeverity::Critical);
        assert_eq!(TimerSeverity::for_remaining(0), TimerSeverity::Critical);
    }
}
