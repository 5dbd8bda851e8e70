//! Reminder schedule timing rules.
//!
//! A schedule with `trigger_days = N` becomes due on the UTC calendar day
//! `N` days before the event's RSVP deadline and stays due through the
//! deadline day, so a `0`-day schedule fires on the deadline day itself. The
//! scheduler polls at a configurable interval that may never drop below
//! [`MIN_CHECK_INTERVAL_MS`].

use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lowest accepted scheduler polling interval.
pub const MIN_CHECK_INTERVAL_MS: u64 = 10_000;

/// Default scheduler polling interval (hourly).
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Largest accepted trigger offset.
pub const MAX_TRIGGER_DAYS: i32 = 365;

// ---------------------------------------------------------------------------
// Schedule request
// ---------------------------------------------------------------------------

/// One entry of a schedule configuration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    #[validate(range(min = 0, max = 365))]
    pub trigger_days: i32,
    #[validate(length(min = 1, max = 2000))]
    pub message_template: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl ScheduleRequest {
    pub fn new(trigger_days: i32, message_template: impl Into<String>) -> Self {
        Self {
            trigger_days,
            message_template: message_template.into(),
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Due-time arithmetic
// ---------------------------------------------------------------------------

/// The instant a schedule with `trigger_days` becomes due.
pub fn due_at(rsvp_deadline: Timestamp, trigger_days: i32) -> Timestamp {
    rsvp_deadline - Duration::days(i64::from(trigger_days))
}

/// Whether the RSVP deadline day (UTC) is over at `now`.
pub fn deadline_passed(rsvp_deadline: Timestamp, now: Timestamp) -> bool {
    rsvp_deadline.date_naive() < now.date_naive()
}

/// Whether a schedule is due at `now`: the trigger day has been reached
/// and the deadline day is not over.
pub fn is_due(rsvp_deadline: Timestamp, trigger_days: i32, now: Timestamp) -> bool {
    !deadline_passed(rsvp_deadline, now)
        && due_at(rsvp_deadline, trigger_days).date_naive() <= now.date_naive()
}

/// Whole days left until the deadline (negative once it has passed).
pub fn days_until_deadline(rsvp_deadline: Timestamp, now: Timestamp) -> i64 {
    (rsvp_deadline - now).num_days()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject schedule creation against an event whose deadline has passed.
pub fn validate_deadline_open(rsvp_deadline: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if deadline_passed(rsvp_deadline, now) {
        return Err(CoreError::Validation(format!(
            "RSVP deadline {} has already passed",
            rsvp_deadline.to_rfc3339()
        )));
    }
    Ok(())
}

/// Validate a trigger offset: `0..=MAX_TRIGGER_DAYS`.
pub fn validate_trigger_days(trigger_days: i32) -> Result<(), CoreError> {
    if !(0..=MAX_TRIGGER_DAYS).contains(&trigger_days) {
        return Err(CoreError::Validation(format!(
            "Trigger days must be between 0 and {MAX_TRIGGER_DAYS} (got {trigger_days})"
        )));
    }
    Ok(())
}

/// Validate a scheduler polling interval against the floor.
pub fn validate_check_interval(interval_ms: u64) -> Result<(), CoreError> {
    if interval_ms < MIN_CHECK_INTERVAL_MS {
        return Err(CoreError::Validation(format!(
            "Check interval must be at least {MIN_CHECK_INTERVAL_MS} ms (got {interval_ms})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn deadline() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    // -----------------------------------------------------------------------
    // Due-time arithmetic
    // -----------------------------------------------------------------------

    #[test]
    fn due_at_subtracts_whole_days() {
        assert_eq!(
            due_at(deadline(), 7),
            Utc.with_ymd_and_hms(2026, 5, 25, 12, 0, 0).unwrap()
        );
        assert_eq!(due_at(deadline(), 0), deadline());
    }

    #[test]
    fn due_when_inside_trigger_window() {
        let now = deadline() - Duration::days(5);
        assert!(is_due(deadline(), 7, now));
    }

    #[test]
    fn not_due_before_trigger_point() {
        let now = deadline() - Duration::days(8);
        assert!(!is_due(deadline(), 7, now));
    }

    #[test]
    fn due_exactly_at_trigger_point() {
        let now = deadline() - Duration::days(7);
        assert!(is_due(deadline(), 7, now));
    }

    #[test]
    fn due_from_start_of_trigger_day() {
        // 2026-05-25 00:00, twelve hours before the exact trigger instant.
        let now = deadline() - Duration::days(7) - Duration::hours(12);
        assert!(is_due(deadline(), 7, now));
        assert!(!is_due(deadline(), 7, now - Duration::seconds(1)));
    }

    #[test]
    fn zero_day_schedule_due_on_deadline_day() {
        let midnight = deadline() - Duration::hours(12);
        assert!(!is_due(deadline(), 0, midnight - Duration::seconds(1)));
        assert!(is_due(deadline(), 0, midnight));
        assert!(is_due(deadline(), 0, deadline()));
        assert!(is_due(deadline(), 0, deadline() + Duration::hours(11)));
        assert!(!is_due(deadline(), 0, deadline() + Duration::hours(12)));
    }

    #[test]
    fn not_due_once_deadline_day_is_over() {
        assert!(is_due(deadline(), 7, deadline()));
        assert!(!is_due(deadline(), 7, deadline() + Duration::hours(12)));
        assert!(!is_due(deadline(), 7, deadline() + Duration::days(3)));
    }

    #[test]
    fn days_until_deadline_counts_whole_days() {
        let now = deadline() - Duration::days(5) - Duration::hours(3);
        assert_eq!(days_until_deadline(deadline(), now), 5);
        assert_eq!(days_until_deadline(deadline(), deadline() + Duration::days(2)), -2);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn open_deadline_accepted() {
        assert!(validate_deadline_open(deadline(), deadline() - Duration::days(1)).is_ok());
    }

    #[test]
    fn deadline_day_still_open() {
        let later_that_day = deadline() + Duration::hours(6);
        assert!(!deadline_passed(deadline(), later_that_day));
        assert!(validate_deadline_open(deadline(), later_that_day).is_ok());
    }

    #[test]
    fn past_deadline_rejected() {
        let result = validate_deadline_open(deadline(), deadline() + Duration::days(1));
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("already passed"));
    }

    #[test]
    fn trigger_days_bounds() {
        assert!(validate_trigger_days(0).is_ok());
        assert!(validate_trigger_days(MAX_TRIGGER_DAYS).is_ok());
        assert!(validate_trigger_days(-1).is_err());
        assert!(validate_trigger_days(MAX_TRIGGER_DAYS + 1).is_err());
    }

    #[test]
    fn check_interval_floor() {
        assert_matches!(validate_check_interval(5_000), Err(CoreError::Validation(_)));
        assert!(validate_check_interval(MIN_CHECK_INTERVAL_MS).is_ok());
    }

    #[test]
    fn schedule_request_validation() {
        assert!(ScheduleRequest::new(7, "Hi {guestName}").validate().is_ok());
        assert!(ScheduleRequest::new(-3, "Hi").validate().is_err());
        assert!(ScheduleRequest::new(3, "").validate().is_err());
    }

    #[test]
    fn schedule_request_caps() {
        assert!(ScheduleRequest::new(0, "Today is the day").validate().is_ok());
        assert!(ScheduleRequest::new(MAX_TRIGGER_DAYS, "Hi").validate().is_ok());
        assert!(ScheduleRequest::new(MAX_TRIGGER_DAYS + 1, "Hi").validate().is_err());
        assert!(ScheduleRequest::new(3, "x".repeat(2000)).validate().is_ok());
        assert!(ScheduleRequest::new(3, "x".repeat(2001)).validate().is_err());
    }

    #[test]
    fn schedule_request_defaults_to_active() {
        let req: ScheduleRequest =
            serde_json::from_str(r#"{"triggerDays":3,"messageTemplate":"Hello"}"#)
                .expect("valid request json");
        assert!(req.is_active);
        assert_eq!(req.trigger_days, 3);
    }
}
