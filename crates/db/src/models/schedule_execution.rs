//! Schedule execution history model, DTOs and aggregate statistics.

use std::collections::BTreeMap;

use aisle_core::types::{DbId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `schedule_executions` table: one run of one schedule.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleExecution {
    pub id: DbId,
    pub schedule_id: DbId,
    pub event_id: DbId,
    pub executed_at: Timestamp,
    pub guests_processed: i32,
    pub items_scheduled: i32,
    pub items_skipped: i32,
    #[sqlx(json)]
    pub errors: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a schedule run.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduleExecution {
    pub schedule_id: DbId,
    pub event_id: DbId,
    pub executed_at: Timestamp,
    pub guests_processed: i32,
    pub items_scheduled: i32,
    pub items_skipped: i32,
    pub errors: Vec<String>,
}

/// Per-day rollup of schedule executions for one event.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DailyExecutionRollup {
    pub day: NaiveDate,
    pub executions: i64,
    pub guests_processed: i64,
    pub items_scheduled: i64,
    pub items_skipped: i64,
    pub errors: i64,
}

/// Aggregate execution statistics for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStatistics {
    pub total_executions: i64,
    pub total_guests_processed: i64,
    pub total_scheduled: i64,
    pub total_skipped: i64,
    pub total_errors: i64,
    pub last_execution_date: Option<Timestamp>,
    pub per_day: Vec<DailyExecutionRollup>,
}

impl ExecutionStatistics {
    /// Fold execution rows into totals plus a per-day rollup (newest day first).
    pub fn from_executions(executions: &[ScheduleExecution]) -> Self {
        let mut stats = ExecutionStatistics::default();
        let mut per_day: BTreeMap<NaiveDate, DailyExecutionRollup> = BTreeMap::new();

        for exec in executions {
            let errors = exec.errors.len() as i64;
            stats.total_executions += 1;
            stats.total_guests_processed += i64::from(exec.guests_processed);
            stats.total_scheduled += i64::from(exec.items_scheduled);
            stats.total_skipped += i64::from(exec.items_skipped);
            stats.total_errors += errors;
            if stats.last_execution_date.map_or(true, |last| exec.executed_at > last) {
                stats.last_execution_date = Some(exec.executed_at);
            }

            let day = exec.executed_at.date_naive();
            let rollup = per_day.entry(day).or_insert_with(|| DailyExecutionRollup {
                day,
                executions: 0,
                guests_processed: 0,
                items_scheduled: 0,
                items_skipped: 0,
                errors: 0,
            });
            rollup.executions += 1;
            rollup.guests_processed += i64::from(exec.guests_processed);
            rollup.items_scheduled += i64::from(exec.items_scheduled);
            rollup.items_skipped += i64::from(exec.items_skipped);
            rollup.errors += errors;
        }

        stats.per_day = per_day.into_values().rev().collect();
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn exec(
        day: u32,
        hour: u32,
        processed: i32,
        scheduled: i32,
        errors: &[&str],
    ) -> ScheduleExecution {
        let at = Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).unwrap();
        ScheduleExecution {
            id: 0,
            schedule_id: 1,
            event_id: 1,
            executed_at: at,
            guests_processed: processed,
            items_scheduled: scheduled,
            items_skipped: processed - scheduled,
            errors: errors.iter().map(|e| e.to_string()).collect(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn empty_history_yields_zeroes() {
        let stats = ExecutionStatistics::from_executions(&[]);
        assert_eq!(stats, ExecutionStatistics::default());
    }

    #[test]
    fn totals_and_daily_rollup() {
        let stats = ExecutionStatistics::from_executions(&[
            exec(20, 9, 4, 3, &["boom"]),
            exec(20, 15, 2, 2, &[]),
            exec(21, 9, 5, 1, &["a", "b"]),
        ]);

        assert_eq!(stats.total_executions, 3);
        assert_eq!(stats.total_guests_processed, 11);
        assert_eq!(stats.total_scheduled, 6);
        assert_eq!(stats.total_skipped, 5);
        assert_eq!(stats.total_errors, 3);
        assert_eq!(
            stats.last_execution_date,
            Some(Utc.with_ymd_and_hms(2026, 5, 21, 9, 0, 0).unwrap())
        );

        assert_eq!(stats.per_day.len(), 2);
        assert_eq!(stats.per_day[0].day, NaiveDate::from_ymd_opt(2026, 5, 21).unwrap());
        assert_eq!(stats.per_day[1].executions, 2);
        assert_eq!(stats.per_day[1].items_scheduled, 5);
        assert_eq!(stats.per_day[1].errors, 1);
    }
}
