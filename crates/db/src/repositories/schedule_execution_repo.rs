//! Repository for the `schedule_executions` table.
//!
//! Execution rows are append-only: there is no update or delete.

use aisle_core::types::{DbId, Timestamp};
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::models::schedule_execution::{
    CreateScheduleExecution, DailyExecutionRollup, ExecutionStatistics, ScheduleExecution,
};

/// Column list for `schedule_executions` queries.
const COLUMNS: &str = "\
    id, schedule_id, event_id, executed_at, guests_processed, \
    items_scheduled, items_skipped, errors, created_at, updated_at";

/// Aggregate row for [`ScheduleExecutionRepo::statistics`].
#[derive(Debug, FromRow)]
struct ExecutionTotals {
    total_executions: i64,
    total_guests_processed: i64,
    total_scheduled: i64,
    total_skipped: i64,
    total_errors: i64,
    last_execution_date: Option<Timestamp>,
}

/// Provides insert and aggregate queries for schedule executions.
pub struct ScheduleExecutionRepo;

impl ScheduleExecutionRepo {
    /// Record one schedule run.
    pub async fn create(
        pool: &PgPool,
        input: &CreateScheduleExecution,
    ) -> Result<ScheduleExecution, sqlx::Error> {
        let query = format!(
            "INSERT INTO schedule_executions \
                (schedule_id, event_id, executed_at, guests_processed, \
                 items_scheduled, items_skipped, errors) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ScheduleExecution>(&query)
            .bind(input.schedule_id)
            .bind(input.event_id)
            .bind(input.executed_at)
            .bind(input.guests_processed)
            .bind(input.items_scheduled)
            .bind(input.items_skipped)
            .bind(Json(&input.errors))
            .fetch_one(pool)
            .await
    }

    /// Executions of an event's schedules, newest first.
    pub async fn list_for_event(
        pool: &PgPool,
        event_id: DbId,
    ) -> Result<Vec<ScheduleExecution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM schedule_executions \
             WHERE event_id = $1 \
             ORDER BY executed_at DESC"
        );
        sqlx::query_as::<_, ScheduleExecution>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }

    /// Whether `schedule_id` has an execution on the given UTC date.
    pub async fn has_executed_on(
        pool: &PgPool,
        schedule_id: DbId,
        day: NaiveDate,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM schedule_executions \
                WHERE schedule_id = $1 \
                  AND (executed_at AT TIME ZONE 'UTC')::date = $2 \
             )",
        )
        .bind(schedule_id)
        .bind(day)
        .fetch_one(pool)
        .await
    }

    /// Totals, last execution time and a per-day rollup for one event.
    pub async fn statistics(
        pool: &PgPool,
        event_id: DbId,
    ) -> Result<ExecutionStatistics, sqlx::Error> {
        let totals = sqlx::query_as::<_, ExecutionTotals>(
            "SELECT \
                COUNT(*)::BIGINT AS total_executions, \
                COALESCE(SUM(guests_processed), 0)::BIGINT AS total_guests_processed, \
                COALESCE(SUM(items_scheduled), 0)::BIGINT AS total_scheduled, \
                COALESCE(SUM(items_skipped), 0)::BIGINT AS total_skipped, \
                COALESCE(SUM(jsonb_array_length(errors)), 0)::BIGINT AS total_errors, \
                MAX(executed_at) AS last_execution_date \
             FROM schedule_executions \
             WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_one(pool)
        .await?;

        let per_day = sqlx::query_as::<_, DailyExecutionRollup>(
            "SELECT \
                (executed_at AT TIME ZONE 'UTC')::date AS day, \
                COUNT(*)::BIGINT AS executions, \
                COALESCE(SUM(guests_processed), 0)::BIGINT AS guests_processed, \
                COALESCE(SUM(items_scheduled), 0)::BIGINT AS items_scheduled, \
                COALESCE(SUM(items_skipped), 0)::BIGINT AS items_skipped, \
                COALESCE(SUM(jsonb_array_length(errors)), 0)::BIGINT AS errors \
             FROM schedule_executions \
             WHERE event_id = $1 \
             GROUP BY day \
             ORDER BY day DESC",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await?;

        Ok(ExecutionStatistics {
            total_executions: totals.total_executions,
            total_guests_processed: totals.total_guests_processed,
            total_scheduled: totals.total_scheduled,
            total_skipped: totals.total_skipped,
            total_errors: totals.total_errors,
            last_execution_date: totals.last_execution_date,
            per_day,
        })
    }
}
