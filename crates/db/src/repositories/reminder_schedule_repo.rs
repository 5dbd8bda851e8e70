//! Repository for the `reminder_schedules` table.

use aisle_core::types::DbId;
use sqlx::PgPool;

use crate::models::reminder_schedule::{
    CreateReminderSchedule, ReminderSchedule, UpdateReminderSchedule,
};

/// Column list for `reminder_schedules` queries.
const COLUMNS: &str =
    "id, event_id, trigger_days, message_template, is_active, created_at, updated_at";

/// Provides CRUD operations for reminder schedules.
pub struct ReminderScheduleRepo;

impl ReminderScheduleRepo {
    /// Insert a schedule. Violates `uq_reminder_schedules_event_trigger_days`
    /// if the `(event_id, trigger_days)` pair is taken.
    pub async fn create(
        pool: &PgPool,
        input: &CreateReminderSchedule,
    ) -> Result<ReminderSchedule, sqlx::Error> {
        let query = format!(
            "INSERT INTO reminder_schedules (event_id, trigger_days, message_template, is_active) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReminderSchedule>(&query)
            .bind(input.event_id)
            .bind(input.trigger_days)
            .bind(&input.message_template)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ReminderSchedule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reminder_schedules WHERE id = $1");
        sqlx::query_as::<_, ReminderSchedule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All schedules of an event, furthest trigger point first.
    pub async fn find_by_event(
        pool: &PgPool,
        event_id: DbId,
    ) -> Result<Vec<ReminderSchedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reminder_schedules \
             WHERE event_id = $1 \
             ORDER BY trigger_days DESC"
        );
        sqlx::query_as::<_, ReminderSchedule>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_active_by_event(
        pool: &PgPool,
        event_id: DbId,
    ) -> Result<Vec<ReminderSchedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reminder_schedules \
             WHERE event_id = $1 AND is_active = true \
             ORDER BY trigger_days DESC"
        );
        sqlx::query_as::<_, ReminderSchedule>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }

    /// Every active schedule across all events.
    pub async fn find_all_active(pool: &PgPool) -> Result<Vec<ReminderSchedule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reminder_schedules \
             WHERE is_active = true \
             ORDER BY event_id ASC, trigger_days DESC"
        );
        sqlx::query_as::<_, ReminderSchedule>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn exists_for_event_and_trigger_days(
        pool: &PgPool,
        event_id: DbId,
        trigger_days: i32,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM reminder_schedules \
                WHERE event_id = $1 AND trigger_days = $2 \
             )",
        )
        .bind(event_id)
        .bind(trigger_days)
        .fetch_one(pool)
        .await
    }

    /// Patch a schedule. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateReminderSchedule,
    ) -> Result<Option<ReminderSchedule>, sqlx::Error> {
        let query = format!(
            "UPDATE reminder_schedules SET
                trigger_days = COALESCE($2, trigger_days),
                message_template = COALESCE($3, message_template),
                is_active = COALESCE($4, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ReminderSchedule>(&query)
            .bind(id)
            .bind(input.trigger_days)
            .bind(input.message_template.as_deref())
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Delete a schedule. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reminder_schedules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
