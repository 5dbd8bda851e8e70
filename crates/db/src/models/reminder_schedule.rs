//! Reminder schedule entity model and DTOs.

use aisle_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `reminder_schedules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReminderSchedule {
    pub id: DbId,
    pub event_id: DbId,
    pub trigger_days: i32,
    pub message_template: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a reminder schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderSchedule {
    pub event_id: DbId,
    pub trigger_days: i32,
    pub message_template: String,
    pub is_active: bool,
}

/// DTO for patching a reminder schedule. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReminderSchedule {
    pub trigger_days: Option<i32>,
    pub message_template: Option<String>,
    pub is_active: Option<bool>,
}
