//! Event entity model and DTOs.

use aisle_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub title: String,
    pub event_date: Timestamp,
    pub location: Option<String>,
    pub rsvp_deadline: Timestamp,
    pub organizer_id: Option<DbId>,
    pub organizer_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new event.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvent {
    pub title: String,
    pub event_date: Timestamp,
    pub location: Option<String>,
    pub rsvp_deadline: Timestamp,
    pub organizer_id: Option<DbId>,
    pub organizer_name: Option<String>,
}
