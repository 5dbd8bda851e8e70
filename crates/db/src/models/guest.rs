//! Guest entity model and DTOs.

use aisle_core::rsvp::RsvpStatus;
use aisle_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `guests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Guest {
    pub id: DbId,
    pub event_id: DbId,
    pub name: String,
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub rsvp_status: RsvpStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for adding a guest to an event.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGuest {
    pub event_id: DbId,
    pub name: String,
    pub phone: Option<String>,
    pub rsvp_status: RsvpStatus,
}
