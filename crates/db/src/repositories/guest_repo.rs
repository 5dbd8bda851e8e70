//! Repository for the `guests` table.

use aisle_core::rsvp::RsvpStatus;
use aisle_core::types::DbId;
use sqlx::PgPool;

use crate::models::guest::{CreateGuest, Guest};

/// Column list for `guests` queries.
const COLUMNS: &str = "id, event_id, name, phone, rsvp_status, created_at, updated_at";

/// Provides CRUD operations for guests.
pub struct GuestRepo;

impl GuestRepo {
    /// Add a guest to an event, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateGuest) -> Result<Guest, sqlx::Error> {
        let query = format!(
            "INSERT INTO guests (event_id, name, phone, rsvp_status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Guest>(&query)
            .bind(input.event_id)
            .bind(&input.name)
            .bind(input.phone.as_deref())
            .bind(input.rsvp_status.as_str())
            .fetch_one(pool)
            .await
    }

    /// List all guests of an event in insertion order.
    pub async fn list_by_event(pool: &PgPool, event_id: DbId) -> Result<Vec<Guest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM guests WHERE event_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, Guest>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }

    /// Record a guest's RSVP answer.
    pub async fn update_rsvp_status(
        pool: &PgPool,
        id: DbId,
        status: RsvpStatus,
    ) -> Result<Option<Guest>, sqlx::Error> {
        let query = format!(
            "UPDATE guests SET rsvp_status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Guest>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }
}
