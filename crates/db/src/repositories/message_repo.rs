//! Repository for the `messages` table.
//!
//! Status updates are guarded in SQL so that only transitions allowed by
//! [`aisle_core::message::valid_transitions`] touch a row. A `None` result
//! from a `mark_as_*` call means the message is missing or the transition
//! was not allowed from its current status.

use aisle_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::message::{CreateMessage, Message, MessageFilter};

/// Column list for `messages` queries.
const COLUMNS: &str = "\
    id, event_id, recipient_id, content, message_type, delivery_status, \
    scheduled_at, sent_at, delivered_at, failed_at, created_at, updated_at";

/// Provides CRUD operations for messages.
pub struct MessageRepo;

impl MessageRepo {
    /// Record a new `pending` message.
    pub async fn create(pool: &PgPool, input: &CreateMessage) -> Result<Message, sqlx::Error> {
        let query = format!(
            "INSERT INTO messages \
                (event_id, recipient_id, content, message_type, delivery_status, scheduled_at) \
             VALUES ($1, $2, $3, $4, 'pending', $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(input.event_id)
            .bind(input.recipient_id)
            .bind(&input.content)
            .bind(input.message_type.as_str())
            .bind(input.scheduled_at)
            .fetch_one(pool)
            .await
    }

    /// Find a message by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Message>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM messages WHERE id = $1");
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List messages matching every set field of `filter`, oldest first.
    pub async fn find_with_filters(
        pool: &PgPool,
        filter: &MessageFilter,
    ) -> Result<Vec<Message>, sqlx::Error> {
        // Build dynamic WHERE clauses.
        let mut conditions = Vec::new();
        let mut bind_idx = 1u32;

        if filter.event_id.is_some() {
            conditions.push(format!("event_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.recipient_id.is_some() {
            conditions.push(format!("recipient_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.message_type.is_some() {
            conditions.push(format!("message_type = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.delivery_status.is_some() {
            conditions.push(format!("delivery_status = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.scheduled_before.is_some() {
            conditions.push(format!("scheduled_at <= ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.scheduled_after.is_some() {
            conditions.push(format!("scheduled_at >= ${bind_idx}"));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!("SELECT {COLUMNS} FROM messages {where_clause} ORDER BY id ASC");
        let mut q = sqlx::query_as::<_, Message>(&query);
        if let Some(event_id) = filter.event_id {
            q = q.bind(event_id);
        }
        if let Some(recipient_id) = filter.recipient_id {
            q = q.bind(recipient_id);
        }
        if let Some(message_type) = filter.message_type {
            q = q.bind(message_type.as_str());
        }
        if let Some(status) = filter.delivery_status {
            q = q.bind(status.as_str());
        }
        if let Some(before) = filter.scheduled_before {
            q = q.bind(before);
        }
        if let Some(after) = filter.scheduled_after {
            q = q.bind(after);
        }
        q.fetch_all(pool).await
    }

    /// `pending -> sent`.
    pub async fn mark_as_sent(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages SET delivery_status = 'sent', sent_at = $2 \
             WHERE id = $1 AND delivery_status = 'pending' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// `sent -> delivered`.
    pub async fn mark_as_delivered(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages SET delivery_status = 'delivered', delivered_at = $2 \
             WHERE id = $1 AND delivery_status = 'sent' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// `pending | sent -> failed`.
    pub async fn mark_as_failed(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Message>, sqlx::Error> {
        let query = format!(
            "UPDATE messages SET delivery_status = 'failed', failed_at = $2 \
             WHERE id = $1 AND delivery_status IN ('pending', 'sent') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }
}
