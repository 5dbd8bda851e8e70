//! Message entity model, DTOs and query filter.

use aisle_core::message::{DeliveryStatus, MessageType};
use aisle_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub event_id: DbId,
    pub recipient_id: DbId,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub message_type: MessageType,
    #[sqlx(try_from = "String")]
    pub delivery_status: DeliveryStatus,
    pub scheduled_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a new message. Messages always start `pending`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessage {
    pub event_id: DbId,
    pub recipient_id: DbId,
    pub content: String,
    pub message_type: MessageType,
    pub scheduled_at: Option<Timestamp>,
}

/// Optional filters for message queries. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFilter {
    pub event_id: Option<DbId>,
    pub recipient_id: Option<DbId>,
    pub message_type: Option<MessageType>,
    pub delivery_status: Option<DeliveryStatus>,
    pub scheduled_before: Option<Timestamp>,
    pub scheduled_after: Option<Timestamp>,
}

impl MessageFilter {
    /// Whether `message` satisfies every set filter field.
    pub fn matches(&self, message: &Message) -> bool {
        self.event_id.map_or(true, |id| message.event_id == id)
            && self.recipient_id.map_or(true, |id| message.recipient_id == id)
            && self.message_type.map_or(true, |t| message.message_type == t)
            && self
                .delivery_status
                .map_or(true, |s| message.delivery_status == s)
            && self
                .scheduled_before
                .map_or(true, |ts| message.scheduled_at.is_some_and(|at| at <= ts))
            && self
                .scheduled_after
                .map_or(true, |ts| message.scheduled_at.is_some_and(|at| at >= ts))
    }
}
