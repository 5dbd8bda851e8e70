//! Message categories and the delivery-status state machine.
//!
//! A message is created `pending`, handed to a dispatch channel, and then
//! moves `sent -> delivered | failed`. A message rejected before it ever
//! leaves (simulated API error, rate limit) goes straight `pending -> failed`
//! and never passes through `sent`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Message type
// ---------------------------------------------------------------------------

/// What a message is about. Stored in `messages.message_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Invitation,
    Reminder,
    Confirmation,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Invitation => "invitation",
            MessageType::Reminder => "reminder",
            MessageType::Confirmation => "confirmation",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invitation" => Ok(MessageType::Invitation),
            "reminder" => Ok(MessageType::Reminder),
            "confirmation" => Ok(MessageType::Confirmation),
            other => Err(CoreError::Validation(format!(
                "Unknown message type: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for MessageType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Delivery status
// ---------------------------------------------------------------------------

/// Lifecycle of one dispatched message. Stored in `messages.delivery_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// `delivered` and `failed` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        valid_transitions(self).is_empty()
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "sent" => Ok(DeliveryStatus::Sent),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown delivery status: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for DeliveryStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Returns the set of statuses reachable from `from`.
pub fn valid_transitions(from: DeliveryStatus) -> &'static [DeliveryStatus] {
    match from {
        DeliveryStatus::Pending => &[DeliveryStatus::Sent, DeliveryStatus::Failed],
        DeliveryStatus::Sent => &[DeliveryStatus::Delivered, DeliveryStatus::Failed],
        DeliveryStatus::Delivered | DeliveryStatus::Failed => &[],
    }
}

/// Check whether a transition from `from` to `to` is valid.
pub fn can_transition(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a transition, returning a descriptive error for invalid ones.
pub fn validate_transition(from: DeliveryStatus, to: DeliveryStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid delivery status transition: {from} -> {to}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Valid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn pending_to_sent() {
        assert!(can_transition(DeliveryStatus::Pending, DeliveryStatus::Sent));
    }

    #[test]
    fn pending_to_failed_skips_sent() {
        assert!(can_transition(DeliveryStatus::Pending, DeliveryStatus::Failed));
    }

    #[test]
    fn sent_to_delivered() {
        assert!(can_transition(DeliveryStatus::Sent, DeliveryStatus::Delivered));
    }

    #[test]
    fn sent_to_failed() {
        assert!(can_transition(DeliveryStatus::Sent, DeliveryStatus::Failed));
    }

    // -----------------------------------------------------------------------
    // Invalid transitions
    // -----------------------------------------------------------------------

    #[test]
    fn pending_cannot_jump_to_delivered() {
        assert!(!can_transition(DeliveryStatus::Pending, DeliveryStatus::Delivered));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
        assert!(!DeliveryStatus::Sent.is_terminal());
        assert!(!DeliveryStatus::Pending.is_terminal());
    }

    #[test]
    fn failed_cannot_be_resurrected() {
        let err = validate_transition(DeliveryStatus::Failed, DeliveryStatus::Sent).unwrap_err();
        assert!(err.to_string().contains("failed -> sent"));
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parses_column_values() {
        assert_eq!("reminder".parse::<MessageType>().unwrap(), MessageType::Reminder);
        assert_eq!("delivered".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Delivered);
        assert!("sms".parse::<MessageType>().is_err());
        assert!("bounced".parse::<DeliveryStatus>().is_err());
    }
}
