//! Live delivery-status table and outbound history.

use std::collections::HashMap;

use aisle_core::message::{can_transition, DeliveryStatus};
use aisle_core::types::{DbId, Timestamp};
use serde::Serialize;

/// In-memory mirror of one message's in-flight state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryStatusRecord {
    pub message_id: DbId,
    pub to: String,
    pub status: DeliveryStatus,
    pub sent_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub error: Option<String>,
}

/// A send accepted by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundRecord {
    pub message_id: DbId,
    pub to: String,
    pub content: String,
    pub sent_at: Timestamp,
}

/// Channel-wide delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelStats {
    pub total_sent: usize,
    pub sent: usize,
    pub delivered: usize,
    pub failed: usize,
    /// `delivered / (sent + delivered + failed) * 100`, 0 without traffic.
    pub delivery_rate: f64,
}

#[derive(Debug, Default)]
pub struct StatusTable {
    records: HashMap<DbId, DeliveryStatusRecord>,
}

impl StatusTable {
    pub fn get(&self, message_id: DbId) -> Option<&DeliveryStatusRecord> {
        self.records.get(&message_id)
    }

    /// Move a message to `status`. Unknown messages start from `pending`.
    ///
    /// Returns `false`, leaving the record untouched, for a disallowed
    /// transition.
    pub fn transition(
        &mut self,
        message_id: DbId,
        to: &str,
        status: DeliveryStatus,
        at: Timestamp,
        error: Option<String>,
    ) -> bool {
        if !self.records.contains_key(&message_id)
            && !can_transition(DeliveryStatus::Pending, status)
        {
            return false;
        }
        let record = self
            .records
            .entry(message_id)
            .or_insert_with(|| DeliveryStatusRecord {
                message_id,
                to: to.to_string(),
                status: DeliveryStatus::Pending,
                sent_at: None,
                delivered_at: None,
                failed_at: None,
                error: None,
            });
        if !can_transition(record.status, status) {
            return false;
        }
        record.status = status;
        match status {
            DeliveryStatus::Sent => record.sent_at = Some(at),
            DeliveryStatus::Delivered => record.delivered_at = Some(at),
            DeliveryStatus::Failed => record.failed_at = Some(at),
            DeliveryStatus::Pending => {}
        }
        if error.is_some() {
            record.error = error;
        }
        true
    }

    pub fn stats(&self, total_sent: usize) -> ChannelStats {
        let count = |s: DeliveryStatus| self.records.values().filter(|r| r.status == s).count();
        let sent = count(DeliveryStatus::Sent);
        let delivered = count(DeliveryStatus::Delivered);
        let failed = count(DeliveryStatus::Failed);
        let attempted = sent + delivered + failed;
        let delivery_rate = if attempted == 0 {
            0.0
        } else {
            delivered as f64 / attempted as f64 * 100.0
        };
        ChannelStats {
            total_sent,
            sent,
            delivered,
            failed,
            delivery_rate,
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, 27, 12, 0, 0).unwrap()
    }

    #[test]
    fn rejected_message_fails_without_sent() {
        let mut table = StatusTable::default();
        assert!(table.transition(
            1,
            "+1",
            DeliveryStatus::Failed,
            at(),
            Some("Rate limit exceeded".into())
        ));
        let record = table.get(1).unwrap();
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert!(record.sent_at.is_none());
        assert_eq!(record.error.as_deref(), Some("Rate limit exceeded"));
    }

    #[test]
    fn terminal_records_are_frozen() {
        let mut table = StatusTable::default();
        assert!(table.transition(1, "+1", DeliveryStatus::Sent, at(), None));
        assert!(table.transition(1, "+1", DeliveryStatus::Delivered, at(), None));
        assert!(!table.transition(1, "+1", DeliveryStatus::Failed, at(), None));
        assert_eq!(table.get(1).unwrap().status, DeliveryStatus::Delivered);
    }

    #[test]
    fn delivery_rate_over_attempted() {
        let mut table = StatusTable::default();
        table.transition(1, "+1", DeliveryStatus::Sent, at(), None);
        table.transition(1, "+1", DeliveryStatus::Delivered, at(), None);
        table.transition(2, "+1", DeliveryStatus::Sent, at(), None);
        table.transition(3, "+1", DeliveryStatus::Failed, at(), None);
        table.transition(4, "+1", DeliveryStatus::Sent, at(), None);
        table.transition(4, "+1", DeliveryStatus::Delivered, at(), None);

        let stats = table.stats(3);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivery_rate, 50.0);
    }

    #[test]
    fn no_traffic_rate_is_zero() {
        assert_eq!(StatusTable::default().stats(0).delivery_rate, 0.0);
    }
}
