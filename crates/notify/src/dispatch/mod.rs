//! Message dispatch channels.
//!
//! [`Dispatcher`] is the seam the engine sends through. The only channel
//! shipped here is [`simulated::SimulatedChannel`].

pub mod rate_limit;
pub mod simulated;
pub mod status;

use aisle_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// One item of a bulk send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub message_id: DbId,
    pub to: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItemResult {
    pub message_id: DbId,
    pub to: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkSendReport {
    pub total: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub results: Vec<BulkItemResult>,
}

#[async_trait::async_trait]
pub trait Dispatcher: Send + Sync {
    /// Hand one message to the channel.
    ///
    /// `Ok` means the channel accepted it; final delivery may resolve later.
    async fn send(&self, to: &str, content: &str, message_id: DbId) -> Result<(), DispatchError>;

    /// Send every item in order, never stopping on a failed item.
    async fn send_bulk(&self, items: &[OutboundMessage]) -> BulkSendReport {
        let mut report = BulkSendReport {
            total: items.len(),
            ..Default::default()
        };
        for item in items {
            let outcome = self.send(&item.to, &item.content, item.message_id).await;
            match &outcome {
                Ok(()) => report.success_count += 1,
                Err(_) => report.fail_count += 1,
            }
            report.results.push(BulkItemResult {
                message_id: item.message_id,
                to: item.to.clone(),
                success: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            });
        }
        report
    }
}
