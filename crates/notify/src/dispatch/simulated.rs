//! Simulated messaging channel.
//!
//! Models a third-party messaging API: a send can be rejected up front
//! (random API error, per-recipient rate limit), otherwise it is accepted
//! as `sent` and resolves to `delivered` or `failed` either immediately or
//! after a delay. Every outcome is mirrored into an in-memory status table
//! and written through to the [`MessageStore`]; store failures are logged
//! and never change the dispatch result.

use std::sync::{Arc, Mutex, MutexGuard};

use aisle_core::clock::Clock;
use aisle_core::message::DeliveryStatus;
use aisle_core::types::{DbId, Timestamp};
use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::rate_limit::{RateLimitEntry, SlidingWindowLimiter};
use super::status::{ChannelStats, DeliveryStatusRecord, OutboundRecord, StatusTable};
use super::Dispatcher;
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::store::MessageStore;

const DELIVERY_FAILURE_REASON: &str = "Simulated delivery failure";

/// Bernoulli draw with probability `rate`.
fn roll(rate: f64) -> bool {
    rate > 0.0 && rand::rng().random::<f64>() < rate
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct ChannelState {
    /// Bumped by `reset`; delayed resolutions from an older epoch are dropped.
    epoch: u64,
    /// Cancels every pending delayed resolution of the current epoch.
    cancel: CancellationToken,
    limiter: SlidingWindowLimiter,
    statuses: StatusTable,
    outbound: Vec<OutboundRecord>,
}

struct Inner {
    config: DispatchConfig,
    messages: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<ChannelState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve an accepted send to `delivered` or `failed`.
    async fn resolve_delivery(&self, message_id: DbId, to: String, epoch: u64) {
        let (status, error) = if roll(self.config.delivery_failure_rate) {
            (DeliveryStatus::Failed, Some(DELIVERY_FAILURE_REASON.to_string()))
        } else {
            (DeliveryStatus::Delivered, None)
        };
        let now = self.clock.now();

        {
            let mut state = self.state();
            if state.epoch != epoch {
                return;
            }
            state.statuses.transition(message_id, &to, status, now, error);
        }

        let persisted = match status {
            DeliveryStatus::Delivered => self.messages.mark_as_delivered(message_id, now).await,
            _ => self.messages.mark_as_failed(message_id, now).await,
        };
        if let Err(e) = persisted {
            tracing::warn!(message_id, %status, error = %e, "Failed to persist delivery outcome");
        }

        if self.config.enable_logging {
            if status == DeliveryStatus::Delivered {
                tracing::info!(message_id, to = %to, "Message delivered");
            } else {
                tracing::info!(message_id, to = %to, "Message delivery failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SimulatedChannel
// ---------------------------------------------------------------------------

/// Rate-limited simulated dispatch channel. Cheap to clone.
#[derive(Clone)]
pub struct SimulatedChannel {
    inner: Arc<Inner>,
}

impl SimulatedChannel {
    pub fn new(
        config: DispatchConfig,
        messages: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter =
            SlidingWindowLimiter::new(config.rate_limit_per_minute, config.rate_limit_window);
        Self {
            inner: Arc::new(Inner {
                config,
                messages,
                clock,
                state: Mutex::new(ChannelState {
                    epoch: 0,
                    cancel: CancellationToken::new(),
                    limiter,
                    statuses: StatusTable::default(),
                    outbound: Vec::new(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Fail a send that never left: `pending -> failed`.
    async fn reject(
        &self,
        message_id: DbId,
        to: &str,
        err: DispatchError,
    ) -> Result<(), DispatchError> {
        let now = self.inner.clock.now();
        self.inner.state().statuses.transition(
            message_id,
            to,
            DeliveryStatus::Failed,
            now,
            Some(err.to_string()),
        );

        if let Err(e) = self.inner.messages.mark_as_failed(message_id, now).await {
            tracing::warn!(message_id, error = %e, "Failed to persist rejected message");
        }
        if self.inner.config.enable_logging {
            tracing::info!(message_id, to, reason = %err, "Message rejected");
        }
        Err(err)
    }

    /// Outbound history of accepted sends, oldest first.
    pub fn get_sent_messages(&self) -> Vec<OutboundRecord> {
        self.inner.state().outbound.clone()
    }

    pub fn get_delivery_status(&self, message_id: DbId) -> Option<DeliveryStatusRecord> {
        self.inner.state().statuses.get(message_id).cloned()
    }

    pub fn get_rate_limit_status(&self) -> Vec<RateLimitEntry> {
        let now = self.inner.clock.now();
        self.inner.state().limiter.status(now)
    }

    pub fn get_stats(&self) -> ChannelStats {
        let state = self.inner.state();
        state.statuses.stats(state.outbound.len())
    }

    /// Drop rate-limit entries older than the window. Returns entries removed.
    pub fn prune_expired_windows(&self) -> usize {
        let now = self.inner.clock.now();
        self.inner.state().limiter.prune(now)
    }

    /// Forget all history and cancel every pending delayed resolution.
    pub fn reset(&self) {
        let mut state = self.inner.state();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.epoch += 1;
        state.limiter.clear();
        state.statuses.clear();
        state.outbound.clear();
    }

    fn accept(
        &self,
        message_id: DbId,
        to: &str,
        content: &str,
        now: Timestamp,
    ) -> Option<(u64, CancellationToken)> {
        let mut state = self.inner.state();
        if self.inner.config.enable_rate_limiting && !state.limiter.try_acquire(to, now) {
            return None;
        }
        state
            .statuses
            .transition(message_id, to, DeliveryStatus::Sent, now, None);
        state.outbound.push(OutboundRecord {
            message_id,
            to: to.to_string(),
            content: content.to_string(),
            sent_at: now,
        });
        Some((state.epoch, state.cancel.clone()))
    }
}

#[async_trait::async_trait]
impl Dispatcher for SimulatedChannel {
    async fn send(&self, to: &str, content: &str, message_id: DbId) -> Result<(), DispatchError> {
        let config = &self.inner.config;

        if roll(config.error_rate) {
            let err = DispatchError::SimulatedApiError {
                channel: config.channel_name.clone(),
            };
            return self.reject(message_id, to, err).await;
        }

        let now = self.inner.clock.now();
        let Some((epoch, cancel)) = self.accept(message_id, to, content, now) else {
            let err = DispatchError::RateLimitExceeded {
                recipient: to.to_string(),
            };
            return self.reject(message_id, to, err).await;
        };

        if let Err(e) = self.inner.messages.mark_as_sent(message_id, now).await {
            tracing::warn!(message_id, error = %e, "Failed to persist sent status");
        }
        if config.enable_logging {
            tracing::info!(message_id, to, channel = %config.channel_name, "Message dispatched");
        }

        if !config.simulate_delivery_delay {
            self.inner
                .resolve_delivery(message_id, to.to_string(), epoch)
                .await;
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        let to = to.to_string();
        let delay = config.delivery_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    inner.resolve_delivery(message_id, to, epoch).await;
                }
            }
        });
        Ok(())
    }
}
