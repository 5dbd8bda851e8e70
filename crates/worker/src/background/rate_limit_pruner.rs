//! Periodic cleanup of expired rate-limit windows.
//!
//! The channel only drops a recipient's old sends when that recipient is
//! sent to again, so recipients that go quiet would otherwise stay tracked
//! forever. This task prunes them once per rate-limit window.

use std::time::Duration;

use aisle_notify::SimulatedChannel;
use tokio_util::sync::CancellationToken;

/// Run the pruning loop every `every` until `cancel` is triggered.
pub async fn run(channel: SimulatedChannel, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_ms = every.as_millis() as u64, "Rate-limit pruner started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate-limit pruner stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = channel.prune_expired_windows();
                if removed > 0 {
                    tracing::debug!(removed, "Rate-limit pruner: dropped expired entries");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aisle_core::clock::{Clock, ManualClock};
    use aisle_notify::dispatch::Dispatcher;
    use aisle_notify::store::InMemoryStore;
    use aisle_notify::{DispatchConfig, Stores};
    use chrono::Utc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn prunes_each_window_and_stops_on_cancel() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let stores = Stores::from_backend(Arc::new(InMemoryStore::new(clock.clone())));
        let config = DispatchConfig::reliable();
        let window = config.rate_limit_window;
        let channel = SimulatedChannel::new(config, stores.messages, clock.clone());

        // Unknown message ids only make the store write-through warn.
        channel.send("+351910000001", "Hi", 1).await.unwrap();
        assert_eq!(channel.get_rate_limit_status().len(), 1);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(channel.clone(), window, cancel.clone()));

        clock.set(clock.now() + chrono::Duration::from_std(window).unwrap());
        tokio::time::sleep(window + Duration::from_millis(1)).await;
        assert_eq!(channel.prune_expired_windows(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
