//! Per-recipient sliding-window rate limiter.
//!
//! A recipient is limited while its window holds `limit` sends younger than
//! `window`. Expired entries are dropped lazily on every check and in bulk
//! by [`SlidingWindowLimiter::prune`].

use std::collections::{BTreeMap, VecDeque};

use aisle_core::types::Timestamp;
use serde::Serialize;

/// Rate-limit view of one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitEntry {
    pub recipient: String,
    pub recent_sends: usize,
    pub limited: bool,
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: usize,
    window: chrono::Duration,
    windows: BTreeMap<String, VecDeque<Timestamp>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window: std::time::Duration) -> Self {
        Self {
            limit: limit as usize,
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX),
            windows: BTreeMap::new(),
        }
    }

    fn is_live(&self, sent_at: Timestamp, now: Timestamp) -> bool {
        now - sent_at < self.window
    }

    fn drop_expired(&mut self, recipient: &str, now: Timestamp) {
        let window = self.window;
        if let Some(sends) = self.windows.get_mut(recipient) {
            while sends.front().is_some_and(|&at| now - at >= window) {
                sends.pop_front();
            }
        }
    }

    /// Whether one more send to `recipient` at `now` would exceed the limit.
    pub fn is_limited(&mut self, recipient: &str, now: Timestamp) -> bool {
        self.drop_expired(recipient, now);
        self.windows
            .get(recipient)
            .is_some_and(|sends| sends.len() >= self.limit)
    }

    pub fn record(&mut self, recipient: &str, now: Timestamp) {
        self.windows
            .entry(recipient.to_string())
            .or_default()
            .push_back(now);
    }

    /// Check and record in one step. Returns `false` when limited.
    pub fn try_acquire(&mut self, recipient: &str, now: Timestamp) -> bool {
        if self.is_limited(recipient, now) {
            return false;
        }
        self.record(recipient, now);
        true
    }

    /// Every recipient with at least one live send, in recipient order.
    pub fn status(&self, now: Timestamp) -> Vec<RateLimitEntry> {
        self.windows
            .iter()
            .filter_map(|(recipient, sends)| {
                let recent_sends = sends.iter().filter(|&&at| self.is_live(at, now)).count();
                (recent_sends > 0).then(|| RateLimitEntry {
                    recipient: recipient.clone(),
                    recent_sends,
                    limited: recent_sends >= self.limit,
                })
            })
            .collect()
    }

    /// Drop expired entries and empty recipients. Returns entries removed.
    pub fn prune(&mut self, now: Timestamp) -> usize {
        let window = self.window;
        let mut removed = 0;
        self.windows.retain(|_, sends| {
            let before = sends.len();
            sends.retain(|&at| now - at < window);
            removed += before - sends.len();
            !sends.is_empty()
        });
        removed
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }

    pub fn tracked_recipients(&self) -> usize {
        self.windows.len()
    }
}
