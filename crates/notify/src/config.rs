//! Environment-driven configuration for the dispatch channel, the engine and
//! the scheduler.
//!
//! Every field has a default suitable for local development. Values that
//! fail to parse fall back to the default with a warning.

use std::str::FromStr;
use std::time::Duration;

use aisle_core::reminder::{DEFAULT_CHECK_INTERVAL_MS, MIN_CHECK_INTERVAL_MS};

const DEFAULT_CHANNEL_NAME: &str = "WhatsApp";
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
const DEFAULT_DELIVERY_DELAY_MS: u64 = 2_000;
const DEFAULT_ERROR_RATE: f64 = 0.05;
const DEFAULT_DELIVERY_FAILURE_RATE: f64 = 0.02;
const DEFAULT_RSVP_BASE_URL: &str = "http://localhost:5173";

// ---------------------------------------------------------------------------
// DispatchConfig
// ---------------------------------------------------------------------------

/// Configuration for [`SimulatedChannel`](crate::SimulatedChannel).
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Name used in simulated API error messages.
    pub channel_name: String,
    pub enable_rate_limiting: bool,
    /// Sends allowed per recipient within `rate_limit_window`.
    pub rate_limit_per_minute: u32,
    pub rate_limit_window: Duration,
    /// When false, delivery outcome is resolved inside `send`.
    pub simulate_delivery_delay: bool,
    pub delivery_delay: Duration,
    /// Probability in `[0, 1]` that a send is rejected outright.
    pub error_rate: f64,
    /// Probability in `[0, 1]` that an accepted send later fails.
    pub delivery_failure_rate: f64,
    /// Gates per-message info logs. Warnings are always emitted.
    pub enable_logging: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            enable_rate_limiting: true,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            rate_limit_window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            simulate_delivery_delay: true,
            delivery_delay: Duration::from_millis(DEFAULT_DELIVERY_DELAY_MS),
            error_rate: DEFAULT_ERROR_RATE,
            delivery_failure_rate: DEFAULT_DELIVERY_FAILURE_RATE,
            enable_logging: true,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default    |
    /// |------------------------------------|------------|
    /// | `DISPATCH_CHANNEL_NAME`            | `WhatsApp` |
    /// | `DISPATCH_ENABLE_RATE_LIMITING`    | `true`     |
    /// | `DISPATCH_RATE_LIMIT_PER_MINUTE`   | `10`       |
    /// | `DISPATCH_RATE_LIMIT_WINDOW_MS`    | `60000`    |
    /// | `DISPATCH_SIMULATE_DELIVERY_DELAY` | `true`     |
    /// | `DISPATCH_DELIVERY_DELAY_MS`       | `2000`     |
    /// | `DISPATCH_ERROR_RATE`              | `0.05`     |
    /// | `DISPATCH_DELIVERY_FAILURE_RATE`   | `0.02`     |
    /// | `DISPATCH_ENABLE_LOGGING`          | `true`     |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            channel_name: lookup("DISPATCH_CHANNEL_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.channel_name),
            enable_rate_limiting: parse_or(
                &lookup,
                "DISPATCH_ENABLE_RATE_LIMITING",
                defaults.enable_rate_limiting,
            ),
            rate_limit_per_minute: parse_or(
                &lookup,
                "DISPATCH_RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),
            rate_limit_window: Duration::from_millis(parse_or(
                &lookup,
                "DISPATCH_RATE_LIMIT_WINDOW_MS",
                DEFAULT_RATE_LIMIT_WINDOW_MS,
            )),
            simulate_delivery_delay: parse_or(
                &lookup,
                "DISPATCH_SIMULATE_DELIVERY_DELAY",
                defaults.simulate_delivery_delay,
            ),
            delivery_delay: Duration::from_millis(parse_or(
                &lookup,
                "DISPATCH_DELIVERY_DELAY_MS",
                DEFAULT_DELIVERY_DELAY_MS,
            )),
            error_rate: clamp_rate(parse_or(&lookup, "DISPATCH_ERROR_RATE", defaults.error_rate)),
            delivery_failure_rate: clamp_rate(parse_or(
                &lookup,
                "DISPATCH_DELIVERY_FAILURE_RATE",
                defaults.delivery_failure_rate,
            )),
            enable_logging: parse_or(&lookup, "DISPATCH_ENABLE_LOGGING", defaults.enable_logging),
        }
    }

    /// A channel that accepts and delivers every send immediately.
    pub fn reliable() -> Self {
        Self {
            simulate_delivery_delay: false,
            error_rate: 0.0,
            delivery_failure_rate: 0.0,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

/// Configuration for [`ReminderScheduler`](crate::ReminderScheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Never below [`MIN_CHECK_INTERVAL_MS`].
    pub check_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
        }
    }
}

impl SchedulerConfig {
    /// Reads `REMINDER_CHECK_INTERVAL_MS` (default `3600000`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let requested = parse_or(
            &lookup,
            "REMINDER_CHECK_INTERVAL_MS",
            DEFAULT_CHECK_INTERVAL_MS,
        );
        let check_interval_ms = if requested < MIN_CHECK_INTERVAL_MS {
            tracing::warn!(
                requested,
                minimum = MIN_CHECK_INTERVAL_MS,
                "REMINDER_CHECK_INTERVAL_MS below minimum, using default"
            );
            DEFAULT_CHECK_INTERVAL_MS
        } else {
            requested
        };
        Self { check_interval_ms }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Configuration for [`NotificationEngine`](crate::NotificationEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base of guest RSVP links (`{base}/rsvp/{event}/{guest}`).
    pub rsvp_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rsvp_base_url: DEFAULT_RSVP_BASE_URL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads `RSVP_BASE_URL` (default `http://localhost:5173`).
    pub fn from_env() -> Self {
        Self {
            rsvp_base_url: std::env::var("RSVP_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_RSVP_BASE_URL.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, ?default, "Invalid config value, using default");
            default
        }
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}
