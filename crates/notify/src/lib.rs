//! Reminder scheduling and rate-limited message dispatch.
//!
//! - [`NotificationEngine`] runs one reminder schedule against an event's
//!   guest list and manages schedule configuration.
//! - [`ReminderScheduler`] polls for due schedules on a repeating timer.
//! - [`SimulatedChannel`] is a dispatch channel with per-recipient
//!   sliding-window rate limiting and delayed, probabilistic delivery.
//! - [`store`] holds the persistence seams with PostgreSQL and in-memory
//!   backends.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod store;

pub use config::{DispatchConfig, EngineConfig, SchedulerConfig};
pub use dispatch::simulated::SimulatedChannel;
pub use dispatch::Dispatcher;
pub use engine::{CycleReport, CycleSummary, ExecutionResult, NotificationEngine};
pub use error::{DispatchError, NotifyError, NotifyResult};
pub use scheduler::{ReminderScheduler, SchedulerStatus};
pub use store::Stores;
