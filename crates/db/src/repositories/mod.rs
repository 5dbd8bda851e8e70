//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod event_repo;
pub mod guest_repo;
pub mod message_repo;
pub mod reminder_schedule_repo;
pub mod schedule_execution_repo;

pub use event_repo::EventRepo;
pub use guest_repo::GuestRepo;
pub use message_repo::MessageRepo;
pub use reminder_schedule_repo::ReminderScheduleRepo;
pub use schedule_execution_repo::ScheduleExecutionRepo;
