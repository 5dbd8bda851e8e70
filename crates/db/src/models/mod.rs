//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - An update DTO (all `Option` fields) where rows can be patched

pub mod event;
pub mod guest;
pub mod message;
pub mod reminder_schedule;
pub mod schedule_execution;
