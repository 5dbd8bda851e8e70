//! Domain rules for guest notifications.
//!
//! This crate has no internal dependencies so it can be shared by the
//! persistence layer, the notification engine and any CLI tooling.

pub mod clock;
pub mod error;
pub mod message;
pub mod reminder;
pub mod rsvp;
pub mod template;
pub mod types;
