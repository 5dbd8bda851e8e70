//! Persistence seams consumed by the engine and the dispatch channel.
//!
//! Each trait is a narrow contract over one table. [`PgStore`] implements
//! all of them against PostgreSQL; [`InMemoryStore`] implements them over
//! in-process vectors for tests and local runs.

mod memory;
mod postgres;

use std::sync::Arc;

use aisle_core::types::{DbId, Timestamp};
use aisle_db::models::event::Event;
use aisle_db::models::guest::Guest;
use aisle_db::models::message::{CreateMessage, Message, MessageFilter};
use aisle_db::models::reminder_schedule::{
    CreateReminderSchedule, ReminderSchedule, UpdateReminderSchedule,
};
use aisle_db::models::schedule_execution::{
    CreateScheduleExecution, ExecutionStatistics, ScheduleExecution,
};
use chrono::NaiveDate;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use crate::error::NotifyResult;

#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    async fn find_by_id(&self, event_id: DbId) -> NotifyResult<Option<Event>>;
}

#[async_trait::async_trait]
pub trait GuestStore: Send + Sync {
    /// Guests of an event in stable insertion order.
    async fn find_by_event_id(&self, event_id: DbId) -> NotifyResult<Vec<Guest>>;
}

/// Durable message records.
///
/// The `mark_as_*` calls fail with `NotFound` for an unknown id and with a
/// validation error when the transition is not allowed from the current
/// status.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn create(&self, input: CreateMessage) -> NotifyResult<Message>;
    async fn find_with_filters(&self, filter: &MessageFilter) -> NotifyResult<Vec<Message>>;
    async fn mark_as_sent(&self, id: DbId, at: Timestamp) -> NotifyResult<()>;
    async fn mark_as_delivered(&self, id: DbId, at: Timestamp) -> NotifyResult<()>;
    async fn mark_as_failed(&self, id: DbId, at: Timestamp) -> NotifyResult<()>;
}

/// Reminder schedule definitions, unique per `(event_id, trigger_days)`.
///
/// `create` and `update` fail with `Conflict` when the pair is taken.
#[async_trait::async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create(&self, input: CreateReminderSchedule) -> NotifyResult<ReminderSchedule>;
    async fn find_by_id(&self, id: DbId) -> NotifyResult<Option<ReminderSchedule>>;
    async fn find_by_event_id(&self, event_id: DbId) -> NotifyResult<Vec<ReminderSchedule>>;
    async fn find_active_by_event_id(&self, event_id: DbId)
        -> NotifyResult<Vec<ReminderSchedule>>;
    async fn find_all_active(&self) -> NotifyResult<Vec<ReminderSchedule>>;
    async fn exists_for_event_and_trigger_days(
        &self,
        event_id: DbId,
        trigger_days: i32,
    ) -> NotifyResult<bool>;
    async fn update(
        &self,
        id: DbId,
        input: UpdateReminderSchedule,
    ) -> NotifyResult<Option<ReminderSchedule>>;
    async fn delete(&self, id: DbId) -> NotifyResult<bool>;
}

/// Append-only execution history.
#[async_trait::async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create(&self, input: CreateScheduleExecution) -> NotifyResult<ScheduleExecution>;
    async fn was_executed_on(&self, schedule_id: DbId, day: NaiveDate) -> NotifyResult<bool>;
    async fn get_execution_statistics(&self, event_id: DbId) -> NotifyResult<ExecutionStatistics>;
}

/// The set of stores the engine works against.
#[derive(Clone)]
pub struct Stores {
    pub events: Arc<dyn EventStore>,
    pub guests: Arc<dyn GuestStore>,
    pub messages: Arc<dyn MessageStore>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub executions: Arc<dyn ExecutionStore>,
}

impl Stores {
    /// Use one backend for every store.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: EventStore + GuestStore + MessageStore + ScheduleStore + ExecutionStore + 'static,
    {
        Self {
            events: backend.clone(),
            guests: backend.clone(),
            messages: backend.clone(),
            schedules: backend.clone(),
            executions: backend,
        }
    }

    pub fn postgres(pool: aisle_db::DbPool) -> Self {
        Self::from_backend(Arc::new(PgStore::new(pool)))
    }
}
