//! PostgreSQL store backend over the `aisle-db` repositories.

use aisle_core::error::CoreError;
use aisle_core::message::{validate_transition, DeliveryStatus};
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
use aisle_db::repositories::{
    EventRepo, GuestRepo, MessageRepo, ReminderScheduleRepo, ScheduleExecutionRepo,
};
use aisle_db::DbPool;
use chrono::NaiveDate;

use super::{EventStore, ExecutionStore, GuestStore, MessageStore, ScheduleStore};
use crate::error::{NotifyError, NotifyResult};

/// Store backend for all five traits, sharing one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Explain why a guarded status update touched no row.
    async fn transition_error(&self, id: DbId, to: DeliveryStatus) -> NotifyError {
        match MessageRepo::find_by_id(&self.pool, id).await {
            Ok(Some(message)) => match validate_transition(message.delivery_status, to) {
                Err(e) => e.into(),
                // Raced with a concurrent update that made the transition legal again.
                Ok(()) => NotifyError::Store(format!(
                    "Message {id} changed while marking it {to}"
                )),
            },
            Ok(None) => CoreError::NotFound {
                entity: "message",
                id,
            }
            .into(),
            Err(e) => e.into(),
        }
    }
}

/// Map a unique-constraint violation on `reminder_schedules` to `Conflict`.
fn schedule_conflict(
    err: sqlx::Error,
    event_id: Option<DbId>,
    trigger_days: Option<i32>,
) -> NotifyError {
    let is_unique = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if is_unique {
        let event = event_id.map_or_else(|| "this event".to_string(), |id| format!("event {id}"));
        let days = trigger_days.map_or_else(String::new, |d| format!(" {d}"));
        CoreError::Conflict(format!(
            "A schedule with trigger days{days} already exists for {event}"
        ))
        .into()
    } else {
        err.into()
    }
}

#[async_trait::async_trait]
impl EventStore for PgStore {
    async fn find_by_id(&self, event_id: DbId) -> NotifyResult<Option<Event>> {
        Ok(EventRepo::find_by_id(&self.pool, event_id).await?)
    }
}

#[async_trait::async_trait]
impl GuestStore for PgStore {
    async fn find_by_event_id(&self, event_id: DbId) -> NotifyResult<Vec<Guest>> {
        Ok(GuestRepo::list_by_event(&self.pool, event_id).await?)
    }
}

#[async_trait::async_trait]
impl MessageStore for PgStore {
    async fn create(&self, input: CreateMessage) -> NotifyResult<Message> {
        Ok(MessageRepo::create(&self.pool, &input).await?)
    }

    async fn find_with_filters(&self, filter: &MessageFilter) -> NotifyResult<Vec<Message>> {
        Ok(MessageRepo::find_with_filters(&self.pool, filter).await?)
    }

    async fn mark_as_sent(&self, id: DbId, at: Timestamp) -> NotifyResult<()> {
        match MessageRepo::mark_as_sent(&self.pool, id, at).await? {
            Some(_) => Ok(()),
            None => Err(self.transition_error(id, DeliveryStatus::Sent).await),
        }
    }

    async fn mark_as_delivered(&self, id: DbId, at: Timestamp) -> NotifyResult<()> {
        match MessageRepo::mark_as_delivered(&self.pool, id, at).await? {
            Some(_) => Ok(()),
            None => Err(self.transition_error(id, DeliveryStatus::Delivered).await),
        }
    }

    async fn mark_as_failed(&self, id: DbId, at: Timestamp) -> NotifyResult<()> {
        match MessageRepo::mark_as_failed(&self.pool, id, at).await? {
            Some(_) => Ok(()),
            None => Err(self.transition_error(id, DeliveryStatus::Failed).await),
        }
    }
}

#[async_trait::async_trait]
impl ScheduleStore for PgStore {
    async fn create(&self, input: CreateReminderSchedule) -> NotifyResult<ReminderSchedule> {
        ReminderScheduleRepo::create(&self.pool, &input)
            .await
            .map_err(|e| schedule_conflict(e, Some(input.event_id), Some(input.trigger_days)))
    }

    async fn find_by_id(&self, id: DbId) -> NotifyResult<Option<ReminderSchedule>> {
        Ok(ReminderScheduleRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_event_id(&self, event_id: DbId) -> NotifyResult<Vec<ReminderSchedule>> {
        Ok(ReminderScheduleRepo::find_by_event(&self.pool, event_id).await?)
    }

    async fn find_active_by_event_id(
        &self,
        event_id: DbId,
    ) -> NotifyResult<Vec<ReminderSchedule>> {
        Ok(ReminderScheduleRepo::find_active_by_event(&self.pool, event_id).await?)
    }

    async fn find_all_active(&self) -> NotifyResult<Vec<ReminderSchedule>> {
        Ok(ReminderScheduleRepo::find_all_active(&self.pool).await?)
    }

    async fn exists_for_event_and_trigger_days(
        &self,
        event_id: DbId,
        trigger_days: i32,
    ) -> NotifyResult<bool> {
        Ok(
            ReminderScheduleRepo::exists_for_event_and_trigger_days(
                &self.pool,
                event_id,
                trigger_days,
            )
            .await?,
        )
    }

    async fn update(
        &self,
        id: DbId,
        input: UpdateReminderSchedule,
    ) -> NotifyResult<Option<ReminderSchedule>> {
        ReminderScheduleRepo::update(&self.pool, id, &input)
            .await
            .map_err(|e| schedule_conflict(e, None, input.trigger_days))
    }

    async fn delete(&self, id: DbId) -> NotifyResult<bool> {
        Ok(ReminderScheduleRepo::delete(&self.pool, id).await?)
    }
}

#[async_trait::async_trait]
impl ExecutionStore for PgStore {
    async fn create(&self, input: CreateScheduleExecution) -> NotifyResult<ScheduleExecution> {
        Ok(ScheduleExecutionRepo::create(&self.pool, &input).await?)
    }

    async fn was_executed_on(&self, schedule_id: DbId, day: NaiveDate) -> NotifyResult<bool> {
        Ok(ScheduleExecutionRepo::has_executed_on(&self.pool, schedule_id, day).await?)
    }

    async fn get_execution_statistics(&self, event_id: DbId) -> NotifyResult<ExecutionStatistics> {
        Ok(ScheduleExecutionRepo::statistics(&self.pool, event_id).await?)
    }
}
