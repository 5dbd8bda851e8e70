//! In-process store backend.
//!
//! Every collection is a `Mutex<Vec<_>>`; locks are never held across an
//! `.await`. Ids come from one shared counter and timestamps from the
//! injected [`Clock`], so tests control "today".

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use aisle_core::clock::Clock;
use aisle_core::error::CoreError;
use aisle_core::message::{validate_transition, DeliveryStatus};
use aisle_core::types::{DbId, Timestamp};
use aisle_db::models::event::{CreateEvent, Event};
use aisle_db::models::guest::{CreateGuest, Guest};
use aisle_db::models::message::{CreateMessage, Message, MessageFilter};
use aisle_db::models::reminder_schedule::{
    CreateReminderSchedule, ReminderSchedule, UpdateReminderSchedule,
};
use aisle_db::models::schedule_execution::{
    CreateScheduleExecution, ExecutionStatistics, ScheduleExecution,
};
use chrono::NaiveDate;

use super::{EventStore, ExecutionStore, GuestStore, MessageStore, ScheduleStore};
use crate::error::NotifyResult;

// ---------------------------------------------------------------------------
// Collection helpers
// ---------------------------------------------------------------------------

fn lock<T>(collection: &Mutex<T>) -> MutexGuard<'_, T> {
    collection.lock().unwrap_or_else(|e| e.into_inner())
}

fn find_by<T: Clone>(collection: &Mutex<Vec<T>>, predicate: impl Fn(&T) -> bool) -> Vec<T> {
    lock(collection).iter().filter(|item| predicate(item)).cloned().collect()
}

fn find_one<T: Clone>(collection: &Mutex<Vec<T>>, predicate: impl Fn(&T) -> bool) -> Option<T> {
    lock(collection).iter().find(|item| predicate(item)).cloned()
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

pub struct InMemoryStore {
    clock: Arc<dyn Clock>,
    next_id: AtomicI64,
    events: Mutex<Vec<Event>>,
    guests: Mutex<Vec<Guest>>,
    messages: Mutex<Vec<Message>>,
    schedules: Mutex<Vec<ReminderSchedule>>,
    executions: Mutex<Vec<ScheduleExecution>>,
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: AtomicI64::new(1),
            events: Mutex::new(vec![]),
            guests: Mutex::new(vec![]),
            messages: Mutex::new(vec![]),
            schedules: Mutex::new(vec![]),
            executions: Mutex::new(vec![]),
        }
    }

    fn next_id(&self) -> DbId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn add_event(&self, input: CreateEvent) -> Event {
        let now = self.clock.now();
        let event = Event {
            id: self.next_id(),
            title: input.title,
            event_date: input.event_date,
            location: input.location,
            rsvp_deadline: input.rsvp_deadline,
            organizer_id: input.organizer_id,
            organizer_name: input.organizer_name,
            created_at: now,
            updated_at: now,
        };
        lock(&self.events).push(event.clone());
        event
    }

    /// Remove an event row only; dependent rows are left in place.
    pub fn remove_event(&self, event_id: DbId) -> bool {
        let mut events = lock(&self.events);
        let before = events.len();
        events.retain(|e| e.id != event_id);
        events.len() != before
    }

    pub fn add_guest(&self, input: CreateGuest) -> Guest {
        let now = self.clock.now();
        let guest = Guest {
            id: self.next_id(),
            event_id: input.event_id,
            name: input.name,
            phone: input.phone,
            rsvp_status: input.rsvp_status,
            created_at: now,
            updated_at: now,
        };
        lock(&self.guests).push(guest.clone());
        guest
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.messages).clone()
    }

    pub fn message(&self, id: DbId) -> Option<Message> {
        find_one(&self.messages, |m| m.id == id)
    }

    pub fn schedules(&self) -> Vec<ReminderSchedule> {
        lock(&self.schedules).clone()
    }

    pub fn executions(&self) -> Vec<ScheduleExecution> {
        lock(&self.executions).clone()
    }

    fn transition(&self, id: DbId, to: DeliveryStatus, at: Timestamp) -> NotifyResult<()> {
        let mut messages = lock(&self.messages);
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(CoreError::NotFound {
                entity: "message",
                id,
            })?;
        validate_transition(message.delivery_status, to)?;
        message.delivery_status = to;
        message.updated_at = at;
        match to {
            DeliveryStatus::Sent => message.sent_at = Some(at),
            DeliveryStatus::Delivered => message.delivered_at = Some(at),
            DeliveryStatus::Failed => message.failed_at = Some(at),
            DeliveryStatus::Pending => {}
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryStore {
    async fn find_by_id(&self, event_id: DbId) -> NotifyResult<Option<Event>> {
        Ok(find_one(&self.events, |e| e.id == event_id))
    }
}

#[async_trait::async_trait]
impl GuestStore for InMemoryStore {
    async fn find_by_event_id(&self, event_id: DbId) -> NotifyResult<Vec<Guest>> {
        Ok(find_by(&self.guests, |g| g.event_id == event_id))
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryStore {
    async fn create(&self, input: CreateMessage) -> NotifyResult<Message> {
        let now = self.clock.now();
        let message = Message {
            id: self.next_id(),
            event_id: input.event_id,
            recipient_id: input.recipient_id,
            content: input.content,
            message_type: input.message_type,
            delivery_status: DeliveryStatus::Pending,
            scheduled_at: input.scheduled_at,
            sent_at: None,
            delivered_at: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.messages).push(message.clone());
        Ok(message)
    }

    async fn find_with_filters(&self, filter: &MessageFilter) -> NotifyResult<Vec<Message>> {
        Ok(find_by(&self.messages, |m| filter.matches(m)))
    }

    async fn mark_as_sent(&self, id: DbId, at: Timestamp) -> NotifyResult<()> {
        self.transition(id, DeliveryStatus::Sent, at)
    }

    async fn mark_as_delivered(&self, id: DbId, at: Timestamp) -> NotifyResult<()> {
        self.transition(id, DeliveryStatus::Delivered, at)
    }

    async fn mark_as_failed(&self, id: DbId, at: Timestamp) -> NotifyResult<()> {
        self.transition(id, DeliveryStatus::Failed, at)
    }
}

#[async_trait::async_trait]
impl ScheduleStore for InMemoryStore {
    async fn create(&self, input: CreateReminderSchedule) -> NotifyResult<ReminderSchedule> {
        let mut schedules = lock(&self.schedules);
        if schedules
            .iter()
            .any(|s| s.event_id == input.event_id && s.trigger_days == input.trigger_days)
        {
            return Err(CoreError::Conflict(format!(
                "A schedule with trigger days {} already exists for event {}",
                input.trigger_days, input.event_id
            ))
            .into());
        }
        let now = self.clock.now();
        let schedule = ReminderSchedule {
            id: self.next_id(),
            event_id: input.event_id,
            trigger_days: input.trigger_days,
            message_template: input.message_template,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        schedules.push(schedule.clone());
        Ok(schedule)
    }

    async fn find_by_id(&self, id: DbId) -> NotifyResult<Option<ReminderSchedule>> {
        Ok(find_one(&self.schedules, |s| s.id == id))
    }

    async fn find_by_event_id(&self, event_id: DbId) -> NotifyResult<Vec<ReminderSchedule>> {
        let mut schedules = find_by(&self.schedules, |s| s.event_id == event_id);
        schedules.sort_by(|a, b| b.trigger_days.cmp(&a.trigger_days));
        Ok(schedules)
    }

    async fn find_active_by_event_id(
        &self,
        event_id: DbId,
    ) -> NotifyResult<Vec<ReminderSchedule>> {
        let mut schedules = find_by(&self.schedules, |s| s.event_id == event_id && s.is_active);
        schedules.sort_by(|a, b| b.trigger_days.cmp(&a.trigger_days));
        Ok(schedules)
    }

    async fn find_all_active(&self) -> NotifyResult<Vec<ReminderSchedule>> {
        let mut schedules = find_by(&self.schedules, |s| s.is_active);
        schedules.sort_by(|a, b| {
            a.event_id
                .cmp(&b.event_id)
                .then(b.trigger_days.cmp(&a.trigger_days))
        });
        Ok(schedules)
    }

    async fn exists_for_event_and_trigger_days(
        &self,
        event_id: DbId,
        trigger_days: i32,
    ) -> NotifyResult<bool> {
        Ok(find_one(&self.schedules, |s| {
            s.event_id == event_id && s.trigger_days == trigger_days
        })
        .is_some())
    }

    async fn update(
        &self,
        id: DbId,
        input: UpdateReminderSchedule,
    ) -> NotifyResult<Option<ReminderSchedule>> {
        let mut schedules = lock(&self.schedules);
        let Some(index) = schedules.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(days) = input.trigger_days {
            let event_id = schedules[index].event_id;
            if schedules
                .iter()
                .any(|s| s.id != id && s.event_id == event_id && s.trigger_days == days)
            {
                return Err(CoreError::Conflict(format!(
                    "A schedule with trigger days {days} already exists for event {event_id}"
                ))
                .into());
            }
        }
        let now = self.clock.now();
        let schedule = &mut schedules[index];
        if let Some(days) = input.trigger_days {
            schedule.trigger_days = days;
        }
        if let Some(template) = input.message_template {
            schedule.message_template = template;
        }
        if let Some(active) = input.is_active {
            schedule.is_active = active;
        }
        schedule.updated_at = now;
        Ok(Some(schedule.clone()))
    }

    async fn delete(&self, id: DbId) -> NotifyResult<bool> {
        let removed = {
            let mut schedules = lock(&self.schedules);
            let before = schedules.len();
            schedules.retain(|s| s.id != id);
            schedules.len() != before
        };
        if removed {
            lock(&self.executions).retain(|e| e.schedule_id != id);
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl ExecutionStore for InMemoryStore {
    async fn create(&self, input: CreateScheduleExecution) -> NotifyResult<ScheduleExecution> {
        let now = self.clock.now();
        let execution = ScheduleExecution {
            id: self.next_id(),
            schedule_id: input.schedule_id,
            event_id: input.event_id,
            executed_at: input.executed_at,
            guests_processed: input.guests_processed,
            items_scheduled: input.items_scheduled,
            items_skipped: input.items_skipped,
            errors: input.errors,
            created_at: now,
            updated_at: now,
        };
        lock(&self.executions).push(execution.clone());
        Ok(execution)
    }

    async fn was_executed_on(&self, schedule_id: DbId, day: NaiveDate) -> NotifyResult<bool> {
        Ok(find_one(&self.executions, |e| {
            e.schedule_id == schedule_id && e.executed_at.date_naive() == day
        })
        .is_some())
    }

    async fn get_execution_statistics(&self, event_id: DbId) -> NotifyResult<ExecutionStatistics> {
        let executions = find_by(&self.executions, |e| e.event_id == event_id);
        Ok(ExecutionStatistics::from_executions(&executions))
    }
}
