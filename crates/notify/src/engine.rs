//! Reminder execution and schedule management.
//!
//! [`NotificationEngine::execute_schedule`] walks an event's guests in
//! stable order and reminds every guest that is still undecided and has
//! not already been reminded today. Per-guest failures are recorded and
//! never abort the batch; every completed run persists one execution
//! record.

use std::sync::Arc;

use aisle_core::clock::Clock;
use aisle_core::error::CoreError;
use aisle_core::message::MessageType;
use aisle_core::reminder::{self, ScheduleRequest};
use aisle_core::template::{self, TemplateVars};
use aisle_core::types::{DbId, Timestamp};
use aisle_db::models::event::Event;
use aisle_db::models::guest::Guest;
use aisle_db::models::message::{CreateMessage, MessageFilter};
use aisle_db::models::reminder_schedule::{
    CreateReminderSchedule, ReminderSchedule, UpdateReminderSchedule,
};
use aisle_db::models::schedule_execution::{
    CreateScheduleExecution, ExecutionStatistics, ScheduleExecution,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use validator::Validate;

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, NotifyError, NotifyResult};
use crate::store::Stores;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one schedule run, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: DbId,
    pub schedule_id: DbId,
    pub event_id: DbId,
    pub executed_at: Timestamp,
    pub guests_processed: i32,
    pub items_scheduled: i32,
    pub items_skipped: i32,
    pub errors: Vec<String>,
}

impl From<ScheduleExecution> for ExecutionResult {
    fn from(execution: ScheduleExecution) -> Self {
        Self {
            execution_id: execution.id,
            schedule_id: execution.schedule_id,
            event_id: execution.event_id,
            executed_at: execution.executed_at,
            guests_processed: execution.guests_processed,
            items_scheduled: execution.items_scheduled,
            items_skipped: execution.items_skipped,
            errors: execution.errors,
        }
    }
}

/// A schedule that could not be run this cycle.
#[derive(Debug)]
pub struct ScheduleFailure {
    pub schedule_id: DbId,
    pub event_id: DbId,
    pub error: NotifyError,
}

/// Active schedules whose trigger point has been reached.
#[derive(Debug, Default)]
pub struct DueSchedules {
    pub due: Vec<(ReminderSchedule, Event)>,
    /// Schedules whose event could not be loaded.
    pub failures: Vec<ScheduleFailure>,
}

/// Everything one polling cycle did.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub results: Vec<ExecutionResult>,
    pub failures: Vec<ScheduleFailure>,
}

/// Totals across every schedule executed in a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub total_executions: usize,
    pub guests_processed: i64,
    pub items_scheduled: i64,
    pub items_skipped: i64,
    pub errors: Vec<String>,
}

impl CycleReport {
    pub fn summary(&self) -> CycleSummary {
        let mut summary = CycleSummary {
            total_executions: self.results.len(),
            ..Default::default()
        };
        for result in &self.results {
            summary.guests_processed += i64::from(result.guests_processed);
            summary.items_scheduled += i64::from(result.items_scheduled);
            summary.items_skipped += i64::from(result.items_skipped);
            summary.errors.extend(result.errors.iter().cloned());
        }
        summary
    }

    /// The summary, or the first schedule failure if there was one.
    pub fn into_summary(mut self) -> NotifyResult<CycleSummary> {
        if self.failures.is_empty() {
            Ok(self.summary())
        } else {
            Err(self.failures.swap_remove(0).error)
        }
    }
}

/// Why one guest was not reminded.
#[derive(Debug, thiserror::Error)]
enum GuestError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Store(#[from] NotifyError),
}

fn warn_unknown_placeholders(template: &str) {
    let unknown = template::unknown_placeholders(template);
    if !unknown.is_empty() {
        tracing::warn!(
            ?unknown,
            "Template references unknown placeholders; they will be sent verbatim"
        );
    }
}

// ---------------------------------------------------------------------------
// NotificationEngine
// ---------------------------------------------------------------------------

pub struct NotificationEngine {
    stores: Stores,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl NotificationEngine {
    pub fn new(
        stores: Stores,
        dispatcher: Arc<dyn Dispatcher>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            stores,
            dispatcher,
            clock,
            config,
        }
    }

    async fn load_event(&self, event_id: DbId) -> NotifyResult<Event> {
        self.stores
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "event",
                    id: event_id,
                }
                .into()
            })
    }

    fn schedule_not_found(id: DbId) -> NotifyError {
        CoreError::NotFound {
            entity: "schedule",
            id,
        }
        .into()
    }

    // -----------------------------------------------------------------------
    // Schedule configuration
    // -----------------------------------------------------------------------

    /// Create the requested schedules for an event.
    ///
    /// Rejects the whole request if the RSVP deadline has passed or any
    /// entry is invalid. Entries whose `trigger_days` already has a schedule
    /// are skipped silently. Returns only the newly created schedules.
    pub async fn configure(
        &self,
        event_id: DbId,
        requests: &[ScheduleRequest],
    ) -> NotifyResult<Vec<ReminderSchedule>> {
        let event = self.load_event(event_id).await?;
        reminder::validate_deadline_open(event.rsvp_deadline, self.clock.now())?;
        for request in requests {
            request.validate()?;
        }

        let mut created = Vec::new();
        for request in requests {
            if self
                .stores
                .schedules
                .exists_for_event_and_trigger_days(event_id, request.trigger_days)
                .await?
            {
                tracing::debug!(
                    event_id,
                    trigger_days = request.trigger_days,
                    "Schedule already exists, skipping"
                );
                continue;
            }

            warn_unknown_placeholders(&request.message_template);
            let schedule = self
                .stores
                .schedules
                .create(CreateReminderSchedule {
                    event_id,
                    trigger_days: request.trigger_days,
                    message_template: request.message_template.clone(),
                    is_active: request.is_active,
                })
                .await?;
            tracing::info!(
                event_id,
                schedule_id = schedule.id,
                trigger_days = schedule.trigger_days,
                "Reminder schedule created"
            );
            created.push(schedule);
        }
        Ok(created)
    }

    pub async fn list_schedules(&self, event_id: DbId) -> NotifyResult<Vec<ReminderSchedule>> {
        self.stores.schedules.find_by_event_id(event_id).await
    }

    pub async fn get_schedule(&self, id: DbId) -> NotifyResult<ReminderSchedule> {
        self.stores
            .schedules
            .find_by_id(id)
            .await?
            .ok_or_else(|| Self::schedule_not_found(id))
    }

    pub async fn toggle_schedule(
        &self,
        id: DbId,
        is_active: bool,
    ) -> NotifyResult<ReminderSchedule> {
        let update = UpdateReminderSchedule {
            is_active: Some(is_active),
            ..Default::default()
        };
        self.stores
            .schedules
            .update(id, update)
            .await?
            .ok_or_else(|| Self::schedule_not_found(id))
    }

    /// Patch a schedule. Moving it onto a `trigger_days` value another
    /// schedule of the same event already uses is a conflict.
    pub async fn update_schedule(
        &self,
        id: DbId,
        input: UpdateReminderSchedule,
    ) -> NotifyResult<ReminderSchedule> {
        let current = self.get_schedule(id).await?;

        if let Some(days) = input.trigger_days {
            reminder::validate_trigger_days(days)?;
            if days != current.trigger_days
                && self
                    .stores
                    .schedules
                    .exists_for_event_and_trigger_days(current.event_id, days)
                    .await?
            {
                return Err(CoreError::Conflict(format!(
                    "A schedule with trigger days {days} already exists for event {}",
                    current.event_id
                ))
                .into());
            }
        }
        if let Some(template) = &input.message_template {
            if template.trim().is_empty() {
                return Err(
                    CoreError::Validation("Message template must not be empty".into()).into(),
                );
            }
            warn_unknown_placeholders(template);
        }

        self.stores
            .schedules
            .update(id, input)
            .await?
            .ok_or_else(|| Self::schedule_not_found(id))
    }

    pub async fn delete_schedule(&self, id: DbId) -> NotifyResult<()> {
        if self.stores.schedules.delete(id).await? {
            tracing::info!(schedule_id = id, "Reminder schedule deleted");
            Ok(())
        } else {
            Err(Self::schedule_not_found(id))
        }
    }

    pub async fn execution_statistics(&self, event_id: DbId) -> NotifyResult<ExecutionStatistics> {
        self.stores
            .executions
            .get_execution_statistics(event_id)
            .await
    }

    /// Whether the schedule already ran today (UTC).
    ///
    /// Advisory only: [`execute_schedule`](Self::execute_schedule) never
    /// consults it; per-guest idempotency is what prevents duplicate sends.
    pub async fn was_executed_today(&self, schedule_id: DbId) -> NotifyResult<bool> {
        self.stores
            .executions
            .was_executed_on(schedule_id, self.clock.today())
            .await
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Run one schedule against its event's guest list.
    ///
    /// Fails without recording anything if the event does not exist.
    pub async fn execute_schedule(
        &self,
        schedule: &ReminderSchedule,
    ) -> NotifyResult<ExecutionResult> {
        let event = self.load_event(schedule.event_id).await?;
        self.run_schedule(schedule, &event).await
    }

    /// Active schedules that are due now, each paired with its event.
    pub async fn due_schedules(&self) -> NotifyResult<DueSchedules> {
        let now = self.clock.now();
        let mut due = DueSchedules::default();

        for schedule in self.stores.schedules.find_all_active().await? {
            let event = match self.load_event(schedule.event_id).await {
                Ok(event) => event,
                Err(error) => {
                    due.failures.push(ScheduleFailure {
                        schedule_id: schedule.id,
                        event_id: schedule.event_id,
                        error,
                    });
                    continue;
                }
            };
            if reminder::is_due(event.rsvp_deadline, schedule.trigger_days, now) {
                due.due.push((schedule, event));
            }
        }
        Ok(due)
    }

    /// Execute every due schedule in turn. A failing schedule is reported
    /// and the cycle moves on to the next one.
    pub async fn execute_due_schedules(&self) -> NotifyResult<CycleReport> {
        let DueSchedules { due, failures } = self.due_schedules().await?;
        let mut report = CycleReport {
            results: Vec::with_capacity(due.len()),
            failures,
        };

        for (schedule, event) in &due {
            match self.run_schedule(schedule, event).await {
                Ok(result) => report.results.push(result),
                Err(error) => {
                    tracing::error!(
                        schedule_id = schedule.id,
                        event_id = event.id,
                        error = %error,
                        "Schedule execution failed"
                    );
                    report.failures.push(ScheduleFailure {
                        schedule_id: schedule.id,
                        event_id: event.id,
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    async fn run_schedule(
        &self,
        schedule: &ReminderSchedule,
        event: &Event,
    ) -> NotifyResult<ExecutionResult> {
        let now = self.clock.now();
        let today = now.date_naive();
        let guests = self.stores.guests.find_by_event_id(event.id).await?;

        let mut guests_processed = 0;
        let mut items_scheduled = 0;
        let mut items_skipped = 0;
        let mut errors = Vec::new();

        for guest in &guests {
            guests_processed += 1;

            if guest.rsvp_status.is_terminal() {
                items_skipped += 1;
                continue;
            }

            let outcome = match self.reminded_on(event.id, guest.id, today).await {
                Ok(true) => {
                    items_skipped += 1;
                    continue;
                }
                Ok(false) => self.remind_guest(schedule, event, guest, now).await,
                Err(e) => Err(e.into()),
            };
            match outcome {
                Ok(()) => items_scheduled += 1,
                Err(reason) => {
                    errors.push(format!("Failed to send reminder to {}: {reason}", guest.name))
                }
            }
        }

        let execution = self
            .stores
            .executions
            .create(CreateScheduleExecution {
                schedule_id: schedule.id,
                event_id: event.id,
                executed_at: now,
                guests_processed,
                items_scheduled,
                items_skipped,
                errors,
            })
            .await?;

        tracing::info!(
            schedule_id = schedule.id,
            event_id = event.id,
            guests_processed,
            items_scheduled,
            items_skipped,
            errors = execution.errors.len(),
            "Reminder schedule executed"
        );
        Ok(execution.into())
    }

    /// Whether the guest already has a reminder created on `day`.
    ///
    /// Reminders are always scheduled at creation time, so the store query is
    /// bounded to messages scheduled from the start of `day`.
    async fn reminded_on(
        &self,
        event_id: DbId,
        guest_id: DbId,
        day: NaiveDate,
    ) -> NotifyResult<bool> {
        let filter = MessageFilter {
            event_id: Some(event_id),
            recipient_id: Some(guest_id),
            message_type: Some(MessageType::Reminder),
            scheduled_after: Some(day.and_time(NaiveTime::MIN).and_utc()),
            ..Default::default()
        };
        let messages = self.stores.messages.find_with_filters(&filter).await?;
        Ok(messages.iter().any(|m| m.created_at.date_naive() == day))
    }

    async fn remind_guest(
        &self,
        schedule: &ReminderSchedule,
        event: &Event,
        guest: &Guest,
        now: Timestamp,
    ) -> Result<(), GuestError> {
        let phone = guest
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(DispatchError::MissingRecipient)?;

        let content =
            template::render(&schedule.message_template, &self.template_vars(event, guest));
        let message = self
            .stores
            .messages
            .create(CreateMessage {
                event_id: event.id,
                recipient_id: guest.id,
                content: content.clone(),
                message_type: MessageType::Reminder,
                scheduled_at: Some(now),
            })
            .await?;

        self.dispatcher.send(phone, &content, message.id).await?;
        Ok(())
    }

    fn template_vars(&self, event: &Event, guest: &Guest) -> TemplateVars {
        TemplateVars {
            guest_name: Some(guest.name.clone()),
            event_title: Some(event.title.clone()),
            event_date: Some(template::format_event_date(event.event_date)),
            event_location: event.location.clone(),
            rsvp_deadline: Some(template::format_deadline(event.rsvp_deadline)),
            rsvp_link: Some(template::rsvp_link(
                &self.config.rsvp_base_url,
                event.id,
                guest.id,
            )),
            organizer_name: event.organizer_name.clone(),
        }
    }
}
